use ash::vk;
use ash::Device;

use crate::error::GpuResult;

/// Swapchain plus everything sized by it.
#[derive(Debug, Default)]
pub(super) struct Swapchain {
    pub handle: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub views: Vec<vk::ImageView>,
    pub framebuffers: Vec<vk::Framebuffer>,
    pub command_buffers: Vec<vk::CommandBuffer>,
    /// Fence of the frame that last rendered into each image.
    pub images_in_flight: Vec<vk::Fence>,
    pub extent: vk::Extent2D,
}

pub(super) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_UNORM
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first().copied())
}

pub(super) fn choose_present_mode(
    available: &[vk::PresentModeKHR],
    preferred: vk::PresentModeKHR,
) -> vk::PresentModeKHR {
    if available.contains(&preferred) {
        preferred
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Surface-dictated extent, or `width`x`height` clamped to the surface limits.
pub(super) fn clamp_extent(caps: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

pub(super) struct SwapchainRequest {
    pub surface: vk::SurfaceKHR,
    pub physical_device: vk::PhysicalDevice,
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub queue_family_index: u32,
    pub width: u32,
    pub height: u32,
}

/// Creates a swapchain. A non-null `old_swapchain` lets the driver recycle its images;
/// the caller still destroys it afterwards.
pub(super) unsafe fn create_swapchain(
    swapchain_loader: &ash::khr::swapchain::Device,
    surface_loader: &ash::khr::surface::Instance,
    req: &SwapchainRequest,
    old_swapchain: vk::SwapchainKHR,
) -> GpuResult<(vk::SwapchainKHR, Vec<vk::Image>, vk::Extent2D)> {
    let caps = surface_loader
        .get_physical_device_surface_capabilities(req.physical_device, req.surface)?;
    let present_modes = surface_loader
        .get_physical_device_surface_present_modes(req.physical_device, req.surface)?;

    let present_mode = choose_present_mode(&present_modes, req.present_mode);
    let extent = clamp_extent(&caps, req.width, req.height);

    let image_count = (caps.min_image_count + 1).min(if caps.max_image_count == 0 {
        u32::MAX
    } else {
        caps.max_image_count
    });

    let family_indices = [req.queue_family_index];

    let create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(req.surface)
        .min_image_count(image_count)
        .image_format(req.format.format)
        .image_color_space(req.format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .queue_family_indices(&family_indices)
        .pre_transform(caps.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true)
        .old_swapchain(old_swapchain);

    let swapchain = swapchain_loader.create_swapchain(&create_info, None)?;
    let images = match swapchain_loader.get_swapchain_images(swapchain) {
        Ok(images) => images,
        Err(e) => {
            swapchain_loader.destroy_swapchain(swapchain, None);
            return Err(e.into());
        }
    };

    Ok((swapchain, images, extent))
}

pub(super) unsafe fn create_image_views(
    device: &Device,
    images: &[vk::Image],
    format: vk::Format,
    out: &mut Vec<vk::ImageView>,
) -> GpuResult<()> {
    for &image in images {
        let view = device.create_image_view(
            &vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(0)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                ),
            None,
        )?;
        out.push(view);
    }
    Ok(())
}

pub(super) unsafe fn create_framebuffers(
    device: &Device,
    render_pass: vk::RenderPass,
    views: &[vk::ImageView],
    extent: vk::Extent2D,
    out: &mut Vec<vk::Framebuffer>,
) -> GpuResult<()> {
    for view in views {
        let attachments = [*view];
        let fb = device.create_framebuffer(
            &vk::FramebufferCreateInfo::default()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1),
            None,
        )?;
        out.push(fb);
    }
    Ok(())
}

/// Single-subpass pass that clears the swapchain image and leaves it ready to present.
pub(super) unsafe fn create_clear_render_pass(
    device: &Device,
    format: vk::Format,
) -> GpuResult<vk::RenderPass> {
    let attachments = [vk::AttachmentDescription::default()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)];

    let color_refs = [vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];

    let subpasses = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs)];

    let dependencies = [vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)];

    Ok(device.create_render_pass(
        &vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies),
        None,
    )?)
}
