use ash::vk;

use wiggler_core::Extent2D;

use crate::backend::{Acquire, GpuDevice, Present};
use crate::error::{GpuError, GpuResult};

use super::instance::InstanceCore;
use super::swapchain::{
    choose_surface_format, create_clear_render_pass, create_framebuffers, create_image_views,
    create_swapchain, Swapchain, SwapchainRequest,
};

const FRAMES_IN_FLIGHT: usize = 2;

#[derive(Debug, Copy, Clone, Default)]
struct FrameSync {
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,
}

/// Logical device, queue and presentation resources for one surface.
pub struct VulkanDevice {
    core: InstanceCore,

    physical_device: vk::PhysicalDevice,
    queue_family_index: u32,
    device: ash::Device,
    queue: vk::Queue,

    swapchain_loader: ash::khr::swapchain::Device,
    surface_format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    render_pass: vk::RenderPass,
    command_pool: vk::CommandPool,

    frames: [FrameSync; FRAMES_IN_FLIGHT],
    frame_index: usize,
    swapchain: Swapchain,

    released: bool,
}

impl VulkanDevice {
    pub(super) unsafe fn new(
        core: InstanceCore,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        present_mode: vk::PresentModeKHR,
    ) -> GpuResult<Self> {
        let formats = core
            .surface_loader
            .get_physical_device_surface_formats(physical_device, core.surface)?;
        let surface_format = choose_surface_format(&formats)
            .ok_or_else(|| GpuError::Surface("surface reports no formats".into()))?;

        let priorities = [1.0f32];
        let queue_info = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family_index)
            .queue_priorities(&priorities)];
        let extensions = [ash::khr::swapchain::NAME.as_ptr()];

        let device = core.instance.create_device(
            physical_device,
            &vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_info)
                .enabled_extension_names(&extensions),
            None,
        )?;
        let queue = device.get_device_queue(queue_family_index, 0);
        let swapchain_loader = ash::khr::swapchain::Device::new(&core.instance, &device);

        let mut me = Self {
            core,
            physical_device,
            queue_family_index,
            device,
            queue,
            swapchain_loader,
            surface_format,
            present_mode,
            render_pass: vk::RenderPass::null(),
            command_pool: vk::CommandPool::null(),
            frames: [FrameSync::default(); FRAMES_IN_FLIGHT],
            frame_index: 0,
            swapchain: Swapchain::default(),
            released: false,
        };

        if let Err(e) = me.create_device_objects() {
            me.release();
            return Err(e);
        }
        Ok(me)
    }

    unsafe fn create_device_objects(&mut self) -> GpuResult<()> {
        self.render_pass = create_clear_render_pass(&self.device, self.surface_format.format)?;

        self.command_pool = self.device.create_command_pool(
            &vk::CommandPoolCreateInfo::default()
                .queue_family_index(self.queue_family_index)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER),
            None,
        )?;

        for frame in &mut self.frames {
            frame.in_flight = self.device.create_fence(
                &vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED),
                None,
            )?;
        }
        self.create_semaphores()
    }

    unsafe fn create_semaphores(&mut self) -> GpuResult<()> {
        for frame in &mut self.frames {
            frame.image_available = self
                .device
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)?;
            frame.render_finished = self
                .device
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)?;
        }
        Ok(())
    }

    unsafe fn destroy_semaphores(&mut self) {
        for frame in &mut self.frames {
            if frame.image_available != vk::Semaphore::null() {
                self.device.destroy_semaphore(frame.image_available, None);
                frame.image_available = vk::Semaphore::null();
            }
            if frame.render_finished != vk::Semaphore::null() {
                self.device.destroy_semaphore(frame.render_finished, None);
                frame.render_finished = vk::Semaphore::null();
            }
        }
    }

    /// Framebuffers, views and command buffers. The swapchain handle is left alone.
    unsafe fn destroy_swapchain_dependents(&mut self) {
        for fb in self.swapchain.framebuffers.drain(..) {
            self.device.destroy_framebuffer(fb, None);
        }
        for view in self.swapchain.views.drain(..) {
            self.device.destroy_image_view(view, None);
        }
        if !self.swapchain.command_buffers.is_empty() {
            self.device
                .free_command_buffers(self.command_pool, &self.swapchain.command_buffers);
            self.swapchain.command_buffers.clear();
        }
        self.swapchain.images.clear();
        self.swapchain.images_in_flight.clear();
    }

    unsafe fn rebuild_swapchain(&mut self, extent: Extent2D) -> GpuResult<Extent2D> {
        self.device.device_wait_idle()?;
        self.destroy_swapchain_dependents();

        // Semaphores may still carry a signal from an acquire or present that reported a stale target.
        self.destroy_semaphores();
        self.create_semaphores()?;
        self.frame_index = 0;

        let old = std::mem::replace(&mut self.swapchain.handle, vk::SwapchainKHR::null());
        let req = SwapchainRequest {
            surface: self.core.surface,
            physical_device: self.physical_device,
            format: self.surface_format,
            present_mode: self.present_mode,
            queue_family_index: self.queue_family_index,
            width: extent.width,
            height: extent.height,
        };
        let created = create_swapchain(&self.swapchain_loader, &self.core.surface_loader, &req, old);
        if old != vk::SwapchainKHR::null() {
            self.swapchain_loader.destroy_swapchain(old, None);
        }
        let (handle, images, vk_extent) = created?;

        self.swapchain.handle = handle;
        self.swapchain.extent = vk_extent;
        self.swapchain.images_in_flight = vec![vk::Fence::null(); images.len()];

        create_image_views(
            &self.device,
            &images,
            self.surface_format.format,
            &mut self.swapchain.views,
        )?;
        create_framebuffers(
            &self.device,
            self.render_pass,
            &self.swapchain.views,
            vk_extent,
            &mut self.swapchain.framebuffers,
        )?;
        self.swapchain.command_buffers = self.device.allocate_command_buffers(
            &vk::CommandBufferAllocateInfo::default()
                .command_pool(self.command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(images.len() as u32),
        )?;
        self.swapchain.images = images;

        Ok(Extent2D::new(vk_extent.width, vk_extent.height))
    }

    /// Waits on a semaphore signaled by a suboptimal acquire so it can be reused.
    unsafe fn retire_acquire(&mut self, frame: FrameSync) -> GpuResult<()> {
        self.device.reset_fences(&[frame.in_flight])?;
        let wait_sems = [frame.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let submit = [vk::SubmitInfo::default()
            .wait_semaphores(&wait_sems)
            .wait_dst_stage_mask(&wait_stages)];
        self.device
            .queue_submit(self.queue, &submit, frame.in_flight)?;
        self.frame_index = (self.frame_index + 1) % FRAMES_IN_FLIGHT;
        Ok(())
    }

    unsafe fn record_clear(&self, image: usize, rgba: [f32; 4]) -> GpuResult<vk::CommandBuffer> {
        let cmd = self.swapchain.command_buffers[image];

        self.device
            .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;
        self.device.begin_command_buffer(
            cmd,
            &vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT),
        )?;

        let clear = vk::ClearValue {
            color: vk::ClearColorValue { float32: rgba },
        };
        let rp_begin = vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass)
            .framebuffer(self.swapchain.framebuffers[image])
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: self.swapchain.extent,
            })
            .clear_values(std::slice::from_ref(&clear));

        self.device
            .cmd_begin_render_pass(cmd, &rp_begin, vk::SubpassContents::INLINE);
        self.device.cmd_end_render_pass(cmd);
        self.device.end_command_buffer(cmd)?;
        Ok(cmd)
    }

    fn image_slot(&self, image: u32) -> GpuResult<usize> {
        let idx = image as usize;
        if idx < self.swapchain.images.len() {
            Ok(idx)
        } else {
            Err(GpuError::Other(format!("image index {image} out of range")))
        }
    }
}

impl GpuDevice for VulkanDevice {
    fn create_presentation(&mut self, extent: Extent2D) -> GpuResult<Extent2D> {
        unsafe { self.rebuild_swapchain(extent) }
    }

    fn destroy_presentation(&mut self) {
        unsafe {
            self.destroy_swapchain_dependents();
            if self.swapchain.handle != vk::SwapchainKHR::null() {
                self.swapchain_loader
                    .destroy_swapchain(self.swapchain.handle, None);
                self.swapchain.handle = vk::SwapchainKHR::null();
            }
        }
    }

    fn acquire(&mut self) -> GpuResult<Acquire> {
        if self.swapchain.handle == vk::SwapchainKHR::null() {
            return Ok(Acquire::Stale);
        }
        let frame = self.frames[self.frame_index];

        unsafe {
            self.device
                .wait_for_fences(&[frame.in_flight], true, u64::MAX)?;

            let acquired = self.swapchain_loader.acquire_next_image(
                self.swapchain.handle,
                u64::MAX,
                frame.image_available,
                vk::Fence::null(),
            );

            match acquired {
                Ok((index, false)) => {
                    let idx = self.image_slot(index)?;
                    let inflight = self.swapchain.images_in_flight[idx];
                    if inflight != vk::Fence::null() && inflight != frame.in_flight {
                        self.device.wait_for_fences(&[inflight], true, u64::MAX)?;
                    }
                    self.swapchain.images_in_flight[idx] = frame.in_flight;
                    Ok(Acquire::Ready(index))
                }
                Ok((_, true)) => {
                    self.retire_acquire(frame)?;
                    Ok(Acquire::Stale)
                }
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Acquire::Stale),
                Err(e) => Err(e.into()),
            }
        }
    }

    fn draw(&mut self, image: u32, clear_color: [f32; 4]) -> GpuResult<()> {
        let idx = self.image_slot(image)?;
        let frame = self.frames[self.frame_index];

        unsafe {
            let cmd = self.record_clear(idx, clear_color)?;

            self.device.reset_fences(&[frame.in_flight])?;

            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let wait_sems = [frame.image_available];
            let signal_sems = [frame.render_finished];
            let cmd_bufs = [cmd];

            let submit_infos = [vk::SubmitInfo::default()
                .wait_semaphores(&wait_sems)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&cmd_bufs)
                .signal_semaphores(&signal_sems)];

            self.device
                .queue_submit(self.queue, &submit_infos, frame.in_flight)?;
        }
        Ok(())
    }

    fn present(&mut self, image: u32) -> GpuResult<Present> {
        let frame = self.frames[self.frame_index];
        let wait_sems = [frame.render_finished];
        let swapchains = [self.swapchain.handle];
        let indices = [image];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_sems)
            .swapchains(&swapchains)
            .image_indices(&indices);

        let result = unsafe { self.swapchain_loader.queue_present(self.queue, &present_info) };
        self.frame_index = (self.frame_index + 1) % FRAMES_IN_FLIGHT;

        match result {
            Ok(false) => Ok(Present::Presented),
            Ok(true) => Ok(Present::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Present::Stale),
            Err(e) => Err(e.into()),
        }
    }

    fn wait_idle(&mut self) -> GpuResult<()> {
        if self.released {
            return Ok(());
        }
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        unsafe {
            self.destroy_presentation();
            self.destroy_semaphores();

            for frame in &mut self.frames {
                if frame.in_flight != vk::Fence::null() {
                    self.device.destroy_fence(frame.in_flight, None);
                    frame.in_flight = vk::Fence::null();
                }
            }

            if self.command_pool != vk::CommandPool::null() {
                self.device.destroy_command_pool(self.command_pool, None);
                self.command_pool = vk::CommandPool::null();
            }
            if self.render_pass != vk::RenderPass::null() {
                self.device.destroy_render_pass(self.render_pass, None);
                self.render_pass = vk::RenderPass::null();
            }

            self.device.destroy_device(None);
            self.core.destroy();
        }
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.wait_idle();
            self.release();
        }
    }
}
