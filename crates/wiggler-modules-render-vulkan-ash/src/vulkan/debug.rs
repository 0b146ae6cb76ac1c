use std::ffi::{c_void, CStr};
use std::sync::Arc;

use ash::vk;

use wiggler_core::LogFn;

use crate::error::GpuResult;

/// Validation-layer messenger forwarding every message to a log callback.
pub(super) struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
    // Referenced by the driver through `p_user_data`; boxed so its address stays fixed.
    _sink: Box<Arc<LogFn>>,
}

impl DebugMessenger {
    pub(super) unsafe fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        sink: Arc<LogFn>,
    ) -> GpuResult<Self> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let sink = Box::new(sink);
        let user_data = &*sink as *const Arc<LogFn> as *mut c_void;

        let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback))
            .user_data(user_data);

        let messenger = loader.create_debug_utils_messenger(&info, None)?;
        Ok(Self {
            loader,
            messenger,
            _sink: sink,
        })
    }

    pub(super) unsafe fn destroy(&mut self) {
        if self.messenger != vk::DebugUtilsMessengerEXT::null() {
            self.loader
                .destroy_debug_utils_messenger(self.messenger, None);
            self.messenger = vk::DebugUtilsMessengerEXT::null();
        }
    }
}

fn severity_tag(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> &'static str {
    use vk::DebugUtilsMessageSeverityFlagsEXT as S;
    if severity.contains(S::ERROR) {
        "[ERROR]"
    } else if severity.contains(S::WARNING) {
        "[WARNING]"
    } else if severity.contains(S::INFO) {
        "[INFO]"
    } else if severity.contains(S::VERBOSE) {
        "[VERBOSE]"
    } else {
        "[UNKNOWN]"
    }
}

fn type_tag(types: vk::DebugUtilsMessageTypeFlagsEXT) -> String {
    use vk::DebugUtilsMessageTypeFlagsEXT as T;
    let names: Vec<&str> = [
        (T::PERFORMANCE, "PERFORMANCE"),
        (T::VALIDATION, "VALIDATION"),
        (T::GENERAL, "GENERAL"),
    ]
    .into_iter()
    .filter(|(bit, _)| types.contains(*bit))
    .map(|(_, name)| name)
    .collect();
    format!("[{}]", names.join(","))
}

/// `[LAYER] [SEVERITY] [TYPES] message`
pub(super) fn format_layer_message(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    types: vk::DebugUtilsMessageTypeFlagsEXT,
    message: &str,
) -> String {
    format!(
        "[LAYER] {} {} {}",
        severity_tag(severity),
        type_tag(types),
        message
    )
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    user_data: *mut c_void,
) -> vk::Bool32 {
    if data.is_null() || user_data.is_null() {
        return vk::FALSE;
    }
    let data = &*data;
    let message = if data.p_message.is_null() {
        "".into()
    } else {
        CStr::from_ptr(data.p_message).to_string_lossy()
    };

    let sink = &*(user_data as *const Arc<LogFn>);
    sink(&format_layer_message(severity, types, &message));

    vk::FALSE
}
