use wiggler_core::DevicePreference;

use crate::backend::{AdapterInfo, Capabilities};

/// Picks the adapter to render with.
///
/// Candidates that do not satisfy `required` are discarded. Among the rest, a
/// `preference.name` substring match (case-insensitive) wins, then a
/// `preference.kind` match, then the first candidate in enumeration order.
pub fn select_adapter<'a>(
    adapters: &'a [AdapterInfo],
    required: Capabilities,
    preference: &DevicePreference,
) -> Option<&'a AdapterInfo> {
    let mut capable = adapters.iter().filter(|a| a.satisfies(required));
    let first = capable.clone().next()?;

    if let Some(name) = preference.name.as_deref() {
        let needle = name.to_lowercase();
        if let Some(hit) = capable
            .clone()
            .find(|a| a.name.to_lowercase().contains(&needle))
        {
            return Some(hit);
        }
        log::warn!("no capable GPU matches name \"{name}\"");
    }

    if let Some(kind) = preference.kind {
        if let Some(hit) = capable.find(|a| a.kind == kind) {
            return Some(hit);
        }
        log::warn!("no capable GPU of kind {kind:?}");
    }

    Some(first)
}
