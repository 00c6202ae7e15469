//! Bus id to device handle resolution
//!
//! Backend-local indices can change between calls, so every lookup
//! rescans the device list from index 0. Nothing is cached.

use crate::domain::BusId;
use crate::nvml::traits::NvmlApi;

/// Find the handle of the device sitting on `bus`
///
/// Indices whose handle or PCI info cannot be read are skipped. Returns
/// the first match, or `None` if the count query fails or no device
/// matches.
pub fn resolve<A: NvmlApi + ?Sized>(api: &A, bus: BusId) -> Option<A::Handle> {
    let count = match api.device_count() {
        Ok(count) => count,
        Err(e) => {
            log::trace!("NVML: device count failed while resolving bus {bus}: {e}");
            return None;
        }
    };

    (0..count).find_map(|index| {
        let handle = api.handle_by_index(index).ok()?;
        let pci = api.pci_info(handle).ok()?;
        (pci.bus() == bus).then_some(handle)
    })
}
