//! Device model: identity, discovery, and raw-data interface selection.

use crate::error::{Error, Result};
use crate::transport::{DeviceDescriptor, HidBackend};
use crate::{ids, OFFRENO_VID};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Identifiers used to pick the keyboard's raw-data interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub usage_page: u16,
    pub usage: u16,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            vendor_id: OFFRENO_VID,
            product_id: ids::TIDBIT_PID,
            usage_page: ids::RAW_HID_USAGE_PAGE,
            usage: ids::RAW_HID_USAGE,
        }
    }
}

impl DeviceIdentity {
    /// Vendor and product id match.
    pub fn matches_product(&self, desc: &DeviceDescriptor) -> bool {
        desc.vendor_id == self.vendor_id && desc.product_id == self.product_id
    }

    /// Vendor, product, usage page, and usage all match.
    pub fn matches_interface(&self, desc: &DeviceDescriptor) -> bool {
        self.matches_product(desc) && desc.usage_page == self.usage_page && desc.usage == self.usage
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "VID=0x{:04X} PID=0x{:04X} usage_page=0x{:04X} usage=0x{:02X}",
            self.vendor_id, self.product_id, self.usage_page, self.usage
        )
    }
}

/// How a device was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Exact match on the raw-data usage page/usage pair.
    RawInterface,
    /// Vendor/product match only; usage metadata missing or different.
    ProductFallback,
}

/// Pick the raw-data interface from an enumeration result.
///
/// First pass requires all four identifiers. If nothing matches, the first
/// interface with the right vendor/product id is used, since some platforms do
/// not report usage metadata.
pub fn select_device<'a>(
    devices: &'a [DeviceDescriptor],
    identity: &DeviceIdentity,
) -> Option<(&'a DeviceDescriptor, MatchKind)> {
    if let Some(desc) = devices.iter().find(|d| identity.matches_interface(d)) {
        return Some((desc, MatchKind::RawInterface));
    }
    devices
        .iter()
        .find(|d| identity.matches_product(d))
        .map(|desc| (desc, MatchKind::ProductFallback))
}

/// Resolve the raw-data interface path for `identity`.
pub fn find_device(backend: &dyn HidBackend, identity: &DeviceIdentity) -> Result<String> {
    let devices = backend.enumerate()?;
    debug!(count = devices.len(), "HID enumeration complete");

    match select_device(&devices, identity) {
        Some((desc, MatchKind::RawInterface)) => {
            info!(
                path = %desc.path,
                interface = desc.interface_number,
                "Found raw HID interface"
            );
            Ok(desc.path.clone())
        }
        Some((desc, MatchKind::ProductFallback)) => {
            warn!(
                path = %desc.path,
                interface = desc.interface_number,
                usage_page = format_args!("0x{:04X}", desc.usage_page),
                "Raw HID interface not found by usage page, using fallback"
            );
            Ok(desc.path.clone())
        }
        None => Err(Error::DeviceNotFound(identity.to_string())),
    }
}

/// Every interface belonging to the configured product, raw-data interface first.
pub fn matching_interfaces(
    devices: &[DeviceDescriptor],
    identity: &DeviceIdentity,
) -> Vec<DeviceDescriptor> {
    let mut matches: Vec<DeviceDescriptor> = devices
        .iter()
        .filter(|d| identity.matches_product(d))
        .cloned()
        .collect();
    matches.sort_by_key(|d| !identity.matches_interface(d));
    matches
}

/// Enumerate attached HID interfaces through hidapi.
pub fn enumerate_devices() -> Result<Vec<DeviceDescriptor>> {
    debug!("Starting HID device enumeration");
    let api = hidapi::HidApi::new().map_err(|e| Error::Hid(e.to_string()))?;

    let devices = api
        .device_list()
        .map(|info| DeviceDescriptor {
            path: info.path().to_string_lossy().into_owned(),
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            usage_page: info.usage_page(),
            usage: info.usage(),
            interface_number: info.interface_number(),
            product: info.product_string().map(|s| s.to_string()),
            serial: info.serial_number().map(|s| s.to_string()),
        })
        .collect();
    Ok(devices)
}
