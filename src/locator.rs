//! Finding the counter among the host's serial ports.
//!
//! Each host family exposes USB identification differently, so discovery is
//! split into a [`Discovery`] implementation per host that lists candidate
//! endpoints and reports what it knows about each one. Matching against a
//! [`Signature`] is shared.

use std::fmt;
use std::io;

use crate::Error;

mod sysfs;
mod usb;

pub use sysfs::SysfsDiscovery;
pub use usb::UsbDiscovery;

/// USB vendor/product pair identifying the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Spectrum Techniques STx counters.
pub const STX_SIGNATURE: Signature = Signature::new(0x12AB, 0x0001);

impl Signature {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    /// `VID_xxxx&PID_xxxx` token as it appears in Windows hardware ids.
    pub fn descriptor_token(&self) -> String {
        format!("VID_{:04X}&PID_{:04X}", self.vendor_id, self.product_id)
    }

    pub fn matches(&self, id: &HardwareId) -> bool {
        match id {
            HardwareId::Ids { vendor, product } => {
                normalize(vendor) == format!("{:04X}", self.vendor_id)
                    && normalize(product) == format!("{:04X}", self.product_id)
            }
            HardwareId::Descriptor(text) => {
                let text = text.to_ascii_uppercase();
                let token = self.descriptor_token();
                // The product id must not run on into further hex digits.
                text.match_indices(&token).any(|(at, _)| {
                    !text[at + token.len()..]
                        .chars()
                        .next()
                        .map_or(false, |c| c.is_ascii_hexdigit())
                })
            }
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}:{:04X}", self.vendor_id, self.product_id)
    }
}

fn normalize(hex: &str) -> String {
    hex.trim().to_ascii_uppercase()
}

/// Identification metadata reported by the host for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareId {
    /// Separate vendor and product id strings, e.g. sysfs `idVendor` files.
    Ids { vendor: String, product: String },
    /// A free-form descriptor containing a `VID_xxxx&PID_xxxx` token, as
    /// stored under the Windows `Enum` registry keys. None of the bundled
    /// discoveries read the registry; this is for `Discovery`
    /// implementations that do.
    Descriptor(String),
}

/// A host-specific way of listing and identifying serial endpoints.
pub trait Discovery {
    /// Candidate endpoints, in the order they should be tried.
    fn candidates(&self) -> io::Result<Vec<String>>;

    /// Reads the identification metadata for one candidate.
    fn identify(&self, endpoint: &str) -> io::Result<HardwareId>;
}

/// Returns the first candidate whose metadata matches `signature`.
///
/// Candidates that cannot be inspected are skipped. Failing to enumerate at
/// all is treated the same as finding no candidates.
pub fn find_endpoint(discovery: &dyn Discovery, signature: &Signature) -> Result<String, Error> {
    let candidates = discovery.candidates().unwrap_or_else(|err| {
        log::warn!("failed to enumerate serial ports: {}", err);
        Vec::new()
    });

    for endpoint in candidates {
        match discovery.identify(&endpoint) {
            Ok(id) if signature.matches(&id) => {
                log::info!("found {} at {}", signature, endpoint);
                return Ok(endpoint);
            }
            Ok(id) => log::debug!("{}: {:?} does not match {}", endpoint, id, signature),
            Err(err) => log::debug!("{}: skipped, {}", endpoint, err),
        }
    }

    Err(Error::DeviceNotFound(*signature))
}

/// The discovery mechanism native to the build target.
pub fn host_discovery() -> Box<dyn Discovery> {
    #[cfg(target_os = "linux")]
    {
        Box::new(SysfsDiscovery::new())
    }

    #[cfg(not(target_os = "linux"))]
    {
        Box::new(UsbDiscovery::new())
    }
}
