use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{Discovery, HardwareId};

/// How many directories above the tty's `device` link to search for the
/// USB device's id files. The link usually points at the interface, one
/// level below the device.
const MAX_ANCESTORS: usize = 4;

/// Device node prefixes used by USB serial drivers.
const PREFIXES: [&str; 2] = ["ttyUSB", "ttyACM"];

/// Linux discovery through `/dev` and `/sys/class/tty`.
#[derive(Debug, Clone)]
pub struct SysfsDiscovery {
    dev_dir: PathBuf,
    tty_class_dir: PathBuf,
}

impl SysfsDiscovery {
    pub fn new() -> Self {
        Self::with_roots("/dev", "/sys/class/tty")
    }

    /// Discovery rooted somewhere other than the live `/dev` and `/sys`.
    pub fn with_roots<D: Into<PathBuf>, S: Into<PathBuf>>(dev_dir: D, tty_class_dir: S) -> Self {
        Self {
            dev_dir: dev_dir.into(),
            tty_class_dir: tty_class_dir.into(),
        }
    }

    fn read_id(dir: &Path, file: &str) -> io::Result<String> {
        Ok(fs::read_to_string(dir.join(file))?.trim().to_string())
    }
}

impl Default for SysfsDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl Discovery for SysfsDiscovery {
    fn candidates(&self) -> io::Result<Vec<String>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.dev_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if PREFIXES.iter().any(|p| name.starts_with(p)) {
                found.push(entry.path().to_string_lossy().into_owned());
            }
        }
        // read_dir order is arbitrary; keep ttyUSB0 ahead of ttyUSB1.
        found.sort();
        Ok(found)
    }

    fn identify(&self, endpoint: &str) -> io::Result<HardwareId> {
        let name = Path::new(endpoint)
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no device name"))?;
        let device = fs::canonicalize(self.tty_class_dir.join(name).join("device"))?;

        for dir in device.ancestors().take(MAX_ANCESTORS) {
            if dir.join("idVendor").is_file() {
                return Ok(HardwareId::Ids {
                    vendor: Self::read_id(dir, "idVendor")?,
                    product: Self::read_id(dir, "idProduct")?,
                });
            }
        }

        Err(io::Error::new(
            io::ErrorKind::NotFound,
            "no USB ids above tty device",
        ))
    }
}
