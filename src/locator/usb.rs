use std::io;

use parking_lot::Mutex;
use serialport::{available_ports, SerialPortInfo, SerialPortType};

use super::{Discovery, HardwareId};

/// Discovery through `serialport`'s own enumeration, which reads the USB
/// ids from SetupAPI on Windows and IOKit on macOS.
///
/// The port list from the last enumeration is kept so that identifying each
/// candidate does not enumerate the host again.
#[derive(Debug, Default)]
pub struct UsbDiscovery {
    ports: Mutex<Vec<SerialPortInfo>>,
}

impl UsbDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    fn enumerate(&self) -> io::Result<Vec<SerialPortInfo>> {
        let ports = available_ports()?;
        *self.ports.lock() = ports.clone();
        Ok(ports)
    }

    fn lookup(&self, endpoint: &str) -> Option<SerialPortInfo> {
        self.ports
            .lock()
            .iter()
            .find(|p| p.port_name == endpoint)
            .cloned()
    }
}

/// USB ids of an enumerated port, as 4-digit uppercase hex.
fn hardware_id(port_type: &SerialPortType) -> Option<HardwareId> {
    match port_type {
        SerialPortType::UsbPort(usb) => Some(HardwareId::Ids {
            vendor: format!("{:04X}", usb.vid),
            product: format!("{:04X}", usb.pid),
        }),
        _ => None,
    }
}

impl Discovery for UsbDiscovery {
    fn candidates(&self) -> io::Result<Vec<String>> {
        Ok(self.enumerate()?.into_iter().map(|p| p.port_name).collect())
    }

    fn identify(&self, endpoint: &str) -> io::Result<HardwareId> {
        let port = match self.lookup(endpoint) {
            Some(port) => port,
            // Not seen in the last enumeration; the port may be new.
            None => self
                .enumerate()?
                .into_iter()
                .find(|p| p.port_name == endpoint)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "port disappeared"))?,
        };
        hardware_id(&port.port_type)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Unsupported, "not a USB port"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::STX_SIGNATURE;
    use serialport::UsbPortInfo;

    #[test]
    fn usb_port_ids_are_formatted_for_matching() {
        let port_type = SerialPortType::UsbPort(UsbPortInfo {
            vid: 0x12AB,
            pid: 0x0001,
            serial_number: None,
            manufacturer: Some("Spectrum Techniques".to_string()),
            product: None,
        });
        let id = hardware_id(&port_type).expect("usb port");
        assert_eq!(
            id,
            HardwareId::Ids {
                vendor: "12AB".into(),
                product: "0001".into()
            }
        );
        assert!(STX_SIGNATURE.matches(&id));
    }

    #[test]
    fn identify_uses_the_enumerated_list() {
        let discovery = UsbDiscovery {
            ports: Mutex::new(vec![
                SerialPortInfo {
                    port_name: "COM1".into(),
                    port_type: SerialPortType::PciPort,
                },
                SerialPortInfo {
                    port_name: "COM7".into(),
                    port_type: SerialPortType::UsbPort(UsbPortInfo {
                        vid: 0x12AB,
                        pid: 0x0001,
                        serial_number: None,
                        manufacturer: None,
                        product: None,
                    }),
                },
            ]),
        };

        let id = discovery.identify("COM7").expect("cached usb port");
        assert!(STX_SIGNATURE.matches(&id));
        let err = discovery.identify("COM1").expect_err("pci port has no ids");
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn non_usb_ports_have_no_ids() {
        assert_eq!(hardware_id(&SerialPortType::PciPort), None);
        assert_eq!(hardware_id(&SerialPortType::Unknown), None);
    }
}
