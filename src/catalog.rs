//! The closed set of commands understood by STx counter firmware.
//!
//! Codes are two ASCII digits. Codes 09 through 11 are not assigned by the
//! firmware and are rejected like any other unknown code.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    ResetDevice,
    StartCounter,
    StopCounter,
    RequestStatus,
    RequestCounts,
    RequestParameters,
    RequestSystemParameters,
    StoreCurrentParameters,
    StartDemoCounter,
    HighVoltageOn,
    HighVoltageOff,
    HighVoltageOneWireOn,
    HighVoltageOneWireOff,
    RequestHighVoltageStatus,
    ReadHighVoltageData,
}

impl Command {
    /// Every command, in ascending code order.
    pub const ALL: [Command; 15] = [
        Command::ResetDevice,
        Command::StartCounter,
        Command::StopCounter,
        Command::RequestStatus,
        Command::RequestCounts,
        Command::RequestParameters,
        Command::RequestSystemParameters,
        Command::StoreCurrentParameters,
        Command::StartDemoCounter,
        Command::HighVoltageOn,
        Command::HighVoltageOff,
        Command::HighVoltageOneWireOn,
        Command::HighVoltageOneWireOff,
        Command::RequestHighVoltageStatus,
        Command::ReadHighVoltageData,
    ];

    /// Looks up a command by its two-digit code.
    ///
    /// Matching is exact: `"1"`, `" 01"` and `"001"` are not `StartCounter`.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|cmd| cmd.code() == code)
    }

    pub fn code(self) -> &'static str {
        match self {
            Command::ResetDevice => "00",
            Command::StartCounter => "01",
            Command::StopCounter => "02",
            Command::RequestStatus => "03",
            Command::RequestCounts => "04",
            Command::RequestParameters => "05",
            Command::RequestSystemParameters => "06",
            Command::StoreCurrentParameters => "07",
            Command::StartDemoCounter => "08",
            Command::HighVoltageOn => "12",
            Command::HighVoltageOff => "13",
            Command::HighVoltageOneWireOn => "14",
            Command::HighVoltageOneWireOff => "15",
            Command::RequestHighVoltageStatus => "16",
            Command::ReadHighVoltageData => "17",
        }
    }

    /// Canonical snake_case operation name.
    pub fn name(self) -> &'static str {
        match self {
            Command::ResetDevice => "reset_device",
            Command::StartCounter => "start_counter",
            Command::StopCounter => "stop_counter",
            Command::RequestStatus => "request_status",
            Command::RequestCounts => "request_counts",
            Command::RequestParameters => "request_parameters",
            Command::RequestSystemParameters => "request_system_parameters",
            Command::StoreCurrentParameters => "store_current_parameters",
            Command::StartDemoCounter => "start_demo_counter",
            Command::HighVoltageOn => "high_voltage_on",
            Command::HighVoltageOff => "high_voltage_off",
            Command::HighVoltageOneWireOn => "high_voltage_onewire_on",
            Command::HighVoltageOneWireOff => "high_voltage_onewire_off",
            Command::RequestHighVoltageStatus => "request_high_voltage_status",
            Command::ReadHighVoltageData => "read_high_voltage_data",
        }
    }

    /// One-line human description.
    pub fn description(self) -> &'static str {
        match self {
            Command::ResetDevice => "Reset device",
            Command::StartCounter => "Start counter",
            Command::StopCounter => "Stop counter",
            Command::RequestStatus => "Request status",
            Command::RequestCounts => "Request counts",
            Command::RequestParameters => "Request parameters",
            Command::RequestSystemParameters => "Request system parameters",
            Command::StoreCurrentParameters => "Store current parameters to EEPROM",
            Command::StartDemoCounter => "Start demo counter",
            Command::HighVoltageOn => "High voltage on",
            Command::HighVoltageOff => "High voltage off",
            Command::HighVoltageOneWireOn => "High voltage one-wire on",
            Command::HighVoltageOneWireOff => "High voltage one-wire off",
            Command::RequestHighVoltageStatus => "Request high voltage status",
            Command::ReadHighVoltageData => "Read high voltage data",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.name())
    }
}
