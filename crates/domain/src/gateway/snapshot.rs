use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Mandatory power-flow reading of a gateway.
///
/// Powers are in watts, signed as reported by the device: positive site power
/// means importing from the grid, positive battery power means discharging.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PowerFlow {
    pub site_power: f64,
    pub solar_power: f64,
    pub battery_power: f64,
    pub load_power: f64,
    /// State of energy, 0..=100
    pub battery_percent: f64,
}

/// One PV string as reported by the inverter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StringReading {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridStatus {
    Connected,
    Islanded,
    Transition,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub grid_status: GridStatus,
    pub full_pack_energy_wh: f64,
    pub energy_remaining_wh: f64,
    pub battery_blocks: u32,
}

/// Telemetry captured by one successful poll.
///
/// `aggregates` always comes from the required read. Every other field is an
/// independent enrichment that is `None` when its read failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub aggregates: PowerFlow,
    pub vitals: Option<serde_json::Value>,
    pub strings: Option<BTreeMap<String, StringReading>>,
    pub alerts: Option<Vec<String>>,
    pub temperatures: Option<BTreeMap<String, f64>>,
    pub system_status: Option<SystemStatus>,
}

impl Snapshot {
    /// A snapshot carrying only the required reading.
    pub fn new(aggregates: PowerFlow) -> Self {
        Self {
            aggregates,
            vitals: None,
            strings: None,
            alerts: None,
            temperatures: None,
            system_status: None,
        }
    }
}
