//! Flattened single-gateway views kept for dashboards written against the
//! old one-gateway proxy. All of them read the same `DeviceStatus`; an
//! offline gateway yields nulls (or empty CSV fields), never stale values.

use serde::Serialize;

use crate::gateway::DeviceStatus;

pub const CSV_HEADER: &str = "Grid,Home,Solar,Battery,BatteryLevel";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegacyPower {
    pub site: Option<f64>,
    pub solar: Option<f64>,
    pub battery: Option<f64>,
    pub load: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegacyBattery {
    pub power: Option<f64>,
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegacySoe {
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Meter {
    pub instant_power: f64,
}

/// Meter-style layout: `{"site": {"instant_power": ..}, ...}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegacyMeters {
    pub site: Meter,
    pub battery: Meter,
    pub load: Meter,
    pub solar: Meter,
}

pub fn power(status: &DeviceStatus) -> LegacyPower {
    let flow = status.current_flow();
    LegacyPower {
        site: flow.map(|f| f.site_power),
        solar: flow.map(|f| f.solar_power),
        battery: flow.map(|f| f.battery_power),
        load: flow.map(|f| f.load_power),
    }
}

pub fn battery(status: &DeviceStatus) -> LegacyBattery {
    let flow = status.current_flow();
    LegacyBattery {
        power: flow.map(|f| f.battery_power),
        percent: flow.map(|f| f.battery_percent),
    }
}

pub fn soe(status: &DeviceStatus) -> LegacySoe {
    LegacySoe {
        percentage: status.current_flow().map(|f| f.battery_percent),
    }
}

pub fn meters(status: &DeviceStatus) -> Option<LegacyMeters> {
    status.current_flow().map(|f| LegacyMeters {
        site: Meter {
            instant_power: f.site_power,
        },
        battery: Meter {
            instant_power: f.battery_power,
        },
        load: Meter {
            instant_power: f.load_power,
        },
        solar: Meter {
            instant_power: f.solar_power,
        },
    })
}

/// One CSV line in the fixed order grid, home, solar, battery, battery level.
pub fn csv_line(status: &DeviceStatus) -> String {
    match status.current_flow() {
        Some(f) => format!(
            "{:.2},{:.2},{:.2},{:.2},{:.2}\n",
            f.site_power, f.load_power, f.solar_power, f.battery_power, f.battery_percent
        ),
        None => ",,,,\n".to_string(),
    }
}
