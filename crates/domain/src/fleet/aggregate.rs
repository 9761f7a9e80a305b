use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::gateway::{DeviceStatus, GatewayId};

/// Point-in-time copy of every gateway's latest status, in configuration order.
pub type RegistrySnapshot = IndexMap<GatewayId, Arc<DeviceStatus>>;

/// Fleet-wide summary derived from a [`RegistrySnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetAggregate {
    pub total_site_power: f64,
    pub total_battery_power: f64,
    pub total_load_power: f64,
    pub total_solar_power: f64,
    /// Unweighted mean state of energy of contributing gateways
    pub total_battery_percent: f64,
    pub num_devices: usize,
    pub num_online: usize,
    pub gateways: RegistrySnapshot,
    /// Most recent `last_updated` across the fleet
    pub timestamp: Option<DateTime<Utc>>,
}

/// Summed power flow of the fleet
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FleetPower {
    pub site: f64,
    pub battery: f64,
    pub load: f64,
    pub solar: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FleetSoe {
    pub percentage: f64,
    pub num_online: usize,
}

impl FleetAggregate {
    /// Aggregate of a fleet with no gateways
    pub fn empty() -> Self {
        compute(&RegistrySnapshot::new())
    }

    pub fn power(&self) -> FleetPower {
        FleetPower {
            site: self.total_site_power,
            battery: self.total_battery_power,
            load: self.total_load_power,
            solar: self.total_solar_power,
        }
    }

    pub fn soe(&self) -> FleetSoe {
        FleetSoe {
            percentage: self.total_battery_percent,
            num_online: self.num_online,
        }
    }
}

/// Derive the fleet aggregate. Pure: no I/O, no clock, same input, same output.
///
/// Only gateways that are online *and* carry a snapshot count towards the
/// power and percent figures; `num_online` counts the online flag alone.
pub fn compute(statuses: &RegistrySnapshot) -> FleetAggregate {
    let mut total_site_power = 0.0;
    let mut total_battery_power = 0.0;
    let mut total_load_power = 0.0;
    let mut total_solar_power = 0.0;
    let mut percent_sum = 0.0;
    let mut contributing = 0usize;
    let mut num_online = 0usize;
    let mut timestamp: Option<DateTime<Utc>> = None;

    for status in statuses.values() {
        if status.online {
            num_online += 1;
        }
        if let Some(updated) = status.last_updated {
            timestamp = Some(timestamp.map_or(updated, |t| t.max(updated)));
        }

        let Some(flow) = status.current_flow() else {
            continue;
        };
        total_site_power += flow.site_power;
        total_battery_power += flow.battery_power;
        total_load_power += flow.load_power;
        total_solar_power += flow.solar_power;
        percent_sum += flow.battery_percent;
        contributing += 1;
    }

    // TODO: offer a mean weighted by system_status.full_pack_energy_wh
    // for mixed-capacity fleets
    let total_battery_percent = if contributing == 0 {
        0.0
    } else {
        percent_sum / contributing as f64
    };

    FleetAggregate {
        total_site_power,
        total_battery_power,
        total_load_power,
        total_solar_power,
        total_battery_percent,
        num_devices: statuses.len(),
        num_online,
        gateways: statuses.clone(),
        timestamp,
    }
}
