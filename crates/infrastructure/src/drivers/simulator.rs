use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Timelike, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio::time::{Instant, sleep};
use tracing::debug;

use domain::connection::{ConnectionState, GatewayConnection};
use domain::error::{ConnectionError, FetchError, PartialFetchError};
use domain::gateway::{GridStatus, PowerFlow, StringReading, SystemStatus};

/// Optional reads the simulator can be told to fail
pub const OPTIONAL_READS: [&str; 5] =
    ["vitals", "strings", "alerts", "temperatures", "system_status"];

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SimulatorConfig {
    #[serde(default = "default_capacity_wh")]
    pub capacity_wh: f64,
    #[serde(default = "default_peak_solar_w")]
    pub peak_solar_w: f64,
    #[serde(default = "default_base_load_w")]
    pub base_load_w: f64,
    /// Battery state of energy at start, percent
    #[serde(default = "default_initial_percent")]
    pub initial_percent: f64,
    /// Every required read fails with a transport error
    #[serde(default)]
    pub fail_required: bool,
    /// Names of optional reads that always fail
    #[serde(default)]
    pub fail_optional: Vec<String>,
    /// Artificial delay added to every call
    #[serde(default)]
    pub latency_ms: u64,
}

fn default_capacity_wh() -> f64 {
    13_500.0
}
fn default_peak_solar_w() -> f64 {
    5_000.0
}
fn default_base_load_w() -> f64 {
    1_500.0
}
fn default_initial_percent() -> f64 {
    50.0
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            capacity_wh: default_capacity_wh(),
            peak_solar_w: default_peak_solar_w(),
            base_load_w: default_base_load_w(),
            initial_percent: default_initial_percent(),
            fail_required: false,
            fail_optional: Vec::new(),
            latency_ms: 0,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity_wh <= 0.0 {
            return Err("capacity_wh must be positive".to_string());
        }
        if !(0.0..=100.0).contains(&self.initial_percent) {
            return Err("initial_percent must be within 0..=100".to_string());
        }
        if let Some(name) = self
            .fail_optional
            .iter()
            .find(|name| !OPTIONAL_READS.contains(&name.as_str()))
        {
            return Err(format!("unknown optional read '{}'", name));
        }
        Ok(())
    }
}

/// Synthetic home battery gateway.
///
/// Solar follows a half-sine between 06:00 and 18:00 UTC, the load wobbles
/// around its base value and the battery covers the difference until it is
/// empty or full. Energy is integrated over the time between required reads.
pub struct SimulatorConnection {
    config: SimulatorConfig,
    state: ConnectionState,
    energy_wh: f64,
    last_read: Option<Instant>,
    last_flow: PowerFlow,
}

impl SimulatorConnection {
    pub fn new(config: SimulatorConfig) -> Self {
        let energy_wh = config.capacity_wh * config.initial_percent / 100.0;
        Self {
            config,
            state: ConnectionState::Disconnected,
            energy_wh,
            last_read: None,
            last_flow: PowerFlow::default(),
        }
    }

    fn fails(&self, read: &str) -> bool {
        self.config.fail_optional.iter().any(|name| name == read)
    }

    async fn latency(&self) {
        if self.config.latency_ms > 0 {
            sleep(Duration::from_millis(self.config.latency_ms)).await;
        }
    }

    async fn optional(&self, read: &str) -> Result<(), PartialFetchError> {
        self.latency().await;
        if self.fails(read) {
            return Err(PartialFetchError::Failed(format!("simulated {} failure", read)));
        }
        Ok(())
    }

    /// Fraction of the day elapsed, 0.0..1.0
    fn day_fraction() -> f64 {
        let now = Utc::now();
        f64::from(now.num_seconds_from_midnight()) / 86_400.0
    }

    fn solar_power(&self, day: f64) -> f64 {
        // Daylight between 0.25 (06:00) and 0.75 (18:00)
        let sun = ((day - 0.25) * 2.0 * PI).sin();
        (self.config.peak_solar_w * sun).max(0.0)
    }

    fn load_power(&self, day: f64) -> f64 {
        self.config.base_load_w * (1.0 + 0.25 * (day * 4.0 * PI).sin())
    }

    fn step(&mut self, day: f64, elapsed: Duration) -> PowerFlow {
        let solar = self.solar_power(day);
        let load = self.load_power(day);
        let hours = elapsed.as_secs_f64() / 3600.0;

        // Positive battery power discharges.
        let mut battery = load - solar;
        if battery > 0.0 && self.energy_wh <= 0.0 {
            battery = 0.0;
        }
        if battery < 0.0 && self.energy_wh >= self.config.capacity_wh {
            battery = 0.0;
        }
        self.energy_wh = (self.energy_wh - battery * hours).clamp(0.0, self.config.capacity_wh);

        let round = |value: f64| (value * 10.0).round() / 10.0;
        PowerFlow {
            site_power: round(load - solar - battery),
            solar_power: round(solar),
            battery_power: round(battery),
            load_power: round(load),
            battery_percent: round(self.energy_wh / self.config.capacity_wh * 100.0),
        }
    }
}

#[async_trait]
impl GatewayConnection for SimulatorConnection {
    async fn connect(&mut self) -> Result<(), ConnectionError> {
        self.latency().await;
        self.state = ConnectionState::Connected;
        debug!("Simulator session opened");
        Ok(())
    }

    async fn fetch_required(&mut self) -> Result<PowerFlow, FetchError> {
        if !self.state.is_connected() {
            return Err(ConnectionError::Network("simulator session not open".to_string()).into());
        }
        self.latency().await;
        if self.config.fail_required {
            return Err(FetchError::Transport("simulated required read failure".to_string()));
        }

        let now = Instant::now();
        let elapsed = self
            .last_read
            .map(|last| now.duration_since(last))
            .unwrap_or_default();
        self.last_read = Some(now);
        self.last_flow = self.step(Self::day_fraction(), elapsed);
        Ok(self.last_flow)
    }

    async fn fetch_vitals(&mut self) -> Result<serde_json::Value, PartialFetchError> {
        self.optional("vitals").await?;
        Ok(json!({
            "firmware": "sim-1.0",
            "capacity_wh": self.config.capacity_wh,
            "energy_wh": self.energy_wh,
        }))
    }

    async fn fetch_strings(
        &mut self,
    ) -> Result<BTreeMap<String, StringReading>, PartialFetchError> {
        self.optional("strings").await?;
        let half = self.last_flow.solar_power / 2.0;
        let strings = ["A", "B"]
            .into_iter()
            .map(|name| {
                let voltage = if half > 0.0 { 380.0 } else { 0.0 };
                let current = if voltage > 0.0 { half / voltage } else { 0.0 };
                let reading = StringReading {
                    voltage,
                    current,
                    power: half,
                    connected: true,
                };
                (name.to_string(), reading)
            })
            .collect();
        Ok(strings)
    }

    async fn fetch_alerts(&mut self) -> Result<Vec<String>, PartialFetchError> {
        self.optional("alerts").await?;
        let mut alerts = Vec::new();
        if self.energy_wh <= 0.0 {
            alerts.push("BatteryEmpty".to_string());
        }
        if self.energy_wh >= self.config.capacity_wh {
            alerts.push("BatteryFull".to_string());
        }
        Ok(alerts)
    }

    async fn fetch_temperatures(&mut self) -> Result<BTreeMap<String, f64>, PartialFetchError> {
        self.optional("temperatures").await?;
        let heat = self.last_flow.battery_power.abs() / 1000.0;
        let mut temps = BTreeMap::new();
        temps.insert("battery".to_string(), 22.0 + heat);
        temps.insert("inverter".to_string(), 30.0 + self.last_flow.solar_power / 1000.0);
        Ok(temps)
    }

    async fn fetch_system_status(&mut self) -> Result<SystemStatus, PartialFetchError> {
        self.optional("system_status").await?;
        Ok(SystemStatus {
            grid_status: GridStatus::Connected,
            full_pack_energy_wh: self.config.capacity_wh,
            energy_remaining_wh: self.energy_wh,
            battery_blocks: 1,
        })
    }

    async fn close(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    fn backend(&self) -> &str {
        "simulator"
    }
}
