use crate::error::SimError;
use crate::models::{FanStatus, LinkStatus, PsuStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

pub const DEFAULT_HTTP_PORT: u16 = 9116;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SimConfig {
    pub http_port: u16,
    pub fast_interval_ms: u64,
    pub slow_interval_ms: u64,
    pub device: DeviceConf,
    pub interfaces: Vec<InterfaceConf>,
    pub fans: Vec<FanConf>,
    pub psus: Vec<PsuConf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeviceConf {
    pub sys_descr: String,
    pub sys_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InterfaceConf {
    pub index: i32,
    pub descr: String,
    pub admin_status: LinkStatus,
    pub oper_status: LinkStatus,
    /// Upper bound (exclusive) of the random initial counters. Zero starts at 0.
    #[serde(default)]
    pub max_initial_in_octets: u64,
    #[serde(default)]
    pub max_initial_out_octets: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FanConf {
    pub index: i32,
    pub descr: String,
    pub status: FanStatus,
    #[serde(default)]
    pub pinned: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PsuConf {
    pub index: i32,
    pub descr: String,
    pub status: PsuStatus,
    #[serde(default)]
    pub pinned: bool,
}

impl Default for DeviceConf {
    fn default() -> Self {
        Self {
            sys_descr: "H3C S5120-52P-SI Switch Software Version 5.20, Release 1115P01 (Simulated)".into(),
            sys_name: "H3C-Simulated-Switch-01".into(),
        }
    }
}

fn iface(index: i32, descr: &str, admin: LinkStatus, oper: LinkStatus, max_in: u64, max_out: u64) -> InterfaceConf {
    InterfaceConf {
        index,
        descr: descr.into(),
        admin_status: admin,
        oper_status: oper,
        max_initial_in_octets: max_in,
        max_initial_out_octets: max_out,
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        use LinkStatus::{Down, Up};
        Self {
            http_port: DEFAULT_HTTP_PORT,
            fast_interval_ms: 1_000,
            slow_interval_ms: 5_000,
            device: DeviceConf::default(),
            interfaces: vec![
                iface(1, "GigabitEthernet1/0/1", Up, Up, 100_000, 200_000),
                iface(2, "GigabitEthernet1/0/2", Up, Up, 150_000, 250_000),
                iface(3, "GigabitEthernet1/0/3", Up, Down, 0, 0),
                iface(4, "GigabitEthernet1/0/4", Down, Down, 0, 0),
                iface(5, "Ten-GigabitEthernet1/0/1", Up, Up, 1_000_000, 2_000_000),
            ],
            fans: vec![
                FanConf { index: 1, descr: "FAN1_SLOT1".into(), status: FanStatus::Normal, pinned: false },
                FanConf { index: 2, descr: "FAN2_SLOT1".into(), status: FanStatus::Normal, pinned: false },
            ],
            psus: vec![
                PsuConf { index: 1, descr: "PSU1_SLOT1".into(), status: PsuStatus::Normal, pinned: false },
                PsuConf { index: 2, descr: "PSU2_SLOT1".into(), status: PsuStatus::Failed, pinned: true },
            ],
        }
    }
}

impl SimConfig {
    pub fn fast_interval(&self) -> Duration {
        Duration::from_millis(self.fast_interval_ms)
    }

    pub fn slow_interval(&self) -> Duration {
        Duration::from_millis(self.slow_interval_ms)
    }

    /// sysUpTime advance per slow cycle, in hundredths of a second.
    pub fn slow_interval_ticks(&self) -> Result<u32, SimError> {
        if self.slow_interval_ms % 10 != 0 {
            return Err(SimError::InvalidConfig(format!(
                "slow_interval_ms {} is not a whole number of 10 ms ticks",
                self.slow_interval_ms
            )));
        }
        u32::try_from(self.slow_interval_ms / 10).map_err(|_| {
            SimError::InvalidConfig(format!("slow_interval_ms {} overflows 32-bit ticks", self.slow_interval_ms))
        })
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.fast_interval_ms == 0 || self.slow_interval_ms == 0 {
            return Err(SimError::InvalidConfig("cycle intervals must be positive".into()));
        }
        self.slow_interval_ticks()?;
        if self.interfaces.is_empty() {
            return Err(SimError::InvalidConfig("at least one interface is required".into()));
        }
        unique_indices("interface", self.interfaces.iter().map(|i| i.index))?;
        unique_indices("fan", self.fans.iter().map(|f| f.index))?;
        unique_indices("psu", self.psus.iter().map(|p| p.index))?;
        Ok(())
    }
}

fn unique_indices(kind: &str, indices: impl Iterator<Item = i32>) -> Result<(), SimError> {
    let mut seen = HashSet::new();
    for index in indices {
        if !seen.insert(index) {
            return Err(SimError::InvalidConfig(format!("duplicate {kind} index {index}")));
        }
    }
    Ok(())
}

fn parse_config(txt: &str) -> SimConfig {
    if txt.trim().is_empty() {
        return SimConfig::default();
    }
    serde_yaml::from_str(txt).unwrap_or_else(|e| {
        warn!("invalid config, using defaults: {e}");
        SimConfig::default()
    })
}

/// Reads the YAML file named by `SWITCH_SIM_CONFIG`, then applies `HTTP_PORT`.
pub async fn load_config() -> Result<SimConfig, SimError> {
    let path = std::env::var("SWITCH_SIM_CONFIG").unwrap_or_else(|_| "switch-sim.yaml".into());
    let mut cfg = if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        parse_config(&txt)
    } else {
        info!("no {path}, using built-in device inventory");
        SimConfig::default()
    };

    if let Ok(port) = std::env::var("HTTP_PORT") {
        if !port.is_empty() {
            cfg.http_port = port
                .parse()
                .map_err(|_| SimError::InvalidConfig(format!("HTTP_PORT is not a port number: {port}")))?;
        }
    }

    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_inventory() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.http_port, 9116);
        assert_eq!(cfg.fast_interval(), Duration::from_secs(1));
        assert_eq!(cfg.slow_interval(), Duration::from_secs(5));
        assert_eq!(cfg.interfaces.len(), 5);
        assert_eq!(cfg.fans.len(), 2);
        assert!(cfg.psus.iter().any(|p| p.pinned && p.status == PsuStatus::Failed));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = parse_config(
            r#"
slow_interval_ms: 2000
psus:
  - index: 1
    descr: PSU1_SLOT1
    status: not_present
"#,
        );
        assert_eq!(cfg.slow_interval_ms, 2000);
        assert_eq!(cfg.fast_interval_ms, 1000);
        assert_eq!(cfg.interfaces.len(), 5);
        assert_eq!(cfg.psus.len(), 1);
        assert_eq!(cfg.psus[0].status, PsuStatus::NotPresent);
        assert!(!cfg.psus[0].pinned);
    }

    #[test]
    fn test_garbage_yaml_falls_back() {
        let cfg = parse_config("interfaces: [this is: not valid");
        assert_eq!(cfg.interfaces.len(), 5);
        assert!(parse_config("   \n").validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_inventory() {
        let mut cfg = SimConfig::default();
        cfg.fans[1].index = cfg.fans[0].index;
        assert!(matches!(cfg.validate(), Err(SimError::InvalidConfig(_))));

        let mut cfg = SimConfig::default();
        cfg.slow_interval_ms = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = SimConfig::default();
        cfg.interfaces.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_slow_interval_must_be_whole_ticks() {
        let mut cfg = SimConfig::default();
        assert_eq!(cfg.slow_interval_ticks().unwrap(), 500);

        cfg.slow_interval_ms = 5_005;
        assert!(matches!(cfg.validate(), Err(SimError::InvalidConfig(_))));

        cfg.slow_interval_ms = (u64::from(u32::MAX) + 1) * 10;
        assert!(matches!(cfg.slow_interval_ticks(), Err(SimError::InvalidConfig(_))));

        cfg.slow_interval_ms = u64::from(u32::MAX) * 10;
        assert_eq!(cfg.slow_interval_ticks().unwrap(), u32::MAX);
        assert!(cfg.validate().is_ok());
    }
}
