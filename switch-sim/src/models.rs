//! Entity model of the simulated switch.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use time::OffsetDateTime;

/// Fan flip probability per fast tick.
pub const FAN_FLIP_PROBABILITY: f64 = 1.0 / 200.0;
/// PSU flip probability per fast tick.
pub const PSU_FLIP_PROBABILITY: f64 = 1.0 / 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanStatus {
    Normal,
    Failed,
}

impl FanStatus {
    pub fn code(self) -> i32 {
        match self {
            FanStatus::Normal => 1,
            FanStatus::Failed => 2,
        }
    }

    fn toggled(self) -> Self {
        match self {
            FanStatus::Normal => FanStatus::Failed,
            FanStatus::Failed => FanStatus::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PsuStatus {
    Normal,
    Failed,
    /// Only reachable through configuration.
    NotPresent,
}

impl PsuStatus {
    pub fn code(self) -> i32 {
        match self {
            PsuStatus::Normal => 1,
            PsuStatus::Failed => 2,
            PsuStatus::NotPresent => 3,
        }
    }

    fn toggled(self) -> Option<Self> {
        match self {
            PsuStatus::Normal => Some(PsuStatus::Failed),
            PsuStatus::Failed => Some(PsuStatus::Normal),
            PsuStatus::NotPresent => None,
        }
    }
}

/// One simulated port.
#[derive(Debug, Clone)]
pub struct Interface {
    pub index: i32,
    pub descr: String,
    pub admin_status: LinkStatus,
    pub oper_status: LinkStatus,
    pub in_octets: u64,
    pub out_octets: u64,
    pub last_in_octets: u64,
    pub last_out_octets: u64,
    pub last_sample_time: Instant,
    pub in_errors: u64,
    pub out_discards: u64,
}

impl Interface {
    pub fn new(index: i32, descr: impl Into<String>, admin: LinkStatus, oper: LinkStatus, now: Instant) -> Self {
        Self {
            index,
            descr: descr.into(),
            admin_status: admin,
            oper_status: oper,
            in_octets: 0,
            out_octets: 0,
            last_in_octets: 0,
            last_out_octets: 0,
            last_sample_time: now,
            in_errors: 0,
            out_discards: 0,
        }
    }

    pub fn is_up(&self) -> bool {
        self.oper_status == LinkStatus::Up
    }

    /// In/out bytes per second since the last baseline.
    ///
    /// The baseline only moves on the slow cycle, so between slow ticks the
    /// numerator is fixed while the elapsed time grows: the rate decays as
    /// 1/elapsed and jumps right after each traffic increment.
    ///
    /// Returns `None` when `now` is not after the baseline (a fast tick that
    /// raced a concurrent rebaseline); callers keep the previous rate then.
    pub fn octet_rates(&self, now: Instant) -> Option<(f64, f64)> {
        if !self.is_up() {
            return Some((0.0, 0.0));
        }
        let elapsed = now.saturating_duration_since(self.last_sample_time).as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        let in_delta = self.in_octets.saturating_sub(self.last_in_octets) as f64;
        let out_delta = self.out_octets.saturating_sub(self.last_out_octets) as f64;
        Some((in_delta / elapsed, out_delta / elapsed))
    }

    /// Captures the current counters as the rate baseline.
    pub fn rebaseline(&mut self, now: Instant) {
        self.last_in_octets = self.in_octets;
        self.last_out_octets = self.out_octets;
        self.last_sample_time = now;
    }
}

#[derive(Debug, Clone)]
pub struct Fan {
    pub index: i32,
    pub descr: String,
    pub status: FanStatus,
    /// Permanently faulty units never flip.
    pub pinned: bool,
}

impl Fan {
    /// Flips Normal↔Failed with probability `p`. Returns true on a flip.
    pub fn roll<R: Rng + ?Sized>(&mut self, rng: &mut R, p: f64) -> bool {
        if self.pinned || !rng.random_bool(p) {
            return false;
        }
        self.status = self.status.toggled();
        true
    }
}

#[derive(Debug, Clone)]
pub struct PowerSupply {
    pub index: i32,
    pub descr: String,
    pub status: PsuStatus,
    pub pinned: bool,
}

impl PowerSupply {
    pub fn roll<R: Rng + ?Sized>(&mut self, rng: &mut R, p: f64) -> bool {
        if self.pinned || !rng.random_bool(p) {
            return false;
        }
        match self.status.toggled() {
            Some(next) => {
                self.status = next;
                true
            }
            None => false,
        }
    }
}

/// Bounded random walk over an integer-stepped gauge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedWalk {
    pub value: f64,
    pub step: i32,
    pub floor: f64,
    pub ceiling: f64,
}

impl BoundedWalk {
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        let delta = rng.random_range(-self.step..=self.step) as f64;
        self.value = (self.value + delta).clamp(self.floor, self.ceiling);
        self.value
    }
}

/// Device-wide gauges. Only the fast cycle mutates these.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceScalars {
    pub cpu: BoundedWalk,
    pub temperature: BoundedWalk,
    pub memory_util: BoundedWalk,
    pub arp_entries: u32,
    pub mac_entries: u32,
    pub tcp_connections: u32,
}

impl DeviceScalars {
    pub fn initial<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            cpu: BoundedWalk {
                value: rng.random_range(10..=39) as f64,
                step: 5,
                floor: 5.0,
                ceiling: 90.0,
            },
            temperature: BoundedWalk {
                value: rng.random_range(25..=65) as f64,
                step: 2,
                floor: 20.0,
                ceiling: 75.0,
            },
            memory_util: BoundedWalk {
                value: rng.random_range(30..=60) as f64,
                step: 3,
                floor: 10.0,
                ceiling: 95.0,
            },
            arp_entries: rng.random_range(50..250),
            mac_entries: rng.random_range(100..600),
            tcp_connections: rng.random_range(20..120),
        }
    }

    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cpu.advance(rng);
        self.temperature.advance(rng);
        self.memory_util.advance(rng);
        self.arp_entries = rng.random_range(50..500);
        self.mac_entries = rng.random_range(100..1000);
        self.tcp_connections = rng.random_range(20..300);
    }
}

/// Process-level counters of the simulator itself.
#[derive(Debug, Clone, PartialEq)]
pub struct AppRuntimeStats {
    pub allocated_bytes: u64,
    pub obtained_bytes: u64,
    pub live_tasks: usize,
    /// Observed memory reclaims. Never decreases.
    pub reclaim_count: u64,
    pub last_reclaim: Option<OffsetDateTime>,
    pub uptime: Duration,
}
