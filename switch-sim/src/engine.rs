//! Rate/health engine.
//!
//! Two periodic cycles mutate the device state. The fast cycle walks the
//! gauges, derives interface rates and flips fan/PSU health; the slow cycle
//! moves the rate baselines and grows the traffic counters. Each collection
//! has its own lock and every value is published to both read models while
//! that lock is held. No lock spans two collections.

use crate::config::SimConfig;
use crate::error::SimError;
use crate::models::{
    AppRuntimeStats, DeviceScalars, Fan, Interface, PowerSupply, FAN_FLIP_PROBABILITY, PSU_FLIP_PROBABILITY,
};
use crate::oid;
use crate::publisher::{DeviceMetrics, Publisher};
use crate::runtime::RuntimeTracker;
use crate::state::{new_state, Shared};
use crate::store::{OidStore, OidValue};
use parking_lot::Mutex;
use prometheus::Registry;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::{debug, info};

/// Chance per Up interface per slow cycle of an error/discard burst.
const ERROR_BURST_PROBABILITY: f64 = 0.02;

pub struct Simulator {
    registry: Registry,
    publisher: Publisher,
    interfaces: Shared<Vec<Interface>>,
    fans: Shared<Vec<Fan>>,
    psus: Shared<Vec<PowerSupply>>,
    scalars: Mutex<DeviceScalars>,
    runtime: RuntimeTracker,
    published_reclaims: Mutex<u64>,
    fast_interval: Duration,
    slow_interval: Duration,
    slow_interval_ticks: u32,
}

impl Simulator {
    /// Builds every entity, registers every metric and seeds the static store entries.
    pub fn new(config: &SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let mut rng = rand::rng();
        let now = Instant::now();

        let registry = Registry::new();
        let metrics = DeviceMetrics::register(&registry)?;

        let interfaces: Vec<Interface> = config
            .interfaces
            .iter()
            .map(|conf| {
                let mut iface = Interface::new(conf.index, conf.descr.clone(), conf.admin_status, conf.oper_status, now);
                if iface.is_up() {
                    iface.in_octets = random_below(&mut rng, conf.max_initial_in_octets);
                    iface.out_octets = random_below(&mut rng, conf.max_initial_out_octets);
                }
                debug!(
                    "interface {} (index {}): admin {:?}, oper {:?}",
                    iface.descr, iface.index, iface.admin_status, iface.oper_status
                );
                iface
            })
            .collect();
        let fans: Vec<Fan> = config
            .fans
            .iter()
            .map(|conf| Fan {
                index: conf.index,
                descr: conf.descr.clone(),
                status: conf.status,
                pinned: conf.pinned,
            })
            .collect();
        let psus: Vec<PowerSupply> = config
            .psus
            .iter()
            .map(|conf| PowerSupply {
                index: conf.index,
                descr: conf.descr.clone(),
                status: conf.status,
                pinned: conf.pinned,
            })
            .collect();
        let scalars = DeviceScalars::initial(&mut rng);

        let store = OidStore::new();
        let seed = [
            (oid::sys_descr(), OidValue::text(&config.device.sys_descr)),
            (oid::sys_uptime(), OidValue::TimeTicks(rng.random_range(12_345_000..13_345_000))),
            (oid::sys_name(), OidValue::text(&config.device.sys_name)),
            (oid::if_number(), OidValue::Integer(interfaces.len() as i32)),
            (oid::sim_version(), OidValue::text(env!("CARGO_PKG_VERSION"))),
            (oid::sim_tasks(), OidValue::Gauge32(0)),
            (oid::sim_reclaims(), OidValue::Counter32(0)),
            (oid::sim_memory_mb(), OidValue::Gauge32(0)),
            (oid::sim_uptime(), OidValue::TimeTicks(0)),
            (oid::device_cpu(), OidValue::Gauge32(0)),
            (oid::device_memory_util(), OidValue::Gauge32(0)),
            (oid::device_temperature(), OidValue::Integer(scalars.temperature.value as i32)),
            (oid::arp_entries(), OidValue::Gauge32(scalars.arp_entries)),
            (oid::mac_entries(), OidValue::Gauge32(scalars.mac_entries)),
            (oid::tcp_connections(), OidValue::Gauge32(scalars.tcp_connections)),
        ];
        for (key, value) in seed {
            store.upsert(&key, value)?;
        }

        Ok(Self {
            registry,
            publisher: Publisher::new(metrics, store),
            interfaces: new_state(interfaces),
            fans: new_state(fans),
            psus: new_state(psus),
            scalars: Mutex::new(scalars),
            runtime: RuntimeTracker::new(now),
            published_reclaims: Mutex::new(0),
            fast_interval: config.fast_interval(),
            slow_interval: config.slow_interval(),
            slow_interval_ticks: config.slow_interval_ticks()?,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &OidStore {
        &self.publisher.store
    }

    pub fn interface_count(&self) -> usize {
        self.interfaces.read().len()
    }

    pub fn fan_count(&self) -> usize {
        self.fans.read().len()
    }

    pub fn psu_count(&self) -> usize {
        self.psus.read().len()
    }

    /// Latest process stats, with live task count and age read now.
    pub fn runtime_stats(&self) -> AppRuntimeStats {
        self.runtime.snapshot()
    }

    /// Samples the process once without publishing, so readers see real values before the first tick.
    pub fn prime_runtime(&self) -> AppRuntimeStats {
        self.runtime.sample()
    }

    pub fn fast_tick<R: Rng + ?Sized>(&self, rng: &mut R, now: Instant) {
        let stats = self.runtime.sample();
        {
            let mut published = self.published_reclaims.lock();
            let delta = stats.reclaim_count.saturating_sub(*published);
            *published = stats.reclaim_count;
            self.publisher.runtime(&stats, delta, self.fast_interval.as_secs_f64());
        }

        {
            let mut scalars = self.scalars.lock();
            scalars.advance(rng);
            self.publisher.scalars(&scalars);
        }

        {
            let interfaces = self.interfaces.read();
            for iface in interfaces.iter().filter(|i| i.is_up()) {
                match iface.octet_rates(now) {
                    Some((in_rate, out_rate)) => self.publisher.interface(iface, in_rate, out_rate),
                    None => debug!("interface {} baseline is newer than this tick, keeping last rate", iface.descr),
                }
            }
        }

        {
            let mut fans = self.fans.write();
            for fan in fans.iter_mut() {
                if fan.roll(rng, FAN_FLIP_PROBABILITY) {
                    info!("fan {} (index {}) is now {:?}", fan.descr, fan.index, fan.status);
                }
                self.publisher.fan(fan);
            }
        }

        {
            let mut psus = self.psus.write();
            for psu in psus.iter_mut() {
                if psu.roll(rng, PSU_FLIP_PROBABILITY) {
                    info!("psu {} (index {}) is now {:?}", psu.descr, psu.index, psu.status);
                }
                self.publisher.psu(psu);
            }
        }
    }

    pub fn slow_tick<R: Rng + ?Sized>(&self, rng: &mut R, now: Instant) {
        {
            let mut interfaces = self.interfaces.write();
            for (position, iface) in interfaces.iter_mut().enumerate() {
                if !iface.is_up() {
                    continue;
                }
                iface.rebaseline(now);

                let scale = position as u64;
                iface.in_octets += rng.random_range(0..20_000u64) + 10_000 + scale * 1_000;
                iface.out_octets += rng.random_range(0..30_000u64) + 15_000 + scale * 2_000;

                if rng.random_bool(ERROR_BURST_PROBABILITY) {
                    let new_errors = rng.random_range(1..=3u64);
                    let new_discards = rng.random_range(1..=2u64);
                    iface.in_errors += new_errors;
                    iface.out_discards += new_discards;
                    debug!(
                        "interface {} (index {}): +{new_errors} errors, +{new_discards} discards",
                        iface.descr, iface.index
                    );
                    self.publisher.interface_errors(iface, new_errors, new_discards);
                }
            }
        }

        self.publisher.advance_sys_uptime(self.slow_interval_ticks);
    }
}

fn random_below<R: Rng + ?Sized>(rng: &mut R, ceiling: u64) -> u64 {
    if ceiling == 0 {
        0
    } else {
        rng.random_range(0..ceiling)
    }
}

/// Runs `tick` every `period`, first firing one period from now. A late tick
/// delays the schedule instead of bursting to catch up.
fn spawn_cycle<F>(period: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut(Instant) + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            tick(Instant::now());
        }
    })
}

/// Starts the fast and slow cycles. They run until the process exits.
pub fn spawn_cycles(sim: Arc<Simulator>) -> (JoinHandle<()>, JoinHandle<()>) {
    let fast_sim = sim.clone();
    let fast = spawn_cycle(sim.fast_interval, move |now| {
        fast_sim.fast_tick(&mut rand::rng(), now);
    });
    let slow_sim = sim.clone();
    let slow = spawn_cycle(sim.slow_interval, move |now| {
        slow_sim.slow_tick(&mut rand::rng(), now);
    });
    info!(
        "cycles started (fast every {:?}, slow every {:?})",
        sim.fast_interval, sim.slow_interval
    );
    (fast, slow)
}
