//! Dual-representation publisher.
//!
//! Every value the cycles produce is written twice: as a Prometheus metric in
//! the push registry and as a tagged value in the [`OidStore`]. Cumulative
//! values only ever go through `inc_by` on the registry side.

use crate::models::{AppRuntimeStats, DeviceScalars, Fan, Interface, PowerSupply};
use crate::oid;
use crate::store::{OidStore, OidValue};
use prometheus::{Counter, Gauge, GaugeVec, IntCounter, IntCounterVec, Opts, Registry};
use tracing::warn;

const BYTES_PER_MB: u64 = 1_048_576;
const TICKS_PER_SECOND: f64 = 100.0;

/// Handles to every metric in the push registry.
pub struct DeviceMetrics {
    pub gc_count: IntCounter,
    pub memory_usage: Gauge,
    pub task_count: Gauge,
    pub cpu_usage: Gauge,
    pub uptime: Counter,
    pub if_in_rate: GaugeVec,
    pub if_out_rate: GaugeVec,
    pub memory_util: Gauge,
    pub temperature: Gauge,
    pub fan_status: GaugeVec,
    pub psu_status: GaugeVec,
    pub if_in_errors: IntCounterVec,
    pub if_out_discards: IntCounterVec,
    pub arp_entries: Gauge,
    pub mac_entries: Gauge,
    pub tcp_connections: Gauge,
}

fn register<C>(registry: &Registry, collector: C) -> prometheus::Result<C>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}

impl DeviceMetrics {
    /// Creates and registers all metrics. Any duplicate name is an error.
    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let if_labels = &["ifIndex", "ifDescr"];
        Ok(Self {
            gc_count: register(
                registry,
                IntCounter::new("snmp_sim_app_gc_count_total", "Memory reclaims observed in the simulator process")?,
            )?,
            memory_usage: register(
                registry,
                Gauge::new("snmp_sim_app_memory_usage_bytes", "Resident memory of the simulator process in bytes")?,
            )?,
            task_count: register(
                registry,
                Gauge::new("snmp_sim_app_goroutine_count", "Live background tasks in the simulator process")?,
            )?,
            cpu_usage: register(
                registry,
                Gauge::new("snmp_sim_device_cpu_usage_percent", "Simulated device CPU utilization (%)")?,
            )?,
            uptime: register(
                registry,
                Counter::new("snmp_sim_app_uptime_seconds_total", "Simulator uptime in seconds")?,
            )?,
            if_in_rate: register(
                registry,
                GaugeVec::new(
                    Opts::new("snmp_sim_device_if_in_rate_bytes_per_second", "Simulated interface input rate (bytes/s)"),
                    if_labels,
                )?,
            )?,
            if_out_rate: register(
                registry,
                GaugeVec::new(
                    Opts::new("snmp_sim_device_if_out_rate_bytes_per_second", "Simulated interface output rate (bytes/s)"),
                    if_labels,
                )?,
            )?,
            memory_util: register(
                registry,
                Gauge::new("snmp_sim_device_memory_utilization_percent", "Simulated device memory utilization (%)")?,
            )?,
            temperature: register(
                registry,
                Gauge::new("snmp_sim_device_temperature_celsius", "Simulated device temperature (Celsius)")?,
            )?,
            fan_status: register(
                registry,
                GaugeVec::new(
                    Opts::new("snmp_sim_device_fan_status", "Simulated fan status (1=normal, 2=failed)"),
                    &["fanIndex", "fanDescr"],
                )?,
            )?,
            psu_status: register(
                registry,
                GaugeVec::new(
                    Opts::new("snmp_sim_device_psu_status", "Simulated PSU status (1=normal, 2=failed, 3=not_present)"),
                    &["psuIndex", "psuDescr"],
                )?,
            )?,
            if_in_errors: register(
                registry,
                IntCounterVec::new(
                    Opts::new("snmp_sim_device_if_in_errors_total", "Simulated interface input errors"),
                    if_labels,
                )?,
            )?,
            if_out_discards: register(
                registry,
                IntCounterVec::new(
                    Opts::new("snmp_sim_device_if_out_discards_total", "Simulated interface output discards"),
                    if_labels,
                )?,
            )?,
            arp_entries: register(
                registry,
                Gauge::new("snmp_sim_device_arp_cache_entries", "Simulated ARP cache entries")?,
            )?,
            mac_entries: register(
                registry,
                Gauge::new("snmp_sim_device_mac_table_entries", "Simulated MAC address table entries")?,
            )?,
            tcp_connections: register(
                registry,
                Gauge::new("snmp_sim_device_active_tcp_connections", "Simulated active TCP connections")?,
            )?,
        })
    }
}

/// Writes engine output into both read models.
pub struct Publisher {
    pub metrics: DeviceMetrics,
    pub store: OidStore,
}

impl Publisher {
    pub fn new(metrics: DeviceMetrics, store: OidStore) -> Self {
        Self { metrics, store }
    }

    /// Store write that keeps the stale value on a tag mismatch.
    fn put(&self, key: String, value: OidValue) {
        if let Err(e) = self.store.upsert(&key, value) {
            warn!("store update skipped: {e}");
        }
    }

    pub fn runtime(&self, stats: &AppRuntimeStats, reclaim_delta: u64, fast_period_secs: f64) {
        if reclaim_delta > 0 {
            self.metrics.gc_count.inc_by(reclaim_delta);
        }
        self.metrics.memory_usage.set(stats.allocated_bytes as f64);
        self.metrics.task_count.set(stats.live_tasks as f64);
        self.metrics.uptime.inc_by(fast_period_secs);

        self.put(oid::sim_tasks(), OidValue::Gauge32(stats.live_tasks as u32));
        self.put(oid::sim_reclaims(), OidValue::counter(stats.reclaim_count));
        self.put(oid::sim_memory_mb(), OidValue::Gauge32((stats.allocated_bytes / BYTES_PER_MB) as u32));
        self.put(
            oid::sim_uptime(),
            OidValue::TimeTicks((stats.uptime.as_secs_f64() * TICKS_PER_SECOND) as u32),
        );
    }

    pub fn scalars(&self, scalars: &DeviceScalars) {
        let cpu = scalars.cpu.value;
        let memory_util = scalars.memory_util.value;
        let temperature = scalars.temperature.value;

        self.metrics.cpu_usage.set(cpu);
        self.metrics.memory_util.set(memory_util);
        self.metrics.temperature.set(temperature);
        self.metrics.arp_entries.set(scalars.arp_entries as f64);
        self.metrics.mac_entries.set(scalars.mac_entries as f64);
        self.metrics.tcp_connections.set(scalars.tcp_connections as f64);

        self.put(oid::device_cpu(), OidValue::Gauge32(cpu as u32));
        self.put(oid::device_memory_util(), OidValue::Gauge32(memory_util as u32));
        self.put(oid::device_temperature(), OidValue::Integer(temperature as i32));
        self.put(oid::arp_entries(), OidValue::Gauge32(scalars.arp_entries));
        self.put(oid::mac_entries(), OidValue::Gauge32(scalars.mac_entries));
        self.put(oid::tcp_connections(), OidValue::Gauge32(scalars.tcp_connections));
    }

    /// Rates plus the current error/discard counters of one Up interface.
    pub fn interface(&self, iface: &Interface, in_rate: f64, out_rate: f64) {
        let index = iface.index.to_string();
        let labels = [index.as_str(), iface.descr.as_str()];
        self.metrics.if_in_rate.with_label_values(&labels).set(in_rate);
        self.metrics.if_out_rate.with_label_values(&labels).set(out_rate);

        self.put(oid::if_in_rate(iface.index), OidValue::Gauge32(in_rate as u32));
        self.put(oid::if_out_rate(iface.index), OidValue::Gauge32(out_rate as u32));
        self.interface_counters(iface);
    }

    /// Adds a burst of errors/discards that has already been applied to `iface`.
    pub fn interface_errors(&self, iface: &Interface, new_errors: u64, new_discards: u64) {
        let index = iface.index.to_string();
        let labels = [index.as_str(), iface.descr.as_str()];
        self.metrics.if_in_errors.with_label_values(&labels).inc_by(new_errors);
        self.metrics.if_out_discards.with_label_values(&labels).inc_by(new_discards);
        self.interface_counters(iface);
    }

    fn interface_counters(&self, iface: &Interface) {
        self.put(oid::if_in_errors(iface.index), OidValue::counter(iface.in_errors));
        self.put(oid::if_out_discards(iface.index), OidValue::counter(iface.out_discards));
    }

    pub fn fan(&self, fan: &Fan) {
        let code = fan.status.code();
        self.metrics
            .fan_status
            .with_label_values(&[fan.index.to_string().as_str(), fan.descr.as_str()])
            .set(code as f64);
        self.put(oid::fan_status(fan.index), OidValue::Integer(code));
    }

    pub fn psu(&self, psu: &PowerSupply) {
        let code = psu.status.code();
        self.metrics
            .psu_status
            .with_label_values(&[psu.index.to_string().as_str(), psu.descr.as_str()])
            .set(code as f64);
        self.put(oid::psu_status(psu.index), OidValue::Integer(code));
    }

    /// Advances the standard sysUpTime scalar by `ticks` hundredths of a second.
    pub fn advance_sys_uptime(&self, ticks: u32) {
        let key = oid::sys_uptime();
        match self.store.get(&key) {
            Some(OidValue::TimeTicks(current)) => self.put(key, OidValue::TimeTicks(current.wrapping_add(ticks))),
            Some(other) => warn!("sysUpTime holds {} instead of TimeTicks", other.kind()),
            None => self.put(key, OidValue::TimeTicks(ticks)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FanStatus, LinkStatus};
    use std::time::{Duration, Instant};

    fn publisher() -> (Registry, Publisher) {
        let registry = Registry::new();
        let metrics = DeviceMetrics::register(&registry).unwrap();
        (registry, Publisher::new(metrics, OidStore::new()))
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = Registry::new();
        DeviceMetrics::register(&registry).unwrap();
        assert!(DeviceMetrics::register(&registry).is_err());
    }

    #[test]
    fn test_runtime_unit_conversions() {
        let (_registry, publisher) = publisher();
        let stats = AppRuntimeStats {
            allocated_bytes: 5 * BYTES_PER_MB + 123,
            obtained_bytes: 64 * BYTES_PER_MB,
            live_tasks: 3,
            reclaim_count: 2,
            last_reclaim: None,
            uptime: Duration::from_millis(12_340),
        };
        publisher.runtime(&stats, 2, 1.0);

        assert_eq!(publisher.store.get(&oid::sim_memory_mb()), Some(OidValue::Gauge32(5)));
        assert_eq!(publisher.store.get(&oid::sim_uptime()), Some(OidValue::TimeTicks(1234)));
        assert_eq!(publisher.store.get(&oid::sim_tasks()), Some(OidValue::Gauge32(3)));
        assert_eq!(publisher.metrics.gc_count.get(), 2);
        assert_eq!(publisher.metrics.uptime.get(), 1.0);
    }

    #[test]
    fn test_fan_entry_created_lazily() {
        let (_registry, publisher) = publisher();
        let fan = Fan {
            index: 4,
            descr: "FAN4_SLOT2".into(),
            status: FanStatus::Failed,
            pinned: false,
        };
        assert!(publisher.store.get(&oid::fan_status(4)).is_none());

        publisher.fan(&fan);

        assert_eq!(publisher.store.get(&oid::fan_status(4)), Some(OidValue::Integer(2)));
        let gauge = publisher.metrics.fan_status.with_label_values(&["4", "FAN4_SLOT2"]);
        assert_eq!(gauge.get(), 2.0);
    }

    #[test]
    fn test_mismatched_store_entry_is_left_alone() {
        let (_registry, publisher) = publisher();
        publisher
            .store
            .upsert(&oid::device_cpu(), OidValue::text("busy"))
            .unwrap();

        let mut scalars = DeviceScalars::initial(&mut rand::rng());
        scalars.cpu.value = 33.0;
        publisher.scalars(&scalars);

        assert_eq!(publisher.store.get(&oid::device_cpu()), Some(OidValue::text("busy")));
        assert_eq!(publisher.metrics.cpu_usage.get(), 33.0);
    }

    #[test]
    fn test_error_burst_reaches_both_models() {
        let (_registry, publisher) = publisher();
        let mut iface = Interface::new(2, "GigabitEthernet1/0/2", LinkStatus::Up, LinkStatus::Up, Instant::now());
        iface.in_errors = 3;
        iface.out_discards = 1;
        publisher.interface_errors(&iface, 3, 1);

        let labels = ["2", "GigabitEthernet1/0/2"];
        assert_eq!(publisher.metrics.if_in_errors.with_label_values(&labels).get(), 3);
        assert_eq!(publisher.metrics.if_out_discards.with_label_values(&labels).get(), 1);
        assert_eq!(publisher.store.get(&oid::if_in_errors(2)), Some(OidValue::Counter32(3)));
        assert_eq!(publisher.store.get(&oid::if_out_discards(2)), Some(OidValue::Counter32(1)));
    }

    #[test]
    fn test_sys_uptime_wraps() {
        let (_registry, publisher) = publisher();
        publisher
            .store
            .upsert(&oid::sys_uptime(), OidValue::TimeTicks(u32::MAX - 10))
            .unwrap();
        publisher.advance_sys_uptime(500);
        assert_eq!(publisher.store.get(&oid::sys_uptime()), Some(OidValue::TimeTicks(489)));
    }
}
