//! Key namespaces of the Typed Value Store.
//!
//! Keys mimic management-protocol object identifiers. Nothing listens for the
//! protocol itself; the layout only matters to whoever reads the store.

/// Standard system group.
pub const SYSTEM_PREFIX: &str = ".1.3.6.1.2.1.1";
/// Standard interfaces group.
pub const INTERFACES_PREFIX: &str = ".1.3.6.1.2.1.2";
/// Root of everything the simulator defines itself.
pub const SIM_PREFIX: &str = ".1.3.6.1.4.1.2021.13";
/// Simulator self-status subtree.
pub const SIM_SYSTEM_PREFIX: &str = ".1.3.6.1.4.1.2021.13.1";
/// Per-interface rate subtree.
pub const SIM_IF_RATE_PREFIX: &str = ".1.3.6.1.4.1.2021.13.2";
/// Device metrics subtree.
pub const SIM_DEVICE_PREFIX: &str = ".1.3.6.1.4.1.2021.13.3";

fn scalar(prefix: &str, column: u32) -> String {
    format!("{prefix}.{column}.0")
}

fn table(prefix: &str, column: u32, index: i32) -> String {
    format!("{prefix}.{column}.1.{index}")
}

pub fn sys_descr() -> String {
    scalar(SYSTEM_PREFIX, 1)
}

pub fn sys_uptime() -> String {
    scalar(SYSTEM_PREFIX, 3)
}

pub fn sys_name() -> String {
    scalar(SYSTEM_PREFIX, 5)
}

pub fn if_number() -> String {
    scalar(INTERFACES_PREFIX, 1)
}

pub fn sim_version() -> String {
    scalar(SIM_SYSTEM_PREFIX, 1)
}

pub fn sim_tasks() -> String {
    scalar(SIM_SYSTEM_PREFIX, 2)
}

pub fn sim_reclaims() -> String {
    scalar(SIM_SYSTEM_PREFIX, 3)
}

pub fn sim_memory_mb() -> String {
    scalar(SIM_SYSTEM_PREFIX, 4)
}

pub fn sim_uptime() -> String {
    scalar(SIM_SYSTEM_PREFIX, 5)
}

pub fn device_cpu() -> String {
    scalar(SIM_SYSTEM_PREFIX, 6)
}

pub fn if_in_rate(if_index: i32) -> String {
    format!("{SIM_IF_RATE_PREFIX}.{if_index}.1")
}

pub fn if_out_rate(if_index: i32) -> String {
    format!("{SIM_IF_RATE_PREFIX}.{if_index}.2")
}

pub fn device_memory_util() -> String {
    scalar(SIM_DEVICE_PREFIX, 2)
}

pub fn device_temperature() -> String {
    scalar(SIM_DEVICE_PREFIX, 3)
}

pub fn fan_status(fan_index: i32) -> String {
    table(SIM_DEVICE_PREFIX, 4, fan_index)
}

pub fn psu_status(psu_index: i32) -> String {
    table(SIM_DEVICE_PREFIX, 5, psu_index)
}

pub fn if_in_errors(if_index: i32) -> String {
    table(SIM_DEVICE_PREFIX, 6, if_index)
}

pub fn if_out_discards(if_index: i32) -> String {
    table(SIM_DEVICE_PREFIX, 7, if_index)
}

pub fn arp_entries() -> String {
    scalar(SIM_DEVICE_PREFIX, 8)
}

pub fn mac_entries() -> String {
    scalar(SIM_DEVICE_PREFIX, 9)
}

pub fn tcp_connections() -> String {
    scalar(SIM_DEVICE_PREFIX, 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_and_table_keys() {
        assert_eq!(sys_uptime(), ".1.3.6.1.2.1.1.3.0");
        assert_eq!(device_cpu(), ".1.3.6.1.4.1.2021.13.1.6.0");
        assert_eq!(tcp_connections(), ".1.3.6.1.4.1.2021.13.3.10.0");
        assert_eq!(fan_status(2), ".1.3.6.1.4.1.2021.13.3.4.1.2");
        assert_eq!(if_out_discards(5), ".1.3.6.1.4.1.2021.13.3.7.1.5");
        assert_eq!(if_in_rate(3), ".1.3.6.1.4.1.2021.13.2.3.1");
    }
}
