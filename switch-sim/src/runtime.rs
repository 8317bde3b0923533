//! Sampling of the simulator's own process statistics.
//!
//! There is no garbage collector to ask, so a "reclaim" is any sample in which
//! resident memory shrank compared to the previous one.

use crate::models::AppRuntimeStats;
use parking_lot::Mutex;
use std::time::Instant;
use sysinfo::{Pid, System};
use time::OffsetDateTime;

pub struct RuntimeTracker {
    start_time: Instant,
    pid: Option<Pid>,
    inner: Mutex<TrackerState>,
}

struct TrackerState {
    system: System,
    last: AppRuntimeStats,
}

impl RuntimeTracker {
    pub fn new(start_time: Instant) -> Self {
        Self {
            start_time,
            pid: sysinfo::get_current_pid().ok(),
            inner: Mutex::new(TrackerState {
                system: System::new(),
                last: AppRuntimeStats {
                    allocated_bytes: 0,
                    obtained_bytes: 0,
                    live_tasks: 0,
                    reclaim_count: 0,
                    last_reclaim: None,
                    uptime: Default::default(),
                },
            }),
        }
    }

    /// Refreshes process memory and returns the new stats.
    pub fn sample(&self) -> AppRuntimeStats {
        let mut state = self.inner.lock();
        let (allocated, obtained) = self.process_memory(&mut state.system);

        let mut next = AppRuntimeStats {
            allocated_bytes: allocated,
            obtained_bytes: obtained,
            live_tasks: live_tasks(),
            reclaim_count: state.last.reclaim_count,
            last_reclaim: state.last.last_reclaim,
            uptime: self.start_time.elapsed(),
        };
        if state.last.allocated_bytes > 0 && allocated < state.last.allocated_bytes {
            next.reclaim_count += 1;
            next.last_reclaim = Some(OffsetDateTime::now_utc());
        }
        state.last = next.clone();
        next
    }

    /// Last sampled stats with the live task count and age read fresh.
    pub fn snapshot(&self) -> AppRuntimeStats {
        let mut stats = self.inner.lock().last.clone();
        stats.live_tasks = live_tasks();
        stats.uptime = self.start_time.elapsed();
        stats
    }

    fn process_memory(&self, system: &mut System) -> (u64, u64) {
        let Some(pid) = self.pid else { return (0, 0) };
        if !system.refresh_process(pid) {
            return (0, 0);
        }
        system
            .process(pid)
            .map(|p| (p.memory(), p.virtual_memory()))
            .unwrap_or((0, 0))
    }
}

fn live_tasks() -> usize {
    tokio::runtime::Handle::try_current()
        .map(|handle| handle.metrics().num_alive_tasks())
        .unwrap_or(0)
}
