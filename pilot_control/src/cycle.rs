//! Periodic engine task.
//!
//! Each engine runs on its own thread: lock, step, unlock, sleep until the
//! next period. Stopping is cooperative; the thread finishes its current
//! cycle and returns its timing statistics.
//!
//! ## RT Setup Sequence (`rt` feature)
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity` to the configured core.
//! 4. `sched_setscheduler(SCHED_FIFO, priority)`.
//!
//! ## Pacing
//! With `rt`, absolute-time `clock_nanosleep` on `CLOCK_MONOTONIC`; a
//! single overrun ends the task with [`CycleError::CycleOverrun`].
//! Without it, `thread::sleep` for the remaining time; overruns are
//! counted and logged.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use pilot_common::consts::DEFAULT_CYCLE_TIME_US;
use pilot_common::motion::PilotConfig;
use tracing::{info, warn};

use crate::engine::EngineHandle;
use crate::error::CycleError;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    pub min_cycle_ns: i64,
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Cycles that ran past their period.
    pub overruns: u64,
    /// Maximum wake-up latency [ns] (time between expected and actual wake).
    pub max_latency_ns: i64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages.
///
/// No-op when the `rt` feature is not enabled.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch the stack the cycle will use so it is resident before the loop.
#[cfg(feature = "rt")]
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(not(feature = "rt"))]
fn prefault_stack() {}

/// Pin the current thread to one CPU core.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

/// SCHED_FIFO at `priority` for the current thread.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 targets the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Full RT setup for the calling thread. All steps are no-ops without the
/// `rt` feature.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Task ───────────────────────────────────────────────────────────

/// How an engine task is paced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleConfig {
    pub cycle_time_us: u32,
    /// Core to pin the cycle thread to; `None` skips RT setup.
    pub cpu_core: Option<usize>,
    pub rt_priority: i32,
    /// Stop on its own after this many cycles.
    pub max_cycles: Option<u64>,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cycle_time_us: DEFAULT_CYCLE_TIME_US,
            cpu_core: None,
            rt_priority: 80,
            max_cycles: None,
        }
    }
}

impl From<&PilotConfig> for CycleConfig {
    fn from(cfg: &PilotConfig) -> Self {
        Self {
            cycle_time_us: cfg.cycle_time_us,
            ..Default::default()
        }
    }
}

impl CycleConfig {
    #[inline]
    fn cycle_time_ns(&self) -> i64 {
        i64::from(self.cycle_time_us) * 1000
    }
}

/// A running engine thread.
#[derive(Debug)]
pub struct EngineTask {
    name: String,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<CycleStats, CycleError>>>,
}

impl EngineTask {
    /// Start cycling `handle` on a dedicated thread.
    pub fn spawn(handle: EngineHandle, config: CycleConfig) -> Result<Self, CycleError> {
        let name = handle.name();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name(format!("pilot-{name}"))
            .spawn(move || run(&handle, &config, &flag))?;
        info!(
            engine = %name,
            cycle_time_us = config.cycle_time_us,
            "engine task started"
        );
        Ok(Self {
            name,
            stop,
            thread: Some(thread),
        })
    }

    /// Ask the task to end after its current cycle.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Flag shared with the task; setting it has the same effect as
    /// [`stop`](Self::stop).
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// The thread has returned (stopped, cycle budget spent or failed).
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Wait for the thread and return its statistics.
    pub fn join(mut self) -> Result<CycleStats, CycleError> {
        let thread = self.thread.take().ok_or(CycleError::Panicked)?;
        let stats = thread.join().map_err(|_| CycleError::Panicked)??;
        info!(
            engine = %self.name,
            cycles = stats.cycle_count,
            overruns = stats.overruns,
            avg_ns = stats.avg_cycle_ns(),
            max_ns = stats.max_cycle_ns,
            "engine task stopped"
        );
        Ok(stats)
    }
}

impl Drop for EngineTask {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run(
    handle: &EngineHandle,
    config: &CycleConfig,
    stop: &AtomicBool,
) -> Result<CycleStats, CycleError> {
    if let Some(core) = config.cpu_core {
        rt_setup(core, config.rt_priority)?;
    }

    #[cfg(feature = "rt")]
    {
        run_rt_loop(handle, config, stop)
    }

    #[cfg(not(feature = "rt"))]
    {
        run_sim_loop(handle, config, stop)
    }
}

#[inline]
fn keep_running(stats: &CycleStats, config: &CycleConfig, stop: &AtomicBool) -> bool {
    !stop.load(Ordering::Acquire) && config.max_cycles.is_none_or(|max| stats.cycle_count < max)
}

/// Absolute-time loop; one overrun is fatal.
#[cfg(feature = "rt")]
fn run_rt_loop(
    handle: &EngineHandle,
    config: &CycleConfig,
    stop: &AtomicBool,
) -> Result<CycleStats, CycleError> {
    use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

    let clock = ClockId::CLOCK_MONOTONIC;
    let budget_ns = config.cycle_time_ns();
    let mut stats = CycleStats::new();
    let mut next_wake =
        clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;

    while keep_running(&stats, config, stop) {
        let start =
            clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;
        let latency_ns = timespec_diff_ns(&start, &next_wake).max(0);
        next_wake = timespec_add_ns(next_wake, budget_ns);

        handle.step();

        let end =
            clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;
        let duration_ns = timespec_diff_ns(&end, &start);
        stats.record(duration_ns, latency_ns);

        if duration_ns > budget_ns {
            stats.overruns += 1;
            handle.disable();
            return Err(CycleError::CycleOverrun {
                actual_ns: duration_ns,
                budget_ns,
            });
        }

        let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
    }
    Ok(stats)
}

/// Relative-sleep loop; overruns are counted and logged.
#[cfg(not(feature = "rt"))]
fn run_sim_loop(
    handle: &EngineHandle,
    config: &CycleConfig,
    stop: &AtomicBool,
) -> Result<CycleStats, CycleError> {
    use std::time::{Duration, Instant};

    let budget_ns = config.cycle_time_ns();
    let period = Duration::from_micros(u64::from(config.cycle_time_us));
    let mut stats = CycleStats::new();

    while keep_running(&stats, config, stop) {
        let start = Instant::now();

        handle.step();

        let elapsed = start.elapsed();
        let duration_ns = i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX);
        stats.record(duration_ns, 0);

        if duration_ns > budget_ns {
            stats.overruns += 1;
            warn!(
                cycle = stats.cycle_count,
                duration_ns, budget_ns, "cycle overrun"
            );
        }

        if let Some(remaining) = period.checked_sub(elapsed) {
            thread::sleep(remaining);
        }
    }
    Ok(stats)
}

// ─── Time Helpers ───────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    while nanos < 0 {
        secs -= 1;
        nanos += 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

/// `a - b` in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
