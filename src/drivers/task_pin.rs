//! Core-pinned thread spawning for ESP32-S3 dual-core.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread::spawn` creates a
//! FreeRTOS task pinned to a specific CPU core with explicit priority
//! and stack size.  On non-ESP targets, falls back to plain thread spawn.
//!
//! # ESP-IDF Threading Model
//!
//! ESP-IDF implements `std::thread` via pthreads, which are thin wrappers
//! around FreeRTOS tasks.  `esp_pthread_set_cfg()` sets thread-local
//! configuration that applies to the *next* `pthread_create()` call from
//! the calling thread, so the config→spawn pair must not be interleaved
//! with other thread creation on the same thread.

use std::thread::JoinHandle;

use crate::error::{Error, Result};

/// CPU core identifiers for the ESP32-S3 Xtensa LX7 dual-core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): edge dispatch and decoders.
    Pro = 0,
    /// Core 1 (APP_CPU): actuator loops.
    App = 1,
}

/// Placement of one loop thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
    /// Thread name.  On ESP-IDF a NUL-terminated name (e.g. `"press\0"`)
    /// is also given to FreeRTOS; others keep the default task name.
    pub name: &'static str,
}

impl TaskSpec {
    pub const fn new(core: Core, priority: u8, stack_kb: usize, name: &'static str) -> Self {
        Self {
            core,
            priority,
            stack_kb,
            name,
        }
    }

    pub fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

/// Spawn a thread pinned to a specific core with explicit priority and stack.
#[cfg(target_os = "espidf")]
pub fn spawn_on_core<T, F>(spec: TaskSpec, f: F) -> Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    // SAFETY: the config struct is fully initialised by the IDF helper and
    // `thread_name` is only set from a NUL-terminated 'static string.
    unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = i32::from(spec.priority);
        cfg.stack_size = (spec.stack_kb * 1024) as i32;
        if spec.name.ends_with('\0') {
            cfg.thread_name = spec.name.as_ptr() as *const _;
        }
        let ret = esp_idf_sys::esp_pthread_set_cfg(&cfg);
        if ret != esp_idf_sys::ESP_OK as i32 {
            log::error!("esp_pthread_set_cfg failed: {}", ret);
            return Err(Error::Init("pthread config"));
        }
    }

    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        spec.display_name(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .spawn(f)
        .map_err(|_| Error::Init("thread spawn"))
}

/// Host threads run debug builds and test harness code; FreeRTOS-sized
/// stacks are too small for that.
#[cfg(not(target_os = "espidf"))]
const SIM_MIN_STACK_KB: usize = 256;

/// Simulation fallback. Ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core<T, F>(spec: TaskSpec, f: F) -> Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    log::debug!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        spec.display_name(),
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb.max(SIM_MIN_STACK_KB) * 1024)
        .spawn(f)
        .map_err(|_| Error::Init("thread spawn"))
}
