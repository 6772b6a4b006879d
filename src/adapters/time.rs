//! ESP32 time adapter.
//!
//! Provides monotonic and wall-clock time for the Doorbot system.
//!
//! - **`target_os = "espidf"`**: uptime wraps `esp_timer_get_time()`,
//!   the same counter the GPIO ISRs stamp edges with; local time comes
//!   from `gettimeofday` + `localtime_r` (TZ set by the IDF config).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` and
//!   `chrono::Local` for host-side testing and simulation.

use std::time::Duration;

use chrono::NaiveDateTime;
use embedded_hal::delay::DelayNs;

use crate::app::ports::TimePort;

/// Time adapter for the ESP32-S3 platform.
pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl TimePort for SystemClock {
    #[cfg(target_os = "espidf")]
    fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Local time.  Before SNTP sync this is 1970-01-01 00:00, which no
    /// access window admits.
    #[cfg(target_os = "espidf")]
    fn local_now(&self) -> NaiveDateTime {
        use chrono::NaiveDate;
        use core::ptr;

        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return NaiveDateTime::default();
        }
        // Reject obviously unsynced time (e.g. before 2020-01-01)
        const EPOCH_2020: i64 = 1_577_836_800;
        if (tv.tv_sec as i64) < EPOCH_2020 {
            return NaiveDateTime::default();
        }
        let secs = tv.tv_sec as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return NaiveDateTime::default();
        }
        NaiveDate::from_ymd_opt(tm.tm_year + 1900, (tm.tm_mon + 1) as u32, tm.tm_mday as u32)
            .and_then(|d| d.and_hms_opt(tm.tm_hour as u32, tm.tm_min as u32, tm.tm_sec as u32))
            .unwrap_or_default()
    }

    #[cfg(not(target_os = "espidf"))]
    fn local_now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Blocking delay backed by `std::thread::sleep` (a FreeRTOS delay on
/// ESP-IDF).
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns.into()));
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(us.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms.into()));
    }
}
