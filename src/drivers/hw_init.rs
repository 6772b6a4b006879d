//! One-shot hardware peripheral initialization.
//!
//! Configures GPIO directions, LEDC timers/channels, and the GPIO ISR
//! service using raw ESP-IDF sys calls.  Called once from `main()` before
//! the controller starts.  On host targets every function is a
//! simulation stub.

use std::sync::Arc;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::app::shared::SharedState;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        log::error!("hw_init: {}", e);
        Self::Init(match e {
            HwInitError::GpioConfigFailed(_) => "gpio config",
            HwInitError::LedcInitFailed(_) => "ledc config",
            HwInitError::IsrInstallFailed(_) => "isr service",
        })
    }
}

/// ESP-IDF success return code.
pub const ESP_RC_OK: i32 = 0;

#[cfg(target_os = "espidf")]
fn check(ret: esp_err_t, err: fn(i32) -> HwInitError) -> Result<(), HwInitError> {
    if ret == ESP_OK as esp_err_t { Ok(()) } else { Err(err(ret)) }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before any loop thread exists.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()?;
        init_ledc()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    // Indicator: active-low optocoupler output, pull-up.
    let indicator_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::INDICATOR_INPUT_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    check(unsafe { gpio_config(&indicator_cfg) }, HwInitError::GpioConfigFailed)?;

    // Button: active-high, pull-down.
    let btn_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::BUTTON_INPUT_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    check(unsafe { gpio_config(&btn_cfg) }, HwInitError::GpioConfigFailed)?;

    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin.
    (unsafe { gpio_get_level(pin) }) != 0
}

/// Simulation: inputs read idle low.
#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    false
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let output_pins = [
        pins::KEY_RELAY_GPIO,
        pins::DOORBELL_RELAY_GPIO,
        pins::SERVO_POWER_GPIO,
        pins::HEARTBEAT_GPIO,
    ];

    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        check(unsafe { gpio_config(&cfg) }, HwInitError::GpioConfigFailed)?;
        check(unsafe { gpio_set_level(pin, 0) }, HwInitError::GpioConfigFailed)?;
    }

    info!("hw_init: GPIO outputs configured (all low)");
    Ok(())
}

/// Returns the ESP-IDF return code.
#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) -> i32 {
    // SAFETY: gpio_set_level writes to an output pin configured in
    // init_gpio_outputs(); each pin has a single owning loop.
    unsafe { gpio_set_level(pin, u32::from(high)) }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) -> i32 {
    ESP_RC_OK
}

// ── LEDC PWM ─────────────────────────────────────────────────

/// LEDC channel/timer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedcChannel {
    pub channel: u32,
    pub timer: u32,
    pub resolution_bits: u32,
}

/// Servo: timer 0, 50 Hz, 14-bit.
pub const LEDC_SERVO: LedcChannel = LedcChannel {
    channel: 0,
    timer: 0,
    resolution_bits: crate::pins::SERVO_PWM_RESOLUTION_BITS,
};

/// Buzzer: timer 1, frequency retuned per chirp step, 10-bit.
pub const LEDC_BUZZER: LedcChannel = LedcChannel {
    channel: 1,
    timer: 1,
    resolution_bits: crate::pins::BUZZER_PWM_RESOLUTION_BITS,
};

/// Raw duty register value for a percentage at `resolution_bits`.
pub fn duty_counts(percent: f32, resolution_bits: u32) -> u32 {
    let max = (1u32 << resolution_bits) - 1;
    let fraction = (percent / 100.0).clamp(0.0, 1.0);
    (fraction * max as f32).round() as u32
}

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    let timers = [
        (LEDC_SERVO, 50),
        (LEDC_BUZZER, pins::BUZZER_BASE_FREQ_HZ),
    ];
    for (ch, freq_hz) in timers {
        let timer = ledc_timer_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            timer_num: ch.timer,
            duty_resolution: ch.resolution_bits,
            freq_hz,
            clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
            ..Default::default()
        };
        check(unsafe { ledc_timer_config(&timer) }, HwInitError::LedcInitFailed)?;
    }

    // Servo idles at full duty: the inverting buffer holds the line low.
    let channels = [
        (LEDC_SERVO, pins::SERVO_PWM_GPIO, duty_counts(100.0, LEDC_SERVO.resolution_bits)),
        (LEDC_BUZZER, pins::BUZZER_PWM_GPIO, 0),
    ];
    for (ch, gpio_num, duty) in channels {
        let cfg = ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: ch.channel,
            timer_sel: ch.timer,
            gpio_num,
            duty,
            hpoint: 0,
            ..Default::default()
        };
        check(unsafe { ledc_channel_config(&cfg) }, HwInitError::LedcInitFailed)?;
    }

    info!("hw_init: LEDC configured (servo=CH0/T0, buzzer=CH1/T1)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set_duty(ch: LedcChannel, percent: f32) -> i32 {
    // SAFETY: channel configured in init_ledc(); each channel has one
    // owning loop.
    unsafe {
        let ret = ledc_set_duty(
            ledc_mode_t_LEDC_LOW_SPEED_MODE,
            ch.channel,
            duty_counts(percent, ch.resolution_bits),
        );
        if ret != ESP_OK as esp_err_t {
            return ret;
        }
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, ch.channel)
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set_duty(_ch: LedcChannel, _percent: f32) -> i32 {
    ESP_RC_OK
}

#[cfg(target_os = "espidf")]
pub fn ledc_set_frequency(ch: LedcChannel, freq_hz: u32) -> i32 {
    // SAFETY: timer configured in init_ledc().
    unsafe { ledc_set_freq(ledc_mode_t_LEDC_LOW_SPEED_MODE, ch.timer, freq_hz) }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set_frequency(_ch: LedcChannel, _freq_hz: u32) -> i32 {
    ESP_RC_OK
}

/// Stop the channel, holding its output low.
#[cfg(target_os = "espidf")]
pub fn ledc_stop_channel(ch: LedcChannel) -> i32 {
    // SAFETY: channel configured in init_ledc().
    unsafe { ledc_stop(ledc_mode_t_LEDC_LOW_SPEED_MODE, ch.channel, 0) }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_stop_channel(_ch: LedcChannel) -> i32 {
    ESP_RC_OK
}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
use crate::events::{InputLine, RawEdge};

/// SAFETY (both handlers): `arg` is the pointer produced by
/// `Arc::into_raw` in `init_edge_interrupts`, whose reference is never
/// released, so the `SharedState` outlives every interrupt.
#[cfg(target_os = "espidf")]
unsafe extern "C" fn indicator_gpio_isr(arg: *mut core::ffi::c_void) {
    let shared = unsafe { &*(arg as *const SharedState) };
    // SAFETY: esp_timer_get_time is a counter read; safe in ISR context.
    let at_us = unsafe { esp_timer_get_time() } as u64;
    // SAFETY: gpio_get_level is a register read; safe in ISR context.
    let high = unsafe { gpio_get_level(pins::INDICATOR_INPUT_GPIO) } != 0;
    shared.notify_edge(RawEdge::new(InputLine::Indicator, at_us, high));
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_gpio_isr(arg: *mut core::ffi::c_void) {
    let shared = unsafe { &*(arg as *const SharedState) };
    let at_us = unsafe { esp_timer_get_time() } as u64;
    let high = unsafe { gpio_get_level(pins::BUTTON_INPUT_GPIO) } != 0;
    shared.notify_edge(RawEdge::new(InputLine::Button, at_us, high));
}

/// Install the per-pin GPIO ISR service and route indicator and button
/// edges into `shared`.  Call after `init_peripherals()`.
#[cfg(target_os = "espidf")]
pub fn init_edge_interrupts(shared: &Arc<SharedState>) -> Result<(), HwInitError> {
    // One strong reference is handed to the ISRs for the lifetime of the
    // firmware.
    let arg = Arc::into_raw(Arc::clone(shared)) as *mut core::ffi::c_void;

    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed.  The handlers only push to the
    // lock-free edge queue.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        // Indicator: falling edge (LED turned on)
        gpio_set_intr_type(pins::INDICATOR_INPUT_GPIO, gpio_int_type_t_GPIO_INTR_NEGEDGE);
        check(
            gpio_isr_handler_add(pins::INDICATOR_INPUT_GPIO, Some(indicator_gpio_isr), arg),
            HwInitError::IsrInstallFailed,
        )?;
        gpio_intr_enable(pins::INDICATOR_INPUT_GPIO);

        // Button: both edges (press and release)
        gpio_set_intr_type(pins::BUTTON_INPUT_GPIO, gpio_int_type_t_GPIO_INTR_ANYEDGE);
        check(
            gpio_isr_handler_add(pins::BUTTON_INPUT_GPIO, Some(button_gpio_isr), arg),
            HwInitError::IsrInstallFailed,
        )?;
        gpio_intr_enable(pins::BUTTON_INPUT_GPIO);
    }

    info!("hw_init: ISR service installed (indicator, button)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_edge_interrupts(_shared: &Arc<SharedState>) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
