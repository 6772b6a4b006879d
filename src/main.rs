//! Doorbot Firmware: Main Entry Point
//!
//! Hexagonal layout with one loop thread per concern.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  GpioInput/Output   LedcPwm       SystemClock   LogEventSink   │
//! │  (embedded-hal)     (PwmOutput)   (TimePort)    (EventSink)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  EdgeDispatcher (core 0)     PressLoop (core 0)        │    │
//! │  │  blink decoder · sampler     press decoder · matcher   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Actuator loops (core 1): key relay · servo · bell · buzzer    │
//! │                           heartbeat                            │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::Result;
use log::info;

use doorbot::adapters::hardware::{GpioInput, GpioOutput, LedcPwm};
use doorbot::adapters::log_sink::LogEventSink;
use doorbot::adapters::time::{SystemClock, ThreadDelay};
use doorbot::app::service::{Controller, EdgeDispatcher};
use doorbot::app::shared::SharedState;
use doorbot::config::DoorbotConfig;
use doorbot::drivers::buzzer::Buzzer;
use doorbot::drivers::door_servo::{DoorServo, ServoTiming};
use doorbot::drivers::heartbeat::Heartbeat;
use doorbot::drivers::hw_init::{self, LEDC_BUZZER, LEDC_SERVO};
use doorbot::drivers::relay::RelayPulse;
use doorbot::pins;
use doorbot::scheduler::Actuator;

/// Settings baked into the image.  Edit and reflash to change them.
const CONFIG_JSON: &str = include_str!("../config/doorbot.json");

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Doorbot v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = DoorbotConfig::from_json(CONFIG_JSON)?;
    if config.primary_code.is_none() && config.override_code.is_none() {
        log::warn!("No secret codes configured; button entry can only ring the bell");
    }

    // ── 3. Peripherals + edge interrupts ──────────────────────
    let shared = Arc::new(SharedState::new());
    hw_init::init_peripherals()?;
    hw_init::init_edge_interrupts(&shared)?;

    // ── 4. Adapters ───────────────────────────────────────────
    let clock = Arc::new(SystemClock::new());
    let sink = Arc::new(LogEventSink::new());
    let delay = ThreadDelay;

    let edges = EdgeDispatcher::new(
        &config,
        GpioInput::new(pins::INDICATOR_INPUT_GPIO),
        GpioInput::new(pins::BUTTON_INPUT_GPIO),
        delay,
    );

    // ── 5. Actuators ──────────────────────────────────────────
    let actuators: Vec<Box<dyn Actuator>> = vec![
        Box::new(RelayPulse::key_button(
            GpioOutput::new(pins::KEY_RELAY_GPIO),
            delay,
            config.key_button_press_ms,
        )),
        Box::new(DoorServo::new(
            LedcPwm::new(LEDC_SERVO, "door servo"),
            GpioOutput::new(pins::SERVO_POWER_GPIO),
            delay,
            ServoTiming::from_config(&config),
        )),
        Box::new(RelayPulse::doorbell(
            GpioOutput::new(pins::DOORBELL_RELAY_GPIO),
            delay,
            config.doorbell_press_ms,
        )),
        Box::new(Buzzer::new(
            LedcPwm::new(LEDC_BUZZER, "buzzer"),
            delay,
            config.buzzer_duty_percent,
        )),
        Box::new(Heartbeat::new(
            GpioOutput::new(pins::HEARTBEAT_GPIO),
            delay,
            config.heartbeat_pulse_ms,
            config.heartbeat_period_ms,
        )),
    ];

    // ── 6. Run until a loop exits ─────────────────────────────
    let controller = Controller::start(&config, shared, edges, actuators, clock, delay, sink)?;
    info!("System ready.");
    controller.wait()?;

    info!("Doorbot stopped");
    Ok(())
}
