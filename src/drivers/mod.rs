//! Actuator drivers, edge sampling, hardware initialisation, and task helpers.

pub mod button;
pub mod buzzer;
pub mod door_servo;
pub mod heartbeat;
pub mod hw_init;
pub mod relay;
pub mod task_pin;
