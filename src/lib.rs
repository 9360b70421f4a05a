// EnvStation — Firmware Core
//
// Sensor task → bounded sample queue → telemetry task, with a shared status
// display and a boot-time link supervisor.  Hardware sits behind traits; the
// ESP-IDF implementations live in `platform` and only build for that target.

pub mod clock;
pub mod config;
pub mod display;
pub mod drivers;
pub mod events;
pub mod fault;
pub mod link;
pub mod platform;
pub mod queue;
pub mod tasks;
pub mod telemetry;
