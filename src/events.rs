// EnvStation — Pipeline Data Types

// ---------------------------------------------------------------------------
// Acceleration (raw MPU6050 counts, ±2 g default range)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Acceleration {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

// ---------------------------------------------------------------------------
// Sample — one snapshot per sensor cycle
// ---------------------------------------------------------------------------
/// Produced by the sensor task and moved, never shared, through the sample
/// queue to the telemetry task.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    /// Illuminance in lux; 0.0 when the light sensor read failed.
    pub lux: f32,
    /// Raw accelerometer counts; zeros when the motion read failed.
    pub accel: Acceleration,
    /// Best-effort chip temperature in °C.
    pub temp_c: f32,
    /// Link quality in dBm; 0 when the link is down.
    pub rssi: i32,
    /// Seconds since the scheduler started.
    pub uptime_s: u32,
}
