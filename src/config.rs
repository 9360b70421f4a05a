// EnvStation — Hardware & System Configuration
// Target: ESP32-C3 (RISC-V) running ESP-IDF; sensors and OLED share one I2C bus.

use std::time::Duration;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions
// ---------------------------------------------------------------------------
pub const PIN_I2C_SDA: i32 = 6;     // Shared sensor + OLED data line
pub const PIN_I2C_SCL: i32 = 7;     // Shared sensor + OLED clock line
pub const PIN_HEARTBEAT: i32 = 8;   // Auxiliary heartbeat LED
pub const PIN_ALERT: i32 = 10;      // Active buzzer / failure indicator
pub const ADC_CHANNEL_TEMP: u32 = 2; // Analog temperature channel (ADC1)

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_BAUDRATE_HZ: u32 = 100_000;
pub const I2C_ADDR_MPU6050: u8 = 0x68;
pub const I2C_ADDR_BH1750: u8 = 0x23;
pub const I2C_ADDR_OLED: u8 = 0x3C;
pub const I2C_WAKE_TIMEOUT: Duration = Duration::from_millis(10);
pub const I2C_READ_TIMEOUT: Duration = Duration::from_millis(5);
pub const I2C_OLED_TIMEOUT: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// Display (SSD1306 OLED)
// ---------------------------------------------------------------------------
pub const SCREEN_WIDTH: u32 = 128;
pub const SCREEN_HEIGHT: u32 = 64;
pub const DISPLAY_BUFFER_SIZE: usize = (SCREEN_WIDTH as usize * SCREEN_HEIGHT as usize) / 8; // 1024
pub const STATUS_LINES: usize = 4;
pub const STATUS_LINE_CAPACITY: usize = 32;
pub const STATUS_LINE_Y: [i32; STATUS_LINES] = [0, 16, 32, 48];

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes) and Priorities
// ---------------------------------------------------------------------------
pub const STACK_SENSOR: usize = 8192;
pub const STACK_TELEMETRY: usize = 8192;
pub const PRIORITY_SENSOR: u8 = 4;    // Sampling outranks delivery
pub const PRIORITY_TELEMETRY: u8 = 3;

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------
pub const SAMPLE_QUEUE_CAPACITY: usize = 5;
pub const SENSOR_PERIOD: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Wireless link
// ---------------------------------------------------------------------------
pub const WIFI_SSID: &str = env!("WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");
pub const ASSOCIATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const ASSOCIATION_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const ASSOCIATION_MAX_ATTEMPTS: u32 = 3;
pub const LINK_UP_HOLD: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Telemetry collector
// ---------------------------------------------------------------------------
pub const COLLECTOR_HOST: &str = env!("COLLECTOR_HOST");
pub const COLLECTOR_PORT: &str = env!("COLLECTOR_PORT");
pub const COLLECTOR_PATH: &str = env!("COLLECTOR_PATH");
pub const COLLECTOR_DEFAULT_PORT: u16 = 5001;
pub const NET_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const NET_IO_TIMEOUT: Duration = Duration::from_secs(5);
pub const PAYLOAD_CAPACITY: usize = 256;
pub const REQUEST_CAPACITY: usize = 512;
pub const RESPONSE_CHUNK: usize = 128;

// ---------------------------------------------------------------------------
// Sensor conversion constants
// ---------------------------------------------------------------------------
pub const BH1750_LUX_DIVISOR: f32 = 1.2;
pub const ADC_REFERENCE_VOLTS: f32 = 3.3;
pub const ADC_RESOLUTION_BITS: u32 = 12;
pub const TEMP_REFERENCE_VOLTS: f32 = 0.706;  // at 27 °C
pub const TEMP_REFERENCE_CELSIUS: f32 = 27.0;
pub const TEMP_SLOPE_VOLTS_PER_C: f32 = 0.001721;

// ---------------------------------------------------------------------------
// Alert patterns (on, off) in milliseconds
// ---------------------------------------------------------------------------
pub const ALERT_STARTUP: &[(u64, u64)] = &[(100, 50), (100, 50)];
pub const ALERT_LINK_UP: &[(u64, u64)] = &[(100, 100), (100, 50)];
pub const ALERT_LINK_FAILED: &[(u64, u64)] = &[(1000, 50)];
pub const ALERT_HALTED: &[(u64, u64)] = &[(200, 200), (200, 200), (600, 1000)];
