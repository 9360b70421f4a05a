pub mod alert;
pub mod bus;
pub mod chip_temp;
pub mod imu;
pub mod light;
pub mod oled;
