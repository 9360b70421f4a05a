// EnvStation — SSD1306 OLED Driver (128×64, I2C)
//
// Off-screen 1 bpp framebuffer in the panel's native page layout (8 rows per
// byte), rendered with embedded-graphics and pushed in one flush.

use core::convert::Infallible;

use embedded_graphics::{
    mono_font::{ascii::FONT_10X20, ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};

use crate::config::*;
use crate::display::DisplaySink;
use crate::drivers::bus::{BusError, I2cBus};

const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;
const DATA_CHUNK: usize = 32;

const INIT_SEQUENCE: &[u8] = &[
    0xAE, // display off
    0xD5, 0x80, // clock divide
    0xA8, 0x3F, // multiplex 64
    0xD3, 0x00, // display offset
    0x40, // start line 0
    0x8D, 0x14, // charge pump on
    0x20, 0x00, // horizontal addressing
    0xA1, // segment remap
    0xC8, // COM scan descending
    0xDA, 0x12, // COM pins
    0x81, 0xCF, // contrast
    0xD9, 0xF1, // pre-charge
    0xDB, 0x40, // VCOMH deselect
    0xA4, // resume from RAM
    0xA6, // normal (not inverted)
    0xAF, // display on
];

pub struct Ssd1306<B> {
    bus: B,
    addr: u8,
    buffer: [u8; DISPLAY_BUFFER_SIZE],
}

impl<B: I2cBus> Ssd1306<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            addr: I2C_ADDR_OLED,
            buffer: [0; DISPLAY_BUFFER_SIZE],
        }
    }

    /// Send the power-up sequence and blank the panel.
    pub fn init(&mut self) -> Result<(), BusError> {
        for &cmd in INIT_SEQUENCE {
            self.command(cmd)?;
        }
        self.buffer.fill(0);
        self.flush_buffer()
    }

    pub fn is_connected(&mut self) -> bool {
        self.command(0xE3).is_ok() // NOP
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, on: bool) {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return;
        }
        let idx = x as usize + (y as usize / 8) * SCREEN_WIDTH as usize;
        let bit = 1u8 << (y % 8);
        if on {
            self.buffer[idx] |= bit;
        } else {
            self.buffer[idx] &= !bit;
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> bool {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return false;
        }
        let idx = x as usize + (y as usize / 8) * SCREEN_WIDTH as usize;
        self.buffer[idx] & (1u8 << (y % 8)) != 0
    }

    fn command(&mut self, cmd: u8) -> Result<(), BusError> {
        self.bus.write_all(self.addr, &[CONTROL_COMMAND, cmd], I2C_OLED_TIMEOUT)
    }

    fn flush_buffer(&mut self) -> Result<(), BusError> {
        // Full-screen window: columns 0..127, pages 0..7.
        for cmd in [0x21, 0x00, 0x7F, 0x22, 0x00, 0x07] {
            self.command(cmd)?;
        }
        let mut packet = [0u8; DATA_CHUNK + 1];
        packet[0] = CONTROL_DATA;
        for chunk in self.buffer.chunks(DATA_CHUNK) {
            packet[1..=chunk.len()].copy_from_slice(chunk);
            self.bus
                .write_all(self.addr, &packet[..=chunk.len()], I2C_OLED_TIMEOUT)?;
        }
        Ok(())
    }
}

impl<B> OriginDimensions for Ssd1306<B> {
    fn size(&self) -> Size {
        Size::new(SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

impl<B: I2cBus> DrawTarget for Ssd1306<B> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set_pixel(point.x as u32, point.y as u32, color.is_on());
            }
        }
        Ok(())
    }
}

impl<B: I2cBus> DisplaySink for Ssd1306<B> {
    type Error = BusError;

    fn clear(&mut self) {
        self.buffer.fill(0);
    }

    fn draw_text(&mut self, x: i32, y: i32, scale: u8, text: &str) {
        let font = if scale >= 2 { &FONT_10X20 } else { &FONT_6X10 };
        let style = MonoTextStyle::new(font, BinaryColor::On);
        // Drawing into RAM cannot fail.
        let _ = Text::with_baseline(text, Point::new(x, y), style, Baseline::Top).draw(self);
    }

    fn flush(&mut self) -> Result<(), BusError> {
        self.flush_buffer()
    }
}
