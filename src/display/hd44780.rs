use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use std::thread;
use std::time::Duration;

use super::{CharacterDisplay, DisplayError, Line, Row};

const CONSUMER: &str = "weather-station-lcd";

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE_INCREMENT: u8 = 0x06;
const CMD_DISPLAY_ON: u8 = 0x0C;
const CMD_FUNCTION_4BIT_2LINE: u8 = 0x28;
const CMD_SET_DDRAM: u8 = 0x80;

const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

/// BCM line offsets of the LCD wiring.
#[derive(Debug, Clone, Copy)]
pub struct LcdPins {
    pub rs: u32,
    pub enable: u32,
    /// D4 to D7.
    pub data: [u32; 4],
}

/// HD44780 16x2 character LCD driven in 4-bit mode, write only.
pub struct Hd44780 {
    rs: LineHandle,
    enable: LineHandle,
    data: [LineHandle; 4],
}

impl Hd44780 {
    pub fn init(chip_path: &str, pins: LcdPins) -> Result<Self, DisplayError> {
        let mut chip = Chip::new(chip_path)?;
        let mut output = |offset: u32| -> Result<LineHandle, gpio_cdev::Error> {
            chip.get_line(offset)?
                .request(LineRequestFlags::OUTPUT, 0, CONSUMER)
        };

        let mut lcd = Hd44780 {
            rs: output(pins.rs)?,
            enable: output(pins.enable)?,
            data: [
                output(pins.data[0])?,
                output(pins.data[1])?,
                output(pins.data[2])?,
                output(pins.data[3])?,
            ],
        };
        lcd.initialize()?;

        Ok(lcd)
    }

    fn initialize(&mut self) -> Result<(), gpio_cdev::Error> {
        // Wake-up sequence from the datasheet: three times 0x3 in 8-bit
        // mode, then 0x2 to switch to 4-bit.
        thread::sleep(Duration::from_millis(50));
        self.rs.set_value(0)?;
        self.write_nibble(0x03)?;
        thread::sleep(Duration::from_millis(5));
        self.write_nibble(0x03)?;
        thread::sleep(Duration::from_millis(5));
        self.write_nibble(0x03)?;
        thread::sleep(Duration::from_micros(150));
        self.write_nibble(0x02)?;

        self.command(CMD_FUNCTION_4BIT_2LINE)?;
        self.command(CMD_DISPLAY_ON)?;
        self.command(CMD_ENTRY_MODE_INCREMENT)?;
        self.clear_screen()
    }

    fn clear_screen(&mut self) -> Result<(), gpio_cdev::Error> {
        self.command(CMD_CLEAR)?;
        thread::sleep(Duration::from_millis(2));
        Ok(())
    }

    fn command(&mut self, byte: u8) -> Result<(), gpio_cdev::Error> {
        self.rs.set_value(0)?;
        self.write_byte(byte)
    }

    fn character(&mut self, byte: u8) -> Result<(), gpio_cdev::Error> {
        self.rs.set_value(1)?;
        self.write_byte(byte)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), gpio_cdev::Error> {
        self.write_nibble(byte >> 4)?;
        self.write_nibble(byte & 0x0F)
    }

    fn write_nibble(&mut self, nibble: u8) -> Result<(), gpio_cdev::Error> {
        for (bit, line) in self.data.iter().enumerate() {
            line.set_value((nibble >> bit) & 1)?;
        }
        self.pulse_enable()
    }

    fn pulse_enable(&mut self) -> Result<(), gpio_cdev::Error> {
        self.enable.set_value(1)?;
        thread::sleep(Duration::from_micros(1));
        self.enable.set_value(0)?;
        // Most commands need 37 us to settle.
        thread::sleep(Duration::from_micros(50));
        Ok(())
    }
}

impl CharacterDisplay for Hd44780 {
    fn write(&mut self, row: Row, line: &Line) -> Result<(), DisplayError> {
        self.command(CMD_SET_DDRAM | ROW_OFFSETS[usize::from(row.index())])?;

        for byte in line.as_str().bytes() {
            self.character(byte)?;
        }

        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        Ok(self.clear_screen()?)
    }
}
