mod hd44780;

pub use hd44780::{Hd44780, LcdPins};

use std::fmt;

use crate::util;

pub const COLUMNS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    Top,
    Bottom,
}

impl Row {
    pub fn index(self) -> u8 {
        match self {
            Row::Top => 0,
            Row::Bottom => 1,
        }
    }
}

/// Exactly [`COLUMNS`] printable ASCII characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line(String);

impl Line {
    pub fn new(text: &str) -> Self {
        Line(util::fit(&Self::sanitize(text), COLUMNS))
    }

    pub fn centered(text: &str) -> Self {
        Line(util::center(&Self::sanitize(text), COLUMNS))
    }

    pub fn blank() -> Self {
        Self::new("")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // The controller's character ROM only matches ASCII.
    fn sanitize(text: &str) -> String {
        text.chars()
            .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
            .collect()
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait CharacterDisplay {
    fn write(&mut self, row: Row, line: &Line) -> Result<(), DisplayError>;
    fn clear(&mut self) -> Result<(), DisplayError>;
}

#[derive(Debug)]
pub enum DisplayError {
    Gpio(gpio_cdev::Error),
}

impl From<gpio_cdev::Error> for DisplayError {
    fn from(err: gpio_cdev::Error) -> Self {
        Self::Gpio(err)
    }
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpio(err) => write!(f, "gpio error: {err}"),
        }
    }
}

impl std::error::Error for DisplayError {}
