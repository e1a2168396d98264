mod aht20;
mod sampler;

pub use aht20::Aht20;
pub use sampler::{Reading, SensorSampler};

use async_trait::async_trait;
use i2cdev::linux::LinuxI2CError;
use std::fmt;

/// An uncalibrated temperature/humidity pair straight from the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub temperature_c: f32,
    pub humidity_percent: f32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SensorDriver {
    async fn read_raw(&mut self) -> Result<RawSample, SensorError>;
}

#[derive(Debug, PartialEq)]
pub enum ConversionError {
    BadChecksum,
    UnexpectedInput,
}

#[derive(Debug)]
pub enum SensorError {
    I2c(LinuxI2CError),
    Busy,
    Uncalibrated,
    Conversion(ConversionError),
    Timeout,
}

impl From<LinuxI2CError> for SensorError {
    fn from(err: LinuxI2CError) -> Self {
        Self::I2c(err)
    }
}

impl From<ConversionError> for SensorError {
    fn from(err: ConversionError) -> Self {
        Self::Conversion(err)
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I2c(err) => write!(f, "i2c error: {err}"),
            Self::Busy => write!(f, "sensor still busy measuring"),
            Self::Uncalibrated => write!(f, "sensor refused calibration"),
            Self::Conversion(ConversionError::BadChecksum) => write!(f, "bad checksum"),
            Self::Conversion(ConversionError::UnexpectedInput) => write!(f, "unexpected input"),
            Self::Timeout => write!(f, "timed out"),
        }
    }
}

impl std::error::Error for SensorError {}
