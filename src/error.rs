use std::fmt;

use crate::display::DisplayError;
use crate::sensor::SensorError;
use crate::weather::WeatherError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The driver failed and there was no earlier reading to fall back on.
    SensorRead(SensorError),
    SensorNotReady,
    /// A weather fetch is in flight and nothing has been cached yet.
    WeatherNotReady,
    WeatherUnavailable(WeatherError),
    DisplayWrite(DisplayError),
    PersistenceWrite(rusqlite::Error),
    Config(envconfig::Error),
}

impl From<SensorError> for Error {
    fn from(err: SensorError) -> Self {
        Self::SensorRead(err)
    }
}

impl From<DisplayError> for Error {
    fn from(err: DisplayError) -> Self {
        Self::DisplayWrite(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::PersistenceWrite(err)
    }
}

impl From<envconfig::Error> for Error {
    fn from(err: envconfig::Error) -> Self {
        Self::Config(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SensorRead(err) => write!(f, "sensor read error: {err}"),
            Self::SensorNotReady => write!(f, "no sensor reading yet"),
            Self::WeatherNotReady => write!(f, "weather fetch in flight, nothing cached yet"),
            Self::WeatherUnavailable(err) => write!(f, "weather unavailable: {err}"),
            Self::DisplayWrite(err) => write!(f, "display write error: {err}"),
            Self::PersistenceWrite(err) => write!(f, "persistence write error: {err}"),
            Self::Config(err) => write!(f, "config error: {err}"),
        }
    }
}

impl std::error::Error for Error {}
