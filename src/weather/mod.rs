mod cache;
mod openweather;

pub use cache::WeatherCache;
pub use openweather::OpenWeather;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Coordinates { lat: f64, lon: f64 },
    City(String),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coordinates { lat, lon } => write!(f, "{lat},{lon}"),
            Self::City(city) => f.write_str(city),
        }
    }
}

/// What a single remote call returns.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub temperature_c: f32,
    /// Meters per second.
    pub wind_speed: f32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub temperature_c: f32,
    pub wind_speed: f32,
    pub description: String,
    pub fetched_at: DateTime<Local>,
    pub location: Location,
}

impl WeatherSnapshot {
    pub fn new(report: WeatherReport, location: Location, fetched_at: DateTime<Local>) -> Self {
        WeatherSnapshot {
            temperature_c: report.temperature_c,
            wind_speed: report.wind_speed,
            description: report.description,
            fetched_at,
            location,
        }
    }
}

#[async_trait]
pub trait WeatherSource {
    async fn fetch(&self, location: &Location) -> Result<WeatherReport, WeatherError>;
}

#[derive(Debug)]
pub enum WeatherError {
    InvalidUrl(String),
    Http(chipp_http::Error),
    MissingCondition,
    Timeout,
}

impl From<chipp_http::Error> for WeatherError {
    fn from(err: chipp_http::Error) -> Self {
        Self::Http(err)
    }
}

impl fmt::Display for WeatherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(err) => write!(f, "invalid url: {err}"),
            Self::Http(err) => write!(f, "http error: {err}"),
            Self::MissingCondition => write!(f, "response has no weather condition"),
            Self::Timeout => write!(f, "timed out"),
        }
    }
}

impl std::error::Error for WeatherError {}
