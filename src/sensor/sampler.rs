use chrono::{DateTime, Local};
use log::warn;

use super::SensorDriver;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature_c: f32,
    pub humidity_percent: f32,
    pub taken_at: DateTime<Local>,
}

/// Calibrated, failure-tolerant view of a [`SensorDriver`].
///
/// A failed read hands back the last good [`Reading`] untouched, so its
/// `taken_at` keeps ageing and callers can tell it is stale. There are no
/// retries here; the next read is whenever the caller asks again.
pub struct SensorSampler {
    driver: Box<dyn SensorDriver + Send>,
    offset: f32,
    last: Option<Reading>,
}

impl SensorSampler {
    pub fn new(driver: Box<dyn SensorDriver + Send>, offset: f32) -> Self {
        SensorSampler {
            driver,
            offset,
            last: None,
        }
    }

    pub async fn read(&mut self) -> Result<Reading> {
        match self.driver.read_raw().await {
            Ok(raw) => {
                let reading = Reading {
                    temperature_c: raw.temperature_c + self.offset,
                    humidity_percent: raw.humidity_percent,
                    taken_at: Local::now(),
                };
                self.last = Some(reading);

                Ok(reading)
            }
            Err(err) => match self.last {
                Some(last) => {
                    warn!("sensor read failed, reusing reading from {}: {err}", last.taken_at);
                    Ok(last)
                }
                None => {
                    warn!("sensor read failed before first reading: {err}");
                    Err(Error::SensorNotReady)
                }
            },
        }
    }

    pub fn last(&self) -> Option<Reading> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{MockSensorDriver, RawSample, SensorError};

    fn sample(temperature_c: f32, humidity_percent: f32) -> RawSample {
        RawSample {
            temperature_c,
            humidity_percent,
        }
    }

    #[tokio::test]
    async fn applies_calibration_offset() {
        let mut driver = MockSensorDriver::new();
        driver
            .expect_read_raw()
            .times(1)
            .returning(|| Ok(sample(21.5, 45.0)));

        let mut sampler = SensorSampler::new(Box::new(driver), -0.9);
        let reading = sampler.read().await.unwrap();

        assert!((reading.temperature_c - 20.6).abs() < 1e-4);
        assert_eq!(reading.humidity_percent, 45.0);
    }

    #[tokio::test]
    async fn reuses_last_reading_after_failure() {
        let mut calls = 0;
        let mut driver = MockSensorDriver::new();
        driver.expect_read_raw().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(sample(21.5, 45.0))
            } else {
                Err(SensorError::Busy)
            }
        });

        let mut sampler = SensorSampler::new(Box::new(driver), 0.0);
        let first = sampler.read().await.unwrap();
        let second = sampler.read().await.unwrap();

        assert_eq!(second, first);
        assert_eq!(second.taken_at, first.taken_at);
    }

    #[tokio::test]
    async fn not_ready_before_first_success() {
        let mut driver = MockSensorDriver::new();
        driver
            .expect_read_raw()
            .returning(|| Err(SensorError::Timeout));

        let mut sampler = SensorSampler::new(Box::new(driver), 0.0);

        assert!(matches!(sampler.read().await, Err(Error::SensorNotReady)));
        assert_eq!(sampler.last(), None);
    }

    #[tokio::test]
    async fn fresh_reading_supersedes_old_one() {
        let mut calls = 0;
        let mut driver = MockSensorDriver::new();
        driver.expect_read_raw().returning(move || {
            calls += 1;
            Ok(sample(20.0 + calls as f32, 40.0))
        });

        let mut sampler = SensorSampler::new(Box::new(driver), 0.0);
        sampler.read().await.unwrap();
        let second = sampler.read().await.unwrap();

        assert_eq!(second.temperature_c, 22.0);
        assert_eq!(sampler.last(), Some(second));
    }
}
