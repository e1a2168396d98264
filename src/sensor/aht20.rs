use async_trait::async_trait;
use i2cdev::core::*;
use i2cdev::linux::LinuxI2CDevice;
use std::fmt::Debug;
use std::thread;
use std::time::Duration;

use super::{ConversionError, RawSample, SensorDriver, SensorError};
use crate::util::crc8;

const CMD_CALIBRATE: [u8; 3] = [0xBE, 0x08, 0x00];
const CMD_MEASURE: [u8; 3] = [0xAC, 0x33, 0x00];

const STATUS_BUSY: u8 = 0x80;
const STATUS_CALIBRATED: u8 = 0x08;

const FRAME_LEN: usize = 7;
const FULL_SCALE: f32 = (1 << 20) as f32;

// Datasheet says a measurement takes 80 ms.
const MEASURE_DELAY: Duration = Duration::from_millis(80);
const READ_TIMEOUT: Duration = Duration::from_millis(500);

pub struct Aht20 {
    addr: u16,
    device: LinuxI2CDevice,
}

impl Debug for Aht20 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        f.debug_struct("AHT20").field("addr", &self.addr).finish()
    }
}

impl Aht20 {
    pub fn init(bus: &str, addr: u16) -> Result<Self, SensorError> {
        let device = LinuxI2CDevice::new(bus, addr)?;
        let mut sensor = Aht20 { addr, device };

        // The sensor needs 40 ms after power-on before it accepts commands.
        thread::sleep(Duration::from_millis(40));
        sensor.calibrate()?;

        Ok(sensor)
    }

    fn status(&mut self) -> Result<u8, SensorError> {
        let mut status = [0; 1];
        self.device.read(&mut status)?;

        Ok(status[0])
    }

    fn calibrate(&mut self) -> Result<(), SensorError> {
        if self.status()? & STATUS_CALIBRATED != 0 {
            return Ok(());
        }

        log::debug!("calibrating AHT20 at {:#x}", self.addr);
        self.device.write(&CMD_CALIBRATE)?;
        thread::sleep(Duration::from_millis(10));

        if self.status()? & STATUS_CALIBRATED == 0 {
            return Err(SensorError::Uncalibrated);
        }

        Ok(())
    }

    async fn measure(&mut self) -> Result<[u8; FRAME_LEN], SensorError> {
        self.device.write(&CMD_MEASURE)?;
        tokio::time::sleep(MEASURE_DELAY).await;

        let mut frame = [0; FRAME_LEN];
        self.device.read(&mut frame)?;

        if frame[0] & STATUS_BUSY != 0 {
            return Err(SensorError::Busy);
        }

        Ok(frame)
    }
}

#[async_trait]
impl SensorDriver for Aht20 {
    async fn read_raw(&mut self) -> Result<RawSample, SensorError> {
        let frame = tokio::time::timeout(READ_TIMEOUT, self.measure())
            .await
            .map_err(|_| SensorError::Timeout)??;

        Ok(RawSample::from_frame(&frame)?)
    }
}

impl RawSample {
    /// Decodes a measurement frame: status byte, 20 bits of humidity,
    /// 20 bits of temperature, CRC.
    pub fn from_frame(frame: &[u8]) -> Result<Self, ConversionError> {
        if frame.len() != FRAME_LEN {
            return Err(ConversionError::UnexpectedInput);
        }

        Self::validate(frame)?;

        let humidity = (u32::from(frame[1]) << 12)
            | (u32::from(frame[2]) << 4)
            | (u32::from(frame[3]) >> 4);
        let temperature = (u32::from(frame[3] & 0x0F) << 16)
            | (u32::from(frame[4]) << 8)
            | u32::from(frame[5]);

        Ok(RawSample {
            humidity_percent: humidity as f32 / FULL_SCALE * 100.0,
            temperature_c: temperature as f32 / FULL_SCALE * 200.0 - 50.0,
        })
    }

    fn validate(frame: &[u8]) -> Result<(), ConversionError> {
        let (checksum, data) = frame
            .split_last()
            .ok_or(ConversionError::UnexpectedInput)?;

        if crc8(data) != *checksum {
            return Err(ConversionError::BadChecksum);
        }

        Ok(())
    }
}
