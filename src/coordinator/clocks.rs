use async_trait::async_trait;
use chrono::Local;
use log::{info, trace, warn};
use std::sync::Arc;
use tokio::time::Instant;

use crate::display::{CharacterDisplay, Row};
use crate::error::{Error, Result};
use crate::screen::{DisplayState, Frame, ScreenRotator};
use crate::sensor::SensorSampler;
use crate::state::SharedState;
use crate::storage::{ReadingStore, TIMESTAMP_FORMAT};
use crate::weather::WeatherCache;

/// One bounded unit of work, run once per firing of its clock.
#[async_trait]
pub(crate) trait Tick: Send {
    fn name(&self) -> &'static str;

    async fn tick(&mut self) -> Result<()>;

    /// Runs once after the last tick.
    async fn finish(&mut self) {}
}

pub(crate) struct SensorClock {
    pub sampler: SensorSampler,
    pub state: SharedState,
}

#[async_trait]
impl Tick for SensorClock {
    fn name(&self) -> &'static str {
        "sensor"
    }

    async fn tick(&mut self) -> Result<()> {
        let reading = self.sampler.read().await?;
        trace!(
            "reading {:.2} C, {:.2} % from {}",
            reading.temperature_c,
            reading.humidity_percent,
            reading.taken_at
        );
        self.state.replace_reading(reading).await;

        Ok(())
    }
}

pub(crate) struct DisplayClock {
    display: Box<dyn CharacterDisplay + Send>,
    rotator: ScreenRotator,
    screen: DisplayState,
    state: SharedState,
    weather: Option<Arc<WeatherCache>>,
    shown: Option<Frame>,
}

impl DisplayClock {
    pub fn new(
        display: Box<dyn CharacterDisplay + Send>,
        rotator: ScreenRotator,
        state: SharedState,
        weather: Option<Arc<WeatherCache>>,
    ) -> Self {
        DisplayClock {
            display,
            rotator,
            screen: DisplayState::new(Instant::now()),
            state,
            weather,
            shown: None,
        }
    }
}

#[async_trait]
impl Tick for DisplayClock {
    fn name(&self) -> &'static str {
        "display"
    }

    async fn tick(&mut self) -> Result<()> {
        if self.screen.advance(Instant::now(), self.rotator.dwell()) {
            trace!("showing screen {}", self.screen.screen_index());
        }

        let reading = self.state.reading().await;
        let weather = self.weather.as_ref().and_then(|cache| cache.latest());
        let frame = self.rotator.render(
            self.screen.screen_index(),
            reading.as_ref(),
            weather.as_ref(),
            Local::now(),
        );

        if self.shown.as_ref() == Some(&frame) {
            return Ok(());
        }

        // Half a frame may be on the glass if the second row fails.
        self.shown = None;
        self.display.write(Row::Top, &frame.top)?;
        self.display.write(Row::Bottom, &frame.bottom)?;
        self.shown = Some(frame);

        Ok(())
    }

    async fn finish(&mut self) {
        if let Err(err) = self.display.clear() {
            warn!("unable to clear display: {err}");
        }
    }
}

pub(crate) struct LogClock {
    pub store: Box<dyn ReadingStore + Send>,
    pub state: SharedState,
}

#[async_trait]
impl Tick for LogClock {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn tick(&mut self) -> Result<()> {
        let reading = self.state.reading().await.ok_or(Error::SensorNotReady)?;
        let now = Local::now();

        let id = self
            .store
            .append(now, reading.temperature_c, reading.humidity_percent)?;

        info!(
            "[{}] saved row {id}: {:.2} C, {:.2} %",
            now.format(TIMESTAMP_FORMAT),
            reading.temperature_c,
            reading.humidity_percent
        );

        Ok(())
    }
}

pub(crate) struct WeatherClock {
    pub cache: Arc<WeatherCache>,
}

#[async_trait]
impl Tick for WeatherClock {
    fn name(&self) -> &'static str {
        "weather"
    }

    async fn tick(&mut self) -> Result<()> {
        let snapshot = self.cache.get().await?;
        trace!(
            "weather {:.1} C, wind {:.1} m/s from {}",
            snapshot.temperature_c,
            snapshot.wind_speed,
            snapshot.fetched_at
        );

        Ok(())
    }
}
