mod clocks;

use clocks::{DisplayClock, LogClock, SensorClock, Tick, WeatherClock};

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::display::CharacterDisplay;
use crate::error::Error;
use crate::screen::ScreenRotator;
use crate::sensor::SensorSampler;
use crate::state::SharedState;
use crate::storage::ReadingStore;
use crate::weather::WeatherCache;

// tokio intervals refuse a zero period.
const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Running,
    ShuttingDown,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub sensor: Duration,
    pub display: Duration,
    pub log: Duration,
    pub weather: Duration,
}

/// Drives the sensor, display, log and weather clocks.
///
/// Each clock is its own task and ticks strictly one after another; clocks
/// don't wait for each other. A failing tick is logged and the clock carries
/// on. Cancelling the stop token lets running ticks finish and schedules
/// nothing new.
pub struct Coordinator {
    schedule: Schedule,
    sampler: SensorSampler,
    display: Box<dyn CharacterDisplay + Send>,
    store: Box<dyn ReadingStore + Send>,
    rotator: ScreenRotator,
    weather: Option<Arc<WeatherCache>>,
    state: SharedState,
    lifecycle: watch::Sender<Lifecycle>,
}

impl Coordinator {
    pub fn new(
        schedule: Schedule,
        sampler: SensorSampler,
        display: Box<dyn CharacterDisplay + Send>,
        store: Box<dyn ReadingStore + Send>,
        rotator: ScreenRotator,
    ) -> Self {
        let (lifecycle, _) = watch::channel(Lifecycle::Idle);

        Coordinator {
            schedule,
            sampler,
            display,
            store,
            rotator,
            weather: None,
            state: SharedState::new(),
            lifecycle,
        }
    }

    pub fn with_weather(mut self, cache: Arc<WeatherCache>) -> Self {
        self.weather = Some(cache);
        self
    }

    pub fn lifecycle(&self) -> watch::Receiver<Lifecycle> {
        self.lifecycle.subscribe()
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// Runs until `stop` is cancelled and every clock has wound down.
    pub async fn run(self, stop: CancellationToken) {
        let Coordinator {
            schedule,
            sampler,
            display,
            store,
            rotator,
            weather,
            state,
            lifecycle,
        } = self;

        lifecycle.send_replace(Lifecycle::Running);
        info!("starting clocks: {schedule:?}");

        let now = Instant::now();
        let mut clocks = vec![
            tokio::spawn(run_clock(
                SensorClock {
                    sampler,
                    state: state.clone(),
                },
                now,
                schedule.sensor,
                stop.clone(),
            )),
            tokio::spawn(run_clock(
                DisplayClock::new(display, rotator, state.clone(), weather.clone()),
                now,
                schedule.display,
                stop.clone(),
            )),
            // Give the first reading a chance to land before the first row.
            tokio::spawn(run_clock(
                LogClock {
                    store,
                    state: state.clone(),
                },
                now + schedule.sensor,
                schedule.log,
                stop.clone(),
            )),
        ];

        if let Some(cache) = weather {
            clocks.push(tokio::spawn(run_clock(
                WeatherClock { cache },
                now,
                schedule.weather,
                stop.clone(),
            )));
        }

        stop.cancelled().await;
        lifecycle.send_replace(Lifecycle::ShuttingDown);
        info!("stop requested, waiting for clocks");

        for result in futures::future::join_all(clocks).await {
            if let Err(err) = result {
                error!("clock task failed: {err}");
            }
        }

        lifecycle.send_replace(Lifecycle::Stopped);
        info!("all clocks stopped");
    }
}

async fn run_clock<T>(mut clock: T, start: Instant, period: Duration, stop: CancellationToken)
where
    T: Tick + 'static,
{
    let mut timer = tokio::time::interval_at(start, period.max(MIN_PERIOD));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = timer.tick() => {}
        }

        match clock.tick().await {
            Ok(()) => (),
            Err(Error::SensorNotReady) => warn!("{} tick skipped: no reading yet", clock.name()),
            Err(err) => error!("{} tick failed: {err}", clock.name()),
        }
    }

    clock.finish().await;
    debug!("{} clock stopped", clock.name());
}
