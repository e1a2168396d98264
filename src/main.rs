use envconfig::Envconfig;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

use weather_station::config::AppConfig;
use weather_station::coordinator::Coordinator;
use weather_station::display::{Hd44780, LcdPins};
use weather_station::screen::ScreenRotator;
use weather_station::sensor::{Aht20, SensorSampler};
use weather_station::storage::SqliteStore;
use weather_station::weather::{OpenWeather, WeatherCache};
use weather_station::Error;

type ErasedError = Box<dyn std::error::Error>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ErasedError> {
    dotenvy::dotenv().ok();
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init_timed();

    info!("weather-station version {VERSION}");

    let config = AppConfig::init_from_env().map_err(Error::from)?;

    let store = SqliteStore::open(&config.db_path)?;
    info!("logging to {}", config.db_path);

    let sensor = Aht20::init(&config.i2c_bus, config.aht20_i2c_addr)?;
    info!("found sensor {:?} on {}", sensor, config.i2c_bus);

    let lcd = Hd44780::init(
        &config.gpio_chip,
        LcdPins {
            rs: config.lcd_rs_pin,
            enable: config.lcd_e_pin,
            data: [
                config.lcd_d4_pin,
                config.lcd_d5_pin,
                config.lcd_d6_pin,
                config.lcd_d7_pin,
            ],
        },
    )?;

    let weather = match config.weather_api_key() {
        Some(api_key) => {
            let source = OpenWeather::new(&config.weather_url, api_key)?;
            let cache = WeatherCache::new(
                Box::new(source),
                config.weather_location(),
                config.weather_ttl(),
                config.weather_timeout(),
            );
            info!(
                "weather for {} cached for {:?}",
                config.weather_location(),
                cache.ttl()
            );
            Some(Arc::new(cache))
        }
        None => {
            warn!("OPENWEATHER_API_KEY not set, weather screen disabled");
            None
        }
    };

    let rotator = ScreenRotator::new(
        config.dwell(),
        config.stale_after(),
        weather.as_ref().map(|cache| cache.ttl()),
    );
    let sampler = SensorSampler::new(Box::new(sensor), config.temperature_offset);

    let mut coordinator = Coordinator::new(
        config.schedule(),
        sampler,
        Box::new(lcd),
        Box::new(store),
        rotator,
    );
    if let Some(cache) = weather {
        coordinator = coordinator.with_weather(cache);
    }

    let stop = CancellationToken::new();
    tokio::spawn(stop_on_signal(stop.clone()));

    coordinator.run(stop).await;
    info!("bye");

    Ok(())
}

async fn stop_on_signal(stop: CancellationToken) {
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(err) => {
            error!("unable to listen for SIGTERM: {err}");
            let _ = tokio::signal::ctrl_c().await;
            stop.cancel();
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("got SIGINT, stopping..."),
        _ = terminate.recv() => info!("got SIGTERM, stopping..."),
    }

    stop.cancel();
}
