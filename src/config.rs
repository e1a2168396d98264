use envconfig::Envconfig;
use std::time::Duration;

use crate::coordinator::Schedule;
use crate::screen::Dwell;
use crate::weather::Location;

/** Immutable config needed for app startup */
#[derive(Envconfig, Debug, Clone)]
pub struct AppConfig {
    #[envconfig(from = "SENSOR_POLL_SECS", default = "5")]
    pub sensor_poll_secs: u64,
    #[envconfig(from = "DISPLAY_TICK_MS", default = "1000")]
    pub display_tick_ms: u64,
    #[envconfig(from = "INDOOR_SCREEN_SECS", default = "10")]
    pub indoor_screen_secs: u64,
    #[envconfig(from = "COMFORT_SCREEN_SECS", default = "3")]
    pub comfort_screen_secs: u64,
    #[envconfig(from = "CLOCK_SCREEN_SECS", default = "3")]
    pub clock_screen_secs: u64,
    #[envconfig(from = "WEATHER_SCREEN_SECS", default = "5")]
    pub weather_screen_secs: u64,
    #[envconfig(from = "LOG_INTERVAL_SECS", default = "600")]
    pub log_interval_secs: u64,
    #[envconfig(from = "STALE_READING_SECS", default = "60")]
    pub stale_reading_secs: u64,
    #[envconfig(from = "TEMPERATURE_OFFSET", default = "-0.9")]
    pub temperature_offset: f32,

    #[envconfig(from = "OPENWEATHER_API_KEY")]
    pub weather_api_key: Option<String>,
    #[envconfig(
        from = "WEATHER_URL",
        default = "https://api.openweathermap.org/data/2.5/weather"
    )]
    pub weather_url: String,
    #[envconfig(from = "WEATHER_LAT")]
    pub weather_lat: Option<f64>,
    #[envconfig(from = "WEATHER_LON")]
    pub weather_lon: Option<f64>,
    #[envconfig(from = "WEATHER_CITY", default = "Satu Mare,RO")]
    pub weather_city: String,
    #[envconfig(from = "WEATHER_CACHE_SECS", default = "600")]
    pub weather_cache_secs: u64,
    #[envconfig(from = "WEATHER_POLL_SECS", default = "60")]
    pub weather_poll_secs: u64,
    #[envconfig(from = "WEATHER_TIMEOUT_SECS", default = "5")]
    pub weather_timeout_secs: u64,

    #[envconfig(from = "DB_PATH", default = "./aht20_data.sqlite")]
    pub db_path: String,

    #[envconfig(from = "I2C_BUS", default = "/dev/i2c-1")]
    pub i2c_bus: String,
    #[envconfig(from = "AHT20_I2C_ADDR", default = "56" /* 0x38 = 56 */)]
    pub aht20_i2c_addr: u16,

    #[envconfig(from = "GPIO_CHIP", default = "/dev/gpiochip0")]
    pub gpio_chip: String,
    #[envconfig(from = "LCD_RS_PIN", default = "27")]
    pub lcd_rs_pin: u32,
    #[envconfig(from = "LCD_E_PIN", default = "22")]
    pub lcd_e_pin: u32,
    #[envconfig(from = "LCD_D4_PIN", default = "25")]
    pub lcd_d4_pin: u32,
    #[envconfig(from = "LCD_D5_PIN", default = "24")]
    pub lcd_d5_pin: u32,
    #[envconfig(from = "LCD_D6_PIN", default = "23")]
    pub lcd_d6_pin: u32,
    #[envconfig(from = "LCD_D7_PIN", default = "18")]
    pub lcd_d7_pin: u32,
}

impl AppConfig {
    pub fn schedule(&self) -> Schedule {
        Schedule {
            sensor: Duration::from_secs(self.sensor_poll_secs),
            display: Duration::from_millis(self.display_tick_ms),
            log: Duration::from_secs(self.log_interval_secs),
            weather: Duration::from_secs(self.weather_poll_secs),
        }
    }

    pub fn dwell(&self) -> Dwell {
        Dwell {
            indoor: Duration::from_secs(self.indoor_screen_secs),
            comfort: Duration::from_secs(self.comfort_screen_secs),
            clock: Duration::from_secs(self.clock_screen_secs),
            weather: Duration::from_secs(self.weather_screen_secs),
        }
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_reading_secs)
    }

    pub fn weather_ttl(&self) -> Duration {
        Duration::from_secs(self.weather_cache_secs)
    }

    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather_timeout_secs)
    }

    /// Coordinates win over the city name, but only when both are set.
    pub fn weather_location(&self) -> Location {
        match (self.weather_lat, self.weather_lon) {
            (Some(lat), Some(lon)) => Location::Coordinates { lat, lon },
            _ => Location::City(self.weather_city.clone()),
        }
    }

    /// The API key, if one was configured and isn't blank.
    pub fn weather_api_key(&self) -> Option<&str> {
        self.weather_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}
