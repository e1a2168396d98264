use async_trait::async_trait;
use chipp_http::{HttpClient, NoInterceptor};
use log::debug;
use serde::Deserialize;
use url::Url;

use super::{Location, WeatherError, WeatherReport, WeatherSource};

/// Client for OpenWeather's current weather endpoint.
pub struct OpenWeather {
    client: HttpClient<NoInterceptor>,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ResponseBody {
    main: Main,
    wind: Wind,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Deserialize)]
struct Main {
    temp: f32,
}

#[derive(Deserialize)]
struct Wind {
    speed: f32,
}

#[derive(Deserialize)]
struct Condition {
    description: String,
}

impl OpenWeather {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, WeatherError> {
        let client = HttpClient::new(base_url)
            .map_err(|err| WeatherError::InvalidUrl(err.to_string()))?;

        Ok(OpenWeather {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn request_url(&self, location: &Location) -> Result<Url, WeatherError> {
        let mut params = match location {
            Location::Coordinates { lat, lon } => {
                vec![("lat", lat.to_string()), ("lon", lon.to_string())]
            }
            Location::City(city) => vec![("q", city.clone())],
        };
        params.push(("units", "metric".to_string()));
        params.push(("appid", self.api_key.clone()));

        Url::parse_with_params(&self.base_url, &params)
            .map_err(|err| WeatherError::InvalidUrl(err.to_string()))
    }
}

impl ResponseBody {
    fn into_report(self) -> Result<WeatherReport, WeatherError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or(WeatherError::MissingCondition)?;

        Ok(WeatherReport {
            temperature_c: self.main.temp,
            wind_speed: self.wind.speed,
            description: condition.description,
        })
    }
}

#[async_trait]
impl WeatherSource for OpenWeather {
    async fn fetch(&self, location: &Location) -> Result<WeatherReport, WeatherError> {
        let url = self.request_url(location)?;
        debug!("requesting weather for {location}");

        let request = self
            .client
            .new_request_with_url(url.to_string())
            .map_err(|err| WeatherError::InvalidUrl(err.to_string()))?;

        let body: ResponseBody = self
            .client
            .perform_request(request, chipp_http::json::parse_json)
            .await?;

        body.into_report()
    }
}
