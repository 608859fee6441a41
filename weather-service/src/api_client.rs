use common::errors::AppError;
use common::http_client::HttpClient;
use serde::Deserialize;
use tracing::{info, instrument};

/// Raw payloads from the OpenWeatherMap 2.5 endpoints. Only the consumed
/// subset is modeled; unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeatherPayload {
    pub coord: Coord,
    pub main: MainConditions,
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub wind: Wind,
    pub visibility: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastPayload {
    pub list: Vec<ForecastSample>,
}

/// One 3-hour forecast sample; `dt` is a Unix timestamp.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastSample {
    pub dt: i64,
    pub main: MainConditions,
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub wind: Wind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainConditions {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: i32,
    pub pressure: f64,
    #[serde(default)]
    pub temp_min: f64,
    #[serde(default)]
    pub temp_max: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: i32,
}

pub struct OpenWeatherClient {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(base_url: String, api_key: String, timeout_secs: u64, max_retries: u32) -> Self {
        Self {
            http_client: HttpClient::new(timeout_secs, max_retries),
            base_url,
            api_key,
        }
    }

    #[instrument(skip(self), fields(city = %name, country = %country_code))]
    pub async fn fetch_current(
        &self,
        name: &str,
        country_code: &str,
    ) -> Result<CurrentWeatherPayload, AppError> {
        info!(city = %name, country = %country_code, "Fetching current weather");

        let url = format!("{}/weather", self.base_url);
        let query = format!("{},{}", name, country_code);
        let params = [
            ("q", query.as_str()),
            ("appid", self.api_key.as_str()),
            ("units", "metric"),
        ];

        self.http_client.get_json(&url, &params).await
    }

    #[instrument(skip(self), fields(city = %name, country = %country_code))]
    pub async fn fetch_forecast(
        &self,
        name: &str,
        country_code: &str,
    ) -> Result<ForecastPayload, AppError> {
        info!(city = %name, country = %country_code, "Fetching 5-day forecast");

        let url = format!("{}/forecast", self.base_url);
        let query = format!("{},{}", name, country_code);
        let params = [
            ("q", query.as_str()),
            ("appid", self.api_key.as_str()),
            ("units", "metric"),
        ];

        self.http_client.get_json(&url, &params).await
    }
}
