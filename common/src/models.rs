use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Registered city; the key for all cached weather state.
///
/// Coordinates start out empty and are backfilled from the first successful
/// provider fetch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct City {
    pub id: Uuid,
    pub name: String,
    pub country_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Current weather snapshot for a city. One live row per city, overwritten
/// on refresh; `cached_at` only ever moves forward.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct WeatherData {
    pub id: Uuid,
    pub city_id: Uuid,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: i32,
    pub pressure: f64,
    pub weather_main: String,
    pub weather_description: String,
    pub weather_icon: String,
    pub wind_speed: f64,
    pub wind_direction: i32,
    pub visibility: Option<i32>,
    pub uv_index: Option<f64>,
    pub cached_at: DateTime<Utc>,
}

/// One day of forecast. At most five rows per city, one per UTC date.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ForecastData {
    pub id: Uuid,
    pub city_id: Uuid,
    pub forecast_date: DateTime<Utc>,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub temperature_day: f64,
    pub temperature_night: f64,
    pub humidity: i32,
    pub pressure: f64,
    pub weather_main: String,
    pub weather_description: String,
    pub weather_icon: String,
    pub wind_speed: f64,
    pub wind_direction: i32,
    pub cached_at: DateTime<Utc>,
}

/// Normalized current-weather values ready for the record store.
#[derive(Debug, Clone)]
pub struct NewWeatherData {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: i32,
    pub pressure: f64,
    pub weather_main: String,
    pub weather_description: String,
    pub weather_icon: String,
    pub wind_speed: f64,
    pub wind_direction: i32,
    pub visibility: Option<i32>,
    pub uv_index: Option<f64>,
}

/// Normalized single-day forecast values ready for the record store.
#[derive(Debug, Clone)]
pub struct NewForecastData {
    pub forecast_date: DateTime<Utc>,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub temperature_day: f64,
    pub temperature_night: f64,
    pub humidity: i32,
    pub pressure: f64,
    pub weather_main: String,
    pub weather_description: String,
    pub weather_icon: String,
    pub wind_speed: f64,
    pub wind_direction: i32,
}

/// City registration request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddCityRequest {
    pub name: String,
    pub country_code: String,
}
