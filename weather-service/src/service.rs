use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::DateTime;
use common::errors::AppError;
use common::models::{City, ForecastData, NewForecastData, NewWeatherData, WeatherData};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::api_client::{CurrentWeatherPayload, ForecastSample, OpenWeatherClient};
use crate::cache::FastCache;
use crate::db::RecordStore;
use crate::staleness::StalenessPolicy;

/// Maximum number of forecast days kept per city.
const MAX_FORECAST_DAYS: usize = 5;

/// Read-through weather lookup with stale fallback.
///
/// Lookup order: fast cache, then the record store guarded by the staleness
/// policy, then the provider. A failed refresh falls back to whatever stale
/// record the store still holds; the error only propagates when there is
/// nothing left to serve.
pub struct WeatherService<S> {
    store: S,
    provider: Arc<OpenWeatherClient>,
    current_cache: FastCache<WeatherData>,
    forecast_cache: FastCache<Vec<ForecastData>>,
    staleness: StalenessPolicy,
}

impl<S: RecordStore> WeatherService<S> {
    pub fn new(
        store: S,
        provider: Arc<OpenWeatherClient>,
        current_cache: FastCache<WeatherData>,
        forecast_cache: FastCache<Vec<ForecastData>>,
        staleness: StalenessPolicy,
    ) -> Self {
        Self {
            store,
            provider,
            current_cache,
            forecast_cache,
            staleness,
        }
    }

    #[instrument(skip(self, city), fields(city = %city.name, city_id = %city.id))]
    pub async fn get_current_weather(&self, city: &City) -> Result<WeatherData, AppError> {
        if let Some(cached) = self.current_cache.get(&city.id).await {
            info!("Returning fast-cached weather data");
            return Ok(cached);
        }

        let stored = self.store.get_current_weather(city.id).await?;

        if let Some(record) = &stored
            && self.staleness.is_fresh(record.cached_at)
        {
            info!("Returning stored weather data");
            self.current_cache.set(city.id, record.clone()).await;
            return Ok(record.clone());
        }

        match self.refresh_current(city).await {
            Ok(record) => Ok(record),
            Err(err) => match stored {
                Some(stale) => {
                    warn!(
                        error = %err,
                        code = err.code(),
                        "Weather refresh failed, serving stale record"
                    );
                    Ok(stale)
                }
                None => Err(err),
            },
        }
    }

    async fn refresh_current(&self, city: &City) -> Result<WeatherData, AppError> {
        let payload = self
            .provider
            .fetch_current(&city.name, &city.country_code)
            .await?;

        if city.latitude.is_none() || city.longitude.is_none() {
            self.store
                .update_city_coordinates(city.id, payload.coord.lat, payload.coord.lon)
                .await?;
            info!(
                lat = payload.coord.lat,
                lon = payload.coord.lon,
                "Backfilled city coordinates"
            );
        }

        let data = normalize_current(&payload)?;
        let record = self.store.upsert_current_weather(city.id, &data).await?;
        self.current_cache.set(city.id, record.clone()).await;
        info!("Fetched and cached fresh weather data");

        Ok(record)
    }

    #[instrument(skip(self, city), fields(city = %city.name, city_id = %city.id))]
    pub async fn get_forecast(&self, city: &City) -> Result<Vec<ForecastData>, AppError> {
        if let Some(cached) = self.forecast_cache.get(&city.id).await {
            info!("Returning fast-cached forecast data");
            return Ok(cached);
        }

        let stored = self.store.get_forecasts(city.id).await?;

        if let Some(first) = stored.first()
            && self.staleness.is_fresh(first.cached_at)
        {
            info!(days = stored.len(), "Returning stored forecast data");
            self.forecast_cache.set(city.id, stored.clone()).await;
            return Ok(stored);
        }

        match self.refresh_forecast(city).await {
            Ok(records) => Ok(records),
            Err(err) => {
                if stored.is_empty() {
                    Err(err)
                } else {
                    warn!(
                        error = %err,
                        code = err.code(),
                        "Forecast refresh failed, serving stale records"
                    );
                    Ok(stored)
                }
            }
        }
    }

    async fn refresh_forecast(&self, city: &City) -> Result<Vec<ForecastData>, AppError> {
        let payload = self
            .provider
            .fetch_forecast(&city.name, &city.country_code)
            .await?;

        let batch = daily_forecasts(&payload.list)?;
        let records = self.store.replace_forecasts(city.id, &batch).await?;
        self.forecast_cache.set(city.id, records.clone()).await;
        info!(days = records.len(), "Fetched and cached fresh forecast data");

        Ok(records)
    }

    /// Drop the city's fast-cache entries. The record store is untouched.
    pub async fn invalidate_city(&self, city_id: Uuid) {
        self.current_cache.remove(&city_id).await;
        self.forecast_cache.remove(&city_id).await;
        info!(city_id = %city_id, "Invalidated cached weather for city");
    }

    /// Drop every fast-cache entry.
    pub async fn clear_all(&self) {
        self.current_cache.clear().await;
        self.forecast_cache.clear().await;
        info!("Cleared all cached weather data");
    }
}

fn normalize_current(payload: &CurrentWeatherPayload) -> Result<NewWeatherData, AppError> {
    let condition = payload
        .weather
        .first()
        .ok_or_else(|| AppError::internal("Provider response carried no weather condition"))?;

    Ok(NewWeatherData {
        temperature: payload.main.temp,
        feels_like: payload.main.feels_like,
        humidity: payload.main.humidity,
        pressure: payload.main.pressure,
        weather_main: condition.main.clone(),
        weather_description: condition.description.clone(),
        weather_icon: condition.icon.clone(),
        wind_speed: payload.wind.speed,
        wind_direction: payload.wind.deg,
        visibility: payload.visibility,
        // The current-weather endpoint carries no UV index.
        uv_index: None,
    })
}

/// Collapse 3-hour samples into one forecast per UTC calendar date: the
/// first sample seen for a date represents that day, and only the five
/// earliest dates are kept. The short-range endpoint has no day/night
/// split, so the night temperature mirrors the day value.
fn daily_forecasts(samples: &[ForecastSample]) -> Result<Vec<NewForecastData>, AppError> {
    let mut by_date = BTreeMap::new();

    for sample in samples {
        let Some(timestamp) = DateTime::from_timestamp(sample.dt, 0) else {
            warn!(dt = sample.dt, "Skipping forecast sample with invalid timestamp");
            continue;
        };
        by_date
            .entry(timestamp.date_naive())
            .or_insert((timestamp, sample));
    }

    by_date
        .into_values()
        .take(MAX_FORECAST_DAYS)
        .map(|(timestamp, sample)| {
            let condition = sample.weather.first().ok_or_else(|| {
                AppError::internal("Forecast sample carried no weather condition")
            })?;

            Ok(NewForecastData {
                forecast_date: timestamp,
                temperature_min: sample.main.temp_min,
                temperature_max: sample.main.temp_max,
                temperature_day: sample.main.temp,
                temperature_night: sample.main.temp,
                humidity: sample.main.humidity,
                pressure: sample.main.pressure,
                weather_main: condition.main.clone(),
                weather_description: condition.description.clone(),
                weather_icon: condition.icon.clone(),
                wind_speed: sample.wind.speed,
                wind_direction: sample.wind.deg,
            })
        })
        .collect()
}
