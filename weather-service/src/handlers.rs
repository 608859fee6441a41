use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use common::errors::AppError;
use common::models::{AddCityRequest, City, ForecastData, WeatherData};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::{PgRecordStore, RecordStore};
use crate::service::WeatherService;

#[derive(Clone)]
pub struct AppState {
    pub store: PgRecordStore,
    pub weather: Arc<WeatherService<PgRecordStore>>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health check")
    )
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": "weather-service" }))
}

#[utoipa::path(
    get,
    path = "/api/cities",
    responses(
        (status = 200, description = "Registered cities", body = Vec<City>)
    ),
    tag = "cities"
)]
pub async fn list_cities(State(state): State<AppState>) -> Result<Json<Vec<City>>, AppError> {
    let cities = state.store.list_cities().await?;

    Ok(Json(cities))
}

#[utoipa::path(
    post,
    path = "/api/cities",
    request_body = AddCityRequest,
    responses(
        (status = 201, description = "City registered", body = City),
        (status = 400, description = "Validation error"),
        (status = 404, description = "City unknown to the weather provider")
    ),
    tag = "cities"
)]
pub async fn register_city(
    State(state): State<AppState>,
    Json(payload): Json<AddCityRequest>,
) -> Result<(StatusCode, Json<City>), AppError> {
    let name = payload.name.trim();
    let country_code = payload.country_code.trim().to_uppercase();

    if name.is_empty() || name.len() > 100 {
        return Err(AppError::validation(
            "City name must be between 1 and 100 characters",
        ));
    }
    if country_code.len() != 2 || !country_code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::validation(
            "Country code must be a two-letter ISO code",
        ));
    }

    let (city, created) = state.store.create_city(name, &country_code).await?;

    if !created {
        info!(city = %city.name, country = %city.country_code, "City already registered");
        return Ok((StatusCode::CREATED, Json(city)));
    }

    // Probe the provider so typo'd registrations never linger.
    if let Err(err) = state.weather.get_current_weather(&city).await {
        error!(
            city = %city.name,
            country = %city.country_code,
            error = %err,
            code = err.code(),
            "City validation failed, rolling back registration"
        );
        state.store.delete_city(city.id).await?;

        return Err(match err {
            AppError::NotFound(_) => AppError::not_found(format!(
                "City \"{}\" not found in {}. Check the spelling and country code.",
                name, country_code
            )),
            other => other,
        });
    }

    info!(city = %city.name, country = %city.country_code, "Registered and validated city");

    // The validation probe backfilled coordinates; return the updated row.
    let city = state
        .store
        .find_city(city.id)
        .await?
        .ok_or_else(|| AppError::internal("City disappeared during registration"))?;

    Ok((StatusCode::CREATED, Json(city)))
}

#[utoipa::path(
    delete,
    path = "/api/cities/{id}",
    params(
        ("id" = Uuid, Path, description = "City id")
    ),
    responses(
        (status = 204, description = "City deleted"),
        (status = 404, description = "City not registered")
    ),
    tag = "cities"
)]
pub async fn delete_city(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let city = state
        .store
        .find_city(id)
        .await?
        .ok_or_else(|| AppError::not_found("City not registered"))?;

    // Invalidate caches before the rows go away
    state.weather.invalidate_city(city.id).await;
    state.store.delete_all_for_city(city.id).await?;
    state.store.delete_city(city.id).await?;

    info!(city = %city.name, country = %city.country_code, "Deleted city");

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/cities/{id}/weather",
    params(
        ("id" = Uuid, Path, description = "City id")
    ),
    responses(
        (status = 200, description = "Current weather for the city", body = WeatherData),
        (status = 404, description = "City not registered"),
        (status = 503, description = "Weather provider unavailable and no cached data")
    ),
    tag = "weather"
)]
pub async fn get_weather(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WeatherData>, AppError> {
    let city = state
        .store
        .find_city(id)
        .await?
        .ok_or_else(|| AppError::not_found("City not registered"))?;

    let weather = state.weather.get_current_weather(&city).await?;

    Ok(Json(weather))
}

#[utoipa::path(
    get,
    path = "/api/cities/{id}/forecast",
    params(
        ("id" = Uuid, Path, description = "City id")
    ),
    responses(
        (status = 200, description = "5-day forecast for the city", body = Vec<ForecastData>),
        (status = 404, description = "City not registered"),
        (status = 503, description = "Weather provider unavailable and no cached data")
    ),
    tag = "weather"
)]
pub async fn get_forecast(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ForecastData>>, AppError> {
    let city = state
        .store
        .find_city(id)
        .await?
        .ok_or_else(|| AppError::not_found("City not registered"))?;

    let forecast = state.weather.get_forecast(&city).await?;

    Ok(Json(forecast))
}

#[derive(Deserialize)]
pub struct RecordFilter {
    pub city_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/weather",
    params(
        ("city_id" = Option<Uuid>, Query, description = "Restrict to one city")
    ),
    responses(
        (status = 200, description = "Stored current-weather records, no refresh", body = Vec<WeatherData>)
    ),
    tag = "weather"
)]
pub async fn list_weather(
    State(state): State<AppState>,
    Query(filter): Query<RecordFilter>,
) -> Result<Json<Vec<WeatherData>>, AppError> {
    let records = state.store.list_current_weather(filter.city_id).await?;

    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/api/forecast",
    params(
        ("city_id" = Option<Uuid>, Query, description = "Restrict to one city")
    ),
    responses(
        (status = 200, description = "Stored forecast records, no refresh", body = Vec<ForecastData>)
    ),
    tag = "weather"
)]
pub async fn list_forecasts(
    State(state): State<AppState>,
    Query(filter): Query<RecordFilter>,
) -> Result<Json<Vec<ForecastData>>, AppError> {
    let records = state.store.list_forecasts(filter.city_id).await?;

    Ok(Json(records))
}
