use std::future::Future;

use common::errors::AppError;
use common::models::{City, ForecastData, NewForecastData, NewWeatherData, WeatherData};
use sqlx::PgPool;
use uuid::Uuid;

/// Persistent storage for weather state, seen by the orchestrator as a
/// plain record interface so tests can substitute an in-memory double.
pub trait RecordStore: Send + Sync {
    /// Live current-weather record for the city, if any.
    fn get_current_weather(
        &self,
        city_id: Uuid,
    ) -> impl Future<Output = Result<Option<WeatherData>, AppError>> + Send;

    /// Insert or overwrite the city's single current-weather record,
    /// stamping a fresh `cached_at`.
    fn upsert_current_weather(
        &self,
        city_id: Uuid,
        data: &NewWeatherData,
    ) -> impl Future<Output = Result<WeatherData, AppError>> + Send;

    /// Stored forecast set for the city, ascending by date.
    fn get_forecasts(
        &self,
        city_id: Uuid,
    ) -> impl Future<Output = Result<Vec<ForecastData>, AppError>> + Send;

    /// Atomically drop and rewrite the city's forecast set.
    fn replace_forecasts(
        &self,
        city_id: Uuid,
        batch: &[NewForecastData],
    ) -> impl Future<Output = Result<Vec<ForecastData>, AppError>> + Send;

    fn update_city_coordinates(
        &self,
        city_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Remove the city's weather and forecast records; the city row stays.
    fn delete_all_for_city(&self, city_id: Uuid)
    -> impl Future<Output = Result<(), AppError>> + Send;
}

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Case-insensitive get-or-create. Returns the city and whether it was
    /// newly created.
    pub async fn create_city(
        &self,
        name: &str,
        country_code: &str,
    ) -> Result<(City, bool), AppError> {
        if let Some(existing) = self.find_city_by_name(name, country_code).await? {
            return Ok((existing, false));
        }

        let city = sqlx::query_as::<_, City>(
            r#"
            INSERT INTO cities (name, country_code)
            VALUES ($1, $2)
            RETURNING id, name, country_code, latitude, longitude, created_at
            "#,
        )
        .bind(name)
        .bind(country_code)
        .fetch_one(&self.pool)
        .await?;

        Ok((city, true))
    }

    pub async fn find_city(&self, id: Uuid) -> Result<Option<City>, AppError> {
        let city = sqlx::query_as::<_, City>(
            r#"
            SELECT id, name, country_code, latitude, longitude, created_at
            FROM cities
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(city)
    }

    pub async fn find_city_by_name(
        &self,
        name: &str,
        country_code: &str,
    ) -> Result<Option<City>, AppError> {
        let city = sqlx::query_as::<_, City>(
            r#"
            SELECT id, name, country_code, latitude, longitude, created_at
            FROM cities
            WHERE LOWER(name) = LOWER($1) AND country_code = $2
            "#,
        )
        .bind(name)
        .bind(country_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(city)
    }

    pub async fn list_cities(&self) -> Result<Vec<City>, AppError> {
        let cities = sqlx::query_as::<_, City>(
            r#"
            SELECT id, name, country_code, latitude, longitude, created_at
            FROM cities
            ORDER BY name, country_code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(cities)
    }

    /// Delete the city row; weather and forecast records cascade.
    pub async fn delete_city(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM cities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_current_weather(
        &self,
        city_id: Option<Uuid>,
    ) -> Result<Vec<WeatherData>, AppError> {
        let records = sqlx::query_as::<_, WeatherData>(
            r#"
            SELECT id, city_id, temperature, feels_like, humidity, pressure,
                   weather_main, weather_description, weather_icon,
                   wind_speed, wind_direction, visibility, uv_index, cached_at
            FROM current_weather
            WHERE $1::uuid IS NULL OR city_id = $1
            ORDER BY cached_at DESC
            "#,
        )
        .bind(city_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn list_forecasts(
        &self,
        city_id: Option<Uuid>,
    ) -> Result<Vec<ForecastData>, AppError> {
        let records = sqlx::query_as::<_, ForecastData>(
            r#"
            SELECT id, city_id, forecast_date, temperature_min, temperature_max,
                   temperature_day, temperature_night, humidity, pressure,
                   weather_main, weather_description, weather_icon,
                   wind_speed, wind_direction, cached_at
            FROM forecasts
            WHERE $1::uuid IS NULL OR city_id = $1
            ORDER BY forecast_date
            "#,
        )
        .bind(city_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

impl RecordStore for PgRecordStore {
    async fn get_current_weather(&self, city_id: Uuid) -> Result<Option<WeatherData>, AppError> {
        let record = sqlx::query_as::<_, WeatherData>(
            r#"
            SELECT id, city_id, temperature, feels_like, humidity, pressure,
                   weather_main, weather_description, weather_icon,
                   wind_speed, wind_direction, visibility, uv_index, cached_at
            FROM current_weather
            WHERE city_id = $1
            "#,
        )
        .bind(city_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn upsert_current_weather(
        &self,
        city_id: Uuid,
        data: &NewWeatherData,
    ) -> Result<WeatherData, AppError> {
        let record = sqlx::query_as::<_, WeatherData>(
            r#"
            INSERT INTO current_weather (
                city_id, temperature, feels_like, humidity, pressure,
                weather_main, weather_description, weather_icon,
                wind_speed, wind_direction, visibility, uv_index
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (city_id) DO UPDATE SET
                temperature = EXCLUDED.temperature,
                feels_like = EXCLUDED.feels_like,
                humidity = EXCLUDED.humidity,
                pressure = EXCLUDED.pressure,
                weather_main = EXCLUDED.weather_main,
                weather_description = EXCLUDED.weather_description,
                weather_icon = EXCLUDED.weather_icon,
                wind_speed = EXCLUDED.wind_speed,
                wind_direction = EXCLUDED.wind_direction,
                visibility = EXCLUDED.visibility,
                uv_index = EXCLUDED.uv_index,
                cached_at = NOW()
            RETURNING id, city_id, temperature, feels_like, humidity, pressure,
                      weather_main, weather_description, weather_icon,
                      wind_speed, wind_direction, visibility, uv_index, cached_at
            "#,
        )
        .bind(city_id)
        .bind(data.temperature)
        .bind(data.feels_like)
        .bind(data.humidity)
        .bind(data.pressure)
        .bind(&data.weather_main)
        .bind(&data.weather_description)
        .bind(&data.weather_icon)
        .bind(data.wind_speed)
        .bind(data.wind_direction)
        .bind(data.visibility)
        .bind(data.uv_index)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_forecasts(&self, city_id: Uuid) -> Result<Vec<ForecastData>, AppError> {
        let records = sqlx::query_as::<_, ForecastData>(
            r#"
            SELECT id, city_id, forecast_date, temperature_min, temperature_max,
                   temperature_day, temperature_night, humidity, pressure,
                   weather_main, weather_description, weather_icon,
                   wind_speed, wind_direction, cached_at
            FROM forecasts
            WHERE city_id = $1
            ORDER BY forecast_date
            "#,
        )
        .bind(city_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn replace_forecasts(
        &self,
        city_id: Uuid,
        batch: &[NewForecastData],
    ) -> Result<Vec<ForecastData>, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM forecasts WHERE city_id = $1")
            .bind(city_id)
            .execute(&mut *tx)
            .await?;

        for item in batch {
            sqlx::query(
                r#"
                INSERT INTO forecasts (
                    city_id, forecast_date, temperature_min, temperature_max,
                    temperature_day, temperature_night, humidity, pressure,
                    weather_main, weather_description, weather_icon,
                    wind_speed, wind_direction
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(city_id)
            .bind(item.forecast_date)
            .bind(item.temperature_min)
            .bind(item.temperature_max)
            .bind(item.temperature_day)
            .bind(item.temperature_night)
            .bind(item.humidity)
            .bind(item.pressure)
            .bind(&item.weather_main)
            .bind(&item.weather_description)
            .bind(&item.weather_icon)
            .bind(item.wind_speed)
            .bind(item.wind_direction)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_forecasts(city_id).await
    }

    async fn update_city_coordinates(
        &self,
        city_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE cities SET latitude = $1, longitude = $2 WHERE id = $3")
            .bind(latitude)
            .bind(longitude)
            .bind(city_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_all_for_city(&self, city_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM current_weather WHERE city_id = $1")
            .bind(city_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM forecasts WHERE city_id = $1")
            .bind(city_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
