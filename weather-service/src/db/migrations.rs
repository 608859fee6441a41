use sqlx::PgPool;
use tracing::info;

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cities (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(100) NOT NULL,
            country_code VARCHAR(2) NOT NULL,
            latitude DOUBLE PRECISION,
            longitude DOUBLE PRECISION,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // City names match case-insensitively
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS cities_name_country_idx
            ON cities (LOWER(name), country_code)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS current_weather (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            city_id UUID UNIQUE NOT NULL REFERENCES cities(id) ON DELETE CASCADE,
            temperature DOUBLE PRECISION NOT NULL,
            feels_like DOUBLE PRECISION NOT NULL,
            humidity INTEGER NOT NULL,
            pressure DOUBLE PRECISION NOT NULL,
            weather_main VARCHAR(50) NOT NULL,
            weather_description VARCHAR(100) NOT NULL,
            weather_icon VARCHAR(10) NOT NULL,
            wind_speed DOUBLE PRECISION NOT NULL,
            wind_direction INTEGER NOT NULL,
            visibility INTEGER,
            uv_index DOUBLE PRECISION,
            cached_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS forecasts (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            city_id UUID NOT NULL REFERENCES cities(id) ON DELETE CASCADE,
            forecast_date TIMESTAMP WITH TIME ZONE NOT NULL,
            temperature_min DOUBLE PRECISION NOT NULL,
            temperature_max DOUBLE PRECISION NOT NULL,
            temperature_day DOUBLE PRECISION NOT NULL,
            temperature_night DOUBLE PRECISION NOT NULL,
            humidity INTEGER NOT NULL,
            pressure DOUBLE PRECISION NOT NULL,
            weather_main VARCHAR(50) NOT NULL,
            weather_description VARCHAR(100) NOT NULL,
            weather_icon VARCHAR(10) NOT NULL,
            wind_speed DOUBLE PRECISION NOT NULL,
            wind_direction INTEGER NOT NULL,
            cached_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            UNIQUE (city_id, forecast_date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database migrations completed successfully");
    Ok(())
}
