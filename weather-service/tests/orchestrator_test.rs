use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::errors::AppError;
use common::models::{City, ForecastData, NewForecastData, NewWeatherData, WeatherData};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use weather_service::api_client::OpenWeatherClient;
use weather_service::cache::FastCache;
use weather_service::db::RecordStore;
use weather_service::service::WeatherService;
use weather_service::staleness::StalenessPolicy;

/// In-memory record store double for exercising the orchestrator without a
/// database.
#[derive(Clone, Default)]
struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    weather: HashMap<Uuid, WeatherData>,
    forecasts: HashMap<Uuid, Vec<ForecastData>>,
    coordinates: HashMap<Uuid, (f64, f64)>,
}

impl MemoryStore {
    fn seed_weather(&self, record: WeatherData) {
        let mut inner = self.inner.lock().unwrap();
        inner.weather.insert(record.city_id, record);
    }

    fn seed_forecasts(&self, city_id: Uuid, records: Vec<ForecastData>) {
        let mut inner = self.inner.lock().unwrap();
        inner.forecasts.insert(city_id, records);
    }

    fn stored_weather(&self, city_id: Uuid) -> Option<WeatherData> {
        self.inner.lock().unwrap().weather.get(&city_id).cloned()
    }

    fn coordinates(&self, city_id: Uuid) -> Option<(f64, f64)> {
        self.inner.lock().unwrap().coordinates.get(&city_id).copied()
    }

    fn clear(&self) {
        *self.inner.lock().unwrap() = Inner::default();
    }
}

impl RecordStore for MemoryStore {
    async fn get_current_weather(&self, city_id: Uuid) -> Result<Option<WeatherData>, AppError> {
        Ok(self.inner.lock().unwrap().weather.get(&city_id).cloned())
    }

    async fn upsert_current_weather(
        &self,
        city_id: Uuid,
        data: &NewWeatherData,
    ) -> Result<WeatherData, AppError> {
        let record = WeatherData {
            id: Uuid::new_v4(),
            city_id,
            temperature: data.temperature,
            feels_like: data.feels_like,
            humidity: data.humidity,
            pressure: data.pressure,
            weather_main: data.weather_main.clone(),
            weather_description: data.weather_description.clone(),
            weather_icon: data.weather_icon.clone(),
            wind_speed: data.wind_speed,
            wind_direction: data.wind_direction,
            visibility: data.visibility,
            uv_index: data.uv_index,
            cached_at: Utc::now(),
        };
        self.inner
            .lock()
            .unwrap()
            .weather
            .insert(city_id, record.clone());
        Ok(record)
    }

    async fn get_forecasts(&self, city_id: Uuid) -> Result<Vec<ForecastData>, AppError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .forecasts
            .get(&city_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_forecasts(
        &self,
        city_id: Uuid,
        batch: &[NewForecastData],
    ) -> Result<Vec<ForecastData>, AppError> {
        let mut records: Vec<ForecastData> = batch
            .iter()
            .map(|item| ForecastData {
                id: Uuid::new_v4(),
                city_id,
                forecast_date: item.forecast_date,
                temperature_min: item.temperature_min,
                temperature_max: item.temperature_max,
                temperature_day: item.temperature_day,
                temperature_night: item.temperature_night,
                humidity: item.humidity,
                pressure: item.pressure,
                weather_main: item.weather_main.clone(),
                weather_description: item.weather_description.clone(),
                weather_icon: item.weather_icon.clone(),
                wind_speed: item.wind_speed,
                wind_direction: item.wind_direction,
                cached_at: Utc::now(),
            })
            .collect();
        records.sort_by_key(|r| r.forecast_date);
        self.inner
            .lock()
            .unwrap()
            .forecasts
            .insert(city_id, records.clone());
        Ok(records)
    }

    async fn update_city_coordinates(
        &self,
        city_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), AppError> {
        self.inner
            .lock()
            .unwrap()
            .coordinates
            .insert(city_id, (latitude, longitude));
        Ok(())
    }

    async fn delete_all_for_city(&self, city_id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.weather.remove(&city_id);
        inner.forecasts.remove(&city_id);
        Ok(())
    }
}

fn test_city(name: &str, country_code: &str) -> City {
    City {
        id: Uuid::new_v4(),
        name: name.to_string(),
        country_code: country_code.to_string(),
        latitude: None,
        longitude: None,
        created_at: Utc::now(),
    }
}

fn weather_record(city_id: Uuid, temperature: f64, cached_at: DateTime<Utc>) -> WeatherData {
    WeatherData {
        id: Uuid::new_v4(),
        city_id,
        temperature,
        feels_like: temperature - 1.0,
        humidity: 55,
        pressure: 1012.0,
        weather_main: "Clouds".to_string(),
        weather_description: "scattered clouds".to_string(),
        weather_icon: "03d".to_string(),
        wind_speed: 2.5,
        wind_direction: 180,
        visibility: Some(10000),
        uv_index: None,
        cached_at,
    }
}

fn forecast_records(city_id: Uuid, cached_at: DateTime<Utc>) -> Vec<ForecastData> {
    (0..5)
        .map(|day| ForecastData {
            id: Uuid::new_v4(),
            city_id,
            forecast_date: Utc.with_ymd_and_hms(2026, 3, 1 + day, 12, 0, 0).unwrap(),
            temperature_min: 4.0,
            temperature_max: 11.0,
            temperature_day: 9.0,
            temperature_night: 9.0,
            humidity: 70,
            pressure: 1008.0,
            weather_main: "Rain".to_string(),
            weather_description: "light rain".to_string(),
            weather_icon: "10d".to_string(),
            wind_speed: 4.0,
            wind_direction: 210,
            cached_at,
        })
        .collect()
}

fn current_body(temp: f64, humidity: i64, main: &str) -> serde_json::Value {
    json!({
        "coord": {"lat": 48.8566, "lon": 2.3522},
        "main": {
            "temp": temp,
            "feels_like": temp - 1.0,
            "humidity": humidity,
            "pressure": 1012.0,
            "temp_min": temp - 2.0,
            "temp_max": temp + 2.0
        },
        "weather": [{"main": main, "description": "clear sky", "icon": "01d"}],
        "wind": {"speed": 3.1, "deg": 240},
        "visibility": 10000
    })
}

fn forecast_body(start: DateTime<Utc>, samples: usize) -> serde_json::Value {
    let list: Vec<serde_json::Value> = (0..samples)
        .map(|i| {
            let dt = start + Duration::hours(3 * i as i64);
            json!({
                "dt": dt.timestamp(),
                "main": {
                    "temp": 10.0 + i as f64 * 0.1,
                    "feels_like": 9.0,
                    "humidity": 70,
                    "pressure": 1008.0,
                    "temp_min": 8.0,
                    "temp_max": 12.0
                },
                "weather": [{"main": "Rain", "description": "light rain", "icon": "10d"}],
                "wind": {"speed": 4.2, "deg": 200}
            })
        })
        .collect();
    json!({"list": list})
}

fn service(store: MemoryStore, provider_uri: &str) -> WeatherService<MemoryStore> {
    let provider = Arc::new(OpenWeatherClient::new(
        provider_uri.to_string(),
        "test-key".to_string(),
        1,
        0,
    ));
    WeatherService::new(
        store,
        provider,
        FastCache::with_ttl(60),
        FastCache::with_ttl(60),
        StalenessPolicy::new(1800),
    )
}

#[tokio::test]
async fn serves_fresh_stored_record_without_provider_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let city = test_city("Oslo", "NO");
    let store = MemoryStore::default();
    store.seed_weather(weather_record(city.id, 4.2, Utc::now()));

    let weather = service(store, &server.uri());
    let record = weather.get_current_weather(&city).await.unwrap();

    assert_eq!(record.temperature, 4.2);
}

#[tokio::test]
async fn propagates_not_found_when_no_record_exists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let city = test_city("Atlantis", "GR");
    let weather = service(MemoryStore::default(), &server.uri());

    let err = weather.get_current_weather(&city).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn falls_back_to_stale_record_on_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let city = test_city("Bergen", "NO");
    let store = MemoryStore::default();
    let stale = weather_record(city.id, 7.7, Utc::now() - Duration::hours(2));
    store.seed_weather(stale.clone());

    let weather = service(store, &server.uri());
    let record = weather.get_current_weather(&city).await.unwrap();

    assert_eq!(record.id, stale.id);
    assert_eq!(record.temperature, 7.7);
}

#[tokio::test]
async fn falls_back_to_stale_forecasts_on_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let city = test_city("Tromso", "NO");
    let store = MemoryStore::default();
    let stale = forecast_records(city.id, Utc::now() - Duration::hours(2));
    store.seed_forecasts(city.id, stale.clone());

    let weather = service(store, &server.uri());
    let records = weather.get_forecast(&city).await.unwrap();

    assert_eq!(records.len(), 5);
    let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
    let stale_ids: Vec<Uuid> = stale.iter().map(|r| r.id).collect();
    assert_eq!(ids, stale_ids);
}

#[tokio::test]
async fn keeps_one_forecast_per_day_capped_at_five() {
    let server = MockServer::start().await;
    // 40 three-hour samples starting mid-day span six calendar dates
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(start, 40)))
        .mount(&server)
        .await;

    let city = test_city("Paris", "FR");
    let weather = service(MemoryStore::default(), &server.uri());

    let records = weather.get_forecast(&city).await.unwrap();

    assert_eq!(records.len(), 5);

    // One record per distinct date, ascending
    for pair in records.windows(2) {
        assert!(pair[0].forecast_date < pair[1].forecast_date);
        assert_ne!(
            pair[0].forecast_date.date_naive(),
            pair[1].forecast_date.date_naive()
        );
    }

    // The first date is represented by its first-seen sample (mid-day),
    // later dates by their midnight sample.
    assert_eq!(records[0].forecast_date, start);
    assert_eq!(
        records[1].forecast_date,
        Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
    );
    assert_eq!(
        records[4].forecast_date.date_naive(),
        Utc.with_ymd_and_hms(2026, 3, 5, 0, 0, 0).unwrap().date_naive()
    );

    // Night temperature mirrors the day value for the short-range endpoint
    for record in &records {
        assert_eq!(record.temperature_day, record.temperature_night);
    }
}

#[tokio::test]
async fn propagates_error_after_invalidation_with_empty_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(12.0, 50, "Clear")))
        .mount(&server)
        .await;

    let city = test_city("Lyon", "FR");
    let store = MemoryStore::default();
    let weather = service(store.clone(), &server.uri());

    weather.get_current_weather(&city).await.unwrap();

    // Drop the cache entries and the stored record; unmatched requests now
    // get a 404 from the mock server.
    weather.invalidate_city(city.id).await;
    store.clear();
    server.reset().await;

    let err = weather.get_current_weather(&city).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn second_read_hits_fast_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(21.0, 40, "Clear")))
        .expect(1)
        .mount(&server)
        .await;

    let city = test_city("Madrid", "ES");
    let weather = service(MemoryStore::default(), &server.uri());

    let first = weather.get_current_weather(&city).await.unwrap();
    let second = weather.get_current_weather(&city).await.unwrap();

    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn stores_and_caches_first_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Paris,FR"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(18.5, 60, "Clear")))
        .expect(1)
        .mount(&server)
        .await;

    let city = test_city("Paris", "FR");
    let store = MemoryStore::default();
    let weather = service(store.clone(), &server.uri());

    let record = weather.get_current_weather(&city).await.unwrap();
    assert_eq!(record.temperature, 18.5);
    assert_eq!(record.humidity, 60);
    assert_eq!(record.weather_main, "Clear");

    let stored = store.stored_weather(city.id).expect("record persisted");
    assert_eq!(stored.temperature, 18.5);

    let cached = weather.get_current_weather(&city).await.unwrap();
    assert_eq!(cached.id, record.id);
}

#[tokio::test]
async fn backfills_coordinates_on_first_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(18.5, 60, "Clear")))
        .mount(&server)
        .await;

    let city = test_city("Paris", "FR");
    let store = MemoryStore::default();
    let weather = service(store.clone(), &server.uri());

    weather.get_current_weather(&city).await.unwrap();

    let (lat, lon) = store.coordinates(city.id).expect("coordinates backfilled");
    assert_eq!(lat, 48.8566);
    assert_eq!(lon, 2.3522);
}

#[tokio::test]
async fn clear_all_forces_store_read() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(15.0, 45, "Clouds")))
        .expect(1)
        .mount(&server)
        .await;

    let city = test_city("Rome", "IT");
    let store = MemoryStore::default();
    let weather = service(store.clone(), &server.uri());

    weather.get_current_weather(&city).await.unwrap();
    weather.clear_all().await;

    // The store still holds a fresh record, so no second provider call
    let record = weather.get_current_weather(&city).await.unwrap();
    assert_eq!(record.temperature, 15.0);
}
