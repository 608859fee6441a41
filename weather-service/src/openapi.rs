use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use common::models::{AddCityRequest, City, ForecastData, WeatherData};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_cities,
        handlers::register_city,
        handlers::delete_city,
        handlers::get_weather,
        handlers::get_forecast,
        handlers::list_weather,
        handlers::list_forecasts,
    ),
    components(schemas(City, WeatherData, ForecastData, AddCityRequest)),
    tags(
        (name = "cities", description = "City registration and lookup"),
        (name = "weather", description = "Current weather and 5-day forecasts"),
    ),
)]
struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
