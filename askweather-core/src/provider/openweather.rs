use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::{error::Error as _, time::Duration};
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    error::{PipelineError, Service},
    http::{self, truncate_body},
    model::{NO_DATA, ResolvedCity, WeatherRecord},
};

use super::WeatherProvider;

/// OpenWeatherMap current-conditions client.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    endpoint: String,
    language: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(endpoint: impl Into<String>, language: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            language: language.into(),
            http: http::client(timeout),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.weather_endpoint, &settings.language, settings.timeout())
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(
        &self,
        city: &ResolvedCity,
        api_key: &str,
    ) -> Result<WeatherRecord, PipelineError> {
        info!(%city, "requesting current weather");

        let res = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", city.as_str()),
                ("appid", api_key),
                ("units", "metric"),
                ("lang", self.language.as_str()),
            ])
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = res.status();
        debug!(%status, "OpenWeatherMap responded");

        if !status.is_success() {
            // The body only feeds the generic status error; a failed read must not mask the status.
            let body = if has_dedicated_kind(status) {
                String::new()
            } else {
                res.text().await.unwrap_or_default()
            };

            let err = classify_status(status, city, &body);
            warn!(%status, error = %err, "OpenWeatherMap request rejected");
            return Err(err);
        }

        let body = res.text().await.map_err(classify_transport_error)?;

        let record = parse_record(&body, city)?;
        info!(city = %record.city, country = %record.country, "weather retrieved");
        Ok(record)
    }
}

fn has_dedicated_kind(status: StatusCode) -> bool {
    matches!(status.as_u16(), 401 | 404 | 429) || status.is_server_error()
}

/// Classify a non-success status. `body` is only used for statuses without a
/// dedicated kind.
pub fn classify_status(status: StatusCode, city: &ResolvedCity, body: &str) -> PipelineError {
    match status.as_u16() {
        401 => PipelineError::InvalidCredential(Service::Weather),
        429 => PipelineError::RateLimited(Service::Weather),
        404 => PipelineError::CityNotFound { city: city.as_str().to_string() },
        code if code >= 500 => PipelineError::ProviderUnavailable { status: code },
        code => PipelineError::TransportError { status: code, body: truncate_body(body) },
    }
}

/// Build a record from a success body. Individual missing fields become
/// [`NO_DATA`]; only a body that is not a JSON object is rejected.
pub fn parse_record(body: &str, city: &ResolvedCity) -> Result<WeatherRecord, PipelineError> {
    let data: Value = serde_json::from_str(body)
        .map_err(|e| PipelineError::MalformedResponse(e.to_string()))?;

    if !data.is_object() {
        return Err(PipelineError::MalformedResponse(
            "expected a JSON object at the top level".to_string(),
        ));
    }

    let record = WeatherRecord {
        city: text(&data, "/name").unwrap_or_else(|| city.as_str().to_string()),
        country: text(&data, "/sys/country").unwrap_or_else(|| NO_DATA.to_string()),
        temperature: measure(&data, "/main/temp", "°C"),
        feels_like: measure(&data, "/main/feels_like", "°C"),
        humidity: measure(&data, "/main/humidity", "%"),
        pressure: measure(&data, "/main/pressure", "hPa"),
        description: text(&data, "/weather/0/description").unwrap_or_else(|| NO_DATA.to_string()),
        wind_speed: measure(&data, "/wind/speed", "m/s"),
        visibility: measure(&data, "/visibility", "m"),
    };

    if record.temperature == NO_DATA {
        warn!("temperature missing from weather response");
    }
    if record.description == NO_DATA {
        warn!("description missing from weather response");
    }

    Ok(record)
}

fn text(data: &Value, pointer: &str) -> Option<String> {
    data.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn measure(data: &Value, pointer: &str, unit: &str) -> String {
    match data.pointer(pointer) {
        Some(Value::Number(n)) => format!("{n}{unit}"),
        Some(Value::String(s)) if !s.trim().is_empty() => format!("{}{unit}", s.trim()),
        _ => NO_DATA.to_string(),
    }
}

fn classify_transport_error(err: reqwest::Error) -> PipelineError {
    if err.is_timeout() {
        warn!("OpenWeatherMap request timed out");
        return PipelineError::Timeout(Service::Weather);
    }

    // The request URL carries the API key in its query string.
    let err = err.without_url();
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    warn!(error = %message, "OpenWeatherMap request failed");
    PipelineError::NetworkError(message)
}
