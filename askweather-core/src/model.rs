use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PipelineError;

/// Placeholder used for any field the provider did not send.
pub const NO_DATA: &str = "no data";

/// What drives city resolution for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Natural-language text the city has to be extracted from.
    FreeText(String),
    /// City supplied directly by the caller; extraction is skipped.
    CityOverride(String),
}

impl Request {
    /// Build a request from optional parts. A non-blank override wins.
    pub fn new(free_text: Option<String>, city_override: Option<String>) -> Self {
        match city_override {
            Some(city) if !city.trim().is_empty() => Request::CityOverride(city),
            _ => Request::FreeText(free_text.unwrap_or_default()),
        }
    }

    pub fn free_text(&self) -> Option<&str> {
        match self {
            Request::FreeText(text) => Some(text),
            Request::CityOverride(_) => None,
        }
    }

    pub fn city_override(&self) -> Option<&str> {
        match self {
            Request::FreeText(_) => None,
            Request::CityOverride(city) => Some(city),
        }
    }
}

/// Canonical, non-empty city name handed to the weather provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResolvedCity(String);

impl ResolvedCity {
    /// Trims `name`; `None` when nothing is left.
    pub fn new(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ResolvedCity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current conditions, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city: String,
    pub country: String,
    pub temperature: String,
    pub feels_like: String,
    pub humidity: String,
    pub pressure: String,
    pub description: String,
    pub wind_speed: String,
    pub visibility: String,
}

impl WeatherRecord {
    /// One-line summary used as the success message.
    pub fn summary(&self) -> String {
        format!(
            "Current weather in {}: {}, temperature: {}, humidity: {}",
            self.city, self.description, self.temperature, self.humidity
        )
    }
}

/// Terminal state of a pipeline run: a record or an error, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineResult {
    Success {
        city: ResolvedCity,
        record: WeatherRecord,
    },
    Failure(PipelineError),
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success { .. })
    }

    pub fn record(&self) -> Option<&WeatherRecord> {
        match self {
            PipelineResult::Success { record, .. } => Some(record),
            PipelineResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            PipelineResult::Success { .. } => None,
            PipelineResult::Failure(err) => Some(err),
        }
    }

    pub fn into_output(self) -> InvokeOutput {
        match self {
            PipelineResult::Success { city, record } => InvokeOutput::Success {
                city: city.into_inner(),
                message: record.summary(),
                weather_info: record,
            },
            PipelineResult::Failure(err) => InvokeOutput::Error { error: err.to_string() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

/// Caller-facing input shape. Precedence when building a [`Request`]:
/// `city`, then the last user message, then `query`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvokeInput {
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

impl InvokeInput {
    pub fn from_city(city: impl Into<String>) -> Self {
        Self { city: Some(city.into()), ..Self::default() }
    }

    pub fn into_request(self) -> Request {
        let from_messages = self.messages.and_then(|messages| {
            messages
                .into_iter()
                .rev()
                .find(|m| m.role == "user" && !m.content.trim().is_empty())
                .map(|m| m.content)
        });

        let free_text = from_messages.or(self.query.filter(|q| !q.trim().is_empty()));
        Request::new(free_text, self.city)
    }
}

/// Tagged result returned to external callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum InvokeOutput {
    Success {
        city: String,
        weather_info: WeatherRecord,
        message: String,
    },
    Error {
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Service;

    fn sample_record() -> WeatherRecord {
        WeatherRecord {
            city: "Tokyo".into(),
            country: "JP".into(),
            temperature: "15.2°C".into(),
            feels_like: "14.8°C".into(),
            humidity: "60%".into(),
            pressure: "1013hPa".into(),
            description: "clear sky".into(),
            wind_speed: "3.1m/s".into(),
            visibility: "10000m".into(),
        }
    }

    #[test]
    fn override_takes_precedence_when_not_blank() {
        let req = Request::new(Some("weather in Paris".into()), Some("Tokyo".into()));
        assert_eq!(req, Request::CityOverride("Tokyo".into()));

        let req = Request::new(Some("weather in Paris".into()), Some("  ".into()));
        assert_eq!(req.free_text(), Some("weather in Paris"));
        assert_eq!(req.city_override(), None);
    }

    #[test]
    fn resolved_city_is_trimmed_and_non_empty() {
        assert_eq!(ResolvedCity::new("  Seoul \n").unwrap().as_str(), "Seoul");
        assert!(ResolvedCity::new(" \t ").is_none());
    }

    #[test]
    fn invoke_input_prefers_last_user_message_over_query() {
        let input = InvokeInput {
            messages: Some(vec![
                ChatMessage::user("weather in Osaka?"),
                ChatMessage::assistant("Osaka is sunny."),
                ChatMessage::user("and in Kyoto?"),
            ]),
            query: Some("weather in Nagoya".into()),
            city: None,
        };

        assert_eq!(input.into_request(), Request::FreeText("and in Kyoto?".into()));
    }

    #[test]
    fn invoke_input_falls_back_to_query_and_city() {
        let input = InvokeInput {
            messages: Some(vec![ChatMessage::assistant("hi")]),
            query: Some("weather in Nagoya".into()),
            city: None,
        };
        assert_eq!(input.into_request(), Request::FreeText("weather in Nagoya".into()));

        let input = InvokeInput {
            messages: Some(vec![ChatMessage::user("weather in Osaka")]),
            query: None,
            city: Some("Sapporo".into()),
        };
        assert_eq!(input.into_request(), Request::CityOverride("Sapporo".into()));

        assert_eq!(InvokeInput::default().into_request(), Request::FreeText(String::new()));
    }

    #[test]
    fn success_output_serializes_with_status_tag() {
        let result = PipelineResult::Success {
            city: ResolvedCity::new("Tokyo").unwrap(),
            record: sample_record(),
        };
        let json = serde_json::to_value(result.into_output()).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["city"], "Tokyo");
        assert_eq!(json["weather_info"]["temperature"], "15.2°C");
        assert_eq!(
            json["message"],
            "Current weather in Tokyo: clear sky, temperature: 15.2°C, humidity: 60%"
        );
        assert!(json.get("error").is_none());
    }

    #[test]
    fn error_output_carries_only_the_message() {
        let result = PipelineResult::Failure(PipelineError::MissingCredential(Service::Weather));
        assert!(result.record().is_none());

        let json = serde_json::to_value(result.into_output()).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json["error"].as_str().unwrap().contains("OPENWEATHER_API_KEY"));
        assert!(json.get("weather_info").is_none());
    }
}
