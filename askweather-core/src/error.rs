use std::fmt;

use thiserror::Error;

/// URL handed out whenever the weather key is missing or rejected.
pub const OPENWEATHER_SIGNUP_URL: &str = "https://openweathermap.org/api";

/// External service a credential or failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    LanguageModel,
    Weather,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::LanguageModel => "language model API",
            Service::Weather => "OpenWeatherMap API",
        }
    }

    /// Environment variable consulted when no explicit key is supplied.
    pub fn env_var(&self) -> &'static str {
        match self {
            Service::LanguageModel => "OPENAI_API_KEY",
            Service::Weather => "OPENWEATHER_API_KEY",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminant of [`PipelineError`], handy for matching in tests and callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingCredential,
    EmptyInput,
    EmptyCity,
    ExtractionFailed,
    ExtractionTransportError,
    InvalidCredential,
    RateLimited,
    CityNotFound,
    ProviderUnavailable,
    Timeout,
    Cancelled,
    NetworkError,
    MalformedResponse,
    TransportError,
}

/// Terminal failure of a pipeline run. Every variant renders a message meant
/// for the end user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("{}", missing_credential_message(.0))]
    MissingCredential(Service),

    #[error(
        "No user input was given. Enter a sentence that mentions a city, or pass a city directly."
    )]
    EmptyInput,

    #[error("No city name was given. Enter a sentence that mentions a city, or pass a city directly.")]
    EmptyCity,

    #[error(
        "Could not find a city name in the input. Mention a city in your sentence, or pass a city directly."
    )]
    ExtractionFailed,

    #[error("City extraction failed: {0}")]
    ExtractionTransportError(String),

    #[error("{}", invalid_credential_message(.0))]
    InvalidCredential(Service),

    #[error("{}", rate_limited_message(.0))]
    RateLimited(Service),

    #[error(
        "City '{city}' was not found.\n\n\
         Please check that:\n\
         • the city name is spelled correctly\n\
         • the city name is written in English\n\
         • the city is commonly recognised\n\n\
         Examples: 'Tokyo', 'Seoul', 'Paris', 'New York'"
    )]
    CityNotFound { city: String },

    #[error("OpenWeatherMap server error ({status}). Please wait a moment and try again.")]
    ProviderUnavailable { status: u16 },

    #[error("The request to the {0} timed out. Check your network connection and try again later.")]
    Timeout(Service),

    #[error("The request was cancelled before it completed.")]
    Cancelled,

    #[error("OpenWeatherMap request failed: {0}\n\nCheck your network connection.")]
    NetworkError(String),

    #[error("Could not parse the weather data: {0}")]
    MalformedResponse(String),

    #[error("OpenWeatherMap request failed with status {status}: {body}")]
    TransportError { status: u16, body: String },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::MissingCredential(_) => ErrorKind::MissingCredential,
            PipelineError::EmptyInput => ErrorKind::EmptyInput,
            PipelineError::EmptyCity => ErrorKind::EmptyCity,
            PipelineError::ExtractionFailed => ErrorKind::ExtractionFailed,
            PipelineError::ExtractionTransportError(_) => ErrorKind::ExtractionTransportError,
            PipelineError::InvalidCredential(_) => ErrorKind::InvalidCredential,
            PipelineError::RateLimited(_) => ErrorKind::RateLimited,
            PipelineError::CityNotFound { .. } => ErrorKind::CityNotFound,
            PipelineError::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
            PipelineError::Timeout(_) => ErrorKind::Timeout,
            PipelineError::Cancelled => ErrorKind::Cancelled,
            PipelineError::NetworkError(_) => ErrorKind::NetworkError,
            PipelineError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            PipelineError::TransportError { .. } => ErrorKind::TransportError,
        }
    }

    /// Whether trying the same request again later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RateLimited
                | ErrorKind::ProviderUnavailable
                | ErrorKind::Timeout
                | ErrorKind::NetworkError
        )
    }
}

fn missing_credential_message(service: &Service) -> String {
    match service {
        Service::LanguageModel => format!(
            "No language model API key is configured. Set the {} environment variable \
             or pass an explicit key.",
            service.env_var()
        ),
        Service::Weather => format!(
            "No OpenWeatherMap API key is configured. Set the {} environment variable \
             or pass an explicit key.\n\nYou can get a free API key at {OPENWEATHER_SIGNUP_URL}",
            service.env_var()
        ),
    }
}

fn invalid_credential_message(service: &Service) -> String {
    match service {
        Service::LanguageModel => {
            "The language model API key is invalid. Configure a valid API key.".to_string()
        }
        Service::Weather => format!(
            "The OpenWeatherMap API key is invalid. Get a valid API key from OpenWeatherMap.\n\n\
             You can get a free API key at {OPENWEATHER_SIGNUP_URL}"
        ),
    }
}

fn rate_limited_message(service: &Service) -> String {
    match service {
        Service::LanguageModel => {
            "The language model rate limit was reached. Please wait a while and try again."
                .to_string()
        }
        Service::Weather => {
            "The OpenWeatherMap rate limit was reached. Please wait a minute and try again."
                .to_string()
        }
    }
}
