//! Core library for the `askweather` CLI.
//!
//! This crate defines:
//! - City extraction from free-form text via a language model
//! - Current-weather retrieval with status classification
//! - The pipeline that sequences both stages into one tagged result
//! - Configuration & credentials handling
//!
//! It is used by `askweather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod fetcher;
mod http;
pub mod llm;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod resolver;

pub use config::{CallConfig, Config, Credentials, Settings};
pub use error::{ErrorKind, PipelineError, Service};
pub use fetcher::WeatherFetcher;
pub use llm::{CompletionClient, LlmError, OpenAiClient};
pub use model::{
    ChatMessage, InvokeInput, InvokeOutput, NO_DATA, PipelineResult, Request, ResolvedCity,
    WeatherRecord,
};
pub use pipeline::{Pipeline, PipelineState};
pub use provider::{OpenWeatherProvider, WeatherProvider};
pub use resolver::CityResolver;
