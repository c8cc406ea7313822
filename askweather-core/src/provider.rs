use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::PipelineError,
    model::{ResolvedCity, WeatherRecord},
};

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// A source of current weather conditions.
///
/// Implementations perform exactly one request per call and classify every
/// failure into a [`PipelineError`]; nothing is retried.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(
        &self,
        city: &ResolvedCity,
        api_key: &str,
    ) -> Result<WeatherRecord, PipelineError>;
}
