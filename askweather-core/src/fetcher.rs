use std::sync::Arc;

use tracing::debug;

use crate::{
    config::{mask_key, non_blank},
    error::{PipelineError, Service},
    model::{ResolvedCity, WeatherRecord},
    provider::WeatherProvider,
};

/// Validates inputs, then asks the provider for current conditions.
#[derive(Debug, Clone)]
pub struct WeatherFetcher {
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherFetcher {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    pub async fn fetch(
        &self,
        city: &str,
        weather_api_key: Option<&str>,
    ) -> Result<WeatherRecord, PipelineError> {
        let api_key =
            non_blank(weather_api_key).ok_or(PipelineError::MissingCredential(Service::Weather))?;
        let city = ResolvedCity::new(city).ok_or(PipelineError::EmptyCity)?;

        debug!(%city, key = %mask_key(api_key), "fetching weather");
        self.provider.current(&city, api_key).await
    }
}
