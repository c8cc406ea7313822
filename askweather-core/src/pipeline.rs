//! Orchestrator sequencing city resolution and weather retrieval.

use std::{future::Future, sync::Arc};

use tracing::{Instrument, debug, info, info_span, warn};

use crate::{
    config::{CallConfig, Credentials, Settings},
    error::PipelineError,
    fetcher::WeatherFetcher,
    llm::{CompletionClient, OpenAiClient},
    model::{InvokeInput, InvokeOutput, PipelineResult, Request},
    provider::{OpenWeatherProvider, WeatherProvider},
    resolver::CityResolver,
};

/// Lifecycle of a single run.
///
/// `Start -> Resolving -> {Fetching | Failed}`, `Fetching -> {Succeeded | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Start,
    Resolving,
    Fetching,
    Succeeded,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Succeeded | PipelineState::Failed)
    }

    pub fn can_advance_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Start, Resolving)
                | (Resolving, Fetching)
                | (Resolving, Failed)
                | (Fetching, Succeeded)
                | (Fetching, Failed)
        )
    }
}

#[derive(Debug)]
struct Transitions {
    current: PipelineState,
}

impl Transitions {
    fn start() -> Self {
        Self { current: PipelineState::Start }
    }

    fn enter(&mut self, next: PipelineState) {
        debug_assert!(
            self.current.can_advance_to(next),
            "illegal transition {:?} -> {next:?}",
            self.current
        );
        debug!(from = ?self.current, to = ?next, "pipeline transition");
        self.current = next;
    }
}

/// Runs the two stages in order, stopping at the first failure.
#[derive(Debug, Clone)]
pub struct Pipeline {
    resolver: CityResolver,
    fetcher: WeatherFetcher,
}

impl Pipeline {
    /// Pipeline backed by the OpenAI-compatible client and OpenWeatherMap.
    ///
    /// Fails if `settings` do not pass [`Settings::validate`].
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        settings.validate()?;
        let llm = Arc::new(OpenAiClient::from_settings(settings));
        let provider = Arc::new(OpenWeatherProvider::from_settings(settings));
        Ok(Self::with_collaborators(llm, provider))
    }

    pub fn with_collaborators(
        llm: Arc<dyn CompletionClient>,
        provider: Arc<dyn WeatherProvider>,
    ) -> Self {
        Self {
            resolver: CityResolver::new(llm),
            fetcher: WeatherFetcher::new(provider),
        }
    }

    pub async fn run(&self, request: &Request, credentials: &Credentials) -> PipelineResult {
        let span = info_span!("pipeline_run", override_city = request.city_override().is_some());
        self.run_inner(request, credentials).instrument(span).await
    }

    /// Like [`Pipeline::run`], but ends with [`PipelineError::Cancelled`] as
    /// soon as `cancel` completes. The in-flight request is dropped.
    pub async fn run_with_cancel<F>(
        &self,
        request: &Request,
        credentials: &Credentials,
        cancel: F,
    ) -> PipelineResult
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                warn!("pipeline run cancelled");
                PipelineResult::Failure(PipelineError::Cancelled)
            }
            result = self.run(request, credentials) => result,
        }
    }

    /// Entry point for external callers: builds the request from `input`,
    /// resolves credentials from `call` and the environment, and returns the
    /// tagged output.
    pub async fn invoke(&self, input: InvokeInput, call: &CallConfig) -> InvokeOutput {
        let request = input.into_request();
        let credentials = Credentials::resolve(call);
        self.run(&request, &credentials).await.into_output()
    }

    async fn run_inner(&self, request: &Request, credentials: &Credentials) -> PipelineResult {
        let mut state = Transitions::start();

        state.enter(PipelineState::Resolving);
        let resolved = self
            .resolver
            .resolve(
                request.free_text().unwrap_or_default(),
                request.city_override(),
                credentials.llm(),
            )
            .await;

        let city = match resolved {
            Ok(city) => city,
            Err(err) => {
                state.enter(PipelineState::Failed);
                warn!(kind = ?err.kind(), "city resolution failed");
                return PipelineResult::Failure(err);
            }
        };

        state.enter(PipelineState::Fetching);
        match self.fetcher.fetch(city.as_str(), credentials.weather()).await {
            Ok(record) => {
                state.enter(PipelineState::Succeeded);
                info!(%city, "pipeline succeeded");
                PipelineResult::Success { city, record }
            }
            Err(err) => {
                state.enter(PipelineState::Failed);
                warn!(%city, kind = ?err.kind(), "weather retrieval failed");
                PipelineResult::Failure(err)
            }
        }
    }
}
