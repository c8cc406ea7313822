use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    config::non_blank,
    error::{PipelineError, Service},
    llm::{CompletionClient, LlmError},
    model::ResolvedCity,
};

/// Instruction sent with every extraction request.
pub const EXTRACTION_PROMPT: &str = "\
You are an expert at extracting city names.
Extract only the city name from the user's input. The input may be written in any \
language, mix languages, or use transliterated or colloquial place names.
Answer with the English name of the city.

Examples:
- \"도쿄の 날씨는 어떤가요?\" -> \"Tokyo\"
- \"how's the weather in Tokyo?\" -> \"Tokyo\"
- \"서울 날씨 알려줘\" -> \"Seoul\"
- \"What's the weather like in Paris?\" -> \"Paris\"

If no city can be identified, return an empty string.
Return only the city name, with no explanation or additional text.";

/// Turns user input into a [`ResolvedCity`].
#[derive(Debug, Clone)]
pub struct CityResolver {
    llm: Arc<dyn CompletionClient>,
}

impl CityResolver {
    pub fn new(llm: Arc<dyn CompletionClient>) -> Self {
        Self { llm }
    }

    /// Resolve a city from `free_text`, unless a non-blank `city_override`
    /// makes extraction unnecessary.
    pub async fn resolve(
        &self,
        free_text: &str,
        city_override: Option<&str>,
        llm_api_key: Option<&str>,
    ) -> Result<ResolvedCity, PipelineError> {
        if let Some(city) = city_override.and_then(ResolvedCity::new) {
            info!(%city, "using caller-supplied city, skipping extraction");
            return Ok(city);
        }

        let api_key = non_blank(llm_api_key)
            .ok_or(PipelineError::MissingCredential(Service::LanguageModel))?;

        if free_text.trim().is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        debug!(input = free_text, "extracting city with language model");
        let output = self
            .llm
            .complete(api_key, EXTRACTION_PROMPT, free_text)
            .await
            .map_err(classify_llm_error)?;

        let city = ResolvedCity::new(&output).ok_or(PipelineError::ExtractionFailed)?;
        info!(%city, "extracted city");
        Ok(city)
    }
}

/// Map a language-model failure onto the pipeline taxonomy.
pub fn classify_llm_error(err: LlmError) -> PipelineError {
    warn!(error = %err, "city extraction request failed");
    match err {
        LlmError::Status { status: 401, .. } => PipelineError::InvalidCredential(Service::LanguageModel),
        LlmError::Status { status: 429, .. } => PipelineError::RateLimited(Service::LanguageModel),
        LlmError::Timeout => PipelineError::Timeout(Service::LanguageModel),
        other => {
            let message = other.to_string();
            if message.to_lowercase().contains("rate_limit") {
                PipelineError::RateLimited(Service::LanguageModel)
            } else {
                PipelineError::ExtractionTransportError(message)
            }
        }
    }
}
