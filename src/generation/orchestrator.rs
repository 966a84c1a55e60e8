// Generation orchestrator: cache, compose, invoke, record
// Author: kelexine (https://github.com/kelexine)

use super::output::{extend_description, fit_description, ShapedTitles, TitleCollector};
use crate::analytics::{Analytics, AnalyticsEvent, AnalyticsSnapshot};
use crate::cache::{fingerprint, CacheConfig, CacheEntry, FingerprintKey, KeyPolicy, ResponseCache};
use crate::config::AppConfig;
use crate::error::{EventForgeError, GenerationError, Stage};
use crate::metrics;
use crate::models::{ContentKind, GenerationRequest, GenerationResult, TokenUsage};
use crate::policy::pricing::estimate_cost;
use crate::policy::{CostModeProfile, ModelParams};
use crate::prompt::{compose, compose_extension, compose_top_up, compress};
use crate::provider::{Generated, TextGenerator};
use crate::utils::retry::{Attempted, RetryController, RetryFailure, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

type GenerationOutcome = std::result::Result<GenerationResult, GenerationError>;

/// Provider usage accumulated across every call made for one request.
#[derive(Debug, Default)]
struct Spent {
    usage: TokenUsage,
    retries: u32,
}

impl Spent {
    fn absorb(&mut self, attempted: Attempted<Generated>) -> String {
        self.usage += attempted.value.usage;
        self.retries += attempted.attempts.saturating_sub(1);
        attempted.value.text
    }
}

/// Tunables for an [`Orchestrator`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrchestratorSettings {
    pub cache: CacheConfig,
    pub retry: RetryPolicy,
    pub key_policy: KeyPolicy,
}

impl From<&AppConfig> for OrchestratorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            cache: config.cache_config(),
            retry: config.retry_policy(),
            key_policy: config.key_policy(),
        }
    }
}

/// Serves generation requests from cache or the provider, recording
/// analytics for every outcome.
///
/// Safe to share across tasks behind an `Arc`. No lock is held while the
/// provider is being called, so concurrent identical misses may both call
/// upstream; the later cache write wins.
pub struct Orchestrator {
    generator: Arc<dyn TextGenerator>,
    cache: ResponseCache,
    analytics: Arc<Analytics>,
    retry: RetryController,
    key_policy: KeyPolicy,
}

impl Orchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: OrchestratorSettings) -> Self {
        Self::with_analytics(generator, settings, Arc::new(Analytics::new()))
    }

    /// Build with a caller-owned analytics aggregator.
    pub fn with_analytics(
        generator: Arc<dyn TextGenerator>,
        settings: OrchestratorSettings,
        analytics: Arc<Analytics>,
    ) -> Self {
        let cache = ResponseCache::new(settings.cache).with_analytics(Arc::clone(&analytics));
        Self {
            generator,
            cache,
            analytics,
            retry: RetryController::new(settings.retry),
            key_policy: settings.key_policy,
        }
    }

    pub fn from_config(generator: Arc<dyn TextGenerator>, config: &AppConfig) -> Self {
        Self::new(generator, OrchestratorSettings::from(config))
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn analytics(&self) -> &Arc<Analytics> {
        &self.analytics
    }

    pub fn analytics_snapshot(&self) -> AnalyticsSnapshot {
        self.analytics.snapshot()
    }

    /// Produce content for `request`.
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        self.generate_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Like [`Orchestrator::generate`], abandoning retry waits once `cancel`
    /// fires.
    pub async fn generate_with_cancel(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> GenerationOutcome {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        let profile = request.mode().profile();

        if let Err(e) = request.validate() {
            debug!("[{}] Rejected request: {}", request_id, e);
            return Err(self.fail(
                request,
                started,
                &Spent::default(),
                GenerationError::new(Stage::Validate, e),
            ));
        }

        let key = fingerprint(request, self.key_policy);

        if let Some(entry) = self.cache.get(&key) {
            return Ok(self.respond_from_cache(request, profile, request_id, key, entry, started));
        }

        let mut warnings = Vec::new();

        let sections = compose(request, profile);
        let compressed = compress(&sections, profile.token_ceiling, profile.aggressiveness);
        if compressed != sections {
            warnings.push(format!(
                "Prompt compressed for {} mode (~{} -> ~{} tokens)",
                profile.mode,
                sections.estimated_tokens(),
                compressed.estimated_tokens()
            ));
        }
        let prompt = compressed.render();
        if prompt.trim().is_empty() {
            let error = GenerationError::new(
                Stage::Compose,
                EventForgeError::Internal("composed prompt is empty".to_string()),
            );
            return Err(self.fail(request, started, &Spent::default(), error));
        }

        let params = profile.model_params(request);
        debug!(
            "[{}] Invoking {} ({}, max {} output tokens)",
            request_id,
            self.generator.name(),
            params.model,
            params.max_output_tokens
        );

        let mut spent = Spent::default();
        let generated = match self.invoke(&prompt, &params, cancel).await {
            Ok(attempted) => spent.absorb(attempted),
            Err(failure) => {
                spent.retries += failure.attempts.saturating_sub(1);
                let error = GenerationError::new(Stage::Invoke, failure.error).with_prompt(prompt);
                return Err(self.fail(request, started, &spent, error));
            }
        };

        let (content, cacheable) = match request.kind() {
            ContentKind::Title => {
                let shaped = self
                    .collect_titles(request, profile, &generated, &mut spent, &mut warnings, cancel)
                    .await;
                if shaped.fallback_used {
                    warnings.push(format!(
                        "Some titles use fallback templates in {} mode",
                        profile.mode
                    ));
                }
                if let Some(issue) = &shaped.parse_issue {
                    warnings.push(format!("Model output was not a clean JSON list: {}", issue));
                }
                let cacheable = !shaped.fallback_used && shaped.parse_issue.is_none();
                (shaped.titles.join("\n"), cacheable)
            }
            ContentKind::Description => {
                let text = generated.trim();
                if text.is_empty() {
                    let error = GenerationError::new(
                        Stage::Invoke,
                        EventForgeError::Internal("provider returned an empty description".to_string()),
                    )
                    .with_prompt(prompt);
                    return Err(self.fail(request, started, &spent, error));
                }

                let text = self
                    .extend_if_short(request, profile, text, &mut spent, &mut warnings, cancel)
                    .await;
                let (text, trimmed) = fit_description(&text, request.max_chars() as usize);
                if trimmed {
                    warnings.push(format!(
                        "Description trimmed to {} characters",
                        request.max_chars()
                    ));
                }
                (text, true)
            }
        };

        let usage = spent.usage;
        let retries = spent.retries;
        let cost = estimate_cost(&params.model, &usage);

        if cacheable {
            self.cache
                .put(key.clone(), CacheEntry::new(key.clone(), content.clone(), usage));
        } else {
            debug!(
                "[{}] Not caching {}: output needed fallback content",
                request_id,
                key.short()
            );
        }

        let latency = started.elapsed();
        self.analytics.record(&AnalyticsEvent::Miss {
            tokens: u64::from(usage.total()),
            latency,
            cost,
            reference_cost: profile.reference_cost_usd,
            retries,
        });
        metrics::record_generation(
            request.kind().as_str(),
            profile.mode.as_str(),
            "miss",
            latency.as_secs_f64(),
        );
        metrics::record_tokens(profile.mode.as_str(), usage.prompt_tokens, usage.completion_tokens);
        metrics::record_cost(profile.mode.as_str(), cost, false);

        info!(
            "[{}] Generated {} in {}ms ({} tokens, ${:.5}, {} retries)",
            request_id,
            request.kind(),
            latency.as_millis(),
            usage.total(),
            cost,
            retries
        );

        Ok(GenerationResult {
            request_id,
            kind: request.kind(),
            content,
            served_from_cache: false,
            tokens: usage,
            estimated_cost_usd: cost,
            latency,
            fingerprint: key.to_string(),
            mode: profile.mode,
            warnings,
        })
    }

    /// One retry-wrapped provider call.
    async fn invoke(
        &self,
        prompt: &str,
        params: &ModelParams,
        cancel: &CancellationToken,
    ) -> Result<Attempted<Generated>, RetryFailure> {
        self.retry
            .execute("generate_text", cancel, || {
                let generator = Arc::clone(&self.generator);
                let prompt = prompt.to_string();
                let params = params.clone();
                async move {
                    let result = generator.generate_text(&prompt, &params).await;
                    metrics::record_provider_call(match &result {
                        Ok(_) => "success",
                        Err(e) => e.kind.as_str(),
                    });
                    result
                }
            })
            .await
    }

    /// Shape titles from the first response, asking the provider for any
    /// that are missing before falling back to templates.
    async fn collect_titles(
        &self,
        request: &GenerationRequest,
        profile: &CostModeProfile,
        first: &str,
        spent: &mut Spent,
        warnings: &mut Vec<String>,
        cancel: &CancellationToken,
    ) -> ShapedTitles {
        let mut collector = TitleCollector::new(usize::from(request.count()));
        collector.absorb(first);

        let mut top_ups = 0;
        while collector.missing() > 0 && top_ups < profile.title_top_ups {
            top_ups += 1;
            let sections = compose_top_up(request, collector.titles(), collector.missing());
            let prompt = compress(&sections, profile.token_ceiling, profile.aggressiveness).render();
            debug!("Requesting {} more titles (top-up {})", collector.missing(), top_ups);

            match self.invoke(&prompt, &profile.top_up_params(request), cancel).await {
                Ok(attempted) => {
                    let text = spent.absorb(attempted);
                    collector.absorb(&text);
                }
                Err(failure) => {
                    spent.retries += failure.attempts.saturating_sub(1);
                    warnings.push(format!("Title top-up failed: {}", failure.error));
                    break;
                }
            }
        }

        collector.finish(request.category(), request.event_type(), request.tone())
    }

    /// Ask the provider to lengthen a description that uses less than three
    /// quarters of `max_chars`. Keeps the original text if that fails.
    async fn extend_if_short(
        &self,
        request: &GenerationRequest,
        profile: &CostModeProfile,
        text: &str,
        spent: &mut Spent,
        warnings: &mut Vec<String>,
        cancel: &CancellationToken,
    ) -> String {
        let max_chars = request.max_chars() as usize;
        let length = text.chars().count();
        if !profile.extends_descriptions || length >= max_chars * 3 / 4 {
            return text.to_string();
        }

        let remaining = max_chars - length;
        let sections = compose_extension(request, text, remaining);
        let prompt = compress(&sections, profile.token_ceiling, profile.aggressiveness).render();
        debug!("Extending {}-char description by ~{} chars", length, remaining);

        match self
            .invoke(&prompt, &profile.extension_params(request, remaining), cancel)
            .await
        {
            Ok(attempted) => {
                let extension = spent.absorb(attempted);
                extend_description(text, &extension).unwrap_or_else(|| text.to_string())
            }
            Err(failure) => {
                spent.retries += failure.attempts.saturating_sub(1);
                warnings.push(format!("Description extension failed: {}", failure.error));
                text.to_string()
            }
        }
    }

    fn respond_from_cache(
        &self,
        request: &GenerationRequest,
        profile: &CostModeProfile,
        request_id: Uuid,
        key: FingerprintKey,
        entry: CacheEntry,
        started: Instant,
    ) -> GenerationResult {
        let latency = started.elapsed();
        self.analytics.record(&AnalyticsEvent::Hit {
            latency,
            reference_cost: profile.reference_cost_usd,
        });
        metrics::record_generation(
            request.kind().as_str(),
            profile.mode.as_str(),
            "hit",
            latency.as_secs_f64(),
        );
        metrics::record_cost(profile.mode.as_str(), profile.reference_cost_usd, true);

        info!(
            "[{}] Served {} from cache {} (hit #{})",
            request_id,
            request.kind(),
            key.short(),
            entry.hit_count
        );

        GenerationResult {
            request_id,
            kind: request.kind(),
            content: entry.content,
            served_from_cache: true,
            tokens: TokenUsage::default(),
            estimated_cost_usd: 0.0,
            latency,
            fingerprint: key.to_string(),
            mode: profile.mode,
            warnings: Vec::new(),
        }
    }

    fn fail(
        &self,
        request: &GenerationRequest,
        started: Instant,
        spent: &Spent,
        error: GenerationError,
    ) -> GenerationError {
        let latency: Duration = started.elapsed();
        let mode = request.mode();
        let cost = estimate_cost(mode.profile().model, &spent.usage);
        self.analytics.record(&AnalyticsEvent::Failure {
            stage: error.stage,
            latency,
            retries: spent.retries,
            tokens: u64::from(spent.usage.total()),
            cost,
        });
        if !spent.usage.is_zero() {
            metrics::record_tokens(mode.as_str(), spent.usage.prompt_tokens, spent.usage.completion_tokens);
            metrics::record_cost(mode.as_str(), cost, false);
        }
        metrics::record_generation(
            request.kind().as_str(),
            mode.as_str(),
            "failure",
            latency.as_secs_f64(),
        );

        if error.stage == Stage::Validate {
            debug!("Generation failed: {}", error);
        } else {
            warn!("Generation failed: {}", error);
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct EchoGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate_text(
            &self,
            prompt: &str,
            _params: &ModelParams,
        ) -> std::result::Result<Generated, ProviderError> {
            self.prompts.lock().push(prompt.to_string());
            Ok(Generated {
                text: r#"["Tech Leadership Summit", "Digital Innovation Forum", "Future Systems Expo"]"#
                    .to_string(),
                usage: TokenUsage::new(120, 30),
            })
        }
    }

    fn orchestrator() -> (Arc<EchoGenerator>, Orchestrator) {
        let generator = Arc::new(EchoGenerator {
            prompts: Mutex::new(Vec::new()),
        });
        let orchestrator = Orchestrator::new(generator.clone(), OrchestratorSettings::default());
        (generator, orchestrator)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (generator, orchestrator) = orchestrator();
        let request = GenerationRequest::titles("Technology", "Conference", "Professional").build();

        let first = orchestrator.generate(&request).await.unwrap();
        assert!(!first.served_from_cache);
        assert_eq!(first.titles().len(), 3);
        assert!(first.estimated_cost_usd > 0.0);

        let second = orchestrator.generate(&request).await.unwrap();
        assert!(second.served_from_cache);
        assert_eq!(second.content, first.content);
        assert!(second.tokens.is_zero());
        assert_eq!(generator.prompts.lock().len(), 1);

        let snapshot = orchestrator.analytics_snapshot();
        assert_eq!((snapshot.cache_hits, snapshot.cache_misses), (1, 1));
    }

    #[tokio::test]
    async fn test_validation_failure_skips_provider() {
        let (generator, orchestrator) = orchestrator();
        let request = GenerationRequest::titles("Select event category", "Conference", "").build();

        let error = orchestrator.generate(&request).await.unwrap_err();
        assert_eq!(error.stage, Stage::Validate);
        assert!(!error.produced_partial_work());
        assert!(generator.prompts.lock().is_empty());
        assert_eq!(orchestrator.analytics_snapshot().failures, 1);
    }

    #[tokio::test]
    async fn test_prompt_carries_structural_fields() {
        let (generator, orchestrator) = orchestrator();
        let request = GenerationRequest::titles("Technology", "Conference", "Professional")
            .context("AI and machine learning")
            .build();
        orchestrator.generate(&request).await.unwrap();

        let prompts = generator.prompts.lock();
        assert!(prompts[0].contains("Category: Technology"));
        assert!(prompts[0].contains("Context: AI and machine learning"));
    }
}
