//! Provider failover controller.
//!
//! Owns the ordered chain of generation providers and a small state machine
//! per provider:
//!
//! ```text
//!   Available --provider failure--> Cooling
//!   Cooling   --now >= expiry----> Available   (checked at selection)
//! ```
//!
//! A query goes to the first `Available` provider in configured order. On a
//! provider failure that provider starts cooling down and the query is
//! retried once on the next `Available` provider. Errors that are not
//! provider failures are returned as-is without touching any state.

use crate::llm::client::{Generation, GenerationProvider};
use crate::llm::error::{FailureKind, ProviderError};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

/// Default time a failed provider is skipped.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);
/// Default upper bound on a single generation attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Failover timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailoverConfig {
    /// How long a failed provider stays in `Cooling`.
    pub cooldown: Duration,
    /// Upper bound on one `generate` call; exceeding it is a timeout failure.
    pub attempt_timeout: Duration,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl FailoverConfig {
    /// Override the cooldown.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Override the attempt timeout.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }
}

/// Health of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    /// Eligible for selection.
    Available,
    /// Skipped until the cooldown expires.
    Cooling,
}

/// Point-in-time view of one provider's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderState {
    /// Configured provider name.
    pub provider_id: String,
    /// Model the provider generates with.
    pub model_id: String,
    /// Current status.
    pub status: ProviderStatus,
    /// Remaining cooldown while `Cooling`.
    pub cooldown_remaining: Option<Duration>,
    /// Kind of the most recent failure.
    pub last_failure: Option<FailureKind>,
}

/// A successful generation and the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverAnswer {
    /// Provider that answered.
    pub provider_id: String,
    /// The generation.
    pub generation: Generation,
}

/// Terminal outcomes of [`FailoverController::generate`].
#[derive(Debug, Error)]
pub enum FailoverError {
    /// No provider was `Available`.
    #[error("The assistant is temporarily unavailable: every answer provider is cooling down. Please try again shortly.")]
    Unavailable,

    /// The retry also hit a provider failure.
    #[error("The assistant is temporarily unavailable: provider '{provider_id}' failed ({kind}). Please try again shortly.")]
    ProviderFailed {
        /// Provider that failed the retry.
        provider_id: String,
        /// Classified failure.
        kind: FailureKind,
    },

    /// A provider rejected the request for reasons failover cannot fix.
    #[error("Provider '{provider_id}' could not answer: {source}")]
    Rejected {
        /// Provider that rejected the request.
        provider_id: String,
        /// The non-provider error.
        #[source]
        source: ProviderError,
    },
}

#[derive(Debug)]
struct SlotState {
    status: ProviderStatus,
    cooldown_expiry: Option<Instant>,
    last_failure: Option<FailureKind>,
}

struct Slot {
    provider: Arc<dyn GenerationProvider>,
    state: Mutex<SlotState>,
}

/// Ordered provider chain with per-provider cooldown.
pub struct FailoverController {
    slots: Vec<Slot>,
    config: FailoverConfig,
}

impl FailoverController {
    /// Build a controller over `providers` in priority order. Every provider
    /// starts `Available`.
    pub fn new(providers: Vec<Arc<dyn GenerationProvider>>, config: FailoverConfig) -> Self {
        let slots = providers
            .into_iter()
            .map(|provider| Slot {
                provider,
                state: Mutex::new(SlotState {
                    status: ProviderStatus::Available,
                    cooldown_expiry: None,
                    last_failure: None,
                }),
            })
            .collect();
        Self { slots, config }
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Timing in effect.
    pub fn config(&self) -> FailoverConfig {
        self.config
    }

    /// Snapshot of every provider's state, in priority order.
    pub fn states(&self) -> Vec<ProviderState> {
        let now = Instant::now();
        self.slots
            .iter()
            .map(|slot| {
                let state = slot.state.lock();
                let remaining = match (state.status, state.cooldown_expiry) {
                    (ProviderStatus::Cooling, Some(expiry)) if expiry > now => Some(expiry - now),
                    _ => None,
                };
                ProviderState {
                    provider_id: slot.provider.provider_id().to_string(),
                    model_id: slot.provider.model_id().to_string(),
                    status: if remaining.is_some() {
                        ProviderStatus::Cooling
                    } else {
                        ProviderStatus::Available
                    },
                    cooldown_remaining: remaining,
                    last_failure: state.last_failure,
                }
            })
            .collect()
    }

    /// Answer `query` with the first available provider, retrying once on
    /// the next one after a provider failure.
    #[instrument(skip_all, fields(providers = self.slots.len()))]
    pub async fn generate(
        &self,
        query: &str,
        context: &str,
    ) -> Result<FailoverAnswer, FailoverError> {
        let first = self.select(None).ok_or(FailoverError::Unavailable)?;

        let err = match self.attempt(first, query, context).await {
            Ok(answer) => return Ok(answer),
            Err(err) => err,
        };
        if !err.is_provider_failure() {
            return Err(self.rejected(first, err));
        }
        self.mark_cooling(first, &err);

        let Some(second) = self.select(Some(first)) else {
            warn!("No provider left to retry on");
            return Err(FailoverError::Unavailable);
        };
        info!(
            from = self.slots[first].provider.provider_id(),
            to = self.slots[second].provider.provider_id(),
            "Failing over"
        );

        match self.attempt(second, query, context).await {
            Ok(answer) => Ok(answer),
            Err(err) if err.is_provider_failure() => {
                let kind = self.mark_cooling(second, &err);
                Err(FailoverError::ProviderFailed {
                    provider_id: self.slots[second].provider.provider_id().to_string(),
                    kind,
                })
            }
            Err(err) => Err(self.rejected(second, err)),
        }
    }

    /// First `Available` provider in order, recovering expired cooldowns.
    fn select(&self, skip: Option<usize>) -> Option<usize> {
        let now = Instant::now();
        for (i, slot) in self.slots.iter().enumerate() {
            if skip == Some(i) {
                continue;
            }
            let mut state = slot.state.lock();
            if state.status == ProviderStatus::Cooling
                && state.cooldown_expiry.map_or(true, |expiry| now >= expiry)
            {
                state.status = ProviderStatus::Available;
                state.cooldown_expiry = None;
                info!(provider = slot.provider.provider_id(), "Provider recovered from cooldown");
            }
            if state.status == ProviderStatus::Available {
                return Some(i);
            }
        }
        None
    }

    async fn attempt(
        &self,
        index: usize,
        query: &str,
        context: &str,
    ) -> Result<FailoverAnswer, ProviderError> {
        let provider = &self.slots[index].provider;
        let started = Instant::now();

        let result = tokio::time::timeout(self.config.attempt_timeout, provider.generate(query, context))
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::failure(
                    FailureKind::Timeout,
                    format!("no answer within {:?}", self.config.attempt_timeout),
                ))
            });

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(generation) => {
                info!(provider = provider.provider_id(), elapsed_ms, "Generation succeeded");
                Ok(FailoverAnswer {
                    provider_id: provider.provider_id().to_string(),
                    generation,
                })
            }
            Err(err) => {
                warn!(
                    provider = provider.provider_id(),
                    elapsed_ms,
                    error = %err,
                    detail = err.detail(),
                    "Generation failed"
                );
                Err(err)
            }
        }
    }

    fn mark_cooling(&self, index: usize, err: &ProviderError) -> FailureKind {
        let kind = err.failure_kind().unwrap_or(FailureKind::Unavailable);
        let slot = &self.slots[index];
        let mut state = slot.state.lock();
        state.status = ProviderStatus::Cooling;
        state.cooldown_expiry = Some(Instant::now() + self.config.cooldown);
        state.last_failure = Some(kind);
        warn!(
            provider = slot.provider.provider_id(),
            kind = %kind,
            cooldown_secs = self.config.cooldown.as_secs(),
            "Provider cooling down"
        );
        kind
    }

    fn rejected(&self, index: usize, source: ProviderError) -> FailoverError {
        FailoverError::Rejected {
            provider_id: self.slots[index].provider.provider_id().to_string(),
            source,
        }
    }
}
