//! Model discovery: pick a usable generation model for this run.

use std::fmt;

use super::client::GeminiClient;

/// A model as advertised by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Identifier without the `models/` prefix, e.g. `gemini-2.5-flash`.
    pub identifier: String,
    /// Whether the model supports `generateContent`.
    pub supports_generation: bool,
}

impl ModelDescriptor {
    pub fn new(identifier: impl Into<String>, supports_generation: bool) -> Self {
        Self {
            identifier: identifier.into(),
            supports_generation,
        }
    }
}

/// Why the hard-coded fallback model was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The listing call failed.
    ListingFailed(String),
    /// The listing worked but nothing supports generation.
    NoEligibleModel,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::ListingFailed(err) => write!(f, "model listing failed: {}", err),
            FallbackReason::NoEligibleModel => write!(f, "no model supports generation"),
        }
    }
}

/// Outcome of model resolution. Every variant names a usable model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelChoice {
    /// An eligible model in the preferred tier.
    Preferred(String),
    /// No preferred model; the first eligible one in listing order.
    FirstEligible(String),
    /// Discovery gave nothing usable.
    Fallback {
        identifier: String,
        reason: FallbackReason,
    },
}

impl ModelChoice {
    pub fn identifier(&self) -> &str {
        match self {
            ModelChoice::Preferred(id) | ModelChoice::FirstEligible(id) => id,
            ModelChoice::Fallback { identifier, .. } => identifier,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ModelChoice::Fallback { .. })
    }
}

/// Apply the selection policy to a listing.
///
/// Only descriptors that support generation are considered. The first one whose
/// identifier contains `preferred_marker` wins, otherwise the first eligible one,
/// otherwise `fallback`.
pub fn select_model(
    descriptors: &[ModelDescriptor],
    preferred_marker: &str,
    fallback: &str,
) -> ModelChoice {
    let mut eligible = descriptors.iter().filter(|d| d.supports_generation);

    let first = match eligible.clone().next() {
        Some(first) => first,
        None => {
            return ModelChoice::Fallback {
                identifier: fallback.to_string(),
                reason: FallbackReason::NoEligibleModel,
            }
        }
    };

    if !preferred_marker.is_empty() {
        if let Some(preferred) = eligible.find(|d| d.identifier.contains(preferred_marker)) {
            return ModelChoice::Preferred(preferred.identifier.clone());
        }
    }

    ModelChoice::FirstEligible(first.identifier.clone())
}

/// Discovers which model to use for script generation.
pub struct ModelResolver<'a> {
    client: &'a GeminiClient,
    preferred_marker: String,
    fallback_model: String,
}

impl<'a> ModelResolver<'a> {
    pub fn new(client: &'a GeminiClient, preferred_marker: &str, fallback_model: &str) -> Self {
        Self {
            client,
            preferred_marker: preferred_marker.to_string(),
            fallback_model: fallback_model.to_string(),
        }
    }

    /// Query the listing and pick a model. Never fails.
    pub async fn resolve(&self) -> ModelChoice {
        let choice = match self.client.list_models().await {
            Ok(descriptors) => {
                log::debug!("Model listing returned {} entries", descriptors.len());
                select_model(&descriptors, &self.preferred_marker, &self.fallback_model)
            }
            Err(e) => ModelChoice::Fallback {
                identifier: self.fallback_model.clone(),
                reason: FallbackReason::ListingFailed(e.to_string()),
            },
        };

        match &choice {
            ModelChoice::Preferred(id) => log::info!("Using preferred model {}", id),
            ModelChoice::FirstEligible(id) => {
                log::info!("No '{}' model listed, using {}", self.preferred_marker, id)
            }
            ModelChoice::Fallback { identifier, reason } => {
                log::warn!("Falling back to {} ({})", identifier, reason)
            }
        }
        choice
    }

    /// Eligible identifiers in listing order, for diagnostics.
    pub async fn eligible_models(&self) -> Result<Vec<String>, super::GeminiError> {
        Ok(self
            .client
            .list_models()
            .await?
            .into_iter()
            .filter(|d| d.supports_generation)
            .map(|d| d.identifier)
            .collect())
    }
}
