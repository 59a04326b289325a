use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::BackendApiError;

/// Provider wire family for a configured backend.
///
/// `OpenAi` prepends a synthesized system message into a flat message list
/// with bearer auth; `Anthropic` carries the system text in a dedicated
/// field with `x-api-key` auth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFamily {
    OpenAi,
    Anthropic,
}

/// Configuration for one named backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendProfile {
    pub id: String,
    pub family: ProviderFamily,
    pub url: String,
    pub credential: String,
    pub default_model: String,
    /// Model id to maximum output tokens.
    pub available_models: BTreeMap<String, u32>,
    pub default_temperature: f64,
}

impl BackendProfile {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        family: ProviderFamily,
        url: impl Into<String>,
        credential: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            family,
            url: url.into(),
            credential: credential.into(),
            default_model: default_model.into(),
            available_models: BTreeMap::new(),
            default_temperature: 0.7,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>, max_output_tokens: u32) -> Self {
        self.available_models.insert(model.into(), max_output_tokens);
        self
    }

    #[must_use]
    pub fn with_default_temperature(mut self, temperature: f64) -> Self {
        self.default_temperature = temperature;
        self
    }

    #[must_use]
    pub fn max_output_tokens(&self, model: &str) -> Option<u32> {
        self.available_models.get(model).copied()
    }
}

/// Named backend profiles plus the active `(backend, model)` selection.
///
/// Misconfiguration is rejected eagerly: a profile without a credential or
/// with a default model missing from its model table never enters the
/// registry, so no run can start against it.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    backends: BTreeMap<String, BackendProfile>,
    active: Option<Selection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Selection {
    backend: String,
    model: String,
}

impl BackendRegistry {
    pub fn insert(&mut self, profile: BackendProfile) -> Result<(), BackendApiError> {
        if profile.credential.trim().is_empty() {
            return Err(BackendApiError::MissingCredential {
                backend: profile.id.clone(),
            });
        }
        if !profile.available_models.contains_key(&profile.default_model) {
            return Err(BackendApiError::InvalidDefaultModel {
                backend: profile.id.clone(),
                model: profile.default_model.clone(),
            });
        }

        self.backends.insert(profile.id.clone(), profile);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, backend: &str) -> Option<&BackendProfile> {
        self.backends.get(backend)
    }

    /// Makes `backend` (and optionally a specific model) the active
    /// selection for subsequent requests.
    pub fn select(&mut self, backend: &str, model: Option<&str>) -> Result<(), BackendApiError> {
        let profile = self
            .backends
            .get(backend)
            .ok_or_else(|| BackendApiError::UnknownBackend(backend.to_owned()))?;
        let model = model.unwrap_or(&profile.default_model);
        if profile.max_output_tokens(model).is_none() {
            return Err(BackendApiError::UnknownModel {
                backend: backend.to_owned(),
                model: model.to_owned(),
            });
        }

        self.active = Some(Selection {
            backend: backend.to_owned(),
            model: model.to_owned(),
        });
        Ok(())
    }

    /// Resolves the profile and model for one request. Explicit request
    /// values override the active selection.
    pub fn resolve(
        &self,
        backend: Option<&str>,
        model: Option<&str>,
    ) -> Result<(&BackendProfile, String), BackendApiError> {
        let backend_id = backend
            .or(self.active.as_ref().map(|selection| selection.backend.as_str()))
            .ok_or(BackendApiError::NoBackendSelected)?;
        let profile = self
            .backends
            .get(backend_id)
            .ok_or_else(|| BackendApiError::UnknownBackend(backend_id.to_owned()))?;

        let model = match model {
            Some(model) => model.to_owned(),
            None => match &self.active {
                Some(selection) if selection.backend == backend_id => selection.model.clone(),
                _ => profile.default_model.clone(),
            },
        };
        if profile.max_output_tokens(&model).is_none() {
            return Err(BackendApiError::UnknownModel {
                backend: backend_id.to_owned(),
                model,
            });
        }

        Ok((profile, model))
    }
}
