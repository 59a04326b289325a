use serde_json::{json, Value};

use crate::config::{BackendProfile, ProviderFamily};
use crate::error::BackendApiError;

pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_API_KEY: &str = "x-api-key";
pub const HEADER_ANTHROPIC_VERSION: &str = "anthropic-version";
pub const HEADER_ACCEPT: &str = "accept";

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Caller-facing inputs for one streaming request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AskOptions {
    /// Backend id; falls back to the registry's active selection.
    pub backend: Option<String>,
    /// Model id; falls back to the selected or default model.
    pub model: Option<String>,
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: Option<f64>,
    /// Clamped to the resolved model's maximum output tokens.
    pub max_tokens: Option<u32>,
}

/// Fully resolved wire request for one backend family.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub backend: String,
    pub model: String,
    pub temperature: f64,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

/// Builds the provider-specific request body and headers.
///
/// `max_tokens` is clamped to `min(requested, model cap)`; both families
/// always request `stream: true`.
pub fn build_request(
    profile: &BackendProfile,
    model: &str,
    opts: &AskOptions,
) -> Result<ResolvedRequest, BackendApiError> {
    let cap = profile
        .max_output_tokens(model)
        .ok_or_else(|| BackendApiError::UnknownModel {
            backend: profile.id.clone(),
            model: model.to_owned(),
        })?;
    let max_tokens = opts.max_tokens.map_or(cap, |requested| requested.min(cap));
    let temperature = opts.temperature.unwrap_or(profile.default_temperature);

    let body = match profile.family {
        ProviderFamily::OpenAi => {
            let mut messages = Vec::new();
            if let Some(system) = &opts.system {
                messages.push(json!({ "role": "system", "content": system }));
            }
            messages.push(json!({ "role": "user", "content": opts.prompt }));
            json!({
                "messages": messages,
                "model": model,
                "temperature": temperature,
                "stream": true,
                "max_tokens": max_tokens,
            })
        }
        ProviderFamily::Anthropic => {
            let mut body = json!({
                "messages": [{ "role": "user", "content": opts.prompt }],
                "model": model,
                "temperature": temperature,
                "stream": true,
                "max_tokens": max_tokens,
            });
            if let Some(system) = &opts.system {
                body["system"] = Value::String(system.clone());
            }
            body
        }
    };

    let headers = match profile.family {
        ProviderFamily::OpenAi => vec![
            (
                HEADER_AUTHORIZATION,
                format!("Bearer {}", profile.credential.trim()),
            ),
            (HEADER_ACCEPT, "text/event-stream".to_owned()),
        ],
        ProviderFamily::Anthropic => vec![
            (HEADER_API_KEY, profile.credential.trim().to_owned()),
            (HEADER_ANTHROPIC_VERSION, ANTHROPIC_VERSION.to_owned()),
            (HEADER_ACCEPT, "text/event-stream".to_owned()),
        ],
    };

    Ok(ResolvedRequest {
        backend: profile.id.clone(),
        model: model.to_owned(),
        temperature,
        url: profile.url.clone(),
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{build_request, AskOptions, ANTHROPIC_VERSION};
    use crate::config::{BackendProfile, ProviderFamily};

    fn openai_profile() -> BackendProfile {
        BackendProfile::new(
            "openai",
            ProviderFamily::OpenAi,
            "https://api.example.com/v1/chat/completions",
            "sk-test",
            "gpt-test",
        )
        .with_model("gpt-test", 4096)
    }

    fn anthropic_profile() -> BackendProfile {
        BackendProfile::new(
            "anthropic",
            ProviderFamily::Anthropic,
            "https://api.example.com/v1/messages",
            "ak-test",
            "claude-test",
        )
        .with_model("claude-test", 2048)
        .with_default_temperature(0.5)
    }

    #[test]
    fn max_tokens_is_clamped_to_model_cap() {
        let opts = AskOptions {
            prompt: "hi".to_owned(),
            max_tokens: Some(100_000),
            ..AskOptions::default()
        };

        let request =
            build_request(&openai_profile(), "gpt-test", &opts).expect("request builds");
        assert_eq!(request.body["max_tokens"], json!(4096));
    }

    #[test]
    fn requested_max_tokens_below_cap_is_preserved() {
        let opts = AskOptions {
            prompt: "hi".to_owned(),
            max_tokens: Some(128),
            ..AskOptions::default()
        };

        let request =
            build_request(&openai_profile(), "gpt-test", &opts).expect("request builds");
        assert_eq!(request.body["max_tokens"], json!(128));
    }

    #[test]
    fn openai_family_prepends_system_message_into_flat_list() {
        let opts = AskOptions {
            system: Some("be brief".to_owned()),
            prompt: "explain".to_owned(),
            ..AskOptions::default()
        };

        let request =
            build_request(&openai_profile(), "gpt-test", &opts).expect("request builds");
        assert_eq!(
            request.body["messages"],
            json!([
                { "role": "system", "content": "be brief" },
                { "role": "user", "content": "explain" },
            ])
        );
        assert_eq!(request.body["stream"], json!(true));
        assert_eq!(
            request.headers[0],
            ("authorization", "Bearer sk-test".to_owned())
        );
    }

    #[test]
    fn anthropic_family_uses_dedicated_system_field() {
        let opts = AskOptions {
            system: Some("be brief".to_owned()),
            prompt: "explain".to_owned(),
            ..AskOptions::default()
        };

        let request =
            build_request(&anthropic_profile(), "claude-test", &opts).expect("request builds");
        assert_eq!(request.body["system"], json!("be brief"));
        assert_eq!(
            request.body["messages"],
            json!([{ "role": "user", "content": "explain" }])
        );
        assert_eq!(request.headers[0], ("x-api-key", "ak-test".to_owned()));
        assert_eq!(
            request.headers[1],
            ("anthropic-version", ANTHROPIC_VERSION.to_owned())
        );
    }

    #[test]
    fn anthropic_family_omits_absent_system_field() {
        let opts = AskOptions {
            prompt: "explain".to_owned(),
            ..AskOptions::default()
        };

        let request =
            build_request(&anthropic_profile(), "claude-test", &opts).expect("request builds");
        assert!(request.body.get("system").is_none());
    }

    #[test]
    fn absent_max_tokens_falls_back_to_model_cap() {
        let opts = AskOptions {
            prompt: "hi".to_owned(),
            ..AskOptions::default()
        };

        let request =
            build_request(&anthropic_profile(), "claude-test", &opts).expect("request builds");
        assert_eq!(request.body["max_tokens"], json!(2048));
        assert_eq!(request.body["temperature"], json!(0.5));
    }
}
