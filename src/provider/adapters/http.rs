//! Shared HTTP plumbing for the backend adapters.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::provider::error::ProviderError;

/// Longest error body kept in [`ProviderError::Status`]
const MAX_ERROR_BODY: usize = 2048;

/// HTTP client shared by every adapter
#[derive(Clone)]
pub struct HttpClientBase {
    /// Provider identifier used in errors and logs
    pub provider: String,
    /// Base endpoint, without trailing slash
    pub endpoint: String,
    http: Client,
}

impl HttpClientBase {
    /// Create a client for `provider` rooted at `endpoint`
    pub fn new(provider: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Build URL from endpoint and path
    pub fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    /// POST a JSON body with the given headers and decode the JSON answer.
    ///
    /// Non-2xx answers become [`ProviderError::Status`] carrying the (truncated)
    /// body so the backend's own error message reaches the user.
    pub async fn post_json<Req, Res>(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &Req,
    ) -> Result<Res, ProviderError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let mut request = self.http.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::http(&self.provider, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::http(&self.provider, e))?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: self.provider.clone(),
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            ProviderError::invalid_response(&self.provider, format!("could not decode body: {}", e))
        })
    }
}

/// Resolve a credential, treating blank values as missing
pub fn require_credential(
    provider: &str,
    variable: &str,
    value: Option<String>,
) -> Result<String, ProviderError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ProviderError::missing_credentials(provider, variable))
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let base = HttpClientBase::new("openai", "https://api.openai.com/v1/");
        assert_eq!(
            base.build_url("/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            base.build_url("chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_require_credential() {
        assert!(require_credential("anthropic", "ANTHROPIC_API_KEY", None).is_err());
        assert!(require_credential("anthropic", "ANTHROPIC_API_KEY", Some("  ".into())).is_err());
        assert_eq!(
            require_credential("anthropic", "ANTHROPIC_API_KEY", Some("sk-ant".into())).unwrap(),
            "sk-ant"
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(10);
        let cut = truncate(&text, 5);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("short", 10), "short");
    }
}
