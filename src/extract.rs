//! Clients for the natural-language extraction service.

use serde_json::Value;

use crate::error::ChartError;
use crate::ir::ChartType;

/// Prompt plus chart type in, raw JSON-ish payload out. Implementations make
/// no promise about the payload's shape; callers run it through
/// [`crate::normalize::normalize_response`].
pub trait ExtractionClient {
    fn extract(&self, prompt: &str, chart_type: ChartType) -> Result<Value, ChartError>;
}

impl<C: ExtractionClient + ?Sized> ExtractionClient for Box<C> {
    fn extract(&self, prompt: &str, chart_type: ChartType) -> Result<Value, ChartError> {
        (**self).extract(prompt, chart_type)
    }
}

impl<C: ExtractionClient + ?Sized> ExtractionClient for &C {
    fn extract(&self, prompt: &str, chart_type: ChartType) -> Result<Value, ChartError> {
        (**self).extract(prompt, chart_type)
    }
}

#[cfg(feature = "http")]
pub use http::{HttpExtractionClient, OllamaClient, client_from_config};

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use reqwest::blocking::{Client, Response};
    use serde::Deserialize;
    use serde_json::{Value, json};
    use tracing::debug;

    use super::ExtractionClient;
    use crate::config::{Backend, ExtractionConfig};
    use crate::error::ChartError;
    use crate::ir::ChartType;
    use crate::prompt::format_prompt;

    fn build_client(timeout_secs: u64) -> Result<Client, ChartError> {
        Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(transport_error)
    }

    fn transport_error(err: reqwest::Error) -> ChartError {
        ChartError::UpstreamUnavailable {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
        }
    }

    /// Returns the body text of a 2xx response, or the upstream failure.
    fn success_body(response: Response) -> Result<String, ChartError> {
        let status = response.status();
        let body = response.text().map_err(transport_error)?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(ChartError::UpstreamUnavailable {
                status: Some(status.as_u16()),
                body,
            })
        }
    }

    /// Posts `{prompt, chartType}` to the parse endpoint.
    #[derive(Debug, Clone)]
    pub struct HttpExtractionClient {
        endpoint: String,
        client: Client,
    }

    impl HttpExtractionClient {
        pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, ChartError> {
            Ok(Self {
                endpoint: endpoint.into(),
                client: build_client(timeout_secs)?,
            })
        }

        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    impl ExtractionClient for HttpExtractionClient {
        fn extract(&self, prompt: &str, chart_type: ChartType) -> Result<Value, ChartError> {
            debug!(endpoint = %self.endpoint, %chart_type, "posting extraction request");
            let response = self
                .client
                .post(&self.endpoint)
                .json(&json!({ "prompt": prompt, "chartType": chart_type.as_str() }))
                .send()
                .map_err(transport_error)?;
            let body = success_body(response)?;
            Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
        }
    }

    #[derive(Debug, Deserialize)]
    struct ChatMessage {
        content: String,
    }

    #[derive(Debug, Deserialize)]
    struct ChatResponse {
        message: ChatMessage,
    }

    /// Prompts an Ollama server directly through `/api/chat`.
    #[derive(Debug, Clone)]
    pub struct OllamaClient {
        host: String,
        model: String,
        client: Client,
    }

    impl OllamaClient {
        pub fn new(
            host: impl Into<String>,
            model: impl Into<String>,
            timeout_secs: u64,
        ) -> Result<Self, ChartError> {
            Ok(Self {
                host: host.into(),
                model: model.into(),
                client: build_client(timeout_secs)?,
            })
        }

        fn chat_url(&self) -> String {
            format!("{}/api/chat", self.host.trim_end_matches('/'))
        }
    }

    impl ExtractionClient for OllamaClient {
        fn extract(&self, prompt: &str, chart_type: ChartType) -> Result<Value, ChartError> {
            let url = self.chat_url();
            debug!(%url, model = %self.model, %chart_type, "prompting ollama");
            let request = json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": "" },
                    { "role": "user", "content": format_prompt(prompt, chart_type) }
                ],
                "stream": false
            });
            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .map_err(transport_error)?;
            let body = success_body(response)?;
            let chat: ChatResponse =
                serde_json::from_str(&body).map_err(|_| ChartError::MalformedResponse { raw: body })?;
            Ok(json!({ "response": chat.message.content }))
        }
    }

    /// Client for the backend selected in `config`.
    pub fn client_from_config(
        config: &ExtractionConfig,
    ) -> Result<Box<dyn ExtractionClient>, ChartError> {
        Ok(match config.backend {
            Backend::Proxy => Box::new(HttpExtractionClient::new(
                config.endpoint.clone(),
                config.timeout_secs,
            )?),
            Backend::Ollama => Box::new(OllamaClient::new(
                config.ollama_host.clone(),
                config.model.clone(),
                config.timeout_secs,
            )?),
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    impl ExtractionClient for Echo {
        fn extract(&self, prompt: &str, chart_type: ChartType) -> Result<Value, ChartError> {
            Ok(json!({ "prompt": prompt, "chartType": chart_type.as_str() }))
        }
    }

    #[test]
    fn boxed_and_borrowed_clients_forward() {
        let boxed: Box<dyn ExtractionClient> = Box::new(Echo);
        let value = boxed.extract("hi", ChartType::Pie).unwrap();
        assert_eq!(value["chartType"], "pie");
        let borrowed = &Echo;
        assert_eq!(borrowed.extract("x", ChartType::Flow).unwrap()["prompt"], "x");
    }
}
