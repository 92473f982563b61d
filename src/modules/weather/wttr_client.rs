use std::fmt;

use crate::core::config::WeatherConfig;

/// Outcome of a weather lookup. Both variants are plain text for the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherResult {
    Report(String),
    Error(String),
}

impl WeatherResult {
    pub fn is_error(&self) -> bool {
        matches!(self, WeatherResult::Error(_))
    }

    pub fn into_text(self) -> String {
        match self {
            WeatherResult::Report(text) | WeatherResult::Error(text) => text,
        }
    }
}

impl fmt::Display for WeatherResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherResult::Report(text) | WeatherResult::Error(text) => f.write_str(text),
        }
    }
}

/// Client for the wttr.in one-line text format
#[derive(Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent("curl/8.0 (mcp-agent-core)")
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Location is inserted into the path as given
    pub fn url_for(&self, location: &str) -> String {
        format!("{}/{}?format=3", self.base_url, location)
    }

    pub async fn fetch(&self, location: &str) -> WeatherResult {
        let url = self.url_for(location);
        tracing::info!("Calling Weather API for location: {}", location);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return execution_error(e),
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let message = format!("Weather API error: {}", status.as_u16());
            tracing::warn!("{}", message);
            return WeatherResult::Error(message);
        }

        match response.text().await {
            Ok(body) => {
                tracing::info!("Weather API response: {}", body.trim_end());
                WeatherResult::Report(body)
            }
            Err(e) => execution_error(e),
        }
    }
}

fn execution_error(e: reqwest::Error) -> WeatherResult {
    let message = format!("Weather API Execution Error: {}", e);
    tracing::warn!("{}", message);
    WeatherResult::Error(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, routing::get, Router};
    use std::time::Duration;

    async fn spawn_weather_server() -> String {
        async fn report(Path(location): Path<String>) -> (StatusCode, String) {
            match location.as_str() {
                "Nowhere" => (StatusCode::NOT_FOUND, "Unknown location".to_string()),
                "Slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    (StatusCode::OK, "too late".to_string())
                }
                _ => (StatusCode::OK, format!("{}: ☀️ +21°C\n", location)),
            }
        }

        let app = Router::new().route("/{location}", get(report));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String, timeout_secs: u64) -> WeatherClient {
        WeatherClient::new(&WeatherConfig {
            base_url,
            timeout_secs,
        })
        .unwrap()
    }

    #[test]
    fn test_url_uses_compact_format() {
        let client = client_for("http://wttr.in".to_string(), 10);
        assert_eq!(client.url_for("Miami"), "http://wttr.in/Miami?format=3");
    }

    #[tokio::test]
    async fn test_ok_returns_body_verbatim() {
        let client = client_for(spawn_weather_server().await, 5);

        let result = client.fetch("Miami").await;

        assert_eq!(result, WeatherResult::Report("Miami: ☀️ +21°C\n".to_string()));
    }

    #[tokio::test]
    async fn test_non_ok_status_reported() {
        let client = client_for(spawn_weather_server().await, 5);

        let result = client.fetch("Nowhere").await;

        assert!(result.is_error());
        assert_eq!(result.to_string(), "Weather API error: 404");
    }

    #[tokio::test]
    async fn test_unreachable_host_reported_as_execution_error() {
        let client = client_for("http://127.0.0.1:1".to_string(), 5);

        let text = client.fetch("Miami").await.into_text();

        assert!(text.starts_with("Weather API Execution Error:"));
    }

    #[tokio::test]
    async fn test_timeout_reported_as_execution_error() {
        let client = client_for(spawn_weather_server().await, 1);

        let result = client.fetch("Slow").await;

        assert!(result.to_string().contains("Weather API Execution Error"));
    }
}
