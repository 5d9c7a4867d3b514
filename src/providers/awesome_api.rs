use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::{Deadline, Quote, RateProvider};
use crate::error::FetchError;

// AwesomeApiProvider implementation for RateProvider
//
// The endpoint answers `GET {base_url}/json/last/{pair}` (pair written as
// `USD-BRL`) with an object keyed by the concatenated pair code:
// `{"USDBRL":{"bid":"5.4321", ...}}`.
pub struct AwesomeApiProvider {
    base_url: String,
    client: reqwest::Client,
}

impl AwesomeApiProvider {
    pub fn new(base_url: &str) -> Self {
        AwesomeApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            // One pooled client shared by all concurrent fetches.
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PairQuote {
    bid: String,
}

#[async_trait]
impl RateProvider for AwesomeApiProvider {
    #[instrument(
        name = "UpstreamFetch",
        skip(self, deadline),
        fields(pair = %pair)
    )]
    async fn fetch(&self, pair: &str, deadline: Deadline) -> Result<Quote, FetchError> {
        let url = format!("{}/json/last/{}", self.base_url, pair);
        let key: String = pair.chars().filter(|c| *c != '-').collect();
        debug!("Requesting rate from {}", url);

        let fetch = async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(FetchError::Transport)?;

            let body = response.text().await.map_err(FetchError::Transport)?;

            let rates: HashMap<String, PairQuote> = serde_json::from_str(&body)
                .map_err(|e| FetchError::Parse(format!("malformed rate response: {e}")))?;

            let pair_quote = rates
                .get(&key)
                .ok_or_else(|| FetchError::Parse(format!("pair '{key}' missing from response")))?;

            Ok(Quote::parse(&pair_quote.bid)?)
        };

        // Expiry drops the in-flight request instead of letting it run to
        // completion unobserved.
        match tokio::time::timeout_at(deadline.instant(), fetch).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(pair: &str, template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/json/last/{pair}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(template)
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn generous_deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_response = r#"{"USDBRL":{"code":"USD","codein":"BRL","bid":"5.4321","ask":"5.4378"}}"#;
        let template = ResponseTemplate::new(200).set_body_string(mock_response);
        let mock_server = create_mock_server("USD-BRL", template).await;

        let provider = AwesomeApiProvider::new(&mock_server.uri());
        let quote = provider
            .fetch("USD-BRL", generous_deadline())
            .await
            .unwrap();

        assert_eq!(quote.to_string(), "5.4321");
    }

    #[tokio::test]
    async fn test_missing_pair_key_is_a_parse_error() {
        let mock_response = r#"{"EURUSD":{"bid":"1.0831"}}"#;
        let template = ResponseTemplate::new(200).set_body_string(mock_response);
        let mock_server = create_mock_server("USD-BRL", template).await;

        let provider = AwesomeApiProvider::new(&mock_server.uri());
        let result = provider.fetch("USD-BRL", generous_deadline()).await;

        assert!(matches!(result, Err(FetchError::Parse(_))));
        assert_eq!(
            result.unwrap_err().to_string(),
            "upstream response parse error: pair 'USDBRL' missing from response"
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_parse_error() {
        let template = ResponseTemplate::new(200).set_body_string("not json at all");
        let mock_server = create_mock_server("USD-BRL", template).await;

        let provider = AwesomeApiProvider::new(&mock_server.uri());
        let result = provider.fetch("USD-BRL", generous_deadline()).await;

        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_non_numeric_bid_is_a_parse_error() {
        let mock_response = r#"{"USDBRL":{"bid":"n/a"}}"#;
        let template = ResponseTemplate::new(200).set_body_string(mock_response);
        let mock_server = create_mock_server("USD-BRL", template).await;

        let provider = AwesomeApiProvider::new(&mock_server.uri());
        let result = provider.fetch("USD-BRL", generous_deadline()).await;

        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_slow_upstream_is_a_timeout() {
        let mock_response = r#"{"USDBRL":{"bid":"5.4321"}}"#;
        let template = ResponseTemplate::new(200)
            .set_body_string(mock_response)
            .set_delay(Duration::from_millis(250));
        let mock_server = create_mock_server("USD-BRL", template).await;

        let provider = AwesomeApiProvider::new(&mock_server.uri());
        let result = provider
            .fetch("USD-BRL", Deadline::after(Duration::from_millis(50)))
            .await;

        assert!(matches!(result, Err(FetchError::Timeout)));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_a_transport_error() {
        let mock_server = MockServer::start().await;
        let dead_url = mock_server.uri();
        drop(mock_server); // Frees the port so the connection is refused.

        let provider = AwesomeApiProvider::new(&dead_url);
        let result = provider.fetch("USD-BRL", generous_deadline()).await;

        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
