//! Single-shot client: asks the service for the current quote and appends it
//! to a line-oriented local record.

use rust_decimal::Decimal;
use std::path::Path;
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::core::{Deadline, QuotePayload};
use crate::error::RequestError;

/// Budget for the whole service call. It exceeds the service's internal
/// worst case (200 ms fetch + 50 ms store), so a healthy pipeline fits
/// inside it; a narrower budget here would time out even when the service
/// succeeds.
pub const REQUEST_BUDGET: Duration = Duration::from_millis(300);

const RECORD_LABEL: &str = "Label";

/// Runs one request/record cycle.
///
/// Every failing stage is logged with its name and swallowed: the exit
/// status is the same whether the quote was recorded or not, so callers
/// must watch the logs rather than the exit code.
pub async fn run(config: &ClientConfig) -> anyhow::Result<()> {
    let deadline = Deadline::after(REQUEST_BUDGET);

    match fetch_and_record(config, deadline).await {
        Ok(value) => debug!(quote = %value, "quote recorded"),
        Err(err) => error!(error = %err, stage = err.stage(), "quote request failed"),
    }

    // Observational only: the record write above already happened or not.
    if deadline.is_elapsed() {
        info!("request cancelled by timeout");
    } else {
        info!("request processed");
    }
    Ok(())
}

async fn fetch_and_record(
    config: &ClientConfig,
    deadline: Deadline,
) -> Result<Decimal, RequestError> {
    let client = reqwest::Client::new();

    let request = async {
        let response = client
            .get(&config.service_url)
            .send()
            .await
            .map_err(RequestError::Transport)?;
        response.text().await.map_err(RequestError::Transport)
    };

    let body = match tokio::time::timeout_at(deadline.instant(), request).await {
        Ok(result) => result?,
        Err(_) => return Err(RequestError::Timeout),
    };

    let payload: QuotePayload =
        serde_json::from_str(&body).map_err(|e| RequestError::Parse(e.to_string()))?;

    append_record(&config.record_path, payload.quote).await?;
    Ok(payload.quote)
}

/// Appends one `Label: <value>` line, creating the file if needed. The line
/// goes out in a single write and is flushed before the handle drops, so a
/// record is never half-written.
async fn append_record(path: &Path, value: Decimal) -> Result<(), RequestError> {
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .await
        .map_err(RequestError::LocalWrite)?;

    let line = format!("{RECORD_LABEL}: {value}\n");
    file.write_all(line.as_bytes())
        .await
        .map_err(RequestError::LocalWrite)?;
    file.flush().await.map_err(RequestError::LocalWrite)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_service_mock(template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(url_path("/quote"))
            .respond_with(template)
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn config_for(mock_server: &MockServer, record_path: &Path) -> ClientConfig {
        ClientConfig {
            service_url: format!("{}/quote", mock_server.uri()),
            record_path: record_path.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_successful_run_appends_one_line() {
        let template = ResponseTemplate::new(200).set_body_string(r#"{"quote":"5.4321"}"#);
        let mock_server = create_service_mock(template).await;

        let dir = tempdir().unwrap();
        let record_path = dir.path().join("quotes.txt");
        run(&config_for(&mock_server, &record_path)).await.unwrap();

        assert_eq!(
            fs::read_to_string(&record_path).unwrap(),
            "Label: 5.4321\n"
        );
    }

    #[tokio::test]
    async fn test_repeated_runs_preserve_prior_lines() {
        let template = ResponseTemplate::new(200).set_body_string(r#"{"quote":"5.4321"}"#);
        let mock_server = create_service_mock(template).await;

        let dir = tempdir().unwrap();
        let record_path = dir.path().join("quotes.txt");
        fs::write(&record_path, "Label: 5.1234\n").unwrap();

        let config = config_for(&mock_server, &record_path);
        run(&config).await.unwrap();
        run(&config).await.unwrap();

        assert_eq!(
            fs::read_to_string(&record_path).unwrap(),
            "Label: 5.1234\nLabel: 5.4321\nLabel: 5.4321\n"
        );
    }

    #[tokio::test]
    async fn test_error_body_is_logged_not_recorded() {
        let template = ResponseTemplate::new(408).set_body_string("request cancelled by timeout");
        let mock_server = create_service_mock(template).await;

        let dir = tempdir().unwrap();
        let record_path = dir.path().join("quotes.txt");
        let result = run(&config_for(&mock_server, &record_path)).await;

        // The failure is swallowed; only the record file shows nothing came in.
        assert!(result.is_ok());
        assert!(!record_path.exists());
    }

    #[tokio::test]
    async fn test_slow_service_times_out_without_writing() {
        let template = ResponseTemplate::new(200)
            .set_body_string(r#"{"quote":"5.4321"}"#)
            .set_delay(Duration::from_millis(400));
        let mock_server = create_service_mock(template).await;

        let dir = tempdir().unwrap();
        let record_path = dir.path().join("quotes.txt");
        let result = run(&config_for(&mock_server, &record_path)).await;

        assert!(result.is_ok());
        assert!(!record_path.exists());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_swallowed() {
        let mock_server = MockServer::start().await;
        let dead_uri = mock_server.uri();
        drop(mock_server);

        let dir = tempdir().unwrap();
        let record_path = dir.path().join("quotes.txt");
        let config = ClientConfig {
            service_url: format!("{dead_uri}/quote"),
            record_path: record_path.clone(),
        };

        assert!(run(&config).await.is_ok());
        assert!(!record_path.exists());
    }
}
