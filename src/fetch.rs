use std::time::Duration;

use crate::calendar::aggregate::FeedFetcher;
use crate::error::DashError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches ICS feeds over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, DashError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("dashcal/{}", env!("CARGO_PKG_VERSION")))
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| DashError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

/// `webcal://` is plain HTTPS as far as fetching goes.
pub fn normalize_feed_url(url: &str) -> String {
    match url.strip_prefix("webcal://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

impl FeedFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, DashError> {
        let fetch_err = |reason: String| DashError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .http
            .get(normalize_feed_url(url))
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_err(format!("HTTP {}", response.status())));
        }

        response.text().await.map_err(|e| fetch_err(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webcal_urls_become_https() {
        assert_eq!(
            normalize_feed_url("webcal://example.com/basic.ics"),
            "https://example.com/basic.ics"
        );
        assert_eq!(
            normalize_feed_url("https://example.com/basic.ics"),
            "https://example.com/basic.ics"
        );
    }
}
