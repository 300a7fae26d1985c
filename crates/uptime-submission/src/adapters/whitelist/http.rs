use super::parse_whitelist;
use crate::domain::{Whitelist, WhitelistError};
use crate::ports::WhitelistSource;
use async_trait::async_trait;
use std::time::Duration;

/// Whitelist fetched over HTTP, e.g. the CSV export of a shared sheet.
pub struct HttpWhitelistSource {
    client: reqwest::Client,
    url: String,
}

impl HttpWhitelistSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, WhitelistError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WhitelistError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl WhitelistSource for HttpWhitelistSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Whitelist, WhitelistError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| WhitelistError::Transport(e.to_string()))?;

        let text = response
            .text()
            .await
            .map_err(|e| WhitelistError::Parse(e.to_string()))?;
        parse_whitelist(&text)
    }
}
