//! Where page HTML comes from.

use async_trait::async_trait;
use tracing::info;

use crate::EngineError;

/// The raw state of a page at one moment.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
}

/// A page that can be captured, possibly more than once while its content
/// settles.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn capture(&self) -> Result<PageSnapshot, EngineError>;
}

/// HTML already in hand.
pub struct StaticPage {
    snapshot: PageSnapshot,
}

impl StaticPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            snapshot: PageSnapshot {
                url: url.into(),
                html: html.into(),
            },
        }
    }
}

#[async_trait]
impl PageSource for StaticPage {
    async fn capture(&self) -> Result<PageSnapshot, EngineError> {
        Ok(self.snapshot.clone())
    }
}

/// A live page fetched over HTTP on every capture.
pub struct HttpPage {
    client: reqwest::Client,
    url: String,
}

impl HttpPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl PageSource for HttpPage {
    async fn capture(&self) -> Result<PageSnapshot, EngineError> {
        info!(url = %self.url, "fetching page");
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(EngineError::Fetch {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        // Redirects land on the final URL, which is what gets classified.
        let url = resp.url().to_string();
        let html = resp.text().await?;
        Ok(PageSnapshot { url, html })
    }
}
