//! Source download over HTTP(S) or from the local filesystem.

use reqwest::{Client, Url};
use toolsmith_core::{Error, Result};
use tracing::debug;

/// Downloads tool sources into memory.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Create a fetcher with the toolsmith user agent.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("toolsmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Fetch the bytes behind `url` on behalf of `tool`.
    ///
    /// `file://` URLs are read from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Download`] on transport failures and non-success
    /// HTTP statuses.
    pub async fn fetch(&self, tool: &str, url: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(url)
            .map_err(|e| Error::download(tool, url, format!("invalid URL: {e}")))?;

        if parsed.scheme() == "file" {
            let path = parsed
                .to_file_path()
                .map_err(|()| Error::download(tool, url, "not a local path"))?;
            debug!(tool, path = %path.display(), "Reading local source");
            return tokio::fs::read(&path)
                .await
                .map_err(|e| Error::download(tool, url, e.to_string()));
        }

        debug!(tool, url, "Downloading source");
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| Error::download(tool, url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::download(
                tool,
                url,
                format!("HTTP {}", response.status()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::download(tool, url, format!("failed to read body: {e}")))?;
        Ok(bytes.to_vec())
    }
}
