//! Asset fetching using Tokio and Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    fetch::AssetFetcher,
};
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Desktop asset fetcher.
///
/// Resolves source references in two ways:
/// - `http://` / `https://` URLs are downloaded with `reqwest`
/// - everything else is a path relative to the asset root (a leading `./` is
///   ignored), read with `tokio::fs`
pub struct DesktopAssetFetcher {
    root: PathBuf,
    client: Client,
}

impl DesktopAssetFetcher {
    /// Create a fetcher rooted at `root` with a 30 second download timeout.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_timeout(root, Duration::from_secs(30))
    }

    /// Create a fetcher with a custom download timeout.
    pub fn with_timeout(root: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("sun-narrator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::OperationFailed(format!("http client: {e}")))?;

        Ok(Self {
            root: root.into(),
            client,
        })
    }

    /// Directory that relative sources are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_remote(source: &str) -> bool {
        source.starts_with("http://") || source.starts_with("https://")
    }

    fn resolve(&self, source: &str) -> PathBuf {
        let relative = source.trim_start_matches("./");
        self.root.join(relative)
    }

    async fn read_local(&self, source: &str) -> Result<Bytes> {
        let path = self.resolve(source);
        debug!(path = %path.display(), "Reading narration asset");

        match core_async::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BridgeError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        debug!(url, "Downloading narration asset");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BridgeError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(BridgeError::OperationFailed(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))
    }
}

#[async_trait]
impl AssetFetcher for DesktopAssetFetcher {
    async fn fetch(&self, source: &str) -> Result<Bytes> {
        if Self::is_remote(source) {
            self.download(source).await
        } else {
            self.read_local(source).await
        }
    }
}
