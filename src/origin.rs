//! The remote side of the pipeline: where versions, manifests and blobs come from.

use std::time::Duration;

use arkres_config::Config;
use arkres_consts::consts;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    Client,
    header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue},
};
use url::Url;

use crate::SyncError;

/// Something that serves the files of a resource server.
///
/// The pipeline only ever performs plain GET requests, so the origin is
/// reduced to fetching the body of a URL.
#[async_trait]
pub trait ResourceOrigin: Send + Sync {
    /// Fetches the body of `url`.
    async fn fetch_bytes(&self, url: &Url) -> Result<Bytes, SyncError>;

    /// Fetches the body of `url` as UTF-8 text.
    async fn fetch_text(&self, url: &Url) -> Result<String, SyncError> {
        let bytes = self.fetch_bytes(url).await?;
        String::from_utf8(bytes.to_vec()).map_err(|source| SyncError::InvalidUtf8 {
            url: url.clone(),
            source,
        })
    }
}

/// A [`ResourceOrigin`] that talks to the official asset hosts over HTTP(S),
/// presenting itself like the game client does.
#[derive(Clone)]
pub struct HttpOrigin {
    client: Client,
}

impl HttpOrigin {
    pub fn new(config: &Config) -> Result<Self, SyncError> {
        let header = |value: &str| {
            HeaderValue::from_str(value).map_err(|_| SyncError::InvalidHeader(value.to_string()))
        };

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-us"));
        headers.insert(
            HeaderName::from_static("x-unity-version"),
            header(config.unity_version())?,
        );

        let timeout = 5 * 60;
        let client = Client::builder()
            .pool_max_idle_per_host(20)
            .user_agent(header(config.user_agent())?)
            .default_headers(headers)
            .read_timeout(Duration::from_secs(timeout))
            .build()
            .map_err(SyncError::HttpClient)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ResourceOrigin for HttpOrigin {
    async fn fetch_bytes(&self, url: &Url) -> Result<Bytes, SyncError> {
        let fetch_error = |source| SyncError::Fetch {
            url: url.clone(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(fetch_error)?;

        if !response.status().is_success() {
            return Err(SyncError::HttpStatus {
                url: url.clone(),
                status: response.status(),
            });
        }

        response.bytes().await.map_err(fetch_error)
    }
}

/// The URLs of one server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
    version: Url,
}

impl Endpoints {
    /// Resolves the endpoints of `server` from its configured or built-in host.
    pub fn new(config: &Config, server: &str) -> Result<Self, SyncError> {
        let host = config
            .server_host(server)
            .ok_or_else(|| SyncError::UnknownServer(server.to_string()))?;
        let platform = config.platform();

        let base = Url::parse(&format!(
            "https://{host}/assetbundle/official/{platform}/"
        ))?;
        let version = if server == consts::CN_SERVER && config.server_hosts.get(server).is_none() {
            Url::parse(&format!(
                "https://{}/config/prod/official/{platform}/version",
                consts::CN_VERSION_HOST
            ))?
        } else {
            base.join("version")?
        };

        Ok(Self { base, version })
    }

    /// The endpoint that reports the latest resource version.
    pub fn version_url(&self) -> &Url {
        &self.version
    }

    pub fn manifest_url(&self, version: &str) -> Result<Url, SyncError> {
        self.asset_url(version, consts::HOT_UPDATE_LIST)
    }

    /// The URL of a blob, `request_name` must already be escaped.
    pub fn asset_url(&self, version: &str, request_name: &str) -> Result<Url, SyncError> {
        Ok(self.base.join(&format!("assets/{version}/{request_name}"))?)
    }
}
