use std::sync::Arc;

use arkres_config::Config;
use arkres_consts::consts;

use crate::{
    SyncError,
    asset::AssetBackend,
    download,
    extract::{AssetExtractor, ExtractReport},
    layout::DataLayout,
    manifest::{HotUpdateList, VersionInfo},
    materialize::{self, MaterializeReport},
    origin::{Endpoints, HttpOrigin, ResourceOrigin},
};

/// Mirrors the resources of the configured servers into the data root.
///
/// Every stage of a server runs to completion before the next one starts:
/// download, then unpacking into the bundle tree, then asset extraction.
pub struct ResourceSync {
    config: Config,
    layout: DataLayout,
    origin: Arc<dyn ResourceOrigin>,
    backend: Option<AssetBackend>,
}

impl ResourceSync {
    /// Creates a sync that talks to the official hosts.
    pub fn new(config: Config) -> Result<Self, SyncError> {
        let origin = HttpOrigin::new(&config)?;
        Ok(Self::with_origin(config, Arc::new(origin)))
    }

    pub fn with_origin(config: Config, origin: Arc<dyn ResourceOrigin>) -> Self {
        let layout = DataLayout::new(config.data_root());
        Self {
            config,
            layout,
            origin,
            backend: None,
        }
    }

    /// Sets the decoder used to extract assets, without one that stage is skipped.
    pub fn with_backend(self, backend: Option<AssetBackend>) -> Self {
        Self { backend, ..self }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    fn endpoints(&self, server: &str) -> Result<Endpoints, SyncError> {
        Endpoints::new(&self.config, server)
    }

    /// Asks the server for its latest resource version.
    pub async fn latest_version(&self, server: &str) -> Result<String, SyncError> {
        let endpoints = self.endpoints(server)?;
        let url = endpoints.version_url();
        let json = self.origin.fetch_text(url).await?;
        Ok(VersionInfo::from_json(url, &json)?.res_version)
    }

    /// The configured version override, or the latest version of the server.
    pub async fn resolve_version(&self, server: &str) -> Result<String, SyncError> {
        let version = match self.config.version_override() {
            Some(version) => version.to_string(),
            None => self.latest_version(server).await?,
        };
        tracing::info!(
            "Server {}: resource version {}",
            consts::SERVER_STYLE.apply_to(server),
            consts::VERSION_STYLE.apply_to(&version)
        );
        Ok(version)
    }

    pub async fn manifest(&self, server: &str, version: &str) -> Result<HotUpdateList, SyncError> {
        let endpoints = self.endpoints(server)?;
        HotUpdateList::load_or_fetch(
            self.origin.as_ref(),
            &endpoints,
            &self.layout,
            server,
            version,
        )
        .await
    }

    /// Fetches the blobs of `version` that are not stored yet.
    pub async fn download_files(&self, server: &str, version: &str) -> Result<usize, SyncError> {
        let manifest = self.manifest(server, version).await?;
        download::download_blobs(
            self.origin.clone(),
            self.endpoints(server)?,
            &self.layout,
            version,
            &manifest.ab_infos,
            self.config.workers(),
        )
        .await
    }

    /// Unpacks the stored blobs of `version` into the bundle tree.
    pub async fn extract_files(
        &self,
        server: &str,
        version: &str,
    ) -> Result<MaterializeReport, SyncError> {
        let manifest = self.manifest(server, version).await?;
        let layout = self.layout.clone();
        let server = server.to_string();
        tokio::task::spawn_blocking(move || {
            materialize::materialize_bundles(&layout, &server, &manifest.ab_infos)
        })
        .await
        .map_err(|source| SyncError::WorkerPanicked {
            stage: "unpack",
            source,
        })?
    }

    /// Extracts the assets of the bundle tree. Returns `None` when there is
    /// no asset backend to decode bundles with.
    pub async fn extract_assets(&self, server: &str) -> Result<Option<ExtractReport>, SyncError> {
        let Some(backend) = self.backend.clone() else {
            tracing::warn!(
                "No asset decoder available, skipping asset extraction for {}",
                consts::SERVER_STYLE.apply_to(server)
            );
            return Ok(None);
        };

        let report = AssetExtractor::new(
            &self.layout,
            server,
            self.config.server_settings(server),
            backend,
        )
        .with_convert_audio(self.config.convert_audio())
        .with_verbose(self.config.verbose_export())
        .run(self.config.workers())
        .await?;

        tracing::info!(
            "{}: extracted {}, excluded {}, up to date {}",
            consts::SERVER_STYLE.apply_to(server),
            report.extracted,
            report.excluded,
            report.skipped
        );
        Ok(Some(report))
    }

    /// Runs every stage for one server.
    pub async fn sync_server(&self, server: &str) -> Result<(), SyncError> {
        let version = self.resolve_version(server).await?;

        tracing::info!("{}", consts::STAGE_STYLE.apply_to("Downloading resources"));
        let fetched = self.download_files(server, &version).await?;
        tracing::info!("Fetched {fetched} blobs");

        tracing::info!("{}", consts::STAGE_STYLE.apply_to("Unpacking bundles"));
        let report = self.extract_files(server, &version).await?;
        tracing::info!(
            "Unpacked {} files, {} up to date",
            report.written,
            report.skipped
        );

        tracing::info!("{}", consts::STAGE_STYLE.apply_to("Extracting assets"));
        self.extract_assets(server).await?;
        Ok(())
    }

    /// Runs every stage for every configured server, in order.
    pub async fn sync(&self) -> Result<(), SyncError> {
        tracing::info!("Data root: {}", self.layout.root().display());
        for server in self.config.servers() {
            self.sync_server(server).await?;
        }
        Ok(())
    }
}
