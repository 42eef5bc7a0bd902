//! Paths of everything the pipeline persists below the data root.

use std::path::{Path, PathBuf};

use arkres_consts::consts;

use crate::{SyncError, manifest::BundleDescriptor};

/// The on-disk layout of a data root:
///
/// - `raw/{digest[0:2]}/{digest[2:4]}/{digest}` content-addressed blobs
/// - `{server}/{version}/hot_update_list.json` cached manifests
/// - `{server}/bundles/...` the materialized bundle tree
/// - `{server}/assets/...` extracted assets, one directory per bundle
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The content-addressed location of a bundle's raw blob. Two bundles with
    /// the same digest always share one blob.
    pub fn raw_blob_path(&self, bundle: &BundleDescriptor) -> Result<PathBuf, SyncError> {
        let digest = bundle.content_digest();
        if digest.len() < 4 || !digest.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(SyncError::InvalidDigest {
                name: bundle.name.clone(),
                digest: digest.to_string(),
            });
        }

        Ok(self
            .root
            .join(consts::RAW_DIR)
            .join(&digest[0..2])
            .join(&digest[2..4])
            .join(digest))
    }

    pub fn manifest_path(&self, server: &str, version: &str) -> PathBuf {
        self.root
            .join(server)
            .join(version)
            .join(consts::HOT_UPDATE_LIST)
    }

    pub fn bundles_dir(&self, server: &str) -> PathBuf {
        self.root.join(server).join(consts::BUNDLES_DIR)
    }

    pub fn assets_dir(&self, server: &str) -> PathBuf {
        self.root.join(server).join(consts::ASSETS_DIR)
    }
}
