//! The documents a resource server publishes for each version.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    SyncError,
    layout::DataLayout,
    origin::{Endpoints, ResourceOrigin},
    util::atomic_write,
};

/// Response of the version endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub res_version: String,
}

/// The manifest of one resource version.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HotUpdateList {
    #[serde(default)]
    pub version_id: String,
    #[serde(default)]
    pub ab_infos: Vec<BundleDescriptor>,
}

/// A single bundle listed in a [`HotUpdateList`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BundleDescriptor {
    /// Logical path of the bundle, e.g. `gamedata/excel/item_table.ab`.
    pub name: String,
    #[serde(default)]
    pub hash: String,
    /// Digest of the packed blob, used as its storage key.
    pub md5: String,
    #[serde(default)]
    pub total_size: u64,
    #[serde(default)]
    pub ab_size: u64,
}

impl BundleDescriptor {
    pub fn content_digest(&self) -> &str {
        &self.md5
    }
}

impl VersionInfo {
    pub fn from_json(url: &url::Url, json: &str) -> Result<Self, SyncError> {
        serde_json::from_str(json).map_err(|source| SyncError::InvalidJson {
            path: url.as_str().into(),
            source,
        })
    }
}

impl HotUpdateList {
    pub fn from_slice(path: &Path, bytes: &[u8]) -> Result<Self, SyncError> {
        serde_json::from_slice(bytes).map_err(|source| SyncError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads the manifest of `version` from disk, fetching it first when it
    /// is not cached yet. A cached manifest is never refreshed.
    pub async fn load_or_fetch(
        origin: &dyn ResourceOrigin,
        endpoints: &Endpoints,
        layout: &DataLayout,
        server: &str,
        version: &str,
    ) -> Result<Self, SyncError> {
        let path = layout.manifest_path(server, version);
        match fs_err::tokio::read(&path).await {
            Ok(bytes) => return Self::from_slice(&path, &bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let url = endpoints.manifest_url(version)?;
        tracing::debug!("fetching manifest {url}");
        let bytes = origin.fetch_bytes(&url).await?;

        // Only a manifest that parses is cached.
        let manifest = Self::from_slice(&path, &bytes)?;
        if let Some(parent) = path.parent() {
            fs_err::tokio::create_dir_all(parent).await?;
        }
        atomic_write(&path, &bytes).await?;

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hot_update_list() {
        let json = r#"{
            "versionId": "24-05-01-10-00-00-a1b2c3",
            "abInfos": [
                {"name": "gamedata/excel/item_table.ab", "hash": "h1", "md5": "0011aabb", "totalSize": 10, "abSize": 8, "type": "x"},
                {"name": "avg/bg.ab", "md5": "2233ccdd"}
            ],
            "packInfos": []
        }"#;
        let list = HotUpdateList::from_slice(Path::new("hot_update_list.json"), json.as_bytes())
            .unwrap();
        assert_eq!(list.version_id, "24-05-01-10-00-00-a1b2c3");
        assert_eq!(list.ab_infos.len(), 2);
        assert_eq!(list.ab_infos[0].content_digest(), "0011aabb");
        assert_eq!(list.ab_infos[0].total_size, 10);
        assert_eq!(list.ab_infos[1].ab_size, 0);
        assert_eq!(list.ab_infos[1].hash, "");
    }

    #[test]
    fn test_parse_version_info() {
        let url = url::Url::parse("https://example.org/version").unwrap();
        let info =
            VersionInfo::from_json(&url, r#"{"resVersion": "24-05-01", "clientVersion": "2.2.1"}"#)
                .unwrap();
        assert_eq!(info.res_version, "24-05-01");
    }

    #[test]
    fn test_invalid_manifest_reports_path() {
        let err = HotUpdateList::from_slice(Path::new("/data/cn/v1/hot_update_list.json"), b"{")
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidJson { path, .. } if path.ends_with("hot_update_list.json")));
    }
}
