//! Test doubles for the network and the bundle decoder, and a builder for a
//! small resource server.

#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use arkres::{
    AssetBackend, AudioConverter, BundleLoader, ImageEncoder, ResourceSync, SyncError,
    asset::{AssetObject, LoadError, LoadedFile, ObjectData},
    download::request_name,
    manifest::{BundleDescriptor, HotUpdateList},
    origin::ResourceOrigin,
};
use arkres_config::Config;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tempfile::TempDir;
use url::Url;
use zip::{ZipWriter, write::SimpleFileOptions};

pub const SERVER: &str = "test";
pub const HOST: &str = "assets.example.org";
pub const VERSION: &str = "24-05-01-10-00-00-a1b2c3";

/// Something the test doubles observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Fetch(String),
    Load {
        bundle: String,
        /// Whether every bundle of the manifest was on disk at that time.
        tree_complete: bool,
    },
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// Serves canned responses and records every request.
pub struct FakeServer {
    routes: HashMap<String, Bytes>,
    events: EventLog,
}

pub fn base_url() -> String {
    format!("https://{HOST}/assetbundle/official/IOS/")
}

#[async_trait]
impl ResourceOrigin for FakeServer {
    async fn fetch_bytes(&self, url: &Url) -> Result<Bytes, SyncError> {
        self.events.lock().push(Event::Fetch(url.to_string()));
        self.routes
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| SyncError::HttpStatus {
                url: url.clone(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
    }
}

/// Decodes bundles into canned objects, keyed by the bundle's path in the tree.
pub struct FakeDecoder {
    bundles_root: PathBuf,
    objects: HashMap<String, Vec<AssetObject>>,
    expected: Vec<PathBuf>,
    events: EventLog,
}

impl BundleLoader for FakeDecoder {
    fn load_bundle(&self, path: &Path) -> Result<Vec<LoadedFile>, LoadError> {
        let relative = path
            .strip_prefix(&self.bundles_root)
            .map_err(|e| LoadError::Malformed(e.to_string()))?
            .to_string_lossy()
            .replace('\\', "/");
        let tree_complete = self.expected.iter().all(|path| path.is_file());
        self.events.lock().push(Event::Load {
            bundle: relative.clone(),
            tree_complete,
        });

        let objects = self
            .objects
            .get(&relative)
            .cloned()
            .ok_or_else(|| LoadError::Malformed(format!("no objects for {relative}")))?;
        Ok(vec![LoadedFile {
            name: format!("CAB-{relative}"),
            objects,
        }])
    }
}

/// Images "encode" to their raw pixel data.
pub struct RawImages;

impl ImageEncoder for RawImages {
    fn encode_png(&self, object: &AssetObject) -> Option<Vec<u8>> {
        match &object.data {
            ObjectData::Texture2D { image_data, .. } => Some(image_data.clone()),
            _ => None,
        }
    }
}

pub struct NoAudio;

impl AudioConverter for NoAudio {
    fn is_supported(&self, _object: &AssetObject) -> bool {
        false
    }

    fn native_extension(&self, _object: &AssetObject) -> String {
        ".ogg".to_string()
    }

    fn to_wav(&self, _object: &AssetObject) -> Option<Vec<u8>> {
        None
    }
}

/// Builds a resource server with a single version.
pub struct ServerBuilder {
    pub dir: TempDir,
    pub events: EventLog,
    routes: HashMap<String, Bytes>,
    manifest: HotUpdateList,
    objects: HashMap<String, Vec<AssetObject>>,
    decrypt_keys: Option<(String, String)>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        let mut routes = HashMap::new();
        routes.insert(
            format!("{}version", base_url()),
            Bytes::from(format!(r#"{{"resVersion": "{VERSION}"}}"#)),
        );
        Self {
            dir: tempfile::tempdir().unwrap(),
            events: EventLog::default(),
            routes,
            manifest: HotUpdateList {
                version_id: VERSION.to_string(),
                ab_infos: Vec::new(),
            },
            objects: HashMap::new(),
            decrypt_keys: None,
        }
    }

    fn descriptor(name: &str, md5: &str) -> BundleDescriptor {
        BundleDescriptor {
            name: name.to_string(),
            hash: format!("hash-of-{name}"),
            md5: md5.to_string(),
            total_size: 0,
            ab_size: 0,
        }
    }

    /// Adds a bundle whose blob is a zip with the bundle as its only entry.
    pub fn bundle(mut self, name: &str, md5: &str, objects: Vec<AssetObject>) -> Self {
        let mut blob = Vec::new();
        let mut zip = ZipWriter::new(std::io::Cursor::new(&mut blob));
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(format!("serialized {name}").as_bytes())
            .unwrap();
        zip.finish().unwrap();

        self.routes.insert(
            format!("{}assets/{VERSION}/{}", base_url(), request_name(name)),
            Bytes::from(blob),
        );
        self.manifest.ab_infos.push(Self::descriptor(name, md5));
        self.objects.insert(name.to_string(), objects);
        self
    }

    /// Adds a manifest entry that shares its blob with an earlier bundle.
    pub fn alias(mut self, name: &str, md5: &str) -> Self {
        self.manifest.ab_infos.push(Self::descriptor(name, md5));
        self
    }

    /// Adds a manifest entry the server fails to deliver.
    pub fn missing(mut self, name: &str, md5: &str) -> Self {
        self.manifest.ab_infos.push(Self::descriptor(name, md5));
        self
    }

    pub fn decrypt_keys(mut self, key: &str, iv_mask: &str) -> Self {
        self.decrypt_keys = Some((key.to_string(), iv_mask.to_string()));
        self
    }

    pub fn data_root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> Config {
        let mut config = Config {
            servers: vec![SERVER.to_string()],
            data_root: Some(self.data_root().to_path_buf()),
            workers: Some(4),
            server_hosts: BTreeMap::from([(SERVER.to_string(), HOST.to_string())]),
            ..Default::default()
        };
        if let Some((key, iv_mask)) = &self.decrypt_keys {
            config
                .decrypt_keys
                .insert(SERVER.to_string(), vec![key.clone(), iv_mask.clone()]);
        }
        config
    }

    /// A sync against this server, with the fake decoder when `with_backend` is set.
    pub fn sync(&self, config: Config, with_backend: bool) -> ResourceSync {
        let mut routes = self.routes.clone();
        routes.insert(
            format!("{}assets/{VERSION}/hot_update_list.json", base_url()),
            Bytes::from(serde_json::to_vec(&self.manifest).unwrap()),
        );
        let server = FakeServer {
            routes,
            events: self.events.clone(),
        };

        let bundles_root = self.data_root().join(SERVER).join("bundles");
        let expected = self
            .objects
            .keys()
            .map(|name| bundles_root.join(name))
            .collect();
        let backend = with_backend.then(|| {
            AssetBackend::new(
                FakeDecoder {
                    bundles_root,
                    objects: self.objects.clone(),
                    expected,
                    events: self.events.clone(),
                },
                RawImages,
                NoAudio,
            )
        });

        ResourceSync::with_origin(config, Arc::new(server)).with_backend(backend)
    }

    pub fn take_events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }
}

pub fn texture(path_id: i64, name: &str) -> AssetObject {
    AssetObject {
        path_id,
        name: name.to_string(),
        data: ObjectData::Texture2D {
            width: 4,
            height: 4,
            format: 4,
            image_data: format!("pixels of {name} {path_id}").into_bytes(),
        },
    }
}

pub fn text(path_id: i64, name: &str, script: impl Into<Vec<u8>>) -> AssetObject {
    AssetObject {
        path_id,
        name: name.to_string(),
        data: ObjectData::TextAsset {
            script: script.into(),
        },
    }
}

/// Every file below `root` with its contents, keyed by relative path.
pub fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, files: &mut BTreeMap<String, Vec<u8>>) {
        for entry in fs_err::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, files);
            } else {
                let relative = path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/");
                files.insert(relative, fs_err::read(&path).unwrap());
            }
        }
    }

    let mut files = BTreeMap::new();
    walk(root, root, &mut files);
    files
}

/// Sets the modification time of every raw blob.
pub fn set_blob_times(data_root: &Path, time: filetime::FileTime) {
    for relative in snapshot(&data_root.join("raw")).keys() {
        filetime::set_file_mtime(data_root.join("raw").join(relative), time).unwrap();
    }
}
