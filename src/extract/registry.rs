use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use arkres_config::DecryptKeys;
use filetime::FileTime;

use super::handlers;
use crate::{
    SyncError,
    asset::{AssetBackend, AssetObject, ObjectKind},
};

/// Everything a handler needs to know about the bundle it is working on.
#[derive(Debug, Clone)]
pub struct HandlingContext<'a> {
    /// Output directory of the bundle.
    pub directory: PathBuf,
    /// Path of the bundle relative to the bundle tree, `/` separated.
    pub bundle_path: String,
    /// Modification time of the bundle file, given to every written file.
    pub bundle_time: FileTime,
    pub decrypt: Option<&'a DecryptKeys>,
    pub convert_audio: bool,
    pub backend: &'a AssetBackend,
}

impl HandlingContext<'_> {
    pub fn is_gamedata(&self) -> bool {
        self.bundle_path.starts_with(arkres_consts::consts::GAMEDATA_ROOT)
    }

    /// The top-level directory below `gamedata`, empty outside of it.
    pub fn gamedata_dir(&self) -> &str {
        if !self.is_gamedata() {
            return "";
        }
        self.bundle_path.split('/').nth(1).unwrap_or_default()
    }
}

/// Per object overrides of the output name, decided by the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    pub name: Option<String>,
    /// Extension including its dot.
    pub extension: Option<String>,
}

impl ExtractOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            extension: None,
        }
    }

    /// The output path of an object, the options take precedence over the
    /// given defaults.
    pub fn output_path(&self, directory: &Path, name: &str, extension: &str) -> PathBuf {
        output_path(
            directory,
            self.name.as_deref().unwrap_or(name),
            self.extension.as_deref().unwrap_or(extension),
        )
    }
}

/// `{directory}/{name}{extension}` with path separators in `name` flattened.
pub fn output_path(directory: &Path, name: &str, extension: &str) -> PathBuf {
    let name = name.replace(['/', '\\'], "_");
    directory.join(format!("{name}{extension}"))
}

/// Writes the file(s) of one object.
pub type Handler = fn(&AssetObject, &HandlingContext<'_>, &ExtractOptions) -> Result<(), SyncError>;

const HANDLERS: &[(ObjectKind, Handler)] = &[
    (ObjectKind::Texture2D, handlers::texture),
    (ObjectKind::Sprite, handlers::sprite),
    (ObjectKind::AudioClip, handlers::audio_clip),
    (ObjectKind::TextAsset, handlers::text_asset),
];

/// Dispatches objects to the handler of their kind.
pub struct HandlerRegistry {
    handlers: HashMap<ObjectKind, Handler>,
}

impl HandlerRegistry {
    fn from_table(table: &[(ObjectKind, Handler)]) -> Self {
        let mut handlers = HashMap::new();
        for (kind, handler) in table {
            if !kind.is_concrete() {
                continue;
            }
            tracing::debug!("Add asset handler for: {kind}");
            handlers.insert(*kind, *handler);
        }
        Self { handlers }
    }

    /// The registry with all built-in handlers.
    pub fn builtin() -> &'static HandlerRegistry {
        static REGISTRY: LazyLock<HandlerRegistry> =
            LazyLock::new(|| HandlerRegistry::from_table(HANDLERS));
        &REGISTRY
    }

    pub fn handles(&self, kind: ObjectKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Extracts `object` if there is a handler for its kind.
    ///
    /// Returns `false` for objects that have no handler.
    pub fn try_extract(
        &self,
        object: &AssetObject,
        context: &HandlingContext<'_>,
        options: &ExtractOptions,
    ) -> Result<bool, SyncError> {
        let Some(handler) = self.handlers.get(&object.kind()) else {
            return Ok(false);
        };
        handler(object, context, options)?;
        Ok(true)
    }
}
