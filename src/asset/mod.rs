//! The typed objects stored inside a bundle and the decoder that produces them.
//!
//! Parsing the serialized bundle format and converting textures and audio
//! into common media formats is left to an [`AssetBackend`]. The extraction
//! stage only relies on the object model defined here.

use std::{path::Path, sync::Arc};

use strum::Display;
use thiserror::Error;

/// Identifies an object within its bundle.
pub type PathId = i64;

/// An object decoded from a bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetObject {
    pub path_id: PathId,
    /// The name the object declares for itself, may be empty.
    pub name: String,
    pub data: ObjectData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectData {
    Texture2D {
        width: u32,
        height: u32,
        format: u32,
        image_data: Vec<u8>,
    },
    Sprite {
        texture_path_id: Option<PathId>,
    },
    AudioClip {
        audio_data: Vec<u8>,
    },
    TextAsset {
        script: Vec<u8>,
    },
    /// The bundle's own table of contents.
    AssetBundle {
        preload_table: Vec<PathId>,
        container: Vec<(String, AssetInfo)>,
    },
    ResourceManager {
        container: Vec<(String, PathId)>,
    },
    /// Any object type that is not modelled.
    Other { type_name: String },
}

/// A container entry of an [`ObjectData::AssetBundle`]: the range of the
/// preload table that belongs to one container path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetInfo {
    pub preload_index: usize,
    pub preload_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ObjectKind {
    Texture2D,
    Sprite,
    AudioClip,
    TextAsset,
    AssetBundle,
    ResourceManager,
    Other,
}

impl ObjectKind {
    /// Whether objects of this kind have a known layout.
    pub fn is_concrete(self) -> bool {
        self != ObjectKind::Other
    }
}

impl AssetObject {
    pub fn kind(&self) -> ObjectKind {
        match self.data {
            ObjectData::Texture2D { .. } => ObjectKind::Texture2D,
            ObjectData::Sprite { .. } => ObjectKind::Sprite,
            ObjectData::AudioClip { .. } => ObjectKind::AudioClip,
            ObjectData::TextAsset { .. } => ObjectKind::TextAsset,
            ObjectData::AssetBundle { .. } => ObjectKind::AssetBundle,
            ObjectData::ResourceManager { .. } => ObjectKind::ResourceManager,
            ObjectData::Other { .. } => ObjectKind::Other,
        }
    }

    /// Textures and sprites, the objects that are exported as images.
    pub fn is_visual(&self) -> bool {
        matches!(self.kind(), ObjectKind::Texture2D | ObjectKind::Sprite)
    }
}

/// One serialized file of a bundle with the objects it contains.
#[derive(Debug, Clone, Default)]
pub struct LoadedFile {
    pub name: String,
    pub objects: Vec<AssetObject>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed bundle: {0}")]
    Malformed(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Decodes a bundle file into its typed objects.
pub trait BundleLoader: Send + Sync {
    fn load_bundle(&self, path: &Path) -> Result<Vec<LoadedFile>, LoadError>;
}

/// Renders textures and sprites.
pub trait ImageEncoder: Send + Sync {
    /// Encodes the image of a texture or sprite as PNG, `None` if it can't be decoded.
    fn encode_png(&self, object: &AssetObject) -> Option<Vec<u8>>;
}

/// Converts audio clips.
///
/// Implementations need not be reentrant, calls to [`AudioConverter::to_wav`]
/// are serialized by the caller.
pub trait AudioConverter: Send + Sync {
    fn is_supported(&self, object: &AssetObject) -> bool;

    /// Extension (with leading dot) of the clip's embedded audio data.
    fn native_extension(&self, object: &AssetObject) -> String;

    fn to_wav(&self, object: &AssetObject) -> Option<Vec<u8>>;
}

/// The external decoders used by the extraction stage.
#[derive(Clone)]
pub struct AssetBackend {
    pub loader: Arc<dyn BundleLoader>,
    pub images: Arc<dyn ImageEncoder>,
    pub audio: Arc<dyn AudioConverter>,
}

impl AssetBackend {
    pub fn new(
        loader: impl BundleLoader + 'static,
        images: impl ImageEncoder + 'static,
        audio: impl AudioConverter + 'static,
    ) -> Self {
        Self {
            loader: Arc::new(loader),
            images: Arc::new(images),
            audio: Arc::new(audio),
        }
    }
}

impl std::fmt::Debug for AssetBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetBackend").finish_non_exhaustive()
    }
}
