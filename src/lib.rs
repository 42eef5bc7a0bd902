pub mod asset;
pub mod cli;
pub mod download;
mod error;
pub mod extract;
pub mod layout;
pub mod manifest;
pub mod materialize;
pub mod origin;
pub mod protocol;
pub mod resource;
mod util;
pub mod workers;

pub use asset::{AssetBackend, AudioConverter, BundleLoader, ImageEncoder};
pub use error::SyncError;
pub use resource::ResourceSync;
