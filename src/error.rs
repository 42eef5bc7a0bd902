use std::path::PathBuf;

use miette::Diagnostic;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::asset::LoadError;

/// Errors that can occur while synchronizing and extracting the resources of a server.
#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to download {url}: {status}")]
    #[diagnostic(help("re-run to retry, blobs that were already stored are not fetched again"))]
    HttpStatus { url: Url, status: StatusCode },

    #[error("failed to fetch {url}")]
    Fetch {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to set up the http client")]
    HttpClient(#[source] reqwest::Error),

    #[error("invalid request header value '{0}'")]
    InvalidHeader(String),

    #[error("the response of {url} is not valid utf-8")]
    InvalidUtf8 {
        url: Url,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to parse {}", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest entry '{name}' has an invalid digest '{digest}'")]
    InvalidDigest { name: String, digest: String },

    #[error("invalid zip archive {}", path.display())]
    InvalidZip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to load bundle {}", path.display())]
    #[diagnostic(help("exclude the bundle with `--exclude` to continue without it"))]
    LoadBundle {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error("unknown server '{0}'")]
    UnknownServer(String),

    #[error("a worker of the {stage} stage stopped unexpectedly")]
    WorkerPanicked {
        stage: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
}
