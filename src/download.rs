use std::{fmt, path::PathBuf, sync::Arc};

use arkres_consts::consts;
use itertools::Itertools;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::{
    SyncError,
    layout::DataLayout,
    manifest::BundleDescriptor,
    origin::{Endpoints, ResourceOrigin},
    util::atomic_write,
    workers::{Claim, run_pool},
};

/// Characters that are kept as is in a form-encoded request name.
const FORM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'*')
    .remove(b'(')
    .remove(b')');

/// Derives the file name a bundle is served under from its logical name.
///
/// `gamedata/excel/item_table.ab` becomes `gamedata_excel_item_table.dat`.
pub fn request_name(name: &str) -> String {
    let mut flat = name.replace('#', "__").replace('/', "_");
    for (extension, placeholder) in consts::REQUEST_EXTENSION_PLACEHOLDERS {
        flat = flat.replace(extension, placeholder);
    }

    flat.split(' ')
        .map(|part| utf8_percent_encode(part, FORM_ENCODE_SET).to_string())
        .join("+")
}

/// A blob that still has to be fetched.
#[derive(Debug, Clone)]
pub struct PendingBlob {
    pub bundle: BundleDescriptor,
    pub target: PathBuf,
}

impl fmt::Display for PendingBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bundle.name)
    }
}

/// Selects the bundles whose blob is not stored yet. Bundles that share a
/// digest share a blob, only the first of them is kept.
pub fn pending_blobs(
    layout: &DataLayout,
    bundles: &[BundleDescriptor],
) -> Result<Vec<PendingBlob>, SyncError> {
    let mut pending = Vec::new();
    for bundle in bundles.iter().unique_by(|bundle| bundle.content_digest()) {
        let target = layout.raw_blob_path(bundle)?;
        if !target.is_file() {
            pending.push(PendingBlob {
                bundle: bundle.clone(),
                target,
            });
        }
    }
    Ok(pending)
}

/// Fetches every missing blob of `bundles` into the raw store.
///
/// Returns the number of blobs that were fetched.
pub async fn download_blobs(
    origin: Arc<dyn ResourceOrigin>,
    endpoints: Endpoints,
    layout: &DataLayout,
    version: &str,
    bundles: &[BundleDescriptor],
    workers: usize,
) -> Result<usize, SyncError> {
    let pending = pending_blobs(layout, bundles)?;
    let count = pending.len();
    if count == 0 {
        tracing::info!("All {} blobs are up to date", bundles.len());
        return Ok(0);
    }

    let endpoints = Arc::new(endpoints);
    let version: Arc<str> = version.into();
    run_pool("download", workers, pending, move |claim: Claim<PendingBlob>| {
        let origin = origin.clone();
        let endpoints = endpoints.clone();
        let version = version.clone();
        async move {
            let Claim {
                worker,
                index,
                total,
                item,
            } = claim;
            tracing::info!(
                "[Worker {worker}] Download {index} / {total}: {}",
                item.bundle.name
            );

            let url = endpoints.asset_url(&version, &request_name(&item.bundle.name))?;
            let bytes = origin.fetch_bytes(&url).await?;

            if let Some(parent) = item.target.parent() {
                fs_err::tokio::create_dir_all(parent).await?;
            }
            atomic_write(&item.target, &bytes).await?;
            Ok(())
        }
    })
    .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::plain("avg/bg.ab", "avg_bg.dat")]
    #[case::hash_sign("chararts/char_002#1.ab", "chararts_char_002__1.dat")]
    #[case::video("video/opening.mp4", "video_opening.dat")]
    #[case::space("audio/sound beta/v 1.ab", "audio_sound+beta_v+1.dat")]
    #[case::reserved("ui/[uc]common.ab", "ui_%5Buc%5Dcommon.dat")]
    #[case::unreserved("a-b_c!(d)*.bin", "a-b_c!(d)*.bin")]
    #[case::non_ascii("ui/图.ab", "ui_%E5%9B%BE.dat")]
    fn test_request_name(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(request_name(name), expected);
    }

    #[test]
    fn test_pending_blobs_are_unique_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let bundle = |name: &str, md5: &str| BundleDescriptor {
            name: name.to_string(),
            hash: String::new(),
            md5: md5.to_string(),
            total_size: 0,
            ab_size: 0,
        };
        let bundles = vec![
            bundle("a.ab", "aaaa0000"),
            bundle("copy_of_a.ab", "aaaa0000"),
            bundle("b.ab", "bbbb0000"),
            bundle("c.ab", "cccc0000"),
        ];

        let stored = layout.raw_blob_path(&bundles[3]).unwrap();
        fs_err::create_dir_all(stored.parent().unwrap()).unwrap();
        fs_err::write(&stored, b"blob").unwrap();

        let pending = pending_blobs(&layout, &bundles).unwrap();
        let names: Vec<_> = pending.iter().map(|p| p.bundle.name.as_str()).collect();
        assert_eq!(names, vec!["a.ab", "b.ab"]);
        assert_eq!(pending[0].target, layout.raw_blob_path(&bundles[1]).unwrap());
    }
}
