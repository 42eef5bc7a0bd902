//! Unpacks raw blobs into the bundle tree of a server.

use std::{io, path::Path};

use filetime::FileTime;
use fs_err as fs;
use zip::ZipArchive;

use crate::{SyncError, layout::DataLayout, manifest::BundleDescriptor, util::temp_file_for};

/// What a materialize run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Entries that were (re)written.
    pub written: usize,
    /// Entries that were already up to date or could not be placed safely.
    pub skipped: usize,
}

/// Unpacks the blob of every bundle into `{server}/bundles`.
///
/// An entry is only written when the output file is missing or older than
/// the blob. Written files take over the blob's modification time. Bundles
/// whose blob is not stored are ignored.
pub fn materialize_bundles(
    layout: &DataLayout,
    server: &str,
    bundles: &[BundleDescriptor],
) -> Result<MaterializeReport, SyncError> {
    let root = layout.bundles_dir(server);
    fs::create_dir_all(&root)?;

    let total = bundles.len();
    let mut report = MaterializeReport::default();
    for (idx, bundle) in bundles.iter().enumerate() {
        let raw = layout.raw_blob_path(bundle)?;
        if !raw.is_file() {
            continue;
        }
        unpack_blob(&raw, &root, idx + 1, total, &mut report)?;
    }

    Ok(report)
}

fn unpack_blob(
    raw: &Path,
    root: &Path,
    count: usize,
    total: usize,
    report: &mut MaterializeReport,
) -> Result<(), SyncError> {
    let invalid_zip = |source| SyncError::InvalidZip {
        path: raw.to_path_buf(),
        source,
    };

    let raw_time = FileTime::from_last_modification_time(&fs::metadata(raw)?);
    let mut archive = ZipArchive::new(fs::File::open(raw)?).map_err(invalid_zip)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(invalid_zip)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(
                "Skipping '{}' of {}, it points outside of the bundle tree",
                entry.name(),
                raw.display()
            );
            report.skipped += 1;
            continue;
        };
        let output = root.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&output)?;
            continue;
        }

        let overwrite = match fs::metadata(&output) {
            Ok(metadata) => FileTime::from_last_modification_time(&metadata) < raw_time,
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };
        if !overwrite {
            report.skipped += 1;
            continue;
        }

        tracing::info!("Extract {count} / {total}: {}", entry.name());
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write next to the target and rename, a half written entry would
        // otherwise look up to date on the next run.
        let mut temp = temp_file_for(&output)?;
        io::copy(&mut entry, &mut temp)?;
        filetime::set_file_mtime(temp.path(), raw_time)?;
        temp.persist(&output).map_err(|e| e.error)?;
        report.written += 1;
    }

    Ok(())
}
