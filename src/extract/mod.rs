//! Extraction of the objects inside the bundle tree into individual files.

pub mod container;
pub mod filter;
pub mod handlers;
pub mod naming;
pub mod registry;

use std::{
    collections::HashSet,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use arkres_config::{DecryptKeys, ServerSettings};
use arkres_consts::consts;
use filetime::FileTime;
use fs_err as fs;
use parking_lot::Mutex;
use strum::Display;

use self::{
    container::ContainerIndex,
    filter::BundleFilter,
    registry::{ExtractOptions, HandlerRegistry, HandlingContext},
};
use crate::{
    SyncError,
    asset::{AssetBackend, AssetObject, ObjectKind},
    layout::DataLayout,
    workers::{Claim, run_pool},
};

/// A bundle file found in the bundle tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBundle {
    pub path: PathBuf,
    /// Path relative to the bundle tree, `/` separated.
    pub relative: String,
}

impl fmt::Display for PendingBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relative)
    }
}

/// Collects every bundle below `root`, depth first. The files of a directory
/// come before the contents of its subdirectories, both in name order.
pub fn discover_bundles(root: &Path) -> Result<Vec<PendingBundle>, SyncError> {
    let mut pending = Vec::new();
    if !root.is_dir() {
        return Ok(pending);
    }

    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = fs::read_dir(&dir)?.collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|entry| entry.file_name());

        let mut subdirs = Vec::new();
        for entry in entries {
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                subdirs.push(path);
            } else if path.extension().is_some_and(|ext| ext == consts::BUNDLE_EXTENSION) {
                let relative = relative_bundle_path(root, &path);
                pending.push(PendingBundle { path, relative });
            }
        }
        stack.extend(subdirs.into_iter().rev());
    }

    Ok(pending)
}

fn relative_bundle_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BundleAction {
    Extract,
    Exclude,
    Skip,
}

/// Counts of what an extraction run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractReport {
    pub extracted: usize,
    pub excluded: usize,
    pub skipped: usize,
}

/// The time an output directory was made, its modification time where the
/// platform does not record creation.
fn directory_time(metadata: &std::fs::Metadata) -> std::io::Result<SystemTime> {
    metadata.created().or_else(|_| metadata.modified())
}

/// Extracts the assets of one server's bundle tree.
#[derive(Debug)]
pub struct AssetExtractor {
    bundles_root: PathBuf,
    assets_root: PathBuf,
    filter: BundleFilter,
    decrypt: Option<DecryptKeys>,
    convert_audio: bool,
    verbose: bool,
    backend: AssetBackend,
    report: Mutex<ExtractReport>,
}

impl AssetExtractor {
    pub fn new(
        layout: &DataLayout,
        server: &str,
        settings: ServerSettings,
        backend: AssetBackend,
    ) -> Self {
        Self {
            bundles_root: layout.bundles_dir(server),
            assets_root: layout.assets_dir(server),
            filter: BundleFilter::new(settings.include, settings.exclude),
            decrypt: settings.decrypt,
            convert_audio: false,
            verbose: false,
            backend,
            report: Mutex::default(),
        }
    }

    pub fn with_convert_audio(self, convert_audio: bool) -> Self {
        Self {
            convert_audio,
            ..self
        }
    }

    /// Also log bundles that are up to date.
    pub fn with_verbose(self, verbose: bool) -> Self {
        Self { verbose, ..self }
    }

    /// Extracts every bundle of the tree on `workers` workers.
    pub async fn run(self, workers: usize) -> Result<ExtractReport, SyncError> {
        fs::create_dir_all(&self.assets_root)?;
        let pending = discover_bundles(&self.bundles_root)?;

        let this = Arc::new(self);
        let extractor = this.clone();
        run_pool("extract", workers, pending, move |claim: Claim<PendingBundle>| {
            let extractor = extractor.clone();
            async move {
                tokio::task::spawn_blocking(move || extractor.process(claim))
                    .await
                    .map_err(|source| SyncError::WorkerPanicked {
                        stage: "extract",
                        source,
                    })?
            }
        })
        .await?;

        let report = *this.report.lock();
        Ok(report)
    }

    /// Decides what happens to a bundle, clearing a stale output directory.
    fn action(&self, bundle: &PendingBundle, output: &Path) -> Result<BundleAction, SyncError> {
        if self.filter.is_excluded(&bundle.relative) {
            return Ok(BundleAction::Exclude);
        }

        let dir_metadata = match fs::metadata(output) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BundleAction::Extract);
            }
            Err(e) => return Err(e.into()),
        };
        let bundle_time = fs::metadata(&bundle.path)?.modified()?;
        if directory_time(&dir_metadata)? > bundle_time {
            return Ok(BundleAction::Skip);
        }

        fs::remove_dir_all(output)?;
        Ok(BundleAction::Extract)
    }

    fn process(&self, claim: Claim<PendingBundle>) -> Result<(), SyncError> {
        let Claim {
            worker,
            index,
            total,
            item: bundle,
        } = claim;
        let output = self.assets_root.join(&bundle.relative);

        let action = self.action(&bundle, &output)?;
        if self.verbose || action != BundleAction::Skip {
            tracing::info!(
                "[Worker {worker}] {action} {index} / {total} ({})",
                bundle.relative
            );
        }

        match action {
            BundleAction::Exclude => self.report.lock().excluded += 1,
            BundleAction::Skip => self.report.lock().skipped += 1,
            BundleAction::Extract => {
                fs::create_dir_all(&output)?;
                if let Err(err) = self.extract_bundle(&bundle, output.clone()) {
                    // A partial output directory would be taken as up to date.
                    if let Err(e) = fs::remove_dir_all(&output) {
                        tracing::warn!("Failed to clean up {}: {e}", output.display());
                    }
                    return Err(err);
                }
                self.report.lock().extracted += 1;
            }
        }
        Ok(())
    }

    fn extract_bundle(&self, bundle: &PendingBundle, directory: PathBuf) -> Result<(), SyncError> {
        let files = self
            .backend
            .loader
            .load_bundle(&bundle.path)
            .map_err(|source| SyncError::LoadBundle {
                path: bundle.path.clone(),
                source,
            })?;
        let objects: Vec<&AssetObject> = files.iter().flat_map(|file| &file.objects).collect();

        let bundle_time = FileTime::from_last_modification_time(&fs::metadata(&bundle.path)?);
        let context = HandlingContext {
            directory,
            bundle_path: bundle.relative.clone(),
            bundle_time,
            decrypt: self.decrypt.as_ref(),
            convert_audio: self.convert_audio,
            backend: &self.backend,
        };

        extract_objects(&objects, &context)
    }
}

/// Extracts the objects of one bundle.
///
/// Images are named first so that colliding names can be told apart, text
/// assets take their name from the container index, everything else is
/// dispatched with its own name.
pub fn extract_objects(
    objects: &[&AssetObject],
    context: &HandlingContext<'_>,
) -> Result<(), SyncError> {
    let registry = HandlerRegistry::builtin();
    let index = ContainerIndex::build(objects.iter().copied());
    let mut processed = HashSet::new();

    let visuals = objects.iter().copied().filter(|object| object.is_visual());
    for (object, name) in naming::visual_names(visuals, &index) {
        processed.insert(object.path_id);
        registry.try_extract(object, context, &ExtractOptions::named(name))?;
    }

    for object in objects
        .iter()
        .filter(|object| object.kind() == ObjectKind::TextAsset)
    {
        processed.insert(object.path_id);
        let options = naming::text_options(object.path_id, &index);
        registry.try_extract(object, context, &options)?;
    }

    for object in objects {
        if processed.contains(&object.path_id) {
            continue;
        }
        registry.try_extract(object, context, &ExtractOptions::default())?;
    }

    Ok(())
}
