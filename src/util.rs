use std::{io, path::Path};

use indicatif::MultiProgress;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone)]
pub struct IndicatifWriter {
    progress_bars: MultiProgress,
}

impl IndicatifWriter {
    pub(crate) fn new(pb: MultiProgress) -> Self {
        Self { progress_bars: pb }
    }
}

impl io::Write for IndicatifWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.progress_bars.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.progress_bars.suspend(|| io::stderr().flush())
    }
}

impl<'a> MakeWriter<'a> for IndicatifWriter {
    type Writer = IndicatifWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Build a [`tempfile::NamedTempFile`] in the same directory as `path`, using
/// the original filename as the prefix so the temp file is easily identifiable
/// (e.g. `.hot_update_list.json.XXXXXX`).
pub(crate) fn temp_file_for(path: &Path) -> io::Result<tempfile::NamedTempFile> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory"))?;

    let prefix = format!(
        ".{}.",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("tmp")
    );

    tempfile::Builder::new().prefix(&prefix).tempfile_in(dir)
}

/// Atomically write contents to a file by first writing to a temporary file in
/// the same directory and then renaming it to the target path.
///
/// A blob or manifest that exists on disk is trusted without validation, so it
/// must never be left in a partially-written state.
pub(crate) async fn atomic_write(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    let temp_file = temp_file_for(path)?;
    let temp_path = temp_file.into_temp_path();

    tokio::fs::write(&temp_path, contents).await?;

    temp_path.persist(path).map_err(|e| e.error)?;

    Ok(())
}
