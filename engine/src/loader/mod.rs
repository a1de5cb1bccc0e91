//! Turning data sources into [`DataHolder`]s.
//!
//! The workflow only sees the [`DatasetLoader`] trait. Loading failures are
//! per dataset: the workflow logs them and moves on to the next source.

mod delimited;

pub use delimited::{decode_content, detect_delimiter, detect_encoding, resolve_encoding, CsvLoader};

use std::path::Path;

use crate::data::DataHolder;
use crate::error::LoaderResult;

/// Produces one holder per data source.
pub trait DatasetLoader {
    /// Holder kind stamped on every loaded holder (e.g. `"csv"`).
    fn kind(&self) -> &str;

    fn load(&self, path: &Path) -> LoaderResult<DataHolder>;
}

/// Dataset name for a source: its file stem.
pub fn dataset_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
