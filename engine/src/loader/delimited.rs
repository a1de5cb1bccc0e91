//! Delimited text loader with encoding and delimiter auto-detection.

use csv::{ReaderBuilder, Trim};
use encoding_rs::Encoding;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use super::{dataset_name, DatasetLoader};
use crate::data::{DataHolder, DataStructure, Table};
use crate::error::{LoaderError, LoaderResult};

const DELIMITERS: [char; 4] = [';', ',', '\t', '|'];

/// Lines sampled when guessing the delimiter.
const SAMPLE_LINES: usize = 5;

/// Guess the encoding of raw bytes.
///
/// Valid UTF-8 is taken as is; anything else goes to chardet, and a guess
/// encoding_rs does not know falls back to windows-1252.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    if std::str::from_utf8(bytes).is_ok() {
        return encoding_rs::UTF_8;
    }
    let (charset, confidence, _language) = chardet::detect(bytes);
    log::debug!("chardet guessed {} ({:.2})", charset, confidence);
    Encoding::for_label(chardet::charset2encoding(&charset).as_bytes())
        .unwrap_or(encoding_rs::WINDOWS_1252)
}

/// Resolve a WHATWG encoding label (`latin1`, `utf-8`, `cp1252`, ...).
pub fn resolve_encoding(label: &str) -> LoaderResult<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| LoaderError::Encoding(format!("unsupported encoding '{}'", label)))
}

/// Decode bytes, dropping a byte order mark. Malformed sequences become
/// U+FFFD and are reported once.
pub fn decode_content(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (content, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        log::warn!("Malformed {} sequences replaced while decoding", used.name());
    }
    content.into_owned()
}

/// Pick the delimiter that splits the first lines most consistently.
///
/// A candidate scores its count on the header line when every sampled line
/// has the same count, and nothing otherwise. Ties keep the earlier
/// candidate; with no consistent candidate the most frequent one on the
/// header line wins, and `;` when none occurs at all.
pub fn detect_delimiter(content: &str) -> char {
    let sample: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SAMPLE_LINES)
        .collect();
    let Some(header) = sample.first() else {
        return DELIMITERS[0];
    };

    let counts: Vec<(char, usize, bool)> = DELIMITERS
        .iter()
        .map(|&sep| {
            let count = header.matches(sep).count();
            let consistent = sample.iter().all(|line| line.matches(sep).count() == count);
            (sep, count, consistent)
        })
        .collect();

    let best = |only_consistent: bool| {
        counts
            .iter()
            .filter(|(_, count, consistent)| *count > 0 && (*consistent || !only_consistent))
            .fold(None, |best: Option<(char, usize)>, &(sep, count, _)| match best {
                Some((_, top)) if top >= count => best,
                _ => Some((sep, count)),
            })
            .map(|(sep, _)| sep)
    };
    best(true).or_else(|| best(false)).unwrap_or(DELIMITERS[0])
}

/// The csv crate splits on a single byte.
fn delimiter_byte(delimiter: char) -> LoaderResult<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(LoaderError::Delimiter(delimiter))
}

/// Loads CSV-like files into column-structured holders.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    data_type: String,
    structure: DataStructure,
    encoding: Option<String>,
    delimiter: Option<char>,
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self {
            data_type: String::new(),
            structure: DataStructure::Column,
            encoding: None,
            delimiter: None,
        }
    }
}

impl CsvLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data type reported for every loaded dataset.
    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }

    pub fn with_structure(mut self, structure: DataStructure) -> Self {
        self.structure = structure;
        self
    }

    /// Skip encoding detection; the label is resolved at load time.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Skip delimiter detection.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Parse decoded content into a table.
    pub fn parse(&self, content: &str, delimiter: char) -> LoaderResult<Table> {
        if content.trim().is_empty() {
            return Err(LoaderError::EmptyFile);
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter_byte(delimiter)?)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(content.as_bytes());

        let raw_headers = reader.headers()?.clone();
        if raw_headers.iter().all(|h| h.is_empty()) {
            return Err(LoaderError::NoHeaders);
        }
        let headers = unique_headers(raw_headers.iter());

        let mut table = Table::new(headers.clone())?;
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            let row = (0..headers.len())
                .map(|i| match record.get(i) {
                    Some(field) if !field.is_empty() => Value::String(field.to_string()),
                    _ => Value::Null,
                })
                .collect();
            table.push_row(row)?;
        }
        Ok(table)
    }
}

/// Blank names become `column_<n>`, repeated names get a `_<n>` suffix.
fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for (index, name) in raw.enumerate() {
        let base = if name.is_empty() {
            format!("column_{}", index + 1)
        } else {
            name.to_string()
        };
        let mut candidate = base.clone();
        let mut n = 2;
        while headers.contains(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        headers.push(candidate);
    }
    headers
}

impl DatasetLoader for CsvLoader {
    fn kind(&self) -> &str {
        "csv"
    }

    fn load(&self, path: &Path) -> LoaderResult<DataHolder> {
        let bytes = fs::read(path)?;
        if bytes.is_empty() {
            return Err(LoaderError::EmptyFile);
        }

        let encoding = match &self.encoding {
            Some(label) => resolve_encoding(label)?,
            None => detect_encoding(&bytes),
        };
        let content = decode_content(&bytes, encoding);
        let delimiter = self.delimiter.unwrap_or_else(|| detect_delimiter(&content));
        let table = self.parse(&content, delimiter)?;

        log::info!(
            "Loaded {} ({} rows, encoding {}, delimiter {:?})",
            path.display(),
            table.len(),
            encoding.name(),
            delimiter
        );

        let mut metadata = Map::new();
        metadata.insert("encoding".to_string(), Value::String(encoding.name().to_string()));
        metadata.insert("delimiter".to_string(), Value::String(delimiter.to_string()));
        metadata.insert("source".to_string(), Value::String(path.display().to_string()));

        let mut holder = DataHolder::new(dataset_name(path), table)
            .with_data_type(self.data_type.clone())
            .with_structure(self.structure)
            .with_holder_kind(self.kind());
        holder.metadata = metadata;
        Ok(holder)
    }
}
