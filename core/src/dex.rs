use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use dex_intel_dex::{DexFile, DexHeader, Inconsistency, OmittedString};
use log::info;

use crate::classifier::Classifier;
use crate::errors::AnalysisError;
use crate::hashes::Digests;
use crate::models::{DexSnapshot, HeaderSummary};
use crate::options::DexOptions;
use crate::signatures::SignatureCatalog;

/// Main structure that represents analyzed dex file
///
/// All the work happens in the constructor, accessors only read the result.
#[derive(Debug)]
pub struct Dex {
    raw: Vec<u8>,
    header: DexHeader,
    omitted: Vec<OmittedString>,
    snapshot: DexSnapshot,
}

/// Implementation of internal methods
impl Dex {
    /// Read the whole file, refusing anything above `limit` bytes
    fn read(path: &Path, limit: u64) -> Result<Vec<u8>, AnalysisError> {
        let not_readable = |source: io::Error| match source.kind() {
            io::ErrorKind::NotFound => AnalysisError::FileNotFound(path.to_path_buf()),
            _ => AnalysisError::NotReadable {
                path: path.to_path_buf(),
                source,
            },
        };

        let file = File::open(path).map_err(not_readable)?;
        let size = file.metadata().map_err(not_readable)?.len();
        if size > limit {
            return Err(AnalysisError::FileTooLarge { size, limit });
        }

        // file may grow between metadata and read
        let mut input = Vec::with_capacity(size as usize);
        BufReader::with_capacity(1024 * 1024, file)
            .take(limit.saturating_add(1))
            .read_to_end(&mut input)
            .map_err(not_readable)?;

        if input.len() as u64 > limit {
            return Err(AnalysisError::FileTooLarge {
                size: input.len() as u64,
                limit,
            });
        }

        Ok(input)
    }
}

impl Dex {
    /// Load and analyze dex file from disk
    ///
    /// `name` is the display name used in reports, e.g. `classes2.dex`.
    pub fn from_path(
        path: &Path,
        name: impl Into<String>,
        catalog: &SignatureCatalog,
        options: &DexOptions,
    ) -> Result<Dex, AnalysisError> {
        // basic sanity check
        if !path.exists() {
            return Err(AnalysisError::FileNotFound(path.to_path_buf()));
        }

        let raw = Self::read(path, options.max_file_size)?;
        Self::from_bytes(raw, name, catalog, options)
    }

    /// Analyze file with default options and without custom signatures
    ///
    /// Display name is the file name of `path`.
    pub fn open(path: &Path) -> Result<Dex, AnalysisError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self::from_path(path, name, &SignatureCatalog::default(), &DexOptions::default())
    }

    /// Analyze dex file that is already in memory, e.g. extracted from an apk
    pub fn from_bytes(
        raw: Vec<u8>,
        name: impl Into<String>,
        catalog: &SignatureCatalog,
        options: &DexOptions,
    ) -> Result<Dex, AnalysisError> {
        let size = raw.len() as u64;
        if size > options.max_file_size {
            return Err(AnalysisError::FileTooLarge {
                size,
                limit: options.max_file_size,
            });
        }

        let DexFile {
            header,
            inconsistencies,
            strings,
        } = DexFile::with_limit(&raw, options.max_string_code_units)?;

        let classification = Classifier::new(catalog).classify(strings.strings());
        let digests = Digests::compute(&raw);
        let (strings, omitted) = strings.into_parts();

        let snapshot = DexSnapshot {
            name: name.into(),
            size,
            digests,
            strings,
            classification,
            header: HeaderSummary::from(&header),
            inconsistencies,
            omitted_strings: omitted.len(),
        };

        info!(
            "{}: {} urls, {} shell commands, {} signatures",
            snapshot.name,
            snapshot.classification.urls.len(),
            snapshot.classification.shell_commands.len(),
            snapshot.classification.custom_signatures.len()
        );

        Ok(Dex {
            raw,
            header,
            omitted,
            snapshot,
        })
    }

    /// Whole file content
    #[inline]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.snapshot.name
    }

    /// File size in bytes
    #[inline]
    pub fn size(&self) -> u64 {
        self.snapshot.size
    }

    #[inline]
    pub fn md5(&self) -> &str {
        &self.snapshot.digests.md5
    }

    #[inline]
    pub fn sha1(&self) -> &str {
        &self.snapshot.digests.sha1
    }

    #[inline]
    pub fn sha256(&self) -> &str {
        &self.snapshot.digests.sha256
    }

    #[inline]
    pub fn sha512(&self) -> &str {
        &self.snapshot.digests.sha512
    }

    /// Decoded string pool in string id order
    #[inline]
    pub fn strings(&self) -> &[String] {
        &self.snapshot.strings
    }

    #[inline]
    pub fn urls(&self) -> &[String] {
        &self.snapshot.classification.urls
    }

    #[inline]
    pub fn shell_commands(&self) -> &[String] {
        &self.snapshot.classification.shell_commands
    }

    #[inline]
    pub fn custom_signatures(&self) -> &[String] {
        &self.snapshot.classification.custom_signatures
    }

    #[inline]
    pub fn header(&self) -> &DexHeader {
        &self.header
    }

    #[inline]
    pub fn inconsistencies(&self) -> &[Inconsistency] {
        &self.snapshot.inconsistencies
    }

    /// String ids dropped from the pool and the reason for each
    #[inline]
    pub fn omitted_strings(&self) -> &[OmittedString] {
        &self.omitted
    }

    #[inline]
    pub fn snapshot(&self) -> &DexSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> DexSnapshot {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_intel_dex::ErrorKind;
    use dex_intel_dex::builder::DexBuilder;

    fn analyze(raw: Vec<u8>) -> Result<Dex, AnalysisError> {
        Dex::from_bytes(raw, "classes.dex", &SignatureCatalog::new(), &DexOptions::default())
    }

    #[test]
    fn accessors_read_snapshot() {
        let raw = DexBuilder::new().strings(["onCreate", "set"]).build();
        let dex = analyze(raw.clone()).unwrap();

        assert_eq!(dex.name(), "classes.dex");
        assert_eq!(dex.size(), raw.len() as u64);
        assert_eq!(dex.raw(), &raw[..]);
        assert_eq!(dex.strings(), ["onCreate", "set"]);
        assert_eq!(dex.shell_commands(), ["set"]);
        assert!(dex.urls().is_empty());
        assert!(dex.custom_signatures().is_empty());
        assert_eq!(dex.header().string_ids_size, 2);
        assert_eq!(dex.snapshot().header.version, 35);
        assert_eq!(dex.md5(), Digests::compute(&raw).md5);
    }

    #[test]
    fn size_limit_for_buffers() {
        let raw = DexBuilder::new().string("a").build();
        let options = DexOptions::default().with_max_file_size(64);

        let err = Dex::from_bytes(raw, "a.dex", &SignatureCatalog::new(), &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileTooLarge);
    }

    #[test]
    fn string_limit_is_applied() {
        let raw = DexBuilder::new().strings(["short", "much longer string"]).build();
        let options = DexOptions::default().with_max_string_code_units(8);
        let dex = Dex::from_bytes(raw, "a.dex", &SignatureCatalog::new(), &options).unwrap();

        assert_eq!(dex.strings(), ["short"]);
        assert_eq!(dex.omitted_strings()[0].error.kind(), ErrorKind::StringTooLong);
        assert_eq!(dex.snapshot().omitted_strings, 1);
    }

    #[test]
    fn fatal_errors_produce_no_instance() {
        let mut raw = DexBuilder::new().string("a").build();
        raw[1] = b'x';

        assert_eq!(analyze(raw).unwrap_err().kind(), ErrorKind::InvalidMagic);
        assert_eq!(analyze(b"dex\n035\0".to_vec()).unwrap_err().kind(), ErrorKind::HeaderTruncated);
    }
}
