use std::fs;
use std::io;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::errors::AnalysisError;

/// How a signature is compared with a string
#[derive(Debug, Clone)]
pub enum Pattern {
    /// String must be equal to the literal
    Literal(String),

    /// Regular expression must match the whole string
    Regex(Regex),
}

impl Pattern {
    /// Compile `pattern` anchored at both ends
    pub fn regex(pattern: &str) -> Result<Pattern, regex::Error> {
        Regex::new(&format!("^(?:{pattern})$")).map(Pattern::Regex)
    }

    #[inline]
    pub fn is_match(&self, s: &str) -> bool {
        match self {
            Pattern::Literal(literal) => literal == s,
            Pattern::Regex(regex) => regex.is_match(s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Signature {
    pub label: String,
    pub pattern: Pattern,
}

/// Json representation of a catalog entry
///
/// ```json
/// [
///     { "label": "Metasploit payload", "literal": "Lcom/metasploit/stage/Payload;" },
///     { "label": "Superuser check", "regex": "/system/(x?bin|app)/su" }
/// ]
/// ```
#[derive(Deserialize)]
#[serde(untagged)]
enum SignatureEntry {
    Literal { label: String, literal: String },
    Regex { label: String, regex: String },
}

/// Ordered set of patterns with the labels reported on match
///
/// Immutable after construction, so one catalog can be shared between
/// threads analyzing different files.
#[derive(Debug, Clone, Default)]
pub struct SignatureCatalog {
    signatures: Vec<Signature>,
}

impl SignatureCatalog {
    pub fn new() -> SignatureCatalog {
        SignatureCatalog::default()
    }

    pub fn with_literal(mut self, literal: impl Into<String>, label: impl Into<String>) -> Self {
        self.signatures.push(Signature {
            label: label.into(),
            pattern: Pattern::Literal(literal.into()),
        });
        self
    }

    pub fn with_regex(
        mut self,
        pattern: &str,
        label: impl Into<String>,
    ) -> Result<Self, AnalysisError> {
        let label = label.into();
        let pattern = Pattern::regex(pattern).map_err(|source| AnalysisError::InvalidSignature {
            label: label.clone(),
            source,
        })?;

        self.signatures.push(Signature { label, pattern });
        Ok(self)
    }

    /// Load catalog from a json array of `{ "label", "literal" }` or `{ "label", "regex" }` objects
    pub fn from_json(input: &str) -> Result<SignatureCatalog, AnalysisError> {
        let entries: Vec<SignatureEntry> = serde_json::from_str(input)?;

        entries
            .into_iter()
            .try_fold(SignatureCatalog::new(), |catalog, entry| match entry {
                SignatureEntry::Literal { label, literal } => {
                    Ok(catalog.with_literal(literal, label))
                }
                SignatureEntry::Regex { label, regex } => catalog.with_regex(&regex, label),
            })
    }

    pub fn from_path(path: &Path) -> Result<SignatureCatalog, AnalysisError> {
        let input = fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => AnalysisError::FileNotFound(path.to_path_buf()),
            _ => AnalysisError::NotReadable {
                path: path.to_path_buf(),
                source,
            },
        })?;

        Self::from_json(&input)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.iter()
    }

    /// Labels of every signature matching `s`, in catalog order
    pub fn matches<'a>(&'a self, s: &'a str) -> impl Iterator<Item = &'a str> {
        self.signatures
            .iter()
            .filter(move |signature| signature.pattern.is_match(s))
            .map(|signature| signature.label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_intel_dex::ErrorKind;

    #[test]
    fn literal_is_exact() {
        let catalog = SignatureCatalog::new().with_literal("su", "root");

        assert_eq!(catalog.matches("su").collect::<Vec<_>>(), ["root"]);
        assert_eq!(catalog.matches("sudo").count(), 0);
    }

    #[test]
    fn regex_is_anchored() {
        let catalog = SignatureCatalog::new()
            .with_regex(r"Lcom/metasploit/.*;", "metasploit")
            .unwrap();

        assert_eq!(catalog.matches("Lcom/metasploit/stage/Payload;").count(), 1);
        assert_eq!(catalog.matches("xLcom/metasploit/stage/Payload;").count(), 0);
        assert_eq!(catalog.matches("Lcom/metasploit/stage/Payload;x").count(), 0);
    }

    #[test]
    fn from_json() {
        let catalog = SignatureCatalog::from_json(
            r#"[
                {"label": "metasploit", "literal": "Lcom/metasploit/stage/Payload;"},
                {"label": "su binary", "regex": "/system/(x?bin|app)/su"}
            ]"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.matches("/system/xbin/su").collect::<Vec<_>>(), ["su binary"]);
    }

    #[test]
    fn from_json_errors() {
        let err =
            SignatureCatalog::from_json(r#"[{"label": "broken", "regex": "("}]"#).unwrap_err();
        assert!(
            matches!(err, AnalysisError::InvalidSignature { ref label, .. } if label == "broken")
        );

        let err = SignatureCatalog::from_json(r#"{"label": "not a list"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSignature);
    }
}
