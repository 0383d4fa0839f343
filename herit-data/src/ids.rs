//! Identifier normalization.
//!
//! Raw identifiers carry a population-code prefix (e.g. `CZA-104`). Pedigree
//! tooling wants integers, so the prefix and any separator are removed and the
//! numeric remainder is scaled by a fixed factor. The scaling leaves room below
//! every real ID for synthesized pedigree IDs, so the two can never collide.

use thiserror::Error;

/// Default multiplier applied to the numeric suffix.
pub const DEFAULT_ID_SCALE: i64 = 1000;

const SEPARATORS: &[char] = &['-', '_', '.', ' ', ':', '/'];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("Empty identifier")]
    Empty,

    #[error("Identifier '{id}' has unrecognised prefix (expected one of {expected:?})")]
    UnknownPrefix { id: String, expected: Vec<String> },

    #[error("Identifier '{id}' has no numeric suffix")]
    MissingSuffix { id: String },

    #[error("Identifier '{id}' has non-numeric suffix '{suffix}'")]
    NonNumeric { id: String, suffix: String },

    #[error("Identifier '{id}' has a zero suffix; normalized IDs must be positive")]
    Zero { id: String },

    #[error("Identifier '{id}' overflows after scaling by {scale}")]
    Overflow { id: String, scale: i64 },
}

/// Strips population-code prefixes and rescales IDs into a numeric namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdNormalizer {
    /// Accepted prefixes. Empty means any leading ASCII-alphabetic run.
    prefixes: Vec<String>,
    scale: i64,
}

impl Default for IdNormalizer {
    fn default() -> Self {
        Self {
            prefixes: Vec::new(),
            scale: DEFAULT_ID_SCALE,
        }
    }
}

impl IdNormalizer {
    /// Create a normalizer that only accepts the given prefixes.
    ///
    /// Longer prefixes are tried first so that `AB` never shadows `ABC`.
    pub fn with_prefixes<I, S>(prefixes: I, scale: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        prefixes.dedup();
        Self { prefixes, scale }
    }

    /// Create a normalizer that accepts any alphabetic prefix.
    pub fn any_prefix(scale: i64) -> Self {
        Self {
            prefixes: Vec::new(),
            scale,
        }
    }

    pub fn scale(&self) -> i64 {
        self.scale
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Normalize a raw identifier to `suffix * scale`.
    pub fn normalize(&self, raw: &str) -> Result<i64, IdError> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(IdError::Empty);
        }

        let rest = self.strip_prefix(id)?;
        let suffix = rest.trim_start_matches(SEPARATORS);
        if suffix.is_empty() {
            return Err(IdError::MissingSuffix { id: id.to_string() });
        }
        if !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdError::NonNumeric {
                id: id.to_string(),
                suffix: suffix.to_string(),
            });
        }

        let value: i64 = suffix.parse().map_err(|_| IdError::Overflow {
            id: id.to_string(),
            scale: self.scale,
        })?;
        if value == 0 {
            return Err(IdError::Zero { id: id.to_string() });
        }
        value.checked_mul(self.scale).ok_or(IdError::Overflow {
            id: id.to_string(),
            scale: self.scale,
        })
    }

    fn strip_prefix<'a>(&self, id: &'a str) -> Result<&'a str, IdError> {
        if self.prefixes.is_empty() {
            let start = id
                .char_indices()
                .find(|(_, c)| !c.is_ascii_alphabetic())
                .map(|(i, _)| i)
                .unwrap_or(id.len());
            return Ok(&id[start..]);
        }

        self.prefixes
            .iter()
            .find_map(|p| id.strip_prefix(p.as_str()))
            .ok_or_else(|| IdError::UnknownPrefix {
                id: id.to_string(),
                expected: self.prefixes.clone(),
            })
    }
}
