//! Ordered operation sequences and their canonical serializations.
//!
//! # Lifecycle
//!
//! ```text
//! OperationListBuilder ──freeze()──▶ OperationList
//!   push / clear / set_*                iter / first / validate /
//!   options_mut                         to_filename / to_string / ...
//! ```
//!
//! Freezing consumes the builder. The frozen list has no mutating methods at
//! all, so mutation after freezing is rejected by the compiler rather than at
//! runtime. [`OperationList::to_builder`] starts a new, independent builder.
//!
//! # Canonical form
//!
//! All serializations walk the same canonical sequence: significant
//! operations in list order, then options sorted by key, then output settings.
//!
//! ```text
//! identifier.jpg_crop:5,6,20,22_scale:50%_rotate:15_animal:cat_interlace_quality:80_compression:JPEG.jpg
//! └── identifier ┘└──────────────────── body ───────────────────────────────────────────────────┘└ext┘
//! ```
//!
//! Option keys and values escape `\`, `_` and `:` with a backslash. Equality
//! and cache keys work on the separate components, not on this string.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use super::{Compression, Crop, Format, Identifier, Operation, OperationKind, Scale};
use crate::error::ValidationError;
use crate::geometry::Dimension;

// =============================================================================
// Builder
// =============================================================================

/// Mutable staging area for an [`OperationList`].
#[derive(Debug, Clone, Default)]
pub struct OperationListBuilder {
    identifier: Option<Identifier>,
    operations: Vec<Operation>,
    output_format: Option<Format>,
    output_compression: Option<Compression>,
    output_quality: Option<u8>,
    output_interlacing: bool,
    options: BTreeMap<String, String>,
}

impl OperationListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a builder for the given source identifier.
    pub fn with_identifier(identifier: impl Into<Identifier>) -> Self {
        Self {
            identifier: Some(identifier.into()),
            ..Self::default()
        }
    }

    /// Append an operation. Order matters: operations apply in sequence.
    pub fn push(&mut self, operation: impl Into<Operation>) -> &mut Self {
        self.operations.push(operation.into());
        self
    }

    /// Remove all operations. Output settings and options are kept.
    pub fn clear(&mut self) -> &mut Self {
        self.operations.clear();
        self
    }

    pub fn set_identifier(&mut self, identifier: impl Into<Identifier>) -> &mut Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn set_output_format(&mut self, format: Format) -> &mut Self {
        self.output_format = Some(format);
        self
    }

    pub fn set_output_compression(&mut self, compression: Compression) -> &mut Self {
        self.output_compression = Some(compression);
        self
    }

    /// Set the output quality (1-100). Range is checked by
    /// [`OperationList::validate`].
    pub fn set_output_quality(&mut self, quality: u8) -> &mut Self {
        self.output_quality = Some(quality);
        self
    }

    pub fn set_output_interlacing(&mut self, interlacing: bool) -> &mut Self {
        self.output_interlacing = interlacing;
        self
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn options_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.options
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    /// Make the list immutable.
    pub fn freeze(self) -> OperationList {
        let key = CanonicalKey {
            identifier: self.identifier.as_ref().map(|id| id.as_str().to_string()),
            operations: self
                .operations
                .iter()
                .filter(|op| op.is_significant())
                .map(ToString::to_string)
                .collect(),
            options: self.options.clone(),
            interlacing: self.output_interlacing,
            quality: self.output_quality,
            compression: self.output_compression.map(|c| c.name()),
            format: self.output_format,
        };
        let canonical = key.to_string();

        OperationList {
            identifier: self.identifier,
            operations: self.operations,
            output_format: self.output_format,
            output_compression: self.output_compression,
            output_quality: self.output_quality,
            output_interlacing: self.output_interlacing,
            options: self.options,
            key,
            canonical,
        }
    }
}

// =============================================================================
// Frozen list
// =============================================================================

/// An immutable, ordered sequence of operations plus output settings.
///
/// Equality and hashing are defined on the identifier, the significant
/// operations, the options and the output settings, so two lists that differ
/// only in no-op operations (an extra `Rotate(0)`, a full crop) compare
/// equal. Ordering follows the canonical string.
#[derive(Debug, Clone)]
pub struct OperationList {
    identifier: Option<Identifier>,
    operations: Vec<Operation>,
    output_format: Option<Format>,
    output_compression: Option<Compression>,
    output_quality: Option<u8>,
    output_interlacing: bool,
    options: BTreeMap<String, String>,
    key: CanonicalKey,
    canonical: String,
}

impl OperationList {
    pub fn builder() -> OperationListBuilder {
        OperationListBuilder::new()
    }

    /// A new builder holding a copy of this list's content.
    pub fn to_builder(&self) -> OperationListBuilder {
        OperationListBuilder {
            identifier: self.identifier.clone(),
            operations: self.operations.clone(),
            output_format: self.output_format,
            output_compression: self.output_compression,
            output_quality: self.output_quality,
            output_interlacing: self.output_interlacing,
            options: self.options.clone(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// First operation of the given kind.
    pub fn first(&self, kind: OperationKind) -> Option<&Operation> {
        self.operations.iter().find(|op| op.kind() == kind)
    }

    pub fn first_crop(&self) -> Option<&Crop> {
        self.operations.iter().find_map(|op| match op {
            Operation::Crop(crop) => Some(crop),
            _ => None,
        })
    }

    pub fn first_scale(&self) -> Option<&Scale> {
        self.operations.iter().find_map(|op| match op {
            Operation::Scale(scale) => Some(scale),
            _ => None,
        })
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    pub fn output_format(&self) -> Option<Format> {
        self.output_format
    }

    pub fn output_compression(&self) -> Option<Compression> {
        self.output_compression
    }

    pub fn output_quality(&self) -> Option<u8> {
        self.output_quality
    }

    pub fn output_interlacing(&self) -> bool {
        self.output_interlacing
    }

    /// Options, sorted by key. Always present, possibly empty.
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// Size of the image after every operation has been applied, in order.
    pub fn resulting_size(&self, full: Dimension) -> Dimension {
        self.operations
            .iter()
            .fold(full, |size, op| op.resulting_size(size))
    }

    /// True if the output would be equivalent to the unmodified source.
    ///
    /// The source format is inferred from the identifier's extension. Without
    /// an identifier or a recognizable extension the answer is `false`.
    pub fn is_noop(&self) -> bool {
        match self.identifier.as_ref().and_then(Identifier::inferred_format) {
            Some(source_format) => self.is_noop_for(source_format),
            None => false,
        }
    }

    /// Like [`Self::is_noop`], with an explicitly known source format.
    pub fn is_noop_for(&self, source_format: Format) -> bool {
        self.output_format == Some(source_format) && !self.operations.iter().any(Operation::has_effect)
    }

    /// Check every operation against the image it will see, plus the output
    /// quality.
    ///
    /// Operations are checked in order, each against the size produced by the
    /// operations before it.
    pub fn validate(&self, full: Dimension) -> Result<(), ValidationError> {
        let mut size = full;
        for op in &self.operations {
            op.validate(size)?;
            size = op.resulting_size(size);
        }
        if let Some(quality) = self.output_quality {
            if !(1..=100).contains(&quality) {
                return Err(ValidationError::InvalidQuality(quality));
            }
        }
        Ok(())
    }

    /// Deterministic cache key.
    ///
    /// `hex(sha256(identifier))_hex(sha256(body)).ext`. The body digest is
    /// taken over the tagged, length-prefixed operations, options and output
    /// settings, so no option value can imitate another component.
    pub fn to_filename(&self) -> String {
        let identifier = self.identifier.as_ref().map(Identifier::as_str).unwrap_or("");
        let mut filename = format!(
            "{}_{}",
            hex::encode(Sha256::digest(identifier.as_bytes())),
            self.key.body_digest()
        );
        if let Some(format) = self.output_format {
            filename.push('.');
            filename.push_str(format.preferred_extension());
        }
        filename
    }

    /// Structured description for an image of size `full`.
    ///
    /// Only operations that change an image of that size are listed, each
    /// sized against the output of the operations before it. Metadata copies
    /// are always listed.
    pub fn to_structured_map(&self, full: Dimension) -> Value {
        let mut operations = Vec::new();
        let mut size = full;
        for op in &self.operations {
            if op.has_effect_on(size) || matches!(op, Operation::MetadataCopy(_)) {
                operations.push(op.to_map(size));
            }
            size = op.resulting_size(size);
        }

        let options: Map<String, Value> = self
            .options
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        json!({
            "identifier": self.identifier.as_ref().map(Identifier::as_str),
            "operations": operations,
            "options": options,
            "output_format": self.output_format.map(|f| json!({
                "media_type": f.media_type(),
                "extension": f.preferred_extension(),
            })),
            "output_quality": self.output_quality,
            "output_interlacing": self.output_interlacing,
            "output_compression": self.output_compression.map(|c| c.name()),
        })
    }
}

impl<'a> IntoIterator for &'a OperationList {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

impl From<OperationListBuilder> for OperationList {
    fn from(builder: OperationListBuilder) -> Self {
        builder.freeze()
    }
}

impl fmt::Display for OperationList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl PartialEq for OperationList {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for OperationList {}

impl Hash for OperationList {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for OperationList {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OperationList {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical
            .cmp(&other.canonical)
            .then_with(|| self.key.cmp(&other.key))
    }
}

// =============================================================================
// Canonical serialization
// =============================================================================

/// The components every serialization and comparison is built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct CanonicalKey {
    identifier: Option<String>,
    /// Fragments of the significant operations, in list order.
    operations: Vec<String>,
    options: BTreeMap<String, String>,
    interlacing: bool,
    quality: Option<u8>,
    compression: Option<&'static str>,
    format: Option<Format>,
}

impl CanonicalKey {
    fn body(&self) -> String {
        let mut parts = self.operations.clone();

        parts.extend(
            self.options
                .iter()
                .map(|(k, v)| format!("{}:{}", escape(k), escape(v))),
        );

        if self.interlacing {
            parts.push("interlace".to_string());
        }
        if let Some(quality) = self.quality {
            parts.push(format!("quality:{}", quality));
        }
        if let Some(compression) = self.compression {
            parts.push(format!("compression:{}", compression));
        }

        parts.join("_")
    }

    fn body_digest(&self) -> String {
        let mut hasher = Sha256::new();
        let mut field = |tag: &str, value: &str| {
            hasher.update(tag.as_bytes());
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(value.as_bytes());
        };

        for op in &self.operations {
            field("op", op);
        }
        for (k, v) in &self.options {
            field("key", k);
            field("value", v);
        }
        if self.interlacing {
            field("interlace", "");
        }
        if let Some(quality) = self.quality {
            field("quality", &quality.to_string());
        }
        if let Some(compression) = self.compression {
            field("compression", compression);
        }

        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier.as_deref().unwrap_or(""))?;
        let body = self.body();
        if !body.is_empty() {
            write!(f, "_{}", body)?;
        }
        if let Some(format) = self.format {
            write!(f, ".{}", format.preferred_extension())?;
        }
        Ok(())
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '_' | ':') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
