//! Node identity hashing utilities.
//!
//! This module provides the [`NodeHasher`] type used to compute stable
//! identifiers for parsed feature nodes. Identifiers only depend on the
//! node's position and text, so parsing the same source twice yields the
//! same ids and per-step run options keep pointing at the same step.
//!
//! # Examples
//!
//! ```
//! use tsukemono::hasher::NodeHasher;
//!
//! let feature = NodeHasher::feature("Sums", 1);
//! assert_eq!(feature, NodeHasher::feature("Sums", 1));
//! assert_ne!(feature, NodeHasher::feature("Sums", 2));
//! ```

use sha2::{Digest, Sha256};

use crate::ast::StepKeyword;

/// Number of digest bytes kept in an identifier.
const ID_BYTES: usize = 8;

/// Computes stable identifiers for feature nodes.
pub struct NodeHasher;

impl NodeHasher {
    /// Identifier for a feature header.
    #[must_use]
    pub fn feature(description: &str, line: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"feature");
        Self::update_with_len(&mut hasher, description.as_bytes());
        Self::update_position(&mut hasher, line);
        Self::finish(hasher)
    }

    /// Identifier for a rule, scenario or background at `position` within
    /// `parent`.
    #[must_use]
    pub fn section(parent: &str, kind: &str, description: &str, position: usize) -> String {
        let mut hasher = Sha256::new();
        Self::update_with_len(&mut hasher, parent.as_bytes());
        Self::update_with_len(&mut hasher, kind.as_bytes());
        Self::update_with_len(&mut hasher, description.as_bytes());
        Self::update_position(&mut hasher, position);
        Self::finish(hasher)
    }

    /// Identifier for the step at `position` within `parent`.
    #[must_use]
    pub fn step(parent: &str, position: usize, keyword: StepKeyword, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"step");
        Self::update_with_len(&mut hasher, parent.as_bytes());
        Self::update_with_len(&mut hasher, keyword.as_str().as_bytes());
        Self::update_with_len(&mut hasher, text.as_bytes());
        Self::update_position(&mut hasher, position);
        Self::finish(hasher)
    }

    fn update_position(hasher: &mut Sha256, position: usize) {
        hasher.update(format!("@{position}").as_bytes());
    }

    fn update_with_len(hasher: &mut Sha256, bytes: &[u8]) {
        let len = bytes.len();
        hasher.update(format!("{len}:").as_bytes());
        hasher.update(bytes);
    }

    fn finish(hasher: Sha256) -> String {
        hasher
            .finalize()
            .iter()
            .take(ID_BYTES)
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}
