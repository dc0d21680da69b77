//! Capability tags and the conformance query consulted during attachment.
//!
//! A [`Kind`] names the shape of items a pipeline edge carries, beyond what
//! the Rust type alone can say (framed vs. unframed bytes, parsed vs. raw
//! lines). Founts may advertise an output kind and pumps may require an
//! input kind; when both ends declare one, the tube validates the pair
//! through a [`KindQuery`] before recording the attachment.

use std::collections::HashSet;
use std::fmt;

/// A capability tag naming what flows across a pipeline edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Kind(&'static str);

impl Kind {
    /// Create a new kind tag.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The tag's name.
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Answers whether an offered kind provides a required capability.
///
/// This is the seam between the tube engine and whatever capability
/// machinery the surrounding system uses: the tube consults the query
/// exactly once per attachment, and only when both ends declare a kind.
pub trait KindQuery {
    /// Return whether `offered` satisfies `required`.
    fn satisfies(&self, offered: Kind, required: Kind) -> bool;
}

/// Conformance by tag identity, the default query.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactMatch;

impl KindQuery for ExactMatch {
    fn satisfies(&self, offered: Kind, required: Kind) -> bool {
        offered == required
    }
}

/// A provides-relation registry for pipelines assembled from independently
/// compiled producers.
///
/// Identity always satisfies; beyond that, `register` records that one kind
/// provides another's capability. Registration is not transitive.
#[derive(Debug, Default, Clone)]
pub struct KindRegistry {
    provides: HashSet<(Kind, Kind)>,
}

impl KindRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `kind` provides `capability`.
    pub fn register(&mut self, kind: Kind, capability: Kind) {
        self.provides.insert((kind, capability));
    }
}

impl KindQuery for KindRegistry {
    fn satisfies(&self, offered: Kind, required: Kind) -> bool {
        offered == required || self.provides.contains(&(offered, required))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINES: Kind = Kind::new("lines");
    const UTF8_LINES: Kind = Kind::new("utf8-lines");
    const BYTES: Kind = Kind::new("bytes");

    #[test]
    fn test_exact_match() {
        assert!(ExactMatch.satisfies(LINES, LINES));
        assert!(!ExactMatch.satisfies(BYTES, LINES));
    }

    #[test]
    fn test_registry_identity_always_satisfies() {
        let registry = KindRegistry::new();
        assert!(registry.satisfies(LINES, LINES));
    }

    #[test]
    fn test_registry_provides() {
        let mut registry = KindRegistry::new();
        registry.register(UTF8_LINES, LINES);

        assert!(registry.satisfies(UTF8_LINES, LINES));
        // One-directional.
        assert!(!registry.satisfies(LINES, UTF8_LINES));
        assert!(!registry.satisfies(BYTES, LINES));
    }
}
