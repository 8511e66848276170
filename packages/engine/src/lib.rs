//! # Selser Engine
//!
//! Provenance diff and selective reserialization.
//!
//! - [`normalizer`]: canonical DOM form for semantic comparison
//! - [`differ`]: marks every node of an edited tree against the original parse
//! - [`selser`]: splices verbatim source with regenerated markup
//! - [`range_matcher`]: maps changed source ranges back to tree nodes
//! - [`stats`]: per-run diff statistics

pub mod differ;
pub mod error;
pub mod normalizer;
pub mod range_matcher;
pub mod selser;
pub mod signature;
pub mod stats;
pub mod units;

#[cfg(test)]
mod tests_pipeline;

pub use differ::{diff, DiffMark, DiffResult, DomDiffer, DIFF_ATTRIBUTE};
pub use error::{EngineError, EngineResult};
pub use normalizer::{normalize_html, NormalizeOptions, Normalizer};
pub use range_matcher::{wikitext_ranges_differ, RangeMatcher, SourceDiff};
pub use selser::{SelectiveSerializer, SelserOutput};
pub use stats::{DiffStats, EditKind};

use selser_dom::{NodeSerializer, SelserConfig, Tree};

/// Diff `new` against the original parse `old` of `source` and serialize it
/// selectively
pub fn selser<S: NodeSerializer>(
    old: &Tree,
    new: &Tree,
    source: &str,
    serializer: &S,
    config: &SelserConfig,
) -> (SelserOutput, DiffResult) {
    let result = DomDiffer::new(config).diff(old, new);
    let output = SelectiveSerializer::new(serializer, config).serialize(new, &result, source);
    (output, result)
}
