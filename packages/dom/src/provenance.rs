//! Source provenance attached to parsed nodes.
//!
//! A [`Dsr`] pins a node to the byte range it was parsed from. The open and
//! close widths, when known, split that range into the node's own opening
//! markup, its content, and its closing markup:
//!
//! ```text
//! source:  ... [href|label] ...
//!              ^     ^    ^^
//!          start     |    |end
//!      start+open ---+    +--- end-close
//! ```

use crate::error::{DomError, DomResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Data-source range: `[start, end)` plus the widths of the opening and
/// closing markup. Persisted as a four element JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DsrTuple", into = "DsrTuple")]
pub struct Dsr {
    pub start: usize,
    pub end: usize,
    pub open_width: Option<usize>,
    pub close_width: Option<usize>,
}

type DsrTuple = (usize, usize, Option<usize>, Option<usize>);

impl From<DsrTuple> for Dsr {
    fn from((start, end, open_width, close_width): DsrTuple) -> Self {
        Self {
            start,
            end,
            open_width,
            close_width,
        }
    }
}

impl From<Dsr> for DsrTuple {
    fn from(dsr: Dsr) -> Self {
        (dsr.start, dsr.end, dsr.open_width, dsr.close_width)
    }
}

impl Dsr {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            open_width: None,
            close_width: None,
        }
    }

    pub fn with_widths(start: usize, end: usize, open: usize, close: usize) -> Self {
        Self {
            start,
            end,
            open_width: Some(open),
            close_width: Some(close),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// A range is usable when it is ordered and its tag widths fit inside it
    pub fn is_valid(&self) -> bool {
        self.start <= self.end
            && self.open_width.unwrap_or(0) + self.close_width.unwrap_or(0) <= self.len()
    }

    /// Range covered by the node's children, if both widths are known
    pub fn inner_range(&self) -> Option<Range<usize>> {
        let open = self.open_width?;
        let close = self.close_width?;
        if !self.is_valid() {
            return None;
        }
        Some(self.start + open..self.end - close)
    }

    pub fn open_range(&self) -> Option<Range<usize>> {
        let open = self.open_width?;
        Some(self.start..self.start + open)
    }

    pub fn close_range(&self) -> Option<Range<usize>> {
        let close = self.close_width?;
        Some(self.end.checked_sub(close)?..self.end)
    }

    pub fn overlaps(&self, range: &Range<usize>) -> bool {
        self.start < range.end && range.start < self.end
    }

    pub fn contained_in(&self, range: &Range<usize>) -> bool {
        range.start <= self.start && self.end <= range.end
    }

    /// Slice the source this range was parsed from. `None` when the range is
    /// out of bounds or does not land on character boundaries.
    pub fn slice<'s>(&self, source: &'s str) -> Option<&'s str> {
        if !self.is_valid() {
            return None;
        }
        source.get(self.start..self.end)
    }
}

/// Surface syntax variant that produced an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stx {
    /// Literal `<tag>` markup
    Html,
    /// Short bracket form whose target doubles as its content
    Simple,
    /// Bracket form with an explicit label
    Piped,
}

impl Stx {
    /// Whether the opening markup is derived from the node's content, so that
    /// the node cannot keep its original tags once its children change
    pub fn is_content_derived(self) -> bool {
        matches!(self, Stx::Simple)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Provenance record, persisted in the `data-parsoid` attribute
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsr: Option<Dsr>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stx: Option<Stx>,

    /// The closing markup was implied rather than written
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_inserted_end: bool,

    /// Content relocated by table repair
    #[serde(default, skip_serializing_if = "is_false")]
    pub fostered: bool,
}

impl Provenance {
    pub fn with_dsr(dsr: Dsr) -> Self {
        Self {
            dsr: Some(dsr),
            ..Self::default()
        }
    }

    pub fn stx(mut self, stx: Stx) -> Self {
        self.stx = Some(stx);
        self
    }

    /// The source range, only when it is usable
    pub fn valid_dsr(&self) -> Option<Dsr> {
        self.dsr.filter(Dsr::is_valid)
    }

    pub fn from_json(json: &str) -> DomResult<Self> {
        serde_json::from_str(json).map_err(|e| DomError::invalid_provenance(json, e))
    }

    pub fn to_json(&self) -> DomResult<String> {
        serde_json::to_string(self).map_err(|e| DomError::invalid_provenance("", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dsr_json_shape() {
        let dp = Provenance::with_dsr(Dsr::with_widths(3, 6, 1, 1)).stx(Stx::Simple);
        assert_eq!(dp.to_json().unwrap(), r#"{"dsr":[3,6,1,1],"stx":"simple"}"#);
    }

    #[test]
    fn test_load_with_null_widths_and_flags() {
        let dp = Provenance::from_json(r#"{"dsr":[0,10,null,null],"autoInsertedEnd":true,"fostered":true}"#)
            .unwrap();
        assert_eq!(dp.dsr, Some(Dsr::new(0, 10)));
        assert!(dp.auto_inserted_end);
        assert!(dp.fostered);
        assert_eq!(dp.stx, None);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(Provenance::from_json("{\"dsr\": [1]}").is_err());
        assert!(Provenance::from_json("not json").is_err());
    }

    #[test]
    fn test_validity() {
        assert!(Dsr::with_widths(0, 5, 2, 3).is_valid());
        assert!(!Dsr::with_widths(0, 4, 2, 3).is_valid());
        assert!(!Dsr::new(6, 3).is_valid());

        let dp = Provenance::with_dsr(Dsr::new(6, 3));
        assert_eq!(dp.valid_dsr(), None);
    }

    #[test]
    fn test_inner_range_and_slice() {
        let src = "ab[x|y]cd";
        let dsr = Dsr::with_widths(2, 7, 3, 1);
        assert_eq!(dsr.slice(src), Some("[x|y]"));
        assert_eq!(dsr.inner_range(), Some(5..6));
        assert_eq!(dsr.open_range(), Some(2..5));
        assert_eq!(dsr.close_range(), Some(6..7));

        assert_eq!(Dsr::new(4, 40).slice(src), None);
        assert_eq!(Dsr::new(0, 4).inner_range(), None);
    }

    #[test]
    fn test_slice_respects_char_boundaries() {
        let src = "é!";
        assert_eq!(Dsr::new(0, 1).slice(src), None);
        assert_eq!(Dsr::new(0, 2).slice(src), Some("é"));
    }
}
