pub mod fuzz;
pub mod normalize;
pub mod parse;
pub mod ranges;
pub mod selser;

pub use fuzz::{fuzz, FuzzArgs};
pub use normalize::{normalize, NormalizeArgs};
pub use parse::{parse, ParseArgs};
pub use ranges::{ranges, RangesArgs};
pub use selser::{selser, SelserArgs};

use anyhow::Result;
use selser_dom::Tree;
use selser_markup::{format_error, MarkupParser};
use std::path::Path;

/// Parse a markup file, rendering parse errors with source context
pub(crate) fn parse_markup(parser: &MarkupParser, source: &str, path: &Path) -> Result<Tree> {
    parser.parse(source).map_err(|err| {
        anyhow::anyhow!(
            "Failed to parse {}\n{}",
            path.display(),
            format_error(source, &path.to_string_lossy(), &err)
        )
    })
}
