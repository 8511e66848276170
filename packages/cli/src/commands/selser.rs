use super::parse_markup;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use selser_dom::{to_html, HtmlOptions, HtmlReader};
use selser_engine::{DiffStats, DomDiffer, SelectiveSerializer};
use selser_markup::{MarkupParser, MarkupSerializer};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SelserArgs {
    /// Original markup source
    pub source: PathBuf,

    /// Edited DOM, as written by `selser parse`
    pub edited: PathBuf,

    /// Print diff and reuse statistics as JSON to stderr
    #[arg(long)]
    pub stats: bool,

    /// Print the edited DOM annotated with diff marks instead of markup
    #[arg(long)]
    pub annotate: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Statistics<'a> {
    reused_bytes: usize,
    regenerated_bytes: usize,
    demotions: usize,
    diff: &'a DiffStats,
}

/// Serialize an edited DOM back to markup, reusing the original source for
/// everything the edit did not touch
pub fn selser(args: SelserArgs, config: &Config) -> Result<()> {
    let source = fs::read_to_string(&args.source)?;
    let edited_html = fs::read_to_string(&args.edited)?;

    let parser = MarkupParser::new(config.selser.clone());
    let old = parse_markup(&parser, &source, &args.source)?;
    let mut edited = HtmlReader::new(&config.selser).parse(&edited_html)?;

    let result = DomDiffer::new(&config.selser).diff(&old, &edited);

    if args.annotate {
        result.annotate(&mut edited);
        println!("{}", to_html(&edited, edited.root(), &HtmlOptions::default()));
        return Ok(());
    }

    let serializer = MarkupSerializer::new(config.selser.clone());
    let output = SelectiveSerializer::new(&serializer, &config.selser).serialize(&edited, &result, &source);
    print!("{}", output.text);

    if args.stats {
        let diff = DiffStats::collect(&edited, &result, &config.selser);
        let statistics = Statistics {
            reused_bytes: output.reused_bytes,
            regenerated_bytes: output.regenerated_bytes,
            demotions: output.demotions,
            diff: &diff,
        };
        eprintln!();
        eprintln!("{}", serde_json::to_string_pretty(&statistics)?);
        if output.demotions > 0 {
            eprintln!(
                "{} {} node(s) had unusable source ranges and were regenerated",
                "Warning:".yellow().bold(),
                output.demotions
            );
        }
    }

    Ok(())
}
