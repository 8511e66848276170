use super::parse_markup;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use selser_dom::{to_html, HtmlOptions, NodeId, Tree};
use selser_engine::{wikitext_ranges_differ, RangeMatcher};
use selser_markup::MarkupParser;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RangesArgs {
    /// Old revision of the source
    pub old: PathBuf,

    /// New revision of the source
    pub new: PathBuf,
}

/// Show which nodes of the old revision a textual change touches
pub fn ranges(args: RangesArgs, config: &Config) -> Result<()> {
    let old_source = fs::read_to_string(&args.old)?;
    let new_source = fs::read_to_string(&args.new)?;

    let Some(diff) = wikitext_ranges_differ(&old_source, &new_source) else {
        println!("{} Sources are identical", "✓".green());
        return Ok(());
    };

    println!(
        "Changed: old {}..{}, new {}..{}",
        diff.old.start, diff.old.end, diff.new.start, diff.new.end
    );

    let parser = MarkupParser::new(config.selser.clone());
    let tree = parse_markup(&parser, &old_source, &args.old)?;
    let nodes = RangeMatcher::new(&config.selser).find_overlapping(&tree, diff.old);

    if nodes.is_empty() {
        println!("   No nodes overlap the change");
    }
    for id in nodes {
        println!("   {} {}", "•".cyan(), describe(&tree, id));
    }
    Ok(())
}

fn describe(tree: &Tree, id: NodeId) -> String {
    let range = tree
        .provenance(id)
        .and_then(|p| p.valid_dsr())
        .map(|dsr| format!("[{}..{}]", dsr.start, dsr.end))
        .unwrap_or_else(|| "[?]".to_string());
    let html = to_html(tree, id, &HtmlOptions::default());
    format!("{} {}", range.dimmed(), html)
}
