use super::parse_markup;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use selser_dom::{to_html, HtmlOptions};
use selser_markup::MarkupParser;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Markup source file
    pub input: PathBuf,

    /// Leave provenance records out of the output
    #[arg(long)]
    pub no_provenance: bool,
}

/// Print the DOM of a source file, with provenance stored as JSON attributes
pub fn parse(args: ParseArgs, config: &Config) -> Result<()> {
    let source = fs::read_to_string(&args.input)?;
    let parser = MarkupParser::new(config.selser.clone());
    let tree = parse_markup(&parser, &source, &args.input)?;

    let options = if args.no_provenance {
        HtmlOptions::default()
    } else {
        HtmlOptions::with_provenance(&config.selser)
    };
    println!("{}", to_html(&tree, tree.root(), &options));
    Ok(())
}
