use super::parse_markup;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use selser_engine::{NormalizeOptions, Normalizer};
use selser_markup::MarkupParser;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// DOM file, or a markup file with `--markup`
    pub input: PathBuf,

    /// Parse the input as markup source first
    #[arg(long)]
    pub markup: bool,

    /// Keep structural attributes for a stricter comparison
    #[arg(long)]
    pub parsoid_only: bool,

    /// Keep inter-element whitespace as it is
    #[arg(long)]
    pub preserve_iew: bool,

    /// Also remove editor artefacts
    #[arg(long)]
    pub scrub: bool,
}

pub fn normalize(args: NormalizeArgs, config: &Config) -> Result<()> {
    let input = fs::read_to_string(&args.input)?;
    let options = NormalizeOptions {
        parsoid_only: args.parsoid_only || config.normalize.parsoid_only,
        preserve_iew: args.preserve_iew || config.normalize.preserve_iew,
        scrub: args.scrub || config.normalize.scrub,
    };
    let normalizer = Normalizer::new(&config.selser, options)?;

    let normalized = if args.markup {
        let parser = MarkupParser::new(config.selser.clone());
        let tree = parse_markup(&parser, &input, &args.input)?;
        normalizer.normalize(&tree, tree.root())?
    } else {
        normalizer.normalize_html(&input)?
    };

    println!("{}", normalized);
    Ok(())
}
