//! Parse, edit, diff, serialize and reparse a realistic page

use crate::normalizer::{NormalizeOptions, Normalizer};
use crate::range_matcher::RangeMatcher;
use crate::stats::{DiffStats, EditKind};
use crate::{selser, DiffMark};
use selser_dom::{NodeId, SelserConfig, Tree};
use selser_markup::{parse, MarkupSerializer};

const PAGE: &str = "<h2>Title</h2>\n<p  class='odd'>Some [http://a.org|link] text.</p>\n\n{{infobox|x}}\n<ul>\n<li>one</li>\n<li>two</li>\n</ul>";

fn find_text(tree: &Tree, text: &str) -> NodeId {
    tree.descendants(tree.root())
        .find(|&id| tree.is_text(id) && tree.text(id) == Some(text))
        .unwrap()
}

fn assert_semantically_equal(edited: &Tree, output: &str) {
    let config = SelserConfig::default();
    let normalizer = Normalizer::new(&config, NormalizeOptions::default()).unwrap();
    let reparsed = parse(output).unwrap();
    assert_eq!(
        normalizer.normalize(&reparsed, reparsed.root()).unwrap(),
        normalizer.normalize(edited, edited.root()).unwrap()
    );
}

#[test]
fn test_untouched_page_round_trips() {
    let old = parse(PAGE).unwrap();
    let config = SelserConfig::default();
    let (output, result) = selser(&old, &old.clone(), PAGE, &MarkupSerializer::default(), &config);
    assert!(result.is_empty());
    assert_eq!(output.text, PAGE);

    let stats = DiffStats::collect(&old, &result, &config);
    assert_eq!(stats.edit_kind(), EditKind::NoOp);
}

#[test]
fn test_list_item_edit_touches_only_that_item() {
    let old = parse(PAGE).unwrap();
    let mut new = old.clone();
    let two = find_text(&new, "two");
    new.set_text(two, "three");

    let config = SelserConfig::default();
    let (output, result) = selser(&old, &new, PAGE, &MarkupSerializer::default(), &config);
    assert_eq!(output.text, PAGE.replace("two", "three"));
    assert_semantically_equal(&new, &output.text);

    let heading = new.children(new.root())[0];
    assert_eq!(result.mark(heading), Some(DiffMark::Unmodified));

    let stats = DiffStats::collect(&new, &result, &config);
    assert_eq!(stats.edit_kind(), EditKind::PageUpdate);
    assert!(stats.changed_templates.is_empty());
}

#[test]
fn test_deleted_paragraph() {
    let old = parse(PAGE).unwrap();
    let mut new = old.clone();
    let paragraph = new.children(new.root())[2];
    assert!(new.is_tag(paragraph, "p"));
    new.detach(paragraph);

    let config = SelserConfig::default();
    let (output, _) = selser(&old, &new, PAGE, &MarkupSerializer::default(), &config);
    assert!(output.text.starts_with("<h2>Title</h2>"));
    assert!(!output.text.contains("odd"));
    assert!(output.text.contains("{{infobox|x}}"));
    assert_semantically_equal(&new, &output.text);
}

#[test]
fn test_inserted_paragraph_keeps_odd_spacing() {
    let old = parse(PAGE).unwrap();
    let mut new = old.clone();
    let root = new.root();
    let paragraph = new.create_element("p");
    let text = new.create_text("fresh");
    new.append_child(paragraph, text);
    new.append_child(root, paragraph);

    let config = SelserConfig::default();
    let (output, _) = selser(&old, &new, PAGE, &MarkupSerializer::default(), &config);
    assert!(output.text.starts_with(PAGE));
    assert!(output.text.ends_with("\n<p>fresh</p>"));
    assert!(output.text.contains("<p  class='odd'>"));
    assert_semantically_equal(&new, &output.text);
}

#[test]
fn test_changed_source_maps_back_to_the_item() {
    let old = parse(PAGE).unwrap();
    let edited = PAGE.replace("one", "uno");
    let config = SelserConfig::default();
    let nodes = RangeMatcher::new(&config).changed_nodes(&old, PAGE, &edited);
    assert_eq!(nodes, vec![find_text(&old, "one")]);
}
