use proptest::prelude::*;
use selser_dom::{SelserConfig, Tree};
use selser_engine::{selser, DomDiffer, NormalizeOptions, Normalizer};
use selser_markup::{parse, MarkupSerializer};

const FRAGMENTS: &[&str] = &[
    "<p>word</p>",
    "<p>two  words</p>",
    "[word]",
    "[http://example.org|a label]",
    "{{tpl|word}}",
    "<b>bold</b>",
    " ",
    "\n",
    "<!-- note -->",
    "plain",
    "<ul>\n<li>item</li>\n</ul>",
    "&amp;",
    "<div>\n<p>nested</p>\n</div>",
];

fn document() -> impl Strategy<Value = String> {
    proptest::collection::vec(0..FRAGMENTS.len(), 1..12)
        .prop_map(|picks| picks.into_iter().map(|i| FRAGMENTS[i]).collect())
}

fn normalizer(config: &SelserConfig) -> Normalizer<'_> {
    Normalizer::new(config, NormalizeOptions::default()).unwrap()
}

/// Text nodes outside atomic wrappers and entity spans
fn editable_texts(tree: &Tree) -> Vec<selser_dom::NodeId> {
    tree.descendants(tree.root())
        .filter(|&id| tree.is_text(id))
        .filter(|&id| tree.ancestors(id).all(|a| tree.attr(a, "typeof").is_none()))
        .collect()
}

proptest! {
    #[test]
    fn normalization_is_idempotent(source in document()) {
        let config = SelserConfig::default();
        let normalizer = normalizer(&config);
        let tree = parse(&source).unwrap();
        let once = normalizer.normalize(&tree, tree.root()).unwrap();
        let twice = normalizer.normalize_html(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn self_diff_is_empty_and_verbatim(source in document()) {
        let config = SelserConfig::default();
        let old = parse(&source).unwrap();
        let result = DomDiffer::new(&config).diff(&old, &old.clone());
        prop_assert!(result.is_empty());

        let (output, _) = selser(&old, &old.clone(), &source, &MarkupSerializer::default(), &config);
        prop_assert_eq!(output.text, source);
    }

    #[test]
    fn text_edit_survives_reparse(source in document(), pick in any::<prop::sample::Index>()) {
        let config = SelserConfig::default();
        let old = parse(&source).unwrap();
        let texts = editable_texts(&old);
        prop_assume!(!texts.is_empty());

        let mut new = old.clone();
        new.set_text(texts[pick.index(texts.len())], "edited");
        let (output, _) = selser(&old, &new, &source, &MarkupSerializer::default(), &config);

        let normalizer = normalizer(&config);
        let reparsed = parse(&output.text).unwrap();
        prop_assert_eq!(
            normalizer.normalize(&reparsed, reparsed.root()).unwrap(),
            normalizer.normalize(&new, new.root()).unwrap()
        );
    }
}
