use selser_dom::{to_html, HtmlOptions, SelserConfig};
use selser_markup::{parse, MarkupSerializer};

const PAGE: &str = r#"<h2>History</h2>
<p>The [[Main Page|main page]] links to [http://example.org|an example] and
{{cite|web|url=x}} with &copy; notes.</p>
<!-- editor note -->
<ul>
<li>first [a]</li>
<li>second
</ul>
[[File:Map.png|A <i>map</i>]]
"#;

#[test]
fn test_page_parses_without_gaps() {
    let tree = parse(PAGE).unwrap();
    let root = tree.root();

    let mut pos = 0;
    for &child in tree.children(root) {
        let dsr = tree.provenance(child).and_then(|p| p.dsr).unwrap();
        assert_eq!(dsr.start, pos);
        pos = dsr.end;
    }
    assert_eq!(pos, PAGE.len());
}

#[test]
fn test_unclosed_list_item_is_flagged() {
    let tree = parse(PAGE).unwrap();
    let items: Vec<_> = tree
        .descendants(tree.root())
        .filter(|&id| tree.is_tag(id, "li"))
        .collect();
    assert_eq!(items.len(), 2);
    assert!(!tree.provenance(items[0]).unwrap().auto_inserted_end);
    assert!(tree.provenance(items[1]).unwrap().auto_inserted_end);
}

#[test]
fn test_regenerated_page_reparses_to_same_dom() {
    let serializer = MarkupSerializer::default();
    let tree = parse(PAGE).unwrap();
    let regenerated = serializer.serialize_document(&tree);
    let reparsed = parse(&regenerated).unwrap();

    let options = HtmlOptions::default();
    let strip_ids = |html: String| html.replace("#mwt1", "");
    assert_eq!(
        strip_ids(to_html(&tree, tree.root(), &options)),
        strip_ids(to_html(&reparsed, reparsed.root(), &options))
    );
}

#[test]
fn test_dom_output_carries_provenance() {
    let tree = parse("[a]").unwrap();
    let html = to_html(
        &tree,
        tree.root(),
        &HtmlOptions::with_provenance(&SelserConfig::default()),
    );
    assert_eq!(
        html,
        "<body data-parsoid=\"{&quot;dsr&quot;:[0,3,0,0]}\"><a href=\"a\" data-parsoid=\"{&quot;dsr&quot;:[0,3,1,1],&quot;stx&quot;:&quot;simple&quot;}\">a</a></body>"
    );
}
