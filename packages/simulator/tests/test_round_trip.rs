use proptest::prelude::*;
use selser_dom::SelserConfig;
use selser_engine::NormalizeOptions;
use selser_markup::{MarkupParser, MarkupSerializer};
use selser_simulator::{RoundTripHarness, RunOutcome, TestCase};

const BLOCKS: &[&str] = &[
    "<p>plain words</p>",
    "<p>a [http://example.org|link] here</p>",
    "<h2>Heading</h2>",
    "<ul>\n<li>first</li>\n<li>second</li>\n</ul>",
    "<div>\n<p>nested</p>\n</div>",
    "<p>call {{tpl|arg}} inline</p>",
    "<p><b>bold</b> and <i>italic</i></p>",
    "<dl>\n<dd>definition</dd>\n</dl>",
];

fn document() -> impl Strategy<Value = String> {
    proptest::collection::vec(0..BLOCKS.len(), 1..6).prop_map(|picks| {
        picks
            .into_iter()
            .map(|i| BLOCKS[i])
            .collect::<Vec<_>>()
            .join("\n")
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn random_edits_round_trip(source in document(), seed in "[a-z0-9]{1,8}") {
        let parser = MarkupParser::default();
        let serializer = MarkupSerializer::default();
        let config = SelserConfig::default();
        let harness = RoundTripHarness::new(&parser, &serializer, &config, NormalizeOptions::default()).unwrap();

        let test = TestCase::new("generated", source).with_seed(seed);
        let report = harness.run(&test, 3).unwrap();
        for run in &report.runs {
            prop_assert!(
                !matches!(run.outcome, RunOutcome::Fail { .. }),
                "changes {:?} produced {:?}",
                run.changes,
                run.output
            );
        }

        let root = harness.run_root_edit(&test).unwrap();
        prop_assert_eq!(root.outcome, RunOutcome::Pass);
    }
}
