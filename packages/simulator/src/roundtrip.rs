//! Round-trip harness: parse, edit randomly, serialize selectively, reparse
//! and compare normalized forms

use crate::apply::{ChangeApplier, ROOT_COMMENT};
use crate::change_tree::{is_root_comment, root_comment, ChangeList, DisplayChanges};
use crate::error::{SimulatorError, SimulatorResult};
use crate::generate::{ChangeGenerator, Generated};
use selser_dom::{NodeSerializer, SelserConfig, SourceParser, Tree};
use selser_engine::{selser, DiffStats, NormalizeOptions, Normalizer};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub title: String,
    #[serde(default)]
    pub seed: String,
    pub source: String,
}

impl TestCase {
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            seed: String::new(),
            source: source.into(),
        }
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    /// PRNG seed for generation and application
    pub fn prng_seed(&self) -> String {
        format!("{}{}", self.seed, self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum RunOutcome {
    Pass,
    Fail { expected: String, actual: String },
    /// No fresh change tree could be produced; not counted as pass or fail
    DuplicateChange,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub changes: ChangeList,
    #[serde(flatten)]
    pub outcome: RunOutcome,
    pub output: Option<String>,
    pub stats: DiffStats,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundTripReport {
    pub title: String,
    pub runs: Vec<RunResult>,
    pub passed: usize,
    pub failed: usize,
    pub duplicates: usize,
    pub stats: DiffStats,
}

impl RoundTripReport {
    fn record(&mut self, run: RunResult) {
        match run.outcome {
            RunOutcome::Pass => self.passed += 1,
            RunOutcome::Fail { .. } => self.failed += 1,
            RunOutcome::DuplicateChange => self.duplicates += 1,
        }
        self.stats.merge(&run.stats);
        self.runs.push(run);
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

pub struct RoundTripHarness<'a, P: SourceParser, S: NodeSerializer> {
    parser: &'a P,
    serializer: &'a S,
    config: &'a SelserConfig,
    normalizer: Normalizer<'a>,
}

impl<'a, P: SourceParser, S: NodeSerializer> RoundTripHarness<'a, P, S> {
    pub fn new(
        parser: &'a P,
        serializer: &'a S,
        config: &'a SelserConfig,
        options: NormalizeOptions,
    ) -> SimulatorResult<Self> {
        Ok(Self {
            parser,
            serializer,
            config,
            normalizer: Normalizer::new(config, options)?,
        })
    }

    /// Run up to `runs` distinct random edits of `test`
    pub fn run(&self, test: &TestCase, runs: usize) -> SimulatorResult<RoundTripReport> {
        let old = self.parse(&test.source, "original")?;
        let seed = test.prng_seed();
        let mut report = RoundTripReport {
            title: test.title.clone(),
            ..RoundTripReport::default()
        };
        let mut tried: Vec<ChangeList> = Vec::new();

        for _ in 0..runs {
            let generated = ChangeGenerator::new(self.config, &seed).generate(&old, &tried);
            let changes = match generated {
                Generated::Change(changes) => changes,
                Generated::Unavailable { attempts } => {
                    debug!(title = %test.title, attempts, "no unique change left");
                    report.record(RunResult {
                        changes: Vec::new(),
                        outcome: RunOutcome::DuplicateChange,
                        output: None,
                        stats: DiffStats::default(),
                    });
                    break;
                }
            };
            tried.push(changes.clone());
            let run = self.run_changes(test, &old, changes)?;
            report.record(run);
        }

        Ok(report)
    }

    /// The root-level edit: a comment appended to the root must leave the
    /// original source untouched
    pub fn run_root_edit(&self, test: &TestCase) -> SimulatorResult<RunResult> {
        let old = self.parse(&test.source, "original")?;
        self.run_changes(test, &old, root_comment())
    }

    /// Apply `changes` to a copy of `old` and check the round trip
    pub fn run_changes(&self, test: &TestCase, old: &Tree, changes: ChangeList) -> SimulatorResult<RunResult> {
        let mut edited = old.clone();
        ChangeApplier::new(self.config, &test.prng_seed()).apply(&mut edited, &changes)?;

        let (output, diff) = selser(old, &edited, &test.source, self.serializer, self.config);
        let stats = DiffStats::collect(&edited, &diff, self.config);

        let outcome = if is_root_comment(&changes) {
            let stripped = output.text.replace(&format!("<!--{}-->", ROOT_COMMENT), "");
            if stripped == test.source {
                RunOutcome::Pass
            } else {
                RunOutcome::Fail {
                    expected: test.source.clone(),
                    actual: stripped,
                }
            }
        } else {
            let reparsed = self.parse(&output.text, "serialized")?;
            let expected = self.normalizer.normalize(&edited, edited.root())?;
            let actual = self.normalizer.normalize(&reparsed, reparsed.root())?;
            if expected == actual {
                RunOutcome::Pass
            } else {
                RunOutcome::Fail { expected, actual }
            }
        };

        match &outcome {
            RunOutcome::Fail { .. } => warn!(
                title = %test.title,
                changes = %DisplayChanges(&changes),
                "round trip changed the document"
            ),
            _ => debug!(title = %test.title, changes = %DisplayChanges(&changes), "round trip passed"),
        }

        Ok(RunResult {
            changes,
            outcome,
            output: Some(output.text),
            stats,
        })
    }

    fn parse(&self, source: &str, stage: &'static str) -> SimulatorResult<Tree> {
        self.parser
            .parse_source(source)
            .map_err(|e| SimulatorError::parse(stage, e))
    }
}
