//! # Selser Simulator
//!
//! Reproducible random edits for exercising selective serialization. A
//! [`ChangeGenerator`] draws a [`ChangeTree`] from a seeded [`Alea`]
//! sequence, a [`ChangeApplier`] performs it on a copy of the parsed
//! document, and the [`RoundTripHarness`] checks that the selectively
//! serialized result reparses to the edited document.

pub mod alea;
pub mod apply;
pub mod change_tree;
pub mod error;
pub mod generate;
pub mod roundtrip;

pub use alea::{Alea, AleaState};
pub use apply::{ChangeApplier, ROOT_COMMENT};
pub use change_tree::{ChangeKind, ChangeList, ChangeTree, DisplayChanges};
pub use error::{SimulatorError, SimulatorResult};
pub use generate::{ChangeGenerator, Generated};
pub use roundtrip::{RoundTripHarness, RoundTripReport, RunOutcome, RunResult, TestCase};
