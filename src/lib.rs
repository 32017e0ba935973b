//! # algebra-quest
//! Generates puzzles about made-up binary operations. Every level gives
//! one new operation a property (commutativity, some twisted kind of
//! associativity, an identity...), shows an example of it and asks the
//! player to find expressions equal to a question.
//!
//! Which expressions are equal is decided by an e-graph: the generator
//! seeds it with terms, saturates it with the rewrite rule of every
//! level's property and samples random expressions out of the resulting
//! classes. Answers are validated by matching them against the class of
//! the question.
//!
//! ```no_run
//! use algebra_quest::{QuestGenerator, Seed};
//!
//! let quest = QuestGenerator::default().generate(Seed::new(42)).unwrap();
//! for level in &quest.levels {
//!     println!("{}\n{} = ?", level.formatted_hint(), level.question.formatted);
//! }
//! ```
pub mod cli;
pub mod egraph;
pub mod extract;
pub mod game;
pub mod parse;
pub mod pattern;
pub mod properties;
pub mod quest;
pub mod random;
pub mod runner;
pub mod seed;
mod unionfind;
pub mod util;

use thiserror::Error;

pub use egraph::{EClass, EGraph, Term};
pub use extract::{AstNode, Extractor, Hint};
pub use game::{Answer, Frontend, Game, Verdict};
pub use parse::{parse_expr, parse_pattern, parse_rewrite, ParseError};
pub use pattern::{Pattern, Rewrite, Subst};
pub use quest::{GenerationError, GenerationReport, Level, Quest, QuestConfig, QuestGenerator};
pub use random::Random;
pub use runner::{RunReport, Runner, RunnerLimits, StopReason};
pub use seed::{Seed, SeedError};
pub use unionfind::{Id, UnionFind};
pub use util::Symbol;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error("Gave up after {attempts} attempts, the last one failed with: {last}")]
    RetriesExhausted {
        attempts: usize,
        last: GenerationError,
    },
    #[error("No quest has been generated yet")]
    NotGenerated,
    #[error("The game is over")]
    GameOver,
    #[error("There is no suggestion {index}, there are {len}")]
    SuggestionOutOfRange { index: usize, len: usize },
}
