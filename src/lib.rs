//! XCSR core library.
//!
//! An XCSR learning classifier system: an online evolutionary reinforcement
//! learner that maintains a bounded population of interval-condition rules
//! over real-valued inputs, selects actions by fitness-weighted payoff
//! prediction, updates rule statistics from environmental feedback, and
//! evolves the rule population with a steady-state niche genetic algorithm.
//!
//! # Architecture
//!
//! The crate follows a clean separation between the learner core and the
//! experiment surface:
//!
//! - **Params** (`params`): every hyperparameter in one validated struct.
//!
//! - **Condition** (`condition`): interval predicates in one of three
//!   representations (center-spread, ordered-bound, unordered-bound) with
//!   matching, covering, mutation, and generality.
//!
//! - **Core sets** (`population`, `match_set`, `action_set`, `prediction`):
//!   the population [P], the match set [M] with covering, the action set [A]
//!   with the reinforcement update protocol, and the prediction array.
//!
//! - **GA** (`ga`): steady-state niche genetic algorithm with tournament or
//!   roulette selection, interval crossover, and subsumption.
//!
//! - **Controller** (`xcsr`): the explore/exploit/reward state machine with
//!   multi-step credit assignment through the previous action set.
//!
//! - **Persistence** (`csv`): the population CSV format.
//!
//! - **Experiment surface** (`environment`, `experiment`): the environment
//!   contract, seeded benchmark problems, and an iteration harness with
//!   moving-average CSV log streams.
//!
//! All state is per-learner and single-threaded; a learner seeded with
//! [`Xcsr::with_seed`] is bit-reproducible against a fixed environment trace.

pub mod action_set;
pub mod classifier;
pub mod condition;
pub mod csv;
pub mod environment;
pub mod experiment;
pub mod ga;
pub mod match_set;
pub mod params;
pub mod population;
pub mod prediction;
pub mod xcsr;

// --- Re-exports for ergonomic external use ---------------------------------

pub use params::{ConfigError, CrossoverMethod, Repr, XcsrParams};

pub use classifier::{Classifier, ClassifierPtr};
pub use condition::{Condition, Predicate};

pub use action_set::ActionSet;
pub use match_set::MatchSet;
pub use population::Population;
pub use prediction::PredictionArray;

pub use xcsr::{ProtocolError, Xcsr};

pub use csv::CsvError;

pub use environment::{CheckerboardEnvironment, Environment, RealMultiplexerEnvironment};

pub use experiment::{
    Experiment, ExperimentLogStream, ExperimentSettings, IterationLogWriter, IterationStats,
    SimpleMovingAverage,
};
