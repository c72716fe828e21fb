// src/xcsr.rs
//
// The XCSR controller: ties match set formation, action selection, the
// delayed-reward update cycle, and the GA together behind the operations the
// experiment driver consumes (explore / exploit / reward).
//
// The learner is a strict state machine: a selection call moves it from Idle
// to Await-reward, a reward call moves it back. Multi-step credit assignment
// keeps the previous action set [A]-1 alive for exactly one environment step
// and feeds it the discounted bootstrap target when the next reward arrives.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::action_set::ActionSet;
use crate::classifier::{Classifier, ClassifierPtr};
use crate::csv::{self, CsvError};
use crate::match_set::MatchSet;
use crate::params::{ConfigError, XcsrParams};
use crate::population::Population;
use crate::prediction::PredictionArray;

/// Misuse of the call protocol. The learner's state is left unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// A selection call arrived while a reward for the previous selection is
    /// still outstanding.
    SelectionPending,
    /// A reward call arrived with no selection awaiting one.
    RewardNotExpected,
    /// The situation vector was empty.
    EmptySituation,
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::SelectionPending => {
                write!(f, "reward() must be called before the next action selection")
            }
            ProtocolError::RewardNotExpected => {
                write!(f, "reward() called without a pending action selection")
            }
            ProtocolError::EmptySituation => {
                write!(f, "the situation vector must not be empty")
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

enum SelectionMode {
    /// Epsilon-greedy over the prediction array.
    Explore,
    /// Deterministic argmax, ties to the lowest action index.
    Greedy,
}

/// One XCSR learner.
///
/// All state changes happen within `explore`, `exploit`, or `reward` and
/// complete before the call returns. A single seeded generator drives every
/// stochastic decision, so a learner is bit-reproducible given the same seed
/// and the same environment trace.
pub struct Xcsr {
    params: XcsrParams,
    rng: ChaCha8Rng,
    population: Population,
    action_set: ActionSet,
    prev_action_set: ActionSet,
    available_actions: BTreeSet<usize>,
    time_stamp: u64,
    expects_reward: bool,
    prev_reward: f64,
    /// max_a P(a) of the most recent selection; the bootstrap source for the
    /// previous action set's target.
    max_prediction: f64,
    prediction: f64,
    predictions: BTreeMap<usize, f64>,
    covering_performed: bool,
}

impl Xcsr {
    /// Create a learner over `available_actions`. Fails if the parameters or
    /// the action set are invalid. The random stream is seeded with 0; use
    /// [`Xcsr::with_seed`] for anything but throwaway runs.
    pub fn new(
        available_actions: impl IntoIterator<Item = usize>,
        params: XcsrParams,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        let available_actions: BTreeSet<usize> = available_actions.into_iter().collect();
        if available_actions.is_empty() {
            return Err(ConfigError::EmptyActionSet);
        }
        Ok(Self {
            params,
            rng: ChaCha8Rng::seed_from_u64(0),
            population: Population::new(),
            action_set: ActionSet::new(),
            prev_action_set: ActionSet::new(),
            available_actions,
            time_stamp: 0,
            expects_reward: false,
            prev_reward: 0.0,
            max_prediction: 0.0,
            prediction: 0.0,
            predictions: BTreeMap::new(),
            covering_performed: false,
        })
    }

    /// Reseed the learner's random stream.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Select an action for `situation` with exploration enabled.
    /// `reward` must be called before the next selection.
    pub fn explore(&mut self, situation: &[f64]) -> Result<usize, ProtocolError> {
        self.select(situation, SelectionMode::Explore)
    }

    /// Select an action greedily.
    ///
    /// With `update = true` the call participates in the learning cycle
    /// exactly like `explore` (reward must follow). With `update = false`
    /// the call is a read-only probe: no covering, no pending reward.
    pub fn exploit(&mut self, situation: &[f64], update: bool) -> Result<usize, ProtocolError> {
        if update {
            self.select(situation, SelectionMode::Greedy)
        } else {
            self.probe(situation)
        }
    }

    /// Feed back the environment's reward for the pending selection.
    ///
    /// On end-of-problem the current action set receives the raw reward and
    /// the previous one (if any) its discounted bootstrap target, then the
    /// carry-over is cleared. Otherwise the current set is deferred into
    /// [A]-1 together with the reward.
    pub fn reward(&mut self, value: f64, is_end_of_problem: bool) -> Result<(), ProtocolError> {
        if !self.expects_reward {
            return Err(ProtocolError::RewardNotExpected);
        }

        if is_end_of_problem {
            if !self.prev_action_set.is_empty() {
                let target = self.prev_reward + self.params.gamma * self.max_prediction;
                self.prev_action_set
                    .update(target, &mut self.population, &self.params);
            }
            self.action_set
                .update(value, &mut self.population, &self.params);
            self.action_set.run_ga_if_due(
                &mut self.population,
                self.time_stamp,
                &self.params,
                &self.available_actions,
                &mut self.rng,
            );
            self.action_set.clear();
            self.prev_action_set.clear();
        } else {
            if !self.prev_action_set.is_empty() {
                let target = self.prev_reward + self.params.gamma * self.max_prediction;
                self.prev_action_set
                    .update(target, &mut self.population, &self.params);
                self.prev_action_set.run_ga_if_due(
                    &mut self.population,
                    self.time_stamp,
                    &self.params,
                    &self.available_actions,
                    &mut self.rng,
                );
            }
            self.prev_action_set = std::mem::take(&mut self.action_set);
            self.prev_reward = value;
        }

        self.time_stamp += 1;
        self.expects_reward = false;
        Ok(())
    }

    fn select(
        &mut self,
        situation: &[f64],
        mode: SelectionMode,
    ) -> Result<usize, ProtocolError> {
        if self.expects_reward {
            return Err(ProtocolError::SelectionPending);
        }
        if situation.is_empty() {
            return Err(ProtocolError::EmptySituation);
        }

        let match_set = MatchSet::generate(
            &mut self.population,
            situation,
            self.time_stamp,
            &self.params,
            &self.available_actions,
            &mut self.rng,
        );
        self.covering_performed = match_set.is_covering_performed();

        let prediction_array = PredictionArray::new(match_set.members());
        let action = match mode {
            SelectionMode::Explore => prediction_array
                .select_action(self.params.explore_probability, &mut self.rng),
            SelectionMode::Greedy => prediction_array.greedy_action(),
        }
        .expect("match set is never empty after covering");

        self.prediction = prediction_array
            .prediction_for(action)
            .unwrap_or(self.params.initial_prediction);
        self.predictions = prediction_array.predictions().clone();
        self.max_prediction = prediction_array.max();

        self.action_set.generate(&match_set, action);
        self.expects_reward = true;

        Ok(action)
    }

    /// Read-only greedy probe: no covering, no state machine transition.
    /// With no matching rule at all, predictions fall back to the initial
    /// prediction and the action is chosen uniformly at random.
    fn probe(&mut self, situation: &[f64]) -> Result<usize, ProtocolError> {
        if situation.is_empty() {
            return Err(ProtocolError::EmptySituation);
        }

        let matching: Vec<ClassifierPtr> = self
            .population
            .iter()
            .filter(|cl| cl.borrow().condition.matches(situation))
            .cloned()
            .collect();

        if matching.is_empty() {
            self.covering_performed = true;
            self.prediction = self.params.initial_prediction;
            self.predictions = self
                .available_actions
                .iter()
                .map(|&a| (a, self.params.initial_prediction))
                .collect();
            let index = self.rng.gen_range(0..self.available_actions.len());
            let action = *self
                .available_actions
                .iter()
                .nth(index)
                .unwrap_or_else(|| unreachable!("available actions are non-empty"));
            return Ok(action);
        }

        self.covering_performed = false;
        let prediction_array = PredictionArray::new(&matching);
        let action = prediction_array
            .greedy_action()
            .unwrap_or_else(|| unreachable!("matching set is non-empty"));
        self.prediction = prediction_array
            .prediction_for(action)
            .unwrap_or(self.params.initial_prediction);
        self.predictions = prediction_array.predictions().clone();
        // max_prediction is deliberately left alone: it belongs to the last
        // learning selection and feeds the pending bootstrap target.
        Ok(action)
    }

    /// Prediction value behind the most recent action decision.
    pub fn prediction(&self) -> f64 {
        self.prediction
    }

    /// Prediction of `action` at the most recent decision; None when the
    /// action was absent from the match set.
    pub fn prediction_for(&self, action: usize) -> Option<f64> {
        self.predictions.get(&action).copied()
    }

    /// Whether the most recent action decision required covering.
    pub fn is_covering_performed(&self) -> bool {
        self.covering_performed
    }

    /// Read-only view of the population.
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Number of macro-classifiers in the population.
    pub fn population_size(&self) -> usize {
        self.population.len()
    }

    /// Sum of numerosities across the population.
    pub fn numerosity_sum(&self) -> u64 {
        self.population.numerosity_sum()
    }

    /// All population members matching `situation`, as plain records.
    pub fn get_matching_classifiers(&self, situation: &[f64]) -> Vec<Classifier> {
        self.population
            .iter()
            .filter(|cl| cl.borrow().condition.matches(situation))
            .map(|cl| cl.borrow().clone())
            .collect()
    }

    /// Replace the population. Clears both action sets and any pending
    /// reward expectation. With `sync_time_stamp` the learner's clock jumps
    /// to the newest time stamp in the new population.
    pub fn set_population(&mut self, classifiers: Vec<Classifier>, sync_time_stamp: bool) {
        self.population.clear();
        for classifier in classifiers {
            self.population.insert_or_merge(classifier);
        }
        self.action_set.clear();
        self.prev_action_set.clear();
        self.expects_reward = false;
        if sync_time_stamp {
            self.time_stamp = self
                .population
                .iter()
                .map(|cl| cl.borrow().time_stamp)
                .max()
                .unwrap_or(0);
        }
    }

    /// Write the population as CSV (header plus one row per macro-classifier).
    pub fn save_population_csv(&self, path: impl AsRef<Path>) -> Result<(), CsvError> {
        csv::save_population(path, &self.population, self.params.repr)
    }

    /// Load a population CSV, replacing the current population.
    ///
    /// The load is all-or-nothing: on any parse error the learner is left
    /// untouched. With `init_classifier_variables` the experience, time
    /// stamp, and action set size are zeroed and prediction, error, and
    /// fitness are reset to their initial values.
    pub fn load_population_csv(
        &mut self,
        path: impl AsRef<Path>,
        init_classifier_variables: bool,
        sync_time_stamp: bool,
    ) -> Result<(), CsvError> {
        let mut classifiers = csv::load_population(path, self.params.repr)?;
        if init_classifier_variables {
            for cl in &mut classifiers {
                cl.prediction = self.params.initial_prediction;
                cl.epsilon = self.params.initial_epsilon;
                cl.fitness = self.params.initial_fitness;
                cl.experience = 0;
                cl.time_stamp = 0;
                cl.action_set_size = 0.0;
            }
        }
        self.set_population(classifiers, sync_time_stamp);
        Ok(())
    }

    /// Halt the creation of novelty: crossover and mutation rates drop to
    /// zero, leaving only deletion and subsumption pressure.
    pub fn switch_to_condensation_mode(&mut self) {
        self.params.condense();
    }

    /// The learner's GA clock.
    pub fn time_stamp(&self) -> u64 {
        self.time_stamp
    }

    /// Current hyperparameters.
    pub fn params(&self) -> &XcsrParams {
        &self.params
    }

    /// Available actions.
    pub fn available_actions(&self) -> &BTreeSet<usize> {
        &self.available_actions
    }
}
