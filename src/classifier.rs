// src/classifier.rs
//
// A single rule: an interval condition, an advocated action, and the
// statistics the reinforcement and GA components maintain. Classifiers are
// macro-classifiers: `numerosity` counts how many identical micro-rules the
// record stands for, and `fitness` belongs to the macro as a whole.

use std::cell::RefCell;
use std::rc::Rc;

use crate::condition::Condition;
use crate::params::XcsrParams;

/// Shared handle into the population. Match sets and action sets hold these;
/// the population owns the canonical collection. Single-threaded by design.
pub type ClassifierPtr = Rc<RefCell<Classifier>>;

/// One macro-classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Classifier {
    /// Interval condition over the input dimensions.
    pub condition: Condition,
    /// Advocated action.
    pub action: usize,
    /// p: predicted payoff.
    pub prediction: f64,
    /// epsilon: mean absolute prediction error.
    pub epsilon: f64,
    /// F: fitness of the macro-classifier.
    pub fitness: f64,
    /// exp: number of parameter updates received.
    pub experience: u64,
    /// ts: last time a GA considered a set containing this rule.
    pub time_stamp: u64,
    /// as: running estimate of the action set sizes it has participated in.
    pub action_set_size: f64,
    /// Micro-classifier multiplicity; at least 1 while in the population.
    pub numerosity: u64,
}

impl Classifier {
    /// Create a fresh classifier with initial statistics from `params`.
    pub fn new(
        condition: Condition,
        action: usize,
        params: &XcsrParams,
        time_stamp: u64,
        action_set_size: f64,
    ) -> Self {
        Self {
            condition,
            action,
            prediction: params.initial_prediction,
            epsilon: params.initial_epsilon,
            fitness: params.initial_fitness,
            experience: 0,
            time_stamp,
            action_set_size,
            numerosity: 1,
        }
    }

    /// kappa: 1 if the rule is accurate (epsilon below the threshold), else
    /// a power-law fall-off in the relative error.
    pub fn accuracy(&self, params: &XcsrParams) -> f64 {
        if self.epsilon < params.epsilon_zero {
            1.0
        } else {
            params.alpha * (self.epsilon / params.epsilon_zero).powf(-params.nu)
        }
    }

    /// Whether this rule is experienced and accurate enough to subsume others.
    pub fn is_subsumer(&self, params: &XcsrParams) -> bool {
        self.experience > params.theta_sub && self.epsilon < params.epsilon_zero
    }

    /// Whether this rule subsumes `other`: same action, subsumer status, and
    /// a strictly more general condition.
    pub fn does_subsume(&self, other: &Classifier, params: &XcsrParams) -> bool {
        self.action == other.action
            && self.is_subsumer(params)
            && self.condition.is_more_general_than(&other.condition)
    }

    /// Identity for duplicate suppression: same condition and action.
    pub fn is_duplicate_of(&self, other: &Classifier) -> bool {
        self.action == other.action && self.condition == other.condition
    }

    /// Fitness of one micro-copy.
    pub fn fitness_per_num(&self) -> f64 {
        self.fitness / self.numerosity as f64
    }
}
