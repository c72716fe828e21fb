// src/params.rs
//
// Hyperparameters for the XCSR learner.
// This is the single source of truth for every tunable the learner reads:
// reinforcement learning rates, fitness shaping, GA thresholds, and the
// interval-representation options specific to real-valued conditions.

use serde::{Deserialize, Serialize};

/// Interval representation used by classifier conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Repr {
    /// Center-spread: a predicate is (center, spread), interval [c-s, c+s).
    CenterSpread,
    /// Ordered-bound: a predicate is (lower, upper), swapped on read if needed.
    OrderedBound,
    /// Unordered-bound: a predicate is (p1, p2), interval [min, max), no swap.
    UnorderedBound,
}

impl Repr {
    /// Return a stable lowercase name for the representation (used in logs).
    pub fn as_str(&self) -> &'static str {
        match self {
            Repr::CenterSpread => "csr",
            Repr::OrderedBound => "obr",
            Repr::UnorderedBound => "ubr",
        }
    }

    /// Parse a representation name (case-insensitive). Returns None if unrecognized.
    pub fn parse(s: &str) -> Option<Repr> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csr" | "center-spread" | "center_spread" => Some(Repr::CenterSpread),
            "obr" | "ordered-bound" | "ordered_bound" => Some(Repr::OrderedBound),
            "ubr" | "unordered-bound" | "unordered_bound" => Some(Repr::UnorderedBound),
            _ => None,
        }
    }
}

/// Crossover operator applied to the flat 2L-scalar condition vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossoverMethod {
    /// Per-scalar swap with probability 0.5.
    Uniform,
    /// Single cut point; the tail segment is swapped.
    OnePoint,
    /// Two cut points; the middle segment is swapped.
    TwoPoint,
}

/// Hyperparameters of the XCSR learner.
///
/// Defaults follow the commonly recommended values for payoff ranges of
/// [0, 1000] and inputs normalised to [0, 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XcsrParams {
    /// N: maximum population size as a sum of numerosities (micro-classifiers).
    pub n: u64,
    /// beta: learning rate for prediction, error, fitness, and action set size.
    pub beta: f64,
    /// alpha: fall-off rate in the fitness evaluation.
    pub alpha: f64,
    /// epsilon_0: error threshold under which a classifier is fully accurate.
    pub epsilon_zero: f64,
    /// nu: exponent in the power function of the fitness evaluation.
    pub nu: f64,
    /// gamma: discount rate for multi-step problems.
    pub gamma: f64,
    /// theta_GA: GA is applied when the mean time stamp of an action set is
    /// at least this many steps old.
    pub theta_ga: u64,
    /// chi: probability of applying crossover to GA offspring.
    pub chi: f64,
    /// Crossover operator.
    pub crossover_method: CrossoverMethod,
    /// mu: per-scalar mutation probability (also the action mutation rate).
    pub mu: f64,
    /// theta_del: experience threshold above which low fitness inflates the
    /// deletion vote.
    pub theta_del: u64,
    /// delta: fraction of the population mean fitness below which the
    /// deletion vote is inflated.
    pub delta: f64,
    /// theta_sub: experience a classifier needs to act as a subsumer.
    pub theta_sub: u64,
    /// tau: tournament size fraction for GA selection (0 = roulette wheel).
    pub tau: f64,
    /// p_I: initial prediction of newly generated classifiers.
    pub initial_prediction: f64,
    /// epsilon_I: initial prediction error of newly generated classifiers.
    pub initial_epsilon: f64,
    /// F_I: initial fitness of newly generated classifiers.
    pub initial_fitness: f64,
    /// p_explr: probability of choosing the action uniformly at random
    /// during exploration.
    pub explore_probability: f64,
    /// theta_mna: minimal number of distinct actions required in a match set
    /// before covering stops (0 = number of available actions).
    pub theta_mna: u64,
    /// Whether GA offspring are tested for subsumption by their parents.
    pub do_ga_subsumption: bool,
    /// Whether action sets are collapsed into their most general accurate member.
    pub do_action_set_subsumption: bool,
    /// Whether mutation may also replace the action.
    pub do_action_mutation: bool,
    /// Whether to use the moyenne adaptive modifiee for early updates.
    pub use_mam: bool,
    /// s_0: maximum half-width of a covering interval.
    pub s0: f64,
    /// m: maximum absolute change of a condition scalar under mutation.
    pub m: f64,
    /// Interval representation of conditions.
    pub repr: Repr,
    /// Lower bound of the input domain.
    pub min_value: f64,
    /// Upper bound of the input domain (exclusive).
    pub max_value: f64,
    /// Whether to clip condition intervals to [min_value, max_value).
    /// Ignored for the center-spread representation.
    pub do_range_restriction: bool,
    /// Whether to truncate the covering half-width so the generated interval
    /// stays inside [min_value, max_value). Ignored for center-spread.
    pub do_covering_random_range_truncation: bool,
}

impl Default for XcsrParams {
    fn default() -> Self {
        Self {
            n: 10_000,
            beta: 0.2,
            alpha: 0.1,
            epsilon_zero: 10.0,
            nu: 5.0,
            gamma: 0.71,
            theta_ga: 25,
            chi: 0.8,
            crossover_method: CrossoverMethod::Uniform,
            mu: 0.04,
            theta_del: 20,
            delta: 0.1,
            theta_sub: 20,
            tau: 0.4,
            initial_prediction: 0.01,
            initial_epsilon: 0.01,
            initial_fitness: 0.01,
            explore_probability: 1.0,
            theta_mna: 0,
            do_ga_subsumption: true,
            do_action_set_subsumption: true,
            do_action_mutation: true,
            use_mam: true,
            s0: 0.25,
            m: 0.1,
            repr: Repr::OrderedBound,
            min_value: 0.0,
            max_value: 1.0,
            do_range_restriction: true,
            do_covering_random_range_truncation: false,
        }
    }
}

impl XcsrParams {
    /// Validate the parameter set. Called once at learner construction;
    /// an invalid configuration is unrecoverable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n == 0 {
            return Err(ConfigError::ZeroPopulationCap);
        }
        if !(0.0..=1.0).contains(&self.beta) {
            return Err(ConfigError::OutOfRange {
                name: "beta",
                value: self.beta,
            });
        }
        for (name, value) in [
            ("chi", self.chi),
            ("mu", self.mu),
            ("explore_probability", self.explore_probability),
            ("gamma", self.gamma),
            ("delta", self.delta),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }
        for (name, value) in [
            ("epsilon_zero", self.epsilon_zero),
            ("nu", self.nu),
            ("alpha", self.alpha),
            ("tau", self.tau),
            ("s0", self.s0),
            ("m", self.m),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }
        if self.min_value >= self.max_value {
            return Err(ConfigError::InvalidValueRange {
                min: self.min_value,
                max: self.max_value,
            });
        }
        Ok(())
    }

    /// Switch to condensation: no crossover, no mutation. Only deletion and
    /// subsumption pressure remain, compacting the population.
    pub fn condense(&mut self) {
        self.chi = 0.0;
        self.mu = 0.0;
    }
}

/// Construction-time configuration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ZeroPopulationCap,
    EmptyActionSet,
    OutOfRange { name: &'static str, value: f64 },
    InvalidValueRange { min: f64, max: f64 },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroPopulationCap => {
                write!(f, "population cap N must be at least 1")
            }
            ConfigError::EmptyActionSet => {
                write!(f, "the set of available actions must not be empty")
            }
            ConfigError::OutOfRange { name, value } => {
                write!(f, "parameter '{}' is out of range: {}", name, value)
            }
            ConfigError::InvalidValueRange { min, max } => {
                write!(
                    f,
                    "min_value must be below max_value: got [{}, {})",
                    min, max
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(XcsrParams::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_beta_rejected() {
        let mut params = XcsrParams::default();
        params.beta = 1.5;
        assert_eq!(
            params.validate(),
            Err(ConfigError::OutOfRange {
                name: "beta",
                value: 1.5
            })
        );
    }

    #[test]
    fn test_zero_population_cap_rejected() {
        let mut params = XcsrParams::default();
        params.n = 0;
        assert_eq!(params.validate(), Err(ConfigError::ZeroPopulationCap));
    }

    #[test]
    fn test_inverted_value_range_rejected() {
        let mut params = XcsrParams::default();
        params.min_value = 1.0;
        params.max_value = 0.0;
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvalidValueRange { .. })
        ));
    }

    #[test]
    fn test_condense_zeroes_novelty_operators() {
        let mut params = XcsrParams::default();
        params.condense();
        assert_eq!(params.chi, 0.0);
        assert_eq!(params.mu, 0.0);
    }

    #[test]
    fn test_repr_parse_roundtrip() {
        for repr in [Repr::CenterSpread, Repr::OrderedBound, Repr::UnorderedBound] {
            assert_eq!(Repr::parse(repr.as_str()), Some(repr));
        }
        assert_eq!(Repr::parse("nope"), None);
    }
}
