//! Single-step learning end to end.
//!
//! A one-dimensional threshold problem: action 0 pays 1000 when the input
//! lies in [0, 0.5], otherwise every action pays 0. The learner must settle
//! on action 0 for inputs below the threshold with a near-exact payoff
//! prediction.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use xcsr::{Repr, Xcsr, XcsrParams};

struct ThresholdProblem {
    rng: ChaCha8Rng,
    situation: Vec<f64>,
}

impl ThresholdProblem {
    fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let situation = vec![rng.gen_range(0.0..1.0)];
        Self { rng, situation }
    }

    fn reward(&self, action: usize) -> f64 {
        if self.situation[0] <= 0.5 && action == 0 {
            1000.0
        } else {
            0.0
        }
    }

    fn next(&mut self) {
        self.situation[0] = self.rng.gen_range(0.0..1.0);
    }
}

fn trained_learner(seed: u64, explorations: usize) -> Xcsr {
    let params = XcsrParams {
        n: 500,
        repr: Repr::OrderedBound,
        min_value: 0.0,
        max_value: 1.0,
        explore_probability: 0.5,
        ..XcsrParams::default()
    };
    let mut learner = Xcsr::new([0, 1], params).unwrap().with_seed(seed);
    let mut problem = ThresholdProblem::new(seed.wrapping_add(1));

    for _ in 0..explorations {
        let situation = problem.situation.clone();
        let action = learner.explore(&situation).unwrap();
        let reward = problem.reward(action);
        learner.reward(reward, true).unwrap();
        problem.next();
    }
    learner
}

/// After 5000 explorations the learner exploits action 0 on sigma = 0.3 with
/// a prediction within epsilon_0 of the full payoff.
#[test]
fn test_threshold_problem_converges() {
    let mut learner = trained_learner(13, 5000);

    let action = learner.exploit(&[0.3], false).unwrap();
    assert_eq!(action, 0);

    let prediction = learner.prediction_for(0).unwrap();
    let epsilon_zero = learner.params().epsilon_zero;
    assert!(
        (prediction - 1000.0).abs() < epsilon_zero,
        "P(0) = {} should be within {} of 1000",
        prediction,
        epsilon_zero
    );

    // The rejected action predicts far less payoff at 0.3.
    let other = learner.prediction_for(1).unwrap_or(0.0);
    assert!(other < prediction);
}

/// The population cap holds at every observation during training.
#[test]
fn test_cap_and_invariants_hold_during_training() {
    let params = XcsrParams {
        n: 150,
        repr: Repr::OrderedBound,
        explore_probability: 0.5,
        ..XcsrParams::default()
    };
    let mut learner = Xcsr::new([0, 1], params).unwrap().with_seed(29);
    let mut problem = ThresholdProblem::new(31);

    for _ in 0..1000 {
        let situation = problem.situation.clone();
        let action = learner.explore(&situation).unwrap();
        learner.reward(problem.reward(action), true).unwrap();
        problem.next();

        assert!(learner.numerosity_sum() <= 150);
        for cl in learner.population().iter() {
            let cl = cl.borrow();
            assert!(cl.numerosity >= 1);
            assert!(cl.epsilon >= 0.0);
            assert!(cl.fitness > 0.0);
        }
    }
}

/// Exploitation without update answers from the learned model and leaves the
/// learner's state machine untouched.
#[test]
fn test_exploit_probe_after_training() {
    let mut learner = trained_learner(17, 3000);
    let size_before = learner.population_size();

    for x in [0.1, 0.2, 0.3, 0.4] {
        let action = learner.exploit(&[x], false).unwrap();
        assert_eq!(action, 0, "below the threshold, action 0 is optimal");
    }
    assert_eq!(learner.population_size(), size_before);
}
