//! Deletion pressure under a tight population cap.
//!
//! With N = 200 the learner must never exceed the cap once reached, and the
//! roulette must keep shifting mass towards fitter rules over time.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use xcsr::{Repr, Xcsr, XcsrParams};

/// Mean fitness per micro-classifier.
fn average_fitness(learner: &Xcsr) -> f64 {
    let fitness_sum: f64 = learner
        .population()
        .iter()
        .map(|cl| cl.borrow().fitness)
        .sum();
    let numerosity_sum = learner.numerosity_sum();
    if numerosity_sum == 0 {
        0.0
    } else {
        fitness_sum / numerosity_sum as f64
    }
}

#[test]
fn test_cap_holds_and_fitness_grows_under_pressure() {
    let params = XcsrParams {
        n: 200,
        repr: Repr::OrderedBound,
        explore_probability: 0.5,
        ..XcsrParams::default()
    };
    let mut learner = Xcsr::new([0, 1], params).unwrap().with_seed(77);
    let mut rng = ChaCha8Rng::seed_from_u64(78);

    let mut situation = [0.0];
    let mut window_means: Vec<f64> = Vec::new();
    let mut window_sum = 0.0;

    for step in 0..3000 {
        situation[0] = rng.gen_range(0.0..1.0);
        let action = learner.explore(&situation).unwrap();
        let reward = if situation[0] <= 0.5 && action == 0 {
            1000.0
        } else {
            0.0
        };
        learner.reward(reward, true).unwrap();

        assert!(
            learner.numerosity_sum() <= 200,
            "cap violated at step {}",
            step
        );

        window_sum += average_fitness(&learner);
        if (step + 1) % 500 == 0 {
            window_means.push(window_sum / 500.0);
            window_sum = 0.0;
        }
    }

    // Noise-tolerant trend check: the last window is fitter than the first.
    let first = window_means.first().copied().unwrap();
    let last = window_means.last().copied().unwrap();
    assert!(
        last > first,
        "average fitness should rise under deletion pressure: {} -> {}",
        first,
        last
    );
}

/// Deleting from a saturated population preserves the per-rule invariants.
#[test]
fn test_saturated_population_invariants() {
    let params = XcsrParams {
        n: 60,
        repr: Repr::OrderedBound,
        ..XcsrParams::default()
    };
    let mut learner = Xcsr::new([0, 1], params).unwrap().with_seed(79);
    let mut rng = ChaCha8Rng::seed_from_u64(80);

    for _ in 0..800 {
        let x = rng.gen_range(0.0..1.0);
        let action = learner.explore(&[x]).unwrap();
        let reward = if x > 0.5 && action == 1 { 1000.0 } else { 0.0 };
        learner.reward(reward, true).unwrap();
    }

    assert!(learner.numerosity_sum() <= 60);
    assert!(learner.population_size() > 0);
    for cl in learner.population().iter() {
        let cl = cl.borrow();
        assert!(cl.numerosity >= 1);
        assert!(cl.epsilon >= 0.0);
        assert!(cl.fitness > 0.0);
        assert!(cl.action_set_size >= 0.0);
    }
}
