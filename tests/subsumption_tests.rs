//! Action-set subsumption end to end.
//!
//! A strictly more general, accurate, experienced rule must absorb its
//! specialisations after an update in a shared action set.

use xcsr::{Classifier, Condition, Predicate, Repr, Xcsr, XcsrParams};

fn rule(
    lo: f64,
    hi: f64,
    action: usize,
    params: &XcsrParams,
) -> Classifier {
    Classifier::new(
        Condition::new(Repr::OrderedBound, vec![Predicate { v1: lo, v2: hi }]),
        action,
        params,
        0,
        1.0,
    )
}

fn params_no_covering() -> XcsrParams {
    XcsrParams {
        repr: Repr::OrderedBound,
        theta_mna: 1,
        do_action_set_subsumption: true,
        ..XcsrParams::default()
    }
}

/// An experienced accurate general rule A and a strictly narrower B with the
/// same action: after one update in a shared action set, B is absorbed and
/// A's numerosity grows by B's.
#[test]
fn test_general_rule_absorbs_specialisation() {
    let params = params_no_covering();
    let mut learner = Xcsr::new([0, 1], params).unwrap().with_seed(55);

    let mut general = rule(0.0, 1.0, 0, learner.params());
    general.experience = 50;
    general.epsilon = 0.0;
    general.prediction = 1000.0;
    general.fitness = 1.0;

    let mut specific = rule(0.2, 0.8, 0, learner.params());
    specific.numerosity = 3;
    specific.prediction = 1000.0;

    learner.set_population(vec![general, specific], false);
    assert_eq!(learner.population_size(), 2);
    assert_eq!(learner.numerosity_sum(), 4);

    // Both rules match 0.5 and share action 0, so the action set holds both.
    let action = learner.explore(&[0.5]).unwrap();
    assert_eq!(action, 0, "only action 0 is represented");
    learner.reward(1000.0, true).unwrap();

    assert_eq!(learner.population_size(), 1, "B must be absorbed");
    let survivor = &learner.population().snapshot()[0];
    assert_eq!(survivor.numerosity, 4);
    assert!(survivor.condition.matches(&[0.05]), "the general rule survives");
}

/// Without the subsumer qualifications nothing is absorbed.
#[test]
fn test_inexperienced_general_rule_does_not_absorb() {
    let params = params_no_covering();
    let mut learner = Xcsr::new([0, 1], params).unwrap().with_seed(56);

    let mut general = rule(0.0, 1.0, 0, learner.params());
    general.experience = 0; // below theta_sub
    general.epsilon = 0.0;
    general.prediction = 1000.0;
    let mut specific = rule(0.2, 0.8, 0, learner.params());
    specific.prediction = 1000.0;

    learner.set_population(vec![general, specific], false);
    learner.explore(&[0.5]).unwrap();
    learner.reward(1000.0, true).unwrap();

    assert_eq!(learner.population_size(), 2);
}

/// Subsumption ignores rules with a different action even when the
/// condition is strictly narrower.
#[test]
fn test_other_actions_are_not_absorbed() {
    let params = params_no_covering();
    let mut learner = Xcsr::new([0, 1], params).unwrap().with_seed(57);

    let mut general = rule(0.0, 1.0, 0, learner.params());
    general.experience = 50;
    general.epsilon = 0.0;
    general.prediction = 1000.0;
    let mut other_action = rule(0.2, 0.8, 1, learner.params());
    other_action.prediction = 0.0;

    learner.set_population(vec![general, other_action], false);
    // Select action 0 greedily: its predicted payoff dominates.
    let action = learner.exploit(&[0.5], true).unwrap();
    assert_eq!(action, 0);
    learner.reward(1000.0, true).unwrap();

    assert_eq!(learner.population_size(), 2);
}
