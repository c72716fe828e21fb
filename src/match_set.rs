// src/match_set.rs
//
// The match set [M]: all population members whose condition matches the
// current situation, with covering when the set lacks action diversity.

use std::collections::BTreeSet;

use rand::Rng;

use crate::classifier::{Classifier, ClassifierPtr};
use crate::condition::Condition;
use crate::params::XcsrParams;
use crate::population::Population;

/// The match set built for one situation.
#[derive(Debug, Default)]
pub struct MatchSet {
    members: Vec<ClassifierPtr>,
    covering_performed: bool,
}

impl MatchSet {
    /// Build [M] for `situation`, covering until at least theta_mna distinct
    /// actions are represented (theta_mna = 0 means all available actions,
    /// and it is never required to exceed the number of available actions).
    ///
    /// Covering inserts into the population and may trigger deletion, which
    /// in turn may remove a just-covered rule; the match set is rebuilt until
    /// the diversity requirement holds.
    pub fn generate<R: Rng>(
        population: &mut Population,
        situation: &[f64],
        time_stamp: u64,
        params: &XcsrParams,
        available_actions: &BTreeSet<usize>,
        rng: &mut R,
    ) -> Self {
        let theta_mna = if params.theta_mna == 0 {
            available_actions.len() as u64
        } else {
            params.theta_mna.min(available_actions.len() as u64)
        };

        let mut covering_performed = false;
        let members = loop {
            let members: Vec<ClassifierPtr> = population
                .iter()
                .filter(|cl| cl.borrow().condition.matches(situation))
                .cloned()
                .collect();

            let actions_present: BTreeSet<usize> =
                members.iter().map(|cl| cl.borrow().action).collect();
            if actions_present.len() as u64 >= theta_mna {
                break members;
            }

            covering_performed = true;
            let missing: Vec<usize> = available_actions
                .iter()
                .copied()
                .filter(|a| !actions_present.contains(a))
                .collect();
            let action = missing[rng.gen_range(0..missing.len())];
            let condition = Condition::covering(situation, params, rng);
            let set_size_after_inclusion =
                members.iter().map(|cl| cl.borrow().numerosity).sum::<u64>() + 1;
            let classifier = Classifier::new(
                condition,
                action,
                params,
                time_stamp,
                set_size_after_inclusion as f64,
            );
            population.insert_or_merge(classifier);
            population.delete_extra_classifiers(params, rng);
        };

        // Covering guarantees at least one matching rule; an empty match set
        // here means the learner's bookkeeping is corrupt.
        assert!(
            !members.is_empty(),
            "match set empty after covering: invariant violation"
        );

        Self {
            members,
            covering_performed,
        }
    }

    pub fn members(&self) -> &[ClassifierPtr] {
        &self.members
    }

    pub fn is_covering_performed(&self) -> bool {
        self.covering_performed
    }
}
