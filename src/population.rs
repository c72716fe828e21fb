// src/population.rs
//
// The population [P]: the bounded multiset of macro-classifiers.
//
// Members are stored in insertion order so that every walk over the
// population (matching, roulette, CSV output) is reproducible for a given
// seed. Duplicate (condition, action) insertions are absorbed by numerosity.

use std::cell::RefCell;
use std::rc::Rc;

use rand::Rng;

use crate::classifier::{Classifier, ClassifierPtr};
use crate::params::XcsrParams;

/// The population [P]. Owns all classifiers of one learner.
#[derive(Debug, Default)]
pub struct Population {
    members: Vec<ClassifierPtr>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of macro-classifiers.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    /// Sum of numerosities (micro-classifier count).
    pub fn numerosity_sum(&self) -> u64 {
        self.members.iter().map(|cl| cl.borrow().numerosity).sum()
    }

    /// Iterate over the members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassifierPtr> {
        self.members.iter()
    }

    /// Clone the population into plain records (read-only snapshot).
    pub fn snapshot(&self) -> Vec<Classifier> {
        self.members.iter().map(|cl| cl.borrow().clone()).collect()
    }

    /// Insert a classifier, absorbing it into an existing identical
    /// (condition, action) member if one exists.
    pub fn insert_or_merge(&mut self, classifier: Classifier) {
        for member in &self.members {
            let mut existing = member.borrow_mut();
            if existing.is_duplicate_of(&classifier) {
                existing.numerosity += classifier.numerosity;
                return;
            }
        }
        self.members.push(Rc::new(RefCell::new(classifier)));
    }

    /// Remove a member by pointer identity. Used by action-set subsumption.
    pub fn remove_ptr(&mut self, target: &ClassifierPtr) {
        self.members
            .retain(|member| !ClassifierPtr::ptr_eq(member, target));
    }

    /// Enforce the population cap: while the numerosity sum exceeds N,
    /// delete one micro-classifier chosen by the deletion vote roulette.
    pub fn delete_extra_classifiers<R: Rng>(&mut self, params: &XcsrParams, rng: &mut R) {
        while self.numerosity_sum() > params.n {
            self.delete_one(params, rng);
        }
    }

    fn delete_one<R: Rng>(&mut self, params: &XcsrParams, rng: &mut R) {
        if self.members.is_empty() {
            return;
        }

        let numerosity_sum: u64 = self.members.iter().map(|cl| cl.borrow().numerosity).sum();
        let fitness_sum: f64 = self.members.iter().map(|cl| cl.borrow().fitness).sum();
        let average_fitness = if numerosity_sum > 0 {
            fitness_sum / numerosity_sum as f64
        } else {
            0.0
        };

        let votes: Vec<f64> = self
            .members
            .iter()
            .map(|cl| deletion_vote(&cl.borrow(), average_fitness, params))
            .collect();
        let vote_sum: f64 = votes.iter().sum();

        let index = if vote_sum > 0.0 {
            let mut choice = rng.gen::<f64>() * vote_sum;
            let mut selected = self.members.len() - 1;
            for (i, vote) in votes.iter().enumerate() {
                choice -= vote;
                if choice <= 0.0 {
                    selected = i;
                    break;
                }
            }
            selected
        } else {
            // All votes zero (e.g. freshly loaded population with reset
            // statistics): fall back to a uniform choice.
            rng.gen_range(0..self.members.len())
        };

        let remove = {
            let mut cl = self.members[index].borrow_mut();
            cl.numerosity -= 1;
            cl.numerosity == 0
        };
        if remove {
            self.members.remove(index);
        }
    }
}

/// Deletion vote of one classifier: proportional to its action set size
/// estimate and numerosity, inflated for experienced low-fitness rules.
fn deletion_vote(classifier: &Classifier, average_fitness: f64, params: &XcsrParams) -> f64 {
    let mut vote = classifier.action_set_size * classifier.numerosity as f64;
    if classifier.experience > params.theta_del
        && classifier.fitness_per_num() < params.delta * average_fitness
        && classifier.fitness > 0.0
    {
        vote *= average_fitness * classifier.numerosity as f64 / classifier.fitness;
    }
    vote
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Condition, Predicate};
    use crate::params::Repr;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rule(lo: f64, hi: f64, action: usize, params: &XcsrParams) -> Classifier {
        let cond = Condition::new(Repr::OrderedBound, vec![Predicate { v1: lo, v2: hi }]);
        Classifier::new(cond, action, params, 0, 1.0)
    }

    #[test]
    fn test_duplicate_insert_is_absorbed() {
        let params = XcsrParams::default();
        let mut population = Population::new();
        population.insert_or_merge(rule(0.0, 0.5, 0, &params));
        population.insert_or_merge(rule(0.0, 0.5, 0, &params));
        assert_eq!(population.len(), 1);
        assert_eq!(population.numerosity_sum(), 2);
    }

    #[test]
    fn test_distinct_rules_stay_distinct() {
        let params = XcsrParams::default();
        let mut population = Population::new();
        population.insert_or_merge(rule(0.0, 0.5, 0, &params));
        population.insert_or_merge(rule(0.0, 0.5, 1, &params));
        population.insert_or_merge(rule(0.0, 0.6, 0, &params));
        assert_eq!(population.len(), 3);
        assert_eq!(population.numerosity_sum(), 3);
    }

    #[test]
    fn test_deletion_enforces_cap() {
        let mut params = XcsrParams::default();
        params.n = 5;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut population = Population::new();
        for i in 0..10 {
            let mut cl = rule(0.0, 0.1 + 0.05 * i as f64, i % 2, &params);
            cl.action_set_size = 1.0 + i as f64;
            population.insert_or_merge(cl);
        }
        population.delete_extra_classifiers(&params, &mut rng);
        assert!(population.numerosity_sum() <= params.n);
        for cl in population.iter() {
            assert!(cl.borrow().numerosity >= 1);
        }
    }

    #[test]
    fn test_deletion_with_zero_votes_falls_back_to_uniform() {
        let mut params = XcsrParams::default();
        params.n = 2;
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut population = Population::new();
        for i in 0..4 {
            let mut cl = rule(0.0, 0.5, i, &params);
            cl.action_set_size = 0.0;
            population.insert_or_merge(cl);
        }
        population.delete_extra_classifiers(&params, &mut rng);
        assert_eq!(population.numerosity_sum(), 2);
    }

    #[test]
    fn test_low_fitness_experienced_rules_attract_deletion() {
        let params = XcsrParams::default();
        let mut weak = rule(0.0, 0.5, 0, &params);
        weak.experience = params.theta_del + 1;
        weak.fitness = 0.001;
        weak.action_set_size = 10.0;
        let strong_vote = deletion_vote(&weak, 1.0, &params);

        let mut young = weak.clone();
        young.experience = 0;
        let base_vote = deletion_vote(&young, 1.0, &params);

        assert!(strong_vote > base_vote);
    }
}
