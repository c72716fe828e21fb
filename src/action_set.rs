// src/action_set.rs
//
// The action set [A]: the match set members advocating the selected action,
// and the update protocol applied to them when a reward target arrives.

use std::collections::BTreeSet;

use rand::Rng;

use crate::classifier::ClassifierPtr;
use crate::ga;
use crate::match_set::MatchSet;
use crate::params::XcsrParams;
use crate::population::Population;

/// The action set [A] (also used for the previous action set [A]-1).
/// Holds shared handles into the population; rebuilt every step.
#[derive(Debug, Default)]
pub struct ActionSet {
    members: Vec<ClassifierPtr>,
}

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the set from the match set members advocating `action`.
    pub fn generate(&mut self, match_set: &MatchSet, action: usize) {
        self.members = match_set
            .members()
            .iter()
            .filter(|cl| cl.borrow().action == action)
            .cloned()
            .collect();
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[ClassifierPtr] {
        &self.members
    }

    /// Sum of numerosities over the members.
    pub fn numerosity_sum(&self) -> u64 {
        self.members.iter().map(|cl| cl.borrow().numerosity).sum()
    }

    /// Apply the reinforcement update with payoff target `target`:
    /// experience, prediction, prediction error (against the pre-update
    /// prediction), and action set size estimate, each through the MAM
    /// switch; then the fitness update, then optional set subsumption.
    pub fn update(&mut self, target: f64, population: &mut Population, params: &XcsrParams) {
        let set_size = self.numerosity_sum() as f64;

        for member in &self.members {
            let mut cl = member.borrow_mut();
            cl.experience += 1;
            let prediction_before = cl.prediction;
            let rate = if params.use_mam && (cl.experience as f64) < 1.0 / params.beta {
                1.0 / cl.experience as f64
            } else {
                params.beta
            };
            cl.prediction += rate * (target - prediction_before);
            cl.epsilon += rate * ((target - prediction_before).abs() - cl.epsilon);
            cl.action_set_size += rate * (set_size - cl.action_set_size);
        }

        self.update_fitness(params);

        if params.do_action_set_subsumption {
            self.do_subsumption(population, params);
        }
    }

    /// Fitness update: accuracy-weighted, normalised over the set.
    fn update_fitness(&mut self, params: &XcsrParams) {
        let accuracies: Vec<f64> = self
            .members
            .iter()
            .map(|cl| cl.borrow().accuracy(params))
            .collect();
        let accuracy_sum: f64 = self
            .members
            .iter()
            .zip(&accuracies)
            .map(|(cl, kappa)| kappa * cl.borrow().numerosity as f64)
            .sum();
        let numerosity_sum = self.numerosity_sum() as f64;

        for (member, kappa) in self.members.iter().zip(&accuracies) {
            let mut cl = member.borrow_mut();
            let relative_accuracy = if accuracy_sum > 0.0 {
                kappa * cl.numerosity as f64 / accuracy_sum
            } else if numerosity_sum > 0.0 {
                cl.numerosity as f64 / numerosity_sum
            } else {
                1.0 / self.members.len() as f64
            };
            cl.fitness += params.beta * (relative_accuracy - cl.fitness);
        }
    }

    /// Action-set subsumption: find the most general accurate member and
    /// absorb every member it strictly generalises.
    fn do_subsumption(&mut self, population: &mut Population, params: &XcsrParams) {
        let mut subsumer: Option<ClassifierPtr> = None;
        for member in &self.members {
            let cl = member.borrow();
            if !cl.is_subsumer(params) {
                continue;
            }
            let more_general = match &subsumer {
                None => true,
                Some(best) => cl.condition.generality() > best.borrow().condition.generality(),
            };
            if more_general {
                subsumer = Some(member.clone());
            }
        }

        let subsumer = match subsumer {
            Some(s) => s,
            None => return,
        };

        let mut absorbed: Vec<ClassifierPtr> = Vec::new();
        for member in &self.members {
            if ClassifierPtr::ptr_eq(member, &subsumer) {
                continue;
            }
            let is_subsumed = {
                let general = subsumer.borrow();
                let cl = member.borrow();
                general
                    .condition
                    .is_more_general_than(&cl.condition)
            };
            if is_subsumed {
                let numerosity = member.borrow().numerosity;
                subsumer.borrow_mut().numerosity += numerosity;
                absorbed.push(member.clone());
            }
        }

        for member in &absorbed {
            self.members
                .retain(|cl| !ClassifierPtr::ptr_eq(cl, member));
            population.remove_ptr(member);
        }
    }

    /// Run the GA on this set if its numerosity-weighted mean time stamp is
    /// at least theta_GA steps old. All member time stamps are refreshed
    /// when the GA fires.
    pub fn run_ga_if_due<R: Rng>(
        &mut self,
        population: &mut Population,
        time_stamp: u64,
        params: &XcsrParams,
        available_actions: &BTreeSet<usize>,
        rng: &mut R,
    ) {
        if self.members.is_empty() {
            return;
        }
        let numerosity_sum = self.numerosity_sum() as f64;
        if numerosity_sum <= 0.0 {
            return;
        }
        let stamp_sum: f64 = self
            .members
            .iter()
            .map(|cl| {
                let cl = cl.borrow();
                cl.time_stamp as f64 * cl.numerosity as f64
            })
            .sum();
        let average_stamp = stamp_sum / numerosity_sum;

        if time_stamp as f64 - average_stamp >= params.theta_ga as f64 {
            for member in &self.members {
                member.borrow_mut().time_stamp = time_stamp;
            }
            ga::run(self, population, time_stamp, params, available_actions, rng);
        }
    }
}
