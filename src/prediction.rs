// src/prediction.rs
//
// The prediction array: fitness-weighted payoff prediction per action
// present in the match set, plus action selection.

use std::collections::BTreeMap;

use rand::Rng;

use crate::classifier::ClassifierPtr;

/// Fitness-weighted system prediction P(a) for every action advocated by at
/// least one match set member. Actions absent from the match set have no
/// entry. Keyed by a BTreeMap so iteration order is fixed.
#[derive(Debug, Clone, Default)]
pub struct PredictionArray {
    predictions: BTreeMap<usize, f64>,
}

impl PredictionArray {
    /// Build the array from match set members.
    ///
    /// P(a) = sum(p * F) / sum(F) over the advocates of `a`. If the fitness
    /// sum of an action is zero the weighting degenerates; fall back to the
    /// unweighted mean of the advocates' predictions.
    pub fn new(members: &[ClassifierPtr]) -> Self {
        let mut weighted: BTreeMap<usize, (f64, f64, f64, u64)> = BTreeMap::new();
        for member in members {
            let cl = member.borrow();
            let entry = weighted.entry(cl.action).or_insert((0.0, 0.0, 0.0, 0));
            entry.0 += cl.prediction * cl.fitness;
            entry.1 += cl.fitness;
            entry.2 += cl.prediction;
            entry.3 += 1;
        }

        let predictions = weighted
            .into_iter()
            .map(|(action, (pf_sum, f_sum, p_sum, count))| {
                let prediction = if f_sum > 0.0 {
                    pf_sum / f_sum
                } else {
                    p_sum / count as f64
                };
                (action, prediction)
            })
            .collect();

        Self { predictions }
    }

    /// Prediction for one action; None if no match set member advocates it.
    pub fn prediction_for(&self, action: usize) -> Option<f64> {
        self.predictions.get(&action).copied()
    }

    /// All defined predictions in action order.
    pub fn predictions(&self) -> &BTreeMap<usize, f64> {
        &self.predictions
    }

    /// Highest prediction over the defined actions (0.0 when empty).
    pub fn max(&self) -> f64 {
        if self.predictions.is_empty() {
            return 0.0;
        }
        self.predictions
            .values()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Deterministic greedy choice: the highest-prediction action, ties
    /// broken by the lowest action index.
    pub fn greedy_action(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (&action, &prediction) in &self.predictions {
            match best {
                Some((_, best_p)) if prediction <= best_p => {}
                _ => best = Some((action, prediction)),
            }
        }
        best.map(|(action, _)| action)
    }

    /// Epsilon-greedy choice for exploration: with `explore_probability`
    /// pick uniformly over the defined actions, otherwise act greedily.
    pub fn select_action<R: Rng>(&self, explore_probability: f64, rng: &mut R) -> Option<usize> {
        if self.predictions.is_empty() {
            return None;
        }
        if rng.gen::<f64>() < explore_probability {
            let index = rng.gen_range(0..self.predictions.len());
            self.predictions.keys().nth(index).copied()
        } else {
            self.greedy_action()
        }
    }
}
