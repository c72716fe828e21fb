// src/ga.rs
//
// The steady-state niche genetic algorithm, run inside an action set.
//
// Two parents are selected (tournament or roulette), copied into offspring,
// recombined over the flat 2L-scalar condition vector, mutated, and inserted
// back into the population with optional subsumption by a parent. The
// population cap is enforced afterwards.

use std::collections::BTreeSet;

use rand::Rng;

use crate::action_set::ActionSet;
use crate::classifier::{Classifier, ClassifierPtr};
use crate::condition::Condition;
use crate::params::{CrossoverMethod, XcsrParams};
use crate::population::Population;

/// Run one GA invocation on `action_set`.
pub fn run<R: Rng>(
    action_set: &ActionSet,
    population: &mut Population,
    time_stamp: u64,
    params: &XcsrParams,
    available_actions: &BTreeSet<usize>,
    rng: &mut R,
) {
    if action_set.is_empty() {
        return;
    }

    let parent1 = select_parent(action_set, params, rng);
    let parent2 = select_parent(action_set, params, rng);

    let (mut child1, mut child2) = {
        let p1 = parent1.borrow();
        let p2 = parent2.borrow();
        let prediction = (p1.prediction + p2.prediction) / 2.0;
        let epsilon = (p1.epsilon + p2.epsilon) / 2.0;
        let fitness = 0.1 * (p1.fitness + p2.fitness) / 2.0;

        let make_child = |parent: &Classifier| Classifier {
            condition: parent.condition.clone(),
            action: parent.action,
            prediction,
            epsilon,
            fitness,
            experience: 0,
            time_stamp,
            action_set_size: parent.action_set_size,
            numerosity: 1,
        };
        (make_child(&p1), make_child(&p2))
    };

    if rng.gen::<f64>() < params.chi {
        crossover(
            &mut child1.condition,
            &mut child2.condition,
            params.crossover_method,
            rng,
        );
    }

    for child in [&mut child1, &mut child2] {
        child.condition.mutate(params, rng);
        if params.do_action_mutation && rng.gen::<f64>() < params.mu {
            let others: Vec<usize> = available_actions
                .iter()
                .copied()
                .filter(|&a| a != child.action)
                .collect();
            if !others.is_empty() {
                child.action = others[rng.gen_range(0..others.len())];
            }
        }
    }

    for child in [child1, child2] {
        if params.do_ga_subsumption && parent1.borrow().does_subsume(&child, params) {
            parent1.borrow_mut().numerosity += 1;
        } else if params.do_ga_subsumption && parent2.borrow().does_subsume(&child, params) {
            parent2.borrow_mut().numerosity += 1;
        } else {
            population.insert_or_merge(child);
        }
    }

    population.delete_extra_classifiers(params, rng);
}

/// Select one parent: tournament over micro-copies when tau > 0, otherwise
/// fitness-proportional roulette over macro-classifiers.
fn select_parent<R: Rng>(
    action_set: &ActionSet,
    params: &XcsrParams,
    rng: &mut R,
) -> ClassifierPtr {
    let members = action_set.members();
    let micro_sum = action_set.numerosity_sum();

    if params.tau > 0.0 && micro_sum > 0 {
        let draws = ((params.tau * micro_sum as f64).round() as u64).max(1);
        let mut best: Option<(ClassifierPtr, f64)> = None;
        for _ in 0..draws {
            let candidate = nth_micro(members, rng.gen_range(0..micro_sum));
            let score = candidate.borrow().fitness_per_num();
            let better = match &best {
                None => true,
                Some((_, best_score)) => score > *best_score,
            };
            if better {
                best = Some((candidate, score));
            }
        }
        // The set is non-empty, so at least one draw happened.
        best.map(|(cl, _)| cl).unwrap_or_else(|| members[0].clone())
    } else {
        let fitness_sum: f64 = members.iter().map(|cl| cl.borrow().fitness).sum();
        if fitness_sum <= 0.0 {
            // Degenerate all-zero fitness: uniform over micro-copies.
            if micro_sum > 0 {
                return nth_micro(members, rng.gen_range(0..micro_sum));
            }
            return members[0].clone();
        }
        let mut choice = rng.gen::<f64>() * fitness_sum;
        for member in members {
            choice -= member.borrow().fitness;
            if choice <= 0.0 {
                return member.clone();
            }
        }
        members[members.len() - 1].clone()
    }
}

/// Walk the members to the micro-copy with flat index `index`.
fn nth_micro(members: &[ClassifierPtr], index: u64) -> ClassifierPtr {
    let mut remaining = index;
    for member in members {
        let numerosity = member.borrow().numerosity;
        if remaining < numerosity {
            return member.clone();
        }
        remaining -= numerosity;
    }
    members[members.len() - 1].clone()
}

/// Recombine two conditions over their flat 2L-scalar representation.
fn crossover<R: Rng>(
    a: &mut Condition,
    b: &mut Condition,
    method: CrossoverMethod,
    rng: &mut R,
) {
    let scalar_count = 2 * a.len().min(b.len());
    if scalar_count == 0 {
        return;
    }
    match method {
        CrossoverMethod::Uniform => {
            for i in 0..scalar_count {
                if rng.gen_bool(0.5) {
                    swap_scalar(a, b, i);
                }
            }
        }
        CrossoverMethod::OnePoint => {
            let cut = rng.gen_range(0..=scalar_count);
            for i in cut..scalar_count {
                swap_scalar(a, b, i);
            }
        }
        CrossoverMethod::TwoPoint => {
            let mut x = rng.gen_range(0..=scalar_count);
            let mut y = rng.gen_range(0..=scalar_count);
            if x > y {
                std::mem::swap(&mut x, &mut y);
            }
            for i in x..y {
                swap_scalar(a, b, i);
            }
        }
    }
}

fn swap_scalar(a: &mut Condition, b: &mut Condition, index: usize) {
    let (pa, pb) = (&mut a.predicates[index / 2], &mut b.predicates[index / 2]);
    if index % 2 == 0 {
        std::mem::swap(&mut pa.v1, &mut pb.v1);
    } else {
        std::mem::swap(&mut pa.v2, &mut pb.v2);
    }
}
