// src/environment.rs
//
// The environment contract consumed by experiment drivers, plus seeded
// real-valued benchmark problems.

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A problem the learner interacts with: it yields a real-valued situation,
/// accepts an integer action, pays a scalar reward, and signals the end of
/// the current problem instance.
pub trait Environment {
    /// The current situation vector.
    fn situation(&mut self) -> Vec<f64>;
    /// The set of actions the learner may execute.
    fn available_actions(&self) -> BTreeSet<usize>;
    /// Execute `action`, returning the reward.
    fn execute_action(&mut self, action: usize) -> f64;
    /// Whether the current problem instance has ended.
    fn is_end_of_problem(&self) -> bool;
}

/// The real multiplexer: k address attributes select one of 2^k data
/// attributes; an attribute reads as binary 1 when its value is at least
/// 0.5. The correct data bit pays `reward`, anything else pays zero.
/// Single-step: every action execution starts a fresh problem.
pub struct RealMultiplexerEnvironment {
    address_bits: usize,
    situation: Vec<f64>,
    rng: ChaCha8Rng,
    reward: f64,
}

impl RealMultiplexerEnvironment {
    /// `length` must be k + 2^k for some k >= 1 (3, 6, 11, 20, 37, ...).
    pub fn new(length: usize, seed: u64) -> Self {
        let address_bits = (1usize..)
            .find(|&k| k + (1 << k) >= length)
            .filter(|&k| k + (1 << k) == length)
            .unwrap_or_else(|| panic!("invalid multiplexer length {}", length));
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let situation = (0..length).map(|_| rng.gen_range(0.0..1.0)).collect();
        Self {
            address_bits,
            situation,
            rng,
            reward: 1000.0,
        }
    }

    fn answer(&self) -> usize {
        let mut address = 0;
        for i in 0..self.address_bits {
            address = (address << 1) | usize::from(self.situation[i] >= 0.5);
        }
        usize::from(self.situation[self.address_bits + address] >= 0.5)
    }

    fn next_problem(&mut self) {
        for value in &mut self.situation {
            *value = self.rng.gen_range(0.0..1.0);
        }
    }
}

impl Environment for RealMultiplexerEnvironment {
    fn situation(&mut self) -> Vec<f64> {
        self.situation.clone()
    }

    fn available_actions(&self) -> BTreeSet<usize> {
        [0, 1].into_iter().collect()
    }

    fn execute_action(&mut self, action: usize) -> f64 {
        let reward = if action == self.answer() {
            self.reward
        } else {
            0.0
        };
        self.next_problem();
        reward
    }

    fn is_end_of_problem(&self) -> bool {
        true
    }
}

/// The checkerboard problem: the unit hypercube is divided into n_d slices
/// per dimension; the parity of the cell index sum decides the correct
/// action. Pays 1000 or 0. Single-step.
pub struct CheckerboardEnvironment {
    divisions: usize,
    situation: Vec<f64>,
    rng: ChaCha8Rng,
}

impl CheckerboardEnvironment {
    pub fn new(dimensions: usize, divisions: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let situation = (0..dimensions).map(|_| rng.gen_range(0.0..1.0)).collect();
        Self {
            divisions,
            situation,
            rng,
        }
    }

    fn answer(&self) -> usize {
        let cell_sum: usize = self
            .situation
            .iter()
            .map(|&x| ((x * self.divisions as f64) as usize).min(self.divisions - 1))
            .sum();
        cell_sum % 2
    }
}

impl Environment for CheckerboardEnvironment {
    fn situation(&mut self) -> Vec<f64> {
        self.situation.clone()
    }

    fn available_actions(&self) -> BTreeSet<usize> {
        [0, 1].into_iter().collect()
    }

    fn execute_action(&mut self, action: usize) -> f64 {
        let reward = if action == self.answer() { 1000.0 } else { 0.0 };
        for value in &mut self.situation {
            *value = self.rng.gen_range(0.0..1.0);
        }
        reward
    }

    fn is_end_of_problem(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplexer_accepts_canonical_lengths() {
        for length in [3, 6, 11, 20] {
            let env = RealMultiplexerEnvironment::new(length, 0);
            assert_eq!(env.address_bits + (1 << env.address_bits), length);
        }
    }

    #[test]
    #[should_panic]
    fn test_multiplexer_rejects_bad_length() {
        let _ = RealMultiplexerEnvironment::new(5, 0);
    }

    #[test]
    fn test_multiplexer_rewards_correct_bit() {
        let mut env = RealMultiplexerEnvironment::new(3, 1);
        for _ in 0..50 {
            let situation = env.situation();
            let address = usize::from(situation[0] >= 0.5);
            let correct = usize::from(situation[1 + address] >= 0.5);
            assert_eq!(env.execute_action(correct), 1000.0);
            assert!(env.is_end_of_problem());
        }
    }

    #[test]
    fn test_multiplexer_is_deterministic_per_seed() {
        let mut a = RealMultiplexerEnvironment::new(6, 99);
        let mut b = RealMultiplexerEnvironment::new(6, 99);
        for _ in 0..20 {
            assert_eq!(a.situation(), b.situation());
            a.execute_action(0);
            b.execute_action(0);
        }
    }

    #[test]
    fn test_checkerboard_parity() {
        let mut env = CheckerboardEnvironment::new(2, 2, 3);
        for _ in 0..50 {
            let situation = env.situation();
            let parity: usize = situation
                .iter()
                .map(|&x| ((x * 2.0) as usize).min(1))
                .sum::<usize>()
                % 2;
            assert_eq!(env.execute_action(parity), 1000.0);
        }
    }

    #[test]
    fn test_checkerboard_dimensions() {
        let mut env = CheckerboardEnvironment::new(3, 4, 5);
        assert_eq!(env.situation().len(), 3);
    }
}
