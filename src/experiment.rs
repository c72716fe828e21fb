// src/experiment.rs
//
// Experiment harness: alternating exploitation / exploration iterations over
// a learner and a pair of environments, with per-iteration metrics and
// optional CSV log streams smoothed by a simple moving average.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::xcsr::{ProtocolError, Xcsr};

/// How one iteration of the harness is run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSettings {
    /// Exploration problems per iteration.
    pub exploration_repeat: usize,
    /// Exploitation problems per iteration.
    pub exploitation_repeat: usize,
    /// Whether exploitation steps feed rewards back into the learner
    /// (required for multi-step problems).
    pub update_in_exploitation: bool,
}

impl Default for ExperimentSettings {
    fn default() -> Self {
        Self {
            exploration_repeat: 1,
            exploitation_repeat: 1,
            update_in_exploitation: false,
        }
    }
}

/// Metrics of one harness iteration, averaged over its exploitation problems.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IterationStats {
    /// Mean reward per exploitation problem.
    pub reward_average: f64,
    /// Mean |reward - prediction| per exploitation step.
    pub system_error_average: f64,
    /// Macro-classifier count after the iteration.
    pub population_size: usize,
    /// Micro-classifier count after the iteration.
    pub numerosity_sum: u64,
    /// Fraction of exploitation steps that required covering.
    pub covering_occurrence_rate: f64,
    /// Mean step count per exploitation problem.
    pub step_count_average: f64,
}

/// Alternates exploitation and exploration over one learner.
pub struct Experiment<E: Environment> {
    settings: ExperimentSettings,
    learner: Xcsr,
    exploration_env: E,
    exploitation_env: E,
    iteration: u64,
}

impl<E: Environment> Experiment<E> {
    pub fn new(
        settings: ExperimentSettings,
        learner: Xcsr,
        exploration_env: E,
        exploitation_env: E,
    ) -> Self {
        Self {
            settings,
            learner,
            exploration_env,
            exploitation_env,
            iteration: 0,
        }
    }

    /// Run one iteration: the configured number of exploitation problems
    /// (greedy, optionally updating) followed by the configured number of
    /// exploration problems (always updating).
    pub fn run_iteration(&mut self) -> Result<IterationStats, ProtocolError> {
        let mut reward_sum = 0.0;
        let mut error_sum = 0.0;
        let mut covering_sum = 0.0;
        let mut step_count = 0usize;

        for _ in 0..self.settings.exploitation_repeat {
            loop {
                let situation = self.exploitation_env.situation();
                let action = self
                    .learner
                    .exploit(&situation, self.settings.update_in_exploitation)?;
                let reward = self.exploitation_env.execute_action(action);
                reward_sum += reward;
                error_sum += (reward - self.learner.prediction()).abs();
                covering_sum += if self.learner.is_covering_performed() {
                    1.0
                } else {
                    0.0
                };
                step_count += 1;
                let end = self.exploitation_env.is_end_of_problem();
                if self.settings.update_in_exploitation {
                    self.learner.reward(reward, end)?;
                }
                if end {
                    break;
                }
            }
        }

        for _ in 0..self.settings.exploration_repeat {
            loop {
                let situation = self.exploration_env.situation();
                let action = self.learner.explore(&situation)?;
                let reward = self.exploration_env.execute_action(action);
                let end = self.exploration_env.is_end_of_problem();
                self.learner.reward(reward, end)?;
                if end {
                    break;
                }
            }
        }

        self.iteration += 1;

        let problems = self.settings.exploitation_repeat.max(1) as f64;
        let steps = step_count.max(1) as f64;
        Ok(IterationStats {
            reward_average: reward_sum / problems,
            system_error_average: error_sum / steps,
            population_size: self.learner.population_size(),
            numerosity_sum: self.learner.numerosity_sum(),
            covering_occurrence_rate: covering_sum / steps,
            step_count_average: step_count as f64 / problems,
        })
    }

    pub fn learner(&self) -> &Xcsr {
        &self.learner
    }

    pub fn learner_mut(&mut self) -> &mut Xcsr {
        &mut self.learner
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn switch_to_condensation_mode(&mut self) {
        self.learner.switch_to_condensation_mode();
    }
}

/// Simple moving average over the last `order` samples.
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    buffer: Vec<f64>,
    cursor: usize,
    count: usize,
}

impl SimpleMovingAverage {
    /// An order of 0 is treated as 1 (no smoothing).
    pub fn new(order: usize) -> Self {
        Self {
            buffer: vec![0.0; order.max(1)],
            cursor: 0,
            count: 0,
        }
    }

    pub fn order(&self) -> usize {
        self.buffer.len()
    }

    /// Push a sample and return the average of the window so far.
    pub fn apply(&mut self, value: f64) -> f64 {
        self.buffer[self.cursor] = value;
        self.cursor = (self.cursor + 1) % self.buffer.len();
        if self.count < self.buffer.len() {
            self.count += 1;
        }
        self.buffer[..self.count.max(1)].iter().sum::<f64>() / self.count.max(1) as f64
    }
}

/// JSONL writer for per-iteration stats: one JSON object per line, suitable
/// for replay and offline analysis.
pub struct IterationLogWriter {
    writer: BufWriter<File>,
}

impl IterationLogWriter {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Append one iteration record. Serialization or write failures are
    /// swallowed; logging must never disturb a run.
    pub fn log_iteration(&mut self, iteration: u64, stats: &IterationStats) {
        #[derive(Serialize)]
        struct Record<'a> {
            iteration: u64,
            #[serde(flatten)]
            stats: &'a IterationStats,
        }
        if let Ok(line) = serde_json::to_string(&Record { iteration, stats }) {
            let _ = writeln!(self.writer, "{}", line);
        }
    }

    pub fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

/// One-column CSV log stream with optional moving-average smoothing.
/// Write failures are swallowed; logging must never disturb a run.
pub struct ExperimentLogStream {
    writer: BufWriter<File>,
    sma: Option<SimpleMovingAverage>,
}

impl ExperimentLogStream {
    /// Create a stream writing to `path`. An `sma_width` above 1 smooths the
    /// logged values over that many samples.
    pub fn create(path: impl AsRef<Path>, sma_width: usize) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            sma: if sma_width > 1 {
                Some(SimpleMovingAverage::new(sma_width))
            } else {
                None
            },
        })
    }

    /// Log one value (smoothed if configured).
    pub fn write_value(&mut self, value: f64) {
        let value = match &mut self.sma {
            Some(sma) => sma.apply(value),
            None => value,
        };
        let _ = writeln!(self.writer, "{}", value);
    }

    /// Flush buffered lines to disk.
    pub fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}
