// src/condition.rs
//
// Interval conditions over real-valued inputs.
//
// A condition is a vector of predicates, one per input dimension. Each
// predicate stores two scalars whose meaning depends on the representation
// tag: center/spread (CSR), ordered bounds (OBR), or unordered bounds (UBR).
// All three encode a half-open interval [lo, hi); a condition matches a
// situation iff every dimension's value falls inside its interval.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::params::{Repr, XcsrParams};

/// One interval predicate: two scalars interpreted through a `Repr` tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub v1: f64,
    pub v2: f64,
}

impl Predicate {
    /// Inclusive lower bound of the encoded interval.
    pub fn lower(&self, repr: Repr) -> f64 {
        match repr {
            Repr::CenterSpread => self.v1 - self.v2,
            Repr::OrderedBound | Repr::UnorderedBound => self.v1.min(self.v2),
        }
    }

    /// Exclusive upper bound of the encoded interval.
    pub fn upper(&self, repr: Repr) -> f64 {
        match repr {
            Repr::CenterSpread => self.v1 + self.v2,
            Repr::OrderedBound | Repr::UnorderedBound => self.v1.max(self.v2),
        }
    }

    /// Whether `x` lies in [lower, upper).
    pub fn contains(&self, repr: Repr, x: f64) -> bool {
        self.lower(repr) <= x && x < self.upper(repr)
    }

    /// Interval width (generality contribution of this dimension).
    pub fn width(&self, repr: Repr) -> f64 {
        self.upper(repr) - self.lower(repr)
    }

    /// Whether this predicate's interval contains the whole of `other`'s.
    fn encloses(&self, other: &Predicate, repr: Repr) -> bool {
        self.lower(repr) <= other.lower(repr) && other.upper(repr) <= self.upper(repr)
    }
}

/// A full condition: representation tag plus one predicate per dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub repr: Repr,
    pub predicates: Vec<Predicate>,
}

impl Condition {
    pub fn new(repr: Repr, predicates: Vec<Predicate>) -> Self {
        Self { repr, predicates }
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Whether every dimension of `situation` falls inside this condition.
    pub fn matches(&self, situation: &[f64]) -> bool {
        self.predicates.len() == situation.len()
            && self
                .predicates
                .iter()
                .zip(situation)
                .all(|(pred, &x)| pred.contains(self.repr, x))
    }

    /// Generate a covering condition that matches `situation`.
    ///
    /// Each dimension gets an interval centred on the input value with a
    /// random half-width in [0, s_0]. With range truncation enabled the
    /// half-width is capped so the interval stays inside the input domain;
    /// with range restriction enabled the endpoints are clipped afterwards
    /// (center-spread is exempt from both).
    pub fn covering<R: Rng>(situation: &[f64], params: &XcsrParams, rng: &mut R) -> Self {
        let repr = params.repr;
        let predicates = situation
            .iter()
            .map(|&x| {
                let mut max_half_width = params.s0;
                if repr != Repr::CenterSpread && params.do_covering_random_range_truncation {
                    let room = (x - params.min_value).min(params.max_value - x).max(0.0);
                    max_half_width = max_half_width.min(room);
                }
                let r = if max_half_width > 0.0 {
                    rng.gen_range(0.0..=max_half_width)
                } else {
                    0.0
                };
                match repr {
                    Repr::CenterSpread => Predicate { v1: x, v2: r },
                    Repr::OrderedBound => {
                        let mut pred = Predicate {
                            v1: x - r,
                            v2: x + r,
                        };
                        if params.do_range_restriction {
                            pred.v1 = pred.v1.clamp(params.min_value, params.max_value);
                            pred.v2 = pred.v2.clamp(params.min_value, params.max_value);
                        }
                        pred
                    }
                    Repr::UnorderedBound => {
                        let mut lo = x - r;
                        let mut hi = x + r;
                        if params.do_range_restriction {
                            lo = lo.clamp(params.min_value, params.max_value);
                            hi = hi.clamp(params.min_value, params.max_value);
                        }
                        // Keep the stored order unbiased: either scalar may
                        // carry either bound.
                        if rng.gen_bool(0.5) {
                            Predicate { v1: lo, v2: hi }
                        } else {
                            Predicate { v1: hi, v2: lo }
                        }
                    }
                }
            })
            .collect();
        Self { repr, predicates }
    }

    /// Mutate the condition in place.
    ///
    /// Each scalar of each predicate is perturbed independently with
    /// probability mu by uniform noise in [-m, +m]. Center-spread clamps the
    /// spread to stay non-negative; ordered-bound re-orders the bounds;
    /// unordered-bound keeps whatever order results. Range restriction is
    /// applied afterwards (center-spread exempt).
    pub fn mutate<R: Rng>(&mut self, params: &XcsrParams, rng: &mut R) {
        for pred in &mut self.predicates {
            if rng.gen::<f64>() < params.mu {
                pred.v1 += rng.gen_range(-params.m..=params.m);
            }
            if rng.gen::<f64>() < params.mu {
                pred.v2 += rng.gen_range(-params.m..=params.m);
            }
            match self.repr {
                Repr::CenterSpread => {
                    if pred.v2 < 0.0 {
                        pred.v2 = 0.0;
                    }
                }
                Repr::OrderedBound => {
                    if pred.v1 > pred.v2 {
                        std::mem::swap(&mut pred.v1, &mut pred.v2);
                    }
                }
                Repr::UnorderedBound => {}
            }
            if self.repr != Repr::CenterSpread && params.do_range_restriction {
                pred.v1 = pred.v1.clamp(params.min_value, params.max_value);
                pred.v2 = pred.v2.clamp(params.min_value, params.max_value);
            }
        }
    }

    /// Whether this condition is strictly more general than `other`:
    /// every interval encloses the corresponding one in `other`, and at
    /// least one is strictly wider.
    pub fn is_more_general_than(&self, other: &Condition) -> bool {
        if self.predicates.len() != other.predicates.len() {
            return false;
        }
        let mut strictly_wider = false;
        for (a, b) in self.predicates.iter().zip(&other.predicates) {
            if !a.encloses(b, self.repr) {
                return false;
            }
            if a.lower(self.repr) < b.lower(other.repr) || b.upper(other.repr) < a.upper(self.repr)
            {
                strictly_wider = true;
            }
        }
        strictly_wider
    }

    /// Total interval width across dimensions. Larger = more general.
    pub fn generality(&self) -> f64 {
        self.predicates.iter().map(|p| p.width(self.repr)).sum()
    }
}
