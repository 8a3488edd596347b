//! Value-space oracle: black-box satisfiability of restricted datatypes

use mimizuku_core::{DataRange, Facet, Literal, ReasonerError};
use std::fmt;

/// Decides satisfiability of conjunctions of restricted value spaces on
/// a literal node. The engine treats this as a black box; the tableau
/// itself never inspects facet semantics.
pub trait ValueSpaceOracle: fmt::Debug {
    /// Is the conjunction of `ranges` a non-empty value space?
    fn is_satisfiable(&self, ranges: &[&DataRange]) -> Result<bool, ReasonerError>;

    /// Does `value` belong to `range`?
    fn contains(&self, range: &DataRange, value: &Literal) -> Result<bool, ReasonerError>;
}

/// Interval-based oracle over the reals: every facet tightens a single
/// interval, and the conjunction is satisfiable iff the intersection is
/// non-empty. An inherently empty range (e.g. `minExclusive 1,
/// maxInclusive 1`) is reported unsatisfiable on its own.
#[derive(Debug, Default)]
pub struct IntervalOracle;

/// Interval with open/closed endpoints.
#[derive(Debug, Clone, Copy)]
struct Interval {
    lo: f64,
    lo_open: bool,
    hi: f64,
    hi_open: bool,
}

impl Interval {
    fn full() -> Self {
        Self {
            lo: f64::NEG_INFINITY,
            lo_open: false,
            hi: f64::INFINITY,
            hi_open: false,
        }
    }

    fn tighten(&mut self, facet: Facet, bound: f64) {
        match facet {
            Facet::MinInclusive => {
                if bound > self.lo {
                    self.lo = bound;
                    self.lo_open = false;
                }
            }
            Facet::MinExclusive => {
                if bound > self.lo || (bound == self.lo && !self.lo_open) {
                    self.lo = bound;
                    self.lo_open = true;
                }
            }
            Facet::MaxInclusive => {
                if bound < self.hi {
                    self.hi = bound;
                    self.hi_open = false;
                }
            }
            Facet::MaxExclusive => {
                if bound < self.hi || (bound == self.hi && !self.hi_open) {
                    self.hi = bound;
                    self.hi_open = true;
                }
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.lo > self.hi || (self.lo == self.hi && (self.lo_open || self.hi_open))
    }

    fn contains(&self, value: f64) -> bool {
        let above = if self.lo_open {
            value > self.lo
        } else {
            value >= self.lo
        };
        let below = if self.hi_open {
            value < self.hi
        } else {
            value <= self.hi
        };
        above && below
    }
}

impl IntervalOracle {
    fn interval_of(ranges: &[&DataRange]) -> Result<Interval, ReasonerError> {
        let mut interval = Interval::full();
        for range in ranges {
            for restriction in &range.facets {
                interval.tighten(restriction.facet, restriction.bound()?);
            }
        }
        Ok(interval)
    }
}

impl ValueSpaceOracle for IntervalOracle {
    fn is_satisfiable(&self, ranges: &[&DataRange]) -> Result<bool, ReasonerError> {
        Ok(!Self::interval_of(ranges)?.is_empty())
    }

    fn contains(&self, range: &DataRange, value: &Literal) -> Result<bool, ReasonerError> {
        let parsed: f64 = value.lexical.parse().map_err(|_| {
            ReasonerError::InvalidInput(format!(
                "literal '{}' is not a numeric value",
                value.lexical
            ))
        })?;
        Ok(Self::interval_of(&[range])?.contains(parsed))
    }
}
