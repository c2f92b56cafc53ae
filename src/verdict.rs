//! Per-site verdicts and the rules that derive them from abstract values.

use std::fmt;

use serde::Serialize;

use crate::interval::{Bound, Interval};
use crate::nullness::Nullness;

/// Whether an operation fails when it is reached.
///
/// Ordered by severity: `Never < May < Always`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Verdict {
    /// No reaching execution fails (or the operation is unreachable).
    Never,
    /// Some reaching executions may fail.
    May,
    /// Every reaching execution fails.
    Always,
}

impl Verdict {
    /// Verdict from whether failure and success are possible.
    pub fn from_outcomes(may_fail: bool, may_succeed: bool) -> Self {
        match (may_fail, may_succeed) {
            (false, _) => Verdict::Never,
            (true, false) => Verdict::Always,
            (true, true) => Verdict::May,
        }
    }

    /// Verdict of an integer division by `divisor`.
    pub fn division(divisor: &Interval) -> Self {
        if divisor.is_empty() {
            return Verdict::Never;
        }
        Self::from_outcomes(divisor.contains(0), divisor.is_singleton() != Some(0))
    }

    /// Verdict of dereferencing a reference.
    pub fn dereference(nullness: Nullness) -> Self {
        Self::from_outcomes(nullness.may_be_null(), nullness.may_be_nonnull())
    }

    /// Verdict of accessing element `index` of an array whose length lies in `length`.
    pub fn index(index: &Interval, length: &Interval) -> Self {
        if index.is_empty() || length.is_empty() {
            return Verdict::Never;
        }
        let zero = Bound::Finite(0);
        let last = length.low.sub(&Bound::Finite(1));
        if index.low >= zero && index.high <= last {
            return Verdict::Never;
        }
        if index.high < zero || index.low >= length.high {
            return Verdict::Always;
        }
        Verdict::May
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Never => "never",
            Verdict::May => "may",
            Verdict::Always => "always",
        };
        f.pad(s)
    }
}
