//! Data types for simulated and real time.

use core::cmp::Ordering;
use core::ops;
use std::time::{Duration, Instant};

/// Simulation time, in seconds since the creation of the world it belongs to.
///
/// Simulation time is continuous: events (collisions, timeouts, grid crossings)
/// occur at exact fractional instants, not on a fixed tick. It advances only when
/// the owning world processes events; it has no relationship to wall-clock time
/// except through whatever frame loop drives the world.
pub type SimTime = f64;

/// A request regarding how much real time should be spent on a computation.
#[derive(Debug, Clone, Copy, Eq, Ord, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum Deadline {
    /// Stop immediately after the minimum necessary activities.
    ///
    /// Arithmetically, this is “negative infinity”; it is less than all finite deadlines.
    Asap,
    /// Stop as close to the given time (before or after) as is feasible.
    At(Instant),
    /// Don't stop until all the work is done.
    ///
    /// This choice is appropriate when deterministic results are desired.
    ///
    /// Arithmetically, this is “positive infinity”; it is greater than all finite deadlines.
    Whenever,
}

impl Deadline {
    /// Returns the time between `start` and the deadline, or [`None`] if there is no
    /// deadline and the remaining time is unbounded.
    ///
    /// If the deadline is already past, returns `Some(Duration::ZERO)`.
    ///
    /// (This does not return [`Duration::MAX`] since that would be likely to cause
    /// unintended arithmetic overflows.)
    #[inline]
    pub fn remaining_since(&self, start: Instant) -> Option<Duration> {
        match self {
            Deadline::Asap => Some(Duration::ZERO),
            Deadline::At(deadline) => Some(deadline.saturating_duration_since(start)),
            Deadline::Whenever => None,
        }
    }
}

impl ops::Add<Duration> for Deadline {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        match self {
            Deadline::Asap => Deadline::Asap,
            Deadline::At(i) => Deadline::At(i + rhs),
            Deadline::Whenever => Deadline::Whenever,
        }
    }
}

// Allow comparing `Deadline` and `Instant` without wrapping.
impl PartialEq<Instant> for Deadline {
    #[inline]
    fn eq(&self, other: &Instant) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}
impl PartialEq<Deadline> for Instant {
    #[inline]
    fn eq(&self, other: &Deadline) -> bool {
        other.eq(self)
    }
}
impl PartialOrd<Instant> for Deadline {
    #[inline]
    fn partial_cmp(&self, other: &Instant) -> Option<Ordering> {
        Some(match self {
            Deadline::Asap => Ordering::Less,
            Deadline::At(i) => i.cmp(other),
            Deadline::Whenever => Ordering::Greater,
        })
    }
}
impl PartialOrd<Deadline> for Instant {
    #[inline]
    fn partial_cmp(&self, other: &Deadline) -> Option<Ordering> {
        other.partial_cmp(self).map(Ordering::reverse)
    }
}

impl From<Instant> for Deadline {
    #[inline]
    fn from(value: Instant) -> Self {
        Self::At(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_ordering() {
        let i = Instant::now();
        let mut deadlines = [
            Deadline::At(i + Duration::from_secs(1)),
            Deadline::Asap,
            Deadline::Whenever,
            Deadline::At(i),
        ];
        deadlines.sort();
        assert_eq!(
            deadlines,
            [
                Deadline::Asap,
                Deadline::At(i),
                Deadline::At(i + Duration::from_secs(1)),
                Deadline::Whenever,
            ]
        );
    }

    #[test]
    fn deadline_remaining() {
        let i = Instant::now();
        assert_eq!(Deadline::Asap.remaining_since(i), Some(Duration::ZERO));
        assert_eq!(Deadline::Whenever.remaining_since(i), None);
        assert_eq!(
            Deadline::At(i + Duration::from_secs(2)).remaining_since(i),
            Some(Duration::from_secs(2))
        );
        // Already past: saturates to zero rather than panicking.
        assert_eq!(
            Deadline::At(i).remaining_since(i + Duration::from_secs(1)),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn deadline_vs_instant() {
        let i = Instant::now();
        assert!(Deadline::Asap < i);
        assert!(Deadline::Whenever > i);
        assert!(Deadline::At(i) == i);
        assert!(i < Deadline::At(i + Duration::from_secs(1)));
    }
}
