//! Simulated time
//!
//! The recorder never owns the simulation clock; it asks a [`TimeSource`]
//! for the current time whenever a mark omits an explicit timestamp.

use std::cell::Cell;
use std::fmt;
use std::ops::Add;
use std::rc::Rc;

use crate::format::format_g;

const PS_PER_NS: u64 = 1_000;
const PS_PER_US: u64 = 1_000_000;
const PS_PER_SEC: f64 = 1e12;

/// A point in simulated time, with picosecond resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimTime {
    picos: u64,
}

impl SimTime {
    pub const ZERO: SimTime = SimTime { picos: 0 };

    pub const fn from_ps(picos: u64) -> Self {
        Self { picos }
    }

    pub const fn from_ns(nanos: u64) -> Self {
        Self {
            picos: nanos.saturating_mul(PS_PER_NS),
        }
    }

    pub const fn from_us(micros: u64) -> Self {
        Self {
            picos: micros.saturating_mul(PS_PER_US),
        }
    }

    pub fn as_ps(self) -> u64 {
        self.picos
    }

    pub fn as_secs_f64(self) -> f64 {
        self.picos as f64 / PS_PER_SEC
    }

    /// Seconds in the fixed `%g` form written to `time` attributes
    pub fn to_trace_string(self) -> String {
        format_g(self.as_secs_f64())
    }
}

impl Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> SimTime {
        SimTime::from_ps(self.picos.saturating_add(rhs.picos))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} s", self.to_trace_string())
    }
}

/// Source of the current simulated time
pub trait TimeSource {
    fn now(&self) -> SimTime;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> SimTime {
        (**self).now()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Rc<T> {
    fn now(&self) -> SimTime {
        (**self).now()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Box<T> {
    fn now(&self) -> SimTime {
        (**self).now()
    }
}

/// A clock advanced by hand, for simple schedulers and tests
///
/// Share it with a session through `Rc<ManualClock>` and keep advancing it
/// from the scheduler loop.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<SimTime>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, time: SimTime) {
        self.now.set(time);
    }

    pub fn advance(&self, delta: SimTime) -> SimTime {
        let next = self.now.get() + delta;
        self.now.set(next);
        next
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> SimTime {
        self.now.get()
    }
}
