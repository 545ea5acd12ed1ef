// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Phase timing for a single request.
//!
//! The transport only reports absolute instants ("the socket connected now"),
//! so each phase duration is derived by subtracting the start instant plus
//! every earlier phase from the reported instant. Phases that never fire stay
//! unmeasured and count as zero in later subtractions.

use std::time::{Duration, Instant};

use crate::har::Timings;

/// The seven HAR phases, in their fixed causal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Blocked,
    Dns,
    Connect,
    Ssl,
    Send,
    Wait,
    Receive,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::Blocked,
        Phase::Dns,
        Phase::Connect,
        Phase::Ssl,
        Phase::Send,
        Phase::Wait,
        Phase::Receive,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Phases HAR allows to be reported as `-1` when not measured.
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            Phase::Blocked | Phase::Dns | Phase::Connect | Phase::Ssl
        )
    }
}

/// Monotonic clock anchored at the instant a request began.
#[derive(Debug, Clone)]
pub struct PhaseClock {
    start: Instant,
    phases: [Option<Duration>; 7],
}

impl PhaseClock {
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            phases: [None; 7],
        }
    }

    /// Duration of a phase, `None` when it was never measured.
    pub fn get(&self, phase: Phase) -> Option<Duration> {
        self.phases[phase.index()]
    }

    /// Sum of all measured phases before `phase`.
    fn offset_of(&self, phase: Phase) -> Duration {
        self.phases[..phase.index()]
            .iter()
            .flatten()
            .sum::<Duration>()
    }

    /// Record that `phase` ended at `at` and return its derived duration.
    ///
    /// An instant earlier than the end of the previous phases yields zero,
    /// so durations are never negative.
    pub fn record(&mut self, phase: Phase, at: Instant) -> Duration {
        let elapsed = at.saturating_duration_since(self.start);
        let duration = elapsed.saturating_sub(self.offset_of(phase));
        self.phases[phase.index()] = Some(duration);
        duration
    }

    /// Sum of every measured phase. Unmeasured phases count as zero.
    pub fn total(&self) -> Duration {
        self.phases.iter().flatten().sum()
    }

    /// Convert to the serialized HAR form.
    pub fn to_har(&self) -> Timings {
        let ms = |phase: Phase| match self.get(phase) {
            Some(d) => duration_ms(d),
            None if phase.is_optional() => -1.0,
            None => 0.0,
        };
        Timings {
            blocked: ms(Phase::Blocked),
            dns: ms(Phase::Dns),
            connect: ms(Phase::Connect),
            send: ms(Phase::Send),
            wait: ms(Phase::Wait),
            receive: ms(Phase::Receive),
            ssl: ms(Phase::Ssl),
            comment: None,
        }
    }
}

/// Nanosecond-precision duration rendered as floating milliseconds.
pub fn duration_ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}
