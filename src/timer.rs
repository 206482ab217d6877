//! Single fixed countdown (pomodoro style).
//!
//! The configured duration lives in a [`DurationCell`] that every tick reads
//! afresh, so a change made between run-start and completion is honoured when
//! the countdown rearms. The one-second schedule is an [`Interval`] value owned
//! by the timer: it exists only while running and is dropped on every
//! transition out of running.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use strum_macros::Display;

pub const MIN_MINUTES: u32 = 1;
pub const MAX_MINUTES: u32 = 99;
pub const TICK: Duration = Duration::from_secs(1);

/// Shared, live total duration in seconds.
#[derive(Debug, Clone)]
pub struct DurationCell(Arc<AtomicU32>);

impl DurationCell {
    pub fn new(secs: u32) -> Self {
        Self(Arc::new(AtomicU32::new(secs)))
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, secs: u32) {
        self.0.store(secs, Ordering::Relaxed);
    }
}

/// Fixed-period schedule anchored at its creation time.
#[derive(Debug, Clone, Copy)]
pub struct Interval {
    period: Duration,
    next: Instant,
}

impl Interval {
    pub fn starting_at(start: Instant, period: Duration) -> Self {
        Self {
            period,
            next: start + period,
        }
    }

    /// Number of periods elapsed up to `now`; consumes them.
    pub fn due(&mut self, now: Instant) -> u32 {
        let mut fired = 0;
        while now >= self.next {
            fired += 1;
            self.next += self.period;
        }
        fired
    }
}

/// Raised once per natural completion, never by pause or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Finished { cycle: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AdjustRefused {
    Running,
    AtLimit,
}

#[derive(Debug, Clone)]
pub struct CountdownTimer {
    duration: DurationCell,
    remaining: u32,
    schedule: Option<Interval>,
    cycle: u64,
}

impl CountdownTimer {
    pub fn new(total_secs: u32) -> Self {
        let total = clamp_total(total_secs);
        Self {
            duration: DurationCell::new(total),
            remaining: total,
            schedule: None,
            cycle: 0,
        }
    }

    pub fn with_minutes(minutes: u32) -> Self {
        Self::new(minutes.saturating_mul(60))
    }

    /// Handle on the live duration, for anything that must follow it.
    pub fn duration_cell(&self) -> DurationCell {
        self.duration.clone()
    }

    pub fn total_secs(&self) -> u32 {
        self.duration.get()
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.schedule.is_some()
    }

    /// Runs started so far; completion events carry the cycle they end.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Returns false if already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_running() {
            return false;
        }
        if self.remaining == 0 {
            self.remaining = self.duration.get();
        }
        self.cycle += 1;
        self.schedule = Some(Interval::starting_at(now, TICK));
        true
    }

    pub fn pause(&mut self) {
        self.schedule = None;
    }

    pub fn toggle(&mut self, now: Instant) {
        if self.is_running() {
            self.pause();
        } else {
            self.start(now);
        }
    }

    /// Pause and rewind to the full duration.
    pub fn reset(&mut self) {
        self.pause();
        self.remaining = self.duration.get();
    }

    /// Change the duration by whole minutes. Refused while running; clamped to
    /// [`MIN_MINUTES`, `MAX_MINUTES`]. The idle countdown shows the new value.
    pub fn adjust_minutes(&mut self, delta: i32) -> Result<u32, AdjustRefused> {
        if self.is_running() {
            return Err(AdjustRefused::Running);
        }
        let current = self.duration.get() as i64;
        let next = clamp_total((current + delta as i64 * 60).clamp(0, u32::MAX as i64) as u32);
        if next as i64 == current {
            return Err(AdjustRefused::AtLimit);
        }
        self.set_total_secs(next);
        Ok(next)
    }

    /// Set the duration directly; updates the display only when idle.
    pub fn set_total_secs(&mut self, secs: u32) {
        let total = clamp_total(secs);
        self.duration.set(total);
        if !self.is_running() {
            self.remaining = total;
        } else {
            self.remaining = self.remaining.min(total);
        }
    }

    /// One second of countdown. On reaching zero the timer stops, rearms to
    /// the current duration and reports completion.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if !self.is_running() {
            return None;
        }
        if self.remaining <= 1 {
            self.schedule = None;
            self.remaining = self.duration.get();
            return Some(TimerEvent::Finished { cycle: self.cycle });
        }
        self.remaining -= 1;
        None
    }

    /// Apply every second elapsed on the schedule up to `now`.
    pub fn poll(&mut self, now: Instant) -> Option<TimerEvent> {
        let due = match self.schedule.as_mut() {
            Some(schedule) => schedule.due(now),
            None => return None,
        };
        for _ in 0..due {
            if let Some(ev) = self.tick() {
                return Some(ev);
            }
        }
        None
    }
}

fn clamp_total(secs: u32) -> u32 {
    secs.clamp(MIN_MINUTES * 60, MAX_MINUTES * 60)
}

/// `mm:ss` for the display
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
