//! Wall-clock collaborator

use chrono::{Local, NaiveDateTime};

pub trait Clock {
    /// Current local time as kept by the real-time clock.
    fn now(&self) -> NaiveDateTime;
}

/// Host clock backed by the operating system's local time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
