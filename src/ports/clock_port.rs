//! Wall-clock port used by paced feeds.

use chrono::NaiveDateTime;

pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}
