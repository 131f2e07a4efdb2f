//! Clock Port
//!
//! Source of the current UTC time used to derive usage windows.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
