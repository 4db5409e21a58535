use chrono::{DateTime, Utc};

/// Port for reading the current time. Services never call `Utc::now()`
/// directly so window and lockout expiry can be driven in tests.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}
