pub mod engine;
pub mod locks;

pub use engine::{AttendanceEngine, AttendanceError, Clock, SystemClock};
pub use locks::UserLocks;
