pub mod clock;
pub mod log_sanitizer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use log_sanitizer::*;
