pub mod inquiry;
pub mod submission;

pub use inquiry::*;
pub use submission::*;
