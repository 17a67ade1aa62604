pub mod admission;
pub mod retry;

pub use admission::{Admission, InFlightGuard};
pub use retry::retry;
