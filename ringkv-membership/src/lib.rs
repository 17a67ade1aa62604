pub mod membership;
pub mod snapshot;

pub use membership::Membership;
pub use snapshot::{merge, MembershipSnapshot, NodeState};
