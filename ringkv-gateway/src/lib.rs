pub mod coordinator;
pub mod handlers;
pub mod poll;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
