pub mod anti_entropy;
pub mod bootstrap;
pub mod coordinator;
pub mod gossip;
pub mod handlers;
pub mod health;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
