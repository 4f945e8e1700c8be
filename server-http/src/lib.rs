pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod sessions;
pub mod state;
pub mod storage;
pub mod validation;

// Re-export key types
pub use routes::build_router;
pub use state::AppState;
