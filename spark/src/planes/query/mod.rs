pub mod cache;
pub mod operation;
pub mod retry;

pub use cache::{QueryCache, QueryCacheSettings};
pub use operation::{QueryOptions, UnauthorizedBehavior};
pub use retry::RetryPolicy;
