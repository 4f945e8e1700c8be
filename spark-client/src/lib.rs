//! HTTP transport and the typed call sites of the tutoring API.

mod error;
pub mod keys;
mod transport;
mod tutor;

pub use error::ClientError;
pub use transport::HttpTransport;
pub use tutor::{DocumentUpload, TutorApi};
