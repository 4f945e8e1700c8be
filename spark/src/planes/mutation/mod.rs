pub mod runner;

pub use runner::{MutationOptions, MutationRunner};
