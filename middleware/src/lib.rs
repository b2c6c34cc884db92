mod cache;
mod client;
mod error;
pub mod jail;
mod midclt;
mod rest;
mod types;

pub use cache::RootCache;
pub use client::{METHOD_ENV, Middleware, MiddlewareMethod};
pub use error::{JobFailure, JobProgress, MiddlewareError};
pub use midclt::{MIDCLT_CMD, MidcltClient};
pub use rest::RestClient;
pub use types::*;
