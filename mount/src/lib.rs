mod error;
mod resolve;
mod types;

pub use error::MountError;
pub use resolve::{JailPaths, is_absolute, resolve_target};
pub use types::*;
