use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("jail root unavailable for {jail}: {source}")]
    RootUnavailable {
        jail: String,
        #[source]
        source: jailtab_middleware::MiddlewareError,
    },

    #[error("cannot resolve mount point: {0}")]
    Resolution(#[from] jailtab_mount::MountError),

    #[error("mount point {target} is listed more than once")]
    DuplicateTarget { target: String },

    #[error("mount point {target} matches {} existing entries: {}", .ids.len(), .ids.join(", "))]
    AmbiguousMatch { target: String, ids: Vec<String> },

    #[error("middleware error: {0}")]
    Middleware(#[from] jailtab_middleware::MiddlewareError),
}
