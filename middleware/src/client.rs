use crate::error::MiddlewareError;
use async_trait::async_trait;
use serde_json::Value;

/// Environment variable selecting the transport.
pub const METHOD_ENV: &str = "middleware_method";

/// A way of reaching the NAS middleware daemon.
///
/// Every transport exposes the same two operations: a plain call, and a
/// job, which may run for a long time and is waited on before returning.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, MiddlewareError>;

    async fn job(&self, method: &str, args: Vec<Value>) -> Result<Value, MiddlewareError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MiddlewareMethod {
    /// The `midclt` command-line tool on the NAS itself.
    #[default]
    Midclt,
    /// The HTTP API.
    Rest,
}

impl std::str::FromStr for MiddlewareMethod {
    type Err = MiddlewareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "midclt" => Ok(MiddlewareMethod::Midclt),
            "rest" | "client" => Ok(MiddlewareMethod::Rest),
            other => Err(MiddlewareError::UnknownMethod(other.to_string())),
        }
    }
}

impl std::fmt::Display for MiddlewareMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MiddlewareMethod::Midclt => write!(f, "midclt"),
            MiddlewareMethod::Rest => write!(f, "rest"),
        }
    }
}
