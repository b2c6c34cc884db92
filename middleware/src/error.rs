use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Progress information attached to a middleware job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    #[serde(default)]
    pub percent: Option<f64>,
    /// Running log of the job's output.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub extra: Option<Value>,
}

/// Structured payload of a failed job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    #[serde(default)]
    pub progress: Option<JobProgress>,
    /// The job's stderr error message.
    #[serde(default)]
    pub error: Option<String>,
    /// The failed job's stack trace.
    #[serde(default)]
    pub exception: Option<String>,
}

impl JobFailure {
    /// Read a failure payload out of a JSON error body.
    ///
    /// The message comes from `error` or `message`, the stack trace from
    /// `exception`, `traceback` or `trace` (a string, or an object holding a
    /// `formatted` string). Returns `None` when the body carries neither.
    pub fn from_error_body(body: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(body.trim()).ok()?;
        let object = value.as_object()?;

        let text = |keys: &[&str]| {
            keys.iter().find_map(|key| match object.get(*key)? {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => o.get("formatted")?.as_str().map(str::to_string),
                _ => None,
            })
        };

        let error = text(&["error", "message"]);
        let exception = text(&["exception", "traceback", "trace"]);
        if error.is_none() && exception.is_none() {
            return None;
        }

        let progress = object
            .get("progress")
            .and_then(|p| serde_json::from_value(p.clone()).ok());

        Some(Self {
            progress,
            error,
            exception,
        })
    }

    /// Read a failure payload out of what a failed command printed.
    ///
    /// A JSON body is read as in [`JobFailure::from_error_body`]. A Python
    /// traceback keeps the whole text as the exception and its last line as
    /// the error. Anything else becomes the error message.
    pub fn from_command_output(output: &str) -> Option<Self> {
        let output = output.trim();
        if output.is_empty() {
            return None;
        }
        if let Some(failure) = Self::from_error_body(output) {
            return Some(failure);
        }

        if output.contains("Traceback (most recent call last)") {
            let last = output
                .lines()
                .rev()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string);
            return Some(Self {
                progress: None,
                error: last,
                exception: Some(output.to_string()),
            });
        }

        Some(Self {
            progress: None,
            error: Some(output.to_string()),
            exception: None,
        })
    }
}

#[derive(Error, Debug)]
pub enum MiddlewareError {
    #[error("{command} exited with status {status:?}: {output:?}")]
    CommandFailed {
        command: String,
        status: Option<i32>,
        output: String,
        details: Option<JobFailure>,
    },

    #[error("call to {method} failed: {message}")]
    Call {
        method: String,
        message: String,
        details: Option<JobFailure>,
    },

    #[error("{}: job {method} failed", .failure.error.as_deref().unwrap_or("job error"))]
    Job { method: String, failure: JobFailure },

    #[error("unknown middleware method: {0}")]
    UnknownMethod(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MiddlewareError {
    /// Failure payload, if the middleware attached one.
    pub fn details(&self) -> Option<&JobFailure> {
        match self {
            MiddlewareError::Job { failure, .. } => Some(failure),
            MiddlewareError::Call { details, .. } | MiddlewareError::CommandFailed { details, .. } => {
                details.as_ref()
            }
            _ => None,
        }
    }
}
