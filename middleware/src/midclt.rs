use crate::client::Middleware;
use crate::error::{JobFailure, MiddlewareError};
use async_trait::async_trait;
use serde_json::Value;

pub const MIDCLT_CMD: &str = "midclt";

const JOB_OPTS: [&str; 3] = ["-job", "-jp", "description"];

/// Talks to the middleware by running `midclt call` on the local host.
pub struct MidcltClient {
    command: String,
}

impl MidcltClient {
    pub fn new() -> Self {
        Self::with_command(MIDCLT_CMD)
    }

    pub fn with_command(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }

    async fn run(
        &self,
        method: &str,
        args: &[Value],
        opts: &[&str],
    ) -> Result<Value, MiddlewareError> {
        let argv = build_args(method, args, opts)?;

        tracing::debug!("Running {} {}", self.command, argv.join(" "));

        let output = tokio::process::Command::new(&self.command)
            .args(&argv)
            .output()
            .await?;

        if !output.status.success() {
            // midclt reports failures on either stream.
            let mut combined = output.stdout;
            combined.extend_from_slice(&output.stderr);

            let text = String::from_utf8_lossy(&combined).trim().to_string();
            return Err(MiddlewareError::CommandFailed {
                command: self.command.clone(),
                status: output.status.code(),
                details: JobFailure::from_command_output(&text),
                output: text,
            });
        }

        parse_output(&self.command, &output.stdout)
    }
}

impl Default for MidcltClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for MidcltClient {
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, MiddlewareError> {
        self.run(method, &args, &[]).await
    }

    async fn job(&self, method: &str, args: Vec<Value>) -> Result<Value, MiddlewareError> {
        self.run(method, &args, &JOB_OPTS).await
    }
}

/// `call [opts...] <method> <json-arg>...`
fn build_args(method: &str, args: &[Value], opts: &[&str]) -> Result<Vec<String>, MiddlewareError> {
    let mut argv = Vec::with_capacity(2 + opts.len() + args.len());
    argv.push("call".to_string());
    argv.extend(opts.iter().map(|o| o.to_string()));
    argv.push(method.to_string());

    for arg in args {
        argv.push(serde_json::to_string(arg)?);
    }

    Ok(argv)
}

fn parse_output(command: &str, output: &[u8]) -> Result<Value, MiddlewareError> {
    serde_json::from_slice(output).map_err(|e| {
        MiddlewareError::UnexpectedResponse(format!(
            "can't parse {} output {:?}: {}",
            command,
            String::from_utf8_lossy(output),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_call_args() {
        let argv = build_args("jail.fstab", &[json!("j1"), json!({"action": "LIST"})], &[])
            .unwrap();

        assert_eq!(
            argv,
            vec!["call", "jail.fstab", "\"j1\"", r#"{"action":"LIST"}"#]
        );
    }

    #[test]
    fn test_build_job_args() {
        let argv = build_args("jail.fstab", &[], &JOB_OPTS).unwrap();
        assert_eq!(argv, vec!["call", "-job", "-jp", "description", "jail.fstab"]);
    }

    #[test]
    fn test_parse_output() {
        let value = parse_output(MIDCLT_CMD, b"\"/mnt/pool/iocage\"\n").unwrap();
        assert_eq!(value, json!("/mnt/pool/iocage"));

        let err = parse_output(MIDCLT_CMD, b"Traceback (most recent call last)").unwrap_err();
        assert!(matches!(err, MiddlewareError::UnexpectedResponse(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_command_carries_payload() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("midclt");
        std::fs::write(
            &script,
            "#!/bin/sh\necho 'Traceback (most recent call last):' >&2\necho 'CallError: [EINVAL] bad entry' >&2\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let client = MidcltClient::with_command(script.to_str().unwrap());
        let err = client.call("jail.fstab", vec![json!("j1")]).await.unwrap_err();

        assert!(matches!(
            err,
            MiddlewareError::CommandFailed { status: Some(1), .. }
        ));
        let details = err.details().unwrap();
        assert_eq!(details.error.as_deref(), Some("CallError: [EINVAL] bad entry"));
        assert!(details.exception.as_deref().unwrap().starts_with("Traceback"));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let client = MidcltClient::with_command("/nonexistent/jailtab-midclt");
        let err = client.call("jail.get_iocroot", vec![]).await.unwrap_err();
        assert!(matches!(err, MiddlewareError::Io(_)));
    }
}
