//! Process-backed [`AdminTool`] that shells out to `nodetool`.
//!
//! Every invocation is built from a base command (the program plus any
//! fixed leading arguments such as `-h <host> -p <port>`), optional
//! credentials, and the subcommand. Credentials never appear in logs.

use std::fmt;
use std::time::Duration;

use ringrepair_core::keyspace::parse_keyspace_listing;
use ringrepair_core::topology::{parse_ring, parse_status, NodeStatusRow, RingEntry};
use tokio::process::Command;

use super::subprocess;
use super::{AdminTool, CommandLine, RepairRequest, ToolError};

/// JMX principal and credential passed to every nodetool invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// [`AdminTool`] implementation backed by the `nodetool` CLI.
#[derive(Debug, Clone)]
pub struct NodetoolClient {
    program: String,
    base_args: Vec<String>,
    credentials: Option<Credentials>,
    unit_timeout: Option<Duration>,
}

impl NodetoolClient {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            credentials: None,
            unit_timeout: None,
        }
    }

    /// Arguments placed before credentials and the subcommand on every call.
    pub fn with_base_args(mut self, args: Vec<String>) -> Self {
        self.base_args = args;
        self
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Kill a repair that runs longer than `timeout`. `None` waits forever.
    pub fn with_unit_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.unit_timeout = timeout;
        self
    }

    /// Arguments for a single-range repair, without base args or
    /// credentials.
    pub fn repair_args(request: &RepairRequest) -> Vec<String> {
        let mut args = vec!["repair".to_string()];
        if request.primary_range_only {
            args.push("-pr".to_string());
        }
        args.extend([
            "-st".to_string(),
            request.range.start.to_string(),
            "-et".to_string(),
            request.range.end.to_string(),
            "--".to_string(),
            request.keyspace.clone(),
        ]);
        args
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args);
        if let Some(creds) = &self.credentials {
            cmd.arg("-u")
                .arg(&creds.username)
                .arg("-pw")
                .arg(&creds.password);
        }
        cmd.args(args);
        cmd
    }

    fn command_line(&self, args: &[String]) -> String {
        let mut shown = self.base_args.clone();
        if let Some(creds) = &self.credentials {
            shown.extend([
                "-u".to_string(),
                creds.username.clone(),
                "-pw".to_string(),
                "****".to_string(),
            ]);
        }
        shown.extend_from_slice(args);
        CommandLine {
            program: &self.program,
            args: &shown,
        }
        .to_string()
    }

    async fn query(&self, subcommand: &str) -> Result<String, ToolError> {
        let args = vec![subcommand.to_string()];
        let command_line = self.command_line(&args);
        subprocess::capture(&mut self.command(&args), &self.program, &command_line).await
    }
}

impl AdminTool for NodetoolClient {
    async fn query_status(&self) -> Result<Vec<NodeStatusRow>, ToolError> {
        let output = self.query("status").await?;
        Ok(parse_status(&output))
    }

    async fn query_ring(&self) -> Result<Vec<RingEntry>, ToolError> {
        let output = self.query("ring").await?;
        Ok(parse_ring(&output))
    }

    async fn query_keyspaces(&self) -> Result<Vec<String>, ToolError> {
        let output = self.query("keyspaces").await?;
        Ok(parse_keyspace_listing(&output))
    }

    async fn run_repair(&self, request: &RepairRequest) -> Result<(), ToolError> {
        let args = Self::repair_args(request);
        let command_line = self.command_line(&args);
        tracing::info!(command = %command_line, "Executing repair");
        subprocess::stream(
            &mut self.command(&args),
            &self.program,
            &command_line,
            self.unit_timeout,
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use assert_matches::assert_matches;
    use ringrepair_core::token::{Token, TokenRange};

    use super::*;

    /// Write a fake nodetool script into `dir` that records its arguments
    /// and answers each subcommand with canned output.
    fn write_fake_nodetool(dir: &Path, repair_exit: i32) -> PathBuf {
        let args_log = dir.join("args.log");
        let script = format!(
            r#"echo "$@" >> {log}
for arg in "$@"; do
  case "$arg" in
    status)
      echo "--  Address    Load      Tokens  Owns  Host ID  Rack"
      echo "UN  10.0.0.5   1.2 GiB   2       ?     abcd     rack1"
      exit 0 ;;
    ring)
      echo "Address    Rack   Status  State   Load      Owns    Token"
      echo "10.0.0.5   rack1  Up      Normal  1.2 GiB   50.00%  -100"
      echo "10.0.0.6   rack1  Up      Normal  1.1 GiB   50.00%  0"
      echo "10.0.0.5   rack1  Up      Normal  1.2 GiB   50.00%  100"
      exit 0 ;;
    keyspaces)
      printf "system\napp_data\nsystem_auth\n"
      exit 0 ;;
    repair)
      echo "[repair #1] Repair session started"
      echo "[repair #1] Repair completed" >&2
      exit {repair_exit} ;;
  esac
done
exit 9
"#,
            log = args_log.display(),
        );
        let path = dir.join("nodetool.sh");
        std::fs::write(&path, script).expect("write fake nodetool");
        path
    }

    /// Fake scripts run through `bash` so the test never executes a file it
    /// just wrote.
    fn client(dir: &Path, repair_exit: i32) -> NodetoolClient {
        let script = write_fake_nodetool(dir, repair_exit);
        NodetoolClient::new("bash").with_base_args(vec![script.display().to_string()])
    }

    fn request(primary: bool) -> RepairRequest {
        RepairRequest {
            keyspace: "app_data".to_string(),
            range: TokenRange::new(Token(100), Token(-100)),
            primary_range_only: primary,
        }
    }

    #[test]
    fn repair_args_layout() {
        assert_eq!(
            NodetoolClient::repair_args(&request(false)),
            vec!["repair", "-st", "100", "-et", "-100", "--", "app_data"]
        );
        assert_eq!(
            NodetoolClient::repair_args(&request(true)),
            vec!["repair", "-pr", "-st", "100", "-et", "-100", "--", "app_data"]
        );
    }

    #[test]
    fn command_line_masks_password() {
        let client = NodetoolClient::new("nodetool")
            .with_credentials(Some(Credentials::new("admin", "s3cret")));
        let shown = client.command_line(&["ring".to_string()]);
        assert_eq!(shown, "nodetool -u admin -pw **** ring");
        assert!(!shown.contains("s3cret"));
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials::new("admin", "s3cret");
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("admin"));
        assert!(!dbg.contains("s3cret"));
    }

    #[tokio::test]
    async fn status_ring_and_keyspaces_are_parsed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = client(dir.path(), 0);

        let status = client.query_status().await.expect("status");
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].address, "10.0.0.5");

        let ring = client.query_ring().await.expect("ring");
        assert_eq!(ring.len(), 3);
        assert_eq!(ring[1].address, "10.0.0.6");
        assert_eq!(ring[2].token, Token(100));

        let keyspaces = client.query_keyspaces().await.expect("keyspaces");
        assert_eq!(keyspaces, vec!["system", "app_data", "system_auth"]);
    }

    #[tokio::test]
    async fn credentials_precede_subcommand() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = client(dir.path(), 0)
            .with_credentials(Some(Credentials::new("admin", "s3cret")));

        client.run_repair(&request(true)).await.expect("repair");

        let log = std::fs::read_to_string(dir.path().join("args.log")).expect("args log");
        assert_eq!(
            log.trim(),
            "-u admin -pw s3cret repair -pr -st 100 -et -100 -- app_data"
        );
    }

    #[tokio::test]
    async fn failed_repair_reports_exit_code() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = client(dir.path(), 2);
        let result = client.run_repair(&request(false)).await;
        assert_matches!(result, Err(ToolError::NonZeroExit { exit_code: 2, .. }));
    }

    #[tokio::test]
    async fn missing_binary_is_not_found() {
        let client = NodetoolClient::new("/nonexistent/bin/nodetool");
        assert_matches!(client.query_ring().await, Err(ToolError::NotFound { .. }));
        assert_matches!(
            client.run_repair(&request(false)).await,
            Err(ToolError::NotFound { .. })
        );
    }
}
