//! Snyk CLI scanning backend.
//!
//! This module drives the `snyk` command-line tool:
//!
//! - `snyk test [--org=<org>] --json <path>` for findings
//! - `snyk monitor [--org=<org>] <path>` for dashboard registration
//!
//! The API token is passed to the child process as `SNYK_TOKEN` and is never
//! placed on the command line.
//!
//! # Exit codes
//!
//! | code | `test` meaning                 |
//! |------|--------------------------------|
//! | 0    | no vulnerabilities             |
//! | 1    | vulnerabilities found          |
//! | 2    | failure                        |
//! | 3    | no supported projects detected |

use crate::config::SnykSettings;
use crate::core::{Finding, OutputFormatError, Scanner, ScannerError};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

const TOOL: &str = "snyk";

/// A [`Scanner`] backed by the Snyk CLI.
#[derive(Debug, Clone)]
pub struct SnykCliScanner {
    binary: String,
    token: Option<SecretString>,
    org: Option<String>,
}

impl SnykCliScanner {
    /// Creates a scanner using `snyk` from `PATH` and no token.
    pub fn new() -> Self {
        Self {
            binary: TOOL.to_string(),
            token: None,
            org: None,
        }
    }

    /// Creates a scanner from settings.
    pub fn from_settings(settings: &SnykSettings) -> Self {
        Self {
            binary: settings.binary.clone(),
            token: settings.token.clone(),
            org: settings.org.clone(),
        }
    }

    /// Sets the binary.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Sets the API token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::new(token.into().into()));
        self
    }

    /// Sets the organization.
    pub fn with_org(mut self, org: impl Into<String>) -> Self {
        self.org = Some(org.into());
        self
    }

    fn args(&self, command: &str, path: &Path) -> Vec<String> {
        let mut args = vec![command.to_string()];
        if let Some(org) = &self.org {
            args.push(format!("--org={}", org));
        }
        if command == "test" {
            args.push("--json".to_string());
        }
        args.push(path.display().to_string());
        args
    }

    async fn run(&self, command: &str, path: &Path) -> Result<Vec<u8>, ScannerError> {
        let token = self
            .token
            .as_ref()
            .filter(|t| !t.expose_secret().is_empty())
            .ok_or_else(|| ScannerError::MissingCredentials {
                tool: TOOL.to_string(),
                hint: "set SNYK_TOKEN in the environment or the config file".to_string(),
            })?;

        let args = self.args(command, path);
        tracing::debug!(
            binary = %self.binary,
            args = ?args,
            path = %path.display(),
            "Running scanner"
        );

        let output = Command::new(&self.binary)
            .args(&args)
            .current_dir(path)
            .env("SNYK_TOKEN", token.expose_secret())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ScannerError::ToolNotFound {
                binary: self.binary.clone(),
                reason: e.to_string(),
            })?;

        classify(command, output.status.code(), output.stdout, &output.stderr)
    }
}

impl Default for SnykCliScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for SnykCliScanner {
    fn name(&self) -> &str {
        TOOL
    }

    async fn scan(&self, path: &Path) -> Result<Vec<u8>, ScannerError> {
        self.run("test", path).await
    }

    async fn monitor(&self, path: &Path) -> Result<Vec<u8>, ScannerError> {
        self.run("monitor", path).await
    }

    fn parse_findings(&self, raw: &[u8]) -> Result<Vec<Finding>, OutputFormatError> {
        parse_test_output(raw)
    }
}

/// Maps a finished CLI invocation to raw output or a typed error.
fn classify(
    command: &str,
    status: Option<i32>,
    stdout: Vec<u8>,
    stderr: &[u8],
) -> Result<Vec<u8>, ScannerError> {
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&stdout),
        String::from_utf8_lossy(stderr)
    );

    if text.contains(&format!("Unknown command \"{}\"", command)) {
        return Err(ScannerError::unsupported_command(TOOL, command));
    }

    match status {
        Some(0) => return Ok(stdout),
        Some(1) if command == "test" => return Ok(stdout),
        Some(3) => {
            return Err(ScannerError::NoSupportedProjects {
                tool: TOOL.to_string(),
                details: text.trim().to_string(),
            })
        }
        _ => {}
    }

    const AUTH_MARKERS: [&str; 3] = [
        "Authentication failed",
        "requires an authenticated account",
        "MissingApiTokenError",
    ];
    if AUTH_MARKERS.iter().any(|m| text.contains(m)) {
        return Err(ScannerError::Authentication {
            tool: TOOL.to_string(),
            reason: text.trim().to_string(),
        });
    }

    Err(ScannerError::command_failed(
        TOOL,
        command,
        status,
        text.trim(),
    ))
}

#[derive(Debug, Deserialize)]
struct TestReport {
    #[serde(default)]
    vulnerabilities: Vec<Vulnerability>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Vulnerability {
    title: String,
    severity: String,
    #[serde(default)]
    module_name: String,
}

/// Parses `snyk test --json` output into findings.
///
/// Accepts a single report object or an array of reports, as produced for
/// multi-project directories. Findings keep the tool's order.
pub fn parse_test_output(raw: &[u8]) -> Result<Vec<Finding>, OutputFormatError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(OutputFormatError::Empty);
    }

    let value: serde_json::Value = serde_json::from_slice(raw)?;
    let reports: Vec<TestReport> = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };

    let mut findings = Vec::new();
    for report in reports {
        if let Some(message) = report.error {
            if report.vulnerabilities.is_empty() {
                return Err(OutputFormatError::ToolReported { message });
            }
        }
        findings.extend(
            report
                .vulnerabilities
                .into_iter()
                .map(|v| Finding::new(v.title, v.severity, v.module_name)),
        );
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Severity;

    const SINGLE: &str = r#"{
        "ok": false,
        "vulnerabilities": [
            {"id": "SNYK-JS-LODASH-1", "title": "Prototype Pollution", "severity": "high", "moduleName": "lodash"},
            {"id": "SNYK-JS-MINIMIST-2", "title": "Prototype Pollution", "severity": "medium", "moduleName": "minimist"}
        ]
    }"#;

    #[test]
    fn test_parse_single_report() {
        let findings = parse_test_output(SINGLE.as_bytes()).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].module_name, "lodash");
        assert_eq!(findings[1].module_name, "minimist");
    }

    #[test]
    fn test_parse_multi_project_report() {
        let raw = r#"[
            {"vulnerabilities": [{"title": "A", "severity": "low", "moduleName": "a"}]},
            {"vulnerabilities": []},
            {"vulnerabilities": [{"title": "B", "severity": "critical", "moduleName": "b"}]}
        ]"#;
        let findings = parse_test_output(raw.as_bytes()).unwrap();
        let titles: Vec<_> = findings.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_parse_clean_and_errors() {
        assert!(parse_test_output(br#"{"ok": true, "vulnerabilities": []}"#)
            .unwrap()
            .is_empty());
        assert!(matches!(parse_test_output(b"  \n"), Err(OutputFormatError::Empty)));
        assert!(matches!(
            parse_test_output(b"Testing /tmp/x..."),
            Err(OutputFormatError::Json(_))
        ));
        assert!(matches!(
            parse_test_output(br#"{"ok": false, "error": "Could not detect supported target files"}"#),
            Err(OutputFormatError::ToolReported { .. })
        ));
    }

    #[test]
    fn test_args() {
        let scanner = SnykCliScanner::new().with_org("acme");
        assert_eq!(
            scanner.args("test", Path::new("/w/repo")),
            vec!["test", "--org=acme", "--json", "/w/repo"]
        );
        assert_eq!(
            SnykCliScanner::new().args("monitor", Path::new("/w/repo")),
            vec!["monitor", "/w/repo"]
        );
    }

    #[test]
    fn test_classify_exit_codes() {
        assert_eq!(classify("test", Some(0), b"{}".to_vec(), b"").unwrap(), b"{}");
        assert_eq!(classify("test", Some(1), b"{}".to_vec(), b"").unwrap(), b"{}");
        assert!(matches!(
            classify("monitor", Some(1), Vec::new(), b"boom"),
            Err(ScannerError::CommandFailed { status: Some(1), .. })
        ));
        assert!(matches!(
            classify("test", Some(3), Vec::new(), b"Could not detect supported target files"),
            Err(ScannerError::NoSupportedProjects { .. })
        ));
    }

    #[test]
    fn test_classify_unsupported_and_auth() {
        let err = classify("test", Some(2), Vec::new(), b"Unknown command \"test\"").unwrap_err();
        assert!(err.is_unsupported_command());

        let err = classify(
            "test",
            Some(2),
            Vec::new(),
            b"`snyk` requires an authenticated account. Please run `snyk auth`",
        )
        .unwrap_err();
        assert!(matches!(err, ScannerError::Authentication { .. }));
    }

    #[tokio::test]
    async fn test_missing_token_does_not_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = SnykCliScanner::new().with_binary("scanfleet-no-such-snyk");
        let err = scanner.scan(dir.path()).await.unwrap_err();
        assert!(matches!(err, ScannerError::MissingCredentials { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = SnykCliScanner::new()
            .with_binary("scanfleet-no-such-snyk")
            .with_token("t");
        let err = scanner.monitor(dir.path()).await.unwrap_err();
        assert!(matches!(err, ScannerError::ToolNotFound { .. }));
    }
}
