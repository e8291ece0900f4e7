//! External bitmap converter invocation
//!
//! The converter is an out-of-process tool (texconv-compatible command line)
//! that re-encodes one bitmap file in place. Each invocation is bounded by a
//! wall-clock timeout and its output is captured rather than streamed.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::ConverterConfig;
use crate::error::{Result, TexSlimError};
use crate::processing::plan::ResizePlan;

/// Default per-invocation budget
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How much captured stderr to keep for diagnostics
const DETAIL_LIMIT: usize = 512;

/// Result of one converter invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// Exit code 0
    Success,
    /// The tool ran but failed, or was killed after the timeout
    ToolFailure {
        exit_code: Option<i32>,
        timed_out: bool,
        detail: String,
    },
    /// The tool could not be launched at all
    ProcessError(String),
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Convert into the crate error taxonomy, attributing failures to `file`
    pub fn into_result(self, file: &Path, timeout: Duration) -> Result<()> {
        match self {
            Self::Success => Ok(()),
            Self::ToolFailure { timed_out: true, .. } => Err(TexSlimError::timeout(
                timeout.as_secs(),
                Some(file.to_path_buf()),
            )),
            Self::ToolFailure { exit_code, .. } => Err(TexSlimError::tool_failure(
                exit_code,
                Some(file.to_path_buf()),
            )),
            Self::ProcessError(message) => Err(TexSlimError::process(message)),
        }
    }
}

/// Re-encodes one bitmap file according to a plan
#[async_trait]
pub trait BitmapConverter: Send + Sync {
    /// Convert `bitmap_path` in place. Never retries.
    async fn convert(&self, bitmap_path: &Path, plan: &ResizePlan, work_dir: &Path)
        -> ConversionOutcome;

    /// Per-invocation wall-clock budget
    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }
}

/// Runs a texconv-compatible executable as a child process
#[derive(Debug, Clone)]
pub struct TexconvConverter {
    executable: PathBuf,
    timeout: Duration,
    extra_args: Vec<String>,
}

impl TexconvConverter {
    /// Create a converter for the given executable with the default timeout
    pub fn new<P: Into<PathBuf>>(executable: P) -> Self {
        Self {
            executable: executable.into(),
            timeout: DEFAULT_TIMEOUT,
            extra_args: Vec::new(),
        }
    }

    /// Build from configuration, locating the executable if no path is set
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            executable: locate_converter(config.path.as_deref()),
            timeout: Duration::from_secs(config.timeout_seconds),
            extra_args: config.extra_args.clone(),
        }
    }

    /// Override the wall-clock timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Append arguments placed before the input path
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Command line for one conversion, excluding the executable
    pub fn build_arguments(&self, bitmap_path: &Path, plan: &ResizePlan, work_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-w".into(),
            plan.target_width.to_string().into(),
            "-h".into(),
            plan.target_height.to_string().into(),
            "-m".into(),
            plan.target_mip_count.to_string().into(),
            "-f".into(),
            plan.target_format.as_str().into(),
            "-o".into(),
            work_dir.as_os_str().to_os_string(),
            "-y".into(),
        ];
        args.extend(self.extra_args.iter().map(OsString::from));
        args.push(bitmap_path.as_os_str().to_os_string());
        args
    }
}

#[async_trait]
impl BitmapConverter for TexconvConverter {
    async fn convert(
        &self,
        bitmap_path: &Path,
        plan: &ResizePlan,
        work_dir: &Path,
    ) -> ConversionOutcome {
        let args = self.build_arguments(bitmap_path, plan, work_dir);
        debug!("Running {:?} {:?}", self.executable, args);

        let start = Instant::now();
        let mut child = match Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return ConversionOutcome::ProcessError(format!(
                    "failed to spawn {}: {}",
                    self.executable.display(),
                    e
                ))
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let finished = tokio::time::timeout(self.timeout, async {
            let (status, _stdout, stderr) = tokio::join!(child.wait(), drain(stdout), drain(stderr));
            (status, stderr)
        })
        .await;

        match finished {
            Ok((Ok(status), stderr)) => {
                debug!(
                    "Converter finished in {:.2}s with {}",
                    start.elapsed().as_secs_f64(),
                    status
                );
                if status.success() {
                    ConversionOutcome::Success
                } else {
                    ConversionOutcome::ToolFailure {
                        exit_code: status.code(),
                        timed_out: false,
                        detail: tail(&stderr),
                    }
                }
            }
            Ok((Err(e), _)) => {
                ConversionOutcome::ProcessError(format!("failed to wait for converter: {}", e))
            }
            Err(_) => {
                warn!(
                    "Converter exceeded {}s on {:?}, terminating",
                    self.timeout.as_secs(),
                    bitmap_path
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to terminate converter: {}", e);
                }
                ConversionOutcome::ToolFailure {
                    exit_code: None,
                    timed_out: true,
                    detail: format!("timed out after {}s", self.timeout.as_secs()),
                }
            }
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buffer).await;
    }
    buffer
}

fn tail(output: &[u8]) -> String {
    let text = String::from_utf8_lossy(output);
    let text = text.trim();
    match text.char_indices().rev().nth(DETAIL_LIMIT) {
        Some((index, _)) => text[index..].to_string(),
        None => text.to_string(),
    }
}

/// Find the converter executable.
///
/// An explicit path wins. Otherwise the usual install locations are tried,
/// and finally the bare name is left for `PATH` lookup at spawn time.
pub fn locate_converter(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    }

    let mut candidates = vec![
        PathBuf::from("texconv.exe"),
        PathBuf::from("tools/texconv.exe"),
        PathBuf::from("../texconv.exe"),
    ];
    if let Some(dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
        candidates.push(dir.join("texconv.exe"));
        candidates.push(dir.join("texconv"));
        candidates.push(dir.join("tools").join("texconv.exe"));
    }

    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .map(|found| std::fs::canonicalize(&found).unwrap_or(found))
        .unwrap_or_else(|| PathBuf::from(if cfg!(windows) { "texconv.exe" } else { "texconv" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::plan::TargetFormat;

    fn sample_plan() -> ResizePlan {
        ResizePlan {
            source_width: 2048,
            source_height: 1024,
            target_width: 512,
            target_height: 256,
            target_format: TargetFormat::Bc1Unorm,
            target_mip_count: 9,
            needed: true,
        }
    }

    #[test]
    fn test_argument_order() {
        let converter = TexconvConverter::new("texconv").with_extra_args(["-nologo"]);
        let args = converter.build_arguments(
            Path::new("/work/wall.dds"),
            &sample_plan(),
            Path::new("/work"),
        );
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(
            args,
            vec![
                "-w", "512", "-h", "256", "-m", "9", "-f", "BC1_UNORM", "-o", "/work", "-y",
                "-nologo", "/work/wall.dds"
            ]
        );
    }

    #[test]
    fn test_outcome_into_result() {
        let file = Path::new("a.dds");
        assert!(ConversionOutcome::Success.into_result(file, DEFAULT_TIMEOUT).is_ok());

        let timed_out = ConversionOutcome::ToolFailure {
            exit_code: None,
            timed_out: true,
            detail: String::new(),
        };
        assert!(matches!(
            timed_out.into_result(file, DEFAULT_TIMEOUT),
            Err(TexSlimError::Timeout { timeout_secs: 60, .. })
        ));

        let failed = ConversionOutcome::ToolFailure {
            exit_code: Some(1),
            timed_out: false,
            detail: String::new(),
        };
        assert!(matches!(
            failed.into_result(file, DEFAULT_TIMEOUT),
            Err(TexSlimError::ToolFailure { exit_code: Some(1), .. })
        ));
    }

    #[test]
    fn test_tail_keeps_end_of_output() {
        let long = "x".repeat(2000) + "final line";
        let detail = tail(long.as_bytes());
        assert!(detail.ends_with("final line"));
        assert!(detail.len() <= DETAIL_LIMIT + 1);
    }

    #[test]
    fn test_explicit_converter_path_wins() {
        let located = locate_converter(Some(Path::new("/definitely/not/here/texconv")));
        assert_eq!(located, PathBuf::from("/definitely/not/here/texconv"));
    }

    #[tokio::test]
    async fn test_missing_executable_is_process_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let converter = TexconvConverter::new(dir.path().join("no-such-converter"));
        let outcome = converter
            .convert(&dir.path().join("a.dds"), &sample_plan(), dir.path())
            .await;
        assert!(matches!(outcome, ConversionOutcome::ProcessError(_)));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-texconv.sh");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn test_zero_exit_is_success() {
            let dir = tempfile::TempDir::new().unwrap();
            let args_file = dir.path().join("args.txt");
            let exe = script(dir.path(), &format!("echo \"$@\" > '{}'", args_file.display()));

            let outcome = TexconvConverter::new(exe)
                .convert(&dir.path().join("a.dds"), &sample_plan(), dir.path())
                .await;
            assert_eq!(outcome, ConversionOutcome::Success);

            let recorded = std::fs::read_to_string(args_file).unwrap();
            assert!(recorded.starts_with("-w 512 -h 256 -m 9 -f BC1_UNORM -o "));
            assert!(recorded.trim_end().ends_with("a.dds"));
        }

        #[tokio::test]
        async fn test_nonzero_exit_is_tool_failure() {
            let dir = tempfile::TempDir::new().unwrap();
            let exe = script(dir.path(), "echo 'bad input' >&2\nexit 3");

            let outcome = TexconvConverter::new(exe)
                .convert(&dir.path().join("a.dds"), &sample_plan(), dir.path())
                .await;
            assert_eq!(
                outcome,
                ConversionOutcome::ToolFailure {
                    exit_code: Some(3),
                    timed_out: false,
                    detail: "bad input".to_string(),
                }
            );
        }

        #[tokio::test]
        async fn test_slow_converter_is_killed() {
            let dir = tempfile::TempDir::new().unwrap();
            let pid_file = dir.path().join("pid.txt");
            let exe = script(
                dir.path(),
                &format!("echo $$ > '{}'\nexec sleep 30", pid_file.display()),
            );

            let start = Instant::now();
            let outcome = TexconvConverter::new(exe)
                .with_timeout(Duration::from_millis(300))
                .convert(&dir.path().join("a.dds"), &sample_plan(), dir.path())
                .await;

            assert!(matches!(
                outcome,
                ConversionOutcome::ToolFailure { timed_out: true, exit_code: None, .. }
            ));
            assert!(start.elapsed() < Duration::from_secs(10));

            // The sleeper must be gone, not left running in the background
            let pid = std::fs::read_to_string(&pid_file).unwrap();
            let alive = std::process::Command::new("kill")
                .args(["-0", pid.trim()])
                .stderr(std::process::Stdio::null())
                .status()
                .unwrap();
            assert!(!alive.success(), "converter {} still running", pid.trim());
        }
    }
}
