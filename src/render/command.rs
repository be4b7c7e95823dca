//! Renderer backed by an external command (pdflatex by default).

use std::io::{Read, Seek, SeekFrom};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::error::{RenderError, RenderResult};
use super::{RenderRequest, Renderer};
use crate::config::RenderConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Runs `<program> <args..> -output-directory=<dir> -jobname=<job> <source>`
/// from the source's directory.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone(), config.timeout())
    }

    fn command(&self, request: &RenderRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(format!("-output-directory={}", request.output_dir.display()))
            .arg(format!("-jobname={}", request.job_name))
            .arg(&request.source)
            .stdin(Stdio::null());

        // \input and friends resolve relative to the document
        if let Some(parent) = request.source.parent() {
            cmd.current_dir(parent);
        }
        cmd
    }
}

impl Renderer for CommandRenderer {
    fn render(&self, request: &RenderRequest) -> RenderResult<()> {
        // stdout and stderr share one file so the combined output keeps its order
        let mut log = tempfile::tempfile()?;

        let mut child = self
            .command(request)
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log.try_clone()?))
            .spawn()
            .map_err(|source| RenderError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let status = wait_with_timeout(&mut child, self.timeout)?;
        let output = read_output(&mut log)?;

        match status {
            Some(status) if status.success() => {
                crate::debug_event!("render", "command ok", "{}", request.source.display());
                Ok(())
            }
            Some(status) => Err(RenderError::Failed {
                path: request.source.clone(),
                status: status.code(),
                output,
            }),
            None => Err(RenderError::TimedOut {
                path: request.source.clone(),
                timeout: self.timeout,
                output,
            }),
        }
    }
}

/// Wait for the child, killing it once the deadline passes.
///
/// Renders run on plain worker threads with no async runtime, so this polls
/// `try_wait` instead of using `tokio::process` with a timeout.
///
/// Returns `None` on timeout.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            if let Err(e) = child.kill() {
                tracing::warn!("[render] failed to kill timed out renderer: {e}");
            }
            // Reap so the process does not linger as a zombie
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn read_output(log: &mut std::fs::File) -> std::io::Result<String> {
    log.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    log.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn request(dir: &TempDir) -> RenderRequest {
        RenderRequest {
            source: dir.path().join("doc.tex"),
            output_dir: dir.path().join("out"),
            job_name: "job".to_string(),
        }
    }

    fn sh(script: &str, timeout: Duration) -> CommandRenderer {
        // `sh -c <script>` receives the renderer arguments as $0, $1, ...
        CommandRenderer::new("sh", vec!["-c".to_string(), script.to_string()], timeout)
    }

    #[test]
    fn test_success_exit() {
        let dir = TempDir::new().unwrap();
        let renderer = sh("exit 0", Duration::from_secs(5));
        renderer.render(&request(&dir)).unwrap();
    }

    #[test]
    fn test_failure_carries_combined_output() {
        let dir = TempDir::new().unwrap();
        let renderer = sh(
            "echo 'to stdout'; echo 'to stderr' >&2; exit 3",
            Duration::from_secs(5),
        );

        let err = renderer.render(&request(&dir)).unwrap_err();
        match err {
            RenderError::Failed { status, output, .. } => {
                assert_eq!(status, Some(3));
                assert!(output.contains("to stdout"));
                assert!(output.contains("to stderr"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_timeout_kills_renderer() {
        let dir = TempDir::new().unwrap();
        let renderer = sh("sleep 5", Duration::from_millis(100));

        let started = Instant::now();
        let err = renderer.render(&request(&dir)).unwrap_err();
        assert!(matches!(err, RenderError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let renderer = CommandRenderer::new(
            "texbook-no-such-renderer",
            Vec::new(),
            Duration::from_secs(1),
        );

        let err = renderer.render(&request(&dir)).unwrap_err();
        assert!(matches!(err, RenderError::Spawn { .. }));
    }

    #[test]
    fn test_arguments_passed_in_order() {
        let dir = TempDir::new().unwrap();
        let renderer = sh(
            "echo \"$0|$1|$2\"; exit 1",
            Duration::from_secs(5),
        );
        let req = request(&dir);

        let err = renderer.render(&req).unwrap_err();
        let output = err.output().unwrap();
        let expected_dir = PathBuf::from(dir.path()).join("out");
        assert!(output.contains(&format!("-output-directory={}", expected_dir.display())));
        assert!(output.contains("-jobname=job"));
        assert!(output.contains("doc.tex"));
    }
}
