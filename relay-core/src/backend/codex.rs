//! Streaming chat backend driving the codex CLI as a subprocess.
//!
//! The composed prompt is staged in a temp file wired to the child's stdin;
//! stdout is read incrementally in fixed-size chunks, lossy-decoded and
//! sanitized before emission. The temp file lives on the producer's stack so
//! its removal is unconditional, and the child carries `kill_on_drop` as a
//! final backstop against leaks.

use std::io::Write;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};
use tokio_stream::wrappers::ReceiverStream;

use super::prompt;
use super::traits::{ChatBackend, ChatTurn};
use crate::codex::CodexCli;
use crate::frame::{Frame, FrameStream};
use crate::sanitize::{sanitize_bytes, truncate_for_display};

/// Fixed read size for incremental stdout consumption.
const READ_CHUNK: usize = 4096;

/// Model used when the request leaves the identifier blank.
const DEFAULT_CODEX_MODEL: &str = "gpt-5.2-codex";

/// How much stderr to carry into a failure detail.
const ERROR_DETAIL_LIMIT: usize = 2000;

/// Signatures of a broken CLI session in sanitized output.
const AUTH_FAILURE_MARKERS: &[&str] = &[
    "not logged in",
    "unauthorized",
    "authentication required",
    "login required",
];

/// Backend that bridges a codex subprocess into frames.
pub struct CodexBackend {
    cli: CodexCli,
}

impl CodexBackend {
    pub fn new(cli: CodexCli) -> Self {
        Self { cli }
    }
}

impl Default for CodexBackend {
    fn default() -> Self {
        Self::new(CodexCli::default())
    }
}

#[async_trait]
impl ChatBackend for CodexBackend {
    fn name(&self) -> &'static str {
        "codex"
    }

    async fn stream(&self, turn: ChatTurn) -> FrameStream {
        let (tx, rx) = mpsc::channel(32);
        let cli = self.cli.clone();

        tokio::spawn(async move {
            if let Err(frame) = run_exec(&cli, &turn, &tx).await {
                if tx.send(frame).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(Frame::Done).await;
        });

        ReceiverStream::new(rx)
    }
}

/// Kill the child and reap it; used on every abnormal exit path.
async fn reclaim(child: &mut Child) {
    let _ = child.start_kill();
    let _ = child.wait().await;
}

fn contains_auth_failure(text: &str) -> bool {
    let lower = text.to_lowercase();
    AUTH_FAILURE_MARKERS.iter().any(|m| lower.contains(m))
}

async fn run_exec(cli: &CodexCli, turn: &ChatTurn, tx: &mpsc::Sender<Frame>) -> Result<(), Frame> {
    if cli.resolve_binary().is_none() {
        return Err(Frame::error("Codex CLI is not installed on the backend server."));
    }
    if !cli.is_logged_in().await {
        return Err(Frame::error(
            "ChatGPT Codex is not connected. Open Settings and connect Codex first.",
        ));
    }

    let model = match turn.model.trim() {
        "" => DEFAULT_CODEX_MODEL,
        model => model,
    };
    let composed = prompt::compose_cli_prompt(&turn.system_prompt, &turn.message, &turn.attachments);

    // NamedTempFile removal happens when this binding drops, on every path
    // out of this function.
    let mut prompt_file = tempfile::Builder::new()
        .prefix("relay-codex-")
        .suffix(".txt")
        .tempfile()
        .map_err(|e| Frame::error(format!("Failed to stage codex prompt: {e}")))?;
    prompt_file
        .write_all(composed.as_bytes())
        .and_then(|_| prompt_file.flush())
        .map_err(|e| Frame::error(format!("Failed to stage codex prompt: {e}")))?;
    let stdin_file = prompt_file
        .reopen()
        .map_err(|e| Frame::error(format!("Failed to stage codex prompt: {e}")))?;

    let config = cli.config();
    let mut cmd = Command::new(&config.program);
    cmd.args(&config.leading_args)
        .arg("exec")
        .arg("--model")
        .arg(model)
        .stdin(Stdio::from(stdin_file))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(%model, "spawning codex exec");
    let mut child = cmd
        .spawn()
        .map_err(|e| Frame::error(format!("Failed to launch codex: {e}")))?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Frame::error("Failed to capture codex output."))?;
    let mut stderr_task = child.stderr.take().map(|mut pipe| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf).await;
            buf
        })
    });

    let deadline = Instant::now() + config.exec_timeout;
    let mut auth_failure_seen = false;
    let mut sent_any = false;
    let mut buf = [0u8; READ_CHUNK];

    loop {
        let read = match timeout_at(deadline, stdout.read(&mut buf)).await {
            Err(_) => {
                reclaim(&mut child).await;
                return Err(Frame::error("Codex request timed out."));
            }
            Ok(Err(e)) => {
                reclaim(&mut child).await;
                return Err(Frame::error(format!("Failed reading codex output: {e}")));
            }
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => n,
        };

        let text = sanitize_bytes(&buf[..read]);
        if text.is_empty() {
            continue;
        }
        if contains_auth_failure(&text) {
            auth_failure_seen = true;
        }
        if tx.send(Frame::delta(&text)).await.is_err() {
            tracing::debug!("chat consumer disconnected, killing codex");
            reclaim(&mut child).await;
            return Ok(());
        }
        sent_any = true;
    }

    let status = match timeout_at(deadline, child.wait()).await {
        Err(_) => {
            reclaim(&mut child).await;
            return Err(Frame::error("Codex request timed out."));
        }
        Ok(Err(e)) => return Err(Frame::error(format!("Failed waiting for codex: {e}"))),
        Ok(Ok(status)) => status,
    };

    let stderr_text = match stderr_task.take() {
        Some(task) => sanitize_bytes(&task.await.unwrap_or_default()),
        None => String::new(),
    };
    if contains_auth_failure(&stderr_text) {
        auth_failure_seen = true;
    }

    if !status.success() {
        let message = if auth_failure_seen {
            "Codex is not authenticated. Reconnect Codex and try again."
        } else {
            "Codex request failed."
        };
        let detail = stderr_text.trim();
        return Err(if detail.is_empty() {
            Frame::error(message)
        } else {
            Frame::error_with_detail(message, truncate_for_display(detail, ERROR_DETAIL_LIMIT))
        });
    }

    if !sent_any {
        return Err(Frame::error("Codex returned an empty response."));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codex::CodexConfig;
    use futures_util::StreamExt;

    fn turn(message: &str) -> ChatTurn {
        ChatTurn {
            model: "gpt-5.2-codex".to_string(),
            system_prompt: "sys".to_string(),
            message: message.to_string(),
            attachments: vec![],
            api_key: None,
        }
    }

    async fn collect(mut stream: FrameStream) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = stream.next().await {
            frames.push(frame);
        }
        frames
    }

    /// Write an executable stub script that plays the codex CLI.
    #[cfg(unix)]
    fn stub_cli(dir: &tempfile::TempDir, body: &str) -> CodexCli {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("codex-stub");
        let mut file = std::fs::File::create(&path).expect("create stub");
        writeln!(file, "#!/bin/sh\n{body}").expect("write stub");
        file.set_permissions(std::fs::Permissions::from_mode(0o755))
            .expect("make stub executable");
        CodexCli::new(CodexConfig::with_program(path.to_string_lossy().into_owned()))
    }

    #[tokio::test]
    async fn missing_binary_yields_error_then_done() {
        let backend = CodexBackend::new(CodexCli::new(CodexConfig::with_program(
            "relay-test-no-such-binary",
        )));
        let frames = collect(backend.stream(turn("hi")).await).await;
        assert_eq!(frames.len(), 2);
        assert!(matches!(
            &frames[0],
            Frame::Error { message, .. } if message.contains("not installed")
        ));
        assert_eq!(frames[1], Frame::Done);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn disconnected_session_yields_error_then_done() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cli = stub_cli(&dir, r#"echo "Not logged in"; exit 1"#);
        let backend = CodexBackend::new(cli);

        let frames = collect(backend.stream(turn("hi")).await).await;
        assert_eq!(frames.len(), 2);
        assert!(matches!(
            &frames[0],
            Frame::Error { message, .. } if message.contains("not connected")
        ));
        assert_eq!(frames[1], Frame::Done);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streams_stdout_as_delta_frames_until_done() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Probe reports a live session; exec echoes the prompt from stdin.
        let cli = stub_cli(
            &dir,
            r#"if [ "$1" = "login" ]; then echo "Logged in"; exit 0; fi
cat"#,
        );
        let backend = CodexBackend::new(cli);

        let frames = collect(backend.stream(turn("speak friend")).await).await;
        assert!(frames.len() >= 2);
        assert_eq!(frames.last(), Some(&Frame::Done));

        let combined: String = frames
            .iter()
            .filter_map(|f| match f {
                Frame::Content(payload) => {
                    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
                    value["choices"][0]["delta"]["content"]
                        .as_str()
                        .map(str::to_string)
                }
                _ => None,
            })
            .collect();
        assert!(combined.contains("speak friend"));
        assert!(combined.contains("System instructions:"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_distinguishes_auth_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cli = stub_cli(
            &dir,
            r#"if [ "$1" = "login" ]; then echo "Logged in"; exit 0; fi
echo "error: unauthorized" >&2; exit 2"#,
        );
        let backend = CodexBackend::new(cli);

        let frames = collect(backend.stream(turn("hi")).await).await;
        assert!(matches!(
            &frames[0],
            Frame::Error { message, detail } if message.contains("not authenticated")
                && detail.as_deref().is_some_and(|d| d.contains("unauthorized"))
        ));
        assert_eq!(frames.last(), Some(&Frame::Done));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_without_signature_is_generic_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cli = stub_cli(
            &dir,
            r#"if [ "$1" = "login" ]; then echo "Logged in"; exit 0; fi
echo "segfault elsewhere" >&2; exit 3"#,
        );
        let backend = CodexBackend::new(cli);

        let frames = collect(backend.stream(turn("hi")).await).await;
        assert!(matches!(
            &frames[0],
            Frame::Error { message, .. } if message.contains("Codex request failed")
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn empty_successful_output_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cli = stub_cli(
            &dir,
            r#"if [ "$1" = "login" ]; then echo "Logged in"; exit 0; fi
exit 0"#,
        );
        let backend = CodexBackend::new(cli);

        let frames = collect(backend.stream(turn("hi")).await).await;
        assert!(matches!(
            &frames[0],
            Frame::Error { message, .. } if message.contains("empty response")
        ));
        assert_eq!(frames.last(), Some(&Frame::Done));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_subprocess_is_killed_on_timeout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cli = stub_cli(
            &dir,
            r#"if [ "$1" = "login" ]; then echo "Logged in"; exit 0; fi
sleep 30"#,
        );
        let mut config = cli.config().clone();
        config.exec_timeout = std::time::Duration::from_millis(300);
        let backend = CodexBackend::new(CodexCli::new(config));

        let frames = collect(backend.stream(turn("hi")).await).await;
        assert!(matches!(
            &frames[0],
            Frame::Error { message, .. } if message.contains("timed out")
        ));
        assert_eq!(frames.last(), Some(&Frame::Done));
    }

    #[test]
    fn auth_failure_markers_match_case_insensitively() {
        assert!(contains_auth_failure("ERROR: Not Logged In"));
        assert!(contains_auth_failure("401 Unauthorized"));
        assert!(!contains_auth_failure("all fine"));
    }
}
