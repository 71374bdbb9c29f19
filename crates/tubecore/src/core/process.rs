//! Process execution utilities with timeout support
//!
//! Helpers for running external processes (yt-dlp, ffmpeg) so a hung child
//! cannot block a chat session forever.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Failure to obtain an exit status from a child process.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },
}

/// Run an async Command with a timeout.
///
/// The child is killed when the timeout elapses (`kill_on_drop`).
/// A non-zero exit status is *not* an error here; callers inspect `Output::status`.
pub async fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, ProcessError> {
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    log::debug!("Executing command: {:?}", cmd.as_std());

    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => {
            log::debug!(
                "{} exited with {} (stdout {} bytes, stderr {} bytes)",
                program,
                output.status,
                output.stdout.len(),
                output.stderr.len()
            );
            Ok(output)
        }
        Ok(Err(source)) => Err(ProcessError::Spawn { program, source }),
        Err(_) => Err(ProcessError::Timeout { program, timeout }),
    }
}

/// Last `max_chars` characters of a process stream, for error messages.
pub fn output_tail(bytes: &[u8], max_chars: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        trimmed.to_string()
    } else {
        trimmed.chars().skip(count - max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_tail() {
        assert_eq!(output_tail(b"  hello  ", 10), "hello");
        assert_eq!(output_tail(b"abcdef", 3), "def");
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let mut cmd = Command::new("definitely-not-a-real-binary-tubedrop");
        let err = run_with_timeout(&mut cmd, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
