use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::ClipboardError;

/// How long the "copied" confirmation stays visible
pub const COPY_CONFIRMATION: Duration = Duration::from_secs(2);

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Keeps the last copied text in memory.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Option<String>,
}

impl MemoryClipboard {
    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}

/// Pipes the text into a system clipboard tool such as `pbcopy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
}

impl CommandClipboard {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// Parse a whitespace separated command line like `xclip -selection clipboard`.
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("pbcopy", Vec::new())
        } else if cfg!(target_os = "windows") {
            Self::new("clip", Vec::new())
        } else if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            Self::new("wl-copy", Vec::new())
        } else {
            Self::new("xclip", vec!["-selection".to_string(), "clipboard".to_string()])
        }
    }
}

impl Clipboard for CommandClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()?;

        let written = match child.stdin.take() {
            // stdin is dropped at the end of the arm so the child sees EOF
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };
        // Reap the child even when the write failed
        let status = child.wait()?;
        written?;

        if !status.success() {
            return Err(ClipboardError::CommandFailed {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

/// Transient "copied" state shown after a copy action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyConfirmation {
    visible_until: Instant,
}

impl CopyConfirmation {
    pub fn starting_at(now: Instant, duration: Duration) -> Self {
        Self { visible_until: now + duration }
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        now < self.visible_until
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let clip = CommandClipboard::parse("xclip -selection clipboard").unwrap();
        assert_eq!(
            clip,
            CommandClipboard::new("xclip", vec!["-selection".into(), "clipboard".into()])
        );
        assert!(CommandClipboard::parse("   ").is_none());
    }

    #[test]
    fn test_confirmation_expires() {
        let now = Instant::now();
        let confirmation = CopyConfirmation::starting_at(now, COPY_CONFIRMATION);
        assert!(confirmation.is_visible(now));
        assert!(confirmation.is_visible(now + Duration::from_millis(1999)));
        assert!(!confirmation.is_visible(now + COPY_CONFIRMATION));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_clipboard_pipes_text() {
        let path = std::env::temp_dir().join(format!("linkedpost-clip-{}", std::process::id()));
        let script = format!("cat > '{}'", path.display());
        let mut clip = CommandClipboard::new("sh", vec!["-c".into(), script]);

        clip.write_text("• line one\n#a #b #c").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "• line one\n#a #b #c");
        let _ = std::fs::remove_file(&path);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_clipboard_closing_stdin_early_is_an_io_error() {
        // Larger than a pipe buffer, so the write outlives the child
        let text = "x".repeat(4 * 1024 * 1024);
        let mut clip = CommandClipboard::new("sh", vec!["-c".into(), "exec 0<&-; exit 0".into()]);
        match clip.write_text(&text) {
            Err(ClipboardError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("expected broken pipe, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_command_clipboard_reports_failure() {
        let mut clip = CommandClipboard::new("sh", vec!["-c".into(), "cat > /dev/null; exit 3".into()]);
        match clip.write_text("text") {
            Err(ClipboardError::CommandFailed { program, .. }) => assert_eq!(program, "sh"),
            other => panic!("expected command failure, got {other:?}"),
        }
    }
}
