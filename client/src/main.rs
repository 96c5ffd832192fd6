use std::io::{self, IsTerminal, Read, Write};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use client::{ClientConfig, Clipboard, CommandClipboard, Outcome, Phase, Renderer, Session, Tone};

#[derive(Parser, Debug)]
#[command(name = "linkedpost", version, about = "Turn raw notes into a LinkedIn post")]
struct Cli {
    /// Source material. Read from stdin when omitted.
    text: Option<String>,

    /// Base URL of the post generation server
    #[arg(long, env = "LINKEDPOST_SERVER", default_value = "http://localhost:8085")]
    server: String,

    #[arg(long, value_enum, default_value_t = Tone::Professional)]
    tone: Tone,

    /// Copy the finished post to the clipboard
    #[arg(long)]
    copy: bool,

    /// Clipboard command to pipe the post into (e.g. "xclip -selection clipboard")
    #[arg(long, requires = "copy")]
    clipboard_command: Option<String>,

    /// Show the progress indicator on stderr
    #[arg(long)]
    progress: bool,

    /// Give up on the whole request after this many seconds
    #[arg(long)]
    timeout: Option<u64>,
}

struct TerminalRenderer {
    show_progress: bool,
}

impl Renderer for TerminalRenderer {
    fn on_chunk(&mut self, text: &str) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn on_progress(&mut self, progress: u8) {
        if self.show_progress {
            eprint!("\r[{progress:>3}%]");
        }
    }

    fn on_phase(&mut self, phase: Phase) {
        if self.show_progress && phase == Phase::Idle {
            eprintln!();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let source = match cli.text {
        Some(text) => text,
        None => read_stdin()?,
    };

    let mut config = ClientConfig::new(cli.server);
    config.request_timeout = cli.timeout.map(Duration::from_secs);

    let mut session = Session::new(config)?;
    session.set_source_text(source);
    session.set_tone(cli.tone);

    let mut renderer = TerminalRenderer { show_progress: cli.progress };
    let outcome = session
        .generate(&mut renderer)
        .await
        .context("Cannot start generation")?;
    println!();

    if let Outcome::Failed(e) = outcome {
        bail!("Generation failed: {e}");
    }

    if cli.copy {
        let mut clipboard = match cli.clipboard_command.as_deref() {
            Some(command) => CommandClipboard::parse(command).context("Empty clipboard command")?,
            None => CommandClipboard::platform_default(),
        };
        copy(&mut session, &mut clipboard)?;
    }

    Ok(())
}

fn copy(session: &mut Session, clipboard: &mut dyn Clipboard) -> anyhow::Result<()> {
    session
        .copy_output(clipboard)
        .context("Failed to copy the post to the clipboard")?;
    info!("Post copied to clipboard");
    eprintln!("Copied!");
    Ok(())
}

fn read_stdin() -> anyhow::Result<String> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        eprintln!("Paste your notes, then press Ctrl-D:");
    }
    let mut text = String::new();
    stdin.read_to_string(&mut text).context("Failed to read source text from stdin")?;
    Ok(text)
}
