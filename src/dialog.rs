//! Settings dialog bridge
//!
//! The dialog runs as its own process (`hourglass_settings`) so iced can own
//! its event loop. The overlay launches it with the current size and
//! duration on the command line and receives edits back on the child's
//! stdout, one JSON `DialogMessage` per line.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use crate::config::{clamp_size, Settings, MAX_DURATION, MIN_DURATION};

const DIALOG_BIN: &str = "hourglass_settings";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DialogMessage {
    /// Dialog -> Overlay: size or duration spinner changed
    Apply { size: u32, duration: u32 },
    /// Dialog -> Overlay: "Fill" pressed
    Refill,
}

impl DialogMessage {
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}

/// Write one message to stdout for the parent overlay
pub fn emit(message: &DialogMessage) -> Result<()> {
    let line = message.to_line()?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", line).context("Failed to write to overlay pipe")?;
    out.flush().context("Failed to flush overlay pipe")?;
    Ok(())
}

/// Initial values handed to the dialog process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogFlags {
    pub size: u32,
    pub duration: u32,
}

impl Default for DialogFlags {
    fn default() -> Self {
        let settings = Settings::default();
        DialogFlags {
            size: settings.size,
            duration: settings.duration,
        }
    }
}

impl From<&Settings> for DialogFlags {
    fn from(settings: &Settings) -> Self {
        DialogFlags {
            size: settings.size,
            duration: settings.duration,
        }
    }
}

impl DialogFlags {
    /// Parse `--size N --duration N`; unknown or malformed arguments are skipped
    pub fn parse<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = DialogFlags::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--size" => {
                    if let Some(size) = args.next().and_then(|v| v.parse().ok()) {
                        flags.size = size;
                    }
                }
                "--duration" => {
                    if let Some(duration) = args.next().and_then(|v| v.parse().ok()) {
                        flags.duration = duration;
                    }
                }
                _ => {}
            }
        }

        flags.size = clamp_size(flags.size);
        flags.duration = flags.duration.clamp(MIN_DURATION, MAX_DURATION);
        flags
    }

    pub fn to_args(&self) -> [String; 4] {
        [
            "--size".to_string(),
            self.size.to_string(),
            "--duration".to_string(),
            self.duration.to_string(),
        ]
    }
}

/// Handle to a running dialog process
pub struct DialogHandle {
    child: Child,
}

impl DialogHandle {
    /// Launch the dialog; `on_message` runs on a reader thread for every line
    pub fn spawn<F>(settings: &Settings, on_message: F) -> Result<Self>
    where
        F: Fn(DialogMessage) + Send + 'static,
    {
        let exe = find_dialog_exe()?;
        tracing::info!("Starting settings dialog: {}", exe.display());

        let mut child = Command::new(&exe)
            .args(DialogFlags::from(settings).to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", exe.display()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Settings dialog has no stdout"))?;

        std::thread::Builder::new()
            .name("settings-dialog".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else {
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match DialogMessage::from_line(&line) {
                        Ok(message) => on_message(message),
                        Err(e) => tracing::warn!("Bad dialog message {:?}: {}", line, e),
                    }
                }
                tracing::debug!("Settings dialog pipe closed");
            })
            .context("Failed to start dialog reader")?;

        Ok(DialogHandle { child })
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    pub fn close(&mut self) {
        if self.is_running() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

impl Drop for DialogHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Find the dialog executable next to the running one
fn find_dialog_exe() -> Result<PathBuf> {
    let file_name = format!("{}{}", DIALOG_BIN, std::env::consts::EXE_SUFFIX);

    if let Ok(exe_path) = std::env::current_exe() {
        let exe_dir = exe_path.parent().unwrap_or(Path::new("."));

        let sibling = exe_dir.join(&file_name);
        if sibling.exists() {
            return Ok(sibling);
        }
    }

    let current_dir = std::env::current_dir().unwrap_or_default();
    for profile in ["release", "debug"] {
        let dev_path = current_dir.join("target").join(profile).join(&file_name);
        if dev_path.exists() {
            return Ok(dev_path);
        }
    }

    Err(anyhow!(
        "{} not found. Make sure it's in the same directory as the overlay.",
        file_name
    ))
}
