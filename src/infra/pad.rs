use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::infra::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    X,
    Y,
    Z,
    Start,
    L,
    R,
    DUp,
    DDown,
    DLeft,
    DRight,
}

impl Button {
    pub fn as_str(&self) -> &'static str {
        match self {
            Button::A => "A",
            Button::B => "B",
            Button::X => "X",
            Button::Y => "Y",
            Button::Z => "Z",
            Button::Start => "START",
            Button::L => "L",
            Button::R => "R",
            Button::DUp => "D_UP",
            Button::DDown => "D_DOWN",
            Button::DLeft => "D_LEFT",
            Button::DRight => "D_RIGHT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stick {
    Main,
    C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    L,
    R,
}

/// A single controller input. Stick and trigger values are in `[0, 1]`, 0.5 is neutral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PadCommand {
    Press(Button),
    Release(Button),
    Tilt(Stick, f32, f32),
    Trigger(Trigger, f32),
}

impl PadCommand {
    pub const NEUTRAL_STICK: PadCommand = PadCommand::Tilt(Stick::Main, 0.5, 0.5);
}

impl fmt::Display for PadCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PadCommand::Press(button) => write!(formatter, "PRESS {}", button.as_str()),
            PadCommand::Release(button) => write!(formatter, "RELEASE {}", button.as_str()),
            PadCommand::Tilt(stick, x, y) => {
                let name = match stick {
                    Stick::Main => "MAIN",
                    Stick::C => "C",
                };
                write!(formatter, "SET {} {:.4} {:.4}", name, x, y)
            }
            PadCommand::Trigger(trigger, amount) => {
                let name = match trigger {
                    Trigger::L => "L",
                    Trigger::R => "R",
                };
                write!(formatter, "SET {} {:.4}", name, amount)
            }
        }
    }
}

/// Write-only virtual controller. Commands are fire-and-forget.
pub trait ControllerSink {
    fn send(&mut self, command: PadCommand);

    fn send_all(&mut self, commands: &[PadCommand]) {
        for &command in commands {
            self.send(command);
        }
    }
}

/// Dolphin pipe input: one text command per line into a named pipe.
pub struct PipePad {
    port: usize,
    pipe: File,
}

impl PipePad {
    pub fn pipe_path(pipes_dir: &Path, port: usize) -> PathBuf {
        pipes_dir.join(format!("smashbot{}", port))
    }

    /// Create the pipe if needed and wait for the emulator to open its end.
    pub async fn open(pipes_dir: &Path, port: usize) -> Result<Self, BridgeError> {
        std::fs::create_dir_all(pipes_dir)
            .map_err(|e| BridgeError::io(format!("Creating {}", pipes_dir.display()), e))?;

        let path = Self::pipe_path(pipes_dir, port);
        if !path.exists() {
            let status = Command::new("mkfifo")
                .arg(&path)
                .status()
                .map_err(|e| BridgeError::io(format!("Running mkfifo {}", path.display()), e))?;
            if !status.success() {
                return Err(BridgeError::io(
                    format!("mkfifo {}", path.display()),
                    std::io::Error::other(format!("exited with {}", status)),
                ));
            }
        }

        tracing::info!("Waiting for Dolphin to open {}", path.display());
        let open_path = path.clone();
        let pipe = tokio::task::spawn_blocking(move || {
            OpenOptions::new().write(true).open(open_path)
        })
        .await
        .map_err(|e| BridgeError::io(format!("Opening {}", path.display()), std::io::Error::other(e.to_string())))?
        .map_err(|e| BridgeError::io(format!("Opening {}", path.display()), e))?;

        Ok(Self { port, pipe })
    }
}

impl ControllerSink for PipePad {
    fn send(&mut self, command: PadCommand) {
        let result = writeln!(self.pipe, "{}", command).and_then(|_| self.pipe.flush());
        if let Err(e) = result {
            tracing::warn!("Pad {} dropped '{}': {}", self.port, command, e);
        }
    }
}

/// Sink that keeps every command it receives, shared with the test body.
#[cfg(test)]
pub struct RecordingPad {
    commands: std::sync::Arc<std::sync::Mutex<Vec<PadCommand>>>,
}

#[cfg(test)]
impl RecordingPad {
    pub fn new() -> (Self, std::sync::Arc<std::sync::Mutex<Vec<PadCommand>>>) {
        let commands = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        (
            Self {
                commands: std::sync::Arc::clone(&commands),
            },
            commands,
        )
    }
}

#[cfg(test)]
impl ControllerSink for RecordingPad {
    fn send(&mut self, command: PadCommand) {
        self.commands.lock().unwrap().push(command);
    }
}
