//! User-facing console capability.
//!
//! Everything the login flow needs from a human (credentials, the captcha
//! answer, a one-time code) goes through [`UserInteraction`], so tests can
//! swap the console for [`ScriptedInteraction`].

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;

use tracing::{debug, warn};

/// Errors raised while talking to the user.
#[derive(Debug, thiserror::Error)]
pub enum InteractionError {
    /// Input reached end-of-file before an answer was given.
    #[error("input closed while waiting for '{prompt}'")]
    InputClosed {
        /// The prompt that went unanswered.
        prompt: String,
    },

    /// Reading from or writing to the console failed.
    #[error("console I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The system viewer could not be launched.
    #[error("failed to open {path} with the default viewer: {reason}")]
    OpenFailed {
        /// File that should have been shown.
        path: PathBuf,
        /// Launcher failure description.
        reason: String,
    },
}

/// Prompting, echoing and file viewing.
pub trait UserInteraction {
    /// Prints one line to the user.
    fn say(&mut self, line: &str);

    /// Blocks until the user enters a non-empty answer.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::InputClosed`] when input ends.
    fn prompt(&mut self, label: &str) -> Result<String, InteractionError>;

    /// Opens `path` with the platform's default viewer.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::OpenFailed`] when no viewer could be launched.
    fn open_file(&mut self, path: &Path) -> Result<(), InteractionError>;

    /// Prompts until the answer parses as an integer.
    ///
    /// # Errors
    ///
    /// Propagates [`UserInteraction::prompt`] failures.
    fn prompt_number(&mut self, label: &str) -> Result<i64, InteractionError> {
        loop {
            let raw = self.prompt(label)?;
            match raw.trim().parse::<i64>() {
                Ok(number) => return Ok(number),
                Err(_) => self.say(&format!("Error: '{}' is not a valid integer.", raw.trim())),
            }
        }
    }
}

/// Interactive terminal implementation using stdin/stdout.
#[derive(Debug, Default)]
pub struct ConsoleInteraction;

impl ConsoleInteraction {
    /// Creates a console interaction.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl UserInteraction for ConsoleInteraction {
    fn say(&mut self, line: &str) {
        println!("{line}");
    }

    fn prompt(&mut self, label: &str) -> Result<String, InteractionError> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        loop {
            write!(stdout, "{label}: ")?;
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                return Err(InteractionError::InputClosed {
                    prompt: label.to_string(),
                });
            }

            let answer = line.trim_end_matches(['\r', '\n']);
            if !answer.trim().is_empty() {
                return Ok(answer.to_string());
            }
        }
    }

    fn open_file(&mut self, path: &Path) -> Result<(), InteractionError> {
        launch_viewer(viewer_command(path), path)
    }
}

/// Spawns the viewer and reaps it on a detached thread so no zombie is left
/// behind while the login flow keeps prompting.
fn launch_viewer(mut command: Command, path: &Path) -> Result<(), InteractionError> {
    debug!(path = %path.display(), ?command, "launching default viewer");
    let mut child = command
        .spawn()
        .map_err(|error| InteractionError::OpenFailed {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
    thread::spawn(move || match child.wait() {
        Ok(status) => debug!(%status, "viewer launcher exited"),
        Err(error) => warn!(%error, "failed to wait for viewer launcher"),
    });
    Ok(())
}

#[cfg(target_os = "macos")]
fn viewer_command(path: &Path) -> Command {
    let mut command = Command::new("open");
    command.arg(path);
    command
}

#[cfg(target_os = "windows")]
fn viewer_command(path: &Path) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", ""]).arg(path);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn viewer_command(path: &Path) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(path);
    command
}

/// Replays canned answers and records everything shown to the user.
///
/// Used by tests and by callers driving the login flow without a terminal.
#[derive(Debug, Default)]
pub struct ScriptedInteraction {
    answers: VecDeque<String>,
    output: Vec<String>,
    prompts: Vec<String>,
    opened: Vec<PathBuf>,
}

impl ScriptedInteraction {
    /// Creates an interaction that answers prompts in order.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Lines passed to [`UserInteraction::say`], in order.
    #[must_use]
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Prompt labels shown, in order.
    #[must_use]
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Files passed to [`UserInteraction::open_file`].
    #[must_use]
    pub fn opened(&self) -> &[PathBuf] {
        &self.opened
    }

    /// Answers not yet consumed.
    #[must_use]
    pub fn remaining_answers(&self) -> usize {
        self.answers.len()
    }
}

impl UserInteraction for ScriptedInteraction {
    fn say(&mut self, line: &str) {
        self.output.push(line.to_string());
    }

    fn prompt(&mut self, label: &str) -> Result<String, InteractionError> {
        self.prompts.push(label.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| InteractionError::InputClosed {
                prompt: label.to_string(),
            })
    }

    fn open_file(&mut self, path: &Path) -> Result<(), InteractionError> {
        self.opened.push(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_answers_in_order() {
        let mut interaction = ScriptedInteraction::new(["first", "second"]);
        assert_eq!(interaction.prompt("A").unwrap(), "first");
        assert_eq!(interaction.prompt("B").unwrap(), "second");
        assert_eq!(interaction.prompts(), ["A", "B"]);
    }

    #[test]
    fn test_scripted_runs_out_of_answers() {
        let mut interaction = ScriptedInteraction::new(Vec::<String>::new());
        let error = interaction.prompt("Username").unwrap_err();
        assert!(matches!(error, InteractionError::InputClosed { ref prompt } if prompt == "Username"));
    }

    #[test]
    fn test_prompt_number_reprompts_on_non_integer() {
        let mut interaction = ScriptedInteraction::new(["two", " 3 "]);
        assert_eq!(interaction.prompt_number("Pick").unwrap(), 3);
        assert_eq!(interaction.prompts().len(), 2);
        assert_eq!(interaction.output(), ["Error: 'two' is not a valid integer."]);
    }

    #[test]
    fn test_prompt_number_accepts_negative() {
        let mut interaction = ScriptedInteraction::new(["-1"]);
        assert_eq!(interaction.prompt_number("Pick").unwrap(), -1);
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_viewer_spawns_and_returns() {
        let result = launch_viewer(Command::new("true"), Path::new("/tmp/captcha.jpg"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_launch_viewer_reports_missing_program() {
        let command = Command::new("tracker-session-no-such-viewer");
        let error = launch_viewer(command, Path::new("/tmp/captcha.jpg")).unwrap_err();
        assert!(
            matches!(error, InteractionError::OpenFailed { ref path, .. } if path == Path::new("/tmp/captcha.jpg"))
        );
    }

    #[test]
    fn test_scripted_records_opened_files() {
        let mut interaction = ScriptedInteraction::default();
        interaction.open_file(Path::new("/tmp/captcha.jpg")).unwrap();
        assert_eq!(interaction.opened(), [PathBuf::from("/tmp/captcha.jpg")]);
    }
}
