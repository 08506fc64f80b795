//! Input handler for the prompt loop using rustyline
//!
//! Provides readline editing with optional persistent history.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::history::History;
use rustyline::DefaultEditor;
use std::path::PathBuf;

/// Word that ends the session, compared case-insensitively
pub const EXIT_COMMAND: &str = "exit";

/// One read from the terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Prompt(String),
    Empty,
    Quit,
}

/// Input handler managing readline interface and prompt history
pub struct InputHandler {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
    prompt: String,
}

impl InputHandler {
    /// Create new input handler without history
    pub fn new(prompt: impl Into<String>) -> Result<Self> {
        Ok(InputHandler {
            editor: DefaultEditor::new()?,
            history_path: None,
            prompt: prompt.into(),
        })
    }

    /// Create input handler with persistent history
    pub fn with_history(prompt: impl Into<String>, history_file: PathBuf) -> Result<Self> {
        let mut editor = DefaultEditor::new()?;

        // Missing or unreadable history is not fatal
        if history_file.exists() {
            let _ = editor.load_history(&history_file);
        }

        Ok(InputHandler {
            editor,
            history_path: Some(history_file),
            prompt: prompt.into(),
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Read one line. Ctrl-C, Ctrl-D and `exit` all quit.
    pub fn read_line(&mut self) -> Result<UserInput> {
        match self.editor.readline(&self.prompt) {
            Ok(line) => {
                let input = classify(&line);
                if let UserInput::Prompt(text) = &input {
                    let _ = self.editor.add_history_entry(text.as_str());
                }
                Ok(input)
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(UserInput::Quit),
            Err(err) => Err(anyhow::anyhow!("Readline error: {}", err)),
        }
    }

    /// Save history to disk, if enabled
    pub fn save_history(&mut self) -> Result<()> {
        if let Some(ref path) = self.history_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.editor.save_history(path)?;
        }
        Ok(())
    }

    pub fn history_len(&self) -> usize {
        self.editor.history().len()
    }
}

/// Interpret a raw line typed at the prompt
pub fn classify(line: &str) -> UserInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        UserInput::Empty
    } else if trimmed.eq_ignore_ascii_case(EXIT_COMMAND) {
        UserInput::Quit
    } else {
        UserInput::Prompt(trimmed.to_string())
    }
}
