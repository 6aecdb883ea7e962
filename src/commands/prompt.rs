//! Interactive confirmation for destructive commands.

use std::io::{self, BufRead, IsTerminal, Write};

/// Asks the user to confirm an operation.
pub trait Confirm: Send + Sync {
    /// Whether a person is attached to answer prompts.
    fn is_interactive(&self) -> bool;

    /// Shows `prompt` and reads a single line of response.
    fn read_response(&self, prompt: &str) -> io::Result<String>;
}

/// Returns true when `response` is `y` or `yes`, ignoring case and whitespace.
pub fn is_affirmative(response: &str) -> bool {
    matches!(response.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Prompts on stdout and reads the answer from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn is_interactive(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn read_response(&self, prompt: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affirmative_answers() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative("Yes\n"));
        assert!(is_affirmative("  YES  "));
    }

    #[test]
    fn everything_else_declines() {
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("yep"));
        assert!(!is_affirmative("no"));
    }
}
