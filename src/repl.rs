//! Interactive shell: the same commands as the CLI, with multi-line paste input.

use anyhow::{anyhow, Result};
use clap::Parser;
use log::{debug, error};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::cli::{execute, Commands, PasteSource};
use crate::state::EventStore;

/// Line that ends a multi-line paste.
pub const PASTE_TERMINATOR: &str = ".";

#[derive(Debug, Parser)]
#[command(name = "shiftpaste", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Commands,
}

/// Reads pasted lines from the editor until [`PASTE_TERMINATOR`] or EOF.
struct EditorPaste<'a> {
    editor: &'a mut DefaultEditor,
}

impl PasteSource for EditorPaste<'_> {
    fn read_paste(&mut self) -> Result<String> {
        println!(
            "Paste the schedule, then finish with a line containing only '{}':",
            PASTE_TERMINATOR
        );
        let mut lines = Vec::new();
        loop {
            match self.editor.readline("") {
                Ok(line) if line.trim() == PASTE_TERMINATOR => break,
                Ok(line) => lines.push(line),
                Err(ReadlineError::Eof) => break,
                Err(ReadlineError::Interrupted) => return Err(anyhow!("Paste cancelled")),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(lines.join("\n"))
    }
}

pub fn run(store: &EventStore) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!("Welcome to ShiftPaste! Type 'help' for commands.");
    println!("Event store: {}", store.path().display());

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                match line.trim() {
                    "exit" | "quit" => break,
                    _ => {
                        if let Err(err) = process_line(&line, store, &mut rl) {
                            error!("Failed to process command: {:#}", err);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}

fn process_line(line: &str, store: &EventStore, editor: &mut DefaultEditor) -> Result<()> {
    let words = split_command_line(line)?;
    debug!("Shell words: {:?}", words);

    let parsed = match ShellLine::try_parse_from(&words) {
        Ok(parsed) => parsed,
        Err(err) => {
            // clap renders help and usage errors itself
            let _ = err.print();
            return Ok(());
        }
    };

    let mut paste = EditorPaste { editor };
    let output = execute(parsed.command, store, &mut paste)?;
    print!("{}", output);
    Ok(())
}

/// Split a shell line into words, honouring double quotes and backslash escapes.
pub fn split_command_line(input: &str) -> Result<Vec<String>> {
    // Normalize non-breaking spaces from copy/paste
    let normalized = input.replace('\u{a0}', " ");

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut escaped = false;

    for c in normalized.chars() {
        match c {
            _ if escaped => {
                current.push(c);
                escaped = false;
            }
            '\\' => escaped = true,
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() || quoted {
                    parts.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err(anyhow!("Unterminated quote in command"));
    }
    if escaped {
        current.push('\\');
    }
    if !current.is_empty() || quoted {
        parts.push(current);
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_quoted_words() {
        let line = r#"add "Late shift" 2025-03-04 14:00 22:00 --note "cover for \"Sam\"""#;
        let words = split_command_line(line).unwrap();
        assert_eq!(
            words,
            vec!["add", "Late shift", "2025-03-04", "14:00", "22:00", "--note", "cover for \"Sam\""]
        );
    }

    #[test]
    fn keeps_empty_quoted_word_and_normalizes_spaces() {
        let words = split_command_line("edit\u{a0}abc \"\"  2025-03-04").unwrap();
        assert_eq!(words, vec!["edit", "abc", "", "2025-03-04"]);
    }

    #[test]
    fn rejects_unterminated_quote() {
        assert!(split_command_line("add \"Late").is_err());
    }

    #[test]
    fn shell_line_parses_without_binary_name() {
        let parsed = ShellLine::try_parse_from(["list", "--month", "2025-09"]).unwrap();
        assert!(matches!(
            parsed.command,
            Commands::List { month: Some(ref m), json: false } if m == "2025-09"
        ));
    }
}
