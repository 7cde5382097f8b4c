use std::io::{self, Write};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Stylize;
use crossterm::terminal;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use crate::core::Notice;

/// Reads one trimmed line. `None` when the operator cancels with Ctrl+C or
/// Ctrl+D, so the caller can drop the command and stay in the shell.
pub fn ask(editor: &mut DefaultEditor, prompt: &str) -> rustyline::Result<Option<String>> {
    cancellable(editor.readline(prompt))
}

fn cancellable(line: rustyline::Result<String>) -> rustyline::Result<Option<String>> {
    match line {
        Ok(line) => Ok(Some(line.trim().to_string())),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Reads a line without echoing it. Esc or Ctrl+C cancel.
pub fn read_secret(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    terminal::enable_raw_mode()?;
    let result = collect_secret();
    terminal::disable_raw_mode()?;
    println!();

    result
}

fn collect_secret() -> io::Result<String> {
    let mut secret = String::new();
    loop {
        let Event::Key(KeyEvent { code, modifiers, kind, .. }) = event::read()? else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }

        match code {
            KeyCode::Enter => return Ok(secret),
            KeyCode::Backspace => {
                secret.pop();
            }
            KeyCode::Esc => return Err(cancelled()),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return Err(cancelled()),
            KeyCode::Char(c) => secret.push(c),
            _ => {}
        }
    }
}

fn cancelled() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "input cancelled")
}

pub fn show_notice(notice: &Notice) {
    match notice {
        Notice::Success(text) => println!("{} {}", "✔".green(), text.as_str().green()),
        Notice::Failure(text) => println!("{} {}", "✘".red(), text.as_str().red().bold()),
    }
}
