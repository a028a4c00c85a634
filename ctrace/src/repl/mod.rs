//! Interactive debugger prompt

use crate::debugger::{parse_query, Session};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;

const PROMPT: &str = ">> ";
const HISTORY_FILE: &str = ".ctrace_history";

/// One line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next(usize),
    Print(String, Option<i64>),
    Trace(String, Option<i64>),
    Backtrace,
    Help,
    Quit,
}

/// Parse a prompt line. `next` without a count steps once.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".to_string());
    };
    let arg = words.next();
    if words.next().is_some() {
        return Err(format!("too many arguments to `{head}`"));
    }

    let query = |arg: Option<&str>| -> Result<(String, Option<i64>), String> {
        let arg = arg.ok_or_else(|| format!("`{head}` needs a variable name"))?;
        let (name, index) = parse_query(arg).ok_or_else(|| format!("bad variable `{arg}`"))?;
        Ok((name.to_string(), index))
    };

    match head {
        "next" | "n" => match arg {
            None => Ok(Command::Next(1)),
            Some(count) => match count.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Command::Next(n)),
                _ => Err(format!("bad step count `{count}`")),
            },
        },
        "print" | "p" => query(arg).map(|(name, index)| Command::Print(name, index)),
        "trace" | "t" => query(arg).map(|(name, index)| Command::Trace(name, index)),
        "bt" | "backtrace" => Ok(Command::Backtrace),
        "help" | "h" | "?" => Ok(Command::Help),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command: {other}")),
    }
}

/// What the prompt prints back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// Apply `command` to the session
pub fn respond(session: &mut Session, command: &Command) -> Reply {
    let text = match command {
        Command::Next(n) => match session.next(*n) {
            Ok(progress) => progress.to_string(),
            Err(err) => err.to_string(),
        },
        Command::Print(name, index) => session.print(name, *index).to_string(),
        Command::Trace(name, index) => session.trace(name, *index).to_string(),
        Command::Backtrace => session
            .backtrace()
            .iter()
            .map(|(function, line)| format!("{function} called at line {line}"))
            .collect::<Vec<_>>()
            .join("\n"),
        Command::Help => HELP.trim_end().to_string(),
        Command::Quit => return Reply::Quit,
    };
    Reply::Text(text)
}

const HELP: &str = "\
Commands:
  next [N]        Execute N lines (default 1)
  print NAME      Current value; NAME may be *p, &x or a[i]
  trace NAME      Every value NAME held, with the line that wrote it
  bt              Active calls, innermost first
  help            Show this help
  quit            Exit
";

/// Prompt state
pub struct Repl {
    editor: DefaultEditor,
    session: Session,
    /// Bytes of program output already shown
    shown: usize,
    history_path: Option<PathBuf>,
}

impl Repl {
    pub fn new(session: Session) -> RlResult<Self> {
        let mut editor = DefaultEditor::new()?;
        let history_path = dirs_home().map(|h| h.join(HISTORY_FILE));
        if let Some(path) = &history_path {
            let _ = editor.load_history(path);
        }
        Ok(Repl {
            editor,
            session,
            shown: 0,
            history_path,
        })
    }

    pub fn run(&mut self) -> RlResult<()> {
        println!("Type help for commands, quit to exit.");
        match self.session.begin() {
            Ok(progress) => println!("{progress}"),
            Err(err) => eprintln!("{err}"),
        }

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(line);

                    let command = match parse_command(line) {
                        Ok(command) => command,
                        Err(message) => {
                            println!("{message}");
                            continue;
                        }
                    };
                    let reply = respond(&mut self.session, &command);
                    self.flush_output();
                    match reply {
                        Reply::Text(text) => println!("{text}"),
                        Reply::Quit => break,
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        if let Some(path) = &self.history_path {
            let _ = self.editor.save_history(path);
        }
        Ok(())
    }

    /// Print whatever the program wrote since the last command
    fn flush_output(&mut self) {
        let output = self.session.output();
        if let Some(text) = unseen_output(output, self.shown) {
            print!("{text}");
        }
        self.shown = output.len();
    }
}

/// Output past the first `shown` bytes, ending in a newline so the prompt
/// starts on its own line. `None` when nothing new was written.
fn unseen_output(output: &str, shown: usize) -> Option<String> {
    let fresh = output.get(shown..).filter(|s| !s.is_empty())?;
    let mut text = fresh.to_string();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    Some(text)
}

fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}
