//! Interactive shell
//!
//! Line-based front end for the sound board and the two calculators. Each
//! line is one "tap" or one edit of a calculator field.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use thiserror::Error;

use crate::audio::{PlaybackSession, SessionState};
use crate::convert::{
    jin_to_kg, lb_to_kg, parse_leading_number, sanitize, AgeConversion, JinConversion,
    PairedFields, PoundConversion,
};

const HELP: &str = "\
Commands:
  list                 show the available sounds
  play <file|id>       play a sound (stops the current one);
                       playing the current sound again stops it
  stop                 stop the current sound
  status               show what is playing
  cat <years>          cat age -> human age
  human <years>        human age -> cat age
  kg <kg>              kilograms -> pounds and jin
  lb <lb>              pounds -> kilograms
  jin <jin>            jin -> kilograms
  help                 show this text
  quit                 leave";

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("Unknown command: {0} (try `help`)")]
    Unknown(String),

    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
}

/// One shell line
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Empty,
    List,
    Play(String),
    Stop,
    Status,
    /// Calculator edits carry the raw text typed; empty clears the field
    Cat(String),
    Human(String),
    Kg(String),
    Lb(String),
    Jin(String),
    Help,
    Quit,
}

impl FromStr for ShellCommand {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "list" | "ls" => Self::List,
            "play" | "p" => {
                if rest.is_empty() {
                    return Err(ParseError::MissingArgument("play"));
                }
                Self::Play(rest.to_string())
            }
            "stop" | "s" => Self::Stop,
            "status" => Self::Status,
            "cat" => Self::Cat(rest.to_string()),
            "human" => Self::Human(rest.to_string()),
            "kg" => Self::Kg(rest.to_string()),
            "lb" => Self::Lb(rest.to_string()),
            "jin" => Self::Jin(rest.to_string()),
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };

        Ok(command)
    }
}

/// Shell state: the playback session plus the calculator fields
pub struct Shell<'a> {
    session: &'a mut PlaybackSession,
    age: PairedFields<AgeConversion>,
    pounds: PairedFields<PoundConversion>,
    jin: PairedFields<JinConversion>,
}

impl<'a> Shell<'a> {
    pub fn new(session: &'a mut PlaybackSession) -> Self {
        Self {
            session,
            age: PairedFields::new(),
            pounds: PairedFields::new(),
            jin: PairedFields::new(),
        }
    }

    /// Read commands until `quit` or end of input
    pub fn run(&mut self, input: impl BufRead, mut out: impl Write) -> io::Result<()> {
        writeln!(out, "meowboard - type `help` for commands")?;

        for line in input.lines() {
            let line = line?;
            let keep_going = match line.parse::<ShellCommand>() {
                Ok(command) => self.execute(command, &mut out)?,
                Err(e) => {
                    writeln!(out, "{}", e)?;
                    true
                }
            };
            if !keep_going {
                break;
            }
        }

        self.session.stop();
        Ok(())
    }

    /// Run one command. Returns `false` when the shell should exit.
    pub fn execute(&mut self, command: ShellCommand, out: &mut impl Write) -> io::Result<bool> {
        match command {
            ShellCommand::Empty => {}
            ShellCommand::Help => writeln!(out, "{}", HELP)?,
            ShellCommand::Quit => return Ok(false),
            ShellCommand::List => {
                let playing = self.session.now_playing();
                for entry in self.session.catalog().entries() {
                    let marker = if playing.as_deref() == Some(entry.filename.as_str()) {
                        '>'
                    } else {
                        ' '
                    };
                    writeln!(
                        out,
                        "{} {:>3}  {:<22} {}",
                        marker, entry.id, entry.filename, entry.label
                    )?;
                }
            }
            ShellCommand::Play(key) => {
                // Accept an id as well as a filename
                let filename = self
                    .session
                    .catalog()
                    .find(&key)
                    .map(|entry| entry.filename.clone())
                    .unwrap_or(key);

                // Tapping the sound that is playing stops it
                if self.session.now_playing().as_deref() == Some(filename.as_str()) {
                    self.session.stop();
                    writeln!(out, "Stopped {}", filename)?;
                    return Ok(true);
                }

                match self.session.play(&filename) {
                    Ok(_) => writeln!(out, "Playing {}", filename)?,
                    Err(e) => {
                        log::error!("Playback failed: {}", e);
                        writeln!(out, "Playback failed: {}", e)?;
                    }
                }
            }
            ShellCommand::Stop => {
                self.session.stop();
                writeln!(out, "Stopped")?;
            }
            ShellCommand::Status => match (self.session.state(), self.session.now_playing()) {
                (SessionState::Playing, Some(filename)) => writeln!(out, "Playing {}", filename)?,
                (SessionState::Loading, _) => writeln!(out, "Loading")?,
                _ => writeln!(out, "Idle")?,
            },
            ShellCommand::Cat(raw) => {
                self.age.edit_primary(&raw);
                self.print_age(out)?;
            }
            ShellCommand::Human(raw) => {
                self.age.edit_secondary(&raw);
                self.print_age(out)?;
            }
            ShellCommand::Kg(raw) => {
                self.pounds.edit_primary(&raw);
                self.jin.edit_primary(&raw);
                self.print_weight(out)?;
            }
            ShellCommand::Lb(raw) => {
                self.pounds.edit_secondary(&raw);
                if let Some(kg) = exact_kg(&raw, lb_to_kg) {
                    self.jin.edit_primary(&kg);
                }
                self.print_weight(out)?;
            }
            ShellCommand::Jin(raw) => {
                self.jin.edit_secondary(&raw);
                if let Some(kg) = exact_kg(&raw, jin_to_kg) {
                    self.pounds.edit_primary(&kg);
                }
                self.print_weight(out)?;
            }
        }
        Ok(true)
    }

    fn print_age(&self, out: &mut impl Write) -> io::Result<()> {
        write!(
            out,
            "cat {} = human {}",
            or_dash(self.age.primary()),
            or_dash(self.age.secondary())
        )?;
        match self.age.life_stage() {
            Some(stage) => writeln!(out, "  ({})", stage.hint()),
            None => writeln!(out),
        }
    }

    fn print_weight(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(
            out,
            "{} kg = {} lb = {} jin",
            or_dash(self.pounds.primary()),
            or_dash(self.pounds.secondary()),
            or_dash(self.jin.secondary())
        )
    }
}

/// Unrounded kilograms for the third weight field, so it is not computed
/// from the one-decimal kg display. `None` when the input does not parse;
/// an empty string when the input was cleared.
fn exact_kg(raw: &str, to_kg: fn(f64) -> f64) -> Option<String> {
    let cleaned = sanitize(raw);
    if cleaned.is_empty() {
        return Some(String::new());
    }
    parse_leading_number(&cleaned).map(|value| to_kg(value).to_string())
}

fn or_dash(field: &str) -> &str {
    if field.is_empty() {
        "-"
    } else {
        field
    }
}
