// Input module
// Text commands standing in for the window's pointer and keyboard gestures

use crate::app::UiMessage;
use crate::canvas::ImageId;
use crate::geometry::{Corner, Point, ResizeMode, Vec2};
use anyhow::{Context, Result};
use log::debug;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::mpsc::Sender;
use std::thread;
use thiserror::Error;

/// Command names and their argument synopsis
const USAGE: &[(&str, &str)] = &[
    ("add", "<path> [x y]"),
    ("drop", "<sx> <sy> <path>..."),
    ("click", "<sx> <sy>"),
    ("select", "<id>"),
    ("deselect", ""),
    ("remove", "[id]"),
    ("front", "<id>"),
    ("back", "<id>"),
    ("move", "<id> <dx> <dy>"),
    ("resize", "<id> <tl|tr|bl|br> <dx> <dy> [lock]"),
    ("pan", "<dx> <dy>"),
    ("zoom", "<factor> <sx> <sy>"),
    ("wheel", "<up|down> <sx> <sy>"),
    ("pin", ""),
    ("escape", ""),
    ("reset", ""),
    ("list", ""),
    ("help", ""),
    ("quit", ""),
];

/// Mouse wheel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wheel {
    Up,
    Down,
}

/// One user gesture, already resolved to canvas operations' arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Open a file at a canvas position, or at the next cascade slot
    Add {
        path: PathBuf,
        position: Option<Point>,
    },
    /// Files dropped at a screen position
    Drop { at: Point, paths: Vec<PathBuf> },
    /// Left click at a screen position
    Click { at: Point },
    Select(ImageId),
    Deselect,
    /// Remove an image, or the selection when no id is given
    Remove(Option<ImageId>),
    Front(ImageId),
    Back(ImageId),
    Move { id: ImageId, delta: Vec2 },
    Resize {
        id: ImageId,
        corner: Corner,
        delta: Vec2,
        mode: ResizeMode,
    },
    Pan(Vec2),
    Zoom { factor: f64, center: Point },
    Wheel { direction: Wheel, center: Point },
    TogglePin,
    Escape,
    Reset,
    List,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("usage: {command} {synopsis}")]
    Usage {
        command: &'static str,
        synopsis: &'static str,
    },
    #[error("`{0}` is not a number")]
    Number(String),
    #[error("`{0}` is not an image id")]
    Id(String),
    #[error("unknown corner `{0}`, expected tl, tr, bl or br")]
    Corner(String),
    #[error("unknown wheel direction `{0}`, expected up or down")]
    Wheel(String),
    #[error("unterminated quote")]
    UnterminatedQuote,
}

/// Full command reference, one command per line
pub fn help_text() -> String {
    USAGE
        .iter()
        .map(|(name, synopsis)| format!("  {} {}", name, synopsis).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn usage(command: &str) -> ParseError {
    let (command, synopsis) = USAGE
        .iter()
        .find(|(name, _)| *name == command)
        .copied()
        .unwrap_or(("help", ""));
    ParseError::Usage { command, synopsis }
}

/// Split a line on whitespace, keeping double-quoted runs together
fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(ParseError::UnterminatedQuote);
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

fn number(token: &str) -> Result<f64, ParseError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ParseError::Number(token.to_string()))
}

fn id(token: &str) -> Result<ImageId, ParseError> {
    token.parse().map_err(|_| ParseError::Id(token.to_string()))
}

fn point(x: &str, y: &str) -> Result<Point, ParseError> {
    Ok(Point::new(number(x)?, number(y)?))
}

fn vec2(x: &str, y: &str) -> Result<Vec2, ParseError> {
    Ok(Vec2::new(number(x)?, number(y)?))
}

fn corner(token: &str) -> Result<Corner, ParseError> {
    match token.to_ascii_lowercase().as_str() {
        "tl" | "top-left" => Ok(Corner::TopLeft),
        "tr" | "top-right" => Ok(Corner::TopRight),
        "bl" | "bottom-left" => Ok(Corner::BottomLeft),
        "br" | "bottom-right" => Ok(Corner::BottomRight),
        _ => Err(ParseError::Corner(token.to_string())),
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(line)?;
        let Some((name, args)) = tokens.split_first() else {
            return Err(ParseError::Empty);
        };
        let name = name.to_ascii_lowercase();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let command = match (name.as_str(), args.as_slice()) {
            ("add", [path]) => Command::Add {
                path: PathBuf::from(path),
                position: None,
            },
            ("add", [path, x, y]) => Command::Add {
                path: PathBuf::from(path),
                position: Some(point(x, y)?),
            },
            ("drop", [x, y, paths @ ..]) if !paths.is_empty() => Command::Drop {
                at: point(x, y)?,
                paths: paths.iter().map(PathBuf::from).collect(),
            },
            ("click", [x, y]) => Command::Click { at: point(x, y)? },
            ("select", [image]) => Command::Select(id(image)?),
            ("deselect", []) => Command::Deselect,
            ("remove", []) => Command::Remove(None),
            ("remove", [image]) => Command::Remove(Some(id(image)?)),
            ("front", [image]) => Command::Front(id(image)?),
            ("back", [image]) => Command::Back(id(image)?),
            ("move", [image, dx, dy]) => Command::Move {
                id: id(image)?,
                delta: vec2(dx, dy)?,
            },
            ("resize", [image, handle, dx, dy, rest @ ..]) if rest.len() <= 1 => {
                let mode = match rest {
                    [] => ResizeMode::Free,
                    [flag] if flag.eq_ignore_ascii_case("lock") => ResizeMode::KeepAspectRatio,
                    _ => return Err(usage("resize")),
                };
                Command::Resize {
                    id: id(image)?,
                    corner: corner(handle)?,
                    delta: vec2(dx, dy)?,
                    mode,
                }
            }
            ("pan", [dx, dy]) => Command::Pan(vec2(dx, dy)?),
            ("zoom", [factor, x, y]) => Command::Zoom {
                factor: number(factor)?,
                center: point(x, y)?,
            },
            ("wheel", [direction, x, y]) => {
                let direction = match direction.to_ascii_lowercase().as_str() {
                    "up" => Wheel::Up,
                    "down" => Wheel::Down,
                    _ => return Err(ParseError::Wheel(direction.to_string())),
                };
                Command::Wheel {
                    direction,
                    center: point(x, y)?,
                }
            }
            ("pin", []) => Command::TogglePin,
            ("escape" | "esc", []) => Command::Escape,
            ("reset", []) => Command::Reset,
            ("list" | "ls", []) => Command::List,
            ("help" | "?", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            (other, _) => {
                return Err(if USAGE.iter().any(|(known, _)| *known == other) {
                    usage(other)
                } else {
                    ParseError::Unknown(other.to_string())
                })
            }
        };
        Ok(command)
    }
}

/// Read commands from stdin on a background thread and queue them.
///
/// End of input queues `Shutdown`.
pub fn spawn_stdin_reader(queue: Sender<UiMessage>, interactive: bool) -> Result<()> {
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            if interactive {
                println!("Type `help` for commands.");
                prompt();
            }
            read_commands(io::stdin().lock(), &queue, interactive);
        })
        .context("Failed to start input thread")?;
    Ok(())
}

/// Queue one command per line until input ends or the event loop goes away
fn read_commands(reader: impl BufRead, queue: &Sender<UiMessage>, interactive: bool) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!("Stopped reading input: {}", e);
                break;
            }
        };
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('#') {
            match trimmed.parse::<Command>() {
                Ok(command) => {
                    if queue.send(UiMessage::Command(command)).is_err() {
                        debug!("Event loop gone, dropping remaining input");
                        return;
                    }
                }
                Err(e) => eprintln!("error: {}", e),
            }
        }
        if interactive {
            prompt();
        }
    }

    if queue.send(UiMessage::Shutdown).is_err() {
        debug!("Event loop gone before end of input");
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(line: &str) -> Command {
        line.parse().unwrap_or_else(|e| panic!("{line}: {e}"))
    }

    #[test]
    fn parses_add_with_and_without_position() {
        assert_eq!(
            parse("add /refs/a.png"),
            Command::Add {
                path: PathBuf::from("/refs/a.png"),
                position: None
            }
        );
        assert_eq!(
            parse("add /refs/a.png 15 -2.5"),
            Command::Add {
                path: PathBuf::from("/refs/a.png"),
                position: Some(Point::new(15.0, -2.5))
            }
        );
    }

    #[test]
    fn quoted_paths_keep_spaces() {
        assert_eq!(
            parse(r#"drop 100 200 "/my refs/a b.png" /refs/c.jpg"#),
            Command::Drop {
                at: Point::new(100.0, 200.0),
                paths: vec![PathBuf::from("/my refs/a b.png"), PathBuf::from("/refs/c.jpg")]
            }
        );
    }

    #[test]
    fn parses_gestures() {
        let first = "1".parse::<ImageId>().unwrap();
        assert_eq!(
            parse("resize 1 TL 10 -5 lock"),
            Command::Resize {
                id: first,
                corner: Corner::TopLeft,
                delta: Vec2::new(10.0, -5.0),
                mode: ResizeMode::KeepAspectRatio
            }
        );
        assert_eq!(
            parse("resize 1 br 3 4"),
            Command::Resize {
                id: first,
                corner: Corner::BottomRight,
                delta: Vec2::new(3.0, 4.0),
                mode: ResizeMode::Free
            }
        );
        assert_eq!(
            parse("move 1 -4 8"),
            Command::Move {
                id: first,
                delta: Vec2::new(-4.0, 8.0)
            }
        );
        assert_eq!(
            parse("wheel down 5 6"),
            Command::Wheel {
                direction: Wheel::Down,
                center: Point::new(5.0, 6.0)
            }
        );
        assert_eq!(parse("remove"), Command::Remove(None));
        assert_eq!(parse("remove 1"), Command::Remove(Some(first)));
        assert_eq!(parse("  PIN  "), Command::TogglePin);
        assert_eq!(parse("esc"), Command::Escape);
    }

    #[test]
    fn reports_errors() {
        assert_eq!("".parse::<Command>(), Err(ParseError::Empty));
        assert_eq!(
            "fly 1 2".parse::<Command>(),
            Err(ParseError::Unknown("fly".into()))
        );
        assert_eq!(
            "pan 1".parse::<Command>(),
            Err(ParseError::Usage {
                command: "pan",
                synopsis: "<dx> <dy>"
            })
        );
        assert_eq!(
            "zoom fast 1 2".parse::<Command>(),
            Err(ParseError::Number("fast".into()))
        );
        assert_eq!(
            "zoom inf 1 2".parse::<Command>(),
            Err(ParseError::Number("inf".into()))
        );
        assert_eq!(
            "select first".parse::<Command>(),
            Err(ParseError::Id("first".into()))
        );
        assert_eq!(
            "resize 1 middle 1 1".parse::<Command>(),
            Err(ParseError::Corner("middle".into()))
        );
        assert_eq!(
            "resize 1 tl 1 1 shift".parse::<Command>(),
            Err(ParseError::Usage {
                command: "resize",
                synopsis: "<id> <tl|tr|bl|br> <dx> <dy> [lock]"
            })
        );
        assert_eq!(
            "wheel sideways 1 1".parse::<Command>(),
            Err(ParseError::Wheel("sideways".into()))
        );
        assert_eq!(
            r#"add "/unfinished"#.parse::<Command>(),
            Err(ParseError::UnterminatedQuote)
        );
        assert_eq!(
            "drop 1 2".parse::<Command>(),
            Err(ParseError::Usage {
                command: "drop",
                synopsis: "<sx> <sy> <path>..."
            })
        );
    }

    #[test]
    fn reader_queues_commands_then_shutdown() {
        let (tx, rx) = std::sync::mpsc::channel();
        let input = "# comment\n\npin\nfly away\nlist\n";
        read_commands(io::Cursor::new(input), &tx, false);

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(received.len(), 3);
        assert!(matches!(received[0], UiMessage::Command(Command::TogglePin)));
        assert!(matches!(received[1], UiMessage::Command(Command::List)));
        assert!(matches!(received[2], UiMessage::Shutdown));
    }

    #[test]
    fn reader_stops_quietly_when_event_loop_is_gone() {
        let (tx, rx) = std::sync::mpsc::channel();
        drop(rx);
        read_commands(io::Cursor::new("pin\nlist\n"), &tx, false);
        read_commands(io::Cursor::new(""), &tx, false);
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text();
        for (name, _) in USAGE {
            assert!(help.contains(name), "{name} missing from help");
        }
    }
}
