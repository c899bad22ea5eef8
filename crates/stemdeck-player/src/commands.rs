//! Stdin command parsing
//!
//! One command per line:
//!
//! | input            | effect                               |
//! |------------------|--------------------------------------|
//! | `p`              | toggle play/pause                    |
//! | `s`              | stop (rewind to 0)                   |
//! | `seek <sec>`     | seek to an absolute time             |
//! | `jump <0..1>`    | seek to a fraction of the duration   |
//! | `vol <0..1>`     | session volume                       |
//! | `mute <track>`   | toggle mute, by slot (0-3) or name   |
//! | `status`         | print the transport line             |
//! | `help`           | list commands                        |
//! | `q`              | quit                                 |

use anyhow::{anyhow, bail, Context, Result};
use stemdeck_core::types::{StemKind, TrackId};

pub const HELP: &str = "\
commands: p (play/pause), s (stop), seek <sec>, jump <0..1>, vol <0..1>, \
mute <track|name>, status, help, q";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    TogglePlay,
    Stop,
    Seek(f64),
    Jump(f64),
    Volume(f32),
    ToggleMute(TrackId),
    Status,
    Help,
    Quit,
}

/// Parse one input line; blank lines yield `None`
pub fn parse(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    if words.next().is_some() {
        bail!("too many arguments for '{}'", verb);
    }

    let command = match verb.to_ascii_lowercase().as_str() {
        "p" | "play" | "pause" => Command::TogglePlay,
        "s" | "stop" => Command::Stop,
        "seek" => Command::Seek(number(verb, arg)?),
        "jump" => Command::Jump(number(verb, arg)?),
        "vol" | "volume" => Command::Volume(number::<f32>(verb, arg)?),
        "mute" => Command::ToggleMute(track(arg)?),
        "status" => Command::Status,
        "h" | "help" | "?" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        other => bail!("unknown command '{}'", other),
    };
    Ok(Some(command))
}

fn number<T>(verb: &str, arg: Option<&str>) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let arg = arg.ok_or_else(|| anyhow!("'{}' needs a number", verb))?;
    arg.parse()
        .with_context(|| format!("'{}' is not a number", arg))
}

fn track(arg: Option<&str>) -> Result<TrackId> {
    let arg = arg.ok_or_else(|| anyhow!("'mute' needs a track number or stem name"))?;
    if let Ok(id) = arg.parse::<TrackId>() {
        return Ok(id);
    }
    StemKind::from_name(arg)
        .map(StemKind::index)
        .ok_or_else(|| anyhow!("unknown track '{}'", arg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transport() {
        assert_eq!(parse("p").unwrap(), Some(Command::TogglePlay));
        assert_eq!(parse("  S ").unwrap(), Some(Command::Stop));
        assert_eq!(parse("q").unwrap(), Some(Command::Quit));
        assert_eq!(parse("").unwrap(), None);
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse("seek 42.5").unwrap(), Some(Command::Seek(42.5)));
        assert_eq!(parse("jump 0.25").unwrap(), Some(Command::Jump(0.25)));
        assert_eq!(parse("vol 0.8").unwrap(), Some(Command::Volume(0.8)));
    }

    #[test]
    fn test_parse_mute_by_slot_or_name() {
        assert_eq!(parse("mute 2").unwrap(), Some(Command::ToggleMute(2)));
        assert_eq!(parse("mute Vocals").unwrap(), Some(Command::ToggleMute(3)));
        assert_eq!(parse("mute drums").unwrap(), Some(Command::ToggleMute(0)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("seek").is_err());
        assert!(parse("seek soon").is_err());
        assert!(parse("mute guitar").is_err());
        assert!(parse("dance").is_err());
        assert!(parse("vol 1 2").is_err());
    }
}
