//! Interactive commands read from stdin

use onyx_dsp::{BAND_COUNT, BAND_LABELS, UI_GAIN_RANGE_DB};
use thiserror::Error;

/// Command typed by the user
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `p`: pause, or resume if paused
    TogglePause,
    /// `s <seconds>`: jump to a position
    Seek { ms: u64 },
    /// `g <band> <db>`: set one band, by index or label (`1kHz`)
    Gain { band: usize, gain_db: f64 },
    /// `v <0..1>`: set volume
    Volume(f64),
    /// `q`: stop and exit
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command '{0}' (try p, s <sec>, g <band> <db>, v <0..1>, q)")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unknown band '{0}' (0-4 or one of 60Hz, 250Hz, 1kHz, 4kHz, 16kHz)")]
    UnknownBand(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };

    let command = match name {
        "p" | "pause" => Command::TogglePause,
        "q" | "quit" => Command::Quit,
        "s" | "seek" => {
            let secs = number(words.next().ok_or(CommandError::MissingArgument("s"))?)?;
            if secs < 0.0 {
                return Err(CommandError::InvalidNumber(secs.to_string()));
            }
            Command::Seek {
                ms: (secs * 1000.0).round() as u64,
            }
        }
        "g" | "gain" => {
            let band = band(words.next().ok_or(CommandError::MissingArgument("g"))?)?;
            let gain_db = number(words.next().ok_or(CommandError::MissingArgument("g"))?)?;
            Command::Gain {
                band,
                gain_db: gain_db.clamp(-UI_GAIN_RANGE_DB, UI_GAIN_RANGE_DB),
            }
        }
        "v" | "volume" => {
            Command::Volume(number(words.next().ok_or(CommandError::MissingArgument("v"))?)?)
        }
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

fn number(word: &str) -> Result<f64, CommandError> {
    word.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| CommandError::InvalidNumber(word.to_string()))
}

fn band(word: &str) -> Result<usize, CommandError> {
    if let Ok(index) = word.parse::<usize>() {
        if index < BAND_COUNT {
            return Ok(index);
        }
    }

    BAND_LABELS
        .iter()
        .position(|label| label.eq_ignore_ascii_case(word))
        .ok_or_else(|| CommandError::UnknownBand(word.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_commands() {
        assert_eq!(parse("p"), Ok(Some(Command::TogglePause)));
        assert_eq!(parse("  q  "), Ok(Some(Command::Quit)));
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("   "), Ok(None));
    }

    #[test]
    fn seek_in_seconds() {
        assert_eq!(parse("s 30"), Ok(Some(Command::Seek { ms: 30_000 })));
        assert_eq!(parse("seek 1.25"), Ok(Some(Command::Seek { ms: 1250 })));
        assert_eq!(parse("s"), Err(CommandError::MissingArgument("s")));
        assert!(parse("s -3").is_err());
        assert!(parse("s soon").is_err());
    }

    #[test]
    fn gain_by_index_or_label() {
        assert_eq!(
            parse("g 2 -4.5"),
            Ok(Some(Command::Gain {
                band: 2,
                gain_db: -4.5
            }))
        );
        assert_eq!(
            parse("g 16khz 3"),
            Ok(Some(Command::Gain {
                band: 4,
                gain_db: 3.0
            }))
        );
        assert_eq!(parse("g 5 1"), Err(CommandError::UnknownBand("5".into())));
        assert_eq!(parse("g 1"), Err(CommandError::MissingArgument("g")));
    }

    #[test]
    fn gain_is_clamped_to_slider_range() {
        assert_eq!(
            parse("g 0 40"),
            Ok(Some(Command::Gain {
                band: 0,
                gain_db: 12.0
            }))
        );
    }

    #[test]
    fn volume_and_unknown() {
        assert_eq!(parse("v 0.5"), Ok(Some(Command::Volume(0.5))));
        assert!(parse("v NaN").is_err());
        assert_eq!(parse("x"), Err(CommandError::Unknown("x".into())));
    }
}
