//! Line commands for the operator console.
//!
//! Player arguments are `1` or `2`. Numeric arguments are read as signed
//! integers and left to the controller to clamp.

use std::str::FromStr;

use supershow_domain::{PlayerId, RollType};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Title(String),
    Stipulations(String),
    Crowd(i64),
    /// `None` name clears the competitor.
    Competitor(PlayerId, Option<String>),
    Start,
    Reset,
    Roll(PlayerId, RollType, i64),
    HandUp(PlayerId),
    HandDown(PlayerId),
    Hand(PlayerId, i64),
    Finish(PlayerId, Option<i64>),
    Breakout(PlayerId, i64),
    BreakoutClear(PlayerId),
    Pass(PlayerId),
    Resend,
    Status,
    Competitors,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}'")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid {what}: '{raw}'")]
    Invalid { what: &'static str, raw: String },
}

pub const HELP: &str = "\
title <text> | stips <text> | crowd <n> | competitor <1|2> [name]
start | reset | resend | status | competitors | quit
roll <1|2> <power|technique|agility> <n>
hand+ <1|2> | hand- <1|2> | hand <1|2> <n>
finish <1|2> [n] | breakout <1|2> <n> | breakout-clear <1|2> | pass <1|2>";

fn player(raw: Option<&str>, usage: &'static str) -> Result<PlayerId, ParseCommandError> {
    let raw = raw.ok_or(ParseCommandError::Usage(usage))?;
    raw.parse().map_err(|_| ParseCommandError::Invalid {
        what: "player",
        raw: raw.to_string(),
    })
}

fn number(raw: Option<&str>, usage: &'static str) -> Result<i64, ParseCommandError> {
    let raw = raw.ok_or(ParseCommandError::Usage(usage))?;
    raw.parse().map_err(|_| ParseCommandError::Invalid {
        what: "number",
        raw: raw.to_string(),
    })
}

/// Everything after the first `skip` words, with inner spacing preserved.
fn rest(line: &str, skip: usize) -> Option<String> {
    let mut remaining = line.trim_start();
    for _ in 0..skip {
        let end = remaining.find(char::is_whitespace)?;
        remaining = remaining[end..].trim_start();
    }
    let remaining = remaining.trim_end();
    (!remaining.is_empty()).then(|| remaining.to_string())
}

impl FromStr for ConsoleCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(ParseCommandError::Empty)?;
        let command = match name.to_ascii_lowercase().as_str() {
            "title" => ConsoleCommand::Title(rest(line, 1).unwrap_or_default()),
            "stips" => ConsoleCommand::Stipulations(rest(line, 1).unwrap_or_default()),
            "crowd" => ConsoleCommand::Crowd(number(words.next(), "crowd <n>")?),
            "competitor" => {
                let id = player(words.next(), "competitor <1|2> [name]")?;
                ConsoleCommand::Competitor(id, rest(line, 2))
            }
            "start" => ConsoleCommand::Start,
            "reset" => ConsoleCommand::Reset,
            "roll" => {
                const USAGE: &str = "roll <1|2> <power|technique|agility> <n>";
                let id = player(words.next(), USAGE)?;
                let raw_type = words.next().ok_or(ParseCommandError::Usage(USAGE))?;
                let roll_type = raw_type.parse().map_err(|_| ParseCommandError::Invalid {
                    what: "roll type",
                    raw: raw_type.to_string(),
                })?;
                ConsoleCommand::Roll(id, roll_type, number(words.next(), USAGE)?)
            }
            "hand+" => ConsoleCommand::HandUp(player(words.next(), "hand+ <1|2>")?),
            "hand-" => ConsoleCommand::HandDown(player(words.next(), "hand- <1|2>")?),
            "hand" => {
                const USAGE: &str = "hand <1|2> <n>";
                let id = player(words.next(), USAGE)?;
                ConsoleCommand::Hand(id, number(words.next(), USAGE)?)
            }
            "finish" => {
                const USAGE: &str = "finish <1|2> [n]";
                let id = player(words.next(), USAGE)?;
                let value = match words.next() {
                    Some(raw) => Some(number(Some(raw), USAGE)?),
                    None => None,
                };
                ConsoleCommand::Finish(id, value)
            }
            "breakout" => {
                const USAGE: &str = "breakout <1|2> <n>";
                let id = player(words.next(), USAGE)?;
                ConsoleCommand::Breakout(id, number(words.next(), USAGE)?)
            }
            "breakout-clear" => {
                ConsoleCommand::BreakoutClear(player(words.next(), "breakout-clear <1|2>")?)
            }
            "pass" => ConsoleCommand::Pass(player(words.next(), "pass <1|2>")?),
            "resend" => ConsoleCommand::Resend,
            "status" => ConsoleCommand::Status,
            "competitors" => ConsoleCommand::Competitors,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(ParseCommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<ConsoleCommand, ParseCommandError> {
        line.parse()
    }

    #[test]
    fn test_text_arguments_keep_spacing() {
        assert_eq!(
            parse("title  Main  Event ").unwrap(),
            ConsoleCommand::Title("Main  Event".to_string())
        );
        assert_eq!(parse("stips").unwrap(), ConsoleCommand::Stipulations(String::new()));
    }

    #[test]
    fn test_competitor_name_optional() {
        assert_eq!(
            parse("competitor 2 Ace Harper").unwrap(),
            ConsoleCommand::Competitor(PlayerId::Two, Some("Ace Harper".to_string()))
        );
        assert_eq!(
            parse("competitor 1").unwrap(),
            ConsoleCommand::Competitor(PlayerId::One, None)
        );
    }

    #[test]
    fn test_roll_parses_type_case_insensitively() {
        assert_eq!(
            parse("roll 1 AGILITY 9").unwrap(),
            ConsoleCommand::Roll(PlayerId::One, RollType::Agility, 9)
        );
        assert!(matches!(
            parse("roll 1 luck 9"),
            Err(ParseCommandError::Invalid { what: "roll type", .. })
        ));
    }

    #[test]
    fn test_out_of_range_numbers_pass_through() {
        assert_eq!(parse("hand 1 31").unwrap(), ConsoleCommand::Hand(PlayerId::One, 31));
        assert_eq!(
            parse("breakout 2 -4").unwrap(),
            ConsoleCommand::Breakout(PlayerId::Two, -4)
        );
        assert_eq!(parse("crowd 99").unwrap(), ConsoleCommand::Crowd(99));
    }

    #[test]
    fn test_finish_without_value_clears() {
        assert_eq!(parse("finish 2").unwrap(), ConsoleCommand::Finish(PlayerId::Two, None));
        assert_eq!(
            parse("finish 2 7").unwrap(),
            ConsoleCommand::Finish(PlayerId::Two, Some(7))
        );
    }

    #[test]
    fn test_bad_input() {
        assert_eq!(parse("   "), Err(ParseCommandError::Empty));
        assert_eq!(parse("dance"), Err(ParseCommandError::Unknown("dance".to_string())));
        assert_eq!(parse("hand+"), Err(ParseCommandError::Usage("hand+ <1|2>")));
        assert!(matches!(
            parse("pass 3"),
            Err(ParseCommandError::Invalid { what: "player", .. })
        ));
        assert!(matches!(
            parse("crowd lots"),
            Err(ParseCommandError::Invalid { what: "number", .. })
        ));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("START").unwrap(), ConsoleCommand::Start);
        assert_eq!(parse("hand- 2").unwrap(), ConsoleCommand::HandDown(PlayerId::Two));
        assert_eq!(
            parse("breakout-clear 1").unwrap(),
            ConsoleCommand::BreakoutClear(PlayerId::One)
        );
        assert_eq!(parse("exit").unwrap(), ConsoleCommand::Quit);
    }
}
