//! Operator commands read line by line from stdin.

use std::str::FromStr;

use trainmap_network::{DriverBehavior, StationId, StationStrategy, TrainId};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Start a new run; omitted values fall back to the configured defaults.
    Start {
        driver: Option<DriverBehavior>,
        strategy: Option<StationStrategy>,
    },
    Play,
    Pause,
    Toggle,
    Step,
    Restart,
    Click { column: usize, row: usize },
    Hover { column: usize, row: usize },
    SelectStation(StationId),
    SelectTrain(TrainId),
    ClearStation,
    ClearTrain,
    Reload,
    History,
    HistoryRemove(Uuid),
    HistoryClear,
    Quit,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid {kind}: {value}")]
    Invalid { kind: &'static str, value: String },
}

fn parse_arg<T: FromStr>(kind: &'static str, value: &str) -> Result<T, CommandError> {
    value.parse().map_err(|_| CommandError::Invalid {
        kind,
        value: value.to_owned(),
    })
}

fn parse_cell(words: &[&str], usage: &'static str) -> Result<(usize, usize), CommandError> {
    match words {
        [column, row] => Ok((parse_arg("column", column)?, parse_arg("row", row)?)),
        _ => Err(CommandError::Usage(usage)),
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();

        let command = match words.as_slice() {
            ["start", rest @ ..] if rest.len() <= 2 => Command::Start {
                driver: rest
                    .first()
                    .map(|value| parse_arg("driver behavior", value))
                    .transpose()?,
                strategy: rest
                    .get(1)
                    .map(|value| parse_arg("station strategy", value))
                    .transpose()?,
            },
            ["start", ..] => return Err(CommandError::Usage("start [driver] [strategy]")),
            ["play"] => Command::Play,
            ["pause"] => Command::Pause,
            ["toggle"] | ["space"] => Command::Toggle,
            ["step"] | ["next"] => Command::Step,
            ["restart"] => Command::Restart,
            ["click", rest @ ..] => {
                let (column, row) = parse_cell(rest, "click <column> <row>")?;
                Command::Click { column, row }
            }
            ["hover", rest @ ..] => {
                let (column, row) = parse_cell(rest, "hover <column> <row>")?;
                Command::Hover { column, row }
            }
            ["select", "station", id] => Command::SelectStation(StationId::new(id)),
            ["select", "train", id] => Command::SelectTrain(TrainId::new(id)),
            ["select", ..] => return Err(CommandError::Usage("select station|train <id>")),
            ["clear", "station"] => Command::ClearStation,
            ["clear", "train"] => Command::ClearTrain,
            ["clear", ..] => return Err(CommandError::Usage("clear station|train")),
            ["reload"] => Command::Reload,
            ["history"] => Command::History,
            ["history", "remove", id] => Command::HistoryRemove(parse_arg("run id", id)?),
            ["history", "clear"] => Command::HistoryClear,
            ["history", ..] => return Err(CommandError::Usage("history [remove <id> | clear]")),
            ["quit"] | ["exit"] | ["q"] => Command::Quit,
            _ => return Err(CommandError::Unknown(line.trim().to_owned())),
        };

        Ok(command)
    }
}
