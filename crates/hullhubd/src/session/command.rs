use thiserror::Error;

use crate::graph::{Point, PointParseError};

const NEW_GRAPH: &str = "Newgraph ";
const NEW_POINT: &str = "Newpoint ";
const REMOVE_POINT: &str = "Removepoint ";

/// A command line typed by a client in the normal protocol state.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `Newgraph n`: replace the graph with `n` points entered next.
    NewGraph(usize),
    /// `CH`: report the convex hull area.
    Hull,
    /// `Newpoint x,y`: append one point.
    NewPoint(Point),
    /// `Removepoint x,y`: remove the first matching point.
    RemovePoint(Point),
    /// `exit` or `quit`.
    Exit,
}

/// Reasons a command line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The line matched no command.
    #[error("Unknown command")]
    Unknown,
    /// `Newgraph` was given something other than a positive integer.
    #[error("Invalid number of points")]
    InvalidPointCount,
    /// A point argument was malformed.
    #[error(transparent)]
    Point(#[from] PointParseError),
}

impl Command {
    /// Parses one trimmed command line. Keywords are case-sensitive.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] for unknown commands and malformed arguments.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        if let Some(count) = line.strip_prefix(NEW_GRAPH) {
            return parse_count(count).map(Self::NewGraph);
        }
        if let Some(point) = line.strip_prefix(NEW_POINT) {
            return Ok(Self::NewPoint(Point::parse(point)?));
        }
        if let Some(point) = line.strip_prefix(REMOVE_POINT) {
            return Ok(Self::RemovePoint(Point::parse(point)?));
        }
        match line {
            "CH" => Ok(Self::Hull),
            "exit" | "quit" => Ok(Self::Exit),
            _ => Err(CommandError::Unknown),
        }
    }
}

fn parse_count(raw: &str) -> Result<usize, CommandError> {
    match raw.trim().parse::<i64>() {
        Ok(count) if count > 0 => usize::try_from(count).map_err(|_| CommandError::InvalidPointCount),
        _ => Err(CommandError::InvalidPointCount),
    }
}
