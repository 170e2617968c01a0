use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Scheduling discipline used to run client sessions.
///
/// Both strategies drive the same session protocol; they differ only in how a
/// readable connection is noticed and which thread runs its handler.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DispatchStrategy {
    /// Single control thread polling every registered connection for
    /// readiness and running handlers cooperatively.
    Reactor,
    /// One worker thread per accepted connection.
    #[default]
    Proactor,
}

/// Error returned when a [`DispatchStrategy`] name is not recognised.
pub type DispatchStrategyParseError = strum::ParseError;
