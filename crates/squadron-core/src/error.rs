//! Error types for `squadron-core`.

use thiserror::Error;

use crate::roster::Ineligibility;

#[derive(Debug, Error)]
pub enum Error {
  #[error("character not found: {0}")]
  CharacterNotFound(i64),

  #[error("team not found: {0}")]
  TeamNotFound(i64),

  #[error("{0}")]
  Ineligible(Ineligibility),

  #[error("a team named {0:?} already exists")]
  DuplicateTeamName(String),

  #[error("team name must not be blank")]
  BlankTeamName,

  #[error("record is missing required field {0:?}")]
  MissingField(&'static str),

  #[error("record field {field:?} is invalid: {reason}")]
  InvalidField { field: String, reason: String },

  #[error("record carries unknown field {0:?}")]
  UnknownField(String),
}

impl Error {
  /// `true` for errors a client caused by sending bad input.
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Self::Ineligible(_)
        | Self::DuplicateTeamName(_)
        | Self::BlankTeamName
        | Self::MissingField(_)
        | Self::InvalidField { .. }
        | Self::UnknownField(_)
    )
  }

  /// `true` for errors caused by an unknown id.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::CharacterNotFound(_) | Self::TeamNotFound(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
