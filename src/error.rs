// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use snafu::Snafu;

use crate::phase::PhaseKey;
use crate::stage::StageId;

/// A build-plan composition error.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
  #[snafu(display(
    "stage '{}' already exists", id
  ))]
  DuplicateStageId {
    id: StageId
  },

  #[snafu(display(
    "stage '{}' not found", id
  ))]
  StageNotFound {
    id: StageId
  },

  #[snafu(display(
    "phase '{}' not found", key
  ))]
  PhaseNotFound {
    key: PhaseKey
  },

  #[snafu(display(
    "no input stage available for {}", context
  ))]
  NoInputStage {
    context: String
  },

  #[snafu(display(
    "invalid input: {}", message
  ))]
  InvalidInput {
    message: String
  },

  #[snafu(display(
    "invalid phase key '{}': must match (build|export).<slug>", key
  ))]
  InvalidPhaseKey {
    key: String
  },

  #[snafu(display(
    "plan is missing a build base image"
  ))]
  MissingBaseImage,

  #[snafu(display(
    "plan is missing a runtime base image"
  ))]
  MissingRuntimeImage,

  #[snafu(display(
    "build context '{}' is not registered", name
  ))]
  MissingContext {
    name: String
  },

  #[snafu(display(
    "composition failed at stage '{}': {}", stage, source
  ))]
  Composition {
    stage: StageId,
    source: Box<Error>
  }
}

impl Error {
  /// Wraps this error as having occurred while composing a particular stage.
  ///
  /// Idempotent: wrapping an already-wrapped error just changes which stage
  /// is blamed closest to the caller, matching the "wrapped with the failing
  /// stage identifier" propagation policy.
  pub(crate) fn at_stage(self, stage: StageId) -> Error {
    Error::Composition {
      stage,
      source: Box::new(self)
    }
  }
}

/// A build-plan composer `Result`.
pub type Result<T, E = Error> = std::result::Result<T, E>;
