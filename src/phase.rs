// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt};

use crate::error::*;
use crate::stage::StageId;

lazy_static! {
  static ref PHASE_KEY_PATTERN: Regex =
    Regex::new(r"^(build|export)\.[a-z0-9][a-z0-9-]*$").unwrap();
}

/// Which half of the two-partition phase order a [`PhaseKey`] belongs to.
///
/// All `Build` phases precede all `Export` phases in an emitted plan,
/// regardless of the order in which the two partitions' phases were
/// registered relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
  Build,
  Export
}

/// An opaque, validated phase identifier, e.g. `build.app-build` or
/// `export.export-base`.
///
/// A `PhaseKey` is a newtype rather than a bare `String` so that the
/// `build.*` / `export.*` contract described in the data model is a
/// constructed invariant, not an implicit convention checked ad hoc at every
/// call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseKey(String);

impl PhaseKey {
  /// Validates and wraps a phase key string.
  pub fn new(key: impl Into<String>) -> Result<PhaseKey> {
    let key = key.into();

    ensure!(
      PHASE_KEY_PATTERN.is_match(&key),
      InvalidPhaseKey { key: key.clone() }
    );

    Ok(PhaseKey(key))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// The partition (`build.*` or `export.*`) this key belongs to.
  ///
  /// Infallible once a `PhaseKey` exists: construction already validated the
  /// prefix.
  pub fn partition(&self) -> Partition {
    if self.0.starts_with("build.") {
      Partition::Build
    } else {
      Partition::Export
    }
  }
}

impl fmt::Display for PhaseKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A single phase: a named, ordered bucket of stages.
///
/// A phase may be empty. Its identity is its key; the registry never
/// reorders or removes a phase once registered.
#[derive(Debug, Clone)]
pub struct Phase {
  key: PhaseKey,
  stages: Vec<StageId>
}

impl Phase {
  fn new(key: PhaseKey) -> Phase {
    Phase { key, stages: Vec::new() }
  }

  pub fn key(&self) -> &PhaseKey {
    &self.key
  }

  pub fn stages(&self) -> &[StageId] {
    &self.stages
  }

  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }

  /// The last stage inserted into this phase, or `None` if it is empty.
  pub fn last_stage(&self) -> Option<&StageId> {
    self.stages.last()
  }

  /// Records a stage as belonging to this phase, in the order given.
  ///
  /// The catalog remains the source of truth for the stage's full contents;
  /// this only tracks ordering and membership.
  pub(crate) fn push_stage(&mut self, id: StageId) {
    self.stages.push(id);
  }
}

/// The canonical default phase list, in registration order.
///
/// Pre-registering these makes every phase addressable by a `Phase`
/// reference even before any stage has been added to it, so forward
/// references are legal from the very first block that runs.
pub const DEFAULT_BUILD_PHASES: &[&str] = &[
  "build.base",
  "build.system-deps",
  "build.runtime",
  "build.framework-deps",
  "build.app-deps",
  "build.app-build",
  "build.app-source",
  "build.build-complete",
];

pub const DEFAULT_EXPORT_PHASES: &[&str] = &[
  "export.export-base",
  "export.export-runtime",
  "export.export-app",
  "export.export-config",
];

/// The ordered collection of phases known to a composer.
///
/// Phases are stored in a single flat, insertion-ordered list; partition
/// membership is derived from each key's prefix rather than maintained as
/// two parallel lists, which keeps predecessor/successor logic
/// partition-filtered but otherwise uniform. See the design notes on "two
/// parallel ordered lists for build vs export phases."
#[derive(Debug, Clone, Default)]
pub struct PhaseRegistry {
  phases: Vec<Phase>
}

impl PhaseRegistry {
  pub fn new() -> PhaseRegistry {
    PhaseRegistry { phases: Vec::new() }
  }

  /// Builds a registry pre-populated with the canonical default phase list.
  pub fn with_default_phases() -> PhaseRegistry {
    let mut registry = PhaseRegistry::new();

    for key in DEFAULT_BUILD_PHASES.iter().chain(DEFAULT_EXPORT_PHASES.iter()) {
      registry.create_if_absent(PhaseKey::new(*key).unwrap());
    }

    registry
  }

  /// Builds a registry pre-populated with an arbitrary phase list, for
  /// tests that do not want the full default set.
  pub fn with_phases<I>(keys: I) -> Result<PhaseRegistry>
  where
    I: IntoIterator<Item = PhaseKey>
  {
    let mut registry = PhaseRegistry::new();

    for key in keys {
      registry.create_if_absent(key);
    }

    Ok(registry)
  }

  fn index_of(&self, key: &PhaseKey) -> Option<usize> {
    self.phases.iter().position(|p| &p.key == key)
  }

  /// Returns the existing phase with this key, or appends and returns a new
  /// empty one at the end of the registration order.
  pub fn create_if_absent(&mut self, key: PhaseKey) -> usize {
    match self.index_of(&key) {
      Some(index) => index,
      None => {
        self.phases.push(Phase::new(key));
        self.phases.len() - 1
      }
    }
  }

  pub fn get(&self, key: &PhaseKey) -> Result<&Phase> {
    self.index_of(key)
      .map(|i| &self.phases[i])
      .context(PhaseNotFound { key: key.clone() })
  }

  pub fn get_mut(&mut self, key: &PhaseKey) -> Result<&mut Phase> {
    match self.index_of(key) {
      Some(i) => Ok(&mut self.phases[i]),
      None => PhaseNotFound { key: key.clone() }.fail()
    }
  }

  /// Iterates all phases in final plan order: every `build.*` phase in
  /// registration order, then every `export.*` phase in registration order.
  pub fn iter_in_plan_order(&self) -> impl Iterator<Item = &Phase> {
    let build = self.phases.iter().filter(|p| p.key.partition() == Partition::Build);
    let export = self.phases.iter().filter(|p| p.key.partition() == Partition::Export);

    build.chain(export)
  }

  /// Iterates the phases of `key`'s partition that were registered strictly
  /// before `key`, nearest-first (i.e. in reverse registration order).
  ///
  /// Returns `phase not found` if `key` is unregistered.
  pub fn phases_before<'a>(&'a self, key: &PhaseKey) -> Result<impl Iterator<Item = &'a Phase>> {
    let index = self.index_of(key).context(PhaseNotFound { key: key.clone() })?;
    let partition = key.partition();

    Ok(
      self.phases[..index]
        .iter()
        .rev()
        .filter(move |p| p.key.partition() == partition)
    )
  }

  /// The phase immediately before `key` in its own partition, or `None` if
  /// `key` is the first phase in its partition.
  pub fn previous_phase(&self, key: &PhaseKey) -> Result<Option<&Phase>> {
    Ok(self.phases_before(key)?.next())
  }

  pub fn len(&self) -> usize {
    self.phases.len()
  }

  pub fn is_empty(&self) -> bool {
    self.phases.is_empty()
  }
}
