// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt};

use crate::error::*;
use crate::input::{Input, Operation};
use crate::phase::PhaseKey;

/// A globally-unique stage identifier.
///
/// Identifiers are opaque strings chosen by the block that creates the
/// stage; the composer enforces uniqueness across the whole catalog but
/// does not otherwise interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(String);

impl StageId {
  pub fn new(id: impl Into<String>) -> StageId {
    StageId(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl fmt::Display for StageId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl<S: Into<String>> From<S> for StageId {
  fn from(s: S) -> StageId {
    StageId::new(s)
  }
}

/// Options accepted by `add_stage`, overriding a new stage's defaults.
#[derive(Debug, Clone, Default)]
pub struct StageOptions {
  pub name: Option<String>,
  pub source: Option<Input>
}

impl StageOptions {
  pub fn new() -> StageOptions {
    StageOptions::default()
  }

  pub fn named(mut self, name: impl Into<String>) -> StageOptions {
    self.name = Some(name.into());
    self
  }

  pub fn source(mut self, source: Input) -> StageOptions {
    self.source = Some(source);
    self
  }
}

/// A single unit of image build work.
///
/// A stage has exactly one source input (how its initial filesystem state
/// is produced) and an ordered list of operations performed on top of it.
/// Stages are created, populated, and later resolved in place by the
/// composer during `compose`; they never carry a back-reference to their
/// owning phase or composer (see the design notes on arena-and-index).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
  id: StageId,
  phase: PhaseKey,
  name: Option<String>,
  source: Input,
  operations: Vec<Operation>,
  env: Vec<(String, String)>,
  working_dir: Option<String>,
  provides: Vec<String>
}

impl Stage {
  pub(crate) fn new(id: StageId, phase: PhaseKey, options: StageOptions) -> Stage {
    Stage {
      id,
      phase,
      name: options.name,
      source: options.source.unwrap_or(Input::Auto),
      operations: Vec::new(),
      env: Vec::new(),
      working_dir: None,
      provides: Vec::new()
    }
  }

  pub fn id(&self) -> &StageId {
    &self.id
  }

  pub fn phase(&self) -> &PhaseKey {
    &self.phase
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub fn source(&self) -> &Input {
    &self.source
  }

  pub(crate) fn set_source(&mut self, source: Input) {
    self.source = source;
  }

  pub fn operations(&self) -> &[Operation] {
    &self.operations
  }

  pub(crate) fn set_operations(&mut self, operations: Vec<Operation>) {
    self.operations = operations;
  }

  pub(crate) fn push_operation(&mut self, operation: Operation) {
    self.operations.push(operation);
  }

  pub fn env(&self) -> &[(String, String)] {
    &self.env
  }

  pub(crate) fn push_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.env.push((key.into(), value.into()));
  }

  pub fn working_dir(&self) -> Option<&str> {
    self.working_dir.as_deref()
  }

  pub(crate) fn set_working_dir(&mut self, dir: impl Into<String>) {
    self.working_dir = Some(dir.into());
  }

  pub fn provides(&self) -> &[String] {
    &self.provides
  }

  pub(crate) fn set_provides(&mut self, packages: Vec<String>) {
    self.provides = packages;
  }
}

/// A flat, identifier-keyed container of every stage known to a composer.
///
/// Stages are stored once, by identifier; phase membership and ordering
/// live in the [`PhaseRegistry`](crate::phase::PhaseRegistry) as lists of
/// `StageId`s, so the catalog itself has no notion of phase order.
#[derive(Debug, Clone, Default)]
pub struct StageCatalog {
  stages: Vec<Stage>,
  index_by_id: HashMap<StageId, usize>
}

impl StageCatalog {
  pub fn new() -> StageCatalog {
    StageCatalog { stages: Vec::new(), index_by_id: HashMap::new() }
  }

  /// Inserts a new stage. Fails with `DuplicateStageId` and performs no
  /// mutation if a stage with this identifier already exists anywhere in
  /// the catalog.
  pub(crate) fn insert(&mut self, stage: Stage) -> Result<()> {
    ensure!(
      !self.index_by_id.contains_key(&stage.id),
      DuplicateStageId { id: stage.id.clone() }
    );

    let index = self.stages.len();
    self.index_by_id.insert(stage.id.clone(), index);
    self.stages.push(stage);

    Ok(())
  }

  pub fn contains(&self, id: &StageId) -> bool {
    self.index_by_id.contains_key(id)
  }

  pub fn get(&self, id: &StageId) -> Result<&Stage> {
    self.index_by_id.get(id)
      .map(|&i| &self.stages[i])
      .context(StageNotFound { id: id.clone() })
  }

  pub fn get_mut(&mut self, id: &StageId) -> Result<&mut Stage> {
    match self.index_by_id.get(id) {
      Some(&i) => Ok(&mut self.stages[i]),
      None => StageNotFound { id: id.clone() }.fail()
    }
  }

  pub fn len(&self) -> usize {
    self.stages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }
}
