// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

//! Resolution of symbolic [`Input`] references to concrete stage
//! identifiers.
//!
//! This is the core algorithm of the composer: everything else either
//! feeds it (the phase registry and stage catalog) or drives it
//! (the operation rewriter and plan builder).

use snafu::ensure;

use crate::error::*;
use crate::input::Input;
use crate::phase::{PhaseKey, PhaseRegistry};
use crate::stage::{StageCatalog, StageId};

/// The stage emitted immediately before `stage_id`, in a left-to-right
/// traversal of phases within `stage_id`'s own partition.
///
/// If the stage has a predecessor within its own phase, that predecessor is
/// returned; otherwise the last stage of the nearest earlier non-empty phase
/// in the same partition. `None` if no such stage exists.
pub(crate) fn previous_stage_of(
  registry: &PhaseRegistry,
  catalog: &StageCatalog,
  stage_id: &StageId
) -> Result<Option<StageId>> {
  let stage = catalog.get(stage_id)?;
  let phase = registry.get(stage.phase())?;

  let position = phase.stages().iter().position(|id| id == stage_id)
    .expect("a cataloged stage is always recorded in its own phase's stage list");

  if position > 0 {
    return Ok(Some(phase.stages()[position - 1].clone()));
  }

  resolve_phase_input_stage(registry, stage.phase())
}

/// The output of the phase immediately preceding `key` that has any stages.
///
/// Walks backwards through `key`'s partition from the phase before `key`
/// toward the first phase. Returns `Ok(None)` if `key` is the first phase
/// in its partition, or if every earlier phase in the partition is empty.
/// Export phases never fall back into build phases for this traversal.
pub(crate) fn resolve_phase_input_stage(
  registry: &PhaseRegistry,
  key: &PhaseKey
) -> Result<Option<StageId>> {
  for phase in registry.phases_before(key)? {
    if let Some(id) = phase.last_stage() {
      return Ok(Some(id.clone()));
    }
  }

  Ok(None)
}

/// The last stage of `key` if it has any stages; otherwise the resolved
/// input stage of `key` (the most recent work up to and including `key`).
pub(crate) fn resolve_phase_output_stage(
  registry: &PhaseRegistry,
  key: &PhaseKey
) -> Result<Option<StageId>> {
  let phase = registry.get(key)?;

  if let Some(id) = phase.last_stage() {
    return Ok(Some(id.clone()));
  }

  resolve_phase_input_stage(registry, key)
}

/// Resolves a single `Input` relative to the stage it is attached to.
///
/// Used both for a stage's own source and for any nested `Input` carried by
/// one of that stage's operations. `Auto` and `Phase` are resolved to a
/// concrete `Stage(id)`; every other variant passes through unchanged.
pub(crate) fn resolve_input_from_stage(
  registry: &PhaseRegistry,
  catalog: &StageCatalog,
  input: &Input,
  stage_id: &StageId
) -> Result<Input> {
  // confirms the owning stage itself is registered before resolving
  // anything relative to it
  catalog.get(stage_id)?;

  match input {
    Input::Auto => {
      match previous_stage_of(registry, catalog, stage_id)? {
        Some(id) => Ok(Input::Stage(id)),
        None => NoInputStage { context: format!("stage '{}'", stage_id) }.fail()
      }
    },

    Input::Stage(id) => {
      ensure!(catalog.contains(id), StageNotFound { id: id.clone() });
      Ok(Input::Stage(id.clone()))
    },

    Input::Phase(key) => {
      match resolve_phase_output_stage(registry, key)? {
        Some(id) => Ok(Input::Stage(id)),
        None => NoInputStage { context: format!("phase '{}'", key) }.fail()
      }
    },

    other => Ok(other.clone())
  }
}

/// Resolves an `Input` carried by an operation (as opposed to a stage's own
/// source). `Auto` is meaningful only for a stage source, so it is rejected
/// here with `InvalidInput` rather than silently resolved.
pub(crate) fn resolve_operation_input(
  registry: &PhaseRegistry,
  catalog: &StageCatalog,
  input: &Input,
  stage_id: &StageId
) -> Result<Input> {
  ensure!(
    !matches!(input, Input::Auto),
    InvalidInput {
      message: "Auto is only meaningful as a stage source, not within an operation".to_string()
    }
  );

  resolve_input_from_stage(registry, catalog, input, stage_id)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::stage::{Stage, StageOptions};

  fn phase(key: &str) -> PhaseKey {
    PhaseKey::new(key).unwrap()
  }

  /// Registers `id` in both the catalog and its phase's stage list, the way
  /// `Composer::add_stage` does; kept here so resolver tests don't need a
  /// full composer to set up fixtures.
  fn add_stage(registry: &mut PhaseRegistry, catalog: &mut StageCatalog, phase_key: &str, id: &str) {
    let key = phase(phase_key);
    registry.create_if_absent(key.clone());

    let stage_id = StageId::new(id);
    catalog.insert(Stage::new(stage_id.clone(), key.clone(), StageOptions::new())).unwrap();
    registry.get_mut(&key).unwrap().push_stage(stage_id);
  }

  #[test]
  fn auto_on_first_stage_of_first_phase_has_no_input() {
    let registry = PhaseRegistry::with_phases(vec![phase("build.only")]).unwrap();
    let result = resolve_phase_input_stage(&registry, &phase("build.only")).unwrap();
    assert_eq!(result, None);
  }

  #[test]
  fn phase_unregistered_is_phase_not_found() {
    let registry = PhaseRegistry::with_phases(vec![phase("build.only")]).unwrap();
    let err = resolve_phase_output_stage(&registry, &phase("build.other"));
    assert!(matches!(err, Err(Error::PhaseNotFound { .. })));
  }

  #[test]
  fn previous_stage_within_same_phase() {
    let mut registry = PhaseRegistry::with_phases(vec![phase("build.base")]).unwrap();
    let mut catalog = StageCatalog::new();

    add_stage(&mut registry, &mut catalog, "build.base", "s1");
    add_stage(&mut registry, &mut catalog, "build.base", "s2");

    let prev = previous_stage_of(&registry, &catalog, &StageId::new("s2")).unwrap();
    assert_eq!(prev, Some(StageId::new("s1")));
  }

  #[test]
  fn previous_stage_crosses_into_earlier_nonempty_phase() {
    let mut registry = PhaseRegistry::with_phases(vec![
      phase("build.base"),
      phase("build.system-deps"),
    ]).unwrap();
    let mut catalog = StageCatalog::new();

    add_stage(&mut registry, &mut catalog, "build.base", "s1");
    add_stage(&mut registry, &mut catalog, "build.system-deps", "s2");

    let prev = previous_stage_of(&registry, &catalog, &StageId::new("s2")).unwrap();
    assert_eq!(prev, Some(StageId::new("s1")));
  }

  #[test]
  fn auto_with_no_predecessor_is_no_input_stage() {
    let mut registry = PhaseRegistry::with_phases(vec![phase("build.base")]).unwrap();
    let mut catalog = StageCatalog::new();

    add_stage(&mut registry, &mut catalog, "build.base", "s1");

    let err = resolve_input_from_stage(&registry, &catalog, &Input::Auto, &StageId::new("s1"));
    assert!(matches!(err, Err(Error::NoInputStage { .. })));
  }

  #[test]
  fn phase_input_resolves_to_stage() {
    let mut registry = PhaseRegistry::with_phases(vec![
      phase("build.base"),
      phase("build.app-build"),
    ]).unwrap();
    let mut catalog = StageCatalog::new();

    add_stage(&mut registry, &mut catalog, "build.base", "s1");

    let resolved = resolve_input_from_stage(
      &registry,
      &catalog,
      &Input::Phase(phase("build.base")),
      &StageId::new("s1")
    ).unwrap();

    assert_eq!(resolved, Input::Stage(StageId::new("s1")));
  }

  #[test]
  fn operation_input_rejects_auto() {
    let mut registry = PhaseRegistry::with_phases(vec![phase("build.base")]).unwrap();
    let mut catalog = StageCatalog::new();

    add_stage(&mut registry, &mut catalog, "build.base", "s1");

    let err = resolve_operation_input(&registry, &catalog, &Input::Auto, &StageId::new("s1"));
    assert!(matches!(err, Err(Error::InvalidInput { .. })));
  }

  #[test]
  fn dangling_stage_reference_is_stage_not_found() {
    let mut registry = PhaseRegistry::with_phases(vec![phase("build.base")]).unwrap();
    let mut catalog = StageCatalog::new();

    add_stage(&mut registry, &mut catalog, "build.base", "s1");

    let err = resolve_input_from_stage(
      &registry,
      &catalog,
      &Input::Stage(StageId::new("missing")),
      &StageId::new("s1")
    );

    assert!(matches!(err, Err(Error::StageNotFound { .. })));
  }
}
