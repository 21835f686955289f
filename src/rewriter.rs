// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

//! Rewrites a stage's operations in place, resolving every nested [`Input`]
//! they carry (mount sources, copy/add origins) the same way the stage's
//! own source is resolved.

use crate::error::Result;
use crate::input::{AddOperation, CopyOperation, ExecOperation, Mount, Operation};
use crate::phase::PhaseRegistry;
use crate::resolver::resolve_operation_input;
use crate::stage::{StageCatalog, StageId};

/// Rewrites every operation attached to `stage_id`, resolving their nested
/// inputs against the current state of `registry`/`catalog`.
///
/// Operations are rewritten independently and in order; a failure to
/// resolve one operation's input does not prevent reporting which one it
/// was, via the error's content, but does stop the rewrite.
pub(crate) fn rewrite_operations(
  registry: &PhaseRegistry,
  catalog: &StageCatalog,
  stage_id: &StageId,
  operations: &[Operation]
) -> Result<Vec<Operation>> {
  operations.iter()
    .map(|operation| rewrite_operation(registry, catalog, stage_id, operation))
    .collect()
}

fn rewrite_operation(
  registry: &PhaseRegistry,
  catalog: &StageCatalog,
  stage_id: &StageId,
  operation: &Operation
) -> Result<Operation> {
  match operation {
    Operation::Exec(exec) => rewrite_exec(registry, catalog, stage_id, exec).map(Operation::Exec),
    Operation::Copy(copy) => rewrite_copy(registry, catalog, stage_id, copy).map(Operation::Copy),
    Operation::Add(add) => rewrite_add(registry, catalog, stage_id, add).map(Operation::Add),
    Operation::SetEnv(_) | Operation::MkFile(_) => Ok(operation.clone())
  }
}

fn rewrite_exec(
  registry: &PhaseRegistry,
  catalog: &StageCatalog,
  stage_id: &StageId,
  exec: &ExecOperation
) -> Result<ExecOperation> {
  let mounts = exec.mounts.iter()
    .map(|mount| rewrite_mount(registry, catalog, stage_id, mount))
    .collect::<Result<Vec<_>>>()?;

  Ok(ExecOperation { mounts, ..exec.clone() })
}

fn rewrite_mount(
  registry: &PhaseRegistry,
  catalog: &StageCatalog,
  stage_id: &StageId,
  mount: &Mount
) -> Result<Mount> {
  let source = match &mount.source {
    Some(input) => Some(resolve_operation_input(registry, catalog, input, stage_id)?),
    None => None
  };

  Ok(Mount { source, ..mount.clone() })
}

fn rewrite_copy(
  registry: &PhaseRegistry,
  catalog: &StageCatalog,
  stage_id: &StageId,
  copy: &CopyOperation
) -> Result<CopyOperation> {
  let from = resolve_operation_input(registry, catalog, &copy.from, stage_id)?;
  Ok(CopyOperation { from, ..copy.clone() })
}

fn rewrite_add(
  registry: &PhaseRegistry,
  catalog: &StageCatalog,
  stage_id: &StageId,
  add: &AddOperation
) -> Result<AddOperation> {
  let from = match &add.from {
    Some(input) => Some(resolve_operation_input(registry, catalog, input, stage_id)?),
    None => None
  };

  Ok(AddOperation { from, ..add.clone() })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Error;
  use crate::input::{ExecCommand, Input};
  use crate::phase::PhaseKey;
  use crate::stage::{Stage, StageOptions};

  fn phase(key: &str) -> PhaseKey {
    PhaseKey::new(key).unwrap()
  }

  fn add_stage(registry: &mut PhaseRegistry, catalog: &mut StageCatalog, phase_key: &str, id: &str) {
    let key = phase(phase_key);
    registry.create_if_absent(key.clone());

    let stage_id = StageId::new(id);
    catalog.insert(Stage::new(stage_id.clone(), key.clone(), StageOptions::new())).unwrap();
    registry.get_mut(&key).unwrap().push_stage(stage_id);
  }

  #[test]
  fn copy_auto_resolves_to_predecessor() {
    let mut registry = PhaseRegistry::with_phases(vec![phase("build.base")]).unwrap();
    let mut catalog = StageCatalog::new();

    add_stage(&mut registry, &mut catalog, "build.base", "s1");
    add_stage(&mut registry, &mut catalog, "build.base", "s2");

    let operations = vec![
      Operation::Copy(CopyOperation::new(Input::Auto, vec!["/a"], "/b"))
    ];

    let rewritten = rewrite_operations(&registry, &catalog, &StageId::new("s2"), &operations).unwrap();

    match &rewritten[0] {
      Operation::Copy(copy) => assert_eq!(copy.from, Input::Stage(StageId::new("s1"))),
      other => panic!("expected Copy, got {:?}", other)
    }
  }

  #[test]
  fn exec_mount_auto_is_rejected() {
    let mut registry = PhaseRegistry::with_phases(vec![phase("build.base")]).unwrap();
    let mut catalog = StageCatalog::new();

    add_stage(&mut registry, &mut catalog, "build.base", "s1");

    let operations = vec![
      Operation::Exec(
        ExecOperation::new(ExecCommand::shell("make"))
          .with_mount(Mount::bind(Input::Auto, "/src"))
      )
    ];

    let err = rewrite_operations(&registry, &catalog, &StageId::new("s1"), &operations);
    assert!(matches!(err, Err(Error::InvalidInput { .. })));
  }

  #[test]
  fn add_without_from_passes_through_unchanged() {
    let mut registry = PhaseRegistry::with_phases(vec![phase("build.base")]).unwrap();
    let mut catalog = StageCatalog::new();

    add_stage(&mut registry, &mut catalog, "build.base", "s1");

    let operations = vec![
      Operation::Add(AddOperation::new(vec!["https://example.com/x.tgz"], "/opt/x.tgz"))
    ];

    let rewritten = rewrite_operations(&registry, &catalog, &StageId::new("s1"), &operations).unwrap();
    assert_eq!(rewritten, operations);
  }

  #[test]
  fn set_env_and_mkfile_are_unaffected() {
    let mut registry = PhaseRegistry::with_phases(vec![phase("build.base")]).unwrap();
    let mut catalog = StageCatalog::new();

    add_stage(&mut registry, &mut catalog, "build.base", "s1");

    use crate::input::{MkFileOperation, SetEnvOperation};

    let operations = vec![
      Operation::SetEnv(SetEnvOperation::new(vec![("A".into(), "1".into())])),
      Operation::MkFile(MkFileOperation::new("/etc/x", b"hi".to_vec()))
    ];

    let rewritten = rewrite_operations(&registry, &catalog, &StageId::new("s1"), &operations).unwrap();
    assert_eq!(rewritten, operations);
  }
}
