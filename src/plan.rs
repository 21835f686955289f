// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

//! The declarative, execution-ready output of composition, and the final
//! validation pass a caller may run over it before handing it to a build
//! engine.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::config::{BaseImageDescriptor, ExportConfig, Platform};
use crate::context::{BuildContext, ContextMetadata};
use crate::error::*;
use crate::input::{Input, Operation};
use crate::phase::PhaseRegistry;
use crate::resolver::resolve_input_from_stage;
use crate::rewriter::rewrite_operations;
use crate::stage::{Stage, StageCatalog, StageId};

/// The normalised, fully-resolved result of composition: a flat, ordered
/// list of stages (build phases first, then export phases) with every
/// input reference concrete, plus the platform, export configuration, and
/// build contexts the composer was configured with.
///
/// A `Plan` is a snapshot: it owns no reference back to the composer that
/// produced it, and mutating that composer afterwards does not affect an
/// already-produced plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
  pub platform: Platform,
  pub stages: Vec<Stage>,
  pub export: ExportConfig,
  pub contexts: HashMap<String, ContextMetadata>
}

impl Plan {
  pub fn get_stage(&self, id: &StageId) -> Option<&Stage> {
    self.stages.iter().find(|s| s.id() == id)
  }
}

/// Resolves a single cataloged stage's source and operations into their
/// final, concrete form. Does not mutate the catalog -- the composer's
/// stages stay symbolic until the caller explicitly re-composes.
fn resolve_stage(registry: &PhaseRegistry, catalog: &StageCatalog, stage: &Stage) -> Result<Stage> {
  trace!("resolving stage '{}' in phase '{}'", stage.id(), stage.phase());

  let source = resolve_input_from_stage(registry, catalog, stage.source(), stage.id())?;
  let operations = rewrite_operations(registry, catalog, stage.id(), stage.operations())?;

  let mut resolved = stage.clone();
  resolved.set_source(source);
  resolved.set_operations(operations);

  Ok(resolved)
}

/// Produces a [`Plan`] from the composer's current state: every stage,
/// in phase order (build partition then export partition, insertion order
/// within each phase), with its source and operations resolved.
///
/// Any resolution error aborts composition immediately, wrapped with the
/// identifier of the stage in which it was encountered -- no partial plan
/// is ever returned.
pub(crate) fn compose(
  registry: &PhaseRegistry,
  catalog: &StageCatalog,
  platform: Platform,
  export: ExportConfig,
  contexts: &HashMap<String, BuildContext>
) -> Result<Plan> {
  debug!("composing plan from {} phase(s), {} stage(s)", registry.len(), catalog.len());

  let mut stages = Vec::with_capacity(catalog.len());

  for phase in registry.iter_in_plan_order() {
    for stage_id in phase.stages() {
      let stage = catalog.get(stage_id)?;
      let resolved = resolve_stage(registry, catalog, stage)
        .map_err(|err| err.at_stage(stage_id.clone()))?;

      stages.push(resolved);
    }
  }

  let contexts = contexts.values()
    .map(|context| (context.name().to_string(), context.to_metadata()))
    .collect();

  debug!("composed plan with {} resolved stage(s)", stages.len());

  Ok(Plan { platform, stages, export, contexts })
}

fn check_input(plan: &Plan, stage_ids: &HashSet<StageId>, input: &Input) -> Result<()> {
  match input {
    Input::Stage(id) => ensure!(stage_ids.contains(id), StageNotFound { id: id.clone() }),

    Input::Local(name) => ensure!(
      plan.contexts.contains_key(name),
      MissingContext { name: name.clone() }
    ),

    Input::Auto | Input::Phase(_) => {
      return InvalidInput {
        message: format!("plan contains an unresolved symbolic input: {:?}", input)
      }.fail();
    },

    Input::Scratch | Input::Image(_) | Input::Url(_) => ()
  }

  Ok(())
}

fn check_operation(plan: &Plan, stage_ids: &HashSet<StageId>, operation: &Operation) -> Result<()> {
  match operation {
    Operation::Copy(copy) => check_input(plan, stage_ids, &copy.from)?,

    Operation::Add(add) => {
      if let Some(from) = &add.from {
        check_input(plan, stage_ids, from)?;
      }
    },

    Operation::Exec(exec) => {
      for mount in &exec.mounts {
        if let Some(source) = &mount.source {
          check_input(plan, stage_ids, source)?;
        }
      }
    },

    Operation::SetEnv(_) | Operation::MkFile(_) => ()
  }

  Ok(())
}

/// Validates an already-composed plan: unique, non-empty stage identifiers,
/// every `Stage`/`Local` reference resolvable within the plan itself, no
/// leftover `Auto`/`Phase` variant anywhere, and a build/runtime base image
/// configured.
///
/// This is a separate pass from `compose`: `compose` guarantees referential
/// integrity as it resolves each stage, but `validate_plan` re-checks the
/// result structurally and additionally enforces the execution-readiness
/// checks (base images, contexts) that are meaningless mid-composition.
pub fn validate_plan(plan: &Plan, base_image: &BaseImageDescriptor) -> Result<()> {
  ensure!(base_image.build_image.is_some(), MissingBaseImage);
  ensure!(base_image.runtime_image.is_some(), MissingRuntimeImage);

  let mut stage_ids = HashSet::with_capacity(plan.stages.len());

  for stage in &plan.stages {
    ensure!(
      !stage.id().is_empty(),
      InvalidInput { message: "stage id must not be empty".to_string() }
    );

    ensure!(
      stage_ids.insert(stage.id().clone()),
      DuplicateStageId { id: stage.id().clone() }
    );
  }

  for stage in &plan.stages {
    check_input(plan, &stage_ids, stage.source())
      .map_err(|err| err.at_stage(stage.id().clone()))?;

    for operation in stage.operations() {
      check_operation(plan, &stage_ids, operation)
        .map_err(|err| err.at_stage(stage.id().clone()))?;
    }
  }

  Ok(())
}
