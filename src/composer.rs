// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

//! The composer: the mutable, single-threaded data structure blocks are
//! driven against during composition, and the public surface that ties the
//! phase registry, stage catalog, input resolver, operation rewriter, and
//! plan builder together.

use std::collections::HashMap;

use log::debug;

use crate::config::{BaseImageDescriptor, ExportConfig, Platform};
use crate::context::BuildContext;
use crate::dependency::Dependency;
use crate::error::*;
use crate::phase::{PhaseKey, PhaseRegistry};
use crate::plan::{self, Plan};
use crate::stage::{Stage, StageCatalog, StageId, StageOptions};

/// The build-plan composer.
///
/// Holds every phase, stage, and piece of configuration contributed during
/// composition. Not thread-safe: it is a mutable data structure meant to be
/// driven by a single caller thread; a caller wishing to run block
/// detection in parallel must synchronise mutations externally.
#[derive(Debug)]
pub struct Composer {
  phases: PhaseRegistry,
  stages: StageCatalog,
  platform: Platform,
  export: ExportConfig,
  base_image: BaseImageDescriptor,
  dependencies: HashMap<String, Dependency>,
  contexts: HashMap<String, BuildContext>
}

impl Default for Composer {
  fn default() -> Composer {
    Composer::new()
  }
}

impl Composer {
  /// A composer pre-populated with the canonical default phase list.
  pub fn new() -> Composer {
    Composer {
      phases: PhaseRegistry::with_default_phases(),
      stages: StageCatalog::new(),
      platform: Platform::default(),
      export: ExportConfig::new(),
      base_image: BaseImageDescriptor::default(),
      dependencies: HashMap::new(),
      contexts: HashMap::new()
    }
  }

  /// A composer built with an arbitrary phase list, for tests that do not
  /// want the full default set.
  pub fn with_phases<I>(keys: I) -> Result<Composer>
  where
    I: IntoIterator<Item = PhaseKey>
  {
    Ok(Composer {
      phases: PhaseRegistry::with_phases(keys)?,
      ..Composer::new_empty()
    })
  }

  fn new_empty() -> Composer {
    Composer {
      phases: PhaseRegistry::new(),
      stages: StageCatalog::new(),
      platform: Platform::default(),
      export: ExportConfig::new(),
      base_image: BaseImageDescriptor::default(),
      dependencies: HashMap::new(),
      contexts: HashMap::new()
    }
  }

  // -- configuration setters -------------------------------------------

  pub fn set_platform(&mut self, platform: Platform) -> &mut Composer {
    self.platform = platform;
    self
  }

  pub fn platform(&self) -> &Platform {
    &self.platform
  }

  pub fn set_export_config(&mut self, export: ExportConfig) -> &mut Composer {
    self.export = export;
    self
  }

  pub fn export_config(&self) -> &ExportConfig {
    &self.export
  }

  pub fn set_base_image(&mut self, base_image: BaseImageDescriptor) -> &mut Composer {
    self.base_image = base_image;
    self
  }

  pub fn base_image(&self) -> &BaseImageDescriptor {
    &self.base_image
  }

  /// Stores the resolved dependency mapping, typically produced by
  /// submitting every block's declared dependencies to an external
  /// [`DependencyResolver`](crate::dependency::DependencyResolver). The
  /// composer does not perform resolution itself; it only stores and
  /// retrieves.
  pub fn set_dependencies(&mut self, dependencies: HashMap<String, Dependency>) -> &mut Composer {
    self.dependencies = dependencies;
    self
  }

  pub fn get_dependency(&self, name: &str) -> Option<&Dependency> {
    self.dependencies.get(name)
  }

  /// Registers a build context, keyed by its name. `BuildContext::new`
  /// already validated the name's shape, so this never fails.
  pub fn add_context(&mut self, context: BuildContext) -> &mut Composer {
    self.contexts.insert(context.name().to_string(), context);
    self
  }

  pub fn get_context(&self, name: &str) -> Option<&BuildContext> {
    self.contexts.get(name)
  }

  // -- stage mutation ----------------------------------------------------

  /// Adds a new stage to the phase named by `phase_key` (created if
  /// absent), with default source `Auto` unless `options` overrides it.
  /// Fails with [`Error::DuplicateStageId`] and performs no catalog
  /// mutation if `id` already exists anywhere in the composer.
  pub fn add_stage(
    &mut self,
    phase_key: impl AsRef<str>,
    id: impl Into<StageId>,
    options: StageOptions
  ) -> Result<StageHandle<'_>> {
    let key = PhaseKey::new(phase_key.as_ref())?;
    let id = id.into();

    self.phases.create_if_absent(key.clone());

    let stage = Stage::new(id.clone(), key.clone(), options);
    self.stages.insert(stage)?;

    self.phases.get_mut(&key).expect("phase was just created_if_absent").push_stage(id.clone());

    debug!("added stage '{}' to phase '{}'", id, key);

    Ok(StageHandle { id, composer: self })
  }

  pub fn get_stage(&self, id: &StageId) -> Result<&Stage> {
    self.stages.get(id)
  }

  /// Whether any stage lists `package` in its `Provides`, or the
  /// configured base image's metadata already reports it as installed.
  pub fn has_provider(&self, package: &str) -> bool {
    self.iter_stages().any(|stage| stage.provides().iter().any(|p| p == package))
      || self.base_image.provides(package)
  }

  /// Iterates every stage known to the composer, in phase order (build
  /// partition then export partition) and insertion order within each
  /// phase.
  pub fn iter_stages(&self) -> impl Iterator<Item = &Stage> {
    self.phases.iter_in_plan_order()
      .flat_map(move |phase| phase.stages().iter())
      .map(move |id| self.stages.get(id).expect("registry and catalog stay in sync"))
  }

  // -- finalisation --------------------------------------------------------

  /// Converts the composer's current state into a flat, ordered, fully
  /// resolved [`Plan`]. All-or-nothing: any resolution failure aborts
  /// immediately and is returned wrapped with the failing stage's
  /// identifier; no partial plan is ever produced.
  pub fn compose(&self) -> Result<Plan> {
    plan::compose(&self.phases, &self.stages, self.platform.clone(), self.export.clone(), &self.contexts)
  }
}

/// A handle to a single stage, returned by [`Composer::add_stage`].
///
/// The handle carries only the stage's identifier and a mutable borrow of
/// the owning composer, rather than a direct reference or back-pointer to
/// the stage itself -- this sidesteps the cycles a `Stage -> Phase`/
/// `Stage -> Composer` back-reference would otherwise need. Every fluent
/// mutator re-looks the stage up by identifier and returns `self` for
/// chaining; none of this is thread-safe.
pub struct StageHandle<'a> {
  id: StageId,
  composer: &'a mut Composer
}

impl<'a> StageHandle<'a> {
  pub fn id(&self) -> &StageId {
    &self.id
  }

  fn stage_mut(&mut self) -> &mut Stage {
    self.composer.stages.get_mut(&self.id).expect("handle always names a cataloged stage")
  }

  pub fn add_operation(mut self, operation: impl Into<crate::input::Operation>) -> StageHandle<'a> {
    self.stage_mut().push_operation(operation.into());
    self
  }

  pub fn add_operations<I, O>(mut self, operations: I) -> StageHandle<'a>
  where
    I: IntoIterator<Item = O>,
    O: Into<crate::input::Operation>
  {
    for operation in operations {
      self.stage_mut().push_operation(operation.into());
    }

    self
  }

  pub fn set_env(mut self, key: impl Into<String>, value: impl Into<String>) -> StageHandle<'a> {
    self.stage_mut().push_env(key, value);
    self
  }

  pub fn set_working_dir(mut self, dir: impl Into<String>) -> StageHandle<'a> {
    self.stage_mut().set_working_dir(dir);
    self
  }

  pub fn set_provides(mut self, packages: Vec<String>) -> StageHandle<'a> {
    self.stage_mut().set_provides(packages);
    self
  }

  /// Releases the handle, returning the underlying composer borrow so the
  /// caller can add further stages.
  pub fn done(self) -> &'a mut Composer {
    self.composer
  }
}
