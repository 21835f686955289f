// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

//! The collaborator boundary the composer is driven through: blocks detect
//! whether they apply to a project, declare their dependencies, and
//! contribute stages. Detection/stack orchestration, and project source
//! inspection that would populate a real [`ProjectInfo`], are out of scope
//! for this crate -- this module describes the boundary, it does not
//! implement a detector.

use std::collections::HashMap;

use crate::composer::Composer;
use crate::dependency::Dependency;
use crate::error::Result;

/// A minimal in-memory stand-in for whatever a real stack orchestrator
/// would have already learned about a project (manifest contents,
/// detected language, file listings, ...).
///
/// Provided only to make [`Block::detect`] exercisable in tests and doc
/// examples; real project inspection lives entirely outside this crate.
#[derive(Debug, Clone, Default)]
pub struct ProjectInfo {
  root: String,
  facts: HashMap<String, String>
}

impl ProjectInfo {
  pub fn new(root: impl Into<String>) -> ProjectInfo {
    ProjectInfo { root: root.into(), facts: HashMap::new() }
  }

  pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<String>) -> ProjectInfo {
    self.facts.insert(key.into(), value.into());
    self
  }

  pub fn root(&self) -> &str {
    &self.root
  }

  pub fn fact(&self, key: &str) -> Option<&str> {
    self.facts.get(key).map(String::as_str)
  }
}

/// A unit of contribution: decides whether it applies to a project,
/// declares what it depends on, and adds stages to a composer if so.
///
/// The composer sees only the call sequence a [`Stack`] drives it through;
/// it never inspects a block's identity or inter-block relationships.
pub trait Block {
  /// A human-readable name, used only for diagnostics (dependency
  /// attribution, logging) -- never interpreted by the composer.
  fn name(&self) -> &str;

  /// Whether this block applies to the given project. A `detect` failure
  /// is treated as a warning by the stack orchestrator and causes only
  /// this block to be skipped; that recovery happens above the composer.
  fn detect(&self, project: &ProjectInfo) -> Result<bool>;

  /// The dependencies this block would request, given it has already
  /// detected a match. Returned to the caller for submission to a
  /// [`DependencyResolver`](crate::dependency::DependencyResolver), not
  /// resolved here.
  fn dependencies(&self, project: &ProjectInfo) -> Vec<Dependency> {
    let _ = project;
    Vec::new()
  }

  /// Adds whatever stages and operations this block contributes.
  fn plan(&self, composer: &mut Composer) -> Result<()>;
}

/// A bundle of blocks appropriate for a given kind of project.
///
/// The composer does not distinguish a `Stack` from its individual blocks;
/// it sees only the sequence of `plan` calls. This type exists purely as a
/// convenience for callers grouping blocks together -- it performs no
/// dependency-conflict resolution or ordering beyond the list it was given.
pub struct Stack {
  name: String,
  blocks: Vec<Box<dyn Block>>
}

impl Stack {
  pub fn new(name: impl Into<String>) -> Stack {
    Stack { name: name.into(), blocks: Vec::new() }
  }

  pub fn with_block(mut self, block: Box<dyn Block>) -> Stack {
    self.blocks.push(block);
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn blocks(&self) -> &[Box<dyn Block>] {
    &self.blocks
  }

  /// Runs every detected block's `plan` method against `composer`, in
  /// order. Not a substitute for a real stack orchestrator: there is no
  /// parallelism, no dependency-conflict handling, and a `detect` error
  /// aborts the whole run rather than merely skipping the offending block
  /// (that forgiving recovery belongs to a real orchestrator, which this
  /// minimal helper does not attempt to be).
  pub fn plan_all(&self, composer: &mut Composer, project: &ProjectInfo) -> Result<()> {
    for block in &self.blocks {
      if block.detect(project)? {
        block.plan(composer)?;
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::input::Input;
  use crate::stage::StageOptions;

  struct PythonBlock;

  impl Block for PythonBlock {
    fn name(&self) -> &str {
      "python"
    }

    fn detect(&self, project: &ProjectInfo) -> Result<bool> {
      Ok(project.fact("language") == Some("python"))
    }

    fn dependencies(&self, _project: &ProjectInfo) -> Vec<Dependency> {
      vec![Dependency::new("python", self.name(), "^3.11")]
    }

    fn plan(&self, composer: &mut Composer) -> Result<()> {
      composer.add_stage(
        "build.app-build",
        "python-install",
        StageOptions::new().source(Input::image("python:3.11"))
      )?;

      Ok(())
    }
  }

  struct NeverBlock;

  impl Block for NeverBlock {
    fn name(&self) -> &str {
      "never"
    }

    fn detect(&self, _project: &ProjectInfo) -> Result<bool> {
      Ok(false)
    }

    fn plan(&self, _composer: &mut Composer) -> Result<()> {
      panic!("plan() must not be called when detect() returns false");
    }
  }

  #[test]
  fn stack_plans_only_detected_blocks() {
    let mut composer = Composer::new();
    let project = ProjectInfo::new("/src").with_fact("language", "python");

    let stack = Stack::new("python-stack")
      .with_block(Box::new(PythonBlock))
      .with_block(Box::new(NeverBlock));

    stack.plan_all(&mut composer, &project).unwrap();

    assert!(composer.get_stage(&"python-install".into()).is_ok());
  }
}
