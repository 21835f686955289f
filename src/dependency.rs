// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

//! Dependency records contributed by blocks, and the resolver boundary that
//! turns requested constraints into resolved versions.
//!
//! The composer is deliberately ignorant of dependency semantics -- version
//! constraints, compatibility matrices, and conflict resolution live on the
//! other side of the [`DependencyResolver`] trait. It only stores the
//! resulting name-keyed mapping and answers `get_dependency` lookups.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single dependency declaration or resolution.
///
/// `resolved_version` is `None` until a [`DependencyResolver`] has run;
/// the composer stores whatever it is given and never computes it itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
  pub name: String,
  pub requesting_block: String,
  pub requested_constraint: String,
  pub resolved_version: Option<String>,
  pub source: Option<String>
}

impl Dependency {
  pub fn new(name: impl Into<String>, requesting_block: impl Into<String>, requested_constraint: impl Into<String>) -> Dependency {
    Dependency {
      name: name.into(),
      requesting_block: requesting_block.into(),
      requested_constraint: requested_constraint.into(),
      resolved_version: None,
      source: None
    }
  }

  pub fn with_resolved_version(mut self, version: impl Into<String>) -> Dependency {
    self.resolved_version = Some(version.into());
    self
  }

  pub fn with_source(mut self, source: impl Into<String>) -> Dependency {
    self.source = Some(source.into());
    self
  }
}

/// An external collaborator that turns the union of every block's requested
/// dependencies into a name-to-resolved-record mapping.
///
/// Dependency resolution itself -- version conflict detection, compatibility
/// matrices -- is out of scope for the composer; this trait exists only to
/// describe the boundary the composer calls through.
pub trait DependencyResolver {
  fn resolve(&self, requested: &[Dependency]) -> HashMap<String, Dependency>;
}

/// A trivial resolver that accepts every requested constraint as-is,
/// without attempting version resolution.
///
/// Provided only to make [`DependencyResolver`] exercisable in tests and
/// doc examples; production dependency resolution is an external
/// collaborator's responsibility.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllResolver;

impl DependencyResolver for AcceptAllResolver {
  fn resolve(&self, requested: &[Dependency]) -> HashMap<String, Dependency> {
    requested.iter()
      .cloned()
      .map(|dep| {
        let version = dep.requested_constraint.clone();
        (dep.name.clone(), dep.with_resolved_version(version))
      })
      .collect()
  }
}
