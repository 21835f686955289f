// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::*;

lazy_static! {
  static ref CONTEXT_NAME_PATTERN: Regex = Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap();
}

/// Everything about a build context that crosses the serialisation boundary
/// into a [`Plan`](crate::plan::Plan); the filesystem handle itself is
/// omitted, per the Plan schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMetadata {
  pub name: String,
  pub source_block: Option<String>,
  pub description: Option<String>,
  pub metadata: Vec<(String, String)>
}

/// An opaque handle to wherever a build context's files actually live.
///
/// The composer never opens, reads, or writes through this handle; it only
/// carries it so later callers (the execution backend) can find the same
/// context again by name.
pub trait ContextSource: std::fmt::Debug {}

/// A named build context supplied by the caller, referenced from operations
/// via `Input::Local(name)`.
#[derive(Debug)]
pub struct BuildContext {
  name: String,
  source_block: Option<String>,
  description: Option<String>,
  metadata: Vec<(String, String)>,
  handle: Box<dyn ContextSource>
}

impl BuildContext {
  /// Validates and wraps a build context. `name` must match the same
  /// lowercase-slug shape a `Local(name)` reference expects; anything else
  /// fails with `InvalidInput`, the same way a malformed `PhaseKey` does.
  pub fn new(name: impl Into<String>, handle: Box<dyn ContextSource>) -> Result<BuildContext> {
    let name = name.into();

    ensure!(
      CONTEXT_NAME_PATTERN.is_match(&name),
      InvalidInput {
        message: format!("invalid build context name '{}': must match [a-z0-9][a-z0-9_-]*", name)
      }
    );

    Ok(BuildContext { name, source_block: None, description: None, metadata: Vec::new(), handle })
  }

  /// Records the name of the block that contributed this context, for
  /// diagnostics -- the composer never interprets it.
  pub fn with_source_block(mut self, source_block: impl Into<String>) -> BuildContext {
    self.source_block = Some(source_block.into());
    self
  }

  pub fn with_description(mut self, description: impl Into<String>) -> BuildContext {
    self.description = Some(description.into());
    self
  }

  pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> BuildContext {
    self.metadata.push((key.into(), value.into()));
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn source_block(&self) -> Option<&str> {
    self.source_block.as_deref()
  }

  pub fn handle(&self) -> &dyn ContextSource {
    self.handle.as_ref()
  }

  pub(crate) fn to_metadata(&self) -> ContextMetadata {
    ContextMetadata {
      name: self.name.clone(),
      source_block: self.source_block.clone(),
      description: self.description.clone(),
      metadata: self.metadata.clone()
    }
  }
}
