// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

//! Small value types that cross the plan boundary unvalidated: the target
//! platform, the export-time image configuration, and the base image
//! descriptor a composer is configured against.
//!
//! None of these are interpreted by the composer beyond what `has_provider`
//! needs from [`BaseImageDescriptor`] -- they are stored as given and copied
//! into the emitted [`Plan`](crate::plan::Plan) by reference.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::image::ImageRef;

/// The target platform a plan is being composed for.
///
/// The composer does not validate `os`/`arch` spellings; that is the
/// execution backend's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
  pub os: String,
  pub arch: String
}

impl Platform {
  pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Platform {
    Platform { os: os.into(), arch: arch.into() }
  }
}

/// The final image's export-time configuration.
///
/// A caller-supplied value the composer passes through to the plan
/// unchanged; it performs no validation of entrypoint/cmd/labels content,
/// the same way it treats `Local` filesystem handles as opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
  pub entrypoint: Option<Vec<String>>,
  pub cmd: Option<Vec<String>>,
  pub exposed_ports: Vec<String>,
  pub labels: Vec<(String, String)>,
  pub working_dir: Option<String>,
  pub env: Vec<(String, String)>
}

impl ExportConfig {
  pub fn new() -> ExportConfig {
    ExportConfig::default()
  }

  pub fn with_entrypoint<S: Into<String>>(mut self, entrypoint: Vec<S>) -> ExportConfig {
    self.entrypoint = Some(entrypoint.into_iter().map(Into::into).collect());
    self
  }

  pub fn with_cmd<S: Into<String>>(mut self, cmd: Vec<S>) -> ExportConfig {
    self.cmd = Some(cmd.into_iter().map(Into::into).collect());
    self
  }

  pub fn with_exposed_port(mut self, port: impl Into<String>) -> ExportConfig {
    self.exposed_ports.push(port.into());
    self
  }

  pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> ExportConfig {
    self.labels.push((key.into(), value.into()));
    self
  }

  pub fn with_working_dir(mut self, dir: impl Into<String>) -> ExportConfig {
    self.working_dir = Some(dir.into());
    self
  }

  pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> ExportConfig {
    self.env.push((key.into(), value.into()));
    self
  }
}

/// An opaque, pre-installed package record contributed by a base image's
/// metadata. The composer never inspects its contents; it only checks for
/// the presence of a name as a key.
pub type PackageRecord = serde_json::Value;

/// The build and runtime base images a composer is targeting, plus whatever
/// packages the runtime image's metadata already reports as pre-installed.
///
/// Consulted only by `has_provider`; the composer performs no registry I/O
/// to populate or validate this metadata (per the Non-goals), it is supplied
/// once by the caller.
#[derive(Debug, Clone, Default)]
pub struct BaseImageDescriptor {
  pub build_image: Option<ImageRef>,
  pub runtime_image: Option<ImageRef>,
  pub provided_packages: HashMap<String, PackageRecord>
}

impl BaseImageDescriptor {
  pub fn new(build_image: ImageRef, runtime_image: ImageRef) -> BaseImageDescriptor {
    BaseImageDescriptor {
      build_image: Some(build_image),
      runtime_image: Some(runtime_image),
      provided_packages: HashMap::new()
    }
  }

  pub fn with_provided_package(mut self, name: impl Into<String>, record: PackageRecord) -> BaseImageDescriptor {
    self.provided_packages.insert(name.into(), record);
    self
  }

  pub fn provides(&self, package: &str) -> bool {
    self.provided_packages.contains_key(package)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn export_config_builder_accumulates_fields() {
    let config = ExportConfig::new()
      .with_entrypoint(vec!["python3"])
      .with_cmd(vec!["app.py"])
      .with_exposed_port("8080")
      .with_label("org.opencontainers.image.source", "https://example.com")
      .with_working_dir("/app")
      .with_env("PORT", "8080");

    assert_eq!(config.entrypoint, Some(vec!["python3".to_string()]));
    assert_eq!(config.cmd, Some(vec!["app.py".to_string()]));
    assert_eq!(config.exposed_ports, vec!["8080".to_string()]);
    assert_eq!(config.working_dir.as_deref(), Some("/app"));
  }

  #[test]
  fn base_image_descriptor_reports_provided_packages() {
    let descriptor = BaseImageDescriptor::new(
      ImageRef::parse("python:3.11"),
      ImageRef::parse("python:3.11-slim")
    ).with_provided_package("libssl", serde_json::json!({"version": "3.0"}));

    assert!(descriptor.provides("libssl"));
    assert!(!descriptor.provides("libcurl"));
  }
}
