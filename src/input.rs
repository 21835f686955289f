// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use serde::{Deserialize, Serialize};

use crate::image::ImageRef;
use crate::phase::PhaseKey;
use crate::stage::StageId;

/// How a stage's (or an operation's) filesystem starting point is produced.
///
/// Exactly one variant is ever in play for a given `Input` value -- modelled
/// as a closed tagged union rather than a record of optional fields, so the
/// "exactly one is set" invariant is a property of the type rather than
/// something checked at runtime.
///
/// `Auto` and `Phase` are symbolic: the composer resolves them away during
/// `compose` and neither ever appears in a finished plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Input {
  /// Use whatever the previous stage in this partition produced.
  Auto,

  /// The empty filesystem.
  Scratch,

  /// An externally-built image, potentially from a remote registry.
  Image(ImageRef),

  /// A named build context supplied by the caller.
  Local(String),

  /// A remote file fetched by URL.
  Url(String),

  /// The output of another stage already known to the composer.
  Stage(StageId),

  /// The output of the last stage of a given phase, resolved during compose.
  Phase(PhaseKey)
}

impl Input {
  /// Convenience constructor for an image reference given as a bare string,
  /// e.g. `Input::image("ubuntu:22.04")`.
  pub fn image(reference: impl AsRef<str>) -> Input {
    Input::Image(ImageRef::parse(reference.as_ref()))
  }

  pub fn local(name: impl Into<String>) -> Input {
    Input::Local(name.into())
  }

  pub fn url(url: impl Into<String>) -> Input {
    Input::Url(url.into())
  }

  pub fn stage(id: impl Into<StageId>) -> Input {
    Input::Stage(id.into())
  }

  pub fn phase(key: PhaseKey) -> Input {
    Input::Phase(key)
  }

  /// Whether this input is one of the symbolic variants the composer must
  /// resolve away before a plan can be emitted.
  pub fn is_symbolic(&self) -> bool {
    matches!(self, Input::Auto | Input::Phase(_))
  }
}

/// The shape of a bind/cache/secret/tmpfs mount attached to an `Exec`
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountKind {
  /// A read-only or read-write bind of another input's filesystem.
  Bind,

  /// A persistent cache directory, keyed by `target`.
  Cache,

  /// A secret injected only for the duration of the command.
  Secret,

  /// An ephemeral, empty directory.
  Tmpfs
}

/// A single mount attached to an `Exec` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mount {
  pub kind: MountKind,

  /// The filesystem to mount from. Only `Bind` and `Cache` mounts carry a
  /// source; `Secret` and `Tmpfs` mounts are populated by the execution
  /// backend and have none.
  pub source: Option<Input>,

  pub target: String
}

impl Mount {
  pub fn bind(source: Input, target: impl Into<String>) -> Mount {
    Mount { kind: MountKind::Bind, source: Some(source), target: target.into() }
  }

  pub fn cache(source: Input, target: impl Into<String>) -> Mount {
    Mount { kind: MountKind::Cache, source: Some(source), target: target.into() }
  }

  pub fn secret(target: impl Into<String>) -> Mount {
    Mount { kind: MountKind::Secret, source: None, target: target.into() }
  }

  pub fn tmpfs(target: impl Into<String>) -> Mount {
    Mount { kind: MountKind::Tmpfs, source: None, target: target.into() }
  }
}

/// The form of an `Exec` operation's command: a raw shell string or an argv
/// array run without a shell.
///
/// Mirrors the shell/exec split Dockerfile `RUN` instructions make.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecCommand {
  Shell(String),
  Exec(Vec<String>)
}

impl ExecCommand {
  pub fn shell(s: impl Into<String>) -> ExecCommand {
    ExecCommand::Shell(s.into())
  }

  pub fn exec<S: Into<String>>(args: Vec<S>) -> ExecCommand {
    ExecCommand::Exec(args.into_iter().map(Into::into).collect())
  }
}

/// Runs a command against the stage's current filesystem state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecOperation {
  pub command: ExecCommand,
  pub mounts: Vec<Mount>,
  pub env: Vec<(String, String)>,
  pub working_dir: Option<String>
}

impl ExecOperation {
  pub fn new(command: ExecCommand) -> ExecOperation {
    ExecOperation { command, mounts: Vec::new(), env: Vec::new(), working_dir: None }
  }

  pub fn with_mount(mut self, mount: Mount) -> ExecOperation {
    self.mounts.push(mount);
    self
  }

  pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> ExecOperation {
    self.env.push((key.into(), value.into()));
    self
  }

  pub fn with_working_dir(mut self, dir: impl Into<String>) -> ExecOperation {
    self.working_dir = Some(dir.into());
    self
  }
}

/// Copies files from another input into the stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyOperation {
  pub from: Input,
  pub sources: Vec<String>,
  pub destination: String,
  pub chown: Option<String>,
  pub chmod: Option<String>
}

impl CopyOperation {
  pub fn new(from: Input, sources: Vec<impl Into<String>>, destination: impl Into<String>) -> CopyOperation {
    CopyOperation {
      from,
      sources: sources.into_iter().map(Into::into).collect(),
      destination: destination.into(),
      chown: None,
      chmod: None
    }
  }

  pub fn with_chown(mut self, chown: impl Into<String>) -> CopyOperation {
    self.chown = Some(chown.into());
    self
  }

  pub fn with_chmod(mut self, chmod: impl Into<String>) -> CopyOperation {
    self.chmod = Some(chmod.into());
    self
  }
}

/// Adds a (possibly remote) file into the stage, with optional checksum
/// verification left to the execution backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddOperation {
  pub from: Option<Input>,
  pub sources: Vec<String>,
  pub destination: String,
  pub checksum: Option<String>
}

impl AddOperation {
  pub fn new(sources: Vec<impl Into<String>>, destination: impl Into<String>) -> AddOperation {
    AddOperation {
      from: None,
      sources: sources.into_iter().map(Into::into).collect(),
      destination: destination.into(),
      checksum: None
    }
  }

  pub fn with_from(mut self, from: Input) -> AddOperation {
    self.from = Some(from);
    self
  }

  pub fn with_checksum(mut self, checksum: impl Into<String>) -> AddOperation {
    self.checksum = Some(checksum.into());
    self
  }
}

/// Sets one or more environment variables for the remainder of the stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetEnvOperation {
  pub vars: Vec<(String, String)>
}

impl SetEnvOperation {
  pub fn new(vars: Vec<(String, String)>) -> SetEnvOperation {
    SetEnvOperation { vars }
  }
}

/// Writes a literal file into the stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MkFileOperation {
  pub path: String,
  pub contents: Vec<u8>,
  pub mode: Option<u32>
}

impl MkFileOperation {
  pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> MkFileOperation {
    MkFileOperation { path: path.into(), contents: contents.into(), mode: None }
  }

  pub fn with_mode(mut self, mode: u32) -> MkFileOperation {
    self.mode = Some(mode);
    self
  }
}

/// A single atomic image-build action attached to a stage.
///
/// A closed tagged sum with an explicit variant per operation kind, so the
/// operation rewriter's match is total and the compiler -- not a runtime
/// type-switch -- catches a forgotten case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
  Exec(ExecOperation),
  Copy(CopyOperation),
  Add(AddOperation),
  #[serde(rename = "env")]
  SetEnv(SetEnvOperation),
  #[serde(rename = "mkfile")]
  MkFile(MkFileOperation)
}

/// Maps an operation struct to its enum variant, implementing `From<T>` on
/// `Operation` for it.
macro_rules! impl_from_operation {
  ($struct:ident, $enum:expr) => {
    impl From<$struct> for Operation {
      fn from(op: $struct) -> Self {
        $enum(op)
      }
    }
  };
}

impl_from_operation!(ExecOperation, Operation::Exec);
impl_from_operation!(CopyOperation, Operation::Copy);
impl_from_operation!(AddOperation, Operation::Add);
impl_from_operation!(SetEnvOperation, Operation::SetEnv);
impl_from_operation!(MkFileOperation, Operation::MkFile);

impl Operation {
  pub fn as_exec(&self) -> Option<&ExecOperation> {
    match self {
      Operation::Exec(op) => Some(op),
      _ => None
    }
  }

  pub fn as_copy(&self) -> Option<&CopyOperation> {
    match self {
      Operation::Copy(op) => Some(op),
      _ => None
    }
  }

  pub fn as_add(&self) -> Option<&AddOperation> {
    match self {
      Operation::Add(op) => Some(op),
      _ => None
    }
  }
}
