// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

//! Composes declarative, execution-ready container build plans from
//! independent detection blocks.
//!
//! Blocks contribute stages and operations to a staged, multi-phase build
//! (see [`Composer`]) without knowing about each other; `compose` then
//! normalises their contributions into a flat [`Plan`] with every symbolic
//! input reference (`Auto`, `Phase(..)`) resolved to a concrete stage.
//! Translating a `Plan` into a build graph and actually running it is the
//! job of a downstream execution backend, out of scope for this crate.

#![forbid(unsafe_code)]

mod error;
mod image;
mod context;
mod config;
mod phase;
mod stage;
mod input;
mod resolver;
mod rewriter;
mod dependency;
mod block;
mod plan;
mod composer;

pub use error::*;
pub use image::*;
pub use context::*;
pub use config::*;
pub use phase::{Partition, PhaseKey, Phase, PhaseRegistry, DEFAULT_BUILD_PHASES, DEFAULT_EXPORT_PHASES};
pub use stage::*;
pub use input::*;
pub use dependency::*;
pub use block::*;
pub use plan::*;
pub use composer::*;
