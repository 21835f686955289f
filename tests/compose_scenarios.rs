// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use buildplan_composer::*;
use pretty_assertions::assert_eq;

mod common;
use common::*;

#[test]
fn auto_within_a_phase() {
  let mut composer = Composer::new();

  composer.add_stage("build.system-deps", "s1", StageOptions::new().source(Input::image("ubuntu:22.04")))
    .unwrap()
    .add_operation(ExecOperation::new(ExecCommand::shell("apt-get update")));

  composer.add_stage("build.system-deps", "s2", StageOptions::new()).unwrap();

  composer.add_stage("export.export-base", "e1", StageOptions::new().source(Input::image("ubuntu:22.04-slim")))
    .unwrap()
    .add_operation(CopyOperation::new(Input::stage("s2"), vec!["/usr/bin/python3"], "/usr/bin/"));

  let plan = composer.compose().unwrap();

  assert_eq!(stage_ids(&plan), vec!["s1", "s2", "e1"]);
  assert_eq!(
    sources(&plan),
    vec![
      Input::image("ubuntu:22.04"),
      Input::Stage(StageId::new("s1")),
      Input::image("ubuntu:22.04-slim")
    ]
  );
}

#[test]
fn auto_across_phases_with_empty_interior() {
  let mut composer = Composer::with_phases(vec![
    PhaseKey::new("build.p1").unwrap(),
    PhaseKey::new("build.p2").unwrap(),
    PhaseKey::new("build.p3").unwrap(),
  ]).unwrap();

  composer.add_stage("build.p1", "s1", StageOptions::new().source(Input::Scratch)).unwrap();
  composer.add_stage("build.p1", "s2", StageOptions::new()).unwrap();
  // build.p2 stays empty
  composer.add_stage("build.p3", "s3", StageOptions::new()).unwrap();

  let plan = composer.compose().unwrap();

  assert_eq!(
    sources(&plan),
    vec![
      Input::Scratch,
      Input::Stage(StageId::new("s1")),
      Input::Stage(StageId::new("s2"))
    ]
  );
}

#[test]
fn phase_reference_resolves_to_last_stage() {
  let mut composer = Composer::with_phases(vec![
    PhaseKey::new("build.p1").unwrap(),
    PhaseKey::new("build.p2").unwrap(),
    PhaseKey::new("build.p3").unwrap(),
  ]).unwrap();

  composer.add_stage("build.p1", "s1", StageOptions::new().source(Input::Scratch)).unwrap();
  composer.add_stage("build.p1", "s2", StageOptions::new()).unwrap();
  composer.add_stage("build.p2", "s3", StageOptions::new()).unwrap();

  composer.add_stage(
    "build.p3",
    "s4",
    StageOptions::new().source(Input::phase(PhaseKey::new("build.p1").unwrap()))
  ).unwrap();

  let plan = composer.compose().unwrap();
  let s4 = plan.get_stage(&StageId::new("s4")).unwrap();

  assert_eq!(s4.source(), &Input::Stage(StageId::new("s2")));
}

#[test]
fn duplicate_identifier_is_rejected_without_mutation() {
  let mut composer = Composer::new();

  composer.add_stage("build.system-deps", "stage1", StageOptions::new()).unwrap();

  let err = composer.add_stage("build.app-build", "stage1", StageOptions::new());
  assert!(matches!(err, Err(Error::DuplicateStageId { .. })));

  let original = composer.get_stage(&StageId::new("stage1")).unwrap();
  assert_eq!(original.phase().as_str(), "build.system-deps");
}

#[test]
fn operation_input_resolves_through_a_phase_reference() {
  let mut composer = Composer::new();

  composer.add_stage("build.build-complete", "create-venv", StageOptions::new().source(Input::image("python:3.11")))
    .unwrap()
    .add_operation(ExecOperation::new(ExecCommand::shell("python3 -m venv /venv")));

  composer.add_stage("export.export-base", "export-runtime", StageOptions::new().source(Input::image("python:3.11-slim")))
    .unwrap()
    .add_operation(CopyOperation::new(
      Input::phase(PhaseKey::new("build.build-complete").unwrap()),
      vec!["/venv"],
      "/venv"
    ));

  let plan = composer.compose().unwrap();

  assert_eq!(
    get_copy_from(&plan, "export-runtime"),
    &Input::Stage(StageId::new("create-venv"))
  );
}

#[test]
fn unresolved_phase_reference_in_operation_fails_naming_the_stage() {
  let mut composer = Composer::new();

  composer.add_stage("export.export-base", "e1", StageOptions::new().source(Input::image("alpine:3.18")))
    .unwrap()
    .add_operation(CopyOperation::new(
      Input::Phase(PhaseKey::new("build.nonexistent").unwrap()),
      vec!["/venv"],
      "/venv"
    ));

  let err = composer.compose();

  match err {
    Err(Error::Composition { stage, source }) => {
      assert_eq!(stage, StageId::new("e1"));
      assert!(matches!(*source, Error::PhaseNotFound { .. }));
    },
    other => panic!("expected a Composition(PhaseNotFound) error, got {:?}", other)
  }
}
