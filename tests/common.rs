// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use buildplan_composer::*;

/// Collects the resolved `Input::Stage`/concrete sources of every stage in
/// a plan, in plan order -- the shape most scenario assertions care about.
pub fn sources(plan: &Plan) -> Vec<Input> {
  plan.stages.iter().map(|s| s.source().clone()).collect()
}

pub fn stage_ids(plan: &Plan) -> Vec<String> {
  plan.stages.iter().map(|s| s.id().as_str().to_string()).collect()
}

pub fn get_copy_from<'a>(plan: &'a Plan, stage_id: &str) -> &'a Input {
  let stage = plan.get_stage(&StageId::new(stage_id)).expect("stage present in plan");

  stage.operations().iter()
    .find_map(|op| op.as_copy())
    .map(|copy| &copy.from)
    .expect("stage has a copy operation")
}
