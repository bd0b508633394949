use std::path::Path;

use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use hubmap::{
    adapter::{
        batch::{series_to_record_batch, time_tagged_to_record_batch},
        sampled_function::{self, AxisSeries},
    },
    memory::SnapshotWorkspace,
    variable::{AxisAssignment, AxisRole, RowOrColumn},
};

#[derive(Debug)]
pub struct DecomposeArgs {
    pub variable: String,
    pub independent: Vec<usize>,
    pub dependent: Vec<usize>,
    pub orientation: RowOrColumn,
    pub time_axis: Option<usize>,
    pub time_step: f64,
    pub average: bool,
}

impl DecomposeArgs {
    fn assignments(&self) -> Vec<AxisAssignment> {
        let independent = self.independent.iter().map(|&i| {
            let assignment = AxisAssignment::independent(i);
            if self.time_axis == Some(i) {
                assignment.time_tagged()
            } else {
                assignment
            }
        });
        let dependent = self.dependent.iter().map(|&i| AxisAssignment::dependent(i));
        independent.chain(dependent).collect()
    }
}

pub fn decompose(workspace: &Path, args: DecomposeArgs) -> Result<String> {
    let workspace = SnapshotWorkspace::from_path(workspace)
        .with_context(|| format!("Failed to read workspace at {}", workspace.display()))?;
    let variable = workspace
        .variables()
        .iter()
        .find(|v| v.name == args.variable)
        .with_context(|| format!("No variable `{}` in the workspace", args.variable))?;
    let array = variable
        .value
        .as_array()
        .with_context(|| format!("`{}` is not an array", args.variable))?;

    let assignments = args.assignments();
    let series = sampled_function::decompose(array, args.orientation, &assignments)?;
    let batch = series_to_record_batch(&series)?;
    let mut output = format!("Axes:\n{}", pretty_format_batches(&[batch])?);

    if args.time_axis.is_some() {
        let mut variable = variable.clone();
        variable.orientation_to_hub = args.orientation;
        variable.assignments_to_hub = assignments;
        variable.is_averaged = args.average;
        variable.selected_time_step = args.time_step;
        variable.apply_time_step();

        let labels: Vec<String> = series
            .iter()
            .filter(|s| s.role == AxisRole::Dependent)
            .map(AxisSeries::label)
            .collect();
        let batch = time_tagged_to_record_batch(variable.time_tagged_values(), &labels)?;
        output.push_str(&format!(
            "\nTime-tagged values:\n{}",
            pretty_format_batches(&[batch])?
        ));
    }

    Ok(output)
}
