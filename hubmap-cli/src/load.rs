use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::Table;
use hubmap::{
    configuration::MappingConfiguration,
    memory::SnapshotWorkspace,
    rules::{
        hub_to_workspace,
        workspace_to_hub::{ElementTarget, ParameterTarget},
    },
    schema::Iteration,
    settings::MappingSettings,
    traits::HubConnector,
};

use crate::{inspect::open_hub, Direction};

fn element_name(iteration: &Iteration, target: &ElementTarget) -> String {
    match target {
        ElementTarget::Existing(iid) => iteration
            .element(*iid)
            .map_or_else(|| iid.to_string(), |e| e.name.clone()),
        ElementTarget::New { name } => format!("{name} (new)"),
    }
}

fn parameter_type_name(iteration: &Iteration, target: &ParameterTarget) -> String {
    let type_iid = match target {
        ParameterTarget::Existing(iid) => match iteration.parameter(*iid) {
            Some(parameter) => parameter.parameter_type,
            None => return iid.to_string(),
        },
        ParameterTarget::New { parameter_type, .. } => *parameter_type,
    };
    iteration
        .parameter_type(type_iid)
        .map_or_else(|| type_iid.to_string(), |t| t.name().to_string())
}

pub fn load(
    iteration: &Path,
    workspace: &Path,
    direction: Direction,
    settings: MappingSettings,
) -> Result<String> {
    let hub = open_hub(iteration)?;
    let workspace = SnapshotWorkspace::from_path(workspace)
        .with_context(|| format!("Failed to read workspace at {}", workspace.display()))?;
    let configuration = MappingConfiguration::open(&hub, settings)?;
    let iteration = hub.open_iteration().context("No open iteration")?;

    let mut table = Table::new();
    match direction {
        Direction::ToHub => {
            let Some(mappings) = configuration.load_to_hub(&hub, workspace.variables()) else {
                return Ok("No persisted mappings".to_string());
            };
            log::debug!("Reloaded {} workspace to hub mappings", mappings.len());

            table.set_header(vec![
                "Variable",
                "Value",
                "Element",
                "Parameter type",
                "Usages",
                "Time step",
            ]);
            for mapping in &mappings {
                let variable = &mapping.variable;
                table.add_row(vec![
                    variable.name.clone(),
                    variable.value.to_string(),
                    element_name(iteration, &mapping.element),
                    parameter_type_name(iteration, &mapping.parameter),
                    mapping.usages.len().to_string(),
                    variable.selected_time_step.to_string(),
                ]);
            }
        }
        Direction::ToWorkspace => {
            let Some(mappings) = configuration.load_to_dst(&hub, workspace.variables()) else {
                return Ok("No persisted mappings".to_string());
            };
            log::debug!("Reloaded {} hub to workspace mappings", mappings.len());

            table.set_header(vec![
                "Variable",
                "Current",
                "Hub value",
                "Parameter type",
                "Switch",
            ]);
            for preview in hub_to_workspace::transform(&mappings)? {
                let mapping = &preview.mapping;
                table.add_row(vec![
                    mapping.variable.name.clone(),
                    mapping.variable.value.to_string(),
                    preview.resolve()?.to_string(),
                    mapping.parameter_type.name().to_string(),
                    format!("{:?}", mapping.switch_kind),
                ]);
            }
        }
    }

    Ok(table.to_string())
}
