#![doc=include_str!( "../README.md")]
#![deny(unsafe_code)]
#![deny(clippy::all)]

use anyhow::Context;
use hubmap::{
    configuration::MappingConfiguration,
    memory::{InMemoryHub, SnapshotWorkspace},
    rules::{
        hub_to_workspace::{self, HubToWorkspaceMapping},
        workspace_to_hub::{self, ElementTarget, ParameterTarget, WorkspaceToHubMapping},
    },
    schema::{
        new_id, ActualFiniteState, ArrayParameterType, AxisTypeAssignment, DesignOption,
        DomainOfExpertise, ElementDefinition, ElementUsage, Id, Iteration, MeasurementScale,
        NumberSetKind, Parameter, ParameterSwitchKind, ParameterType,
        SampledFunctionParameterType, ScalarParameterType, ScalarTypeKind, Transaction,
    },
    settings::MappingSettings,
    traits::{HubConnector, WorkspaceConnector},
    value::{Array2, Scalar},
    variable::{AxisAssignment, WorkspaceVariable},
};
use std::path::{Path, PathBuf};

pub const MODEL_NAME: &str = "LOFT";

fn quantity(name: &str, short_name: &str, scale: Option<Id>) -> ScalarParameterType {
    ScalarParameterType {
        iid: new_id(),
        name: name.into(),
        short_name: short_name.into(),
        kind: ScalarTypeKind::Quantity {
            possible_scales: scale.into_iter().collect(),
            default_scale: scale,
        },
    }
}

fn axis(parameter_type: ScalarParameterType) -> AxisTypeAssignment {
    AxisTypeAssignment {
        parameter_type,
        measurement_scale: None,
    }
}

fn parameter(parameter_type: Id, scale: Option<Id>, owner: Id, values: &[&str]) -> Parameter {
    let mut parameter = Parameter::new(parameter_type, scale, owner);
    parameter.value_sets[0].set_values(
        ParameterSwitchKind::Computed,
        values.iter().map(|v| v.to_string()).collect(),
    );
    parameter
}

/// A satellite with one battery, the parameter types it needs and the identities of everything a
/// test may want to address.
#[derive(Clone, Debug)]
pub struct SampleModel {
    pub iteration: Iteration,
    pub domain: Id,
    /// Non-negative real scale in watt hours.
    pub watt_hour: Id,
    pub energy: Id,
    pub label: Id,
    /// 3x2 array of numbers.
    pub gain_matrix: Id,
    /// Sampled function of time, with power and temperature as dependent axes.
    pub power_profile: Id,
    pub battery: Id,
    pub capacity: Id,
    pub gains: Id,
    pub satellite: Id,
    pub battery_usage: Id,
    pub option: Id,
    pub state: Id,
}

impl Default for SampleModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleModel {
    pub fn new() -> Self {
        let domain = DomainOfExpertise {
            iid: new_id(),
            name: "Power".into(),
            short_name: "PWR".into(),
        };
        let watt_hour = MeasurementScale {
            iid: new_id(),
            name: "watt hour".into(),
            short_name: "Wh".into(),
            number_set: NumberSetKind::RealNumberSet,
            minimum_permissible_value: Some(0.0),
            is_minimum_inclusive: true,
            maximum_permissible_value: None,
            is_maximum_inclusive: false,
        };
        let energy = quantity("energy", "E", Some(watt_hour.iid));
        let label = ScalarParameterType {
            iid: new_id(),
            name: "label".into(),
            short_name: "lbl".into(),
            kind: ScalarTypeKind::Text,
        };
        let gain_matrix = ArrayParameterType {
            iid: new_id(),
            name: "gain matrix".into(),
            short_name: "K".into(),
            dimension: vec![3, 2],
            component: quantity("number", "n", None),
        };
        let power_profile = SampledFunctionParameterType {
            iid: new_id(),
            name: "power profile".into(),
            short_name: "P(t)".into(),
            independent_parameter_type: vec![axis(quantity("time", "t", None))],
            dependent_parameter_type: vec![
                axis(quantity("power", "P", None)),
                axis(quantity("temperature", "T", None)),
            ],
        };

        let mut battery = ElementDefinition::new("Battery", domain.iid);
        let capacity = parameter(energy.iid, Some(watt_hour.iid), domain.iid, &["10"]);
        let gains = parameter(
            gain_matrix.iid,
            None,
            domain.iid,
            &["1", "2", "3", "4", "5", "6"],
        );
        battery.parameters = vec![capacity.clone(), gains.clone()];

        let mut satellite = ElementDefinition::new("Satellite", domain.iid);
        let battery_usage = ElementUsage::new(&battery, domain.iid);
        satellite.contained_elements.push(battery_usage.clone());

        let option = DesignOption {
            iid: new_id(),
            name: "Nominal".into(),
            short_name: "nom".into(),
        };
        let state = ActualFiniteState {
            iid: new_id(),
            name: "Eclipse".into(),
            short_name: "ecl".into(),
        };

        Self {
            domain: domain.iid,
            watt_hour: watt_hour.iid,
            energy: energy.iid,
            label: label.iid,
            gain_matrix: gain_matrix.iid,
            power_profile: power_profile.iid,
            battery: battery.iid,
            capacity: capacity.iid,
            gains: gains.iid,
            satellite: satellite.iid,
            battery_usage: battery_usage.iid,
            option: option.iid,
            state: state.iid,
            iteration: Iteration {
                iid: new_id(),
                model_name: MODEL_NAME.into(),
                domains: vec![domain],
                element_definitions: vec![battery, satellite],
                parameter_types: vec![
                    ParameterType::Scalar(energy),
                    ParameterType::Scalar(label),
                    ParameterType::Array(gain_matrix),
                    ParameterType::SampledFunction(power_profile),
                ],
                scales: vec![watt_hour],
                options: vec![option],
                actual_finite_states: vec![state],
                ..Default::default()
            },
        }
    }

    /// A hub session on a copy of the model.
    pub fn hub(&self) -> InMemoryHub {
        InMemoryHub::new(self.iteration.clone())
    }

    /// Workspace to hub mappings of [`sample_variables`]: `capacity` and `gains` into the battery's
    /// parameters, `profile` into a new power profile parameter of the battery.
    pub fn to_hub_mappings(&self, variables: &[WorkspaceVariable]) -> Vec<WorkspaceToHubMapping> {
        variables
            .iter()
            .filter_map(|variable| {
                let parameter = match variable.name.as_str() {
                    "capacity" => ParameterTarget::Existing(self.capacity),
                    "gains" => ParameterTarget::Existing(self.gains),
                    "profile" => ParameterTarget::New {
                        parameter_type: self.power_profile,
                        scale: None,
                    },
                    _ => return None,
                };
                Some(WorkspaceToHubMapping::new(
                    variable.clone(),
                    ElementTarget::Existing(self.battery),
                    parameter,
                ))
            })
            .collect()
    }

    /// Hub to workspace mappings of the battery's `capacity` and `gains` parameters.
    pub fn to_workspace_mappings(
        &self,
        variables: &[WorkspaceVariable],
    ) -> Vec<HubToWorkspaceMapping> {
        let sources = [("capacity", self.capacity), ("gains", self.gains)];
        sources
            .into_iter()
            .filter_map(|(name, iid)| {
                let variable = variables.iter().find(|v| v.name == name)?;
                let parameter = self.iteration.parameter(iid)?;
                let parameter_type = self.iteration.parameter_type(parameter.parameter_type)?;
                Some(HubToWorkspaceMapping::new(
                    variable.clone(),
                    parameter_type.clone(),
                    parameter.value_sets[0].clone(),
                    parameter.iid,
                ))
            })
            .collect()
    }

    /// A hub session in which [`sample_variables`] have been mapped both ways and the
    /// correspondence map persisted.
    pub fn mapped_hub(&self) -> anyhow::Result<InMemoryHub> {
        let variables = sample_variables();
        let mut hub = self.hub();
        let mut configuration = MappingConfiguration::open(&hub, MappingSettings::default())?;

        let iteration = hub.open_iteration().context("No open iteration")?;
        let output = workspace_to_hub::transform(
            &self.to_hub_mappings(&variables),
            iteration,
            self.domain,
            configuration.store_mut(),
        )?;
        let mut transaction = Transaction::new();
        configuration.stage(&hub, Some(&output), &mut transaction)?;
        hub.write(transaction)?;
        configuration.refresh(&hub)?;

        let mut workspace = SnapshotWorkspace::new(variables.clone());
        workspace.connect()?;
        let previews = hub_to_workspace::transform(&self.to_workspace_mappings(&variables))?;
        hub_to_workspace::apply_to_workspace(
            &previews,
            &mut workspace,
            configuration.store_mut(),
        )?;
        let mut transaction = Transaction::new();
        configuration.stage(&hub, None, &mut transaction)?;
        hub.write(transaction)?;
        configuration.refresh(&hub)?;

        Ok(hub)
    }
}

/// Time, power and temperature samples, one per row.
pub const PROFILE: [[f64; 3]; 5] = [
    [0.0, 10.0, 20.0],
    [1.0, 20.0, 21.0],
    [2.0, 30.0, 22.0],
    [3.0, 40.0, 23.0],
    [4.0, 50.0, 24.0],
];

/// The workspace matching [`SampleModel`]: a scalar `capacity`, a 3x2 `gains` array, a 5x3
/// `profile` array with time in its first column and a text `mode`.
pub fn sample_variables() -> Vec<WorkspaceVariable> {
    let capacity = WorkspaceVariable::new("capacity", Scalar::Number(12.5));
    let gains = WorkspaceVariable::new(
        "gains",
        Array2::from_fn(3, 2, |r, c| Scalar::Number((r * 2 + c) as f64 * 0.5)),
    );

    let mut profile = WorkspaceVariable::new(
        "profile",
        Array2::from_fn(PROFILE.len(), 3, |r, c| Scalar::Number(PROFILE[r][c])),
    );
    let assignments = vec![
        AxisAssignment::independent(0).time_tagged(),
        AxisAssignment::dependent(1),
        AxisAssignment::dependent(2),
    ];
    profile.assignments_to_hub = assignments.clone();
    profile.assignments_to_dst = assignments;

    let mode = WorkspaceVariable::new("mode", Scalar::Text("nominal".into()));

    vec![capacity, gains, profile, mode]
}

/// Paths of the snapshot files written by [`write_fixture_files`].
#[derive(Clone, Debug)]
pub struct FixtureFiles {
    pub iteration: PathBuf,
    pub workspace: PathBuf,
}

/// Write the mapped iteration of a fresh [`SampleModel`] and the sample workspace into `dir`.
pub fn write_fixture_files(dir: &Path) -> anyhow::Result<FixtureFiles> {
    let hub = SampleModel::new().mapped_hub()?;
    let iteration = hub.into_iteration().context("No open iteration")?;

    let files = FixtureFiles {
        iteration: dir.join("iteration.json"),
        workspace: dir.join("workspace.json"),
    };
    std::fs::write(&files.iteration, serde_json::to_string_pretty(&iteration)?)
        .context(format!("Writing {:?}", files.iteration))?;
    std::fs::write(
        &files.workspace,
        serde_json::to_string_pretty(&sample_variables())?,
    )
    .context(format!("Writing {:?}", files.workspace))?;
    Ok(files)
}

#[test]
fn test_sample_model() {
    let model = SampleModel::new();
    assert!(model.iteration.element(model.battery).is_some());
    assert!(model.iteration.parameter(model.gains).is_some());
    assert_eq!(model.to_hub_mappings(&sample_variables()).len(), 3);
    assert_eq!(model.to_workspace_mappings(&sample_variables()).len(), 2);
}
