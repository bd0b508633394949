//! Hub values previewed and applied as workspace values.

use std::cell::OnceCell;

use hubmap_schema::{
    ArrayParameterType, Id, ParameterSwitchKind, ParameterType, SampledFunctionParameterType,
    ValueSet, DEFAULT_VALUE,
};

use crate::{
    adapter::{array, sampled_function},
    correspondence::{CorrespondenceStore, ExternalIdentifier},
    traits::WorkspaceConnector,
    value::{Array2, Scalar, VariableValue},
    variable::WorkspaceVariable,
    Error, MappingDirection,
};

/// A hub value set selected for transfer into a workspace variable.
#[derive(Clone, Debug, PartialEq)]
pub struct HubToWorkspaceMapping {
    pub variable: WorkspaceVariable,
    pub parameter_type: ParameterType,
    pub value_set: ValueSet,
    /// The parameter or override holding the value set.
    pub owner: Id,
    pub option: Option<Id>,
    pub state: Option<Id>,
    /// Position of the transferred value for scalar parameters, the first value when `None`.
    pub value_index: Option<usize>,
    pub switch_kind: ParameterSwitchKind,
}

impl HubToWorkspaceMapping {
    pub fn new(
        variable: WorkspaceVariable,
        parameter_type: ParameterType,
        value_set: ValueSet,
        owner: Id,
    ) -> Self {
        let switch_kind = value_set.value_switch;
        Self {
            variable,
            parameter_type,
            value_set,
            owner,
            option: None,
            state: None,
            value_index: None,
            switch_kind,
        }
    }
}

#[derive(Clone, Debug)]
enum Layout {
    Array(ArrayParameterType),
    SampledFunction(SampledFunctionParameterType),
}

/// A numeric array laid out from hub values on first access.
#[derive(Clone, Debug)]
pub struct DeferredArray {
    layout: Layout,
    values: Vec<String>,
    variable: WorkspaceVariable,
    cell: OnceCell<Array2<f64>>,
}

impl DeferredArray {
    /// The laid out array. Values that do not parse as numbers make it zero-filled.
    pub fn get(&self) -> Result<&Array2<f64>, Error> {
        if let Some(array) = self.cell.get() {
            return Ok(array);
        }
        let cells = match &self.layout {
            Layout::Array(ty) => array::linearize_values(ty, &self.values)?,
            Layout::SampledFunction(ty) => sampled_function::reshape(
                ty,
                &self.values,
                self.variable.orientation_to_dst,
                &self.variable.assignments_to_dst,
            )?,
        };
        Ok(self.cell.get_or_init(|| array::parse_or_zero(&cells)))
    }
}

#[derive(Clone, Debug)]
pub enum PreviewValue {
    Scalar(String),
    Deferred(DeferredArray),
}

/// The result of transforming one [`HubToWorkspaceMapping`].
#[derive(Clone, Debug)]
pub struct HubToWorkspacePreview {
    pub mapping: HubToWorkspaceMapping,
    pub value: PreviewValue,
}

impl HubToWorkspacePreview {
    /// The workspace value this preview would write.
    pub fn resolve(&self) -> Result<VariableValue, Error> {
        match &self.value {
            PreviewValue::Scalar(value) => Ok(VariableValue::Scalar(Scalar::parse(value))),
            PreviewValue::Deferred(deferred) => Ok(VariableValue::Array(
                deferred.get()?.map(|&v| Scalar::Number(v)),
            )),
        }
    }
}

/// Build one preview per mapping. Every preview owns its own copy of the workspace variable.
pub fn transform(
    mappings: &[HubToWorkspaceMapping],
) -> Result<Vec<HubToWorkspacePreview>, Error> {
    mappings
        .iter()
        .map(|mapping| {
            let mapping = mapping.clone();
            let values = mapping.value_set.values(mapping.switch_kind).to_vec();
            let deferred = |layout| {
                PreviewValue::Deferred(DeferredArray {
                    layout,
                    values: values.clone(),
                    variable: mapping.variable.clone(),
                    cell: OnceCell::new(),
                })
            };

            let value = match &mapping.parameter_type {
                ParameterType::Array(ty) => deferred(Layout::Array(ty.clone())),
                ParameterType::SampledFunction(ty) => {
                    deferred(Layout::SampledFunction(ty.clone()))
                }
                ParameterType::Scalar(_) => PreviewValue::Scalar(
                    values
                        .get(mapping.value_index.unwrap_or(0))
                        .cloned()
                        .unwrap_or_else(|| DEFAULT_VALUE.to_string()),
                ),
            };

            Ok(HubToWorkspacePreview { mapping, value })
        })
        .collect()
}

/// Write the previews into the workspace and record a correspondence for each one written.
///
/// Every preview is resolved before the first write, so a value set of the wrong shape leaves the
/// workspace untouched. A value the variable cannot hold is skipped. Returns the number of
/// variables written.
pub fn apply_to_workspace(
    previews: &[HubToWorkspacePreview],
    workspace: &mut impl WorkspaceConnector,
    store: &mut CorrespondenceStore,
) -> Result<usize, Error> {
    let values = previews
        .iter()
        .map(|preview| {
            preview.resolve().map_err(|e| Error::Variable {
                name: preview.mapping.variable.name.clone(),
                source: Box::new(e),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut written = 0;
    for (preview, value) in previews.iter().zip(values) {
        let mapping = &preview.mapping;
        let mut variable = mapping.variable.clone();
        if !variable.set_value(value) {
            log::warn!(
                "`{}` cannot hold the value of {}, skipped",
                variable.name,
                mapping.parameter_type.name()
            );
            continue;
        }
        workspace.put_variable(&variable)?;

        store.add(
            mapping.value_set.iid,
            ExternalIdentifier::to_dst(&variable, mapping.value_index, mapping.switch_kind),
        );
        for link in [mapping.option, mapping.state].into_iter().flatten() {
            store.add(
                link,
                ExternalIdentifier::link(MappingDirection::HubToWorkspace, &variable.identifier),
            );
        }
        written += 1;
    }
    Ok(written)
}
