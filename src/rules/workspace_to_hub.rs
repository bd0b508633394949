//! Workspace variables written into hub elements, parameters and overrides.

use std::collections::{HashMap, HashSet};

use hubmap_schema::{
    ElementDefinition, ElementUsage, Id, Iteration, MeasurementScale, Parameter,
    ParameterOverride, ParameterSwitchKind, ParameterType, Thing, Transaction,
};

use crate::{
    adapter::{array, sampled_function},
    correspondence::{CorrespondenceStore, ExternalIdentifier},
    value::VariableValue,
    variable::WorkspaceVariable,
    Error, MappingDirection,
};

/// The element a variable is written into.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementTarget {
    Existing(Id),
    /// The element of that name, created when the iteration has none.
    New { name: String },
}

/// The parameter a variable is written into.
#[derive(Clone, Debug, PartialEq)]
pub enum ParameterTarget {
    Existing(Id),
    /// The parameter of that type on the target element, created when it has none.
    New {
        parameter_type: Id,
        scale: Option<Id>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorkspaceToHubMapping {
    pub variable: WorkspaceVariable,
    pub element: ElementTarget,
    pub parameter: ParameterTarget,
    /// Usages whose overrides receive the value instead of the parameter itself.
    pub usages: Vec<Id>,
    pub option: Option<Id>,
    pub state: Option<Id>,
    pub switch_kind: ParameterSwitchKind,
}

impl WorkspaceToHubMapping {
    pub fn new(
        variable: WorkspaceVariable,
        element: ElementTarget,
        parameter: ParameterTarget,
    ) -> Self {
        Self {
            variable,
            element,
            parameter,
            usages: Vec::new(),
            option: None,
            state: None,
            switch_kind: ParameterSwitchKind::default(),
        }
    }
}

/// The hub things touched by one [`transform`].
#[derive(Clone, Debug, Default)]
pub struct WorkspaceToHubOutput {
    pub elements: Vec<ElementDefinition>,
    pub usages: Vec<ElementUsage>,
    /// The variable written into each parameter, by parameter identity.
    pub parameter_variables: HashMap<Id, WorkspaceVariable>,
    created: HashSet<Id>,
}

impl WorkspaceToHubOutput {
    /// Whether the element was created by the transform, as opposed to taken from the iteration.
    pub fn is_created(&self, iid: Id) -> bool {
        self.created.contains(&iid)
    }

    /// Stage created elements for creation, the other elements and the usages for update.
    pub fn stage(&self, transaction: &mut Transaction) {
        for element in &self.elements {
            let thing = Thing::ElementDefinition(element.clone());
            if self.is_created(element.iid) {
                transaction.create(thing, None);
            } else {
                transaction.update(thing);
            }
        }
        for usage in &self.usages {
            transaction.update(Thing::ElementUsage(usage.clone()));
        }
    }

    fn element_mut(
        &mut self,
        target: &ElementTarget,
        iteration: &Iteration,
        owner: Id,
    ) -> Result<&mut ElementDefinition, Error> {
        let index = match target {
            ElementTarget::Existing(iid) => self.elements.iter().position(|e| e.iid == *iid),
            ElementTarget::New { name } => self.elements.iter().position(|e| e.name == *name),
        };
        if let Some(index) = index {
            return Ok(&mut self.elements[index]);
        }

        let element = match target {
            ElementTarget::Existing(iid) => iteration
                .element(*iid)
                .cloned()
                .ok_or(Error::UnknownThing(*iid))?,
            ElementTarget::New { name } => match iteration.element_by_name(name) {
                Some(element) => element.clone(),
                None => {
                    let element = ElementDefinition::new(name, owner);
                    log::debug!("Creating element `{name}`");
                    self.created.insert(element.iid);
                    element
                }
            },
        };
        self.elements.push(element);
        let last = self.elements.len() - 1;
        Ok(&mut self.elements[last])
    }

    fn usage_mut(&mut self, iid: Id, iteration: &Iteration) -> Result<&mut ElementUsage, Error> {
        if let Some(index) = self.usages.iter().position(|u| u.iid == iid) {
            return Ok(&mut self.usages[index]);
        }
        match iteration.find_thing(iid) {
            Some(Thing::ElementUsage(usage)) => {
                self.usages.push(usage);
                let last = self.usages.len() - 1;
                Ok(&mut self.usages[last])
            }
            _ => Err(Error::UnknownThing(iid)),
        }
    }

    /// The current copy of a parameter, preferring the one already touched by this transform.
    fn parameter(&self, iid: Id, iteration: &Iteration) -> Option<Parameter> {
        self.elements
            .iter()
            .find_map(|e| e.parameter(iid))
            .or_else(|| iteration.parameter(iid))
            .cloned()
    }
}

/// Write every mapped variable into the hub model, as copies of the affected elements and usages.
///
/// Elements targeted by name are resolved or created once per name; parameters targeted by type
/// are resolved by type identity on their element. The first failing variable aborts the batch:
/// no correspondence is recorded and the error names the variable.
pub fn transform(
    mappings: &[WorkspaceToHubMapping],
    iteration: &Iteration,
    owner: Id,
    store: &mut CorrespondenceStore,
) -> Result<WorkspaceToHubOutput, Error> {
    let mut output = WorkspaceToHubOutput::default();
    let mut correspondences = Vec::new();

    for mapping in mappings {
        match bake(mapping, iteration, owner, &mut output) {
            Ok(links) => correspondences.extend(links),
            Err(e) => {
                log::error!("Mapping `{}` to the hub failed: {e}", mapping.variable.name);
                return Err(Error::Variable {
                    name: mapping.variable.name.clone(),
                    source: Box::new(e),
                });
            }
        }
    }

    log::debug!(
        "Mapped {} variables into {} elements and {} usages",
        mappings.len(),
        output.elements.len(),
        output.usages.len()
    );
    store.add_many(correspondences);
    Ok(output)
}

fn bake(
    mapping: &WorkspaceToHubMapping,
    iteration: &Iteration,
    owner: Id,
    output: &mut WorkspaceToHubOutput,
) -> Result<Vec<(Id, ExternalIdentifier)>, Error> {
    let variable = &mapping.variable;
    let existing = match mapping.parameter {
        ParameterTarget::Existing(iid) => {
            Some(output.parameter(iid, iteration).ok_or(Error::UnknownThing(iid))?)
        }
        ParameterTarget::New { .. } => None,
    };
    let (type_iid, scale) = match (&existing, &mapping.parameter) {
        (Some(parameter), _) => (parameter.parameter_type, parameter.scale),
        (None, ParameterTarget::New { parameter_type, scale }) => (*parameter_type, *scale),
        (None, ParameterTarget::Existing(iid)) => return Err(Error::UnknownThing(*iid)),
    };
    let parameter_type = iteration
        .parameter_type(type_iid)
        .ok_or(Error::UnknownThing(type_iid))?;
    let values = value_array(variable, parameter_type, scale.and_then(|s| iteration.scale(s)))?;

    let payload = ExternalIdentifier::to_hub(variable, mapping.switch_kind);
    let mut links = Vec::new();

    if !mapping.usages.is_empty() {
        let parameter = existing.ok_or_else(|| {
            Error::invalid_mapping(&variable.name, "overrides need an existing parameter")
        })?;
        for &usage_iid in &mapping.usages {
            let usage = output.usage_mut(usage_iid, iteration)?;
            let parameter_override = match usage.override_for_mut(parameter.iid) {
                Some(parameter_override) => parameter_override,
                None => {
                    log::debug!("Overriding {} in usage `{}`", parameter.iid, usage.name);
                    usage
                        .parameter_overrides
                        .push(ParameterOverride::new(&parameter, owner));
                    let last = usage.parameter_overrides.len() - 1;
                    &mut usage.parameter_overrides[last]
                }
            };
            parameter_override
                .value_set_mut(mapping.option, mapping.state)
                .set_values(mapping.switch_kind, values.clone());
            links.push((usage_iid, payload.clone()));
        }
        output
            .parameter_variables
            .insert(parameter.iid, variable.clone());
        links.push((parameter.iid, payload.clone()));
    } else {
        let element = output.element_mut(&mapping.element, iteration, owner)?;
        let element_iid = element.iid;
        let parameter = match &mapping.parameter {
            ParameterTarget::Existing(iid) => element
                .parameter_mut(*iid)
                .ok_or_else(|| {
                    Error::invalid_mapping(
                        &variable.name,
                        format!("parameter {iid} does not belong to element `{}`", element_iid),
                    )
                })?,
            ParameterTarget::New {
                parameter_type,
                scale,
            } => {
                if element.parameter_by_type_mut(*parameter_type).is_none() {
                    element
                        .parameters
                        .push(Parameter::new(*parameter_type, *scale, owner));
                }
                element
                    .parameter_by_type_mut(*parameter_type)
                    .ok_or(Error::UnknownThing(*parameter_type))?
            }
        };
        parameter.is_option_dependent |= mapping.option.is_some();
        parameter
            .value_set_mut(mapping.option, mapping.state)
            .set_values(mapping.switch_kind, values);
        let parameter_iid = parameter.iid;

        output
            .parameter_variables
            .insert(parameter_iid, variable.clone());
        links.push((element_iid, payload.clone()));
        links.push((parameter_iid, payload));
    }

    for link in [mapping.option, mapping.state].into_iter().flatten() {
        links.push((
            link,
            ExternalIdentifier::link(MappingDirection::WorkspaceToHub, &variable.identifier),
        ));
    }
    Ok(links)
}

/// The invariant-formatted value array of `variable` for `parameter_type`, refusing values the
/// type does not accept.
fn value_array(
    variable: &WorkspaceVariable,
    parameter_type: &ParameterType,
    scale: Option<&MeasurementScale>,
) -> Result<Vec<String>, Error> {
    let refused = || {
        Error::invalid_mapping(
            &variable.name,
            format!("`{}` is not a valid {}", variable.value, parameter_type.name()),
        )
    };

    match (parameter_type, &variable.value) {
        (ParameterType::Scalar(ty), VariableValue::Scalar(value)) => {
            let value = value.to_string();
            if ty.accepts(&value, scale) {
                Ok(vec![value])
            } else {
                Err(refused())
            }
        }
        (ParameterType::Array(ty), VariableValue::Array(cells)) => {
            if array::validate(ty, &variable.value, scale) {
                Ok(array::to_value_array(cells))
            } else {
                Err(refused())
            }
        }
        (ParameterType::SampledFunction(ty), VariableValue::Array(_)) => {
            if sampled_function::validate(
                ty,
                &variable.value,
                variable.orientation_to_hub,
                &variable.assignments_to_hub,
            ) {
                sampled_function::to_value_array(variable)
            } else {
                Err(refused())
            }
        }
        _ => Err(refused()),
    }
}
