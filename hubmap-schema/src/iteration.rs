//! The iteration container and the reference data it holds.

use crate::{
    ClassKind, ElementDefinition, ElementUsage, Error, Id, MeasurementScale, Operation, Parameter,
    ParameterOverride, ParameterType, Thing, ValueSet,
};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DomainOfExpertise {
    pub iid: Id,
    pub name: String,
    pub short_name: String,
}

/// A design option the values of option-dependent parameters vary over.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DesignOption {
    pub iid: Id,
    pub name: String,
    pub short_name: String,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActualFiniteState {
    pub iid: Id,
    pub name: String,
    pub short_name: String,
}

/// One persisted link between a hub identity and an external identifier payload.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdCorrespondence {
    pub iid: Option<Id>,
    pub internal_thing: Id,
    /// Serialized payload owned by the external tool.
    pub external_id: String,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExternalIdentifierMap {
    pub iid: Option<Id>,
    pub name: String,
    pub external_tool_name: String,
    pub external_model_name: String,
    pub owner: Id,
    #[cfg_attr(feature = "serde", serde(default))]
    pub correspondence: Vec<IdCorrespondence>,
}

impl ExternalIdentifierMap {
    pub fn new(name: &str, external_tool_name: &str, external_model_name: &str, owner: Id) -> Self {
        Self {
            iid: None,
            name: name.to_string(),
            external_tool_name: external_tool_name.to_string(),
            external_model_name: external_model_name.to_string(),
            owner,
            correspondence: Vec::new(),
        }
    }
}

/// The parameter or override holding a value set, together with the parameter it derives from.
#[derive(Debug, Clone, Copy)]
pub struct ValueSetOwner<'a> {
    /// Identity of the parameter or override that contains the value set.
    pub owner: Id,
    pub parameter: &'a Parameter,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Iteration {
    pub iid: Id,
    pub model_name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub domains: Vec<DomainOfExpertise>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub element_definitions: Vec<ElementDefinition>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub parameter_types: Vec<ParameterType>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub scales: Vec<MeasurementScale>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub options: Vec<DesignOption>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub actual_finite_states: Vec<ActualFiniteState>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub external_identifier_maps: Vec<ExternalIdentifierMap>,
}

fn upsert<T>(things: &mut Vec<T>, thing: T, same: impl Fn(&T) -> bool) {
    match things.iter_mut().find(|t| same(t)) {
        Some(existing) => *existing = thing,
        None => things.push(thing),
    }
}

impl Iteration {
    pub fn parameter_type(&self, iid: Id) -> Option<&ParameterType> {
        self.parameter_types.iter().find(|t| t.iid() == iid)
    }

    pub fn scale(&self, iid: Id) -> Option<&MeasurementScale> {
        self.scales.iter().find(|s| s.iid == iid)
    }

    pub fn element(&self, iid: Id) -> Option<&ElementDefinition> {
        self.element_definitions.iter().find(|e| e.iid == iid)
    }

    pub fn element_by_name(&self, name: &str) -> Option<&ElementDefinition> {
        self.element_definitions.iter().find(|e| e.name == name)
    }

    fn usages(&self) -> impl Iterator<Item = &ElementUsage> {
        self.element_definitions
            .iter()
            .flat_map(|e| e.contained_elements.iter())
    }

    fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.element_definitions
            .iter()
            .flat_map(|e| e.parameters.iter())
    }

    fn overrides(&self) -> impl Iterator<Item = &ParameterOverride> {
        self.usages().flat_map(|u| u.parameter_overrides.iter())
    }

    pub fn parameter(&self, iid: Id) -> Option<&Parameter> {
        self.parameters().find(|p| p.iid == iid)
    }

    pub fn element_containing_parameter(&self, parameter: Id) -> Option<&ElementDefinition> {
        self.element_definitions
            .iter()
            .find(|e| e.parameters.iter().any(|p| p.iid == parameter))
    }

    /// Resolve the parameter or override holding the value set `iid`.
    pub fn value_set_owner(&self, iid: Id) -> Option<ValueSetOwner<'_>> {
        let holds = |value_sets: &[ValueSet]| value_sets.iter().any(|vs| vs.iid == iid);

        if let Some(parameter) = self.parameters().find(|p| holds(&p.value_sets)) {
            return Some(ValueSetOwner {
                owner: parameter.iid,
                parameter,
            });
        }

        self.overrides()
            .find(|o| holds(&o.value_sets))
            .and_then(|o| {
                self.parameter(o.parameter).map(|parameter| ValueSetOwner {
                    owner: o.iid,
                    parameter,
                })
            })
    }

    pub fn external_identifier_map(
        &self,
        name: &str,
        external_tool_name: &str,
    ) -> Option<&ExternalIdentifierMap> {
        self.external_identifier_maps
            .iter()
            .find(|m| m.name == name && m.external_tool_name == external_tool_name)
    }

    /// Find a thing by identity and return an owned copy of it.
    pub fn find_thing(&self, iid: Id) -> Option<Thing> {
        if let Some(e) = self.element(iid) {
            return Some(Thing::ElementDefinition(e.clone()));
        }
        if let Some(u) = self.usages().find(|u| u.iid == iid) {
            return Some(Thing::ElementUsage(u.clone()));
        }
        if let Some(p) = self.parameter(iid) {
            return Some(Thing::Parameter(p.clone()));
        }
        if let Some(o) = self.overrides().find(|o| o.iid == iid) {
            return Some(Thing::ParameterOverride(o.clone()));
        }
        if let Some(vs) = self
            .parameters()
            .flat_map(|p| p.value_sets.iter())
            .chain(self.overrides().flat_map(|o| o.value_sets.iter()))
            .find(|vs| vs.iid == iid)
        {
            return Some(Thing::ValueSet(vs.clone()));
        }
        if let Some(o) = self.options.iter().find(|o| o.iid == iid) {
            return Some(Thing::Option(o.clone()));
        }
        if let Some(s) = self.actual_finite_states.iter().find(|s| s.iid == iid) {
            return Some(Thing::ActualFiniteState(s.clone()));
        }
        if let Some(t) = self.parameter_type(iid) {
            return Some(Thing::ParameterType(t.clone()));
        }
        if let Some(s) = self.scale(iid) {
            return Some(Thing::MeasurementScale(s.clone()));
        }
        if let Some(m) = self
            .external_identifier_maps
            .iter()
            .find(|m| m.iid == Some(iid))
        {
            return Some(Thing::ExternalIdentifierMap(m.clone()));
        }
        self.external_identifier_maps
            .iter()
            .flat_map(|m| m.correspondence.iter())
            .find(|c| c.iid == Some(iid))
            .map(|c| Thing::IdCorrespondence(c.clone()))
    }

    /// Apply one transaction operation. Creates and updates are both upserts; creates of
    /// contained things name their container, updates locate the existing thing.
    pub fn apply(&mut self, operation: &Operation) -> Result<(), Error> {
        let (thing, container) = match operation {
            Operation::Create { thing, container } => (thing, *container),
            Operation::Update { thing } => (thing, None),
        };

        match thing {
            Thing::ElementDefinition(e) => {
                upsert(&mut self.element_definitions, e.clone(), |x| x.iid == e.iid);
            }
            Thing::ElementUsage(u) => {
                let container = container
                    .or_else(|| {
                        self.element_definitions
                            .iter()
                            .find(|e| e.contained_elements.iter().any(|x| x.iid == u.iid))
                            .map(|e| e.iid)
                    })
                    .ok_or(Error::MissingContainer(ClassKind::ElementUsage))?;
                let element = self
                    .element_definitions
                    .iter_mut()
                    .find(|e| e.iid == container)
                    .ok_or(Error::ContainerNotFound {
                        class_kind: ClassKind::ElementUsage,
                        container,
                    })?;
                upsert(&mut element.contained_elements, u.clone(), |x| x.iid == u.iid);
            }
            Thing::Parameter(p) => {
                let container = container
                    .or_else(|| self.element_containing_parameter(p.iid).map(|e| e.iid))
                    .ok_or(Error::MissingContainer(ClassKind::Parameter))?;
                let element = self
                    .element_definitions
                    .iter_mut()
                    .find(|e| e.iid == container)
                    .ok_or(Error::ContainerNotFound {
                        class_kind: ClassKind::Parameter,
                        container,
                    })?;
                upsert(&mut element.parameters, p.clone(), |x| x.iid == p.iid);
            }
            Thing::ParameterOverride(o) => {
                let container = container
                    .or_else(|| {
                        self.usages()
                            .find(|u| u.parameter_overrides.iter().any(|x| x.iid == o.iid))
                            .map(|u| u.iid)
                    })
                    .ok_or(Error::MissingContainer(ClassKind::ParameterOverride))?;
                let usage = self
                    .element_definitions
                    .iter_mut()
                    .flat_map(|e| e.contained_elements.iter_mut())
                    .find(|u| u.iid == container)
                    .ok_or(Error::ContainerNotFound {
                        class_kind: ClassKind::ParameterOverride,
                        container,
                    })?;
                upsert(&mut usage.parameter_overrides, o.clone(), |x| x.iid == o.iid);
            }
            Thing::ValueSet(vs) => {
                let holder = self
                    .element_definitions
                    .iter_mut()
                    .flat_map(|e| {
                        let (parameters, usages) = (&mut e.parameters, &mut e.contained_elements);
                        parameters
                            .iter_mut()
                            .map(|p| (p.iid, &mut p.value_sets))
                            .chain(
                                usages
                                    .iter_mut()
                                    .flat_map(|u| u.parameter_overrides.iter_mut())
                                    .map(|o| (o.iid, &mut o.value_sets)),
                            )
                    })
                    .find(|(iid, value_sets)| {
                        Some(*iid) == container || value_sets.iter().any(|x| x.iid == vs.iid)
                    })
                    .map(|(_, value_sets)| value_sets)
                    .ok_or(Error::ThingNotFound(vs.iid))?;
                upsert(holder, vs.clone(), |x| x.iid == vs.iid);
            }
            Thing::Option(o) => upsert(&mut self.options, o.clone(), |x| x.iid == o.iid),
            Thing::ActualFiniteState(s) => {
                upsert(&mut self.actual_finite_states, s.clone(), |x| x.iid == s.iid)
            }
            Thing::ParameterType(t) => {
                upsert(&mut self.parameter_types, t.clone(), |x| x.iid() == t.iid())
            }
            Thing::MeasurementScale(s) => upsert(&mut self.scales, s.clone(), |x| x.iid == s.iid),
            Thing::ExternalIdentifierMap(m) => {
                let iid = m
                    .iid
                    .ok_or(Error::MissingIdentity(ClassKind::ExternalIdentifierMap))?;
                upsert(&mut self.external_identifier_maps, m.clone(), |x| {
                    x.iid == Some(iid)
                });
            }
            Thing::IdCorrespondence(c) => {
                let iid = c
                    .iid
                    .ok_or(Error::MissingIdentity(ClassKind::IdCorrespondence))?;
                let map = self
                    .external_identifier_maps
                    .iter_mut()
                    .find(|m| match container {
                        Some(container) => m.iid == Some(container),
                        None => m.correspondence.iter().any(|x| x.iid == Some(iid)),
                    })
                    .ok_or(Error::MissingContainer(ClassKind::IdCorrespondence))?;
                upsert(&mut map.correspondence, c.clone(), |x| x.iid == Some(iid));
            }
        }

        Ok(())
    }
}
