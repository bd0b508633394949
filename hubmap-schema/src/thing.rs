//! The closed set of things that can be referenced by identity.

use std::fmt::Display;

use crate::{
    ActualFiniteState, DesignOption, ElementDefinition, ElementUsage, ExternalIdentifierMap,
    IdCorrespondence, Id, MeasurementScale, Parameter, ParameterOverride, ParameterType, ValueSet,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClassKind {
    ElementDefinition,
    ElementUsage,
    Parameter,
    ParameterOverride,
    ValueSet,
    Option,
    ActualFiniteState,
    ParameterType,
    MeasurementScale,
    ExternalIdentifierMap,
    IdCorrespondence,
}

impl Display for ClassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// An owned copy of a thing fetched from the hub, or about to be written to it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Thing {
    ElementDefinition(ElementDefinition),
    ElementUsage(ElementUsage),
    Parameter(Parameter),
    ParameterOverride(ParameterOverride),
    ValueSet(ValueSet),
    Option(DesignOption),
    ActualFiniteState(ActualFiniteState),
    ParameterType(ParameterType),
    MeasurementScale(MeasurementScale),
    ExternalIdentifierMap(ExternalIdentifierMap),
    IdCorrespondence(IdCorrespondence),
}

impl Thing {
    /// The identity of the thing, `None` for maps and correspondences not persisted yet.
    pub fn iid(&self) -> Option<Id> {
        match self {
            Thing::ElementDefinition(t) => Some(t.iid),
            Thing::ElementUsage(t) => Some(t.iid),
            Thing::Parameter(t) => Some(t.iid),
            Thing::ParameterOverride(t) => Some(t.iid),
            Thing::ValueSet(t) => Some(t.iid),
            Thing::Option(t) => Some(t.iid),
            Thing::ActualFiniteState(t) => Some(t.iid),
            Thing::ParameterType(t) => Some(t.iid()),
            Thing::MeasurementScale(t) => Some(t.iid),
            Thing::ExternalIdentifierMap(t) => t.iid,
            Thing::IdCorrespondence(t) => t.iid,
        }
    }

    pub fn class_kind(&self) -> ClassKind {
        match self {
            Thing::ElementDefinition(_) => ClassKind::ElementDefinition,
            Thing::ElementUsage(_) => ClassKind::ElementUsage,
            Thing::Parameter(_) => ClassKind::Parameter,
            Thing::ParameterOverride(_) => ClassKind::ParameterOverride,
            Thing::ValueSet(_) => ClassKind::ValueSet,
            Thing::Option(_) => ClassKind::Option,
            Thing::ActualFiniteState(_) => ClassKind::ActualFiniteState,
            Thing::ParameterType(_) => ClassKind::ParameterType,
            Thing::MeasurementScale(_) => ClassKind::MeasurementScale,
            Thing::ExternalIdentifierMap(_) => ClassKind::ExternalIdentifierMap,
            Thing::IdCorrespondence(_) => ClassKind::IdCorrespondence,
        }
    }
}
