#![doc=include_str!( "../README.md")]
//! ## Feature flags
#![doc = document_features::document_features!()]
#![deny(unsafe_code)]
#![deny(clippy::all)]

use thiserror::Error;

pub mod element;
pub mod iteration;
pub mod parameter;
pub mod parameter_type;
pub mod thing;
pub mod transaction;

pub use element::{ElementDefinition, ElementUsage};
pub use iteration::{
    ActualFiniteState, DesignOption, DomainOfExpertise, ExternalIdentifierMap, IdCorrespondence,
    Iteration, ValueSetOwner,
};
pub use parameter::{Parameter, ParameterOverride, ParameterSwitchKind, ValueSet};
pub use parameter_type::{
    ArrayParameterType, AxisTypeAssignment, MeasurementScale, NumberSetKind, ParameterType,
    SampledFunctionParameterType, ScalarParameterType, ScalarTypeKind,
};
pub use thing::{ClassKind, Thing};
pub use transaction::{Operation, Transaction};

/// Identity of a thing in the hub.
pub type Id = uuid::Uuid;

/// Generate a fresh identity for a thing that is about to be created.
pub fn new_id() -> Id {
    uuid::Uuid::new_v4()
}

/// The value written into a value set slot that carries no value yet.
pub const DEFAULT_VALUE: &str = "-";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Thing {0} not found")]
    ThingNotFound(Id),

    #[error("Container {container} of {class_kind} not found")]
    ContainerNotFound { class_kind: ClassKind, container: Id },

    #[error("Operation on {0} requires a container")]
    MissingContainer(ClassKind),

    #[error("{0} has no identity")]
    MissingIdentity(ClassKind),
}
