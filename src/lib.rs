//! The `hubmap` crate reconciles a numeric workspace (named scalar or 2-D array variables held by
//! an external computational tool) with the structured data model of an engineering hub, and
//! records how every variable was mapped so a later session can reload the same correspondence.
//!
//! ## Examples
//!
//! ### Writing a workspace array into an array parameter
//!
//! ```rust,no_run
//! use hubmap::{
//!     correspondence::CorrespondenceStore,
//!     rules::workspace_to_hub::{self, ElementTarget, ParameterTarget, WorkspaceToHubMapping},
//!     value::{Array2, Scalar, VariableValue},
//!     variable::WorkspaceVariable,
//! };
//! # use hubmap::schema::{Id, Iteration};
//! # fn run(
//! #     iteration: &Iteration,
//! #     matrix_type: Id,
//! #     owner: Id,
//! #     store: &mut CorrespondenceStore,
//! # ) -> Result<(), hubmap::Error> {
//! let value: Array2<Scalar> = Array2::from_rows(vec![
//!     vec![1.0.into(), 2.0.into()],
//!     vec![3.0.into(), 4.0.into()],
//! ])?;
//! let variable = WorkspaceVariable::new("gain", VariableValue::Array(value));
//!
//! let mapping = WorkspaceToHubMapping::new(
//!     variable,
//!     ElementTarget::New { name: "Controller".into() },
//!     ParameterTarget::New { parameter_type: matrix_type, scale: None },
//! );
//! let output = workspace_to_hub::transform(&[mapping], iteration, owner, store)?;
//! assert_eq!(output.elements.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ### Reloading a persisted mapping
//!
//! ```rust,no_run
//! use hubmap::{
//!     configuration::MappingConfiguration, memory::InMemoryHub, settings::MappingSettings,
//!     variable::WorkspaceVariable,
//! };
//! # fn run(hub: InMemoryHub, variables: Vec<WorkspaceVariable>) -> Result<(), hubmap::Error> {
//! let configuration = MappingConfiguration::open(&hub, MappingSettings::default())?;
//! if let Some(mappings) = configuration.load_to_hub(&hub, &variables) {
//!     println!("{} variables reloaded", mappings.len());
//! }
//! # Ok(())
//! # }
//! ```
#![doc = document_features::document_features!()]
#![deny(clippy::all)]

// Re-export the hub data model
pub use hubmap_schema as schema;

use schema::Id;

pub mod adapter;
pub mod configuration;
pub mod correspondence;
pub mod memory;
pub mod rules;
pub mod settings;
pub mod traits;
pub mod value;
pub mod variable;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Value set holds {found} values where the parameter type declares {expected}")]
    ValueSetShape { expected: usize, found: usize },

    #[error("Arrays of rank {0} are not supported")]
    UnsupportedRank(usize),

    #[error("Array rows must be non-empty and of equal length")]
    RaggedArray,

    #[error("Axis index `{index}` does not select a row or column of a {rows}x{cols} array")]
    AxisIndex {
        index: String,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid mapping of `{variable}`: {reason}")]
    InvalidMapping { variable: String, reason: String },

    #[error("Mapping `{name}` failed: {source}")]
    Variable {
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Unknown thing {0}")]
    UnknownThing(Id),

    #[error("No iteration is open on the hub")]
    NotConnected,

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error(transparent)]
    Schema(#[from] schema::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "arrow")]
    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),
}

impl Error {
    pub(crate) fn invalid_mapping(variable: &str, reason: impl Into<String>) -> Self {
        Error::InvalidMapping {
            variable: variable.to_string(),
            reason: reason.into(),
        }
    }
}

/// Which way a correspondence transfers values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MappingDirection {
    HubToWorkspace,
    WorkspaceToHub,
}
