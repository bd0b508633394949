//! The two transformation rules between workspace variables and hub parameters.

pub mod hub_to_workspace;
pub mod workspace_to_hub;
