//! In-memory connectors over JSON snapshots of a hub iteration and a workspace.

use std::path::Path;

use hubmap_schema::{DomainOfExpertise, Id, Iteration, Thing, Transaction};

use crate::{
    traits::{HubConnector, WorkspaceConnector},
    value::{Scalar, VariableValue},
    variable::{parse_leaf_name, WorkspaceVariable},
    Error,
};

/// A hub session over one iteration held in memory. Written transactions are applied to it.
#[derive(Clone, Debug, Default)]
pub struct InMemoryHub {
    iteration: Option<Iteration>,
    domain: Option<DomainOfExpertise>,
}

impl InMemoryHub {
    /// Open `iteration`, acting as its first domain of expertise.
    pub fn new(iteration: Iteration) -> Self {
        let domain = iteration.domains.first().cloned();
        Self {
            iteration: Some(iteration),
            domain,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        let iteration: Iteration = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(Self::new(iteration))
    }

    pub fn with_domain(mut self, domain: DomainOfExpertise) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn into_iteration(self) -> Option<Iteration> {
        self.iteration
    }
}

impl HubConnector for InMemoryHub {
    fn get_thing_by_id(&self, iid: Id, _container: Option<Id>) -> Option<Thing> {
        self.iteration.as_ref()?.find_thing(iid)
    }

    /// Applies the operations to a copy of the iteration, which replaces the open one only when
    /// every operation succeeded.
    fn write(&mut self, transaction: Transaction) -> Result<(), Error> {
        let mut iteration = self.iteration.clone().ok_or(Error::NotConnected)?;
        for operation in transaction.operations() {
            iteration.apply(operation)?;
        }
        log::debug!("Applied {} operations", transaction.len());
        self.iteration = Some(iteration);
        Ok(())
    }

    fn current_domain_of_expertise(&self) -> Option<&DomainOfExpertise> {
        self.domain.as_ref()
    }

    fn open_iteration(&self) -> Option<&Iteration> {
        self.iteration.as_ref()
    }
}

/// A workspace made of named variables held in memory.
///
/// Leaf names `name[row,col]` address single cells of array variables. `execute` understands
/// `name = <number>` assignments and bare `name` queries.
#[derive(Clone, Debug, Default)]
pub struct SnapshotWorkspace {
    variables: Vec<WorkspaceVariable>,
    connected: bool,
}

impl SnapshotWorkspace {
    pub fn new(variables: Vec<WorkspaceVariable>) -> Self {
        let variables = variables
            .into_iter()
            .map(|mut variable| {
                if variable.identifier.is_empty() {
                    variable.identifier = format!("{}-0", variable.name);
                }
                variable
            })
            .collect();
        Self {
            variables,
            connected: false,
        }
    }

    /// Read a JSON list of variables.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        let variables: Vec<WorkspaceVariable> =
            serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(Self::new(variables))
    }

    pub fn variables(&self) -> &[WorkspaceVariable] {
        &self.variables
    }

    fn ensure_connected(&self) -> Result<(), Error> {
        if self.connected {
            Ok(())
        } else {
            Err(Error::Workspace("not connected".to_string()))
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }
}

impl WorkspaceConnector for SnapshotWorkspace {
    fn connect(&mut self) -> Result<(), Error> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn get_variable(&self, name: &str) -> Result<Option<WorkspaceVariable>, Error> {
        self.ensure_connected()?;
        if let Some(index) = self.position(name) {
            return Ok(Some(self.variables[index].clone()));
        }

        let Some((parent, _, _)) = parse_leaf_name(name) else {
            return Ok(None);
        };
        Ok(self.position(parent).and_then(|index| {
            self.variables[index]
                .unwrap_array()
                .into_iter()
                .find(|leaf| leaf.name == name)
        }))
    }

    fn put_variable(&mut self, variable: &WorkspaceVariable) -> Result<(), Error> {
        self.ensure_connected()?;

        if let Some((parent, row, col)) = parse_leaf_name(&variable.name) {
            if let Some(index) = self.position(parent) {
                let VariableValue::Scalar(value) = &variable.value else {
                    return Err(Error::Workspace(format!(
                        "`{}` addresses a single cell",
                        variable.name
                    )));
                };
                return if self.variables[index].set_cell(row, col, value.clone()) {
                    Ok(())
                } else {
                    Err(Error::Workspace(format!(
                        "`{}` cannot hold `{value}`",
                        variable.name
                    )))
                };
            }
        }

        match self.position(&variable.name) {
            Some(index) => self.variables[index] = variable.clone(),
            None => self.variables.push(variable.clone()),
        }
        Ok(())
    }

    fn execute(&mut self, command: &str) -> Result<String, Error> {
        self.ensure_connected()?;
        let command = command.trim().trim_end_matches(';');

        if let Some((name, value)) = command.split_once('=') {
            let name = name.trim();
            let value = value.trim();
            let number: f64 = value
                .parse()
                .map_err(|_| Error::Workspace(format!("cannot evaluate `{value}`")))?;
            let variable = match self.get_variable(name)? {
                Some(mut variable) => {
                    if !variable.set_value(VariableValue::Scalar(Scalar::Number(number))) {
                        return Err(Error::Workspace(format!("`{name}` is not a number")));
                    }
                    variable
                }
                None => WorkspaceVariable::new(name, Scalar::Number(number)),
            };
            self.put_variable(&variable)?;
            return Ok(format!("{name} = {}", variable.value));
        }

        match self.get_variable(command)? {
            Some(variable) => Ok(format!("{} = {}", variable.name, variable.value)),
            None => Err(Error::Workspace(format!("`{command}` is undefined"))),
        }
    }
}
