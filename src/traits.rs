//! The collaborators the mapping core talks to: the workspace tool and the hub session.

use hubmap_schema::{DomainOfExpertise, Id, Iteration, Thing, Transaction};

use crate::{variable::WorkspaceVariable, Error};

/// Connection to the computational tool holding the workspace.
pub trait WorkspaceConnector {
    fn connect(&mut self) -> Result<(), Error>;

    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Read a variable by name, `None` if the workspace does not hold it.
    fn get_variable(&self, name: &str) -> Result<Option<WorkspaceVariable>, Error>;

    /// Write a variable, creating it when it does not exist yet.
    fn put_variable(&mut self, variable: &WorkspaceVariable) -> Result<(), Error>;

    /// Run a command in the tool and return what it printed.
    fn execute(&mut self, command: &str) -> Result<String, Error>;
}

/// Session with the hub holding the engineering model.
pub trait HubConnector {
    /// Fetch an owned copy of a thing. `container` narrows the search when the caller knows it.
    fn get_thing_by_id(&self, iid: Id, container: Option<Id>) -> Option<Thing>;

    /// Commit a transaction. The operations are applied in order.
    fn write(&mut self, transaction: Transaction) -> Result<(), Error>;

    fn current_domain_of_expertise(&self) -> Option<&DomainOfExpertise>;

    fn open_iteration(&self) -> Option<&Iteration>;
}
