//! A batch of pending writes to the hub.

use crate::{Id, Thing};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operation {
    /// Create `thing` inside `container`, `None` for things held by the iteration itself.
    Create { thing: Thing, container: Option<Id> },
    Update { thing: Thing },
}

impl Operation {
    pub fn thing(&self) -> &Thing {
        match self {
            Operation::Create { thing, .. } | Operation::Update { thing } => thing,
        }
    }
}

/// Operations are kept in the order they were registered; the hub applies them in that order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transaction {
    operations: Vec<Operation>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, thing: Thing, container: Option<Id>) {
        self.operations.push(Operation::Create { thing, container });
    }

    pub fn update(&mut self, thing: Thing) {
        self.operations.push(Operation::Update { thing });
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
