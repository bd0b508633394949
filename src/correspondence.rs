//! Persistent correspondences between hub identities and workspace variables.
//!
//! Each correspondence of an [`ExternalIdentifierMap`] carries a JSON [`ExternalIdentifier`]
//! payload recording enough of the mapping (direction, value index, value switch, orientation,
//! axis assignments, time step) to replay it in a later session.

use hubmap_schema::{
    new_id, ExternalIdentifierMap, Id, IdCorrespondence, Iteration, ParameterSwitchKind, Thing,
    Transaction,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    adapter::sampled_function::ordered,
    settings::MappingSettings,
    traits::HubConnector,
    variable::{AxisAssignment, AxisRole, RowOrColumn, WorkspaceVariable},
    Error, MappingDirection,
};

/// The payload stored with every correspondence.
///
/// Field order is part of the persisted format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExternalIdentifier {
    pub direction: MappingDirection,
    /// Workspace variable identifier, or the identifier of the variable an option or state link
    /// belongs to.
    pub identifier: String,
    #[serde(default)]
    pub value_index: Option<usize>,
    #[serde(default)]
    pub switch_kind: ParameterSwitchKind,
    #[serde(default)]
    pub orientation: RowOrColumn,
    /// Assigned row or column of every axis, independent axes first, in declaration order.
    #[serde(default)]
    pub axis_assignment_indices: Vec<String>,
    /// Position of the time-tagged axis in `axis_assignment_indices`.
    #[serde(default)]
    pub time_tagged_axis_index: Option<usize>,
    #[serde(default)]
    pub is_averaged: bool,
    #[serde(default)]
    pub selected_time_step: f64,
}

impl ExternalIdentifier {
    /// A bare link of `direction` to `identifier`, used for options and states.
    pub fn link(direction: MappingDirection, identifier: &str) -> Self {
        Self {
            direction,
            identifier: identifier.to_string(),
            value_index: None,
            switch_kind: ParameterSwitchKind::default(),
            orientation: RowOrColumn::default(),
            axis_assignment_indices: Vec::new(),
            time_tagged_axis_index: None,
            is_averaged: false,
            selected_time_step: 0.0,
        }
    }

    fn from_assignments(
        direction: MappingDirection,
        variable: &WorkspaceVariable,
        orientation: RowOrColumn,
        assignments: &[AxisAssignment],
        switch_kind: ParameterSwitchKind,
    ) -> Self {
        let assignments = ordered(assignments);
        Self {
            switch_kind,
            orientation,
            axis_assignment_indices: assignments.iter().map(|a| a.index.clone()).collect(),
            time_tagged_axis_index: assignments.iter().position(|a| a.is_time_tagged),
            is_averaged: variable.is_averaged,
            // JSON has no non-finite numbers; such a step resamples nothing anyway
            selected_time_step: Some(variable.selected_time_step)
                .filter(|step| step.is_finite())
                .unwrap_or_default(),
            ..Self::link(direction, &variable.identifier)
        }
    }

    /// The payload of a workspace to hub mapping of `variable`.
    pub fn to_hub(variable: &WorkspaceVariable, switch_kind: ParameterSwitchKind) -> Self {
        Self::from_assignments(
            MappingDirection::WorkspaceToHub,
            variable,
            variable.orientation_to_hub,
            &variable.assignments_to_hub,
            switch_kind,
        )
    }

    /// The payload of a hub to workspace mapping into `variable`.
    pub fn to_dst(
        variable: &WorkspaceVariable,
        value_index: Option<usize>,
        switch_kind: ParameterSwitchKind,
    ) -> Self {
        Self {
            value_index,
            ..Self::from_assignments(
                MappingDirection::HubToWorkspace,
                variable,
                variable.orientation_to_dst,
                &variable.assignments_to_dst,
                switch_kind,
            )
        }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rebuild the axis assignments. The first `independent_axes` indices are independent.
    pub fn assignments(&self, independent_axes: usize) -> Vec<AxisAssignment> {
        self.axis_assignment_indices
            .iter()
            .enumerate()
            .map(|(i, index)| AxisAssignment {
                index: index.clone(),
                role: if i < independent_axes {
                    AxisRole::Independent
                } else {
                    AxisRole::Dependent
                },
                is_time_tagged: self.time_tagged_axis_index == Some(i),
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Correspondence {
    /// Identity of the persisted correspondence, `None` until the first persist.
    pub correspondence_id: Option<Id>,
    pub internal_id: Id,
    pub external_identifier: ExternalIdentifier,
}

impl Correspondence {
    fn is_same_link(&self, internal_id: Id, external_identifier: &ExternalIdentifier) -> bool {
        self.internal_id == internal_id
            && self.external_identifier.identifier == external_identifier.identifier
            && self.external_identifier.direction == external_identifier.direction
    }
}

/// The correspondences of one identifier map, with their payloads deserialized.
///
/// Stored correspondences whose payload cannot be read are kept verbatim and written back
/// unchanged.
#[derive(Clone, Debug)]
pub struct CorrespondenceStore {
    map: ExternalIdentifierMap,
    entries: Vec<Correspondence>,
    unparsed: Vec<IdCorrespondence>,
}

impl CorrespondenceStore {
    pub fn from_map(map: ExternalIdentifierMap) -> Self {
        let mut entries = Vec::with_capacity(map.correspondence.len());
        let mut unparsed = Vec::new();

        for stored in &map.correspondence {
            match ExternalIdentifier::from_json(&stored.external_id) {
                Ok(external_identifier) => entries.push(Correspondence {
                    correspondence_id: stored.iid,
                    internal_id: stored.internal_thing,
                    external_identifier,
                }),
                Err(e) => {
                    log::warn!("Keeping unreadable correspondence {:?}: {e}", stored.iid);
                    unparsed.push(stored.clone());
                }
            }
        }

        Self {
            map,
            entries,
            unparsed,
        }
    }

    /// The identifier map of this tool for the iteration's model, or a new temporary one.
    pub fn open(iteration: &Iteration, settings: &MappingSettings, owner: Id) -> Self {
        let name = settings.map_name(&iteration.model_name);
        match iteration.external_identifier_map(&name, &settings.tool_name) {
            Some(map) => {
                log::debug!(
                    "Opened identifier map `{name}` with {} correspondences",
                    map.correspondence.len()
                );
                Self::from_map(map.clone())
            }
            None => {
                log::debug!("Starting a new identifier map `{name}`");
                Self::from_map(ExternalIdentifierMap::new(
                    &name,
                    &settings.tool_name,
                    &iteration.model_name,
                    owner,
                ))
            }
        }
    }

    /// Whether the map has never been persisted.
    pub fn is_temporary(&self) -> bool {
        self.map.iid.is_none()
    }

    pub fn map(&self) -> &ExternalIdentifierMap {
        &self.map
    }

    pub fn entries(&self) -> &[Correspondence] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a correspondence, updating the existing one for the same thing, identifier and
    /// direction in place.
    pub fn add(&mut self, internal_id: Id, external_identifier: ExternalIdentifier) {
        match self
            .entries
            .iter_mut()
            .find(|c| c.is_same_link(internal_id, &external_identifier))
        {
            Some(existing) => {
                existing.internal_id = internal_id;
                existing.external_identifier = external_identifier;
            }
            None => self.entries.push(Correspondence {
                correspondence_id: None,
                internal_id,
                external_identifier,
            }),
        }
    }

    pub fn add_many(
        &mut self,
        correspondences: impl IntoIterator<Item = (Id, ExternalIdentifier)>,
    ) {
        for (internal_id, external_identifier) in correspondences {
            self.add(internal_id, external_identifier);
        }
    }

    /// Stage the map and its correspondences on `transaction`.
    ///
    /// A map without identity gets one and is created in `container`. Correspondences without
    /// identity get one and are created, the others updated. The map itself is always updated.
    pub fn persist(&mut self, transaction: &mut Transaction, container: Id) -> Result<(), Error> {
        let is_new = self.map.iid.is_none();
        let map_iid = *self.map.iid.get_or_insert_with(new_id);

        let mut staged = Vec::with_capacity(self.entries.len());
        for entry in &mut self.entries {
            let is_new = entry.correspondence_id.is_none();
            let stored = IdCorrespondence {
                iid: Some(*entry.correspondence_id.get_or_insert_with(new_id)),
                internal_thing: entry.internal_id,
                external_id: entry.external_identifier.to_json()?,
            };
            staged.push((is_new, stored));
        }

        self.map.correspondence = self
            .unparsed
            .iter()
            .cloned()
            .chain(staged.iter().map(|(_, stored)| stored.clone()))
            .collect();

        if is_new {
            transaction.create(
                Thing::ExternalIdentifierMap(self.map.clone()),
                Some(container),
            );
        }
        transaction.update(Thing::ExternalIdentifierMap(self.map.clone()));
        for (is_new, stored) in staged {
            if is_new {
                transaction.create(Thing::IdCorrespondence(stored), Some(map_iid));
            } else {
                transaction.update(Thing::IdCorrespondence(stored));
            }
        }

        log::debug!(
            "Staged identifier map `{}` with {} correspondences",
            self.map.name,
            self.map.correspondence.len()
        );
        Ok(())
    }

    /// Replace the map with the copy currently held by the hub.
    pub fn refresh(&mut self, hub: &impl HubConnector) -> Result<(), Error> {
        let Some(iid) = self.map.iid else {
            return Ok(());
        };
        match hub.get_thing_by_id(iid, None) {
            Some(Thing::ExternalIdentifierMap(map)) => {
                *self = Self::from_map(map);
                Ok(())
            }
            _ => Err(Error::UnknownThing(iid)),
        }
    }

    pub fn correspondences_for<'a>(
        &'a self,
        identifier: &'a str,
    ) -> impl Iterator<Item = &'a Correspondence> + 'a {
        self.entries
            .iter()
            .filter(move |c| c.external_identifier.identifier == identifier)
    }

    /// The distinct workspace identifiers, in first-seen order.
    pub fn identifiers(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|c| c.external_identifier.identifier.as_str())
            .unique()
            .collect()
    }

    /// Correspondences of `direction`, grouped by workspace identifier in first-seen order.
    pub fn grouped(&self, direction: MappingDirection) -> Vec<(&str, Vec<&Correspondence>)> {
        self.identifiers()
            .into_iter()
            .map(|identifier| {
                let group: Vec<_> = self
                    .correspondences_for(identifier)
                    .filter(|c| c.external_identifier.direction == direction)
                    .collect();
                (identifier, group)
            })
            .filter(|(_, group)| !group.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Array2, Scalar};

    fn variable() -> WorkspaceVariable {
        let mut variable = WorkspaceVariable::new("f", Array2::filled(3, 2, Scalar::Number(0.0)));
        variable.orientation_to_hub = RowOrColumn::Row;
        variable.assignments_to_hub = vec![
            AxisAssignment::dependent(0),
            AxisAssignment::independent(1).time_tagged(),
        ];
        variable.selected_time_step = 0.5;
        variable
    }

    #[test]
    fn test_payload_is_byte_stable() {
        let payload = ExternalIdentifier::to_hub(&variable(), ParameterSwitchKind::Manual);
        assert_eq!(payload.axis_assignment_indices, ["1", "0"]);
        assert_eq!(payload.time_tagged_axis_index, Some(0));

        let json = payload.to_json().unwrap();
        assert!(json.starts_with(r#"{"direction":"WorkspaceToHub","identifier":"f-0","#));
        let reparsed = ExternalIdentifier::from_json(&json).unwrap();
        assert_eq!(reparsed, payload);
        assert_eq!(reparsed.to_json().unwrap(), json);
    }

    #[test]
    fn test_non_finite_time_step_round_trips() {
        for step in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let mut variable = variable();
            variable.selected_time_step = step;
            let payload = ExternalIdentifier::to_hub(&variable, ParameterSwitchKind::Computed);
            assert_eq!(payload.selected_time_step, 0.0);

            let json = payload.to_json().unwrap();
            assert!(json.ends_with(r#""selected_time_step":0.0}"#));
            assert_eq!(ExternalIdentifier::from_json(&json).unwrap(), payload);
        }
    }

    #[test]
    fn test_assignments_from_payload() {
        let payload = ExternalIdentifier::to_hub(&variable(), ParameterSwitchKind::Computed);
        let assignments = payload.assignments(1);
        assert_eq!(
            assignments,
            [
                AxisAssignment::independent(1).time_tagged(),
                AxisAssignment::dependent(0)
            ]
        );
    }

    #[test]
    fn test_add_updates_same_link() {
        let mut store =
            CorrespondenceStore::from_map(ExternalIdentifierMap::new("m", "t", "model", new_id()));
        let parameter = new_id();
        let v = WorkspaceVariable::new("x", Scalar::Number(1.0));

        store.add(parameter, ExternalIdentifier::to_dst(&v, Some(0), Default::default()));
        store.add(parameter, ExternalIdentifier::to_dst(&v, Some(3), Default::default()));
        store.add(parameter, ExternalIdentifier::to_hub(&v, Default::default()));

        assert_eq!(store.len(), 2);
        assert_eq!(store.entries()[0].external_identifier.value_index, Some(3));
        assert_eq!(store.identifiers(), ["x-0"]);
        assert_eq!(store.grouped(MappingDirection::WorkspaceToHub).len(), 1);
    }

    #[test]
    fn test_persist() {
        let container = new_id();
        let mut store =
            CorrespondenceStore::from_map(ExternalIdentifierMap::new("m", "t", "model", new_id()));
        assert!(store.is_temporary());

        let v = WorkspaceVariable::new("x", Scalar::Number(1.0));
        store.add(new_id(), ExternalIdentifier::to_hub(&v, Default::default()));

        let mut transaction = Transaction::new();
        store.persist(&mut transaction, container).unwrap();
        assert!(!store.is_temporary());
        assert_eq!(transaction.len(), 3);
        assert!(matches!(
            &transaction.operations()[0],
            hubmap_schema::Operation::Create { container: Some(c), .. } if *c == container
        ));

        // second persist only updates
        let mut transaction = Transaction::new();
        store.persist(&mut transaction, container).unwrap();
        assert_eq!(transaction.len(), 2);
        assert!(transaction
            .operations()
            .iter()
            .all(|op| matches!(op, hubmap_schema::Operation::Update { .. })));
        assert_eq!(store.map().correspondence.len(), 1);
    }

    #[test]
    fn test_unreadable_payload_is_kept() {
        let mut map = ExternalIdentifierMap::new("m", "t", "model", new_id());
        map.iid = Some(new_id());
        map.correspondence.push(IdCorrespondence {
            iid: Some(new_id()),
            internal_thing: new_id(),
            external_id: "not json".into(),
        });

        let mut store = CorrespondenceStore::from_map(map.clone());
        assert!(store.is_empty());

        let mut transaction = Transaction::new();
        store.persist(&mut transaction, new_id()).unwrap();
        assert_eq!(store.map().correspondence, map.correspondence);
    }
}
