//! Reloading persisted correspondences against the open iteration and a workspace snapshot.

use hubmap_schema::{
    Id, Iteration, Parameter, ParameterOverride, ParameterType, Thing, Transaction, ValueSet,
};

use crate::{
    correspondence::{CorrespondenceStore, ExternalIdentifier},
    rules::{
        hub_to_workspace::HubToWorkspaceMapping,
        workspace_to_hub::{
            ElementTarget, ParameterTarget, WorkspaceToHubMapping, WorkspaceToHubOutput,
        },
    },
    settings::MappingSettings,
    traits::HubConnector,
    variable::WorkspaceVariable,
    Error, MappingDirection,
};

/// The mapping session: settings plus the correspondence store of the open model.
#[derive(Clone, Debug)]
pub struct MappingConfiguration {
    settings: MappingSettings,
    store: CorrespondenceStore,
}

/// Number of independent axes declared by a parameter type.
fn independent_axes(parameter_type: Option<&ParameterType>) -> usize {
    match parameter_type {
        Some(ParameterType::SampledFunction(ty)) => ty.independent_parameter_type.len(),
        _ => 0,
    }
}

/// Where a hub to workspace correspondence takes its values from.
enum ValueSource {
    ValueSet(ValueSet),
    Parameter(Parameter),
    Override(ParameterOverride),
}

impl MappingConfiguration {
    /// Open the identifier map of the hub's open iteration, as the current domain of expertise.
    pub fn open(hub: &impl HubConnector, settings: MappingSettings) -> Result<Self, Error> {
        let iteration = hub.open_iteration().ok_or(Error::NotConnected)?;
        let owner = hub
            .current_domain_of_expertise()
            .map(|domain| domain.iid)
            .ok_or(Error::NotConnected)?;
        let store = CorrespondenceStore::open(iteration, &settings, owner);
        Ok(Self { settings, store })
    }

    pub fn settings(&self) -> &MappingSettings {
        &self.settings
    }

    pub fn store(&self) -> &CorrespondenceStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CorrespondenceStore {
        &mut self.store
    }

    /// Stage `output`, when given, and the identifier map on `transaction`.
    ///
    /// Writing the transaction is up to the caller; call [`Self::refresh`] once it succeeded.
    pub fn stage(
        &mut self,
        hub: &impl HubConnector,
        output: Option<&WorkspaceToHubOutput>,
        transaction: &mut Transaction,
    ) -> Result<(), Error> {
        let container = hub
            .open_iteration()
            .map(|iteration| iteration.iid)
            .ok_or(Error::NotConnected)?;
        if let Some(output) = output {
            output.stage(transaction);
        }
        self.store.persist(transaction, container)
    }

    /// Reload the identifier map from the hub after a write.
    pub fn refresh(&mut self, hub: &impl HubConnector) -> Result<(), Error> {
        self.store.refresh(hub)
    }

    fn has_mappings(&self) -> bool {
        !self.store.is_temporary() && !self.store.is_empty()
    }

    /// Rebuild the workspace to hub mappings of `variables`.
    ///
    /// `None` when the map was never persisted or holds no correspondence. Correspondences to
    /// things the hub no longer has are skipped; a variable whose parameter is gone is left out.
    pub fn load_to_hub(
        &self,
        hub: &impl HubConnector,
        variables: &[WorkspaceVariable],
    ) -> Option<Vec<WorkspaceToHubMapping>> {
        if !self.has_mappings() {
            return None;
        }
        let iteration = hub.open_iteration()?;

        let mut mappings = Vec::new();
        for (identifier, group) in self.store.grouped(MappingDirection::WorkspaceToHub) {
            let Some(variable) = variables.iter().find(|v| v.identifier == identifier) else {
                continue;
            };

            let mut element = None;
            let mut parameter: Option<(Parameter, &ExternalIdentifier)> = None;
            let mut usages = Vec::new();
            let (mut option, mut state) = (None, None);

            for correspondence in group {
                match hub.get_thing_by_id(correspondence.internal_id, None) {
                    Some(Thing::ElementDefinition(e)) => element = Some(e.iid),
                    Some(Thing::ElementUsage(u)) => usages.push(u.iid),
                    Some(Thing::Parameter(p)) => {
                        parameter = Some((p, &correspondence.external_identifier))
                    }
                    Some(Thing::Option(o)) => option = Some(o.iid),
                    Some(Thing::ActualFiniteState(s)) => state = Some(s.iid),
                    Some(other) => {
                        log::debug!("Ignoring {} linked to `{identifier}`", other.class_kind())
                    }
                    None => log::warn!(
                        "`{identifier}` refers to {}, which no longer exists",
                        correspondence.internal_id
                    ),
                }
            }

            let Some((parameter, payload)) = parameter else {
                log::warn!("No parameter left for `{identifier}`, skipped");
                continue;
            };
            let element = element.or_else(|| {
                iteration
                    .element_containing_parameter(parameter.iid)
                    .map(|e| e.iid)
            });
            let Some(element) = element else {
                log::warn!("No element holds the parameter of `{identifier}`, skipped");
                continue;
            };

            let mut variable = variable.clone();
            let independent = independent_axes(iteration.parameter_type(parameter.parameter_type));
            variable.orientation_to_hub = payload.orientation;
            variable.assignments_to_hub = payload.assignments(independent);
            variable.is_averaged = payload.is_averaged;
            variable.selected_time_step = payload.selected_time_step;
            variable.apply_time_step();

            mappings.push(WorkspaceToHubMapping {
                variable,
                element: ElementTarget::Existing(element),
                parameter: ParameterTarget::Existing(parameter.iid),
                usages,
                option,
                state,
                switch_kind: payload.switch_kind,
            });
        }

        log::debug!("Loaded {} workspace to hub mappings", mappings.len());
        Some(mappings)
    }

    /// Rebuild the hub to workspace mappings into `variables`, with the same rules as
    /// [`Self::load_to_hub`].
    pub fn load_to_dst(
        &self,
        hub: &impl HubConnector,
        variables: &[WorkspaceVariable],
    ) -> Option<Vec<HubToWorkspaceMapping>> {
        if !self.has_mappings() {
            return None;
        }
        let iteration = hub.open_iteration()?;

        let mut mappings = Vec::new();
        for (identifier, group) in self.store.grouped(MappingDirection::HubToWorkspace) {
            let Some(variable) = variables.iter().find(|v| v.identifier == identifier) else {
                continue;
            };

            let mut source: Option<(ValueSource, &ExternalIdentifier)> = None;
            let (mut option, mut state) = (None, None);

            for correspondence in group {
                let payload = &correspondence.external_identifier;
                match hub.get_thing_by_id(correspondence.internal_id, None) {
                    Some(Thing::ValueSet(vs)) => {
                        source = Some((ValueSource::ValueSet(vs), payload))
                    }
                    Some(Thing::Parameter(p)) => {
                        source = Some((ValueSource::Parameter(p), payload))
                    }
                    Some(Thing::ParameterOverride(o)) => {
                        source = Some((ValueSource::Override(o), payload))
                    }
                    Some(Thing::Option(o)) => option = Some(o.iid),
                    Some(Thing::ActualFiniteState(s)) => state = Some(s.iid),
                    Some(other) => {
                        log::debug!("Ignoring {} linked to `{identifier}`", other.class_kind())
                    }
                    None => log::warn!(
                        "`{identifier}` refers to {}, which no longer exists",
                        correspondence.internal_id
                    ),
                }
            }

            let Some((source, payload)) = source else {
                log::warn!("No value source left for `{identifier}`, skipped");
                continue;
            };
            let Some((value_set, owner, parameter_type)) =
                resolve_source(iteration, source, option, state)
            else {
                log::warn!("The values of `{identifier}` cannot be resolved, skipped");
                continue;
            };

            let mut variable = variable.clone();
            variable.orientation_to_dst = payload.orientation;
            let independent = independent_axes(Some(&parameter_type));
            variable.assignments_to_dst = payload.assignments(independent);
            variable.is_averaged = payload.is_averaged;
            variable.selected_time_step = payload.selected_time_step;

            mappings.push(HubToWorkspaceMapping {
                variable,
                parameter_type,
                value_set,
                owner,
                option,
                state,
                value_index: payload.value_index,
                switch_kind: payload.switch_kind,
            });
        }

        log::debug!("Loaded {} hub to workspace mappings", mappings.len());
        Some(mappings)
    }
}

/// The value set, its holder and the parameter type for a value source.
fn resolve_source(
    iteration: &Iteration,
    source: ValueSource,
    option: Option<Id>,
    state: Option<Id>,
) -> Option<(ValueSet, Id, ParameterType)> {
    let (value_set, owner, type_iid) = match source {
        ValueSource::ValueSet(value_set) => {
            let owner = iteration.value_set_owner(value_set.iid)?;
            (value_set, owner.owner, owner.parameter.parameter_type)
        }
        ValueSource::Parameter(parameter) => (
            parameter.value_set(option, state)?.clone(),
            parameter.iid,
            parameter.parameter_type,
        ),
        ValueSource::Override(parameter_override) => (
            parameter_override.value_set(option, state)?.clone(),
            parameter_override.iid,
            iteration.parameter(parameter_override.parameter)?.parameter_type,
        ),
    };
    let parameter_type = iteration.parameter_type(type_iid)?.clone();
    Some((value_set, owner, parameter_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{memory::InMemoryHub, value::Scalar};
    use hubmap_schema::{
        new_id, DomainOfExpertise, ElementDefinition, ScalarParameterType, ScalarTypeKind,
    };

    fn hub() -> InMemoryHub {
        let domain = DomainOfExpertise {
            iid: new_id(),
            name: "System Engineering".into(),
            short_name: "SYS".into(),
        };
        let number = ScalarParameterType {
            iid: new_id(),
            name: "number".into(),
            short_name: "n".into(),
            kind: ScalarTypeKind::Quantity {
                possible_scales: vec![],
                default_scale: None,
            },
        };
        let mut element = ElementDefinition::new("Battery", domain.iid);
        element
            .parameters
            .push(Parameter::new(number.iid, None, domain.iid));

        InMemoryHub::new(Iteration {
            iid: new_id(),
            model_name: "Satellite".into(),
            domains: vec![domain],
            element_definitions: vec![element],
            parameter_types: vec![ParameterType::Scalar(number)],
            ..Default::default()
        })
    }

    #[test]
    fn test_open_requires_iteration() {
        assert!(matches!(
            MappingConfiguration::open(&InMemoryHub::default(), MappingSettings::default()),
            Err(Error::NotConnected)
        ));
    }

    #[test]
    fn test_temporary_map_loads_nothing() {
        let hub = hub();
        let configuration = MappingConfiguration::open(&hub, MappingSettings::default()).unwrap();
        assert!(configuration.store().is_temporary());
        assert_eq!(configuration.store().map().name, "hubmap - Satellite");
        assert!(configuration.load_to_hub(&hub, &[]).is_none());
        assert!(configuration.load_to_dst(&hub, &[]).is_none());
    }

    #[test]
    fn test_persist_and_reload() {
        let mut hub = hub();
        let parameter = hub.open_iteration().unwrap().element_definitions[0].parameters[0].clone();

        let mut variable = WorkspaceVariable::new("capacity", Scalar::Number(3.0));
        variable.selected_time_step = 0.25;
        let mut configuration =
            MappingConfiguration::open(&hub, MappingSettings::default()).unwrap();
        configuration.store_mut().add(
            parameter.iid,
            ExternalIdentifier::to_hub(&variable, Default::default()),
        );
        configuration.store_mut().add(
            parameter.value_sets[0].iid,
            ExternalIdentifier::to_dst(&variable, Some(0), Default::default()),
        );
        let mut transaction = Transaction::new();
        configuration.stage(&hub, None, &mut transaction).unwrap();
        // nothing reaches the hub until the transaction is written
        assert!(hub.open_iteration().unwrap().external_identifier_maps.is_empty());
        hub.write(transaction).unwrap();
        configuration.refresh(&hub).unwrap();
        assert!(!configuration.store().is_temporary());

        // a new session finds the persisted map
        let configuration = MappingConfiguration::open(&hub, MappingSettings::default()).unwrap();
        assert_eq!(configuration.store().len(), 2);

        let fresh = WorkspaceVariable::new("capacity", Scalar::Number(0.0));
        let to_hub = configuration.load_to_hub(&hub, &[fresh.clone()]).unwrap();
        assert_eq!(to_hub.len(), 1);
        assert_eq!(to_hub[0].parameter, ParameterTarget::Existing(parameter.iid));
        assert_eq!(to_hub[0].variable.selected_time_step, 0.25);

        let to_dst = configuration.load_to_dst(&hub, &[fresh]).unwrap();
        assert_eq!(to_dst.len(), 1);
        assert_eq!(to_dst[0].owner, parameter.iid);
        assert_eq!(to_dst[0].value_index, Some(0));
    }
}
