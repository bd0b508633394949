//! Identity resolution and transaction application on an in-memory iteration.

use hubmap_schema::{
    new_id, ClassKind, DomainOfExpertise, ElementDefinition, ElementUsage, Error,
    ExternalIdentifierMap, IdCorrespondence, Iteration, Parameter, ParameterOverride,
    ParameterSwitchKind, Thing, Transaction,
};

fn iteration() -> (Iteration, Parameter) {
    let domain = DomainOfExpertise {
        iid: new_id(),
        name: "System Engineering".into(),
        short_name: "SYS".into(),
    };
    let mut battery = ElementDefinition::new("Battery", domain.iid);
    let parameter = Parameter::new(new_id(), None, domain.iid);
    battery.parameters.push(parameter.clone());

    let mut satellite = ElementDefinition::new("Satellite", domain.iid);
    let mut usage = ElementUsage::new(&battery, domain.iid);
    usage
        .parameter_overrides
        .push(ParameterOverride::new(&parameter, domain.iid));
    satellite.contained_elements.push(usage);

    let iteration = Iteration {
        iid: new_id(),
        model_name: "LOFT".into(),
        domains: vec![domain],
        element_definitions: vec![battery, satellite],
        ..Default::default()
    };
    (iteration, parameter)
}

#[test]
fn test_find_thing() {
    let (iteration, parameter) = iteration();

    let found = iteration.find_thing(parameter.iid).unwrap();
    assert_eq!(found.class_kind(), ClassKind::Parameter);
    assert_eq!(found.iid(), Some(parameter.iid));

    let usage = &iteration.element_definitions[1].contained_elements[0];
    let ovr = &usage.parameter_overrides[0];
    assert!(matches!(
        iteration.find_thing(ovr.iid),
        Some(Thing::ParameterOverride(_))
    ));
    assert!(matches!(
        iteration.find_thing(ovr.value_sets[0].iid),
        Some(Thing::ValueSet(_))
    ));
    assert!(iteration.find_thing(new_id()).is_none());
}

#[test]
fn test_value_set_owner() {
    let (iteration, parameter) = iteration();

    let owner = iteration
        .value_set_owner(parameter.value_sets[0].iid)
        .unwrap();
    assert_eq!(owner.owner, parameter.iid);

    let ovr = &iteration.element_definitions[1].contained_elements[0].parameter_overrides[0];
    let owner = iteration.value_set_owner(ovr.value_sets[0].iid).unwrap();
    assert_eq!(owner.owner, ovr.iid);
    assert_eq!(owner.parameter.iid, parameter.iid);
}

#[test]
fn test_apply_transaction() {
    let (mut iteration, parameter) = iteration();
    let owner = iteration.domains[0].iid;

    let mut value_set = parameter.value_sets[0].clone();
    value_set.set_values(ParameterSwitchKind::Computed, vec!["42".into()]);

    let mut map = ExternalIdentifierMap::new("hubmap - LOFT", "hubmap", "LOFT", owner);
    map.iid = Some(new_id());
    let correspondence = IdCorrespondence {
        iid: Some(new_id()),
        internal_thing: parameter.iid,
        external_id: "{}".into(),
    };

    let solar = ElementDefinition::new("Solar Array", owner);
    let mut transaction = Transaction::new();
    transaction.create(Thing::ElementDefinition(solar.clone()), None);
    transaction.update(Thing::ValueSet(value_set));
    transaction.update(Thing::ExternalIdentifierMap(map.clone()));
    transaction.create(Thing::IdCorrespondence(correspondence), map.iid);
    assert_eq!(transaction.len(), 4);

    for operation in transaction.operations() {
        iteration.apply(operation).unwrap();
    }

    assert!(iteration.element(solar.iid).is_some());
    assert_eq!(
        iteration.parameter(parameter.iid).unwrap().value_sets[0].computed,
        ["42"]
    );
    let stored = iteration.external_identifier_map("hubmap - LOFT", "hubmap").unwrap();
    assert_eq!(stored.correspondence.len(), 1);
}

#[test]
fn test_apply_requires_identity() {
    let (mut iteration, _) = iteration();
    let map = ExternalIdentifierMap::new("temporary", "hubmap", "LOFT", new_id());

    let mut transaction = Transaction::new();
    transaction.update(Thing::ExternalIdentifierMap(map));
    assert_eq!(
        iteration.apply(&transaction.operations()[0]),
        Err(Error::MissingIdentity(ClassKind::ExternalIdentifierMap))
    );
}

#[test]
fn test_serde_roundtrip() {
    let (iteration, _) = iteration();
    let json = serde_json::to_string(&iteration).unwrap();
    let back: Iteration = serde_json::from_str(&json).unwrap();
    assert_eq!(back, iteration);
}
