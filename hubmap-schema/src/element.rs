use crate::{new_id, Id, Parameter, ParameterOverride};

/// An element of the engineering model, holding parameters and usages of other elements.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementDefinition {
    pub iid: Id,
    pub name: String,
    pub short_name: String,
    pub owner: Id,
    #[cfg_attr(feature = "serde", serde(default))]
    pub parameters: Vec<Parameter>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub contained_elements: Vec<ElementUsage>,
}

impl ElementDefinition {
    /// A new, empty element owned by `owner`. The short name is the name stripped of anything
    /// that is not alphanumeric.
    pub fn new(name: &str, owner: Id) -> Self {
        Self {
            iid: new_id(),
            name: name.to_string(),
            short_name: name.chars().filter(|c| c.is_alphanumeric()).collect(),
            owner,
            parameters: Vec::new(),
            contained_elements: Vec::new(),
        }
    }

    pub fn parameter(&self, iid: Id) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.iid == iid)
    }

    pub fn parameter_mut(&mut self, iid: Id) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.iid == iid)
    }

    /// The parameter typed by `parameter_type`; an element holds at most one per type.
    pub fn parameter_by_type_mut(&mut self, parameter_type: Id) -> Option<&mut Parameter> {
        self.parameters
            .iter_mut()
            .find(|p| p.parameter_type == parameter_type)
    }
}

/// A usage of an [`ElementDefinition`] inside another one.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementUsage {
    pub iid: Id,
    pub name: String,
    pub short_name: String,
    pub owner: Id,
    /// Identity of the used [`ElementDefinition`].
    pub element_definition: Id,
    #[cfg_attr(feature = "serde", serde(default))]
    pub parameter_overrides: Vec<ParameterOverride>,
}

impl ElementUsage {
    pub fn new(definition: &ElementDefinition, owner: Id) -> Self {
        Self {
            iid: new_id(),
            name: definition.name.clone(),
            short_name: definition.short_name.clone(),
            owner,
            element_definition: definition.iid,
            parameter_overrides: Vec::new(),
        }
    }

    pub fn override_for_mut(&mut self, parameter: Id) -> Option<&mut ParameterOverride> {
        self.parameter_overrides
            .iter_mut()
            .find(|o| o.parameter == parameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        let element = ElementDefinition::new("Solar Panel-2", new_id());
        assert_eq!(element.short_name, "SolarPanel2");
        assert!(element.parameters.is_empty());
    }

    #[test]
    fn test_parameter_lookup() {
        let owner = new_id();
        let ty = new_id();
        let mut element = ElementDefinition::new("Battery", owner);
        element.parameters.push(Parameter::new(ty, None, owner));
        let iid = element.parameters[0].iid;

        assert!(element.parameter(iid).is_some());
        assert_eq!(element.parameter_by_type_mut(ty).map(|p| p.iid), Some(iid));
        assert!(element.parameter_by_type_mut(new_id()).is_none());
    }
}
