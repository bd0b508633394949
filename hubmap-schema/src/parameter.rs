//! Parameters, parameter overrides and their value sets.

use crate::{new_id, Id, DEFAULT_VALUE};

/// Selects which of the parallel value arrays of a [`ValueSet`] is authoritative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParameterSwitchKind {
    #[default]
    Computed,
    Manual,
    Reference,
}

/// The values of a parameter for one option/state combination.
///
/// Every array holds the flattened values of the parameter type: a single entry for simple types,
/// the row-major cells for arrays, and interleaved axis tuples for sampled functions.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValueSet {
    pub iid: Id,
    #[cfg_attr(feature = "serde", serde(default))]
    pub actual_option: Option<Id>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub actual_state: Option<Id>,
    pub computed: Vec<String>,
    pub manual: Vec<String>,
    pub reference: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub published: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub value_switch: ParameterSwitchKind,
}

impl ValueSet {
    /// A fresh value set of `len` default values, independent of options and states.
    pub fn new(len: usize) -> Self {
        let defaults = vec![DEFAULT_VALUE.to_string(); len];
        Self {
            iid: new_id(),
            actual_option: None,
            actual_state: None,
            computed: defaults.clone(),
            manual: defaults.clone(),
            reference: defaults.clone(),
            published: defaults,
            value_switch: ParameterSwitchKind::default(),
        }
    }

    pub fn with_option_and_state(mut self, option: Option<Id>, state: Option<Id>) -> Self {
        self.actual_option = option;
        self.actual_state = state;
        self
    }

    /// The values selected by the value switch.
    pub fn actual_value(&self) -> &[String] {
        self.values(self.value_switch)
    }

    pub fn values(&self, switch: ParameterSwitchKind) -> &[String] {
        match switch {
            ParameterSwitchKind::Computed => &self.computed,
            ParameterSwitchKind::Manual => &self.manual,
            ParameterSwitchKind::Reference => &self.reference,
        }
    }

    /// Write `values` into the array selected by `switch` and make it authoritative.
    ///
    /// The other arrays are resized to the new length so all parallel arrays stay aligned.
    pub fn set_values(&mut self, switch: ParameterSwitchKind, values: Vec<String>) {
        let len = values.len();
        for array in [
            &mut self.computed,
            &mut self.manual,
            &mut self.reference,
            &mut self.published,
        ] {
            array.resize(len, DEFAULT_VALUE.to_string());
        }
        match switch {
            ParameterSwitchKind::Computed => self.computed = values,
            ParameterSwitchKind::Manual => self.manual = values,
            ParameterSwitchKind::Reference => self.reference = values,
        }
        self.value_switch = switch;
    }

    pub fn matches(&self, option: Option<Id>, state: Option<Id>) -> bool {
        self.actual_option == option && self.actual_state == state
    }
}

fn find_value_set(value_sets: &[ValueSet], option: Option<Id>, state: Option<Id>) -> Option<usize> {
    value_sets
        .iter()
        .position(|vs| vs.matches(option, state))
        .or_else(|| (option.is_none() && state.is_none() && !value_sets.is_empty()).then_some(0))
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameter {
    pub iid: Id,
    /// Identity of the [`crate::ParameterType`] this parameter is typed by.
    pub parameter_type: Id,
    #[cfg_attr(feature = "serde", serde(default))]
    pub scale: Option<Id>,
    pub owner: Id,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_option_dependent: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub state_dependence: Option<Id>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub value_sets: Vec<ValueSet>,
}

impl Parameter {
    pub fn new(parameter_type: Id, scale: Option<Id>, owner: Id) -> Self {
        Self {
            iid: new_id(),
            parameter_type,
            scale,
            owner,
            is_option_dependent: false,
            state_dependence: None,
            value_sets: vec![ValueSet::new(1)],
        }
    }

    /// The value set for an option/state combination. Without a selection the first value set is
    /// returned.
    pub fn value_set(&self, option: Option<Id>, state: Option<Id>) -> Option<&ValueSet> {
        find_value_set(&self.value_sets, option, state).map(|i| &self.value_sets[i])
    }

    /// Like [`Self::value_set`], creating the value set when the combination has none yet.
    pub fn value_set_mut(&mut self, option: Option<Id>, state: Option<Id>) -> &mut ValueSet {
        match find_value_set(&self.value_sets, option, state) {
            Some(i) => &mut self.value_sets[i],
            None => {
                self.value_sets
                    .push(ValueSet::new(1).with_option_and_state(option, state));
                let last = self.value_sets.len() - 1;
                &mut self.value_sets[last]
            }
        }
    }
}

/// A parameter value override held by an element usage.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterOverride {
    pub iid: Id,
    /// Identity of the overridden [`Parameter`].
    pub parameter: Id,
    pub owner: Id,
    #[cfg_attr(feature = "serde", serde(default))]
    pub value_sets: Vec<ValueSet>,
}

impl ParameterOverride {
    /// Override `parameter`, starting from a copy of its value sets under fresh identities.
    pub fn new(parameter: &Parameter, owner: Id) -> Self {
        let value_sets = parameter
            .value_sets
            .iter()
            .map(|vs| ValueSet {
                iid: new_id(),
                ..vs.clone()
            })
            .collect();
        Self {
            iid: new_id(),
            parameter: parameter.iid,
            owner,
            value_sets,
        }
    }

    pub fn value_set(&self, option: Option<Id>, state: Option<Id>) -> Option<&ValueSet> {
        find_value_set(&self.value_sets, option, state).map(|i| &self.value_sets[i])
    }

    pub fn value_set_mut(&mut self, option: Option<Id>, state: Option<Id>) -> &mut ValueSet {
        match find_value_set(&self.value_sets, option, state) {
            Some(i) => &mut self.value_sets[i],
            None => {
                self.value_sets
                    .push(ValueSet::new(1).with_option_and_state(option, state));
                let last = self.value_sets.len() - 1;
                &mut self.value_sets[last]
            }
        }
    }
}
