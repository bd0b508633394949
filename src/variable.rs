//! Workspace variables and the per-cell leaves of array variables.

use serde::{Deserialize, Serialize};

use crate::{
    adapter::{
        sampled_function::{self, AxisSeries},
        time_tag::{TimeTaggedValue, TimeTaggedValues},
    },
    value::{Scalar, VariableValue},
};

/// Whether the axes of a sampled function are laid out as array columns or array rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowOrColumn {
    #[default]
    Column,
    Row,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisRole {
    Independent,
    Dependent,
}

/// Assigns one row or column of an array variable to a declared axis of a sampled function.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisAssignment {
    /// Row or column ordinal, as text.
    pub index: String,
    pub role: AxisRole,
    #[serde(default)]
    pub is_time_tagged: bool,
}

impl AxisAssignment {
    pub fn independent(index: usize) -> Self {
        Self {
            index: index.to_string(),
            role: AxisRole::Independent,
            is_time_tagged: false,
        }
    }

    pub fn dependent(index: usize) -> Self {
        Self {
            index: index.to_string(),
            role: AxisRole::Dependent,
            is_time_tagged: false,
        }
    }

    pub fn time_tagged(mut self) -> Self {
        self.is_time_tagged = true;
        self
    }

    /// The row or column this assignment selects, if the index is an ordinal.
    pub fn position(&self) -> Option<usize> {
        self.index.trim().parse().ok()
    }
}

/// One named entry of the workspace.
///
/// Array variables can be unwrapped into one leaf per cell, see
/// [`WorkspaceVariable::unwrap_array`]. Leaves carry the name of their array in `parent_name` and
/// always hold a scalar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceVariable {
    pub name: String,
    /// Stable key across sessions, `<name>-<suffix>`.
    #[serde(default)]
    pub identifier: String,
    pub value: VariableValue,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub orientation_to_hub: RowOrColumn,
    #[serde(default)]
    pub orientation_to_dst: RowOrColumn,
    #[serde(default)]
    pub assignments_to_hub: Vec<AxisAssignment>,
    #[serde(default)]
    pub assignments_to_dst: Vec<AxisAssignment>,
    #[serde(default)]
    pub is_averaged: bool,
    #[serde(default)]
    pub selected_time_step: f64,
    #[serde(skip)]
    time_tagged_values: Vec<TimeTaggedValue>,
}

impl WorkspaceVariable {
    pub fn new(name: &str, value: impl Into<VariableValue>) -> Self {
        Self::with_identifier(name, &format!("{name}-0"), value)
    }

    pub fn with_identifier(name: &str, identifier: &str, value: impl Into<VariableValue>) -> Self {
        Self {
            name: name.to_string(),
            identifier: identifier.to_string(),
            value: value.into(),
            parent_name: None,
            orientation_to_hub: RowOrColumn::default(),
            orientation_to_dst: RowOrColumn::default(),
            assignments_to_hub: Vec::new(),
            assignments_to_dst: Vec::new(),
            is_averaged: false,
            selected_time_step: 0.0,
            time_tagged_values: Vec::new(),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.value, VariableValue::Array(_))
    }

    pub fn is_leaf(&self) -> bool {
        self.parent_name.is_some()
    }

    /// One leaf per cell, named `name[row,col]`, in row-major order.
    ///
    /// Scalar variables and leaves are returned unchanged as a single entry.
    pub fn unwrap_array(&self) -> Vec<WorkspaceVariable> {
        let array = match (&self.value, &self.parent_name) {
            (VariableValue::Array(array), None) => array,
            _ => return vec![self.clone()],
        };

        let cols = array.cols();
        array
            .iter()
            .enumerate()
            .map(|(flat, cell)| {
                let name = leaf_name(&self.name, flat / cols, flat % cols);
                let identifier = format!("{}-{flat}", self.identifier);
                let mut leaf = WorkspaceVariable::with_identifier(&name, &identifier, cell.clone());
                leaf.parent_name = Some(self.name.clone());
                leaf
            })
            .collect()
    }

    /// Every variable followed by the leaves of the array variables.
    pub fn unwrap_all(variables: &[WorkspaceVariable]) -> Vec<WorkspaceVariable> {
        variables
            .iter()
            .flat_map(|variable| {
                let leaves = if variable.is_array() && !variable.is_leaf() {
                    variable.unwrap_array()
                } else {
                    Vec::new()
                };
                std::iter::once(variable.clone()).chain(leaves)
            })
            .collect()
    }

    /// Replace the value, refusing anything that would change its kind: scalars stay scalars of
    /// the same kind, arrays stay arrays. Returns whether the value was replaced.
    pub fn set_value(&mut self, value: VariableValue) -> bool {
        let same_kind = match (&self.value, &value) {
            (VariableValue::Scalar(old), VariableValue::Scalar(new)) => old.kind() == new.kind(),
            (VariableValue::Array(_), VariableValue::Array(_)) => self.parent_name.is_none(),
            _ => false,
        };
        if same_kind {
            self.value = value;
        } else {
            log::debug!("Refused to assign `{value}` to `{}`", self.name);
        }
        same_kind
    }

    /// Replace one cell of an array variable, refusing a change of the cell's kind.
    pub fn set_cell(&mut self, row: usize, col: usize, value: Scalar) -> bool {
        let VariableValue::Array(array) = &mut self.value else {
            return false;
        };
        match array.get_mut(row, col) {
            Some(cell) if cell.kind() == value.kind() => {
                *cell = value;
                true
            }
            _ => false,
        }
    }

    /// The time-tagged values for the current time step and averaging state, computed lazily from
    /// the hub-bound axis assignments. Empty when no axis is time-tagged.
    pub fn time_tagged(&self) -> TimeTaggedValues {
        let Some(array) = self.value.as_array() else {
            return TimeTaggedValues::empty();
        };
        let series = match sampled_function::decompose(
            array,
            self.orientation_to_hub,
            &self.assignments_to_hub,
        ) {
            Ok(series) => series,
            Err(e) => {
                log::debug!("`{}` cannot be decomposed: {e}", self.name);
                return TimeTaggedValues::empty();
            }
        };

        let Some(time) = series
            .iter()
            .find(|s| s.is_time_tagged)
            .and_then(AxisSeries::numeric)
        else {
            return TimeTaggedValues::empty();
        };
        // one entry per dependent axis, so positions line up with the axis labels
        let dependent = series
            .iter()
            .filter(|s| s.role == AxisRole::Dependent)
            .map(AxisSeries::numeric_or_nan)
            .collect();

        TimeTaggedValues::new(time, dependent, self.is_averaged, self.selected_time_step)
    }

    /// Recompute the cached time-tagged values. Call again after changing the time step, the
    /// averaging flag or the assignments.
    pub fn apply_time_step(&mut self) {
        self.time_tagged_values = self.time_tagged().collect();
    }

    /// The values cached by the last [`Self::apply_time_step`].
    pub fn time_tagged_values(&self) -> &[TimeTaggedValue] {
        &self.time_tagged_values
    }
}

pub fn leaf_name(parent: &str, row: usize, col: usize) -> String {
    format!("{parent}[{row},{col}]")
}

/// Split a leaf name `name[row,col]` into its parts.
pub fn parse_leaf_name(name: &str) -> Option<(&str, usize, usize)> {
    let (parent, rest) = name.strip_suffix(']')?.rsplit_once('[')?;
    let (row, col) = rest.split_once(',')?;
    Some((parent, row.trim().parse().ok()?, col.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Array2;

    fn matrix() -> WorkspaceVariable {
        let array = Array2::from_fn(2, 3, |r, c| Scalar::Number((r * 3 + c) as f64));
        WorkspaceVariable::new("m", array)
    }

    #[test]
    fn test_unwrap_array() {
        let variable = matrix();
        let leaves = variable.unwrap_array();

        assert_eq!(leaves.len(), 6);
        assert_eq!(leaves[4].name, "m[1,1]");
        assert_eq!(leaves[4].identifier, "m-0-4");
        assert_eq!(leaves[4].parent_name.as_deref(), Some("m"));
        assert_eq!(leaves[4].value, VariableValue::Scalar(Scalar::Number(4.0)));

        // leaves are never unwrapped again
        assert_eq!(leaves[4].unwrap_array(), vec![leaves[4].clone()]);
        // the parent keeps its array
        assert!(variable.is_array());
    }

    #[test]
    fn test_unwrap_all() {
        let scalar = WorkspaceVariable::new("x", Scalar::Number(1.0));
        let all = WorkspaceVariable::unwrap_all(&[scalar, matrix()]);
        let names: Vec<_> = all.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            ["x", "m", "m[0,0]", "m[0,1]", "m[0,2]", "m[1,0]", "m[1,1]", "m[1,2]"]
        );
    }

    #[test]
    fn test_set_value_refuses_kind_change() {
        let mut leaf = matrix().unwrap_array().remove(0);
        assert!(!leaf.set_value(VariableValue::Scalar("text".into())));
        assert_eq!(leaf.value, VariableValue::Scalar(Scalar::Number(0.0)));
        assert!(leaf.set_value(VariableValue::Scalar(Scalar::Number(9.0))));
        assert_eq!(leaf.value, VariableValue::Scalar(Scalar::Number(9.0)));

        let mut variable = matrix();
        assert!(!variable.set_value(VariableValue::Scalar(Scalar::Number(1.0))));
        assert!(!variable.set_cell(0, 0, Scalar::Boolean(true)));
        assert!(variable.set_cell(0, 0, Scalar::Number(-1.0)));
        assert_eq!(
            variable.value.as_array().and_then(|a| a.get(0, 0)),
            Some(&Scalar::Number(-1.0))
        );
    }

    #[test]
    fn test_parse_leaf_name() {
        assert_eq!(parse_leaf_name("m[1,2]"), Some(("m", 1, 2)));
        assert_eq!(parse_leaf_name("a[b][0, 3]"), Some(("a[b]", 0, 3)));
        assert_eq!(parse_leaf_name("m"), None);
        assert_eq!(parse_leaf_name("m[x,1]"), None);
    }

    #[test]
    fn test_apply_time_step() {
        let array: Array2<Scalar> = Array2::from_rows(vec![
            vec![0.0.into(), 10.0.into()],
            vec![1.0.into(), 20.0.into()],
            vec![2.0.into(), 30.0.into()],
            vec![3.0.into(), 40.0.into()],
        ])
        .unwrap();
        let mut variable = WorkspaceVariable::new("f", array);
        variable.assignments_to_hub = vec![
            AxisAssignment::independent(0).time_tagged(),
            AxisAssignment::dependent(1),
        ];

        variable.apply_time_step();
        assert_eq!(variable.time_tagged_values().len(), 4);

        variable.selected_time_step = 2.0;
        variable.is_averaged = true;
        // stale until re-applied
        assert_eq!(variable.time_tagged_values().len(), 4);
        variable.apply_time_step();
        assert_eq!(
            variable.time_tagged_values(),
            &[
                TimeTaggedValue {
                    time: 0.0,
                    values: vec![15.0]
                },
                TimeTaggedValue {
                    time: 2.0,
                    values: vec![35.0]
                }
            ]
        );
        assert_eq!(variable.value.as_array().map(|a| a.rows()), Some(4));
    }

    #[test]
    fn test_text_time_cell_is_skipped() {
        let array = Array2::from_rows(vec![
            vec![Scalar::Text("NaN".into()), 1.0.into()],
            vec![1.0.into(), 2.0.into()],
        ])
        .unwrap();
        let mut variable = WorkspaceVariable::new("f", array);
        variable.assignments_to_hub = vec![
            AxisAssignment::independent(0).time_tagged(),
            AxisAssignment::dependent(1),
        ];
        variable.selected_time_step = 1.0;
        variable.is_averaged = true;

        variable.apply_time_step();
        assert_eq!(
            variable.time_tagged_values(),
            &[TimeTaggedValue {
                time: 1.0,
                values: vec![2.0]
            }]
        );
    }

    #[test]
    fn test_dependent_axes_keep_their_position() {
        let array: Array2<Scalar> = Array2::from_rows(vec![
            vec![0.0.into(), 1.0.into(), "low".into(), 3.0.into()],
            vec![1.0.into(), 2.0.into(), "high".into(), 4.0.into()],
        ])
        .unwrap();
        let mut variable = WorkspaceVariable::new("f", array);
        variable.assignments_to_hub = vec![
            AxisAssignment::independent(0).time_tagged(),
            AxisAssignment::dependent(1),
            AxisAssignment::dependent(2),
            AxisAssignment::dependent(3),
        ];

        variable.apply_time_step();
        let rows = variable.time_tagged_values();
        assert_eq!(rows.len(), 2);
        for (row, expected) in rows.iter().zip([[1.0, 3.0], [2.0, 4.0]]) {
            assert_eq!(row.values.len(), 3);
            assert_eq!(row.values[0], expected[0]);
            assert!(row.values[1].is_nan());
            assert_eq!(row.values[2], expected[1]);
        }
    }
}
