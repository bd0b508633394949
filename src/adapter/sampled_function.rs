//! Sampled-function parameters: axis decomposition of workspace arrays and the interleaved value
//! arrays of the hub.
//!
//! A sampled function declares ordered lists of independent and dependent axes. In the workspace
//! each axis is one column (or one row, see [`RowOrColumn`]) of a 2-D array, selected by an
//! [`AxisAssignment`]. On the hub the value array holds one tuple per sample, with the axes in
//! declaration order: independent axes first, then dependent axes.

use hubmap_schema::SampledFunctionParameterType;
use itertools::Itertools;

use super::time_tag::{mean, BucketCursor};
use crate::{
    value::{Array2, Scalar, VariableValue},
    variable::{AxisAssignment, AxisRole, RowOrColumn, WorkspaceVariable},
    Error,
};

/// The samples of one assigned axis.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisSeries {
    pub index: String,
    pub role: AxisRole,
    pub is_time_tagged: bool,
    pub values: Vec<Scalar>,
}

impl AxisSeries {
    /// The samples as numbers, if every one of them has a numeric reading.
    pub fn numeric(&self) -> Option<Vec<f64>> {
        self.values.iter().map(Scalar::as_f64).collect()
    }

    /// The samples as numbers, `NaN` where a sample has no numeric reading.
    pub fn numeric_or_nan(&self) -> Vec<f64> {
        self.values
            .iter()
            .map(|v| v.as_f64().unwrap_or(f64::NAN))
            .collect()
    }

    /// Column name used in tables and record batches.
    pub fn label(&self) -> String {
        let role = match self.role {
            AxisRole::Independent => "independent",
            AxisRole::Dependent => "dependent",
        };
        if self.is_time_tagged {
            format!("{role}[{}] (time)", self.index)
        } else {
            format!("{role}[{}]", self.index)
        }
    }
}

/// The assignments in declaration order: independent first, then dependent, each keeping the
/// relative order it was given in.
pub fn ordered(assignments: &[AxisAssignment]) -> Vec<AxisAssignment> {
    let (independent, dependent): (Vec<_>, Vec<_>) = assignments
        .iter()
        .cloned()
        .partition(|a| a.role == AxisRole::Independent);
    independent.into_iter().chain(dependent).collect()
}

/// Whether `value` can be mapped to `ty` with the given layout and assignments.
///
/// The independent and dependent assignment counts must match the declared axes, at most one
/// assignment may be time-tagged, and the first sample of every assigned row or column must be
/// accepted by its axis type and scale.
pub fn validate(
    ty: &SampledFunctionParameterType,
    value: &VariableValue,
    orientation: RowOrColumn,
    assignments: &[AxisAssignment],
) -> bool {
    let Some(array) = value.as_array() else {
        return false;
    };

    let (independent, dependent): (Vec<_>, Vec<_>) = assignments
        .iter()
        .partition(|a| a.role == AxisRole::Independent);
    if independent.len() != ty.independent_parameter_type.len()
        || dependent.len() != ty.dependent_parameter_type.len()
        || assignments.iter().filter(|a| a.is_time_tagged).count() > 1
    {
        return false;
    }

    independent
        .iter()
        .zip(&ty.independent_parameter_type)
        .chain(dependent.iter().zip(&ty.dependent_parameter_type))
        .all(|(assignment, axis)| {
            let cell = assignment.position().and_then(|index| match orientation {
                RowOrColumn::Column => array.get(0, index),
                RowOrColumn::Row => array.get(index, 0),
            });
            cell.is_some_and(|cell| {
                axis.parameter_type
                    .accepts(&cell.to_string(), axis.measurement_scale.as_ref())
            })
        })
}

/// Extract the full column (or row) of every assignment, in assignment order.
pub fn decompose(
    array: &Array2<Scalar>,
    orientation: RowOrColumn,
    assignments: &[AxisAssignment],
) -> Result<Vec<AxisSeries>, Error> {
    assignments
        .iter()
        .map(|assignment| {
            let values: Option<Vec<Scalar>> =
                assignment.position().and_then(|index| match orientation {
                    RowOrColumn::Column if index < array.cols() => {
                        Some(array.column(index).cloned().collect())
                    }
                    RowOrColumn::Row if index < array.rows() => {
                        Some(array.row(index).cloned().collect())
                    }
                    _ => None,
                });

            let values = values.ok_or_else(|| Error::AxisIndex {
                index: assignment.index.clone(),
                rows: array.rows(),
                cols: array.cols(),
            })?;

            Ok(AxisSeries {
                index: assignment.index.clone(),
                role: assignment.role,
                is_time_tagged: assignment.is_time_tagged,
                values,
            })
        })
        .collect()
}

/// The interleaved hub value array for a workspace variable, using its hub-bound orientation,
/// assignments and time step.
///
/// When an axis is time-tagged and the time step is positive, the samples are resampled: numeric
/// axes take the mean of each bucket, other axes its first sample, and the time axis the bucket
/// time.
pub fn to_value_array(variable: &WorkspaceVariable) -> Result<Vec<String>, Error> {
    let array = variable.value.as_array().ok_or_else(|| {
        Error::invalid_mapping(&variable.name, "a sampled function needs an array value")
    })?;
    let series = decompose(
        array,
        variable.orientation_to_hub,
        &ordered(&variable.assignments_to_hub),
    )?;
    let samples = series.first().map_or(0, |s| s.values.len());

    let time = series
        .iter()
        .position(|s| s.is_time_tagged)
        .filter(|_| variable.selected_time_step > 0.0)
        .and_then(|t| series[t].numeric().map(|time| (t, time)));

    let Some((time_axis, time)) = time else {
        return Ok((0..samples)
            .flat_map(|i| series.iter().map(move |s| s.values[i].to_string()))
            .collect());
    };

    let numeric: Vec<Option<Vec<f64>>> = series.iter().map(AxisSeries::numeric).collect();
    let mut cursor = BucketCursor::new(&time, variable.is_averaged, variable.selected_time_step);
    let mut values = Vec::new();
    while let Some(bucket) = cursor.next_bucket(&time) {
        for (axis, s) in series.iter().enumerate() {
            let value = match &numeric[axis] {
                _ if axis == time_axis => bucket.time.to_string(),
                Some(numbers) => mean(numbers, &bucket.indices).to_string(),
                None => s.values[bucket.indices[0]].to_string(),
            };
            values.push(value);
        }
    }
    Ok(values)
}

/// Lay out a hub value array as a workspace array, one column (or row) per axis.
///
/// Axis `k` of the declaration lands at the position given by the `k`-th assignment in
/// declaration order; without a complete set of assignments the axes keep declaration order.
pub fn reshape(
    ty: &SampledFunctionParameterType,
    values: &[String],
    orientation: RowOrColumn,
    assignments: &[AxisAssignment],
) -> Result<Array2<String>, Error> {
    let axes = ty.axis_count();
    if axes == 0 {
        return Err(Error::UnsupportedRank(0));
    }
    if values.is_empty() || values.len() % axes != 0 {
        return Err(Error::ValueSetShape {
            expected: values.len().div_ceil(axes).max(1) * axes,
            found: values.len(),
        });
    }
    let samples = values.len() / axes;

    // column -> axis
    let identity: Vec<usize> = (0..axes).collect();
    let positions: Option<Vec<usize>> = ordered(assignments)
        .iter()
        .map(AxisAssignment::position)
        .collect();
    let column_axis = match positions {
        Some(positions) if positions.len() == axes && positions.iter().all_unique() => {
            let mut column_axis = identity.clone();
            for (axis, &position) in positions.iter().enumerate() {
                match column_axis.get_mut(position) {
                    Some(slot) => *slot = axis,
                    None => return Ok(by_column(values, samples, axes, &identity, orientation)),
                }
            }
            column_axis
        }
        _ => identity,
    };

    Ok(by_column(values, samples, axes, &column_axis, orientation))
}

fn by_column(
    values: &[String],
    samples: usize,
    axes: usize,
    column_axis: &[usize],
    orientation: RowOrColumn,
) -> Array2<String> {
    let columns = Array2::from_fn(samples, axes, |sample, column| {
        values[sample * axes + column_axis[column]].clone()
    });
    match orientation {
        RowOrColumn::Column => columns,
        RowOrColumn::Row => columns.transpose(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubmap_schema::{new_id, AxisTypeAssignment, ScalarParameterType, ScalarTypeKind};

    fn axis(name: &str) -> AxisTypeAssignment {
        AxisTypeAssignment {
            parameter_type: ScalarParameterType {
                iid: new_id(),
                name: name.into(),
                short_name: name.into(),
                kind: ScalarTypeKind::Quantity {
                    possible_scales: vec![],
                    default_scale: None,
                },
            },
            measurement_scale: None,
        }
    }

    fn function(independent: usize, dependent: usize) -> SampledFunctionParameterType {
        SampledFunctionParameterType {
            iid: new_id(),
            name: "function".into(),
            short_name: "f".into(),
            independent_parameter_type: (0..independent).map(|_| axis("x")).collect(),
            dependent_parameter_type: (0..dependent).map(|_| axis("y")).collect(),
        }
    }

    /// 4 samples, columns `[y, t]`
    fn samples() -> Array2<Scalar> {
        Array2::from_fn(4, 2, |r, c| {
            Scalar::Number(if c == 0 { 10.0 * (r + 1) as f64 } else { r as f64 })
        })
    }

    #[test]
    fn test_validate() {
        let ty = function(1, 1);
        let value = VariableValue::Array(samples());
        let assignments = [AxisAssignment::independent(1), AxisAssignment::dependent(0)];

        assert!(validate(&ty, &value, RowOrColumn::Column, &assignments));
        // wrong counts
        assert!(!validate(&ty, &value, RowOrColumn::Column, &assignments[..1]));
        // index outside the array
        assert!(!validate(
            &ty,
            &value,
            RowOrColumn::Column,
            &[AxisAssignment::independent(5), AxisAssignment::dependent(0)]
        ));
        // two time-tagged axes
        assert!(!validate(
            &ty,
            &value,
            RowOrColumn::Column,
            &[
                AxisAssignment::independent(1).time_tagged(),
                AxisAssignment::dependent(0).time_tagged()
            ]
        ));
        // text where a quantity is declared
        let text = VariableValue::Array(Array2::filled(2, 2, Scalar::Text("a".into())));
        assert!(!validate(&ty, &text, RowOrColumn::Column, &assignments));
    }

    #[test]
    fn test_decompose() {
        let assignments = [AxisAssignment::independent(1), AxisAssignment::dependent(0)];
        let series = decompose(&samples(), RowOrColumn::Column, &assignments).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].numeric(), Some(vec![0.0, 1.0, 2.0, 3.0]));
        assert_eq!(series[1].numeric(), Some(vec![10.0, 20.0, 30.0, 40.0]));

        let rows = samples().transpose();
        let series = decompose(&rows, RowOrColumn::Row, &assignments).unwrap();
        assert_eq!(series[1].values.len(), 4);

        assert!(matches!(
            decompose(&rows, RowOrColumn::Row, &[AxisAssignment::dependent(2)]),
            Err(Error::AxisIndex { rows: 2, cols: 4, .. })
        ));
    }

    #[test]
    fn test_to_value_array() {
        let mut variable = WorkspaceVariable::new("f", samples());
        variable.assignments_to_hub =
            vec![AxisAssignment::dependent(0), AxisAssignment::independent(1).time_tagged()];
        assert_eq!(
            to_value_array(&variable).unwrap(),
            ["0", "10", "1", "20", "2", "30", "3", "40"]
        );

        variable.selected_time_step = 2.0;
        variable.is_averaged = true;
        assert_eq!(to_value_array(&variable).unwrap(), ["0", "15", "2", "35"]);

        variable.is_averaged = false;
        assert_eq!(to_value_array(&variable).unwrap(), ["0", "10", "2", "30"]);
    }

    #[test]
    fn test_reshape() {
        let ty = function(1, 1);
        let values: Vec<String> = ["0", "10", "1", "20", "2", "30"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let assignments = [AxisAssignment::independent(1), AxisAssignment::dependent(0)];

        let columns = reshape(&ty, &values, RowOrColumn::Column, &assignments).unwrap();
        assert_eq!(columns.shape(), (3, 2));
        assert_eq!(columns.row(2).collect::<Vec<_>>(), ["30", "2"]);

        let rows = reshape(&ty, &values, RowOrColumn::Row, &[]).unwrap();
        assert_eq!(rows.shape(), (2, 3));
        assert_eq!(rows.row(0).collect::<Vec<_>>(), ["0", "1", "2"]);

        assert!(matches!(
            reshape(&ty, &values[..5], RowOrColumn::Column, &[]),
            Err(Error::ValueSetShape {
                expected: 6,
                found: 5
            })
        ));
    }
}
