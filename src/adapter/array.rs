//! Fixed-shape array parameters: validation, linearization and numeric conversion.

use hubmap_schema::{ArrayParameterType, MeasurementScale, ValueSet};

use crate::{
    value::{Array2, Scalar, VariableValue},
    Error,
};

/// The `(rows, cols)` shape a workspace array must have to hold a value of `ty`.
///
/// A rank 1 type `[n]` is a column vector `n x 1`.
pub fn shape(ty: &ArrayParameterType) -> Result<(usize, usize), Error> {
    match ty.dimension.as_slice() {
        &[n] => Ok((n, 1)),
        &[rows, cols] => Ok((rows, cols)),
        dimension => Err(Error::UnsupportedRank(dimension.len())),
    }
}

/// Whether `value` is an array of exactly the declared shape whose first cell the component type
/// accepts under `scale`.
pub fn validate(
    ty: &ArrayParameterType,
    value: &VariableValue,
    scale: Option<&MeasurementScale>,
) -> bool {
    let Some(array) = value.as_array() else {
        return false;
    };
    let Ok(shape) = shape(ty) else {
        return false;
    };

    array.shape() == shape
        && array
            .get(0, 0)
            .is_some_and(|cell| ty.component.accepts(&cell.to_string(), scale))
}

/// Arrange the authoritative values of `value_set` in the declared shape, row-major.
pub fn linearize(ty: &ArrayParameterType, value_set: &ValueSet) -> Result<Array2<String>, Error> {
    linearize_values(ty, value_set.actual_value())
}

/// Arrange `values` in the declared shape. The number of values must equal the number of cells.
pub fn linearize_values(
    ty: &ArrayParameterType,
    values: &[String],
) -> Result<Array2<String>, Error> {
    let (rows, cols) = shape(ty)?;
    if values.len() != rows * cols {
        return Err(Error::ValueSetShape {
            expected: rows * cols,
            found: values.len(),
        });
    }
    Array2::from_shape_vec(rows, cols, values.to_vec())
}

/// Like [`linearize`], parsing every cell as a decimal number.
///
/// If any cell fails to parse, the whole array is zero-filled.
pub fn to_numeric(ty: &ArrayParameterType, value_set: &ValueSet) -> Result<Array2<f64>, Error> {
    Ok(parse_or_zero(&linearize(ty, value_set)?))
}

pub fn parse_or_zero(cells: &Array2<String>) -> Array2<f64> {
    let parse = |cell: &String| cell.trim().parse::<f64>();
    if cells.iter().all(|cell| parse(cell).is_ok()) {
        cells.map(|cell| parse(cell).unwrap_or_default())
    } else {
        log::debug!("Non-numeric values, using a zero-filled array");
        Array2::filled(cells.rows(), cells.cols(), 0.0)
    }
}

/// The flat, row-major value array for a workspace array.
pub fn to_value_array(array: &Array2<Scalar>) -> Vec<String> {
    array.iter().map(ToString::to_string).collect()
}
