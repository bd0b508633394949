//! Workspace values: scalars and rectangular 2-D arrays.

use std::fmt::Display;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// A single workspace value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Boolean(bool),
    Text(String),
}

/// The kind of a [`Scalar`], used to refuse assignments that would change it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    Number,
    Boolean,
    Text,
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Number(_) => ScalarKind::Number,
            Scalar::Boolean(_) => ScalarKind::Boolean,
            Scalar::Text(_) => ScalarKind::Text,
        }
    }

    /// The numeric reading of the value: numbers as-is, booleans as 0/1, text when it parses as a
    /// decimal number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Scalar::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Interpret a hub value string: decimal numbers become [`Scalar::Number`], `true`/`false`
    /// become [`Scalar::Boolean`], anything else stays text.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if let Ok(number) = trimmed.parse::<f64>() {
            return Scalar::Number(number);
        }
        match trimmed {
            "true" => Scalar::Boolean(true),
            "false" => Scalar::Boolean(false),
            _ => Scalar::Text(value.to_string()),
        }
    }
}

/// Invariant formatting, independent of any locale.
impl Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Boolean(b) => write!(f, "{b}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Boolean(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

/// A rectangular, row-major 2-D array of at least one cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Array2<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T> Array2<T> {
    /// Build an array from its row-major cells.
    pub fn from_shape_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, Error> {
        if rows == 0 || cols == 0 {
            return Err(Error::RaggedArray);
        }
        if data.len() != rows * cols {
            return Err(Error::ValueSetShape {
                expected: rows * cols,
                found: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, Error> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if cols == 0 || rows.iter().any(|row| row.len() != cols) {
            return Err(Error::RaggedArray);
        }
        let n_rows = rows.len();
        Self::from_shape_vec(n_rows, cols, rows.into_iter().flatten().collect())
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let data = (0..rows * cols).map(|i| f(i / cols, i % cols)).collect();
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        (row < self.rows && col < self.cols).then(|| &self.data[row * self.cols + col])
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        (row < self.rows && col < self.cols).then(|| &mut self.data[row * self.cols + col])
    }

    pub fn row(&self, row: usize) -> impl Iterator<Item = &T> {
        let start = row.min(self.rows) * self.cols;
        let end = if row < self.rows { start + self.cols } else { start };
        self.data[start..end].iter()
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = &T> {
        let cols = self.cols;
        self.data
            .iter()
            .skip(col)
            .step_by(cols.max(1))
            .take(if col < cols { self.rows } else { 0 })
    }

    /// Cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Array2<U> {
        Array2 {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }

    pub fn to_rows(&self) -> Vec<Vec<T>>
    where
        T: Clone,
    {
        self.data.chunks(self.cols.max(1)).map(<[T]>::to_vec).collect()
    }
}

impl<T: Clone> Array2<T> {
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |r, c| self.data[c * self.cols + r].clone())
    }
}

/// Serialized as a list of rows.
impl<T: Serialize> Serialize for Array2<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.data.chunks(self.cols.max(1)))
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Array2<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<Vec<T>>::deserialize(deserializer)?;
        Array2::from_rows(rows).map_err(D::Error::custom)
    }
}

/// The value of a workspace variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Scalar(Scalar),
    Array(Array2<Scalar>),
}

impl VariableValue {
    pub fn as_array(&self) -> Option<&Array2<Scalar>> {
        match self {
            VariableValue::Array(array) => Some(array),
            VariableValue::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            VariableValue::Scalar(scalar) => Some(scalar),
            VariableValue::Array(_) => None,
        }
    }
}

impl Display for VariableValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableValue::Scalar(scalar) => write!(f, "{scalar}"),
            VariableValue::Array(array) => {
                let (rows, cols) = array.shape();
                write!(f, "[{rows}x{cols}]")
            }
        }
    }
}

impl From<Scalar> for VariableValue {
    fn from(value: Scalar) -> Self {
        VariableValue::Scalar(value)
    }
}

impl From<Array2<Scalar>> for VariableValue {
    fn from(value: Array2<Scalar>) -> Self {
        VariableValue::Array(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_formatting() {
        assert_eq!(Scalar::Number(1.0).to_string(), "1");
        assert_eq!(Scalar::Number(-0.25).to_string(), "-0.25");
        assert_eq!(Scalar::Number(1234567.5).to_string(), "1234567.5");
        assert_eq!(Scalar::Boolean(true).to_string(), "true");
    }

    #[test]
    fn test_parse() {
        assert_eq!(Scalar::parse(" 2.5"), Scalar::Number(2.5));
        assert_eq!(Scalar::parse("-"), Scalar::Text("-".into()));
        assert_eq!(Scalar::parse("false"), Scalar::Boolean(false));
        assert_eq!(Scalar::Text("7".into()).as_f64(), Some(7.0));
    }

    #[test]
    fn test_array_access() {
        let array = Array2::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        assert_eq!(array.shape(), (2, 3));
        assert_eq!(array.get(1, 2), Some(&6));
        assert_eq!(array.get(2, 0), None);
        assert_eq!(array.row(1).copied().collect::<Vec<_>>(), [4, 5, 6]);
        assert_eq!(array.column(1).copied().collect::<Vec<_>>(), [2, 5]);
        assert_eq!(array.column(3).count(), 0);
        assert_eq!(array.transpose().get(2, 1), Some(&6));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        assert!(matches!(
            Array2::from_rows(vec![vec![1, 2], vec![3]]),
            Err(Error::RaggedArray)
        ));
        assert!(matches!(
            Array2::<i32>::from_rows(vec![]),
            Err(Error::RaggedArray)
        ));
    }

    #[test]
    fn test_variable_value_json() {
        let value: VariableValue = serde_json::from_str("[[1, 2], [3, \"x\"]]").unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.get(1, 0), Some(&Scalar::Number(3.0)));
        assert_eq!(array.get(1, 1), Some(&Scalar::Text("x".into())));
        assert_eq!(serde_json::to_string(&value).unwrap(), "[[1.0,2.0],[3.0,\"x\"]]");

        let value: VariableValue = serde_json::from_str("true").unwrap();
        assert_eq!(value, VariableValue::Scalar(Scalar::Boolean(true)));
    }
}
