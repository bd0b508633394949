//! Parameter types and measurement scales.
//!
//! A parameter is typed either by a scalar type, by an array type of fixed rectangular shape with
//! a single component type, or by a sampled function type with ordered lists of independent and
//! dependent axis types.

use crate::Id;

/// The set of numbers a [`MeasurementScale`] admits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumberSetKind {
    NaturalNumberSet,
    IntegerNumberSet,
    RationalNumberSet,
    #[default]
    RealNumberSet,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeasurementScale {
    pub iid: Id,
    pub name: String,
    pub short_name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub number_set: NumberSetKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub minimum_permissible_value: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_minimum_inclusive: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub maximum_permissible_value: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_maximum_inclusive: bool,
}

impl MeasurementScale {
    /// Whether `value` belongs to the number set and lies within the permissible bounds.
    pub fn admits(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }

        let in_set = match self.number_set {
            NumberSetKind::NaturalNumberSet => value.fract() == 0.0 && value >= 0.0,
            NumberSetKind::IntegerNumberSet => value.fract() == 0.0,
            NumberSetKind::RationalNumberSet | NumberSetKind::RealNumberSet => true,
        };

        let above_min = match self.minimum_permissible_value {
            Some(min) if self.is_minimum_inclusive => value >= min,
            Some(min) => value > min,
            None => true,
        };

        let below_max = match self.maximum_permissible_value {
            Some(max) if self.is_maximum_inclusive => value <= max,
            Some(max) => value < max,
            None => true,
        };

        in_set && above_min && below_max
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalarTypeKind {
    /// A physical quantity, measured on one of `possible_scales`.
    Quantity {
        #[cfg_attr(feature = "serde", serde(default))]
        possible_scales: Vec<Id>,
        #[cfg_attr(feature = "serde", serde(default))]
        default_scale: Option<Id>,
    },
    Boolean,
    Text,
    /// Accepts one of the literal short names.
    Enumeration { literals: Vec<String> },
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScalarParameterType {
    pub iid: Id,
    pub name: String,
    pub short_name: String,
    pub kind: ScalarTypeKind,
}

impl ScalarParameterType {
    /// Whether the invariant-formatted `value` is acceptable for this type under `scale`.
    pub fn accepts(&self, value: &str, scale: Option<&MeasurementScale>) -> bool {
        let value = value.trim();
        match &self.kind {
            ScalarTypeKind::Quantity { .. } => match value.parse::<f64>() {
                Ok(number) => scale.map_or(number.is_finite(), |scale| scale.admits(number)),
                Err(_) => false,
            },
            ScalarTypeKind::Boolean => matches!(
                value.to_ascii_lowercase().as_str(),
                "true" | "false" | "0" | "1"
            ),
            ScalarTypeKind::Text => true,
            ScalarTypeKind::Enumeration { literals } => literals.iter().any(|l| l == value),
        }
    }

    pub fn is_quantity(&self) -> bool {
        matches!(self.kind, ScalarTypeKind::Quantity { .. })
    }
}

/// A fixed rectangular array type whose cells are all of one component type.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrayParameterType {
    pub iid: Id,
    pub name: String,
    pub short_name: String,
    /// Declared length of each axis, outermost first.
    pub dimension: Vec<usize>,
    pub component: ScalarParameterType,
}

impl ArrayParameterType {
    pub fn rank(&self) -> usize {
        self.dimension.len()
    }

    /// Number of cells, the product of the declared dimensions.
    pub fn len(&self) -> usize {
        self.dimension.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One declared axis of a sampled function.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisTypeAssignment {
    pub parameter_type: ScalarParameterType,
    #[cfg_attr(feature = "serde", serde(default))]
    pub measurement_scale: Option<MeasurementScale>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampledFunctionParameterType {
    pub iid: Id,
    pub name: String,
    pub short_name: String,
    pub independent_parameter_type: Vec<AxisTypeAssignment>,
    pub dependent_parameter_type: Vec<AxisTypeAssignment>,
}

impl SampledFunctionParameterType {
    /// Total number of axes; the length of one sample tuple in a value set.
    pub fn axis_count(&self) -> usize {
        self.independent_parameter_type.len() + self.dependent_parameter_type.len()
    }

    /// All axes in declaration order, independent axes first.
    pub fn axes(&self) -> impl Iterator<Item = &AxisTypeAssignment> {
        self.independent_parameter_type
            .iter()
            .chain(&self.dependent_parameter_type)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParameterType {
    Scalar(ScalarParameterType),
    Array(ArrayParameterType),
    SampledFunction(SampledFunctionParameterType),
}

impl ParameterType {
    pub fn iid(&self) -> Id {
        match self {
            ParameterType::Scalar(t) => t.iid,
            ParameterType::Array(t) => t.iid,
            ParameterType::SampledFunction(t) => t.iid,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ParameterType::Scalar(t) => &t.name,
            ParameterType::Array(t) => &t.name,
            ParameterType::SampledFunction(t) => &t.name,
        }
    }

    pub fn short_name(&self) -> &str {
        match self {
            ParameterType::Scalar(t) => &t.short_name,
            ParameterType::Array(t) => &t.short_name,
            ParameterType::SampledFunction(t) => &t.short_name,
        }
    }

    /// Number of values one value set array holds for this type, when it is fixed.
    ///
    /// Sampled functions hold a variable number of samples and return `None`.
    pub fn number_of_values(&self) -> Option<usize> {
        match self {
            ParameterType::Scalar(_) => Some(1),
            ParameterType::Array(t) => Some(t.len()),
            ParameterType::SampledFunction(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_id;

    fn scale(number_set: NumberSetKind) -> MeasurementScale {
        MeasurementScale {
            iid: new_id(),
            name: "metre".into(),
            short_name: "m".into(),
            number_set,
            minimum_permissible_value: Some(0.0),
            is_minimum_inclusive: true,
            maximum_permissible_value: Some(10.0),
            is_maximum_inclusive: false,
        }
    }

    fn quantity() -> ScalarParameterType {
        ScalarParameterType {
            iid: new_id(),
            name: "length".into(),
            short_name: "l".into(),
            kind: ScalarTypeKind::Quantity {
                possible_scales: vec![],
                default_scale: None,
            },
        }
    }

    #[test]
    fn test_quantity_accepts_numbers_within_scale() {
        let ty = quantity();
        let real = scale(NumberSetKind::RealNumberSet);
        assert!(ty.accepts("0", Some(&real)));
        assert!(ty.accepts("9.99", Some(&real)));
        assert!(!ty.accepts("10", Some(&real)));
        assert!(!ty.accepts("-0.1", Some(&real)));
        assert!(!ty.accepts("abc", Some(&real)));
        assert!(ty.accepts("-1e3", None));
    }

    #[test]
    fn test_integer_scales() {
        let ty = quantity();
        let natural = scale(NumberSetKind::NaturalNumberSet);
        assert!(ty.accepts("3", Some(&natural)));
        assert!(!ty.accepts("3.5", Some(&natural)));

        let mut integer = scale(NumberSetKind::IntegerNumberSet);
        integer.minimum_permissible_value = None;
        assert!(integer.admits(-4.0));
        assert!(!integer.admits(f64::NAN));
    }

    #[test]
    fn test_other_kinds() {
        let boolean = ScalarParameterType {
            kind: ScalarTypeKind::Boolean,
            ..quantity()
        };
        assert!(boolean.accepts("True", None));
        assert!(boolean.accepts("0", None));
        assert!(!boolean.accepts("2", None));

        let enumeration = ScalarParameterType {
            kind: ScalarTypeKind::Enumeration {
                literals: vec!["on".into(), "off".into()],
            },
            ..quantity()
        };
        assert!(enumeration.accepts("off", None));
        assert!(!enumeration.accepts("standby", None));
    }

    #[test]
    fn test_array_len() {
        let ty = ArrayParameterType {
            iid: new_id(),
            name: "matrix".into(),
            short_name: "m".into(),
            dimension: vec![3, 2],
            component: quantity(),
        };
        assert_eq!(ty.rank(), 2);
        assert_eq!(ty.len(), 6);
        assert_eq!(ParameterType::Array(ty).number_of_values(), Some(6));
    }
}
