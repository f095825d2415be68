//! Columnar storage for node, relationship and graph properties.
//!
//! Each property key owns one [`PropertyValues`] column: a contiguous,
//! ordinal-indexed array of a single declared [`ValueType`]. Slots that were
//! never written read back as the column's default value.

use crate::graph::error::GraphStoreError;
use crate::graph::property::{PropertyValue, ValueType};
use thiserror::Error;

/// Errors raised by a single column, before a property key is attached
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ColumnError {
    #[error("expected {expected}, got {actual}")]
    TypeMismatch { expected: ValueType, actual: ValueType },

    #[error("array of length {actual} does not match stride {stride}")]
    StrideMismatch { stride: usize, actual: usize },
}

impl ColumnError {
    /// Attach the property key the column is stored under
    pub fn for_key(self, key: &str) -> GraphStoreError {
        match self {
            ColumnError::TypeMismatch { expected, actual } => GraphStoreError::TypeMismatch {
                key: key.to_string(),
                expected,
                actual,
            },
            ColumnError::StrideMismatch { stride, actual } => {
                GraphStoreError::ColumnLengthMismatch {
                    key: key.to_string(),
                    expected: stride,
                    actual,
                }
            }
        }
    }
}

/// How array values are laid out for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLayout {
    /// Every entry has exactly `stride` elements, stored back to back.
    Fixed(usize),
    /// Entries may differ in length; each one is its own contiguous buffer.
    Variable,
}

/// Array-valued column (embeddings, feature vectors)
#[derive(Debug, Clone)]
pub enum ArrayColumn<T> {
    Fixed {
        stride: usize,
        values: Vec<T>,
        present: Vec<bool>,
    },
    Variable {
        slots: Vec<Option<Box<[T]>>>,
    },
}

impl<T: Copy + Default> ArrayColumn<T> {
    fn new(layout: ArrayLayout) -> Self {
        match layout {
            ArrayLayout::Fixed(stride) => ArrayColumn::Fixed {
                stride,
                values: Vec::new(),
                present: Vec::new(),
            },
            ArrayLayout::Variable => ArrayColumn::Variable { slots: Vec::new() },
        }
    }

    fn layout(&self) -> ArrayLayout {
        match self {
            ArrayColumn::Fixed { stride, .. } => ArrayLayout::Fixed(*stride),
            ArrayColumn::Variable { .. } => ArrayLayout::Variable,
        }
    }

    fn len(&self) -> usize {
        match self {
            ArrayColumn::Fixed { present, .. } => present.len(),
            ArrayColumn::Variable { slots } => slots.len(),
        }
    }

    fn get(&self, idx: usize) -> Option<&[T]> {
        match self {
            ArrayColumn::Fixed {
                stride,
                values,
                present,
            } => {
                if *present.get(idx)? {
                    Some(&values[idx * stride..(idx + 1) * stride])
                } else {
                    None
                }
            }
            ArrayColumn::Variable { slots } => slots.get(idx)?.as_deref(),
        }
    }

    fn set(&mut self, idx: usize, value: &[T]) -> Result<(), ColumnError> {
        match self {
            ArrayColumn::Fixed {
                stride,
                values,
                present,
            } => {
                if value.len() != *stride {
                    return Err(ColumnError::StrideMismatch {
                        stride: *stride,
                        actual: value.len(),
                    });
                }
                if idx >= present.len() {
                    present.resize(idx + 1, false);
                    values.resize((idx + 1) * *stride, T::default());
                }
                values[idx * *stride..(idx + 1) * *stride].copy_from_slice(value);
                present[idx] = true;
            }
            ArrayColumn::Variable { slots } => {
                if idx >= slots.len() {
                    slots.resize(idx + 1, None);
                }
                slots[idx] = Some(value.into());
            }
        }
        Ok(())
    }

    fn memory_usage(&self) -> usize {
        let elem = std::mem::size_of::<T>();
        match self {
            ArrayColumn::Fixed {
                values, present, ..
            } => values.len() * elem + present.len(),
            ArrayColumn::Variable { slots } => slots
                .iter()
                .map(|s| std::mem::size_of::<Option<Box<[T]>>>() + s.as_ref().map_or(0, |b| b.len() * elem))
                .sum(),
        }
    }
}

/// A single property column.
#[derive(Debug, Clone)]
pub enum Column {
    Long(Vec<i64>),
    Double(Vec<f64>),
    Boolean(Vec<bool>),
    String(Vec<Option<String>>),
    LongArray(ArrayColumn<i64>),
    DoubleArray(ArrayColumn<f64>),
}

impl Column {
    fn new(value_type: ValueType, layout: ArrayLayout) -> Self {
        match value_type {
            ValueType::Long => Column::Long(Vec::new()),
            ValueType::Double => Column::Double(Vec::new()),
            ValueType::Boolean => Column::Boolean(Vec::new()),
            ValueType::String => Column::String(Vec::new()),
            ValueType::LongArray => Column::LongArray(ArrayColumn::new(layout)),
            ValueType::DoubleArray => Column::DoubleArray(ArrayColumn::new(layout)),
        }
    }

    fn len(&self) -> usize {
        match self {
            Column::Long(v) => v.len(),
            Column::Double(v) => v.len(),
            Column::Boolean(v) => v.len(),
            Column::String(v) => v.len(),
            Column::LongArray(c) => c.len(),
            Column::DoubleArray(c) => c.len(),
        }
    }
}

/// Typed, ordinal-indexed property column with a declared default.
///
/// Physical storage may be shorter than the addressable domain: indices past
/// the written range read as the default, and writes extend the column with
/// default-filled slots. The owning store validates ordinals against its
/// domain before calling in.
#[derive(Debug, Clone)]
pub struct PropertyValues {
    value_type: ValueType,
    default_value: PropertyValue,
    column: Column,
}

impl PropertyValues {
    /// Empty column using the type's fallback default
    pub fn empty(value_type: ValueType) -> Self {
        PropertyValues {
            value_type,
            default_value: value_type.fallback_default(),
            column: Column::new(value_type, ArrayLayout::Variable),
        }
    }

    /// Empty column with an explicit default
    pub fn with_default(
        value_type: ValueType,
        default_value: PropertyValue,
    ) -> Result<Self, ColumnError> {
        if default_value.value_type() != value_type {
            return Err(ColumnError::TypeMismatch {
                expected: value_type,
                actual: default_value.value_type(),
            });
        }
        Ok(PropertyValues {
            value_type,
            default_value,
            column: Column::new(value_type, ArrayLayout::Variable),
        })
    }

    /// Empty array column with a fixed stride per entry; unset entries read
    /// as `stride` zeros.
    pub fn fixed_array(value_type: ValueType, stride: usize) -> Result<Self, ColumnError> {
        let default_value = match value_type {
            ValueType::LongArray => PropertyValue::LongArray(vec![0; stride]),
            ValueType::DoubleArray => PropertyValue::DoubleArray(vec![0.0; stride]),
            other => {
                return Err(ColumnError::TypeMismatch {
                    expected: ValueType::DoubleArray,
                    actual: other,
                })
            }
        };
        Self::fixed_array_with_default(value_type, stride, default_value)
    }

    /// Empty fixed-stride array column whose default has exactly `stride` elements
    pub fn fixed_array_with_default(
        value_type: ValueType,
        stride: usize,
        default_value: PropertyValue,
    ) -> Result<Self, ColumnError> {
        if !value_type.is_array() || default_value.value_type() != value_type {
            return Err(ColumnError::TypeMismatch {
                expected: value_type,
                actual: default_value.value_type(),
            });
        }
        let default_len = match &default_value {
            PropertyValue::LongArray(a) => a.len(),
            PropertyValue::DoubleArray(a) => a.len(),
            _ => 0,
        };
        if default_len != stride {
            return Err(ColumnError::StrideMismatch {
                stride,
                actual: default_len,
            });
        }
        Ok(PropertyValues {
            value_type,
            default_value,
            column: Column::new(value_type, ArrayLayout::Fixed(stride)),
        })
    }

    /// Empty column with this column's type, default and array layout
    pub fn empty_like(&self) -> Self {
        PropertyValues {
            value_type: self.value_type,
            default_value: self.default_value.clone(),
            column: Column::new(
                self.value_type,
                self.array_layout().unwrap_or(ArrayLayout::Variable),
            ),
        }
    }

    /// Dense `Long` column, one value per ordinal
    pub fn from_longs(values: Vec<i64>, default_value: i64) -> Self {
        PropertyValues {
            value_type: ValueType::Long,
            default_value: PropertyValue::Long(default_value),
            column: Column::Long(values),
        }
    }

    /// Dense `Double` column, one value per ordinal
    pub fn from_doubles(values: Vec<f64>, default_value: f64) -> Self {
        PropertyValues {
            value_type: ValueType::Double,
            default_value: PropertyValue::Double(default_value),
            column: Column::Double(values),
        }
    }

    /// Column built from dynamic values; every value must match `value_type`.
    pub fn from_values(
        value_type: ValueType,
        default_value: PropertyValue,
        values: impl IntoIterator<Item = PropertyValue>,
    ) -> Result<Self, ColumnError> {
        let mut column = Self::with_default(value_type, default_value)?;
        for (idx, value) in values.into_iter().enumerate() {
            column.set(idx, value)?;
        }
        Ok(column)
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn default_value(&self) -> &PropertyValue {
        &self.default_value
    }

    /// Stride of a fixed-layout array column
    pub fn array_layout(&self) -> Option<ArrayLayout> {
        match &self.column {
            Column::LongArray(c) => Some(c.layout()),
            Column::DoubleArray(c) => Some(c.layout()),
            _ => None,
        }
    }

    /// Number of physically stored slots
    pub fn len(&self) -> usize {
        self.column.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct access to the underlying column for bulk scans
    pub fn column(&self) -> &Column {
        &self.column
    }

    /// Read one slot; unset slots yield the default.
    pub fn get(&self, idx: usize) -> PropertyValue {
        let value = match &self.column {
            Column::Long(v) => v.get(idx).map(|&x| PropertyValue::Long(x)),
            Column::Double(v) => v.get(idx).map(|&x| PropertyValue::Double(x)),
            Column::Boolean(v) => v.get(idx).map(|&x| PropertyValue::Boolean(x)),
            Column::String(v) => v
                .get(idx)
                .and_then(|o| o.as_ref())
                .map(|s| PropertyValue::String(s.clone())),
            Column::LongArray(c) => c.get(idx).map(|a| PropertyValue::LongArray(a.to_vec())),
            Column::DoubleArray(c) => c.get(idx).map(|a| PropertyValue::DoubleArray(a.to_vec())),
        };
        value.unwrap_or_else(|| self.default_value.clone())
    }

    pub fn long_value(&self, idx: usize) -> Option<i64> {
        match &self.column {
            Column::Long(v) => v.get(idx).copied().or_else(|| self.default_value.as_long()),
            _ => None,
        }
    }

    pub fn double_value(&self, idx: usize) -> Option<f64> {
        match &self.column {
            Column::Double(v) => v.get(idx).copied().or_else(|| self.default_value.as_double()),
            _ => None,
        }
    }

    /// Scalar numeric slot as `f64`; `None` for non-scalar columns
    #[inline]
    pub fn f64_value(&self, idx: usize) -> Option<f64> {
        let stored = match &self.column {
            Column::Long(v) => v.get(idx).map(|&x| x as f64),
            Column::Double(v) => v.get(idx).copied(),
            Column::Boolean(v) => v.get(idx).map(|&b| if b { 1.0 } else { 0.0 }),
            _ => return None,
        };
        stored.or_else(|| self.default_value.as_f64())
    }

    pub fn string_value(&self, idx: usize) -> Option<&str> {
        match &self.column {
            Column::String(v) => v
                .get(idx)
                .and_then(|o| o.as_deref())
                .or_else(|| self.default_value.as_str()),
            _ => None,
        }
    }

    pub fn double_array_value(&self, idx: usize) -> Option<&[f64]> {
        match &self.column {
            Column::DoubleArray(c) => c.get(idx).or_else(|| self.default_value.as_double_array()),
            _ => None,
        }
    }

    pub fn long_array_value(&self, idx: usize) -> Option<&[i64]> {
        match &self.column {
            Column::LongArray(c) => c.get(idx).or_else(|| self.default_value.as_long_array()),
            _ => None,
        }
    }

    /// Write one slot, extending the column with defaults if needed.
    pub fn set(&mut self, idx: usize, value: PropertyValue) -> Result<(), ColumnError> {
        let mismatch = ColumnError::TypeMismatch {
            expected: self.value_type,
            actual: value.value_type(),
        };
        match (&mut self.column, value) {
            (Column::Long(v), PropertyValue::Long(x)) => {
                let fill = self.default_value.as_long().unwrap_or_default();
                if idx >= v.len() {
                    v.resize(idx + 1, fill);
                }
                v[idx] = x;
            }
            (Column::Double(v), PropertyValue::Double(x)) => {
                let fill = self.default_value.as_double().unwrap_or_default();
                if idx >= v.len() {
                    v.resize(idx + 1, fill);
                }
                v[idx] = x;
            }
            (Column::Boolean(v), PropertyValue::Boolean(x)) => {
                let fill = self.default_value.as_boolean().unwrap_or_default();
                if idx >= v.len() {
                    v.resize(idx + 1, fill);
                }
                v[idx] = x;
            }
            (Column::String(v), PropertyValue::String(x)) => {
                if idx >= v.len() {
                    v.resize(idx + 1, None);
                }
                v[idx] = Some(x);
            }
            (Column::LongArray(c), PropertyValue::LongArray(x)) => c.set(idx, &x)?,
            (Column::DoubleArray(c), PropertyValue::DoubleArray(x)) => c.set(idx, &x)?,
            _ => return Err(mismatch),
        }
        Ok(())
    }

    /// Estimated heap footprint in bytes
    pub fn memory_usage(&self) -> usize {
        match &self.column {
            Column::Long(v) => v.len() * std::mem::size_of::<i64>(),
            Column::Double(v) => v.len() * std::mem::size_of::<f64>(),
            Column::Boolean(v) => v.len(),
            Column::String(v) => v
                .iter()
                .map(|s| std::mem::size_of::<Option<String>>() + s.as_ref().map_or(0, |s| s.len()))
                .sum(),
            Column::LongArray(c) => c.memory_usage(),
            Column::DoubleArray(c) => c.memory_usage(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_reads_default() {
        let col = PropertyValues::with_default(ValueType::Long, PropertyValue::Long(0)).unwrap();
        for idx in [0, 5, 1_000] {
            assert_eq!(col.get(idx), PropertyValue::Long(0));
            assert_eq!(col.long_value(idx), Some(0));
        }
    }

    #[test]
    fn test_set_extends_with_default() {
        let mut col =
            PropertyValues::with_default(ValueType::Double, PropertyValue::Double(1.5)).unwrap();
        col.set(3, PropertyValue::Double(9.0)).unwrap();
        assert_eq!(col.len(), 4);
        assert_eq!(col.double_value(0), Some(1.5));
        assert_eq!(col.double_value(3), Some(9.0));
        assert_eq!(col.double_value(4), Some(1.5));
    }

    #[test]
    fn test_type_mismatch() {
        let mut col = PropertyValues::empty(ValueType::Long);
        let err = col.set(0, PropertyValue::Double(1.0)).unwrap_err();
        assert_eq!(
            err,
            ColumnError::TypeMismatch {
                expected: ValueType::Long,
                actual: ValueType::Double
            }
        );
        assert!(col.is_empty());

        let err = PropertyValues::with_default(ValueType::Long, "x".into()).unwrap_err();
        assert!(matches!(err, ColumnError::TypeMismatch { .. }));
    }

    #[test]
    fn test_fixed_array_layout() {
        let mut col = PropertyValues::fixed_array(ValueType::DoubleArray, 3).unwrap();
        col.set(1, vec![1.0, 2.0, 3.0].into()).unwrap();
        assert_eq!(col.double_array_value(1), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(col.double_array_value(0), Some(&[0.0, 0.0, 0.0][..]));
        assert_eq!(col.get(5), PropertyValue::DoubleArray(vec![0.0; 3]));
        assert_eq!(col.array_layout(), Some(ArrayLayout::Fixed(3)));

        let err = col.set(2, vec![1.0].into()).unwrap_err();
        assert_eq!(err, ColumnError::StrideMismatch { stride: 3, actual: 1 });

        let err = PropertyValues::fixed_array(ValueType::Long, 3).unwrap_err();
        assert!(matches!(err, ColumnError::TypeMismatch { .. }));
    }

    #[test]
    fn test_fixed_array_explicit_default() {
        let col = PropertyValues::fixed_array_with_default(
            ValueType::LongArray,
            2,
            PropertyValue::LongArray(vec![-1, -1]),
        )
        .unwrap();
        assert_eq!(col.long_array_value(0), Some(&[-1i64, -1][..]));

        let err = PropertyValues::fixed_array_with_default(
            ValueType::LongArray,
            2,
            PropertyValue::LongArray(vec![]),
        )
        .unwrap_err();
        assert_eq!(err, ColumnError::StrideMismatch { stride: 2, actual: 0 });
    }

    #[test]
    fn test_empty_like_keeps_layout_and_default() {
        let mut col = PropertyValues::fixed_array(ValueType::DoubleArray, 2).unwrap();
        col.set(0, vec![1.0, 2.0].into()).unwrap();
        let empty = col.empty_like();
        assert!(empty.is_empty());
        assert_eq!(empty.array_layout(), Some(ArrayLayout::Fixed(2)));
        assert_eq!(empty.default_value(), col.default_value());
    }

    #[test]
    fn test_variable_array_layout() {
        let mut col = PropertyValues::empty(ValueType::LongArray);
        col.set(0, vec![1i64].into()).unwrap();
        col.set(2, vec![1i64, 2, 3].into()).unwrap();
        assert_eq!(col.long_array_value(0), Some(&[1i64][..]));
        assert_eq!(col.long_array_value(2), Some(&[1i64, 2, 3][..]));
        assert_eq!(col.get(1), PropertyValue::LongArray(vec![]));
    }

    #[test]
    fn test_f64_view() {
        let col = PropertyValues::from_longs(vec![3, 4], 0);
        assert_eq!(col.f64_value(1), Some(4.0));
        assert_eq!(col.f64_value(7), Some(0.0));

        let strings = PropertyValues::empty(ValueType::String);
        assert_eq!(strings.f64_value(0), None);
    }

    #[test]
    fn test_from_values() {
        let col = PropertyValues::from_values(
            ValueType::String,
            PropertyValue::from("n/a"),
            vec!["a".into(), "b".into()],
        )
        .unwrap();
        assert_eq!(col.string_value(1), Some("b"));
        assert_eq!(col.string_value(2), Some("n/a"));

        let err = ColumnError::TypeMismatch {
            expected: ValueType::Long,
            actual: ValueType::String,
        }
        .for_key("age");
        assert!(matches!(err, GraphStoreError::TypeMismatch { ref key, .. } if key == "age"));
    }
}
