//! Export of decomposed axes and time-tagged values as Arrow record batches.

use std::sync::Arc;

use arrow::{
    array::{ArrayRef, Float64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};

use super::{sampled_function::AxisSeries, time_tag::TimeTaggedValue};
use crate::Error;

/// One `Float64` column per axis. Samples without a numeric reading are null.
pub fn series_to_record_batch(series: &[AxisSeries]) -> Result<RecordBatch, Error> {
    let fields: Vec<Field> = series
        .iter()
        .map(|s| Field::new(s.label(), DataType::Float64, true))
        .collect();

    let columns: Vec<ArrayRef> = series
        .iter()
        .map(|s| {
            let values: Float64Array = s.values.iter().map(|v| v.as_f64()).collect();
            Arc::new(values) as ArrayRef
        })
        .collect();

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// A `time` column followed by one column per dependent axis, named by `labels`. `NaN` values
/// are null.
pub fn time_tagged_to_record_batch(
    values: &[TimeTaggedValue],
    labels: &[String],
) -> Result<RecordBatch, Error> {
    let time = Field::new("time", DataType::Float64, false);
    let fields: Vec<Field> = std::iter::once(time)
        .chain(
            labels
                .iter()
                .map(|label| Field::new(label, DataType::Float64, true)),
        )
        .collect();

    let time: Float64Array = values.iter().map(|v| Some(v.time)).collect();
    let columns: Vec<ArrayRef> = std::iter::once(Arc::new(time) as ArrayRef)
        .chain((0..labels.len()).map(|axis| {
            let column: Float64Array = values
                .iter()
                .map(|v| v.values.get(axis).copied().filter(|v| !v.is_nan()))
                .collect();
            Arc::new(column) as ArrayRef
        }))
        .collect();

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
