//! Human-readable exports of models and feature tensors.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::errors::{QuerynetError, Result};
use crate::model::Model;
use crate::tensor::{format_value, Tensor};

/// Stringified weights keyed by layer name, then by weight name.
pub type WeightDump = BTreeMap<String, BTreeMap<String, String>>;

/// Stringifies every weight tensor of a model.
///
/// Layers without weights map to an empty entry.
pub fn dump_weights(model: &Model) -> WeightDump {
    let mut root = WeightDump::new();
    for layer in model.layers() {
        let weights = layer
            .weights()
            .into_iter()
            .map(|(name, tensor)| (name, tensor.to_text()))
            .collect();
        root.insert(layer.name().to_string(), weights);
    }
    root
}

/// Writes a value as JSON indented by 4 spaces, with object keys sorted.
///
/// # Errors
///
/// When `wtr` generates an error, it will be returned as is.
pub fn write_json<W, T>(wtr: W, value: &T) -> Result<()>
where
    W: Write,
    T: Serialize + ?Sized,
{
    // Going through `Value` sorts the keys of every object.
    let value = serde_json::to_value(value)?;
    let mut ser = serde_json::Serializer::with_formatter(wtr, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    Ok(())
}

/// Writes a feature tensor of shape `(1, steps, features)` as text.
///
/// Each timestep becomes a line of space-separated values. Timesteps whose values are all zero
/// are skipped.
///
/// # Errors
///
/// If `data` is not a single batch of timesteps, an error variant will be returned. When `wtr`
/// generates an error, it will be returned as is.
pub fn write_data<W>(mut wtr: W, data: &Tensor) -> Result<()>
where
    W: Write,
{
    match data.shape() {
        [1, _, _] => (),
        shape => {
            return Err(QuerynetError::invalid_argument(
                "data",
                format!("expected a tensor of shape (1, steps, features), but got {shape:?}"),
            ))
        }
    }
    for i in 0..data.n_rows() {
        let row = data.row(i);
        if row.iter().all(|&v| v == 0.0) {
            continue;
        }
        let line: Vec<String> = row.iter().map(|&v| format_value(v)).collect();
        writeln!(wtr, "{}", line.join(" "))?;
    }
    Ok(())
}

/// Reads timesteps written by [`write_data`]. Empty lines are skipped.
///
/// # Returns
///
/// A tensor of shape `(1, steps, features)`.
///
/// # Errors
///
/// If a value is not a number or the lines have different lengths, an error variant will be
/// returned. When `rdr` generates an error, it will be returned as is.
pub fn read_data<R>(rdr: R) -> Result<Tensor>
where
    R: BufRead,
{
    let mut rows: Vec<Vec<f32>> = vec![];
    for line in rdr.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|token| Ok(token.parse::<f32>()?))
            .collect::<Result<Vec<_>>>()?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(QuerynetError::invalid_argument(
                    "data",
                    format!(
                        "line {} has {} values, but {} are expected",
                        rows.len() + 1,
                        row.len(),
                        first.len()
                    ),
                ));
            }
        }
        rows.push(row);
    }
    let n_features = rows.first().map_or(0, Vec::len);
    Tensor::new(
        vec![1, rows.len(), n_features],
        rows.into_iter().flatten().collect(),
    )
}
