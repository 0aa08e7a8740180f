use std::collections::{BTreeMap, HashSet};
use std::io::{Read, Write};

use bincode::{config, Decode, Encode};

use crate::dump::WeightDump;
use crate::errors::{QuerynetError, Result};
use crate::layer::{Layer, Sequence};
use crate::structure::ModelStructure;
use crate::tensor::Tensor;

const MODEL_CLASS_NAME: &str = "Sequential";

/// Sequential model.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub struct Model {
    layers: Vec<Layer>,
}

impl Model {
    /// Creates a new model.
    ///
    /// # Arguments
    ///
    /// * `layers` - Layers in the order they are applied.
    ///
    /// # Errors
    ///
    /// If two layers share a name, or the output size of a layer does not match the input size
    /// of the next one, an error variant will be returned.
    pub fn new(layers: Vec<Layer>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut n_features = None;
        for layer in &layers {
            layer.validate()?;
            if !names.insert(layer.name()) {
                return Err(QuerynetError::invalid_model(format!(
                    "layer name `{}` is duplicated",
                    layer.name()
                )));
            }
            if let (Some(n), Some(input_dim)) = (n_features, layer.input_dim()) {
                if n != input_dim {
                    return Err(QuerynetError::invalid_model(format!(
                        "layer `{}` expects {} features, but the preceding layer outputs {}",
                        layer.name(),
                        input_dim,
                        n
                    )));
                }
            }
            if let Some(output_dim) = layer.output_dim() {
                n_features = Some(output_dim);
            }
        }
        Ok(Self { layers })
    }

    /// Exports the model data.
    ///
    /// # Arguments
    ///
    /// * `wtr` - Byte-oriented sink object.
    ///
    /// # Errors
    ///
    /// When `wtr` generates an error, it will be returned as is.
    pub fn write<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        bincode::encode_into_std_write(self, wtr, config::standard())?;
        Ok(())
    }

    /// Creates a model from a reader.
    ///
    /// # Arguments
    ///
    /// * `rdr` - A data source.
    ///
    /// # Returns
    ///
    /// A model data read from `rdr`.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error, it will be returned as is. If the decoded layers are
    /// inconsistent, an error variant will be returned.
    pub fn read<R>(rdr: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let model: Self = bincode::decode_from_std_read(rdr, config::standard())?;
        Self::new(model.layers)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Number of input features, or `None` if no layer fixes it.
    pub fn input_dim(&self) -> Option<usize> {
        self.layers.iter().find_map(Layer::input_dim)
    }

    /// Number of output features, or `None` if no layer fixes it.
    pub fn output_dim(&self) -> Option<usize> {
        self.layers.iter().rev().find_map(Layer::output_dim)
    }

    /// Returns `false` if a layer reduces the sequence to its last timestep.
    pub fn returns_sequences(&self) -> bool {
        self.layers.iter().all(Layer::returns_sequences)
    }

    /// Runs inference.
    ///
    /// # Arguments
    ///
    /// * `input` - A tensor of shape `(batch, steps, features)`.
    ///
    /// # Returns
    ///
    /// A tensor of shape `(batch, steps, output_dim)` if the model returns sequences, or
    /// `(batch, output_dim)` otherwise.
    ///
    /// # Errors
    ///
    /// If `input` does not match the model, an error variant will be returned.
    pub fn predict(&self, input: &Tensor) -> Result<Tensor> {
        let &[batch, steps, n_features] = input.shape() else {
            return Err(QuerynetError::invalid_argument(
                "input",
                format!("expected a tensor of rank 3, but got rank {}", input.rank()),
            ));
        };
        if let Some(input_dim) = self.input_dim() {
            if input_dim != n_features {
                return Err(QuerynetError::invalid_argument(
                    "input",
                    format!("model expects {input_dim} features, but got {n_features}"),
                ));
            }
        }
        let output_dim = self.output_dim().unwrap_or(n_features);
        let mut output = vec![];
        let mut output_steps = 0;
        for b in 0..batch {
            let mut seq = Sequence::new(
                (0..steps)
                    .map(|t| input.row(b * steps + t).to_vec())
                    .collect(),
            );
            for layer in &self.layers {
                layer.forward(&mut seq)?;
            }
            output_steps = seq.steps.len();
            output.extend(seq.steps.into_iter().flatten());
        }
        let shape = if self.returns_sequences() {
            vec![batch, output_steps, output_dim]
        } else {
            vec![batch, output_dim]
        };
        Tensor::new(shape, output)
    }

    /// Describes the model in the Keras structure format.
    pub fn structure(&self) -> ModelStructure {
        ModelStructure {
            class_name: MODEL_CLASS_NAME.to_string(),
            config: self.layers.iter().map(Layer::structure).collect(),
        }
    }

    /// Rebuilds a model from a structure and a weight dump.
    ///
    /// # Arguments
    ///
    /// * `structure` - Structure of the model.
    /// * `weights` - Weight strings keyed by layer name and weight name.
    ///
    /// # Errors
    ///
    /// If the structure describes an unsupported model, or weights are missing or malformed,
    /// an error variant will be returned.
    pub fn from_dump(structure: &ModelStructure, weights: &WeightDump) -> Result<Self> {
        if structure.class_name != MODEL_CLASS_NAME {
            return Err(QuerynetError::invalid_model(format!(
                "unsupported model class: {}",
                structure.class_name
            )));
        }
        let no_weights = BTreeMap::new();
        let mut layers = Vec::with_capacity(structure.config.len());
        let mut n_features = None;
        for layer_structure in &structure.config {
            let layer_weights = weights
                .get(&layer_structure.config.name)
                .unwrap_or(&no_weights);
            let layer = Layer::from_structure(layer_structure, n_features, layer_weights)?;
            if let Some(output_dim) = layer.output_dim() {
                n_features = Some(output_dim);
            }
            layers.push(layer);
        }
        Self::new(layers)
    }
}
