//! Keras-style description of a model's layers.

use serde::{Deserialize, Serialize};

/// Structure of a whole model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelStructure {
    pub class_name: String,
    pub config: Vec<LayerStructure>,
}

/// Structure of a layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerStructure {
    pub class_name: String,
    pub config: LayerConfig,
}

/// Hyperparameters of a layer. Keys that a layer class does not use are omitted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_dim: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dim: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_activation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_sequences: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_value: Option<f32>,
}

impl LayerConfig {
    pub(crate) fn new<S>(name: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
