use std::collections::BTreeMap;
use std::str::FromStr;

use bincode::{Decode, Encode};

use crate::errors::{QuerynetError, Result};
use crate::structure::{LayerConfig, LayerStructure};
use crate::tensor::Tensor;

/// Element-wise activation function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Decode, Encode)]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    /// Piecewise linear approximation of the sigmoid: `clamp(0.2 * x + 0.5, 0, 1)`.
    HardSigmoid,
    Tanh,
    Softmax,
}

impl Activation {
    /// Gets the Keras name of the function.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Relu => "relu",
            Self::Sigmoid => "sigmoid",
            Self::HardSigmoid => "hard_sigmoid",
            Self::Tanh => "tanh",
            Self::Softmax => "softmax",
        }
    }

    /// Applies the function in place.
    pub fn apply(self, values: &mut [f32]) {
        match self {
            Self::Linear => (),
            Self::Relu => values.iter_mut().for_each(|v| *v = v.max(0.0)),
            Self::Sigmoid => values.iter_mut().for_each(|v| *v = 1.0 / (1.0 + (-*v).exp())),
            Self::HardSigmoid => values
                .iter_mut()
                .for_each(|v| *v = (0.2 * *v + 0.5).clamp(0.0, 1.0)),
            Self::Tanh => values.iter_mut().for_each(|v| *v = v.tanh()),
            Self::Softmax => {
                let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let mut sum = 0.0;
                for v in values.iter_mut() {
                    *v = (*v - max).exp();
                    sum += *v;
                }
                for v in values.iter_mut() {
                    *v /= sum;
                }
            }
        }
    }
}

impl FromStr for Activation {
    type Err = QuerynetError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "linear" => Ok(Self::Linear),
            "relu" => Ok(Self::Relu),
            "sigmoid" => Ok(Self::Sigmoid),
            "hard_sigmoid" => Ok(Self::HardSigmoid),
            "tanh" => Ok(Self::Tanh),
            "softmax" => Ok(Self::Softmax),
            _ => Err(QuerynetError::invalid_model(format!(
                "unsupported activation: {name}"
            ))),
        }
    }
}

/// Timesteps flowing through the layers of a model.
pub(crate) struct Sequence {
    pub(crate) steps: Vec<Vec<f32>>,

    /// `false` for timesteps removed by a masking layer.
    pub(crate) mask: Vec<bool>,
}

impl Sequence {
    pub(crate) fn new(steps: Vec<Vec<f32>>) -> Self {
        let mask = vec![true; steps.len()];
        Self { steps, mask }
    }
}

fn check_input(layer: &str, expected: usize, step: &[f32]) -> Result<()> {
    if step.len() != expected {
        return Err(QuerynetError::invalid_argument(
            "input",
            format!(
                "layer `{}` expects {} features, but got {}",
                layer,
                expected,
                step.len()
            ),
        ));
    }
    Ok(())
}

fn check_shape(layer: &str, weight: &str, tensor: &Tensor, expected: &[usize]) -> Result<()> {
    if tensor.shape() != expected {
        return Err(QuerynetError::invalid_model(format!(
            "weight `{}` of layer `{}` has shape {:?}, but {:?} is expected",
            weight,
            layer,
            tensor.shape(),
            expected
        )));
    }
    Ok(())
}

/// Adds `x · w` to `y`, where `w` has the shape `(x.len(), y.len())`.
fn accumulate(y: &mut [f32], x: &[f32], w: &Tensor) {
    for (i, &xi) in x.iter().enumerate() {
        if xi == 0.0 {
            continue;
        }
        for (yj, &wij) in y.iter_mut().zip(w.row(i)) {
            *yj += xi * wij;
        }
    }
}

/// Layer that masks timesteps whose features all equal `mask_value`.
///
/// Masked timesteps are zeroed, and recurrent layers skip them.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub struct Masking {
    name: String,
    mask_value: f32,
}

impl Masking {
    pub fn new<S>(name: S, mask_value: f32) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            mask_value,
        }
    }

    fn forward(&self, seq: &mut Sequence) {
        for (step, m) in seq.steps.iter_mut().zip(&mut seq.mask) {
            if step.iter().all(|&v| v == self.mask_value) {
                *m = false;
            }
            if !*m {
                step.iter_mut().for_each(|v| *v = 0.0);
            }
        }
    }
}

/// Fully connected layer: `activation(x · W + b)`.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub struct Dense {
    name: String,
    weight: Tensor,
    bias: Tensor,
    activation: Activation,
}

impl Dense {
    /// Creates a new dense layer.
    ///
    /// # Arguments
    ///
    /// * `name` - Layer name.
    /// * `weight` - Matrix of shape `(input_dim, output_dim)`.
    /// * `bias` - Vector of shape `(output_dim)`.
    /// * `activation` - Function applied to the output.
    ///
    /// # Errors
    ///
    /// If the shapes are inconsistent, an error variant will be returned.
    pub fn new<S>(name: S, weight: Tensor, bias: Tensor, activation: Activation) -> Result<Self>
    where
        S: Into<String>,
    {
        let layer = Self {
            name: name.into(),
            weight,
            bias,
            activation,
        };
        layer.validate()?;
        Ok(layer)
    }

    fn validate(&self) -> Result<()> {
        self.weight.validate()?;
        self.bias.validate()?;
        if self.weight.rank() != 2 {
            return Err(QuerynetError::invalid_model(format!(
                "weight `W` of layer `{}` must be a matrix",
                self.name
            )));
        }
        check_shape(&self.name, "b", &self.bias, &[self.output_dim()])
    }

    pub fn input_dim(&self) -> usize {
        self.weight.shape()[0]
    }

    pub fn output_dim(&self) -> usize {
        self.weight.shape()[1]
    }

    fn forward(&self, seq: &mut Sequence) -> Result<()> {
        for step in &mut seq.steps {
            check_input(&self.name, self.input_dim(), step)?;
            let mut y = self.bias.data().to_vec();
            accumulate(&mut y, step, &self.weight);
            self.activation.apply(&mut y);
            *step = y;
        }
        Ok(())
    }
}

/// Layer that applies an activation function to each timestep.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub struct ActivationLayer {
    name: String,
    activation: Activation,
}

impl ActivationLayer {
    pub fn new<S>(name: S, activation: Activation) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            activation,
        }
    }

    fn forward(&self, seq: &mut Sequence) {
        for step in &mut seq.steps {
            self.activation.apply(step);
        }
    }
}

/// Weights of one LSTM gate.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub struct LstmGate {
    /// Input kernel of shape `(input_dim, output_dim)`.
    w: Tensor,

    /// Recurrent kernel of shape `(output_dim, output_dim)`.
    u: Tensor,

    /// Bias of shape `(output_dim)`.
    b: Tensor,
}

impl LstmGate {
    pub const fn new(w: Tensor, u: Tensor, b: Tensor) -> Self {
        Self { w, u, b }
    }

    fn validate(&self, layer: &str, gate: char, input_dim: usize, output_dim: usize) -> Result<()> {
        self.w.validate()?;
        self.u.validate()?;
        self.b.validate()?;
        check_shape(layer, &format!("W_{gate}"), &self.w, &[input_dim, output_dim])?;
        check_shape(layer, &format!("U_{gate}"), &self.u, &[output_dim, output_dim])?;
        check_shape(layer, &format!("b_{gate}"), &self.b, &[output_dim])
    }

    fn preactivate(&self, x: &[f32], h: &[f32]) -> Vec<f32> {
        let mut z = self.b.data().to_vec();
        accumulate(&mut z, x, &self.w);
        accumulate(&mut z, h, &self.u);
        z
    }
}

/// Long short-term memory layer.
///
/// Gates are stored in the order input, cell, forget, output.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub struct Lstm {
    name: String,
    input_gate: LstmGate,
    cell_gate: LstmGate,
    forget_gate: LstmGate,
    output_gate: LstmGate,
    activation: Activation,
    inner_activation: Activation,
    return_sequences: bool,
}

impl Lstm {
    /// Creates a new LSTM layer using `tanh` as the activation, `hard_sigmoid` as the inner
    /// activation, and returning only the last output.
    ///
    /// # Errors
    ///
    /// If the shapes of the gates are inconsistent, an error variant will be returned.
    pub fn new<S>(
        name: S,
        input_gate: LstmGate,
        cell_gate: LstmGate,
        forget_gate: LstmGate,
        output_gate: LstmGate,
    ) -> Result<Self>
    where
        S: Into<String>,
    {
        let layer = Self {
            name: name.into(),
            input_gate,
            cell_gate,
            forget_gate,
            output_gate,
            activation: Activation::Tanh,
            inner_activation: Activation::HardSigmoid,
            return_sequences: false,
        };
        layer.validate()?;
        Ok(layer)
    }

    /// Sets the activation applied to the cell input and the cell state.
    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Sets the activation applied to the gates.
    pub fn inner_activation(mut self, activation: Activation) -> Self {
        self.inner_activation = activation;
        self
    }

    /// Outputs every timestep instead of the last one.
    pub fn return_sequences(mut self, return_sequences: bool) -> Self {
        self.return_sequences = return_sequences;
        self
    }

    pub fn input_dim(&self) -> usize {
        self.input_gate.w.shape()[0]
    }

    pub fn output_dim(&self) -> usize {
        self.input_gate.b.shape()[0]
    }

    fn gates(&self) -> [(char, &LstmGate); 4] {
        [
            ('i', &self.input_gate),
            ('c', &self.cell_gate),
            ('f', &self.forget_gate),
            ('o', &self.output_gate),
        ]
    }

    fn validate(&self) -> Result<()> {
        if self.input_gate.w.rank() != 2 || self.input_gate.b.rank() != 1 {
            return Err(QuerynetError::invalid_model(format!(
                "gates of layer `{}` must have matrix kernels and vector biases",
                self.name
            )));
        }
        for (gate, weights) in self.gates() {
            weights.validate(&self.name, gate, self.input_dim(), self.output_dim())?;
        }
        Ok(())
    }

    fn gate(&self, gate: &LstmGate, x: &[f32], h: &[f32]) -> Vec<f32> {
        let mut z = gate.preactivate(x, h);
        self.inner_activation.apply(&mut z);
        z
    }

    fn forward(&self, seq: &mut Sequence) -> Result<()> {
        let mut h = vec![0.0; self.output_dim()];
        let mut c = vec![0.0; self.output_dim()];
        let mut outputs = Vec::with_capacity(seq.steps.len());
        for (x, &m) in seq.steps.iter().zip(&seq.mask) {
            check_input(&self.name, self.input_dim(), x)?;
            // A masked timestep carries the previous state and output over.
            if m {
                let i = self.gate(&self.input_gate, x, &h);
                let f = self.gate(&self.forget_gate, x, &h);
                let o = self.gate(&self.output_gate, x, &h);
                let mut g = self.cell_gate.preactivate(x, &h);
                self.activation.apply(&mut g);
                for (j, cj) in c.iter_mut().enumerate() {
                    *cj = f[j] * *cj + i[j] * g[j];
                }
                let mut act_c = c.clone();
                self.activation.apply(&mut act_c);
                for (hj, (oj, aj)) in h.iter_mut().zip(o.iter().zip(&act_c)) {
                    *hj = oj * aj;
                }
            }
            outputs.push(h.clone());
        }
        if self.return_sequences {
            seq.steps = outputs;
        } else {
            seq.steps = vec![h];
            seq.mask = vec![true];
        }
        Ok(())
    }
}

/// Layer of a sequential model.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub enum Layer {
    Masking(Masking),
    Dense(Dense),
    Activation(ActivationLayer),
    Lstm(Lstm),
}

impl Layer {
    pub fn name(&self) -> &str {
        match self {
            Self::Masking(layer) => &layer.name,
            Self::Dense(layer) => &layer.name,
            Self::Activation(layer) => &layer.name,
            Self::Lstm(layer) => &layer.name,
        }
    }

    /// Gets the Keras class name of the layer.
    pub const fn class_name(&self) -> &'static str {
        match self {
            Self::Masking(_) => "Masking",
            Self::Dense(_) => "Dense",
            Self::Activation(_) => "Activation",
            Self::Lstm(_) => "LSTM",
        }
    }

    /// Number of input features, or `None` if the layer accepts any size.
    pub fn input_dim(&self) -> Option<usize> {
        match self {
            Self::Dense(layer) => Some(layer.input_dim()),
            Self::Lstm(layer) => Some(layer.input_dim()),
            Self::Masking(_) | Self::Activation(_) => None,
        }
    }

    /// Number of output features, or `None` if the layer keeps the input size.
    pub fn output_dim(&self) -> Option<usize> {
        match self {
            Self::Dense(layer) => Some(layer.output_dim()),
            Self::Lstm(layer) => Some(layer.output_dim()),
            Self::Masking(_) | Self::Activation(_) => None,
        }
    }

    /// Returns `false` if the layer reduces a sequence to its last timestep.
    pub const fn returns_sequences(&self) -> bool {
        match self {
            Self::Lstm(layer) => layer.return_sequences,
            _ => true,
        }
    }

    /// Gets the weight tensors with their names, in Keras order.
    pub fn weights(&self) -> Vec<(String, &Tensor)> {
        match self {
            Self::Dense(layer) => vec![
                (format!("{}_W", layer.name), &layer.weight),
                (format!("{}_b", layer.name), &layer.bias),
            ],
            Self::Lstm(layer) => {
                let mut weights = Vec::with_capacity(12);
                for (gate, w) in layer.gates() {
                    weights.push((format!("{}_W_{}", layer.name, gate), &w.w));
                    weights.push((format!("{}_U_{}", layer.name, gate), &w.u));
                    weights.push((format!("{}_b_{}", layer.name, gate), &w.b));
                }
                weights
            }
            Self::Masking(_) | Self::Activation(_) => vec![],
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Self::Dense(layer) => layer.validate(),
            Self::Lstm(layer) => layer.validate(),
            Self::Masking(_) | Self::Activation(_) => Ok(()),
        }
    }

    pub(crate) fn forward(&self, seq: &mut Sequence) -> Result<()> {
        match self {
            Self::Masking(layer) => layer.forward(seq),
            Self::Dense(layer) => layer.forward(seq)?,
            Self::Activation(layer) => layer.forward(seq),
            Self::Lstm(layer) => layer.forward(seq)?,
        }
        Ok(())
    }

    /// Describes the layer in the Keras structure format.
    pub fn structure(&self) -> LayerStructure {
        let mut config = LayerConfig::new(self.name());
        match self {
            Self::Masking(layer) => {
                config.mask_value = Some(layer.mask_value);
            }
            Self::Dense(layer) => {
                config.input_dim = Some(layer.input_dim());
                config.output_dim = Some(layer.output_dim());
                config.activation = Some(layer.activation.name().to_string());
            }
            Self::Activation(layer) => {
                config.activation = Some(layer.activation.name().to_string());
            }
            Self::Lstm(layer) => {
                config.input_dim = Some(layer.input_dim());
                config.output_dim = Some(layer.output_dim());
                config.activation = Some(layer.activation.name().to_string());
                config.inner_activation = Some(layer.inner_activation.name().to_string());
                config.return_sequences = Some(layer.return_sequences);
            }
        }
        LayerStructure {
            class_name: self.class_name().to_string(),
            config,
        }
    }

    /// Rebuilds a layer from its structure and stringified weights.
    ///
    /// # Arguments
    ///
    /// * `structure` - Structure of the layer.
    /// * `input_dim` - Output size of the preceding layers, used when the structure omits
    ///                 `input_dim`.
    /// * `weights` - Weight strings of this layer keyed by weight name.
    ///
    /// # Errors
    ///
    /// If the class is unsupported, or a dimension or weight is missing or malformed, an error
    /// variant will be returned.
    pub fn from_structure(
        structure: &LayerStructure,
        input_dim: Option<usize>,
        weights: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let config = &structure.config;
        let name = config.name.as_str();
        let activation = |default: Activation| {
            config
                .activation
                .as_deref()
                .map_or(Ok(default), Activation::from_str)
        };
        match structure.class_name.as_str() {
            "Masking" => Ok(Self::Masking(Masking::new(
                name,
                config.mask_value.unwrap_or(0.0),
            ))),
            "Activation" => Ok(Self::Activation(ActivationLayer::new(
                name,
                activation(Activation::Linear)?,
            ))),
            "Dense" => {
                let input_dim = required_dim(config, config.input_dim.or(input_dim), "input_dim")?;
                let output_dim = required_dim(config, config.output_dim, "output_dim")?;
                let weight = parse_weight(weights, name, "W", vec![input_dim, output_dim])?;
                let bias = parse_weight(weights, name, "b", vec![output_dim])?;
                Ok(Self::Dense(Dense::new(
                    name,
                    weight,
                    bias,
                    activation(Activation::Linear)?,
                )?))
            }
            "LSTM" => {
                let input_dim = required_dim(config, config.input_dim.or(input_dim), "input_dim")?;
                let output_dim = required_dim(config, config.output_dim, "output_dim")?;
                let gate = |g: char| -> Result<LstmGate> {
                    let w = vec![input_dim, output_dim];
                    let u = vec![output_dim, output_dim];
                    Ok(LstmGate::new(
                        parse_weight(weights, name, &format!("W_{g}"), w)?,
                        parse_weight(weights, name, &format!("U_{g}"), u)?,
                        parse_weight(weights, name, &format!("b_{g}"), vec![output_dim])?,
                    ))
                };
                let inner_activation = config
                    .inner_activation
                    .as_deref()
                    .map_or(Ok(Activation::HardSigmoid), Activation::from_str)?;
                let layer = Lstm::new(name, gate('i')?, gate('c')?, gate('f')?, gate('o')?)?
                    .activation(activation(Activation::Tanh)?)
                    .inner_activation(inner_activation)
                    .return_sequences(config.return_sequences.unwrap_or(false));
                Ok(Self::Lstm(layer))
            }
            class_name => Err(QuerynetError::invalid_model(format!(
                "unsupported layer class: {class_name}"
            ))),
        }
    }
}

fn required_dim(config: &LayerConfig, dim: Option<usize>, key: &str) -> Result<usize> {
    dim.ok_or_else(|| {
        QuerynetError::invalid_model(format!("layer `{}` requires {}", config.name, key))
    })
}

fn parse_weight(
    weights: &BTreeMap<String, String>,
    layer: &str,
    suffix: &str,
    shape: Vec<usize>,
) -> Result<Tensor> {
    let key = format!("{layer}_{suffix}");
    let text = weights.get(&key).ok_or_else(|| {
        QuerynetError::invalid_model(format!("weight `{key}` of layer `{layer}` is missing"))
    })?;
    Tensor::from_text(text, shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(expected: &[f32], actual: &[f32]) {
        assert_eq!(expected.len(), actual.len());
        for (e, a) in expected.iter().zip(actual) {
            assert!((e - a).abs() < 1e-5, "expected {expected:?}, but got {actual:?}");
        }
    }

    fn dense() -> Dense {
        Dense::new(
            "dense_1",
            Tensor::new(vec![3, 2], vec![1.0, 2.0, 0.0, -1.0, 0.5, 0.5]).unwrap(),
            Tensor::new(vec![2], vec![0.1, -0.1]).unwrap(),
            Activation::Linear,
        )
        .unwrap()
    }

    fn constant_gate(input_dim: usize, output_dim: usize, bias: f32) -> LstmGate {
        LstmGate::new(
            Tensor::zeros(vec![input_dim, output_dim]),
            Tensor::zeros(vec![output_dim, output_dim]),
            Tensor::new(vec![output_dim], vec![bias; output_dim]).unwrap(),
        )
    }

    #[test]
    fn test_activation_apply() {
        let mut v = vec![-10.0, 0.0, 1.0];
        Activation::HardSigmoid.apply(&mut v);
        assert_close(&[0.0, 0.5, 0.7], &v);

        let mut v = vec![-1.0, 0.0, 2.0];
        Activation::Relu.apply(&mut v);
        assert_close(&[0.0, 0.0, 2.0], &v);

        let mut v = vec![0.0];
        Activation::Sigmoid.apply(&mut v);
        assert_close(&[0.5], &v);

        let mut v = vec![1.0, 1.0];
        Activation::Softmax.apply(&mut v);
        assert_close(&[0.5, 0.5], &v);
    }

    #[test]
    fn test_activation_from_str() {
        assert_eq!(Activation::HardSigmoid, "hard_sigmoid".parse().unwrap());
        assert_eq!(
            "InvalidModelError: unsupported activation: swish",
            &"swish".parse::<Activation>().err().unwrap().to_string()
        );
    }

    #[test]
    fn test_dense_forward() {
        let layer = dense();
        let mut seq = Sequence::new(vec![vec![1.0, 1.0, 2.0], vec![0.0, 0.0, 0.0]]);
        layer.forward(&mut seq).unwrap();

        assert_close(&[2.1, 1.9], &seq.steps[0]);
        assert_close(&[0.1, -0.1], &seq.steps[1]);
    }

    #[test]
    fn test_dense_wrong_input() {
        let layer = dense();
        let mut seq = Sequence::new(vec![vec![1.0, 1.0]]);
        let result = layer.forward(&mut seq);

        assert!(result.is_err());
        assert_eq!(
            "InvalidArgumentError: input: layer `dense_1` expects 3 features, but got 2",
            &result.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_dense_wrong_bias() {
        let layer = Dense::new(
            "dense_1",
            Tensor::zeros(vec![3, 2]),
            Tensor::zeros(vec![3]),
            Activation::Linear,
        );

        assert!(layer.is_err());
        assert_eq!(
            "InvalidModelError: weight `b` of layer `dense_1` has shape [3], but [2] is expected",
            &layer.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_masking_forward() {
        let layer = Masking::new("masking_1", 0.0);
        let mut seq = Sequence::new(vec![vec![1.0, 0.0], vec![0.0, 0.0], vec![0.0, 2.0]]);
        layer.forward(&mut seq);

        assert_eq!(vec![true, false, true], seq.mask);
    }

    #[test]
    fn test_lstm_forward() {
        let layer = Lstm::new(
            "lstm_1",
            constant_gate(2, 1, 0.0),
            constant_gate(2, 1, 1.0),
            constant_gate(2, 1, 0.0),
            constant_gate(2, 1, 0.0),
        )
        .unwrap();
        let mut seq = Sequence::new(vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
        layer.forward(&mut seq).unwrap();

        // Every gate is hard_sigmoid(0) = 0.5 and the cell input is tanh(1).
        let c1 = 0.5 * 1f32.tanh();
        let c2 = 0.5 * c1 + 0.5 * 1f32.tanh();
        assert_eq!(1, seq.steps.len());
        assert_close(&[0.5 * c2.tanh()], &seq.steps[0]);
    }

    #[test]
    fn test_lstm_skips_masked_steps() {
        let layer = Lstm::new(
            "lstm_1",
            constant_gate(1, 1, 0.0),
            constant_gate(1, 1, 1.0),
            constant_gate(1, 1, 0.0),
            constant_gate(1, 1, 0.0),
        )
        .unwrap()
        .return_sequences(true);
        let mut seq = Sequence::new(vec![vec![1.0], vec![0.0], vec![0.0]]);
        Masking::new("masking_1", 0.0).forward(&mut seq);
        layer.forward(&mut seq).unwrap();

        let h = 0.5 * (0.5 * 1f32.tanh()).tanh();
        assert_eq!(3, seq.steps.len());
        assert_close(&[h], &seq.steps[0]);
        assert_close(&[h], &seq.steps[1]);
        assert_close(&[h], &seq.steps[2]);
    }

    #[test]
    fn test_lstm_wrong_gate() {
        let layer = Lstm::new(
            "lstm_1",
            constant_gate(2, 3, 0.0),
            constant_gate(2, 3, 0.0),
            constant_gate(2, 2, 0.0),
            constant_gate(2, 3, 0.0),
        );

        assert!(layer.is_err());
        assert_eq!(
            "InvalidModelError: weight `W_f` of layer `lstm_1` has shape [2, 2], but [2, 3] is expected",
            &layer.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_layer_weights() {
        let layer = Layer::Lstm(
            Lstm::new(
                "lstm_1",
                constant_gate(2, 1, 0.0),
                constant_gate(2, 1, 0.0),
                constant_gate(2, 1, 0.0),
                constant_gate(2, 1, 0.0),
            )
            .unwrap(),
        );
        let names: Vec<String> = layer.weights().into_iter().map(|(n, _)| n).collect();

        assert_eq!(
            vec![
                "lstm_1_W_i", "lstm_1_U_i", "lstm_1_b_i", "lstm_1_W_c", "lstm_1_U_c",
                "lstm_1_b_c", "lstm_1_W_f", "lstm_1_U_f", "lstm_1_b_f", "lstm_1_W_o",
                "lstm_1_U_o", "lstm_1_b_o",
            ],
            names
        );
        assert!(Layer::Masking(Masking::new("masking_1", 0.0))
            .weights()
            .is_empty());
    }

    #[test]
    fn test_from_structure_dense() {
        let layer = Layer::Dense(dense());
        let weights = layer
            .weights()
            .into_iter()
            .map(|(n, t)| (n, t.to_text()))
            .collect();
        let rebuilt = Layer::from_structure(&layer.structure(), None, &weights).unwrap();

        assert_eq!(layer, rebuilt);
    }

    #[test]
    fn test_from_structure_infers_input_dim() {
        let mut structure = Layer::Dense(dense()).structure();
        structure.config.input_dim = None;
        let mut weights = BTreeMap::new();
        weights.insert("dense_1_W".to_string(), "1.0 2.0\n0.0 -1.0\n0.5 0.5".to_string());
        weights.insert("dense_1_b".to_string(), "0.1 -0.1".to_string());

        let rebuilt = Layer::from_structure(&structure, Some(3), &weights).unwrap();
        assert_eq!(Layer::Dense(dense()), rebuilt);

        let result = Layer::from_structure(&structure, None, &weights);
        assert_eq!(
            "InvalidModelError: layer `dense_1` requires input_dim",
            &result.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_from_structure_missing_weight() {
        let structure = Layer::Dense(dense()).structure();
        let result = Layer::from_structure(&structure, None, &BTreeMap::new());

        assert!(result.is_err());
        assert_eq!(
            "InvalidModelError: weight `dense_1_W` of layer `dense_1` is missing",
            &result.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_from_structure_unsupported() {
        let structure = LayerStructure {
            class_name: "Dropout".to_string(),
            config: LayerConfig::new("dropout_1"),
        };
        let result = Layer::from_structure(&structure, Some(3), &BTreeMap::new());

        assert!(result.is_err());
        assert_eq!(
            "InvalidModelError: unsupported layer class: Dropout",
            &result.err().unwrap().to_string()
        );
    }
}
