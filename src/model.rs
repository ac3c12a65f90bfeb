use burn::{
    config::Config,
    module::Module,
    nn::{Initializer, Linear, LinearConfig},
    prelude::Backend,
    tensor::Tensor,
};

/// Name of the weight parameter, as it appears in reports and in the exported graph.
pub const WEIGHT_NAME: &str = "linear.weight";
/// Name of the bias parameter, as it appears in reports and in the exported graph.
pub const BIAS_NAME: &str = "linear.bias";

/// A single affine transform `y = weight * x + bias`.
/// This model processes 2D tensors of shape `[batch, 1]`.
#[derive(Module, Debug)]
pub struct LinearRegression<B: Backend> {
    /// Single linear layer with one input and one output feature.
    pub linear: Linear<B>,
}

impl<B: Backend> LinearRegression<B> {
    /// Executes a forward pass through the model.
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape `[batch, 1]`.
    ///
    /// # Returns
    /// Output tensor of shape `[batch, 1]`.
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(x)
    }

    /// Number of input features of the underlying layer.
    pub fn in_features(&self) -> usize {
        self.linear.weight.val().shape().dims[0]
    }

    /// Number of output features of the underlying layer.
    pub fn out_features(&self) -> usize {
        self.linear.weight.val().shape().dims[1]
    }

    /// Weight values in the layer's `[in_features, out_features]` layout, row-major.
    pub fn weight_values(&self) -> Result<Vec<f32>, String> {
        self.linear
            .weight
            .val()
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| format!("{e:?}"))
    }

    /// Bias values, one per output feature. A layer built without bias reads as zeros.
    pub fn bias_values(&self) -> Result<Vec<f32>, String> {
        match &self.linear.bias {
            Some(bias) => bias
                .val()
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| format!("{e:?}")),
            None => Ok(vec![0.0; self.out_features()]),
        }
    }

    /// Reads the current weight and bias.
    pub fn parameters(&self) -> Result<LearnedParameters, String> {
        let weight = first(self.weight_values()?, WEIGHT_NAME)?;
        let bias = first(self.bias_values()?, BIAS_NAME)?;
        Ok(LearnedParameters { weight, bias })
    }
}

fn first(values: Vec<f32>, name: &str) -> Result<f32, String> {
    values
        .first()
        .copied()
        .ok_or_else(|| format!("parameter '{name}' is empty"))
}

/// Snapshot of the two scalars the model owns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearnedParameters {
    pub weight: f32,
    pub bias: f32,
}

impl LearnedParameters {
    /// The parameters as `(name, value)` pairs, weight first.
    pub fn named(&self) -> [(&'static str, f32); 2] {
        [(WEIGHT_NAME, self.weight), (BIAS_NAME, self.bias)]
    }

    /// Evaluates `weight * x + bias` without touching a backend.
    pub fn predict(&self, x: f32) -> f32 {
        self.weight * x + self.bias
    }
}

/// Configuration for constructing a `LinearRegression`.
#[derive(Config, Debug)]
pub struct LinearRegressionConfig {
    /// Number of input features.
    #[config(default = 1)]
    pub in_features: usize,
    /// Number of output features.
    #[config(default = 1)]
    pub out_features: usize,
    /// Parameter initializer. `None` keeps the layer's default (Kaiming uniform).
    #[config(default = "None")]
    pub initializer: Option<Initializer>,
}

impl LinearRegressionConfig {
    /// Initializes the `LinearRegression` using the configuration.
    ///
    /// # Arguments
    /// * `device` - The device for tensor allocation.
    ///
    /// # Returns
    /// An instance of `LinearRegression<B>`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> LinearRegression<B> {
        let mut linear = LinearConfig::new(self.in_features, self.out_features).with_bias(true);
        if let Some(initializer) = &self.initializer {
            linear = linear.with_initializer(initializer.clone());
        }
        LinearRegression {
            linear: linear.init(device),
        }
    }
}
