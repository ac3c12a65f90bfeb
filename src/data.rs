use burn::{
    prelude::Backend,
    tensor::{Tensor, TensorData},
};

/// A small in-memory regression dataset, held as two parallel arrays of scalars.
#[derive(Clone, Debug, PartialEq)]
pub struct RegressionDataset {
    inputs: Vec<f32>,
    targets: Vec<f32>,
}

impl RegressionDataset {
    /// Creates a dataset from parallel input and target arrays.
    ///
    /// # Returns
    /// `None` if the arrays differ in length or are empty.
    pub fn new(inputs: Vec<f32>, targets: Vec<f32>) -> Option<Self> {
        if inputs.is_empty() || inputs.len() != targets.len() {
            return None;
        }
        Some(Self { inputs, targets })
    }

    /// The six points `x = 1..=6` with `y = 2x`.
    pub fn doubling() -> Self {
        let inputs: Vec<f32> = (1..=6).map(|x| x as f32).collect();
        let targets = inputs.iter().map(|x| 2.0 * x).collect();
        Self { inputs, targets }
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn inputs(&self) -> &[f32] {
        &self.inputs
    }

    pub fn targets(&self) -> &[f32] {
        &self.targets
    }

    /// Iterates over `(x, y)` pairs in order.
    pub fn pairs(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.inputs.iter().copied().zip(self.targets.iter().copied())
    }

    /// Materializes the whole dataset as one batch.
    ///
    /// # Arguments
    /// * `device` - The device for tensor allocation.
    ///
    /// # Returns
    /// `(inputs, targets)`, both of shape `[len, 1]`.
    pub fn to_tensors<B: Backend>(&self, device: &B::Device) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let n = self.len();
        let inputs = Tensor::from_data(TensorData::new(self.inputs.clone(), [n, 1]), device);
        let targets = Tensor::from_data(TensorData::new(self.targets.clone(), [n, 1]), device);
        (inputs, targets)
    }
}
