use std::path::Path;

use log::debug;
use tract_onnx::prelude::*;

/// Runs an exported single-input, single-output model with `tract`.
pub struct OnnxRunner {
    model: InferenceModel,
}

impl OnnxRunner {
    /// Parses the model at `path`.
    pub fn load(path: impl AsRef<Path>) -> TractResult<Self> {
        let model = tract_onnx::onnx().model_for_path(path.as_ref())?;
        debug!(
            "loaded {} with {} input(s)",
            path.as_ref().display(),
            model.input_outlets()?.len()
        );
        Ok(Self { model })
    }

    /// Feeds `xs` as one `[xs.len(), 1]` batch.
    ///
    /// # Returns
    /// One output per input, in order.
    pub fn run(&self, xs: &[f32]) -> TractResult<Vec<f32>> {
        if xs.is_empty() {
            anyhow::bail!("at least one input value is required");
        }
        let n = xs.len();
        // The batch axis is symbolic in the file; pin it for this call.
        let plan = self
            .model
            .clone()
            .with_input_fact(0, f32::fact([n, 1]).into())?
            .into_optimized()?
            .into_runnable()?;

        let input: Tensor = tract_ndarray::Array2::from_shape_vec((n, 1), xs.to_vec())?.into();
        let outputs = plan.run(tvec!(input.into()))?;
        let output = outputs[0].to_array_view::<f32>()?;
        if output.shape() != [n, 1] {
            anyhow::bail!("expected output shape [{n}, 1], got {:?}", output.shape());
        }
        Ok(output.iter().copied().collect())
    }
}
