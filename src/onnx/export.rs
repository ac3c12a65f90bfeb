use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{config::Config, prelude::Backend, tensor::Tensor};
use log::{debug, info};
use prost::Message;

use super::{
    error::ExportError,
    fold::fold_constants,
    graph::{model_proto, Graph},
    trace::{trace, Traceable},
};

/// Options for turning a trained model into an ONNX file.
#[derive(Config, Debug)]
pub struct ExportConfig {
    /// Default-domain opset the graph targets.
    #[config(default = 11)]
    pub opset_version: i64,
    /// ONNX IR version written into the model header.
    #[config(default = 6)]
    pub ir_version: i64,
    /// Embed the trained parameters; otherwise they become graph inputs.
    #[config(default = true)]
    pub export_params: bool,
    /// Evaluate constant-only subgraphs at export time.
    #[config(default = true)]
    pub do_constant_folding: bool,
    /// Graph input names, one per model input.
    #[config(default = "vec![String::from(\"input\")]")]
    pub input_names: Vec<String>,
    /// Graph output names, one per model output.
    #[config(default = "vec![String::from(\"output\")]")]
    pub output_names: Vec<String>,
    /// Symbol for axis 0 of every input and output. `None` keeps the traced batch size.
    #[config(default = "Some(String::from(\"batch_size\"))")]
    pub batch_axis: Option<String>,
}

impl ExportConfig {
    fn validate(&self) -> Result<(), ExportError> {
        if self.opset_version < 7 {
            return Err(ExportError::InvalidConfig(format!(
                "opset {} predates Gemm broadcasting (need >= 7)",
                self.opset_version
            )));
        }
        if self.input_names.len() != 1 || self.output_names.len() != 1 {
            return Err(ExportError::InvalidConfig(format!(
                "expected one input and one output name, got {:?} and {:?}",
                self.input_names, self.output_names
            )));
        }
        Ok(())
    }
}

/// Traces `model` on `example_input` and applies the export options to the resulting graph.
pub fn build_graph<B, M>(
    model: &M,
    example_input: Tensor<B, 2>,
    config: &ExportConfig,
) -> Result<Graph, ExportError>
where
    B: Backend,
    M: Traceable<B>,
{
    config.validate()?;
    let input_name = &config.input_names[0];
    let output_name = &config.output_names[0];

    let mut graph = trace(model, example_input, input_name, output_name)?;

    if let Some(symbol) = &config.batch_axis {
        for name in [input_name, output_name] {
            if !graph.mark_dynamic(name, 0, symbol) {
                return Err(ExportError::InvalidConfig(format!(
                    "no value named '{name}' to make dynamic"
                )));
            }
        }
    }
    // Lifted parameters are runtime inputs, so nothing computed from them may be folded.
    if !config.export_params {
        graph.lift_initializers();
    }
    if config.do_constant_folding {
        let folded = fold_constants(&mut graph)?;
        debug!("constant folding removed {folded} node(s)");
    }
    Ok(graph)
}

/// Serializes `model` to an ONNX file at `path`.
///
/// # Arguments
/// * `model` - The fitted model. It is only read.
/// * `example_input` - A representative input, e.g. shape `[1, 1]`.
/// * `path` - Destination file, created or truncated.
/// * `config` - Export options.
///
/// # Returns
/// The path written, or the reason nothing usable was written.
pub fn export<B, M>(
    model: &M,
    example_input: Tensor<B, 2>,
    path: impl AsRef<Path>,
    config: &ExportConfig,
) -> Result<PathBuf, ExportError>
where
    B: Backend,
    M: Traceable<B>,
{
    let path = path.as_ref();
    let graph = build_graph(model, example_input, config)?;
    let bytes = model_proto(&graph, config.ir_version, config.opset_version).encode_to_vec();

    fs::write(path, &bytes).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        "wrote {} ({} bytes, opset {})",
        path.display(),
        bytes.len(),
        config.opset_version
    );
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{LinearRegressionConfig, WEIGHT_NAME},
        onnx::{
            graph::{Constant, Dim},
            trace::Tracer,
        },
    };
    use burn_ndarray::{NdArray, NdArrayDevice};

    type TestBackend = NdArray<f32, i32>;

    fn example(device: &NdArrayDevice) -> Tensor<TestBackend, 2> {
        Tensor::from_floats([[1.0]], device)
    }

    #[test]
    fn batch_axis_is_symbolic_on_both_ends() {
        let device = NdArrayDevice::default();
        let model = LinearRegressionConfig::new().init::<TestBackend>(&device);

        let graph = build_graph(&model, example(&device), &ExportConfig::new()).unwrap();

        let batch = Dim::Symbolic("batch_size".into());
        assert_eq!(graph.inputs[0].name, "input");
        assert_eq!(graph.inputs[0].shape, vec![batch.clone(), Dim::Fixed(1)]);
        assert_eq!(graph.outputs[0].name, "output");
        assert_eq!(graph.outputs[0].shape, vec![batch, Dim::Fixed(1)]);
    }

    #[test]
    fn without_batch_axis_shapes_stay_fixed() {
        let device = NdArrayDevice::default();
        let model = LinearRegressionConfig::new().init::<TestBackend>(&device);
        let config = ExportConfig::new().with_batch_axis(None);

        let graph = build_graph(&model, example(&device), &config).unwrap();
        assert_eq!(graph.inputs[0].shape, vec![Dim::Fixed(1), Dim::Fixed(1)]);
    }

    #[test]
    fn params_become_inputs_when_not_exported() {
        let device = NdArrayDevice::default();
        let model = LinearRegressionConfig::new().init::<TestBackend>(&device);
        let config = ExportConfig::new().with_export_params(false);

        let graph = build_graph(&model, example(&device), &config).unwrap();
        assert!(graph.initializers.is_empty());
        assert!(graph.inputs.iter().any(|v| v.name == WEIGHT_NAME));
    }

    /// `y = x · transpose(w)` with the transpose recorded as its own node.
    struct TransposedScale {
        weight: f32,
    }

    impl Traceable<TestBackend> for TransposedScale {
        fn in_features(&self) -> usize {
            1
        }

        fn run(&self, input: Tensor<TestBackend, 2>) -> Tensor<TestBackend, 2> {
            input.mul_scalar(self.weight)
        }

        fn record(&self, tracer: &mut Tracer, input: &str) -> Result<String, ExportError> {
            let weight = tracer.constant(Constant::new("w", vec![1, 1], vec![self.weight]));
            let transposed = tracer.node("scale", "Transpose", vec![weight], vec![]);
            Ok(tracer.node("scale", "MatMul", vec![input.to_string(), transposed], vec![]))
        }
    }

    #[test]
    fn lifted_params_are_not_folded_away() {
        let device = NdArrayDevice::default();
        let model = TransposedScale { weight: 3.0 };
        let config = ExportConfig::new().with_export_params(false);

        let graph = build_graph(&model, example(&device), &config).unwrap();

        assert!(graph.initializers.is_empty());
        let inputs: Vec<&str> = graph.inputs.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(inputs, vec!["input", "w"]);
        let ops: Vec<&str> = graph.nodes.iter().map(|n| n.op_type.as_str()).collect();
        assert_eq!(ops, vec!["Transpose", "MatMul"]);
        assert_eq!(graph.nodes[0].inputs, vec!["w"]);
    }

    #[test]
    fn embedded_params_are_folded() {
        let device = NdArrayDevice::default();
        let model = TransposedScale { weight: 3.0 };

        let graph = build_graph(&model, example(&device), &ExportConfig::new()).unwrap();

        let ops: Vec<&str> = graph.nodes.iter().map(|n| n.op_type.as_str()).collect();
        assert_eq!(ops, vec!["MatMul"]);
        assert_eq!(graph.initializers.len(), 1);
        assert_eq!(graph.initializers[0].data, vec![3.0]);
        assert!(graph.initializer("w").is_none());
    }

    #[test]
    fn custom_names_are_used() {
        let device = NdArrayDevice::default();
        let model = LinearRegressionConfig::new().init::<TestBackend>(&device);
        let config = ExportConfig::new()
            .with_input_names(vec!["x".into()])
            .with_output_names(vec!["y".into()]);

        let graph = build_graph(&model, example(&device), &config).unwrap();
        assert_eq!(graph.nodes[0].inputs[0], "x");
        assert_eq!(graph.nodes[0].outputs[0], "y");
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let device = NdArrayDevice::default();
        let model = LinearRegressionConfig::new().init::<TestBackend>(&device);

        for config in [
            ExportConfig::new().with_opset_version(6),
            ExportConfig::new().with_input_names(vec![]),
            ExportConfig::new().with_output_names(vec!["a".into(), "b".into()]),
        ] {
            let err = build_graph(&model, example(&device), &config).unwrap_err();
            assert!(matches!(err, ExportError::InvalidConfig(_)), "{err}");
        }
    }
}
