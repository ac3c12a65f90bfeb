use burn::{prelude::Backend, tensor::Tensor};
use log::debug;

use super::{
    error::ExportError,
    graph::{Attribute, Constant, Dim, Graph, Node, ValueInfo},
};
use crate::model::{LinearRegression, BIAS_NAME, WEIGHT_NAME};

/// A model whose forward pass can be recorded as ONNX nodes.
pub trait Traceable<B: Backend> {
    /// Feature dimension the forward pass expects on axis 1.
    fn in_features(&self) -> usize;

    /// Runs the forward pass for real.
    fn run(&self, input: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Emits the nodes of one forward pass that consumes the value `input`.
    ///
    /// # Returns
    /// The name of the value holding the result.
    fn record(&self, tracer: &mut Tracer, input: &str) -> Result<String, ExportError>;
}

/// Collects values and nodes while a model replays its forward pass.
pub struct Tracer {
    graph: Graph,
}

impl Tracer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            graph: Graph {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    /// Registers a parameter and returns its value name.
    pub fn constant(&mut self, constant: Constant) -> String {
        let name = constant.name.clone();
        self.graph.initializers.push(constant);
        name
    }

    /// Appends a node named `/{scope}/{op_type}` with a single output.
    pub fn node(
        &mut self,
        scope: &str,
        op_type: &str,
        inputs: Vec<String>,
        attributes: Vec<(&str, Attribute)>,
    ) -> String {
        let name = format!("/{scope}/{op_type}");
        let output = format!("{name}_output_0");
        let mut node = Node::new(name, op_type, inputs, vec![output.clone()]);
        for (key, value) in attributes {
            node = node.with_attribute(key, value);
        }
        self.graph.nodes.push(node);
        output
    }
}

impl<B: Backend> Traceable<B> for LinearRegression<B> {
    fn in_features(&self) -> usize {
        LinearRegression::in_features(self)
    }

    fn run(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        self.forward(input)
    }

    fn record(&self, tracer: &mut Tracer, input: &str) -> Result<String, ExportError> {
        let dims = vec![
            LinearRegression::in_features(self) as i64,
            self.out_features() as i64,
        ];
        let weight = tracer.constant(Constant::new(
            WEIGHT_NAME,
            dims,
            self.weight_values().map_err(ExportError::Tensor)?,
        ));
        let bias = tracer.constant(Constant::new(
            BIAS_NAME,
            vec![self.out_features() as i64],
            self.bias_values().map_err(ExportError::Tensor)?,
        ));

        // Y = X * W + b, with W stored as [in, out].
        Ok(tracer.node(
            "linear",
            "Gemm",
            vec![input.to_string(), weight, bias],
            vec![
                ("alpha", Attribute::Float(1.0)),
                ("beta", Attribute::Float(1.0)),
                ("transB", Attribute::Int(0)),
            ],
        ))
    }
}

/// Records the forward pass of `model` on `example` as a graph with fixed shapes.
///
/// The example input is run through the model first, so the declared output shape is the one
/// the model actually produced.
pub fn trace<B, M>(
    model: &M,
    example: Tensor<B, 2>,
    input_name: &str,
    output_name: &str,
) -> Result<Graph, ExportError>
where
    B: Backend,
    M: Traceable<B>,
{
    let in_dims: Vec<usize> = example.shape().dims.iter().copied().collect();
    if in_dims[1] != model.in_features() {
        return Err(ExportError::Shape {
            expected: vec![in_dims[0], model.in_features()],
            found: in_dims,
        });
    }
    let out_dims: Vec<usize> = model.run(example).shape().dims.iter().copied().collect();

    let mut tracer = Tracer::new("main_graph");
    tracer
        .graph
        .inputs
        .push(ValueInfo::float(input_name, fixed(&in_dims)));
    let produced = model.record(&mut tracer, input_name)?;

    let mut graph = tracer.graph;
    graph.outputs.push(ValueInfo::float(produced.clone(), fixed(&out_dims)));
    graph.rename_value(&produced, output_name);
    debug!(
        "traced {} node(s), {} initializer(s)",
        graph.nodes.len(),
        graph.initializers.len()
    );
    Ok(graph)
}

fn fixed(dims: &[usize]) -> Vec<Dim> {
    dims.iter().map(|&d| Dim::Fixed(d as i64)).collect()
}
