use super::proto::{
    self, tensor_shape_proto::dimension, tensor_shape_proto::Dimension, type_proto,
    AttributeProto, AttributeType, DataType, GraphProto, NodeProto, TensorProto, TensorShapeProto,
    TypeProto, ValueInfoProto,
};

/// A tensor dimension, either fixed or named and left open until inference time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dim {
    Fixed(i64),
    Symbolic(String),
}

impl Dim {
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Dim::Symbolic(_))
    }

    fn to_proto(&self) -> Dimension {
        let value = match self {
            Dim::Fixed(n) => dimension::Value::DimValue(*n),
            Dim::Symbolic(name) => dimension::Value::DimParam(name.clone()),
        };
        Dimension {
            denotation: String::new(),
            value: Some(value),
        }
    }
}

/// Name, element type and shape of a graph input or output.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueInfo {
    pub name: String,
    pub elem_type: DataType,
    pub shape: Vec<Dim>,
}

impl ValueInfo {
    pub fn float(name: impl Into<String>, shape: Vec<Dim>) -> Self {
        Self {
            name: name.into(),
            elem_type: DataType::Float,
            shape,
        }
    }

    fn to_proto(&self) -> ValueInfoProto {
        let tensor = type_proto::Tensor {
            elem_type: self.elem_type as i32,
            shape: Some(TensorShapeProto {
                dim: self.shape.iter().map(Dim::to_proto).collect(),
            }),
        };
        ValueInfoProto {
            name: self.name.clone(),
            r#type: Some(TypeProto {
                denotation: String::new(),
                value: Some(type_proto::Value::TensorType(tensor)),
            }),
            doc_string: String::new(),
        }
    }
}

/// A named `f32` tensor stored in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub name: String,
    pub dims: Vec<i64>,
    pub data: Vec<f32>,
}

impl Constant {
    pub fn new(name: impl Into<String>, dims: Vec<i64>, data: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            dims,
            data,
        }
    }

    pub fn value_info(&self) -> ValueInfo {
        ValueInfo::float(
            self.name.clone(),
            self.dims.iter().map(|&d| Dim::Fixed(d)).collect(),
        )
    }

    /// Stored as little-endian `raw_data`.
    fn to_proto(&self) -> TensorProto {
        TensorProto {
            dims: self.dims.clone(),
            data_type: DataType::Float as i32,
            name: self.name.clone(),
            raw_data: self.data.iter().flat_map(|v| v.to_le_bytes()).collect(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Float(f32),
    Int(i64),
    Ints(Vec<i64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub op_type: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub attributes: Vec<(String, Attribute)>,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        op_type: impl Into<String>,
        inputs: Vec<String>,
        outputs: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            op_type: op_type.into(),
            inputs,
            outputs,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Attribute) -> Self {
        self.attributes.push((name.into(), value));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    fn to_proto(&self) -> NodeProto {
        NodeProto {
            input: self.inputs.clone(),
            output: self.outputs.clone(),
            name: self.name.clone(),
            op_type: self.op_type.clone(),
            attribute: self
                .attributes
                .iter()
                .map(|(name, value)| attribute_proto(name, value))
                .collect(),
            ..Default::default()
        }
    }
}

fn attribute_proto(name: &str, value: &Attribute) -> AttributeProto {
    let mut attr = AttributeProto {
        name: name.to_string(),
        ..Default::default()
    };
    match value {
        Attribute::Float(f) => {
            attr.f = *f;
            attr.set_type(AttributeType::Float);
        }
        Attribute::Int(i) => {
            attr.i = *i;
            attr.set_type(AttributeType::Int);
        }
        Attribute::Ints(ints) => {
            attr.ints = ints.clone();
            attr.set_type(AttributeType::Ints);
        }
    }
    attr
}

/// An ONNX computation graph under construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    pub name: String,
    pub inputs: Vec<ValueInfo>,
    pub outputs: Vec<ValueInfo>,
    pub nodes: Vec<Node>,
    pub initializers: Vec<Constant>,
}

impl Graph {
    pub fn initializer(&self, name: &str) -> Option<&Constant> {
        self.initializers.iter().find(|c| c.name == name)
    }

    /// Renames a value everywhere it is produced or consumed.
    pub fn rename_value(&mut self, from: &str, to: &str) {
        let rename = |name: &mut String| {
            if name == from {
                *name = to.to_string();
            }
        };
        for node in &mut self.nodes {
            node.inputs.iter_mut().for_each(rename);
            node.outputs.iter_mut().for_each(rename);
        }
        self.inputs.iter_mut().for_each(|v| rename(&mut v.name));
        self.outputs.iter_mut().for_each(|v| rename(&mut v.name));
        self.initializers.iter_mut().for_each(|c| rename(&mut c.name));
    }

    /// Replaces dimension `axis` of the named input or output with a symbolic one.
    ///
    /// # Returns
    /// `false` if no value with that name has such an axis.
    pub fn mark_dynamic(&mut self, value: &str, axis: usize, symbol: &str) -> bool {
        let mut found = false;
        for info in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            if info.name == value {
                if let Some(dim) = info.shape.get_mut(axis) {
                    *dim = Dim::Symbolic(symbol.to_string());
                    found = true;
                }
            }
        }
        found
    }

    /// Turns every initializer into a graph input, leaving the graph without stored weights.
    pub fn lift_initializers(&mut self) {
        for constant in self.initializers.drain(..) {
            self.inputs.push(constant.value_info());
        }
    }

    pub fn to_proto(&self) -> GraphProto {
        GraphProto {
            node: self.nodes.iter().map(Node::to_proto).collect(),
            name: self.name.clone(),
            initializer: self.initializers.iter().map(Constant::to_proto).collect(),
            input: self.inputs.iter().map(ValueInfo::to_proto).collect(),
            output: self.outputs.iter().map(ValueInfo::to_proto).collect(),
            ..Default::default()
        }
    }
}

/// Wraps a graph into a model declaring the default-domain opset `opset_version`.
pub fn model_proto(graph: &Graph, ir_version: i64, opset_version: i64) -> proto::ModelProto {
    proto::ModelProto {
        ir_version,
        opset_import: vec![proto::OperatorSetIdProto {
            domain: String::new(),
            version: opset_version,
        }],
        producer_name: env!("CARGO_PKG_NAME").to_string(),
        producer_version: env!("CARGO_PKG_VERSION").to_string(),
        graph: Some(graph.to_proto()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gemm_graph() -> Graph {
        Graph {
            name: "g".into(),
            inputs: vec![ValueInfo::float("x", vec![Dim::Fixed(1), Dim::Fixed(1)])],
            outputs: vec![ValueInfo::float("y", vec![Dim::Fixed(1), Dim::Fixed(1)])],
            nodes: vec![Node::new(
                "/linear/Gemm",
                "Gemm",
                vec!["x".into(), "w".into(), "b".into()],
                vec!["y".into()],
            )
            .with_attribute("alpha", Attribute::Float(1.0))],
            initializers: vec![
                Constant::new("w", vec![1, 1], vec![2.0]),
                Constant::new("b", vec![1], vec![0.5]),
            ],
        }
    }

    #[test]
    fn mark_dynamic_only_touches_named_values() {
        let mut graph = gemm_graph();

        assert!(graph.mark_dynamic("x", 0, "batch_size"));
        assert!(!graph.mark_dynamic("x", 5, "batch_size"));
        assert!(!graph.mark_dynamic("missing", 0, "batch_size"));

        assert_eq!(graph.inputs[0].shape[0], Dim::Symbolic("batch_size".into()));
        assert_eq!(graph.outputs[0].shape[0], Dim::Fixed(1));
    }

    #[test]
    fn rename_value_rewires_nodes_and_outputs() {
        let mut graph = gemm_graph();
        graph.rename_value("y", "output");

        assert_eq!(graph.nodes[0].outputs, vec!["output".to_string()]);
        assert_eq!(graph.outputs[0].name, "output");
    }

    #[test]
    fn lifted_initializers_become_inputs() {
        let mut graph = gemm_graph();
        graph.lift_initializers();

        assert!(graph.initializers.is_empty());
        let names: Vec<&str> = graph.inputs.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["x", "w", "b"]);
    }

    #[test]
    fn constants_are_stored_as_little_endian_raw_data() {
        let proto = Constant::new("b", vec![1], vec![1.0]).to_proto();

        assert_eq!(proto.raw_data, 1.0f32.to_le_bytes().to_vec());
        assert_eq!(proto.data_type, DataType::Float as i32);
        assert!(proto.float_data.is_empty());
    }

    #[test]
    fn attributes_carry_their_type_tag() {
        let proto = gemm_graph().nodes[0].to_proto();

        assert_eq!(proto.attribute[0].name, "alpha");
        assert_eq!(proto.attribute[0].r#type(), AttributeType::Float);
    }
}
