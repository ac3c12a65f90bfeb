use std::{fmt, fs, path::Path};

use prost::Message;

use super::{
    error::InspectError,
    graph::Dim,
    proto::{
        tensor_shape_proto::dimension, type_proto, DataType, ModelProto, TensorProto,
        ValueInfoProto,
    },
};

/// Element type of a graph value, as declared in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElemType(pub i32);

impl ElemType {
    pub fn name(self) -> &'static str {
        match DataType::try_from(self.0) {
            Ok(DataType::Undefined) => "undefined",
            Ok(DataType::Float) => "float",
            Ok(DataType::Uint8) => "uint8",
            Ok(DataType::Int8) => "int8",
            Ok(DataType::Uint16) => "uint16",
            Ok(DataType::Int16) => "int16",
            Ok(DataType::Int32) => "int32",
            Ok(DataType::Int64) => "int64",
            Ok(DataType::String) => "string",
            Ok(DataType::Bool) => "bool",
            Ok(DataType::Float16) => "float16",
            Ok(DataType::Double) => "double",
            Ok(DataType::Uint32) => "uint32",
            Ok(DataType::Uint64) => "uint64",
            Ok(DataType::Complex64) => "complex64",
            Ok(DataType::Complex128) => "complex128",
            Ok(DataType::Bfloat16) => "bfloat16",
            Err(_) => "unknown",
        }
    }
}

impl fmt::Display for ElemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A declared graph input or output.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorInfo {
    pub name: String,
    pub elem_type: ElemType,
    /// An unknown dimension (neither value nor symbol) reads as an empty symbol.
    pub shape: Vec<Dim>,
}

impl TensorInfo {
    pub fn is_static(&self) -> bool {
        self.shape.iter().all(|d| !d.is_symbolic())
    }

    /// Product of all dimensions, when every one is fixed.
    pub fn element_count(&self) -> Option<i64> {
        self.shape
            .iter()
            .map(|d| match d {
                Dim::Fixed(n) => Some(*n),
                Dim::Symbolic(_) => None,
            })
            .product()
    }

    /// Shape as `[dynamic, 1]`.
    pub fn shape_string(&self) -> String {
        let dims: Vec<String> = self
            .shape
            .iter()
            .map(|d| match d {
                Dim::Fixed(n) => n.to_string(),
                Dim::Symbolic(_) => "dynamic".to_string(),
            })
            .collect();
        format!("[{}]", dims.join(", "))
    }

    fn from_proto(value: &ValueInfoProto) -> Result<Self, InspectError> {
        let tensor = match value.r#type.as_ref().and_then(|t| t.value.as_ref()) {
            Some(type_proto::Value::TensorType(tensor)) => tensor,
            None => {
                return Err(InspectError::Malformed(format!(
                    "value '{}' is not a tensor",
                    value.name
                )))
            }
        };
        let shape = tensor
            .shape
            .as_ref()
            .map(|shape| {
                shape
                    .dim
                    .iter()
                    .map(|d| match &d.value {
                        Some(dimension::Value::DimValue(n)) => Dim::Fixed(*n),
                        Some(dimension::Value::DimParam(name)) => Dim::Symbolic(name.clone()),
                        None => Dim::Symbolic(String::new()),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            name: value.name.clone(),
            elem_type: ElemType(tensor.elem_type),
            shape,
        })
    }
}

/// A stored parameter or constant.
#[derive(Debug, Clone, PartialEq)]
pub struct InitializerInfo {
    pub name: String,
    pub elem_type: ElemType,
    pub dims: Vec<i64>,
    /// Decoded values of a float tensor; empty for every other element type.
    pub values: Vec<f32>,
}

impl InitializerInfo {
    fn from_proto(tensor: &TensorProto) -> Result<Self, InspectError> {
        let elem_type = ElemType(tensor.data_type);
        let values = if tensor.data_type != DataType::Float as i32 {
            Vec::new()
        } else if !tensor.raw_data.is_empty() {
            if tensor.raw_data.len() % 4 != 0 {
                return Err(InspectError::Malformed(format!(
                    "initializer '{}' has {} raw bytes",
                    tensor.name,
                    tensor.raw_data.len()
                )));
            }
            tensor
                .raw_data
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        } else {
            tensor.float_data.clone()
        };
        Ok(Self {
            name: tensor.name.clone(),
            elem_type,
            dims: tensor.dims.clone(),
            values,
        })
    }
}

/// What an ONNX file declares about itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub ir_version: i64,
    /// Default-domain opset, if imported.
    pub opset_version: Option<i64>,
    pub producer: String,
    /// Graph inputs that are not initializers.
    pub inputs: Vec<TensorInfo>,
    pub outputs: Vec<TensorInfo>,
    pub initializers: Vec<InitializerInfo>,
    pub op_types: Vec<String>,
}

impl ModelInfo {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InspectError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| InspectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InspectError> {
        let model = ModelProto::decode(bytes)?;
        let graph = model
            .graph
            .as_ref()
            .ok_or_else(|| InspectError::Malformed("model has no graph".into()))?;

        let initializers = graph
            .initializer
            .iter()
            .map(InitializerInfo::from_proto)
            .collect::<Result<Vec<_>, _>>()?;
        let inputs = graph
            .input
            .iter()
            .filter(|v| !initializers.iter().any(|init| init.name == v.name))
            .map(TensorInfo::from_proto)
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = graph
            .output
            .iter()
            .map(TensorInfo::from_proto)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            ir_version: model.ir_version,
            opset_version: model
                .opset_import
                .iter()
                .find(|op| op.domain.is_empty() || op.domain == "ai.onnx")
                .map(|op| op.version),
            producer: model.producer_name.clone(),
            inputs,
            outputs,
            initializers,
            op_types: graph.node.iter().map(|n| n.op_type.clone()).collect(),
        })
    }

    pub fn initializer(&self, name: &str) -> Option<&InitializerInfo> {
        self.initializers.iter().find(|init| init.name == name)
    }
}
