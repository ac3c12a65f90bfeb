//! ONNX export, inspection and execution.
//!
//! - [`export`]: trace a model and write it as an ONNX file.
//! - [`inspect`]: read back what a file declares (shapes, parameters).
//! - [`runtime`]: execute a file with `tract`.

pub mod error;
pub mod export;
pub mod fold;
pub mod graph;
pub mod inspect;
pub mod proto;
pub mod runtime;
pub mod trace;

pub use error::{ExportError, InspectError};
pub use export::{build_graph, export, ExportConfig};
pub use inspect::{ElemType, InitializerInfo, ModelInfo, TensorInfo};
pub use runtime::OnnxRunner;
pub use trace::{trace, Traceable, Tracer};
