use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use linear_onnx::onnx::{ModelInfo, TensorInfo};

/// Prints the inputs and outputs an ONNX model declares.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Path to the model, e.g. linear.onnx
    model: PathBuf,
}

fn print_tensors(kind: &str, tensors: &[TensorInfo]) {
    println!("\n--- {kind} Tensor Information ---");
    println!("Number of {} nodes: {}", kind.to_lowercase(), tensors.len());
    for (i, tensor) in tensors.iter().enumerate() {
        println!("  {kind} {i}:");
        println!("    Name: {}", tensor.name);
        println!("    Data Type: {}", tensor.elem_type);
        println!("    Shape: {}", tensor.shape_string());
        match tensor.element_count() {
            Some(count) => println!("    Total Elements (if static): {count}"),
            None => println!("    Total Elements: Varies (dynamic shape)"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("Attempting to load model from: {}", args.model.display());
    let info = ModelInfo::from_path(&args.model).with_context(|| {
        format!(
            "please ensure the model path '{}' is correct and the file exists",
            args.model.display()
        )
    })?;
    println!(
        "Model loaded (IR {}, opset {}, producer '{}').",
        info.ir_version,
        info.opset_version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        info.producer
    );

    print_tensors("Input", &info.inputs);
    print_tensors("Output", &info.outputs);
    Ok(())
}
