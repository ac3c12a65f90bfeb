use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use linear_onnx::onnx::OnnxRunner;
use log::info;

/// Runs numbers through an exported linear model and checks them against y = 2x.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input values, sent as one batch (1 to 5)
    #[arg(required = true, num_args = 1..=5, allow_negative_numbers = true)]
    values: Vec<f32>,
    /// ONNX model to load
    #[arg(short, long, default_value = "linear.onnx")]
    model: PathBuf,
}

/// `round(2x)` as an integer, so a value like -0.2 reads as `0` rather than `-0`.
fn expected_for(input: f32) -> i64 {
    (input * 2.0).round() as i64
}

fn passes(input: f32, output: f32) -> bool {
    output.round() as i64 == expected_for(input)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let runner = OnnxRunner::load(&args.model)
        .with_context(|| format!("loading {}", args.model.display()))?;
    info!("running {} value(s)", args.values.len());
    let outputs = runner.run(&args.values)?;

    for (i, (input, output)) in args.values.iter().zip(&outputs).enumerate() {
        let expected = expected_for(*input);
        let passed = passes(*input, *output);

        println!("Input {}: {input}", i + 1);
        println!("Output {}: {output}", i + 1);
        println!("Expected {}: {expected}", i + 1);
        println!("Test {} {}", i + 1, if passed { "PASSED" } else { "FAILED" });
        println!("-------------------");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_negative_inputs_expect_plain_zero() {
        assert_eq!(expected_for(-0.2).to_string(), "0");
        assert_eq!(expected_for(-0.2), 0);
        assert!(passes(-0.2, -0.39));
        assert!(passes(-0.2, 0.1));
    }

    #[test]
    fn outputs_are_compared_after_rounding() {
        assert_eq!(expected_for(3.0), 6);
        assert_eq!(expected_for(-2.5), -5);
        assert!(passes(7.0, 13.98));
        assert!(!passes(7.0, 12.4));
    }
}
