use std::{io::Write, path::PathBuf};

use burn::{config::Config, tensor::backend::AutodiffBackend, tensor::Tensor};
use log::warn;

use crate::{
    data::RegressionDataset,
    model::LearnedParameters,
    onnx::{export, ExportConfig, ExportError},
    training::{sgd_session, TrainingConfig},
};

/// Everything one train-and-export run needs.
#[derive(Config)]
pub struct PipelineConfig {
    pub training: TrainingConfig,
    pub export: ExportConfig,
    /// Where the ONNX file is written.
    #[config(default = "String::from(\"linear.onnx\")")]
    pub output_path: String,
}

/// What a completed run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub parameters: LearnedParameters,
    /// Path of the written artifact, or why export failed.
    pub export: Result<PathBuf, ExportError>,
}

/// Trains on the doubling dataset, prints the report to `out`, and exports the model.
///
/// Training failures are returned as errors. Export failures are printed and carried in the
/// outcome; the closing hint is printed either way.
pub fn run<B: AutodiffBackend>(
    config: PipelineConfig,
    device: B::Device,
    out: &mut impl Write,
) -> anyhow::Result<PipelineOutcome> {
    let dataset = RegressionDataset::doubling();
    let mut session = sgd_session::<B>(config.training, device.clone())?;

    writeln!(out, "Starting training of the linear model...")?;
    let mut write_error = None;
    let summary = session.fit(&dataset, |record| {
        if let Err(e) = writeln!(
            out,
            "Epoch [{}/{}], Loss: {:.4}",
            record.epoch, record.num_epochs, record.loss
        ) {
            write_error.get_or_insert(e);
        }
    })?;
    if let Some(e) = write_error {
        return Err(e.into());
    }
    writeln!(out, "Training finished.")?;

    let parameters = summary.parameters;
    writeln!(
        out,
        "Learned parameter '{}': [[{}]]",
        parameters.named()[0].0,
        parameters.weight
    )?;
    writeln!(
        out,
        "Learned parameter '{}': [{}]",
        parameters.named()[1].0,
        parameters.bias
    )?;

    // The model is not touched again after this point.
    let model = session.into_model();
    let example = Tensor::<B, 2>::from_floats([[0.5]], &device);
    let exported = export(&model, example, &config.output_path, &config.export);
    match &exported {
        Ok(path) => writeln!(out, "Model successfully exported to {}", path.display())?,
        Err(e) => {
            warn!("export failed: {e}");
            writeln!(out, "Error exporting model to ONNX: {e}")?;
        }
    }
    writeln!(
        out,
        "You can now use '{}' with ONNX Runtime or other ONNX-compatible tools.",
        config.output_path
    )?;

    Ok(PipelineOutcome {
        parameters,
        export: exported,
    })
}
