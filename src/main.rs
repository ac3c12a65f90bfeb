use burn::{backend::Autodiff, optim::SgdConfig};
use linear_onnx::{onnx::ExportConfig, LinearRegressionConfig, PipelineConfig, TrainingConfig};

#[cfg(not(feature = "wgpu"))]
mod backend {
    pub type Backend = burn_ndarray::NdArray<f32, i32>;
    pub type Device = burn_ndarray::NdArrayDevice;
}

#[cfg(feature = "wgpu")]
mod backend {
    pub type Backend = burn::backend::Wgpu<f32, i32>;
    pub type Device = burn::backend::wgpu::WgpuDevice;
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    type AutodiffBackend = Autodiff<backend::Backend>;
    let device = backend::Device::default();

    // Create the pipeline configuration.
    let config = PipelineConfig::new(
        TrainingConfig::new(LinearRegressionConfig::new(), SgdConfig::new()),
        ExportConfig::new(),
    );

    let mut stdout = std::io::stdout().lock();
    linear_onnx::run::<AutodiffBackend>(config, device, &mut stdout)?;
    Ok(())
}
