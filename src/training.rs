use burn::{
    config::Config,
    nn::loss::{MseLoss, Reduction},
    optim::{GradientsParams, Optimizer, SgdConfig},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use log::{debug, info};

use crate::{
    data::RegressionDataset,
    error::TrainingError,
    model::{LearnedParameters, LinearRegression, LinearRegressionConfig},
};

/// Training configuration for the full-batch regression loop.
#[derive(Config)]
pub struct TrainingConfig {
    /// Model configuration.
    pub model: LinearRegressionConfig,
    /// Optimizer configuration.
    pub optimizer: SgdConfig,
    /// Number of training epochs.
    #[config(default = 500)]
    pub num_epochs: usize,
    /// Learning rate.
    #[config(default = 0.01)]
    pub learning_rate: f64,
    /// Every `log_interval`-th epoch is reported to the observer.
    #[config(default = 50)]
    pub log_interval: usize,
    /// Backend seed applied before the model is initialized.
    #[config(default = "None")]
    pub seed: Option<u64>,
}

impl TrainingConfig {
    /// Checks the values the loop relies on.
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.num_epochs == 0 {
            return Err(TrainingError::InvalidConfig("num_epochs must be > 0".into()));
        }
        if self.log_interval == 0 {
            return Err(TrainingError::InvalidConfig("log_interval must be > 0".into()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(TrainingError::InvalidConfig(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Loss observed at the end of one epoch's forward pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochRecord {
    /// 1-based epoch index.
    pub epoch: usize,
    pub num_epochs: usize,
    pub loss: f32,
}

/// Outcome of a completed training run.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    /// One record per epoch, in order.
    pub history: Vec<EpochRecord>,
    pub parameters: LearnedParameters,
}

impl TrainingSummary {
    pub fn final_loss(&self) -> Option<f32> {
        self.history.last().map(|record| record.loss)
    }
}

/// Everything a training run owns: config, device, model and optimizer state.
pub struct TrainingSession<B: AutodiffBackend, O> {
    config: TrainingConfig,
    device: B::Device,
    model: LinearRegression<B>,
    optimizer: O,
}

/// Builds a session driven by the SGD optimizer described in `config.optimizer`.
///
/// # Arguments
/// * `config` - Training configuration.
/// * `device` - The device used for training.
pub fn sgd_session<B: AutodiffBackend>(
    config: TrainingConfig,
    device: B::Device,
) -> Result<TrainingSession<B, impl Optimizer<LinearRegression<B>, B>>, TrainingError> {
    let optimizer = config.optimizer.init::<B, LinearRegression<B>>();
    TrainingSession::new(config, device, optimizer)
}

impl<B, O> TrainingSession<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<LinearRegression<B>, B>,
{
    /// Validates the config, seeds the backend if requested and initializes the model.
    pub fn new(
        config: TrainingConfig,
        device: B::Device,
        optimizer: O,
    ) -> Result<Self, TrainingError> {
        config.validate()?;
        if let Some(seed) = config.seed {
            B::seed(seed);
        }
        let model = config.model.init::<B>(&device);
        Ok(Self {
            config,
            device,
            model,
            optimizer,
        })
    }

    /// Trains for `num_epochs` full-batch epochs over `dataset`.
    ///
    /// `on_log` receives every `log_interval`-th epoch record.
    pub fn fit<F>(
        &mut self,
        dataset: &RegressionDataset,
        mut on_log: F,
    ) -> Result<TrainingSummary, TrainingError>
    where
        F: FnMut(&EpochRecord),
    {
        let num_epochs = self.config.num_epochs;
        let (inputs, targets) = dataset.to_tensors::<B>(&self.device);
        let loss_fn = MseLoss::new();
        let mut history = Vec::with_capacity(num_epochs);

        info!(
            "training on {} samples for {num_epochs} epochs (lr = {})",
            dataset.len(),
            self.config.learning_rate
        );

        for epoch in 1..=num_epochs {
            let prediction = self.model.forward(inputs.clone());
            let loss = loss_fn.forward(prediction, targets.clone(), Reduction::Mean);

            let value = loss.clone().into_scalar().elem::<f32>();
            if !value.is_finite() {
                return Err(TrainingError::Diverged { epoch, loss: value });
            }

            // Each backward pass yields a fresh gradient set; nothing carries over.
            let grads = GradientsParams::from_grads(loss.backward(), &self.model);
            self.model = self
                .optimizer
                .step(self.config.learning_rate, self.model.clone(), grads);

            let record = EpochRecord {
                epoch,
                num_epochs,
                loss: value,
            };
            history.push(record);
            if epoch % self.config.log_interval == 0 {
                debug!("epoch {epoch}: loss {value}");
                on_log(&record);
            }
        }

        let parameters = self.model.parameters().map_err(TrainingError::Tensor)?;
        info!(
            "training finished: weight = {}, bias = {}",
            parameters.weight, parameters.bias
        );
        Ok(TrainingSummary {
            history,
            parameters,
        })
    }

    pub fn into_model(self) -> LinearRegression<B> {
        self.model
    }
}
