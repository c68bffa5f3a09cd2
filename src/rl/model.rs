//! Q-network using Burn framework

use std::error::Error;
use std::path::Path;

use burn::module::Module;
use burn::nn::loss::{MseLoss, Reduction};
use burn::nn::{Linear, LinearConfig, Relu};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::AutodiffBackend;

use super::policy::Predictor;

/// Configuration for the Q-network
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Number of hidden layers
    pub num_layers: usize,
    /// Hidden layer size
    pub width_layers: usize,
    /// Learning rate
    pub learning_rate: f64,
    /// State vector length
    pub input_dim: usize,
    /// Number of actions
    pub output_dim: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            num_layers: 4,
            width_layers: 400,
            learning_rate: 1e-3,
            input_dim: 80,
            output_dim: 4,
        }
    }
}

/// Fully connected network mapping a state to one value per action
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    /// Input layer
    input: Linear<B>,
    /// Hidden layers
    hidden: Vec<Linear<B>>,
    /// Output layer (linear action values)
    output: Linear<B>,
    /// Activation function
    activation: Relu,
}

impl<B: Backend> QNetwork<B> {
    pub fn new(device: &B::Device, config: &ModelConfig) -> Self {
        let input = LinearConfig::new(config.input_dim, config.width_layers).init(device);

        let mut hidden = Vec::new();
        for _ in 1..config.num_layers {
            hidden.push(LinearConfig::new(config.width_layers, config.width_layers).init(device));
        }

        let output = LinearConfig::new(config.width_layers, config.output_dim).init(device);

        Self {
            input,
            hidden,
            output,
            activation: Relu::new(),
        }
    }

    pub fn forward(&self, states: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = self.activation.forward(self.input.forward(states));

        for layer in &self.hidden {
            x = self.activation.forward(layer.forward(x));
        }

        self.output.forward(x)
    }
}

/// Trainable Q-network with its optimizer state
pub struct DqnModel<B: AutodiffBackend> {
    network: QNetwork<B>,
    optimizer: OptimizerAdaptor<Adam, QNetwork<B>, B>,
    config: ModelConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> DqnModel<B> {
    pub fn new(device: B::Device, config: ModelConfig) -> Self {
        let network = QNetwork::new(&device, &config);
        let optimizer = AdamConfig::new().init::<B, QNetwork<B>>();

        Self {
            network,
            optimizer,
            config,
            device,
        }
    }

    /// Load weights saved by `Predictor::save`
    pub fn load(device: B::Device, config: ModelConfig, path: &Path) -> Result<Self, Box<dyn Error>> {
        let mut model = Self::new(device, config);
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        model.network = model
            .network
            .clone()
            .load_file(path.to_path_buf(), &recorder, &model.device)
            .map_err(|err| format!("Failed to load model from {}: {:?}", path.display(), err))?;
        tracing::info!("Loaded model from {}", path.display());
        Ok(model)
    }

    fn states_to_tensor(&self, states: &[Vec<f32>]) -> Tensor<B, 2> {
        let flat: Vec<f32> = states.iter().flatten().copied().collect();
        Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([states.len(), self.config.input_dim])
    }

    fn tensor_to_rows(&self, values: Tensor<B, 2>) -> Vec<Vec<f32>> {
        let flat: Vec<f32> = values
            .into_data()
            .to_vec::<f32>()
            .expect("Q-values are f32");
        flat.chunks(self.config.output_dim.max(1))
            .map(|row| row.to_vec())
            .collect()
    }
}

impl<B: AutodiffBackend> Predictor for DqnModel<B> {
    fn input_dim(&self) -> usize {
        self.config.input_dim
    }

    fn output_dim(&self) -> usize {
        self.config.output_dim
    }

    fn predict_one(&self, state: &[f32]) -> Vec<f32> {
        self.predict_batch(&[state.to_vec()])
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    fn predict_batch(&self, states: &[Vec<f32>]) -> Vec<Vec<f32>> {
        if states.is_empty() {
            return Vec::new();
        }
        let q_values = self.network.forward(self.states_to_tensor(states));
        self.tensor_to_rows(q_values)
    }

    fn train_batch(&mut self, states: &[Vec<f32>], targets: &[Vec<f32>]) -> f32 {
        if states.is_empty() {
            return 0.0;
        }

        let inputs = self.states_to_tensor(states);
        let flat_targets: Vec<f32> = targets.iter().flatten().copied().collect();
        let targets = Tensor::<B, 1>::from_floats(flat_targets.as_slice(), &self.device)
            .reshape([states.len(), self.config.output_dim]);

        let predictions = self.network.forward(inputs);
        let loss = MseLoss::new().forward(predictions, targets, Reduction::Mean);

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.network);
        self.network = self
            .optimizer
            .step(self.config.learning_rate, self.network.clone(), grads);

        loss.into_data().to_vec::<f32>().expect("loss is f32")[0]
    }

    fn save(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        self.network
            .clone()
            .save_file(path.to_path_buf(), &recorder)
            .map_err(|err| format!("Failed to save model to {}: {:?}", path.display(), err))?;
        tracing::info!("Saved model to {}", path.display());
        Ok(())
    }
}
