use std::error::Error;

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use dotenv::dotenv;
use tlcs::config::{Mode, Settings};
use tlcs::infra::SimulatorConnection;
use tlcs::rl::{DqnModel, ExplorationPolicy, Predictor, Simulation, Trainer};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

type TrainBackend = Autodiff<NdArray>;

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tlcs=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

async fn train(settings: &Settings, connection: &mut SimulatorConnection) -> Result<(), Box<dyn Error>> {
    let model = DqnModel::<TrainBackend>::new(NdArrayDevice::default(), settings.model_config());
    let mut trainer = Trainer::new(model, settings.train_config());

    trainer.train(connection).await?;

    std::fs::create_dir_all(&settings.models_path)?;
    trainer
        .predictor()
        .save(&settings.models_path.join("model"))?;
    tracing::info!("Session info saved at {}", settings.models_path.display());

    Ok(())
}

async fn test(settings: &Settings, connection: &mut SimulatorConnection) -> Result<(), Box<dyn Error>> {
    let model = DqnModel::<TrainBackend>::load(
        NdArrayDevice::default(),
        settings.model_config(),
        &settings.model_path,
    )?;
    let mut simulation = Simulation::new(settings.env_config(), settings.seed);

    tracing::info!("----- Test episode");
    let elapsed = simulation
        .run(connection, &model, ExplorationPolicy::Greedy, None)
        .await?;

    let summary = simulation.summary();
    let total_reward: f64 = simulation.reward_episode().iter().sum();
    tracing::info!("Simulation time: {:.1}s", elapsed.as_secs_f64());
    tracing::info!(
        "Total reward: {:.1} (negative {:.1}) - Delay: {:.0}s - Avg queue: {:.2}",
        total_reward,
        summary.negative_reward,
        summary.cumulative_wait,
        summary.avg_queue_length
    );

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    init_logging();

    let settings = Settings::from_env()?;
    tracing::info!("Mode: {:?}, simulator at {}", settings.mode, settings.host);

    let mut connection =
        SimulatorConnection::new(&settings.host, settings.launch_options()?).await?;

    match settings.mode {
        Mode::Train => train(&settings, &mut connection).await,
        Mode::Test => test(&settings, &mut connection).await,
    }
}
