pub mod config;
pub mod error;
pub mod measurement;
pub mod service;
pub mod session;
pub mod simulator;

pub use config::{default_config, load_config, SimulatorConfig};
pub use error::RemError;
pub use service::RemService;
pub use session::{Command, MeasurementDriver, SessionController, Stage};
pub use simulator::SimulatedRemService;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
