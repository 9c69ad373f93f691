//! Executable shell around the coordination engine: configuration loading,
//! telemetry, and the stdio transport that drives a `FacadeDispatcher`.

pub mod config;
pub mod setup;
pub mod stdio;
pub mod telemetry;

pub use config::Config;
pub use setup::{create_dispatcher, create_facade, create_store, ensure_database_directory, initialize_app};
pub use stdio::StdioServer;
pub use telemetry::init_telemetry;
