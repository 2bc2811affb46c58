pub mod annotations;
pub mod config;
pub mod error;
pub mod io;
pub mod metrics;
pub mod navigation;
pub mod plot;
pub mod signal;
pub mod store;
pub mod views;
pub mod window;

pub use annotations::*;
pub use config::ViewerConfig;
pub use error::{EcgError, Result};
pub use signal::*;
pub use store::*;
pub use window::*;
