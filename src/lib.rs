// Library module declarations
pub mod backend;
pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod detail;
pub mod error;
pub mod export;
pub mod flows;
pub mod model;
pub mod notify;
pub mod packets;
pub mod query;
pub mod session;
pub mod stats;
pub mod store;
pub mod unanswered;
pub mod view_state;

pub use backend::{CaptureBackend, HttpBackend};
pub use config::ClientConfig;
pub use coordinator::{Snapshot, ViewCoordinator};
pub use error::ClientError;
