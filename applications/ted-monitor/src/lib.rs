pub mod aggregate;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod output;
pub mod render;
pub mod scheduler;
pub mod snapshot;
pub mod transport;

// Re-export commonly used items
pub use config::{Config, MonitorSettings};
pub use error::{AppError, Result, TransportError};
pub use gateway::{DeviceGateway, GatewayError};
pub use render::{MacroKind, MacroRenderer, RenderOptions};
pub use scheduler::{CycleReport, Scheduler};
pub use snapshot::{Snapshot, SnapshotStore, StoreState};
pub use transport::{HttpTransport, RestClient, Transport, WireFormat};
