//! Cross-cutting utilities: error taxonomy, OCPP-J framing, shutdown.

pub mod errors;
pub mod ocpp_frame;
pub mod shutdown;

pub use errors::{AppError, DomainError, DomainResult, InfraError};
pub use ocpp_frame::{OcppFrame, OcppFrameError};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
