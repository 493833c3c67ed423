pub mod app;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod lobby;
mod room;
mod session;
mod signaling;

pub use app::router;
pub use error::GatewayError;
pub use room::*;
pub use session::*;
pub use signaling::*;
