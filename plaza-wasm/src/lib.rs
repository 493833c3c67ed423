//! Browser bindings: WebSocket transport, WebRTC media peers and a JS-facing
//! client handle over `plaza-client`.

mod engine;
mod host;
mod logger;
mod media;

pub use engine::{ClientOptions, IceServerConfig, PlazaClient};
