pub use plaza_core::{GridPosition, RoomId, UserId};

pub mod model {
    pub use plaza_core::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use plaza_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use plaza_client::*;
}

#[cfg(feature = "wasm")]
pub mod wasm {
    pub use plaza_wasm::*;
}
