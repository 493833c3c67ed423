mod identity;
mod room_directory;

pub use identity::*;
pub use room_directory::*;
