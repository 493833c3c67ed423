mod participant_session;

pub use participant_session::*;
