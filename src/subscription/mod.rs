// Viewer connection sessions and wire protocol

pub mod manager;
pub mod protocol;

pub use manager::ConnectionSession;
pub use protocol::{ClientMessage, ServerMessage, MAX_ROOM_NAME_LEN};
