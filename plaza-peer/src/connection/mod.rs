mod connection;
mod connection_event;
mod state;
mod subscription;

pub use connection::*;
pub use connection_event::*;
pub use state::*;
pub use subscription::*;
