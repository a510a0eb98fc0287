mod orchestrator;
mod orchestrator_command;
mod orchestrator_event;
mod orchestrator_handle;
mod scheduler;

pub use orchestrator::*;
pub use orchestrator_command::*;
pub use orchestrator_event::*;
pub use orchestrator_handle::*;
pub use scheduler::*;
