mod local;
mod panner;
mod remote;
mod spatial;
mod voice_activity;

pub use local::*;
pub use panner::*;
pub use remote::*;
pub use spatial::*;
pub use voice_activity::*;
