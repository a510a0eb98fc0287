mod relay;
mod roster;

pub use relay::*;
pub use roster::*;
