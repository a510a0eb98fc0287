mod receiver;
mod transferer;

pub use receiver::*;
pub use transferer::*;
