pub mod counter;
pub mod event_bus;

pub use counter::*;
pub use event_bus::*;
