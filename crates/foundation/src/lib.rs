pub mod bounds;
pub mod format;
pub mod time;

// Coordinates, formatting and time shared by every crate.
pub use bounds::*;
pub use format::*;
pub use time::*;
