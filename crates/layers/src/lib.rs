pub mod layer;
pub mod popup;
pub mod query;
pub mod render;
pub mod symbology;

pub use layer::*;
pub use query::*;
pub use render::*;
pub use symbology::*;
