pub mod endpoint;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod request;

pub use endpoint::*;
pub use error::*;
pub use pipeline::*;
pub use protocol::*;
pub use request::*;
