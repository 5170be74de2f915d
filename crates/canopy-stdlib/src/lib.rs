//!
//! Standard host collaborators for the Canopy renderer
//!
//! * [`ReqwestTransport`]: the fetch collaborator, performing data source
//!   requests with `reqwest`
//! * [`OutlineRenderer`]: a leaf render collaborator producing an indented
//!   text outline of a resolved tree

pub mod components;
mod error;

pub use components::{OutlineRenderer, ReqwestTransport, TransportConfig};
pub use error::StdlibError;
