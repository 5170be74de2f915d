// Host collaborators

pub mod http;
pub mod outline;

pub use http::*;
pub use outline::*;
