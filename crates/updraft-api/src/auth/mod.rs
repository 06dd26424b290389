pub mod middleware;
pub mod models;

pub use middleware::{requester_middleware, AuthConfig};
pub use models::RequesterContext;
