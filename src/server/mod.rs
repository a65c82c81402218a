pub mod builder;
pub mod handler;

pub use builder::{BoundServer, ServerBuilder};
pub use handler::RequestHandler;
