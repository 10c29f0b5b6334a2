pub mod call_api;
pub mod serve_api;

pub use call_api::{run_call, CallOptions};
pub use serve_api::{router, serve, serve_on};
