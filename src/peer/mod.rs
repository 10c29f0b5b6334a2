pub mod answerer;
pub mod codec;
pub mod connection;
pub mod ice;
pub mod media;
pub mod types;

pub use codec::Encoding;
pub use media::{MediaConstraints, MediaDevices, MediaStream, SyntheticDevices};
pub use types::{CallRequest, CallResponse, CaptureSource, ErrorResponse, ServerConfig};
