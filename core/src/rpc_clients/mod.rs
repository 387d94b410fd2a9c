pub mod transport;

pub use transport::{HeaderInjectingTransport, SharedClientTransportBuilder};
