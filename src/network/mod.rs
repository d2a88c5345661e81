//! Device-producer link: wire codec, transport and the reconnecting session.
pub mod protocol;
pub mod session;
pub mod state;
pub mod transport;

pub use protocol::{decode, InboundMessage, OutboundMessage};
pub use session::MetricsSession;
pub use state::SessionState;
pub use transport::{Connection, Transport, WebSocketTransport};
