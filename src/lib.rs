// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod normalize;
pub mod observability;
pub mod observer;
pub mod transport;
pub mod types;
pub mod utils;
pub mod websocket;

// Re-exports
pub use chat::{ChatSession, ConnectionStatus, Mode};
pub use client::{Backend, Endpoints};
pub use error::{Error, Result};
pub use normalize::{Normalized, NormalizedEntry, normalize, try_parse_structured};
pub use observability::register_biometrics;
pub use observer::{Notice, SessionObserver, Severity};
pub use transport::{
    CloseInfo, Connection, ConnectionDriver, ConnectionEvent, Outbound, RequestAdapter,
    StreamAdapter,
};
pub use types::*;
pub use websocket::WebSocketAdapter;
