pub mod crypto;
pub mod scp;
pub mod transport;

pub use crypto::{Crypto, CryptoError, KeyConverter, SshKeygen};
pub use scp::ScpTransport;
pub use transport::{Direction, TransportCapabilities, TransportEngine, TransportError};
