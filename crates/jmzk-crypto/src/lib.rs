pub mod digest;
pub mod error;
pub mod keypair;
pub mod recovery;

pub use digest::sha256;
pub use error::CryptoError;
pub use keypair::KeyPair;
pub use recovery::{recover_public_key, verify};
