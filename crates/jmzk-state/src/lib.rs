pub mod cache;
pub mod snapshot;
pub mod tdb;

pub use cache::TdbCache;
pub use snapshot::{SnapshotReader, SnapshotWriter};
pub use tdb::{encode, PutOp, Session, Tdb, TdbKey, TdbListener, TokenType};
