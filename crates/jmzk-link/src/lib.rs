pub mod base42;
pub mod link;
pub mod segment;

pub use link::{JmzkLink, FLAG_DESTROY, FLAG_EVERIPASS, FLAG_EVERIPAY, FLAG_VERSION1};
pub use segment::{Segment, SegmentValue};
