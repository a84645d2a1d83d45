//! Low-level I/O support for the TIFF layer

pub mod byte_order;
pub mod seekable;

pub use byte_order::{ByteOrder, ByteOrderHandler};
pub use seekable::SeekableReader;
