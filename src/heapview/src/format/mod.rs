//! Heap dump file decoding.
//!
//! A dump stream starts with a fixed 16-byte signature, followed by a
//! sequence of records, each prefixed with an unsigned-varint kind tag.
//! Tag 0 terminates the stream. Every other tag selects a fixed field
//! sequence of varints, length-prefixed buffers, offset lists, nested
//! stack-entry lists, or a 256-slot GC pause histogram.
//!
//! The format is described at
//! <https://github.com/golang/go/wiki/heapdump15-through-heapdump17>.
//! Decoding is strictly sequential and single-pass; a dump is usable only
//! up to the first malformed byte, so every decode error is fatal.

mod reader;
mod records;
mod wire;

pub use reader::{read_dump, RecordHandler};
pub use records::{
    AllocProfile, AllocStackSample, Defer, DumpParams, Finalizer, Frame, Goroutine, Itab, MemStats,
    Object, OsThread, OtherRoot, Panic, Segment, StackFrame, TypeDesc,
};

/// Signature identifying the supported dump format and version.
pub const MAGIC: [u8; 16] = *b"go1.7 heap dump\n";

/// Fatal decode failure. A dump file is treated as all-or-nothing up to the
/// first malformed record; none of these conditions is recoverable.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("unknown format: {}", String::from_utf8_lossy(.0))]
    BadMagic(Vec<u8>),

    #[error("unknown record type: {0}")]
    UnknownRecordType(u64),

    #[error("unknown field kind: {0}")]
    UnknownFieldKind(u64),

    #[error("unknown bool value: {0}")]
    InvalidBool(u64),

    #[error("varint overflows 64 bits")]
    VarintOverflow,

    #[error("buffer length {0} does not fit in memory")]
    BufferLength(u64),

    #[error("unexpected end of dump while reading {0}")]
    Truncated(&'static str),

    #[error(transparent)]
    Io(std::io::Error),

    #[error("record handler failed")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ReadError {
    /// Wrap a failure raised by a [`RecordHandler`] callback so it
    /// propagates out of [`read_dump`] unchanged.
    pub fn handler<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ReadError::Handler(Box::new(err))
    }
}
