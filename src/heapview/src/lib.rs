//! # heapview
//!
//! Decoder and analysis library for Go heap dump files (the `go1.7 heap dump`
//! format written by `runtime/debug.WriteHeapDump`).
//!
//! This library provides functionality to:
//! - Decode the tag-prefixed binary records of a heap dump stream
//! - Build an address-indexed pointer graph from Object and StackFrame records
//! - Compute transitively owned size and object count for any heap address
//! - Look up the stack frames that keep a given address live
//!
//! ## Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut reader = BufReader::new(File::open("heap.dump")?);
//!
//! let mut builder = heapview::HeapBuilder::new();
//! heapview::read_dump(&mut reader, &mut builder)?;
//!
//! if let Some(heap) = builder.finish() {
//!     for object in heap.objects() {
//!         let stats = heap.owned_stats(object.addr);
//!         println!("{}: owns {} bytes in {} objects",
//!             object.addr, stats.owned_size, stats.owned_count);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod format;
pub mod heap;

// Re-export commonly used items
#[doc(inline)]
pub use format::{read_dump, ReadError, RecordHandler};
#[doc(inline)]
pub use heap::{Address, Endianness, Heap, HeapBuilder, HeapError, OwnedStats};
