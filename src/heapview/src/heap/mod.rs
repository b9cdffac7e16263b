//! In-memory pointer graph built from heap dump records.
//!
//! The graph is build-once, read-many: records are ingested sequentially
//! (see [`HeapBuilder`]), then queried. There is no update or delete, and
//! no synchronization; the whole model lives for one analysis run.

use std::collections::{HashMap, HashSet};
use std::fmt;

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use serde::Serialize;
use thiserror::Error;

use crate::format;

mod builder;
pub use builder::HeapBuilder;

/// Width of a pointer word stored in raw object contents.
const POINTER_SIZE: usize = 8;

#[derive(Debug, Error)]
pub enum HeapError {
    #[error("DumpParams missing, endianness unknown")]
    EndiannessUnknown,

    #[error("pointer offset {offset} out of bounds for {size}-byte contents of {address}")]
    PointerOffsetOutOfBounds {
        address: Address,
        offset: u64,
        size: usize,
    },
}

/// A heap or stack address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Byte order used to read pointer words out of raw record contents.
/// Fixed once per dump by its DumpParams record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    pub fn read_u64(self, buf: &[u8]) -> u64 {
        match self {
            Endianness::Little => LittleEndian::read_u64(buf),
            Endianness::Big => BigEndian::read_u64(buf),
        }
    }
}

/// A heap object with its pointer list already derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub addr: Address,
    pub size: u64,
    pub pointers: Vec<Address>,
}

/// A stack frame with its pointer list already derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub addr: Address,
    pub func_name: String,
    pub size: u64,
    pub pointers: Vec<Address>,
}

/// Aggregate over everything transitively reachable from an address,
/// excluding the start object itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OwnedStats {
    pub owned_size: u64,
    pub owned_count: u64,
}

/// Address-indexed model of one dump: objects, stack frames, goroutine
/// roots, and a reverse index from pointee address to referencing frames.
pub struct Heap {
    endianness: Endianness,
    objects: HashMap<Address, Object>,
    stack_frames: HashMap<Address, StackFrame>,
    goroutines: HashSet<Address>,
    frame_ptr_index: HashMap<Address, Vec<Address>>,
}

impl Heap {
    pub fn new(endianness: Endianness) -> Self {
        Heap {
            endianness,
            objects: HashMap::new(),
            stack_frames: HashMap::new(),
            goroutines: HashSet::new(),
            frame_ptr_index: HashMap::new(),
        }
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Ingest an Object record. Pointers are derived once, here; they are
    /// never recomputed. Re-ingesting an address overwrites the earlier
    /// object.
    pub fn add_object(&mut self, record: format::Object) -> Result<(), HeapError> {
        let addr = Address(record.address);
        let pointers = derive_pointers(
            addr,
            &record.contents,
            &record.pointer_offsets,
            self.endianness,
        )?;

        self.objects.insert(
            addr,
            Object {
                addr,
                size: record.contents.len() as u64,
                pointers,
            },
        );

        Ok(())
    }

    /// Ingest a StackFrame record and extend the pointee-to-frame reverse
    /// index with every pointer the frame carries.
    pub fn add_stack_frame(&mut self, record: format::StackFrame) -> Result<(), HeapError> {
        let addr = Address(record.address);
        let pointers = derive_pointers(
            addr,
            &record.contents,
            &record.pointer_offsets,
            self.endianness,
        )?;

        for &pointer in &pointers {
            self.frame_ptr_index.entry(pointer).or_default().push(addr);
        }

        self.stack_frames.insert(
            addr,
            StackFrame {
                addr,
                func_name: record.func_name,
                size: record.contents.len() as u64,
                pointers,
            },
        );

        Ok(())
    }

    /// Ingest a Goroutine record. Only the top stack-frame address is
    /// retained; goroutine attributes are not modeled.
    pub fn add_goroutine(&mut self, record: &format::Goroutine) {
        self.goroutines.insert(Address(record.frame));
    }

    /// Iterate all objects. Order is unspecified.
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    pub fn object(&self, addr: Address) -> Option<&Object> {
        self.objects.get(&addr)
    }

    /// Addresses of the top stack frames of all goroutines.
    pub fn goroutine_roots(&self) -> impl Iterator<Item = Address> + '_ {
        self.goroutines.iter().copied()
    }

    /// Every stack frame whose pointer fields reference `addr`, in frame
    /// ingestion order. A frame referencing `addr` from several offsets
    /// appears once per offset.
    pub fn frames_referencing(&self, addr: Address) -> Vec<&StackFrame> {
        let Some(frame_addrs) = self.frame_ptr_index.get(&addr) else {
            return Vec::new();
        };

        frame_addrs
            .iter()
            .filter_map(|frame_addr| self.stack_frames.get(frame_addr))
            .collect()
    }

    /// Walk every object transitively reachable from `start`, excluding the
    /// start object itself, invoking `object_fn` exactly once per object.
    ///
    /// Uses an explicit work list rather than recursion: pointer chains in
    /// real dumps run far deeper than a safe call-stack depth. Addresses
    /// with no corresponding object (dangling pointers) are skipped.
    pub fn walk_pointers<F>(&self, start: Address, mut object_fn: F)
    where
        F: FnMut(&Object),
    {
        let mut visited = HashSet::new();
        visited.insert(start);

        let mut pending = vec![start];

        while let Some(addr) = pending.pop() {
            let Some(current) = self.objects.get(&addr) else {
                continue;
            };

            for &pointer in &current.pointers {
                if !visited.insert(pointer) {
                    continue;
                }

                let Some(object) = self.objects.get(&pointer) else {
                    continue;
                };

                object_fn(object);
                if !object.pointers.is_empty() {
                    pending.push(pointer);
                }
            }
        }
    }

    /// Total size and count of everything transitively owned by `addr`.
    pub fn owned_stats(&self, addr: Address) -> OwnedStats {
        let mut stats = OwnedStats::default();

        self.walk_pointers(addr, |object| {
            stats.owned_size += object.size;
            stats.owned_count += 1;
        });

        stats
    }
}

/// Read one pointer word per declared offset out of raw contents. Offsets
/// with fewer than [`POINTER_SIZE`] bytes remaining are rejected rather
/// than truncated.
fn derive_pointers(
    addr: Address,
    contents: &[u8],
    offsets: &[u64],
    endianness: Endianness,
) -> Result<Vec<Address>, HeapError> {
    let mut pointers = Vec::with_capacity(offsets.len());

    for &offset in offsets {
        let word = usize::try_from(offset)
            .ok()
            .and_then(|start| Some((start, start.checked_add(POINTER_SIZE)?)))
            .and_then(|(start, end)| contents.get(start..end));

        let Some(word) = word else {
            return Err(HeapError::PointerOffsetOutOfBounds {
                address: addr,
                offset,
                size: contents.len(),
            });
        };

        pointers.push(Address(endianness.read_u64(word)));
    }

    Ok(pointers)
}
