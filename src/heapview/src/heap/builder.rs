//! Record handler that assembles a [`Heap`] during dump decoding.

use crate::format::{self, ReadError, RecordHandler};

use super::{Endianness, Heap, HeapError};

/// Builds a [`Heap`] from the Object, StackFrame, Goroutine, and DumpParams
/// records of one dump stream; every other record kind is ignored.
///
/// DumpParams must arrive before any pointer-bearing record: the byte
/// order is unknown until then, and ingestion without it fails with
/// [`HeapError::EndiannessUnknown`].
#[derive(Default)]
pub struct HeapBuilder {
    heap: Option<Heap>,
}

impl HeapBuilder {
    pub fn new() -> Self {
        HeapBuilder { heap: None }
    }

    /// The finished heap, or `None` if the stream carried no DumpParams
    /// record (and therefore no pointer-bearing records either).
    pub fn finish(self) -> Option<Heap> {
        self.heap
    }

    fn heap_mut(&mut self) -> Result<&mut Heap, ReadError> {
        self.heap
            .as_mut()
            .ok_or_else(|| ReadError::handler(HeapError::EndiannessUnknown))
    }
}

impl RecordHandler for HeapBuilder {
    fn on_dump_params(&mut self, record: format::DumpParams) -> Result<(), ReadError> {
        let endianness = if record.big_endian {
            Endianness::Big
        } else {
            Endianness::Little
        };

        self.heap = Some(Heap::new(endianness));
        Ok(())
    }

    fn on_object(&mut self, record: format::Object) -> Result<(), ReadError> {
        self.heap_mut()?
            .add_object(record)
            .map_err(ReadError::handler)
    }

    fn on_stack_frame(&mut self, record: format::StackFrame) -> Result<(), ReadError> {
        self.heap_mut()?
            .add_stack_frame(record)
            .map_err(ReadError::handler)
    }

    fn on_goroutine(&mut self, record: format::Goroutine) -> Result<(), ReadError> {
        self.heap_mut()?.add_goroutine(&record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Address;

    fn dump_params(big_endian: bool) -> format::DumpParams {
        format::DumpParams {
            big_endian,
            pointer_size: 8,
            heap_start_addr: 0x100,
            heap_end_addr: 0x10000,
            arch: "amd64".to_string(),
            go_experiment_env: String::new(),
            ncpu: 8,
        }
    }

    fn object_record(address: u64) -> format::Object {
        format::Object {
            address,
            contents: vec![0u8; 16],
            pointer_offsets: Vec::new(),
        }
    }

    #[test]
    fn test_object_before_dump_params_fails() {
        let mut builder = HeapBuilder::new();

        let err = builder.on_object(object_record(0x100)).unwrap_err();
        let ReadError::Handler(source) = err else {
            panic!("expected handler error, got: {err}");
        };
        assert!(matches!(
            source.downcast_ref::<HeapError>(),
            Some(HeapError::EndiannessUnknown)
        ));

        // The failing record must not have mutated anything.
        assert!(builder.finish().is_none());
    }

    #[test]
    fn test_dump_params_then_records() {
        let mut builder = HeapBuilder::new();
        builder.on_dump_params(dump_params(false)).unwrap();
        builder.on_object(object_record(0x100)).unwrap();

        let heap = builder.finish().unwrap();
        assert_eq!(heap.endianness(), Endianness::Little);
        assert!(heap.object(Address(0x100)).is_some());
    }

    #[test]
    fn test_big_endian_flag_selects_byte_order() {
        let mut builder = HeapBuilder::new();
        builder.on_dump_params(dump_params(true)).unwrap();

        let heap = builder.finish().unwrap();
        assert_eq!(heap.endianness(), Endianness::Big);
    }

    #[test]
    fn test_empty_stream_yields_no_heap() {
        assert!(HeapBuilder::new().finish().is_none());
    }
}
