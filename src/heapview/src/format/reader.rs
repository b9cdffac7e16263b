//! Record decode loop and the per-kind handler trait.

use std::io::Read;

use super::records::{
    AllocProfile, AllocStackSample, Defer, DumpParams, Finalizer, Goroutine, Itab, MemStats,
    Object, OsThread, OtherRoot, Panic, Segment, StackFrame, TypeDesc,
};
use super::{wire, ReadError, MAGIC};

/// Per-record-kind callbacks invoked by [`read_dump`].
///
/// Every method defaults to a no-op, so an implementation only overrides
/// the kinds it cares about; records of other kinds are decoded and
/// discarded. Returning an error from any method aborts the decode.
#[allow(unused_variables)]
pub trait RecordHandler {
    fn on_object(&mut self, record: Object) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_other_root(&mut self, record: OtherRoot) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_type_desc(&mut self, record: TypeDesc) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_goroutine(&mut self, record: Goroutine) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_stack_frame(&mut self, record: StackFrame) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_dump_params(&mut self, record: DumpParams) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_finalizer(&mut self, record: Finalizer) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_itab(&mut self, record: Itab) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_os_thread(&mut self, record: OsThread) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_mem_stats(&mut self, record: MemStats) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_queued_finalizer(&mut self, record: Finalizer) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_data_segment(&mut self, record: Segment) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_bss_segment(&mut self, record: Segment) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_defer(&mut self, record: Defer) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_panic(&mut self, record: Panic) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_alloc_profile(&mut self, record: AllocProfile) -> Result<(), ReadError> {
        Ok(())
    }

    fn on_alloc_stack_sample(&mut self, record: AllocStackSample) -> Result<(), ReadError> {
        Ok(())
    }
}

/// Decode a whole dump stream, invoking exactly one handler method per
/// record in file order.
///
/// Verifies the 16-byte signature first, then loops over tag-prefixed
/// records until the 0 terminator tag (or a clean end of stream at a
/// record boundary). The first malformed byte aborts the decode; no
/// partial record is ever delivered.
pub fn read_dump<R, H>(r: &mut R, handler: &mut H) -> Result<(), ReadError>
where
    R: Read,
    H: RecordHandler,
{
    read_magic(r)?;

    loop {
        let Some(tag) = wire::read_record_tag(r)? else {
            return Ok(());
        };

        match tag {
            0 => return Ok(()),
            1 => handler.on_object(decode_object(r)?)?,
            2 => handler.on_other_root(decode_other_root(r)?)?,
            3 => handler.on_type_desc(decode_type_desc(r)?)?,
            4 => handler.on_goroutine(decode_goroutine(r)?)?,
            5 => handler.on_stack_frame(decode_stack_frame(r)?)?,
            6 => handler.on_dump_params(decode_dump_params(r)?)?,
            7 => handler.on_finalizer(decode_finalizer(r)?)?,
            8 => handler.on_itab(decode_itab(r)?)?,
            9 => handler.on_os_thread(decode_os_thread(r)?)?,
            10 => handler.on_mem_stats(decode_mem_stats(r)?)?,
            11 => handler.on_queued_finalizer(decode_finalizer(r)?)?,
            12 => handler.on_data_segment(decode_segment(r)?)?,
            13 => handler.on_bss_segment(decode_segment(r)?)?,
            14 => handler.on_defer(decode_defer(r)?)?,
            15 => handler.on_panic(decode_panic(r)?)?,
            16 => handler.on_alloc_profile(decode_alloc_profile(r)?)?,
            17 => handler.on_alloc_stack_sample(decode_alloc_stack_sample(r)?)?,
            other => return Err(ReadError::UnknownRecordType(other)),
        }
    }
}

fn read_magic<R: Read>(r: &mut R) -> Result<(), ReadError> {
    let mut buf = [0u8; 16];
    r.read_exact(&mut buf)
        .map_err(|e| wire::map_eof(e, "signature"))?;

    if buf != MAGIC {
        return Err(ReadError::BadMagic(buf.to_vec()));
    }

    Ok(())
}

// Object is the hottest record kind by far, so it keeps a dedicated
// three-field decode path instead of going through the generic sequence.
fn decode_object<R: Read>(r: &mut R) -> Result<Object, ReadError> {
    let address = wire::read_uvarint(r)?;
    let contents = wire::read_bytes(r)?;
    let pointer_offsets = wire::read_field_list(r)?;

    Ok(Object {
        address,
        contents,
        pointer_offsets,
    })
}

// The remaining decoders read each record's fields in declared wire order;
// struct expression operands are evaluated in the order written.

fn decode_other_root<R: Read>(r: &mut R) -> Result<OtherRoot, ReadError> {
    Ok(OtherRoot {
        description: wire::read_string(r)?,
        pointer: wire::read_uvarint(r)?,
    })
}

fn decode_type_desc<R: Read>(r: &mut R) -> Result<TypeDesc, ReadError> {
    Ok(TypeDesc {
        address: wire::read_uvarint(r)?,
        size: wire::read_uvarint(r)?,
        name: wire::read_string(r)?,
        is_pointer: wire::read_bool(r)?,
    })
}

fn decode_goroutine<R: Read>(r: &mut R) -> Result<Goroutine, ReadError> {
    Ok(Goroutine {
        desc_address: wire::read_uvarint(r)?,
        stack_top: wire::read_uvarint(r)?,
        id: wire::read_uvarint(r)?,
        go_stmt_location: wire::read_uvarint(r)?,
        status: wire::read_uvarint(r)?,
        is_system: wire::read_bool(r)?,
        is_background: wire::read_bool(r)?,
        waiting_since_nano: wire::read_uvarint(r)?,
        wait_reason: wire::read_string(r)?,
        frame: wire::read_uvarint(r)?,
        os_thread_desc: wire::read_uvarint(r)?,
        top_defer: wire::read_uvarint(r)?,
        top_panic: wire::read_uvarint(r)?,
    })
}

fn decode_stack_frame<R: Read>(r: &mut R) -> Result<StackFrame, ReadError> {
    Ok(StackFrame {
        address: wire::read_uvarint(r)?,
        depth: wire::read_uvarint(r)?,
        child_pointer: wire::read_uvarint(r)?,
        contents: wire::read_bytes(r)?,
        entry_pc: wire::read_uvarint(r)?,
        current_pc: wire::read_uvarint(r)?,
        continuation_pc: wire::read_uvarint(r)?,
        func_name: wire::read_string(r)?,
        pointer_offsets: wire::read_field_list(r)?,
    })
}

fn decode_dump_params<R: Read>(r: &mut R) -> Result<DumpParams, ReadError> {
    Ok(DumpParams {
        big_endian: wire::read_bool(r)?,
        pointer_size: wire::read_uvarint(r)?,
        heap_start_addr: wire::read_uvarint(r)?,
        heap_end_addr: wire::read_uvarint(r)?,
        arch: wire::read_string(r)?,
        go_experiment_env: wire::read_string(r)?,
        ncpu: wire::read_uvarint(r)?,
    })
}

fn decode_finalizer<R: Read>(r: &mut R) -> Result<Finalizer, ReadError> {
    Ok(Finalizer {
        address: wire::read_uvarint(r)?,
        func_pointer: wire::read_uvarint(r)?,
        entry_pc: wire::read_uvarint(r)?,
        arg_type: wire::read_uvarint(r)?,
        obj_type: wire::read_uvarint(r)?,
    })
}

fn decode_itab<R: Read>(r: &mut R) -> Result<Itab, ReadError> {
    Ok(Itab {
        address: wire::read_uvarint(r)?,
        type_desc_addr: wire::read_uvarint(r)?,
    })
}

fn decode_os_thread<R: Read>(r: &mut R) -> Result<OsThread, ReadError> {
    Ok(OsThread {
        address: wire::read_uvarint(r)?,
        id: wire::read_uvarint(r)?,
        os_id: wire::read_uvarint(r)?,
    })
}

fn decode_mem_stats<R: Read>(r: &mut R) -> Result<MemStats, ReadError> {
    Ok(MemStats {
        alloc: wire::read_uvarint(r)?,
        total_alloc: wire::read_uvarint(r)?,
        sys: wire::read_uvarint(r)?,
        lookups: wire::read_uvarint(r)?,
        mallocs: wire::read_uvarint(r)?,
        frees: wire::read_uvarint(r)?,
        heap_alloc: wire::read_uvarint(r)?,
        heap_sys: wire::read_uvarint(r)?,
        heap_idle: wire::read_uvarint(r)?,
        heap_inuse: wire::read_uvarint(r)?,
        heap_released: wire::read_uvarint(r)?,
        heap_objects: wire::read_uvarint(r)?,
        stack_inuse: wire::read_uvarint(r)?,
        stack_sys: wire::read_uvarint(r)?,
        m_span_inuse: wire::read_uvarint(r)?,
        m_span_sys: wire::read_uvarint(r)?,
        m_cache_inuse: wire::read_uvarint(r)?,
        m_cache_sys: wire::read_uvarint(r)?,
        buck_hash_sys: wire::read_uvarint(r)?,
        gc_sys: wire::read_uvarint(r)?,
        other_sys: wire::read_uvarint(r)?,
        next_gc: wire::read_uvarint(r)?,
        last_gc: wire::read_uvarint(r)?,
        pause_total_ns: wire::read_uvarint(r)?,
        pause_ns: wire::read_u64_array_256(r)?,
        num_gc: wire::read_uvarint(r)?,
    })
}

fn decode_segment<R: Read>(r: &mut R) -> Result<Segment, ReadError> {
    Ok(Segment {
        address: wire::read_uvarint(r)?,
        contents: wire::read_bytes(r)?,
        pointer_offsets: wire::read_field_list(r)?,
    })
}

fn decode_defer<R: Read>(r: &mut R) -> Result<Defer, ReadError> {
    Ok(Defer {
        address: wire::read_uvarint(r)?,
        goroutine: wire::read_uvarint(r)?,
        argp: wire::read_uvarint(r)?,
        pc: wire::read_uvarint(r)?,
        func_val: wire::read_uvarint(r)?,
        entry_pc: wire::read_uvarint(r)?,
        next_defer: wire::read_uvarint(r)?,
    })
}

fn decode_panic<R: Read>(r: &mut R) -> Result<Panic, ReadError> {
    Ok(Panic {
        address: wire::read_uvarint(r)?,
        goroutine: wire::read_uvarint(r)?,
        type_addr: wire::read_uvarint(r)?,
        data: wire::read_uvarint(r)?,
        defer_pointer: wire::read_uvarint(r)?,
        next_panic: wire::read_uvarint(r)?,
    })
}

fn decode_alloc_profile<R: Read>(r: &mut R) -> Result<AllocProfile, ReadError> {
    Ok(AllocProfile {
        id: wire::read_uvarint(r)?,
        size: wire::read_uvarint(r)?,
        stack_frames: wire::read_frames(r)?,
        allocs: wire::read_uvarint(r)?,
        frees: wire::read_uvarint(r)?,
    })
}

fn decode_alloc_stack_sample<R: Read>(r: &mut R) -> Result<AllocStackSample, ReadError> {
    Ok(AllocStackSample {
        address: wire::read_uvarint(r)?,
        id: wire::read_uvarint(r)?,
    })
}
