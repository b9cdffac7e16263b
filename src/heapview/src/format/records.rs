//! Record structs of the dump format, one per kind tag.
//!
//! Field order matches the wire layout exactly; the decoders in
//! [`super::reader`] read fields in declared order. Records are plain
//! immutable data once decoded.
//!
//! Serde names mirror the original tool's JSON output: PascalCase fields
//! and base64 strings for raw byte buffers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Serialize, Serializer};

fn base64_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

// serde only derives Serialize for arrays up to 32 elements; serialize the
// 256-element array through its slice impl instead (same JSON output).
fn u64_array<S: Serializer>(values: &[u64], serializer: S) -> Result<S::Ok, S::Error> {
    values.serialize(serializer)
}

/// A heap object: raw contents plus the byte offsets that hold pointers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Object {
    pub address: u64,
    #[serde(serialize_with = "base64_bytes")]
    pub contents: Vec<u8>,
    pub pointer_offsets: Vec<u64>,
}

/// A root outside the heap, data segments, and stacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OtherRoot {
    pub description: String,
    pub pointer: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TypeDesc {
    pub address: u64,
    pub size: u64,
    pub name: String,
    pub is_pointer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Goroutine {
    pub desc_address: u64,
    pub stack_top: u64,
    #[serde(rename = "ID")]
    pub id: u64,
    pub go_stmt_location: u64,
    pub status: u64,
    pub is_system: bool,
    pub is_background: bool,
    pub waiting_since_nano: u64,
    pub wait_reason: String,
    pub frame: u64,
    pub os_thread_desc: u64,
    pub top_defer: u64,
    pub top_panic: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackFrame {
    pub address: u64,
    pub depth: u64,
    pub child_pointer: u64,
    #[serde(serialize_with = "base64_bytes")]
    pub contents: Vec<u8>,
    #[serde(rename = "EntryPC")]
    pub entry_pc: u64,
    #[serde(rename = "CurrentPC")]
    pub current_pc: u64,
    #[serde(rename = "ContinuationPC")]
    pub continuation_pc: u64,
    pub func_name: String,
    pub pointer_offsets: Vec<u64>,
}

/// Global parameters of the dump. Must precede every pointer-bearing
/// record: `big_endian` fixes how pointer words in raw contents are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DumpParams {
    pub big_endian: bool,
    pub pointer_size: u64,
    pub heap_start_addr: u64,
    pub heap_end_addr: u64,
    pub arch: String,
    pub go_experiment_env: String,
    #[serde(rename = "NCPU")]
    pub ncpu: u64,
}

/// Used for both Finalizer (tag 7) and QueuedFinalizer (tag 11).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Finalizer {
    pub address: u64,
    pub func_pointer: u64,
    #[serde(rename = "EntryPC")]
    pub entry_pc: u64,
    pub arg_type: u64,
    pub obj_type: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Itab {
    pub address: u64,
    pub type_desc_addr: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OsThread {
    pub address: u64,
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "OSID")]
    pub os_id: u64,
}

/// Used for both DataSegment (tag 12) and BSSSegment (tag 13).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Segment {
    pub address: u64,
    #[serde(serialize_with = "base64_bytes")]
    pub contents: Vec<u8>,
    pub pointer_offsets: Vec<u64>,
}

/// Runtime memory statistics snapshot taken at dump time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MemStats {
    pub alloc: u64,
    pub total_alloc: u64,
    pub sys: u64,
    pub lookups: u64,
    pub mallocs: u64,
    pub frees: u64,
    pub heap_alloc: u64,
    pub heap_sys: u64,
    pub heap_idle: u64,
    pub heap_inuse: u64,
    pub heap_released: u64,
    pub heap_objects: u64,
    pub stack_inuse: u64,
    pub stack_sys: u64,
    pub m_span_inuse: u64,
    pub m_span_sys: u64,
    pub m_cache_inuse: u64,
    pub m_cache_sys: u64,
    pub buck_hash_sys: u64,
    #[serde(rename = "GCSys")]
    pub gc_sys: u64,
    pub other_sys: u64,
    #[serde(rename = "NextGC")]
    pub next_gc: u64,
    #[serde(rename = "LastGC")]
    pub last_gc: u64,
    pub pause_total_ns: u64,
    #[serde(serialize_with = "u64_array")]
    pub pause_ns: [u64; 256],
    #[serde(rename = "NumGC")]
    pub num_gc: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Defer {
    pub address: u64,
    pub goroutine: u64,
    pub argp: u64,
    #[serde(rename = "PC")]
    pub pc: u64,
    pub func_val: u64,
    #[serde(rename = "EntryPC")]
    pub entry_pc: u64,
    pub next_defer: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Panic {
    pub address: u64,
    pub goroutine: u64,
    #[serde(rename = "Type")]
    pub type_addr: u64,
    pub data: u64,
    pub defer_pointer: u64,
    pub next_panic: u64,
}

/// One entry of an allocation stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Frame {
    pub func_name: String,
    pub file_name: String,
    pub line: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AllocProfile {
    #[serde(rename = "ID")]
    pub id: u64,
    pub size: u64,
    pub stack_frames: Vec<Frame>,
    pub allocs: u64,
    pub frees: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AllocStackSample {
    pub address: u64,
    #[serde(rename = "ID")]
    pub id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Output names must stay line-compatible with the original tool's JSON,
    // including the acronym fields PascalCase would mangle.
    #[test]
    fn test_json_field_names() {
        let frame = StackFrame {
            address: 0x7000,
            depth: 1,
            child_pointer: 0,
            contents: vec![0u8; 8],
            entry_pc: 0x4000,
            current_pc: 0x4010,
            continuation_pc: 0,
            func_name: "main.main".to_string(),
            pointer_offsets: vec![0],
        };

        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["Address"], 0x7000);
        assert_eq!(value["EntryPC"], 0x4000);
        assert_eq!(value["CurrentPC"], 0x4010);
        assert_eq!(value["ContinuationPC"], 0);
        assert_eq!(value["FuncName"], "main.main");
        // Raw contents serialize as base64, matching Go's []byte marshaling.
        assert_eq!(value["Contents"], "AAAAAAAAAAA=");

        let thread = OsThread {
            address: 0x100,
            id: 7,
            os_id: 4242,
        };
        let value = serde_json::to_value(&thread).unwrap();
        assert_eq!(value["ID"], 7);
        assert_eq!(value["OSID"], 4242);

        let params = DumpParams {
            big_endian: false,
            pointer_size: 8,
            heap_start_addr: 0x100,
            heap_end_addr: 0x10000,
            arch: "amd64".to_string(),
            go_experiment_env: String::new(),
            ncpu: 8,
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["BigEndian"], false);
        assert_eq!(value["NCPU"], 8);
    }
}
