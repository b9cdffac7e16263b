//! `dump` command: decode a heap dump into newline-delimited JSON.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use heapview::format::{self, ReadError, RecordHandler};

pub fn handle(input: &Path) -> Result<()> {
    let file =
        File::open(input).with_context(|| format!("could not open {}", input.display()))?;
    let mut reader = BufReader::new(file);

    let mut printer = RecordPrinter {
        out: io::stdout().lock(),
    };
    heapview::read_dump(&mut reader, &mut printer)
        .with_context(|| format!("could not read {}", input.display()))?;

    Ok(())
}

/// One output line: an explicit kind discriminant plus the record itself.
#[derive(Serialize)]
struct Line<'a, T: Serialize> {
    #[serde(rename = "Type")]
    kind: &'static str,
    #[serde(rename = "Record")]
    record: &'a T,
}

/// Streams every record kind to the output writer, one JSON object per line.
struct RecordPrinter<W: Write> {
    out: W,
}

impl<W: Write> RecordPrinter<W> {
    fn emit<T: Serialize>(&mut self, kind: &'static str, record: &T) -> Result<(), ReadError> {
        serde_json::to_writer(&mut self.out, &Line { kind, record })
            .map_err(ReadError::handler)?;
        self.out.write_all(b"\n").map_err(ReadError::Io)
    }
}

impl<W: Write> RecordHandler for RecordPrinter<W> {
    fn on_object(&mut self, record: format::Object) -> Result<(), ReadError> {
        self.emit("Object", &record)
    }

    fn on_other_root(&mut self, record: format::OtherRoot) -> Result<(), ReadError> {
        self.emit("OtherRoot", &record)
    }

    fn on_type_desc(&mut self, record: format::TypeDesc) -> Result<(), ReadError> {
        self.emit("TypeDesc", &record)
    }

    fn on_goroutine(&mut self, record: format::Goroutine) -> Result<(), ReadError> {
        self.emit("Goroutine", &record)
    }

    fn on_stack_frame(&mut self, record: format::StackFrame) -> Result<(), ReadError> {
        self.emit("StackFrame", &record)
    }

    fn on_dump_params(&mut self, record: format::DumpParams) -> Result<(), ReadError> {
        self.emit("DumpParams", &record)
    }

    fn on_finalizer(&mut self, record: format::Finalizer) -> Result<(), ReadError> {
        self.emit("Finalizer", &record)
    }

    fn on_itab(&mut self, record: format::Itab) -> Result<(), ReadError> {
        self.emit("Itab", &record)
    }

    fn on_os_thread(&mut self, record: format::OsThread) -> Result<(), ReadError> {
        self.emit("OSThread", &record)
    }

    fn on_mem_stats(&mut self, record: format::MemStats) -> Result<(), ReadError> {
        self.emit("MemStats", &record)
    }

    fn on_queued_finalizer(&mut self, record: format::Finalizer) -> Result<(), ReadError> {
        self.emit("QueuedFinalizer", &record)
    }

    fn on_data_segment(&mut self, record: format::Segment) -> Result<(), ReadError> {
        self.emit("DataSegment", &record)
    }

    fn on_bss_segment(&mut self, record: format::Segment) -> Result<(), ReadError> {
        self.emit("BSSSegment", &record)
    }

    fn on_defer(&mut self, record: format::Defer) -> Result<(), ReadError> {
        self.emit("Defer", &record)
    }

    fn on_panic(&mut self, record: format::Panic) -> Result<(), ReadError> {
        self.emit("Panic", &record)
    }

    fn on_alloc_profile(&mut self, record: format::AllocProfile) -> Result<(), ReadError> {
        self.emit("AllocProfile", &record)
    }

    fn on_alloc_stack_sample(&mut self, record: format::AllocStackSample) -> Result<(), ReadError> {
        self.emit("AllocStackSample", &record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write as _;

    #[test]
    fn test_emit_object_line() {
        let mut printer = RecordPrinter { out: Vec::new() };

        printer
            .on_object(format::Object {
                address: 0x100,
                contents: vec![0u8; 8],
                pointer_offsets: vec![0],
            })
            .unwrap();

        let line: serde_json::Value = serde_json::from_slice(&printer.out).unwrap();
        assert_eq!(line["Type"], "Object");
        assert_eq!(line["Record"]["Address"], 0x100);
        assert_eq!(line["Record"]["Contents"], "AAAAAAAAAAA=");
        assert_eq!(line["Record"]["PointerOffsets"][0], 0);
        assert!(printer.out.ends_with(b"\n"));
    }

    #[test]
    fn test_one_line_per_record() {
        let mut printer = RecordPrinter { out: Vec::new() };

        printer
            .on_itab(format::Itab {
                address: 0x1000,
                type_desc_addr: 0x42,
            })
            .unwrap();
        printer
            .on_os_thread(format::OsThread {
                address: 0x2000,
                id: 1,
                os_id: 4242,
            })
            .unwrap();

        let text = String::from_utf8(printer.out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first["Type"], "Itab");
        assert_eq!(second["Type"], "OSThread");
        assert_eq!(second["Record"]["OSID"], 4242);
    }

    #[test]
    fn test_handle_rejects_bad_signature() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a heap dump at all").unwrap();

        let err = handle(file.path()).unwrap_err();
        assert!(err.root_cause().to_string().contains("unknown format"));
    }
}
