//! `owned` command: objects rooted in stack frames, with ownership stats.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use heapview::{Address, Heap, HeapBuilder};

pub fn handle(input: &Path) -> Result<()> {
    let file =
        File::open(input).with_context(|| format!("could not open {}", input.display()))?;
    let mut reader = BufReader::new(file);

    let mut builder = HeapBuilder::new();
    heapview::read_dump(&mut reader, &mut builder)
        .with_context(|| format!("could not read {}", input.display()))?;

    // A dump with no DumpParams record has nothing rooted to report.
    let Some(heap) = builder.finish() else {
        return Ok(());
    };

    write_owned(&heap, io::stdout().lock())
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct FrameRef<'a> {
    address: Address,
    func_name: &'a str,
}

/// One output line per stack-rooted object.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct OwnedLine<'a> {
    address: Address,
    size: u64,
    owned_size: u64,
    owned_count: u64,
    frames: Vec<FrameRef<'a>>,
}

fn write_owned<W: Write>(heap: &Heap, mut out: W) -> Result<()> {
    for object in heap.objects() {
        let frames = heap.frames_referencing(object.addr);
        if frames.is_empty() {
            continue;
        }

        let stats = heap.owned_stats(object.addr);
        let line = OwnedLine {
            address: object.addr,
            size: object.size,
            owned_size: stats.owned_size,
            owned_count: stats.owned_count,
            frames: frames
                .iter()
                .map(|frame| FrameRef {
                    address: frame.addr,
                    func_name: &frame.func_name,
                })
                .collect(),
        };

        serde_json::to_writer(&mut out, &line)?;
        out.write_all(b"\n")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use heapview::format;
    use heapview::Endianness;

    fn object_record(address: u64, size: usize, pointers: &[(usize, u64)]) -> format::Object {
        let mut contents = vec![0u8; size];
        let mut pointer_offsets = Vec::new();

        for &(offset, target) in pointers {
            contents[offset..offset + 8].copy_from_slice(&target.to_le_bytes());
            pointer_offsets.push(offset as u64);
        }

        format::Object {
            address,
            contents,
            pointer_offsets,
        }
    }

    fn rooted_heap() -> Heap {
        let mut heap = Heap::new(Endianness::Little);
        heap.add_object(object_record(0x100, 16, &[(0, 0x200)])).unwrap();
        heap.add_object(object_record(0x200, 24, &[(8, 0x300)])).unwrap();
        heap.add_object(object_record(0x300, 8, &[])).unwrap();

        let root = object_record(0x7fff0000, 16, &[(0, 0x100)]);
        heap.add_stack_frame(format::StackFrame {
            address: root.address,
            depth: 0,
            child_pointer: 0,
            contents: root.contents,
            entry_pc: 0,
            current_pc: 0,
            continuation_pc: 0,
            func_name: "main.main".to_string(),
            pointer_offsets: root.pointer_offsets,
        })
        .unwrap();

        heap
    }

    #[test]
    fn test_only_stack_rooted_objects_are_reported() {
        let mut out = Vec::new();
        write_owned(&rooted_heap(), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 1);

        let line: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(line["Address"], 0x100);
        assert_eq!(line["Size"], 16);
        assert_eq!(line["OwnedSize"], 32);
        assert_eq!(line["OwnedCount"], 2);
        assert_eq!(line["Frames"][0]["Address"], 0x7fff0000u64);
        assert_eq!(line["Frames"][0]["FuncName"], "main.main");
    }

    #[test]
    fn test_heap_without_roots_produces_no_output() {
        let mut heap = Heap::new(Endianness::Little);
        heap.add_object(object_record(0x100, 16, &[])).unwrap();

        let mut out = Vec::new();
        write_owned(&heap, &mut out).unwrap();
        assert!(out.is_empty());
    }

    mod enc {
        pub fn put_uvarint(buf: &mut Vec<u8>, mut value: u64) {
            while value >= 0x80 {
                buf.push((value as u8) | 0x80);
                value >>= 7;
            }
            buf.push(value as u8);
        }

        pub fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
            put_uvarint(buf, bytes.len() as u64);
            buf.extend_from_slice(bytes);
        }
    }

    // End to end: dump bytes on disk, through the decoder, to output lines.
    #[test]
    fn test_owned_pipeline_from_file() {
        use enc::{put_bytes, put_uvarint};
        use std::fs::File;
        use std::io::{BufReader, Write as _};

        let mut buf = b"go1.7 heap dump\n".to_vec();

        // DumpParams, little endian.
        put_uvarint(&mut buf, 6);
        for value in [0u64, 8, 0x100, 0x10000] {
            put_uvarint(&mut buf, value);
        }
        put_bytes(&mut buf, b"amd64");
        put_bytes(&mut buf, b"");
        put_uvarint(&mut buf, 8);

        // Object 0x100, 16 bytes, no pointers.
        put_uvarint(&mut buf, 1);
        put_uvarint(&mut buf, 0x100);
        put_bytes(&mut buf, &[0u8; 16]);
        put_uvarint(&mut buf, 0);

        // Stack frame holding 0x100 at offset 0.
        put_uvarint(&mut buf, 5);
        put_uvarint(&mut buf, 0x7000);
        put_uvarint(&mut buf, 0);
        put_uvarint(&mut buf, 0);
        let mut contents = [0u8; 16];
        contents[..8].copy_from_slice(&0x100u64.to_le_bytes());
        put_bytes(&mut buf, &contents);
        for value in [0u64, 0, 0] {
            put_uvarint(&mut buf, value);
        }
        put_bytes(&mut buf, b"main.main");
        put_uvarint(&mut buf, 1);
        put_uvarint(&mut buf, 0);
        put_uvarint(&mut buf, 0);

        // Terminator.
        put_uvarint(&mut buf, 0);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&buf).unwrap();

        let mut reader = BufReader::new(File::open(file.path()).unwrap());
        let mut builder = HeapBuilder::new();
        heapview::read_dump(&mut reader, &mut builder).unwrap();
        let heap = builder.finish().unwrap();

        let mut out = Vec::new();
        write_owned(&heap, &mut out).unwrap();

        let line: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(line["Address"], 0x100);
        assert_eq!(line["OwnedSize"], 0);
        assert_eq!(line["Frames"][0]["FuncName"], "main.main");
    }
}
