//! Low-level stream primitives shared by the record decoders.

use std::io::{self, Read};

use super::records::Frame;
use super::ReadError;

/// Longest legal encoding of a 64-bit unsigned varint.
const MAX_VARINT_LEN: u32 = 10;

fn read_byte<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Map an end-of-file hit mid-read onto [`ReadError::Truncated`].
pub(crate) fn map_eof(err: io::Error, what: &'static str) -> ReadError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ReadError::Truncated(what)
    } else {
        ReadError::Io(err)
    }
}

/// Read an unsigned varint: 7 bits per byte, LSB group first, high bit set
/// on every byte except the last. Values must fit in 64 bits.
pub(crate) fn read_uvarint<R: Read>(r: &mut R) -> Result<u64, ReadError> {
    let first = read_byte(r).map_err(|e| map_eof(e, "varint"))?;
    uvarint_continue(r, first)
}

/// Read a record-kind tag. `None` means the stream ended cleanly at a
/// record boundary; ending inside the varint is still [`ReadError::Truncated`].
pub(crate) fn read_record_tag<R: Read>(r: &mut R) -> Result<Option<u64>, ReadError> {
    let first = match read_byte(r) {
        Ok(byte) => byte,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(ReadError::Io(e)),
    };

    uvarint_continue(r, first).map(Some)
}

fn uvarint_continue<R: Read>(r: &mut R, mut byte: u8) -> Result<u64, ReadError> {
    let mut value = 0u64;

    for group in 0..MAX_VARINT_LEN {
        if byte < 0x80 {
            // The tenth byte may only carry the top bit of a 64-bit value.
            if group == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(ReadError::VarintOverflow);
            }
            return Ok(value | (u64::from(byte) << (7 * group)));
        }

        value |= u64::from(byte & 0x7f) << (7 * group);
        if group < MAX_VARINT_LEN - 1 {
            byte = read_byte(r).map_err(|e| map_eof(e, "varint"))?;
        }
    }

    Err(ReadError::VarintOverflow)
}

/// Read a varint length prefix followed by exactly that many bytes.
pub(crate) fn read_bytes<R: Read>(r: &mut R) -> Result<Vec<u8>, ReadError> {
    let length = read_uvarint(r)?;
    let length = usize::try_from(length).map_err(|_| ReadError::BufferLength(length))?;

    let mut buf = vec![0u8; length];
    r.read_exact(&mut buf).map_err(|e| map_eof(e, "byte buffer"))?;
    Ok(buf)
}

/// Strings on the wire are plain byte buffers with no encoding guarantee;
/// invalid UTF-8 is converted lossily rather than rejected.
pub(crate) fn read_string<R: Read>(r: &mut R) -> Result<String, ReadError> {
    let buf = read_bytes(r)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Booleans are varints restricted to 0 and 1.
pub(crate) fn read_bool<R: Read>(r: &mut R) -> Result<bool, ReadError> {
    match read_uvarint(r)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ReadError::InvalidBool(other)),
    }
}

/// Read a pointer-offset list: a sequence of varint kinds where kind 0
/// terminates, and kind 1 is followed by one varint offset.
pub(crate) fn read_field_list<R: Read>(r: &mut R) -> Result<Vec<u64>, ReadError> {
    let mut offsets = Vec::new();

    loop {
        match read_uvarint(r)? {
            0 => return Ok(offsets),
            1 => offsets.push(read_uvarint(r)?),
            other => return Err(ReadError::UnknownFieldKind(other)),
        }
    }
}

/// Read a varint-counted list of stack entries.
///
/// The shipped dump consumer reads the function-name slot twice and never a
/// distinct file-name value, so `func_name` ends up holding the second
/// string and `file_name` stays empty. Replicated here for byte-exact
/// compatibility with existing dump files.
pub(crate) fn read_frames<R: Read>(r: &mut R) -> Result<Vec<Frame>, ReadError> {
    let length = read_uvarint(r)?;

    let mut frames = Vec::new();
    for _ in 0..length {
        let _ = read_string(r)?;
        let func_name = read_string(r)?;
        let line = read_uvarint(r)?;

        frames.push(Frame {
            func_name,
            file_name: String::new(),
            line,
        });
    }

    Ok(frames)
}

/// Read the fixed 256-slot GC pause histogram.
pub(crate) fn read_u64_array_256<R: Read>(r: &mut R) -> Result<[u64; 256], ReadError> {
    let mut values = [0u64; 256];
    for slot in values.iter_mut() {
        *slot = read_uvarint(r)?;
    }
    Ok(values)
}
