use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;

/// Wraps `body` in a standard 32-bit-size ISO-BMFF box: `[len:u32][fourcc][body]`.
/// Mirrors the body-then-length-prefix pattern used for Wwise bank chunks,
/// just big-endian and fourcc-first instead of size-first-little-endian.
pub fn write_box(out: &mut Vec<u8>, fourcc: &[u8; 4], body: &[u8]) {
    let len = body.len() as u32 + 8;
    out.write_u32::<BigEndian>(len).unwrap();
    out.write_all(fourcc).unwrap();
    out.write_all(body).unwrap();
}

/// Builds a box by accumulating its body through `build`, then wrapping it.
/// Saves every caller from hand-managing a scratch `Vec<u8>`.
pub fn boxed(fourcc: &[u8; 4], build: impl FnOnce(&mut Vec<u8>)) -> Vec<u8> {
    let mut body = Vec::new();
    build(&mut body);
    let mut out = Vec::with_capacity(body.len() + 8);
    write_box(&mut out, fourcc, &body);
    out
}

pub fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.write_u32::<BigEndian>(v).unwrap();
}

pub fn write_u64(out: &mut Vec<u8>, v: u64) {
    out.write_u64::<BigEndian>(v).unwrap();
}

pub fn write_u16(out: &mut Vec<u8>, v: u16) {
    out.write_u16::<BigEndian>(v).unwrap();
}

pub fn write_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

pub fn write_fixed_string(out: &mut Vec<u8>, s: &str, field_len: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(field_len.saturating_sub(1));
    out.extend_from_slice(&bytes[..n]);
    out.resize(out.len() + (field_len - n), 0);
}
