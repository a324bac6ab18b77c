//! Frame decoder, written against a [`RemoteMemory`] seam so
//! the traversal math is host-testable. `rbperf-ebpf` implements
//! [`RemoteMemory`] over `bpf_probe_read_user`; tests implement it over a
//! plain byte-addressable map standing in for another process's address
//! space.

use crate::error::RbperfError;
use crate::frame::FrameRecord;
use crate::process::{PathFlavour, VersionOffsets};

/// Low 5 bits of a Ruby object's flags word select its basic type
/// (`RUBY_T_MASK`); `T_STRING` / `T_ARRAY` are the two this decoder knows
/// about.
const RUBY_T_MASK: u64 = 0x1f;
const RUBY_T_STRING: u64 = 0x05;
const RUBY_T_ARRAY: u64 = 0x07;

/// Bit in a Ruby string's flags word that, when set, means the character
/// data is heap-allocated rather than stored inline.
const RUBY_FL_USER1: u64 = 1 << 13;

/// Seam over remote-process memory, mirroring `read_user`/`read_user_str`
/// but split into the scalar widths the decoder needs.
pub trait RemoteMemory {
    fn read_u64(&self, addr: u64) -> Result<u64, RbperfError>;
    fn read_u32(&self, addr: u64) -> Result<u32, RbperfError>;
    /// Reads up to `dst.len()` bytes starting at `addr`, NUL-terminating on
    /// truncation. Returns the number of bytes
    /// written, including any terminator.
    fn read_c_str(&self, dst: &mut [u8], addr: u64) -> Result<usize, RbperfError>;
}

/// Where the real string/array pointer lives after following
/// `path_flavour`'s indirection.
fn resolve_path_addr<M: RemoteMemory>(
    mem: &M,
    path_addr: u64,
    flavour: PathFlavour,
    rbasic_size: u64,
    array_embed_offset: u64,
) -> Result<u64, RbperfError> {
    let flags = mem.read_u64(path_addr)?;
    match flags & RUBY_T_MASK {
        RUBY_T_STRING => Ok(path_addr),
        RUBY_T_ARRAY => match flavour {
            PathFlavour::ArrayIndirect => {
                let indirect_addr = path_addr.wrapping_add(rbasic_size).wrapping_add(array_embed_offset);
                mem.read_u64(indirect_addr)
            }
            // path_flavour==0 uses the array pointer itself, the same
            // address the string case would have used: an explicit
            // zero/direct branch rather than leaving `path` uninitialized.
            PathFlavour::Direct => Ok(path_addr),
        },
        _ => Err(RbperfError::UnknownObjectType),
    }
}

fn read_ruby_string<M: RemoteMemory>(
    mem: &M,
    object_addr: u64,
    as_offset: u64,
    dst: &mut [u8],
) -> Result<(), RbperfError> {
    let flags = mem.read_u64(object_addr)?;
    let char_addr = if flags & RUBY_FL_USER1 != 0 {
        mem.read_u64(object_addr.wrapping_add(as_offset).wrapping_add(8))?
    } else {
        object_addr.wrapping_add(as_offset)
    };
    mem.read_c_str(dst, char_addr).map(|_| ())
}

/// Only accurate for the primary supported dialect; otherwise returns the
/// last line-info table entry, a deliberate approximation.
pub fn compute_lineno<M: RemoteMemory>(
    mem: &M,
    pc: u64,
    body: u64,
    offsets: &VersionOffsets,
) -> Result<u32, RbperfError> {
    if pc == 0 {
        // Native frame; caller never reaches here in practice since native
        // frames skip decode_frame entirely, but the algorithm itself
        // defines this short-circuit.
        return Ok(0);
    }

    let pos_addr = mem.read_u64(pc.wrapping_sub(body).wrapping_add(offsets.iseq_encoded_offset))?;
    let mut pos = mem.read_u64(pos_addr)?;
    if pos != 0 {
        pos = pos.wrapping_sub(crate::constants::VALUE_SIZE);
    }
    let _ = pos; // position is computed but the final lookup uses the
                 // table's last entry regardless (see below).

    let line_info_size = mem.read_u32(body.wrapping_add(offsets.line_info_size))?;
    if line_info_size == 0 {
        return Ok(0);
    }
    let info_table = mem.read_u64(body.wrapping_add(offsets.line_info_table))?;
    let entry_addr = info_table
        .wrapping_add((line_info_size as u64 - 1).wrapping_mul(8))
        .wrapping_add(offsets.lineno);
    mem.read_u32(entry_addr)
}

/// Decodes one interpreter control frame's iseq body into a
/// [`FrameRecord`]. Always returns a fully zero-initialized-or-populated
/// record; on an unrecognized path object type the record stays zeroed and
/// the returned error tells the caller to log it and leave the frame's
/// contents zero-initialized.
pub fn decode_frame<M: RemoteMemory>(
    mem: &M,
    pc: u64,
    body: u64,
    offsets: &VersionOffsets,
) -> (FrameRecord, Option<RbperfError>) {
    let mut frame = FrameRecord::zeroed();

    let path_addr = match mem.read_u64(body.wrapping_add(offsets.location_path_offset)) {
        Ok(a) => a,
        Err(e) => return (frame, Some(e)),
    };
    let resolved_path = match resolve_path_addr(
        mem,
        path_addr,
        PathFlavour::from_u8(offsets.path_flavour),
        offsets.rbasic_size,
        offsets.array_embed_offset,
    ) {
        Ok(a) => a,
        Err(e) => return (frame, Some(e)),
    };

    let label_addr = match mem.read_u64(body.wrapping_add(offsets.label)) {
        Ok(a) => a,
        Err(e) => return (frame, Some(e)),
    };

    let mut path_buf = [0u8; crate::constants::MAX_PATH_LEN];
    if read_ruby_string(mem, resolved_path, offsets.string_as_offset, &mut path_buf).is_ok() {
        frame.set_path(&path_buf);
    }

    let mut name_buf = [0u8; crate::constants::MAX_METHOD_NAME_LEN];
    if read_ruby_string(mem, label_addr, offsets.string_as_offset, &mut name_buf).is_ok() {
        frame.set_method_name(&name_buf);
    }

    frame.lineno = compute_lineno(mem, pc, body, offsets).unwrap_or(0);

    (frame, None)
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::collections::HashMap;

    /// A synthetic, byte-addressable "remote process" for tests: the
    /// "bytes that live somewhere else" seam, same shape as a
    /// `Deref<Target = [u8]>`-backed remote-memory stand-in.
    #[derive(Default)]
    pub struct FakeRemote {
        pub mem: HashMap<u64, Vec<u8>>,
    }

    impl FakeRemote {
        pub fn write_u64(&mut self, addr: u64, val: u64) {
            self.mem.insert(addr, val.to_le_bytes().to_vec());
        }

        pub fn write_u32(&mut self, addr: u64, val: u32) {
            self.mem.insert(addr, val.to_le_bytes().to_vec());
        }

        pub fn write_bytes(&mut self, addr: u64, bytes: &[u8]) {
            self.mem.insert(addr, bytes.to_vec());
        }
    }

    impl RemoteMemory for FakeRemote {
        fn read_u64(&self, addr: u64) -> Result<u64, RbperfError> {
            let bytes = self.mem.get(&addr).ok_or(RbperfError::RemoteReadFault)?;
            let arr: [u8; 8] = bytes[..8].try_into().map_err(|_| RbperfError::RemoteReadFault)?;
            Ok(u64::from_le_bytes(arr))
        }

        fn read_u32(&self, addr: u64) -> Result<u32, RbperfError> {
            let bytes = self.mem.get(&addr).ok_or(RbperfError::RemoteReadFault)?;
            let arr: [u8; 4] = bytes[..4].try_into().map_err(|_| RbperfError::RemoteReadFault)?;
            Ok(u32::from_le_bytes(arr))
        }

        fn read_c_str(&self, dst: &mut [u8], addr: u64) -> Result<usize, RbperfError> {
            let bytes = self.mem.get(&addr).ok_or(RbperfError::RemoteReadFault)?;
            let n = core::cmp::min(dst.len().saturating_sub(1), bytes.len());
            dst[..n].copy_from_slice(&bytes[..n]);
            dst[n] = 0;
            Ok(n + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeRemote;
    use super::*;

    fn offsets_with(path_flavour: u8) -> VersionOffsets {
        VersionOffsets {
            location_path_offset: 0x40,
            label: 0x50,
            line_info_size: 0x60,
            line_info_table: 0x68,
            lineno: 0x4,
            iseq_encoded_offset: 0x70,
            path_flavour,
            rbasic_size: 0x10,
            array_embed_offset: 0x18,
            string_as_offset: 0x10,
            ..Default::default()
        }
    }

    #[test]
    fn decodes_a_direct_string_path() {
        let mut mem = FakeRemote::default();
        let body = 0x1000u64;
        let offsets = offsets_with(0);

        let path_obj = 0x2000u64;
        mem.write_u64(body + offsets.location_path_offset, path_obj);
        mem.write_u64(path_obj, RUBY_T_STRING); // flags: plain T_STRING, inline chars
        mem.write_bytes(path_obj + offsets.string_as_offset, b"/app/foo.rb");

        let label_obj = 0x3000u64;
        mem.write_u64(body + offsets.label, label_obj);
        mem.write_u64(label_obj, RUBY_T_STRING);
        mem.write_bytes(label_obj + offsets.string_as_offset, b"call");

        mem.write_u32(body + offsets.line_info_size, 0); // lineno short-circuits to 0

        let (frame, err) = decode_frame(&mem, 0, body, &offsets);
        assert!(err.is_none());
        assert_eq!(frame.path_str(), "/app/foo.rb");
        assert_eq!(frame.method_name_str(), "call");
        assert_eq!(frame.lineno, 0);
    }

    #[test]
    fn array_path_with_flavour_one_follows_indirection() {
        let mut mem = FakeRemote::default();
        let body = 0x1000u64;
        let offsets = offsets_with(1);

        let array_obj = 0x2000u64;
        mem.write_u64(body + offsets.location_path_offset, array_obj);
        mem.write_u64(array_obj, RUBY_T_ARRAY);

        let real_string_addr_slot = array_obj + offsets.rbasic_size + offsets.array_embed_offset;
        let real_string = 0x4000u64;
        mem.write_u64(real_string_addr_slot, real_string);
        mem.write_u64(real_string, RUBY_T_STRING);
        mem.write_bytes(real_string + offsets.string_as_offset, b"/app/indirect.rb");

        mem.write_u64(body + offsets.label, real_string);
        mem.write_u32(body + offsets.line_info_size, 0);

        let (frame, err) = decode_frame(&mem, 0, body, &offsets);
        assert!(err.is_none());
        assert_eq!(frame.path_str(), "/app/indirect.rb");
    }

    #[test]
    fn array_path_with_flavour_zero_uses_array_pointer_directly() {
        let mut mem = FakeRemote::default();
        let body = 0x1000u64;
        let offsets = offsets_with(0);

        let array_obj = 0x2000u64;
        mem.write_u64(body + offsets.location_path_offset, array_obj);
        mem.write_u64(array_obj, RUBY_T_ARRAY);
        // Flavour 0 reads the string straight off the array object's own
        // address's explicit zero-branch.
        mem.write_bytes(array_obj + offsets.string_as_offset, b"array-as-path");

        mem.write_u64(body + offsets.label, array_obj);
        mem.write_u32(body + offsets.line_info_size, 0);

        let (frame, err) = decode_frame(&mem, 0, body, &offsets);
        assert!(err.is_none());
        assert_eq!(frame.path_str(), "array-as-path");
    }

    #[test]
    fn unknown_path_type_leaves_frame_zeroed_and_reports_error() {
        let mut mem = FakeRemote::default();
        let body = 0x1000u64;
        let offsets = offsets_with(0);

        let weird_obj = 0x2000u64;
        mem.write_u64(body + offsets.location_path_offset, weird_obj);
        mem.write_u64(weird_obj, 0x02); // T_OBJECT, neither string nor array

        let (frame, err) = decode_frame(&mem, 0, body, &offsets);
        assert_eq!(err, Some(RbperfError::UnknownObjectType));
        assert_eq!(frame, FrameRecord::zeroed());
    }

    #[test]
    fn lineno_reads_the_last_line_info_entry() {
        let mut mem = FakeRemote::default();
        let body = 0x1000u64;
        let offsets = offsets_with(0);

        let path_obj = 0x2000u64;
        mem.write_u64(body + offsets.location_path_offset, path_obj);
        mem.write_u64(path_obj, RUBY_T_STRING);
        mem.write_bytes(path_obj + offsets.string_as_offset, b"x.rb");
        let label_obj = 0x3000u64;
        mem.write_u64(body + offsets.label, label_obj);
        mem.write_u64(label_obj, RUBY_T_STRING);
        mem.write_bytes(label_obj + offsets.string_as_offset, b"m");

        let pc = 0x9000u64;
        let pos_addr_slot = pc - body + offsets.iseq_encoded_offset;
        let pos_addr = 0x9100u64;
        mem.write_u64(pos_addr_slot, pos_addr);
        mem.write_u64(pos_addr, 0); // pos == 0, no subtraction

        mem.write_u32(body + offsets.line_info_size, 3);
        let info_table = 0x9200u64;
        mem.write_u64(body + offsets.line_info_table, info_table);
        let last_entry_addr = info_table + (3 - 1) * 8 + offsets.lineno;
        mem.write_u32(last_entry_addr, 42);

        let (frame, err) = decode_frame(&mem, pc, body, &offsets);
        assert!(err.is_none());
        assert_eq!(frame.lineno, 42);
    }

    #[test]
    fn pc_zero_is_a_native_frame_with_lineno_zero() {
        let mem = FakeRemote::default();
        let offsets = offsets_with(0);
        let lineno = compute_lineno(&mem, 0, 0x1000, &offsets).unwrap();
        assert_eq!(lineno, 0);
    }
}
