/// Registry value keyed by PID in `pid_to_rb_thread`
/// Inserted by userspace when a target process is discovered; `start_time`
/// is filled on first sample; removed by userspace on process exit.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessRecord {
    /// Address inside the target process where its "current thread" global
    /// (`ruby_current_thread`) is stored.
    pub current_thread_addr: u64,
    /// Index into `version_specific_offsets`.
    pub version_tag: u32,
    pub _pad: u32,
    /// Monotonic kernel start-time field, captured on first sample; 0 until
    /// then. Used for the PID-reuse guard (step 2).
    pub start_time: u64,
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for ProcessRecord {}

impl ProcessRecord {
    pub const fn new(current_thread_addr: u64, version_tag: u32) -> Self {
        ProcessRecord {
            current_thread_addr,
            version_tag,
            _pad: 0,
            start_time: 0,
        }
    }

    pub const fn is_registered(&self) -> bool {
        self.current_thread_addr != 0
    }
}

/// `path_addr` is either a direct string object or, when `path_flavour ==
/// 1`, an array object requiring one extra indirection.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathFlavour {
    Direct = 0,
    ArrayIndirect = 1,
}

impl PathFlavour {
    pub const fn from_u8(v: u8) -> Self {
        match v {
            1 => PathFlavour::ArrayIndirect,
            _ => PathFlavour::Direct,
        }
    }
}

/// Byte offsets used by the frame decoder for one runtime version.
/// Populated once by userspace at initialization; treated as immutable by
/// the core. Field names mirror the offset table's own vocabulary (`ec`,
/// `cfp`, `vm`, ...) rather than generic names, since that vocabulary is
/// what the decoder's math directly reads.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionOffsets {
    /// Offset of `main_thread` off the `current_thread` global's target.
    pub main_thread: u64,
    /// Offset of the execution context (`ec`) off the thread struct.
    pub ec: u64,
    /// Offset of the VM stack base pointer within `ec`.
    pub vm: u64,
    /// Offset of the VM stack size (in `VALUE`s) within `ec`.
    pub vm_size: u64,
    /// Offset of the current frame pointer (`cfp`) within `ec`.
    pub cfp: u64,
    /// Offset of the method-name ("label") string within the iseq body.
    pub label: u64,
    /// 0 or 1, see [`PathFlavour`].
    pub path_flavour: u8,
    pub _pad: [u8; 7],
    /// Offset, within the iseq body, of the line-info table's entry count.
    pub line_info_size: u64,
    /// Offset, within the iseq body, of the line-info table pointer.
    pub line_info_table: u64,
    /// Offset, within one line-info entry, of the line number field.
    pub lineno: u64,
    /// Size in bytes of one control frame (`rb_control_frame_t`).
    pub control_frame_size: u64,
    /// Offset, within the iseq body, of the `location` sub-struct, and
    /// within that, of the `path` field (combined here since the decoder
    /// always reads them together).
    pub location_path_offset: u64,
    /// Offset, within the iseq body, of the encoded-instruction base
    /// (`iseq_encoded`), used to compute the bytecode position index.
    pub iseq_encoded_offset: u64,
    /// Offset, within a control frame, of the `iseq` pointer.
    pub cfp_iseq_offset: u64,
    /// Offset, within an iseq object, of the `body` pointer.
    pub iseq_body_offset: u64,
    /// Offset, within a Ruby string object, of the inline/heap character
    /// data ("as" union).
    pub string_as_offset: u64,
    /// `sizeof(RBasic)`, used for the array-indirection path offset.
    pub rbasic_size: u64,
    /// Offset, within an array object's body, of its embedded pointer.
    pub array_embed_offset: u64,
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for VersionOffsets {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_process_record_has_zero_thread_addr() {
        let p = ProcessRecord::default();
        assert!(!p.is_registered());
    }

    #[test]
    fn path_flavour_roundtrip() {
        assert_eq!(PathFlavour::from_u8(0), PathFlavour::Direct);
        assert_eq!(PathFlavour::from_u8(1), PathFlavour::ArrayIndirect);
        // Any other stored byte is treated as Direct; the real domain is
        // only {0,1}.
        assert_eq!(PathFlavour::from_u8(9), PathFlavour::Direct);
    }
}
