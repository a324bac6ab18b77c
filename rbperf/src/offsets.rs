//! A small built-in table of [`VersionOffsets`], standing in for the
//! out-of-scope "offset detection" collaborator: in a full build this would
//! be generated from debug info or a per-version offset database rather
//! than hardcoded, the way other Linux profilers resolve kernel-struct
//! layouts from the running kernel's BTF.
//!
//! The values below describe the general *shape* of the reference
//! `rb_control_frame_t`/`rb_iseq_t` layouts; they are not calibrated
//! against any specific interpreter build and exist only so `rbperf record`
//! has something to load into `version_specific_offsets[0]`.

use rbperf_common::VersionOffsets;

pub const PLACEHOLDER_VERSION_TAG: u32 = 0;

pub fn builtin_table() -> Vec<(u32, VersionOffsets)> {
    vec![(PLACEHOLDER_VERSION_TAG, placeholder())]
}

fn placeholder() -> VersionOffsets {
    VersionOffsets {
        main_thread: 0x10,
        ec: 0x20,
        vm: 0x38,
        vm_size: 0x40,
        cfp: 0x18,
        label: 0x18,
        path_flavour: 0,
        _pad: [0; 7],
        line_info_size: 0x90,
        line_info_table: 0x88,
        lineno: 0x04,
        control_frame_size: 0x38,
        location_path_offset: 0x10,
        iseq_encoded_offset: 0x08,
        cfp_iseq_offset: 0x00,
        iseq_body_offset: 0x10,
        string_as_offset: 0x18,
        rbasic_size: 0x10,
        array_embed_offset: 0x20,
    }
}
