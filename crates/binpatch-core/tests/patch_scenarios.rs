//! End-to-end buffer scenarios for the trap patcher.
//!
//! These build small synthetic aarch64 code regions, run the full
//! find-then-apply sequence, and check the byte-level outcome the way a
//! patched shared library would be checked on disk.

use binpatch_core::aarch64;
use binpatch_core::scan::{self, LOOKBACK};
use binpatch_core::syscall::SyscallTable;

const NOP: u32 = 0xD503_201F;
const ADD_X1_X1_1: u32 = 0x9100_0421;
const LDR_X0_SP: u32 = 0xF940_03E0;

fn words(ws: &[u32]) -> Vec<u8> {
    ws.iter().flat_map(|w| w.to_le_bytes()).collect()
}

// ═══ The canonical rseq site ═══

#[test]
fn rseq_site_with_filler_and_trailing_data() {
    // mov x8, #293; three unrelated non-branch words; svc #0; then bytes
    // that are not instructions at all.
    let mut buf = words(&[
        aarch64::encode_movz_x8(293),
        NOP,
        ADD_X1_X1_1,
        LDR_X0_SP,
        aarch64::SVC_0,
    ]);
    let trailing = b"/usr/lib/locale\0";
    buf.extend_from_slice(trailing);
    let before = buf.clone();

    let matches = scan::find_matches(&buf, &SyscallTable::default(), LOOKBACK);
    assert_eq!(matches.len(), 1);
    let m = &matches[0];
    assert_eq!(m.trap_offset, 16);
    assert_eq!(m.anchor_offset, 0);
    assert_eq!(m.insns_back, 4);
    assert_eq!(m.syscall_nr, 293);
    assert_eq!(m.syscall_name, "rseq");

    let count = scan::apply_matches(&mut buf, &matches);
    assert_eq!(count, 1);
    assert_eq!(buf.len(), before.len());
    assert_eq!(&buf[16..20], &aarch64::enosys_bytes());
    assert_eq!(&buf[..16], &before[..16], "anchor and filler untouched");
    assert_eq!(&buf[20..], &before[20..], "trailing data untouched");
}

// ═══ Idempotence over the whole pipeline ═══

#[test]
fn second_run_is_a_no_op() {
    let mut buf = words(&[
        aarch64::encode_movz_x8(99),
        NOP,
        aarch64::SVC_0,
        NOP,
        aarch64::encode_movz_x8(293),
        aarch64::SVC_0,
    ]);
    let table = SyscallTable::default();

    let first = scan::find_matches(&buf, &table, LOOKBACK);
    assert_eq!(scan::apply_matches(&mut buf, &first), 2);
    let after_first = buf.clone();

    let second = scan::find_matches(&buf, &table, LOOKBACK);
    assert!(second.is_empty());
    assert_eq!(scan::apply_matches(&mut buf, &second), 0);
    assert_eq!(buf, after_first, "second run must change nothing");
}

// ═══ A realistic mixed region ═══

#[test]
fn only_attributable_traps_are_patched() {
    // Four traps: one for rseq, one for an untargeted syscall, one cut off
    // by a bl, one with no load in range at the very start of the buffer.
    let mut buf = words(&[
        aarch64::SVC_0,                  // 0x00: no backward window
        aarch64::encode_movz_x8(293),    // 0x04
        aarch64::SVC_0,                  // 0x08: patched
        aarch64::encode_movz_x8(64),     // 0x0c
        aarch64::SVC_0,                  // 0x10: write(2), untargeted
        aarch64::encode_movz_x8(99),     // 0x14
        0x9400_0123,                     // 0x18: bl -- boundary
        aarch64::SVC_0,                  // 0x1c: correlation invalid
    ]);
    let before = buf.clone();

    let matches = scan::find_matches(&buf, &SyscallTable::default(), LOOKBACK);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].trap_offset, 0x08);

    scan::apply_matches(&mut buf, &matches);
    assert_eq!(&buf[0x08..0x0c], &aarch64::enosys_bytes());
    for off in [0x00usize, 0x10, 0x1c] {
        assert_eq!(
            &buf[off..off + 4],
            &before[off..off + 4],
            "trap at {off:#x} must survive unpatched"
        );
    }
}
