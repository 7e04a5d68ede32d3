//! Trap-site correlation and patching.
//!
//! The scanner walks every 4-byte-aligned word of a binary looking for
//! `svc #0`.  Each trap found is attributed to the `mov x8, #nr` that set up
//! its syscall number by scanning backwards a bounded number of instruction
//! slots.  The backward scan stops early at anything that invalidates the
//! correlation: a load of a *different* syscall number, or any branch (a
//! procedure boundary or unrelated call in between).  Traps that cannot be
//! attributed to a targeted syscall are left alone.
//!
//! The bounded window plus sentinel stops is a heuristic tuned to the code
//! glibc's toolchain actually emits, not a general-purpose analysis.  A trap
//! whose setup falls outside the window is silently skipped rather than
//! guessed at.

use crate::aarch64;
use crate::syscall::SyscallTable;

/// Maximum instruction slots searched behind a trap for its `mov x8, #nr`.
pub const LOOKBACK: usize = 16;

/// One trap successfully attributed to a targeted syscall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Byte offset of the `svc #0` word.
    pub trap_offset: usize,
    /// Byte offset of the `mov x8, #nr` anchor.
    pub anchor_offset: usize,
    /// Instruction slots between anchor and trap (1 = immediately before).
    pub insns_back: usize,
    /// Syscall number the anchor loads.
    pub syscall_nr: u16,
    /// Display name from the table.
    pub syscall_name: &'static str,
}

/// Little-endian instruction word at `offset`.  Caller guarantees bounds.
fn word_at(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Find every trap site attributable to a syscall in `table`.
///
/// Offset 0 is skipped: a trap there has no room for a backward window.
/// Matches are returned in ascending trap-offset order.  Anchor reuse is not
/// validated -- in well-formed code a later trap's backward walk meets a
/// sentinel before reaching an already-claimed anchor.
pub fn find_matches(buf: &[u8], table: &SyscallTable, lookback: usize) -> Vec<Match> {
    let mut matches = Vec::new();
    let mut offset = 4;
    while offset + 4 <= buf.len() {
        if aarch64::is_svc0(word_at(buf, offset)) {
            if let Some(m) = correlate(buf, offset, table, lookback) {
                matches.push(m);
            }
        }
        offset += 4;
    }
    matches
}

/// Backward scan from one trap.  Returns the match, or `None` when a
/// sentinel intervenes or the window is exhausted.
fn correlate(
    buf: &[u8],
    trap_offset: usize,
    table: &SyscallTable,
    lookback: usize,
) -> Option<Match> {
    for back in 1..=lookback {
        let anchor_offset = trap_offset.checked_sub(back * 4)?;
        let word = word_at(buf, anchor_offset);

        if let Some(nr) = aarch64::decode_movz_x8(word) {
            // Any x8 load settles the question: either it is one of ours,
            // or a different syscall's setup sits between us and anything
            // further back.
            return table.name(nr).map(|name| Match {
                trap_offset,
                anchor_offset,
                insns_back: back,
                syscall_nr: nr,
                syscall_name: name,
            });
        }
        if aarch64::decode_branch(word).is_some() {
            return None;
        }
    }
    None
}

/// Overwrite each matched trap with the `-ENOSYS` return.
///
/// Anchors are never touched.  Returns the number of words rewritten; a
/// count of zero means the buffer is byte-for-byte unchanged and the caller
/// must skip write-back entirely.
pub fn apply_matches(buf: &mut [u8], matches: &[Match]) -> usize {
    let patch = aarch64::enosys_bytes();
    for m in matches {
        buf[m.trap_offset..m.trap_offset + 4].copy_from_slice(&patch);
    }
    matches.len()
}
