//! Table of syscall numbers the patcher targets.
//!
//! The table is a plain immutable value handed to the scanner, so tests can
//! run the correlation machinery against synthetic numbers without touching
//! any process-wide state.

/// Maps aarch64 syscall numbers to display names.
#[derive(Debug, Clone)]
pub struct SyscallTable {
    entries: Vec<(u16, &'static str)>,
}

impl SyscallTable {
    /// Build a table from explicit entries.
    pub fn new(entries: &[(u16, &'static str)]) -> Self {
        Self { entries: entries.to_vec() }
    }

    /// Display name for `nr`, if it is a targeted syscall.
    pub fn name(&self, nr: u16) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|&&(n, _)| n == nr)
            .map(|&(_, name)| name)
    }

    /// The `(number, name)` entries in table order.
    pub fn entries(&self) -> &[(u16, &'static str)] {
        &self.entries
    }
}

impl Default for SyscallTable {
    /// The two syscalls glibc issues during early dynamic-linker init that
    /// Android's zygote seccomp filter kills with SECCOMP_RET_KILL_PROCESS.
    /// Both are handled gracefully by glibc when they return -ENOSYS.
    fn default() -> Self {
        Self::new(&[
            (99, "set_robust_list"),  // __tls_init_tp, NPTL robust mutexes
            (293, "rseq"),            // __libc_early_init, restartable sequences
        ])
    }
}
