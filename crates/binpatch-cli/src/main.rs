//! Command-line driver for the in-place binary patcher.
//!
//! `svc` rewrites seccomp-blocked syscall traps in aarch64 binaries so they
//! return `-ENOSYS` instead of killing the process; `scan` is the same
//! correlation as a dry run; `path` relocates an embedded path string
//! without moving any file offset.  Files are processed one at a time, each
//! fully independent of the rest of the batch.

mod mutate;

use binpatch_core::scan::{self, Match, LOOKBACK};
use binpatch_core::strpatch;
use binpatch_core::syscall::SyscallTable;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "binpatch",
    version,
    about = "In-place patcher for aarch64 shared libraries"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Rewrite blocked-syscall traps to return -ENOSYS
    Svc {
        /// Binaries to patch in place (a .orig backup is kept per file)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Report patchable trap sites without modifying anything
    Scan {
        /// Binaries to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Replace an embedded path string, preserving file length
    Path {
        /// Binary to patch in place
        input: PathBuf,
        /// Exact string to search for
        #[arg(long)]
        old: String,
        /// Replacement; must not be longer than the original, may be empty
        #[arg(long, default_value = "")]
        new: String,
    },
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Command::Svc { files } => cmd_svc(files),
        Command::Scan { files } => cmd_scan(files),
        Command::Path { input, old, new } => cmd_path(input, old, new),
    }
}

// ─── svc ─────────────────────────────────────────────────────

fn report_match(m: &Match) {
    println!(
        "  [0x{:08x}] patching svc #0 (mov x8,#{} at 0x{:08x}, {} insn back) ({})",
        m.trap_offset, m.syscall_nr, m.anchor_offset, m.insns_back, m.syscall_name
    );
}

fn cmd_svc(files: Vec<PathBuf>) {
    let table = SyscallTable::default();
    let mut any_patched = false;

    for file in &files {
        if !file.is_file() {
            eprintln!("error: {} not found", file.display());
            continue;
        }
        println!("Scanning {}...", file.display());

        let result = mutate::mutate_file(file, |mut data| {
            let matches = scan::find_matches(&data, &table, LOOKBACK);
            for m in &matches {
                report_match(m);
            }
            let count = scan::apply_matches(&mut data, &matches);
            (data, count)
        });

        match result {
            Ok(outcome) if outcome.patches == 0 => {
                println!("  no blocked syscalls found");
            }
            Ok(outcome) => {
                if let Some(backup) = &outcome.backup {
                    println!("  backup saved: {}", backup.display());
                }
                println!("  patched {} syscall(s)", outcome.patches);
                any_patched = true;
            }
            Err(e) => eprintln!("error: {e}"),
        }
    }

    println!();
    if any_patched {
        println!("Done. Blocked syscalls now return -ENOSYS instead of killing the process.");
    } else {
        println!("No patches applied. The binaries may already be patched or use different instruction sequences.");
        println!("Check manually with: objdump -d <binary> | grep -B1 'svc.*#0x0'");
    }
}

// ─── scan (dry run) ──────────────────────────────────────────

fn cmd_scan(files: Vec<PathBuf>) {
    let table = SyscallTable::default();

    for file in &files {
        if !file.is_file() {
            eprintln!("error: {} not found", file.display());
            continue;
        }
        println!("Scanning {}...", file.display());

        let data = match std::fs::read(file) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("error: reading '{}': {e}", file.display());
                continue;
            }
        };
        let matches = scan::find_matches(&data, &table, LOOKBACK);
        for m in &matches {
            println!(
                "  [0x{:08x}] svc #0 (mov x8,#{} at 0x{:08x}, {} insn back) ({})",
                m.trap_offset, m.syscall_nr, m.anchor_offset, m.insns_back, m.syscall_name
            );
        }
        println!("  {} patchable site(s)", matches.len());
    }
}

// ─── path ────────────────────────────────────────────────────

fn cmd_path(input: PathBuf, old: String, new: String) {
    if old.is_empty() {
        eprintln!("error: --old must not be empty");
        std::process::exit(1);
    }
    if new.len() > old.len() {
        eprintln!(
            "error: replacement is {} bytes but only {} bytes are available",
            new.len(),
            old.len()
        );
        std::process::exit(1);
    }
    if !input.is_file() {
        eprintln!("error: {} not found", input.display());
        std::process::exit(1);
    }

    println!("Patching {}:", input.display());

    let result = mutate::mutate_file(&input, |mut data| {
        // Preconditions were checked above; the only remaining outcome is
        // an occurrence count.
        let count = strpatch::replace_paths(&mut data, old.as_bytes(), new.as_bytes())
            .unwrap_or_else(|e| {
                eprintln!("error: {e}");
                std::process::exit(1);
            });
        (data, count)
    });

    match result {
        Ok(outcome) if outcome.patches == 0 => {
            println!("  '{old}' not found (already patched?)");
        }
        Ok(outcome) => {
            if let Some(backup) = &outcome.backup {
                println!("  backup saved: {}", backup.display());
            }
            println!(
                "  {} occurrence(s) replaced, {} null byte(s) of padding each",
                outcome.patches,
                old.len() - new.len()
            );
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
