//! Smoke target used to exercise the replay driver end to end.
//!
//! Inputs are dispatched on their leading bytes:
//! `REJECT` is rejected, `UNDEF` returns an unrecognised code, `ABORT`, `PANIC`
//! and `SEGV` crash, and anything else is accepted. Paths ending in `.skip` are
//! dropped by the initialize hook before replay starts.

use std::ffi::OsString;

fn smoke_target(data: &[u8]) -> i32 {
    if data.starts_with(b"REJECT") {
        return fuzzreplay_cli::fuzzreplay_core::REJECTED_RETURN;
    }
    if data.starts_with(b"UNDEF") {
        return 7;
    }
    if data.starts_with(b"ABORT") {
        std::process::abort();
    }
    if data.starts_with(b"PANIC") {
        panic!("PANIC input detected by smoke target ({} bytes)", data.len());
    }
    if data.starts_with(b"SEGV") {
        raise_segv();
    }
    0
}

#[cfg(unix)]
fn raise_segv() {
    // The std runtime's SIGSEGV handler returns for faults outside the stack
    // guard, so a raised signal is swallowed unless the default action is back.
    // SAFETY: installing SIG_DFL and raising a signal touch no Rust-owned memory.
    unsafe {
        libc::signal(libc::SIGSEGV, libc::SIG_DFL);
        libc::raise(libc::SIGSEGV);
    }
    std::process::abort();
}

#[cfg(not(unix))]
fn raise_segv() {
    std::process::abort();
}

fn skip_marked_inputs(args: &mut Vec<OsString>) {
    let mut index = 0;
    args.retain(|arg| {
        index += 1;
        index == 1 || !arg.to_string_lossy().ends_with(".skip")
    });
}

fuzzreplay_cli::replay_target!(smoke_target, init = skip_marked_inputs);
