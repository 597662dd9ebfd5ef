//! Boundary layer: the process-wide arena and its `malloc`/`free` surface.
//!
//! This is the only module that prints diagnostics, terminates the process,
//! or touches the global arena. The core engine stays silent and returns
//! [`HeapError`](crate::HeapError) values, which keeps every failure path
//! assertable in tests; the mapping from fatal errors to `exit(2)` happens
//! here and nowhere else.
//!
//! Callers normally go through the [`malloc!`](crate::malloc) and
//! [`free!`](crate::free) macros, which
//! forward the callsite's `file!()` and `line!()` so diagnostics name the
//! offending line:
//!
//! ```text
//! free: Double free (src/main.rs:42)
//! ```
//!
//! Concurrent use is out of scope; the mutex exists only to make the global
//! sound Rust.

use core::ptr::{self, NonNull};
use std::io;
use std::process;
use std::sync::{Mutex, MutexGuard, Once, PoisonError};

use lazy_static::lazy_static;

use crate::arena::Arena;

lazy_static! {
    static ref HEAP: Mutex<Arena> = Mutex::new(Arena::new());
}

static SHUTDOWN: Once = Once::new();

fn heap() -> MutexGuard<'static, Arena> {
    HEAP.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Allocate `size` bytes from the process-wide arena.
///
/// On `InvalidRequest` or `OutOfMemory`, prints one diagnostic line to
/// stderr and returns null; the arena is left unchanged and the caller may
/// continue. Prefer the [`malloc!`] macro, which fills in `file` and `line`.
#[must_use]
pub fn malloc(size: usize, file: &str, line: u32) -> *mut u8 {
    match heap().allocate(size) {
        Ok(payload) => payload.as_ptr(),
        Err(error) => {
            eprintln!("malloc: {error} ({file}:{line})");
            ptr::null_mut()
        }
    }
}

/// Free a pointer previously returned by [`malloc`].
///
/// Freeing null is a benign no-op. Any pointer-validity violation or double
/// free is a caller contract breach: one diagnostic line goes to stderr and
/// the process terminates with exit status 2 rather than risk silent
/// corruption. Prefer the [`free!`] macro, which fills in `file` and `line`.
pub fn free(ptr: *mut u8, file: &str, line: u32) {
    let Some(payload) = NonNull::new(ptr) else {
        return;
    };
    let mut heap = heap();
    if let Err(error) = heap.deallocate(payload) {
        debug_assert!(error.is_fatal());
        drop(heap);
        eprintln!("free: {error} ({file}:{line})");
        process::exit(2);
    }
}

/// Print the global arena's chunk table to stdout.
///
/// Diagnostic only; never called by the allocation algorithms.
pub fn dump_state() {
    let _ = heap().dump(&mut io::stdout().lock());
}

/// Report anything still allocated in the global arena.
///
/// To be invoked exactly once at controlled shutdown; extra calls are
/// ignored. Prints nothing when the arena is clean, and never affects the
/// exit status.
pub fn shutdown_report() {
    SHUTDOWN.call_once(|| {
        let report = heap().leak_report();
        if !report.is_clean() {
            eprintln!(
                "tileheap: {} bytes leaked in {} objects.",
                report.bytes, report.objects
            );
        }
    });
}

/// Allocate from the process-wide arena, capturing the callsite for
/// diagnostics. Expands to a [`malloc`](crate::global::malloc) call.
#[macro_export]
macro_rules! malloc {
    ($size:expr) => {
        $crate::global::malloc($size, file!(), line!())
    };
}

/// Free a pointer from the process-wide arena, capturing the callsite for
/// diagnostics. Expands to a [`free`](crate::global::free) call.
#[macro_export]
macro_rules! free {
    ($ptr:expr) => {
        $crate::global::free($ptr, file!(), line!())
    };
}
