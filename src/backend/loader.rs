//! Dynamic loading of the compiled harness
//!
//! Opens the harness module with `libloading`, resolves its entry point and calls it with a
//! `#[repr(C)]` mirror of [`RunContext`].
//!
//! # Safety
//!
//! Loading a module runs its initializers and calling the entry point runs arbitrary test code in this
//! process. Test code is trusted; nothing here sandboxes it.

use std::ffi::{CStr, c_char, c_int};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use thiserror::Error;

use super::runtime::{RunContext, TestFailure};

/// Capacity of the failure message buffer; must match `CTESTER_MESSAGE_MAX` in assets/testing.h.
pub const MESSAGE_MAX: usize = 1024;

/// Module loading errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoaderError {
    #[error("did not open shared library {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("did not find symbol `{symbol}` in {}: {reason}", path.display())]
    Symbol {
        path: PathBuf,
        symbol: String,
        reason: String,
    },
}

type RawExitFn = extern "C" fn(*const RawRunContext);

/// Layout of `struct ctester_context` in assets/testing.h.
#[repr(C)]
pub struct RawRunContext {
    current_test: *const c_char,
    executed: c_int,
    message: [c_char; MESSAGE_MAX],
    on_exit: Option<RawExitFn>,
    host: *const RunContext,
}

impl RawRunContext {
    fn new() -> Self {
        Self {
            current_test: std::ptr::null(),
            executed: 0,
            message: [0; MESSAGE_MAX],
            on_exit: None,
            host: std::ptr::null(),
        }
    }

    /// Mirror of `ctx` for one entry-point call; `ctx` must outlive the call.
    fn for_call(ctx: &RunContext) -> Self {
        Self {
            on_exit: Some(exit_during_run),
            host: ctx,
            ..Self::new()
        }
    }

    /// # Safety
    ///
    /// `current_test` must be null or point at a NUL-terminated string that is still mapped, i.e. the module
    /// that wrote it must still be loaded.
    unsafe fn current_test(&self) -> Option<String> {
        if self.current_test.is_null() {
            return None;
        }
        // SAFETY: non-null, and guaranteed live and NUL-terminated by the caller.
        let name = unsafe { CStr::from_ptr(self.current_test) };
        Some(name.to_string_lossy().into_owned())
    }

    fn message(&self) -> String {
        let bytes: Vec<u8> = self.message.iter().map(|&c| c as u8).collect();
        let message = match CStr::from_bytes_until_nul(&bytes) {
            Ok(s) => s.to_string_lossy().into_owned(),
            Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
        };
        message.trim_end().to_string()
    }
}

type RawEntryFn = unsafe extern "C" fn(*mut RawRunContext) -> c_int;

/// Exit hook handed to the harness: test code called `exit()` while a run was in progress.
///
/// No destructor runs on this path, so the run's temporary files are removed here and the failure is
/// reported the way the CLI would. The harness terminates the process right after.
extern "C" fn exit_during_run(raw: *const RawRunContext) {
    // SAFETY: the harness passes the context it was called with; the host frame owning it is still live
    // because `exit()` does not unwind.
    let Some(raw) = (unsafe { raw.as_ref() }) else {
        return;
    };
    // SAFETY: the module that wrote the name is still loaded while its exit hook runs.
    let test = unsafe { raw.current_test() }.unwrap_or_else(|| "<unknown test>".to_string());
    eprintln!("Fail: {test}: exited during test");

    // SAFETY: `host` was set from a `&RunContext` that outlives the entry-point call.
    if let Some(host) = unsafe { raw.host.as_ref() } {
        host.exit_cleanup().remove_all();
    }
}

/// A loaded harness module. Dropping it unloads the module.
pub struct NativeModule {
    path: PathBuf,
    library: Library,
}

impl NativeModule {
    pub fn open(path: &Path) -> Result<Self, LoaderError> {
        // SAFETY: the module is the harness this process just compiled; its initializers are trusted.
        let library = unsafe { Library::new(path) }.map_err(|e| LoaderError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded harness module");
        Ok(Self {
            path: path.to_path_buf(),
            library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve `symbol` as a harness entry point.
    pub fn entry_point(&self, symbol: &str) -> Result<NativeEntryPoint<'_>, LoaderError> {
        // SAFETY: the generated harness defines the entry symbol as `int (struct ctester_context *)`,
        // which is exactly `RawEntryFn`.
        let function = unsafe { self.library.get::<RawEntryFn>(symbol.as_bytes()) }.map_err(|e| {
            LoaderError::Symbol {
                path: self.path.clone(),
                symbol: symbol.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(NativeEntryPoint { function })
    }
}

/// A resolved entry point, valid while its module stays loaded.
pub struct NativeEntryPoint<'lib> {
    function: Symbol<'lib, RawEntryFn>,
}

impl NativeEntryPoint<'_> {
    /// Run every test in the harness on the calling thread.
    pub fn call(&self, ctx: &mut RunContext) -> Result<(), TestFailure> {
        let mut raw = RawRunContext::for_call(ctx);
        // SAFETY: `raw` outlives the call and has the layout the harness expects.
        let status = unsafe { (*self.function)(&mut raw) };

        // SAFETY: the name points into the module's read-only data and the module is borrowed by `self`.
        if let Some(test) = unsafe { raw.current_test() } {
            ctx.enter(test);
        }
        if status != 0 {
            return Err(ctx.fail(raw.message()));
        }
        ctx.set_executed(usize::try_from(raw.executed).unwrap_or_default());
        Ok(())
    }
}
