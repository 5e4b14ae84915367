//! Stop-reading request, set from SIGTERM/SIGINT handlers.
//!
//! Sources poll the flag between statements and end the stream early; the
//! loader's regular flush → drain → close sequence still runs.

use std::sync::atomic::{AtomicBool, Ordering};

/// Global shutdown flag
pub fn shutdown_flag() -> &'static AtomicBool {
    static FLAG: AtomicBool = AtomicBool::new(false);
    &FLAG
}

pub fn is_shutdown_requested() -> bool {
    shutdown_flag().load(Ordering::Relaxed)
}

/// Request shutdown. Returns `true` if it had already been requested.
pub fn request_shutdown() -> bool {
    shutdown_flag().swap(true, Ordering::Relaxed)
}
