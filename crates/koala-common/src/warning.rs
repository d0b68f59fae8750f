//! Layout warnings routed through the `log` facade.
//!
//! Provides deduplication to avoid spamming the same warning multiple times.
//! Used by style resolution, box generation and scene loading to report
//! unsupported inputs.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Global set of warnings we've already emitted (to deduplicate)
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// Warn about an unsupported feature (logged once per unique message)
///
/// Returns `true` if the warning was emitted, `false` if it was a duplicate.
///
/// # Example
/// ```
/// use koala_common::warning::{clear_warnings, warn_once};
///
/// clear_warnings();
/// assert!(warn_once("Layout", "direction: rtl is laid out left-to-right"));
/// assert!(!warn_once("Layout", "direction: rtl is laid out left-to-right"));
/// ```
#[must_use]
pub fn warn_once(component: &str, message: &str) -> bool {
    let key = format!("[{component}] {message}");
    let should_print = WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert_with(HashSet::new)
        .insert(key);

    if should_print {
        log::warn!(target: "koala", "[{component}] {message}");
    }
    should_print
}

/// Clear all recorded warnings (call when loading a new scene)
pub fn clear_warnings() {
    let mut guard = WARNED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(set) = guard.as_mut() {
        set.clear();
    }
}
