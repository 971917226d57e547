//! FFI bindings for the COCOA log checker
//!
//! C-compatible entry points for native viewers that embed the checker.
//! All functions take null-terminated C strings and return allocated memory
//! that must be freed by the caller using `cocoa_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::{CheckerConfig, ReportTimezone};
use crate::encoder::ReportEncoder;
use crate::pipeline::check_log;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Check an exposure log and return the encoded report payload as JSON.
///
/// An unusable log still yields a payload whose `status` says `malformed`;
/// its details are also left in `cocoa_last_error`. NULL is returned only for
/// bad arguments or encoding failures.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - `timezone` may be NULL (Asia/Tokyo) or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `cocoa_free_string`.
/// - Returns NULL on error; call `cocoa_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cocoa_check_json(
    json: *const c_char,
    timezone: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let timezone = if timezone.is_null() {
        ReportTimezone::default()
    } else {
        let tz_str = match cstr_to_string(timezone) {
            Some(s) => s,
            None => {
                set_last_error("Invalid timezone string pointer");
                return ptr::null_mut();
            }
        };
        match ReportTimezone::parse(&tz_str) {
            Ok(tz) => tz,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let config = CheckerConfig::default()
        .with_log_path("<ffi>")
        .with_timezone(timezone);
    let outcome = check_log(&json_str, &config);
    if outcome.status.is_failure() {
        set_last_error(&outcome.details.join("; "));
    }

    match ReportEncoder::new().encode_to_json(&outcome, &config) {
        Ok(payload) => string_to_cstr(&payload),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a static string that is valid until the next call
///   to any checker function on this thread.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn cocoa_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Free a string returned by a checker function.
///
/// # Safety
/// - `s` must be a pointer returned by a checker function, or NULL.
/// - Must not be called twice on the same pointer.
#[no_mangle]
pub unsafe extern "C" fn cocoa_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
