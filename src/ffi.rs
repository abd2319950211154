//! FFI bindings for RFM Segment
//!
//! This module provides C-compatible functions for calling the engine from
//! other languages. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `rfm_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::RfmConfig;
use crate::encoder::ReportEncoder;
use crate::error::ComputeError;
use crate::pipeline::RfmAnalyzer;
use crate::schema::InputFormat;
use crate::types::RfmTable;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
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

/// Build an analyzer from an optional JSON config (NULL means defaults)
unsafe fn analyzer_from(config_json: *const c_char) -> Result<RfmAnalyzer, String> {
    if config_json.is_null() {
        return Ok(RfmAnalyzer::new());
    }

    let json = cstr_to_string(config_json).ok_or("Invalid config string pointer")?;
    RfmConfig::from_json(&json)
        .and_then(RfmAnalyzer::with_config)
        .map_err(|e| e.to_string())
}

/// Shared front half of every entry point: read input, run the analysis
unsafe fn run_analysis(
    transactions_json: *const c_char,
    config_json: *const c_char,
) -> Result<RfmTable, String> {
    let json = cstr_to_string(transactions_json).ok_or("Invalid JSON string pointer")?;
    let analyzer = analyzer_from(config_json)?;
    analyzer
        .analyze_text(&json, InputFormat::Json)
        .map_err(|e| e.to_string())
}

fn finish(result: Result<String, String>) -> *mut c_char {
    match result {
        Ok(out) => string_to_cstr(&out),
        Err(msg) => {
            set_last_error(&msg);
            ptr::null_mut()
        }
    }
}

fn encoding_failed(e: ComputeError) -> String {
    e.to_string()
}

// ============================================================================
// Analysis API
// ============================================================================

/// Analyze a JSON array of transactions and return a JSON array of RFM records.
///
/// # Safety
/// - `transactions_json` must be a valid null-terminated C string.
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `rfm_free_string`.
/// - Returns NULL on error; call `rfm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rfm_analyze_json(
    transactions_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    finish(run_analysis(transactions_json, config_json).and_then(|table| {
        ReportEncoder::encode_records_json(table.records()).map_err(encoding_failed)
    }))
}

/// Analyze a JSON array of transactions and return the full report envelope.
///
/// # Safety
/// Same contract as `rfm_analyze_json`.
#[no_mangle]
pub unsafe extern "C" fn rfm_report_json(
    transactions_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    finish(
        run_analysis(transactions_json, config_json)
            .and_then(|table| ReportEncoder::new().encode_to_json(&table).map_err(encoding_failed)),
    )
}

/// Analyze a JSON array of transactions and return one customer's record.
///
/// Returns the JSON text `null` when the customer is not in the input.
///
/// # Safety
/// - `transactions_json` and `customer_id` must be valid null-terminated C strings.
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `rfm_free_string`.
/// - Returns NULL on error; call `rfm_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rfm_lookup_json(
    transactions_json: *const c_char,
    customer_id: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let customer = match cstr_to_string(customer_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid customer_id string pointer");
            return ptr::null_mut();
        }
    };

    finish(run_analysis(transactions_json, config_json).and_then(|table| {
        serde_json::to_string(&table.get(&customer)).map_err(|e| e.to_string())
    }))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by RFM functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an RFM function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn rfm_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next RFM function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn rfm_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn rfm_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn sample_transactions_json() -> CString {
        CString::new(
            r#"[
            {"customer_id": "C1", "order_date": "2024-01-01", "line_id": "L1", "amount": 100},
            {"customer_id": "C1", "order_date": "2024-01-10", "line_id": "L2", "amount": 50},
            {"customer_id": "C2", "order_date": "2024-01-05", "line_id": "L3", "amount": 500}
        ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_analyze_json() {
        let json = sample_transactions_json();

        unsafe {
            let result = rfm_analyze_json(json.as_ptr(), ptr::null());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.starts_with('['));
            assert!(result_str.contains("\"segment\":\"Loyal\""));

            rfm_free_string(result);
        }
    }

    #[test]
    fn test_ffi_report_with_config() {
        let json = sample_transactions_json();
        let config = CString::new(r#"{"snapshot_offset_days": 0}"#).unwrap();

        unsafe {
            let result = rfm_report_json(json.as_ptr(), config.as_ptr());
            assert!(!result.is_null());

            let report: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert_eq!(report["snapshot_date"], "2024-01-10");

            rfm_free_string(result);
        }
    }

    #[test]
    fn test_ffi_lookup() {
        let json = sample_transactions_json();
        let found = CString::new("C2").unwrap();
        let missing = CString::new("C9").unwrap();

        unsafe {
            let result = rfm_lookup_json(json.as_ptr(), found.as_ptr(), ptr::null());
            let record: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert_eq!(record["recency_days"], 6);
            rfm_free_string(result);

            let result = rfm_lookup_json(json.as_ptr(), missing.as_ptr(), ptr::null());
            assert_eq!(CStr::from_ptr(result).to_str().unwrap(), "null");
            rfm_free_string(result);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let empty = CString::new("[]").unwrap();
            let result = rfm_analyze_json(empty.as_ptr(), ptr::null());
            assert!(result.is_null());

            let error = rfm_last_error();
            assert!(!error.is_null());

            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.contains("no transactions"));

            let result = rfm_analyze_json(ptr::null(), ptr::null());
            assert!(result.is_null());
        }
    }

    #[test]
    fn test_ffi_invalid_config() {
        let json = sample_transactions_json();
        let config = CString::new(r#"{"bin_count": 9}"#).unwrap();

        unsafe {
            let result = rfm_analyze_json(json.as_ptr(), config.as_ptr());
            assert!(result.is_null());

            let error_str = CStr::from_ptr(rfm_last_error()).to_str().unwrap();
            assert!(error_str.contains("bin_count"));
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = rfm_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
