//! FFI bindings for the LabJack LJM library
//!
//! Minimal declarations for the handful of LabJackM calls the channel
//! reader needs, based on LabJackM.h. Only compiled with the `hardware`
//! feature; the shared library is linked by build.rs.

#![allow(non_camel_case_types)]
#![allow(dead_code)]

use std::os::raw::{c_char, c_double, c_int};

pub type LJM_ERROR = c_int;

// Error code boundaries (from LabJackM.h). 0 is success, values below
// LJME_WARNINGS_END are warnings, everything above is an error.
pub const LJME_NOERROR: LJM_ERROR = 0;
pub const LJME_WARNINGS_BEGIN: LJM_ERROR = 200;
pub const LJME_WARNINGS_END: LJM_ERROR = 399;

// Buffer size for LJM_ErrorToString (LJM_MAX_NAME_SIZE)
pub const LJM_MAX_NAME_SIZE: usize = 256;

extern "C" {
    /// Open a device by type/connection/identifier strings, e.g.
    /// ("T7", "USB", "ANY")
    pub fn LJM_OpenS(
        DeviceType: *const c_char,
        ConnectionType: *const c_char,
        Identifier: *const c_char,
        Handle: *mut c_int,
    ) -> LJM_ERROR;

    /// Read a single named register as a double
    pub fn LJM_eReadName(Handle: c_int, Name: *const c_char, Value: *mut c_double) -> LJM_ERROR;

    /// Write a single named register as a double
    pub fn LJM_eWriteName(Handle: c_int, Name: *const c_char, Value: c_double) -> LJM_ERROR;

    /// Close a device handle
    pub fn LJM_Close(Handle: c_int) -> LJM_ERROR;

    /// Fill `String` (LJM_MAX_NAME_SIZE bytes) with the error's name
    pub fn LJM_ErrorToString(ErrorCode: c_int, String: *mut c_char);
}

/// Human-readable name for an LJM status code
pub fn status_to_string(code: LJM_ERROR) -> String {
    let mut buffer = [0i8; LJM_MAX_NAME_SIZE];
    unsafe {
        LJM_ErrorToString(code, buffer.as_mut_ptr() as *mut c_char);
    }
    let bytes: Vec<u8> = buffer
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Whether a status code is only a warning, not a failure
pub fn is_warning(code: LJM_ERROR) -> bool {
    (LJME_WARNINGS_BEGIN..=LJME_WARNINGS_END).contains(&code)
}
