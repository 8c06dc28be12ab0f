//! The SPCM DLL function table.
//!
//! ## Overview
//!
//! [`SpcmDll`] has one method per wrapped vendor function. Methods take safe Rust arguments
//! (references, slices, C strings) in place of raw pointers and return the vendor's raw
//! `short` result unchanged: interpreting the result is left to [`crate::Spcm`], which is
//! generic over this trait.
//!
//! [`Spcm64`] is the implementation backed by `spcm64.dll` and only exists on Windows, the
//! only platform the vendor ships the DLL for. Tests use an in-memory implementation instead.
//!
//! ## Safety
//!
//! The `extern "C"` prototypes transcribe the vendor header. Every pointer handed to the DLL
//! comes from a Rust reference or slice that lives for the duration of the call, and every
//! length handed to the DLL is the length of the slice it describes. Structs the DLL writes
//! into are `repr(C)` with enough room for the vendor layout (see `spcm_defs`).
//!
//! The DLL keeps process-wide state; nothing here tracks whether it has been initialized.

use std::ffi::CStr;

use spcm_defs::{AdjustPara, RateValues, SpcData, SpcEepData, SpcModInfo, MAX_NO_OF_SPC};

/// Size of the buffer passed to `SPC_get_error_string`.
pub const ERROR_STRING_LEN: usize = 256;

/// Size of the buffer passed to `SPC_get_version`, which takes no length argument.
pub const VERSION_STRING_LEN: usize = 64;

/// The vendor functions wrapped by [`crate::Spcm`].
///
/// Each method corresponds to the `SPC_` function of the same name and returns its raw
/// result: negative values are error codes, anything else is function specific.
pub trait SpcmDll {
    /// Fills `buf` with the NUL-terminated message for `code`.
    fn get_error_string(&self, code: i16, buf: &mut [u8]) -> i16;

    fn init(&self, ini_file: &CStr) -> i16;
    fn close(&self) -> i16;
    fn get_init_status(&self, mod_no: i16) -> i16;
    fn get_mode(&self) -> i16;
    fn set_mode(&self, mode: i16, force_use: i16, in_use: &mut [i32; MAX_NO_OF_SPC]) -> i16;
    fn test_id(&self, mod_no: i16) -> i16;
    fn get_module_info(&self, mod_no: i16, info: &mut SpcModInfo) -> i16;
    fn get_version(&self, mod_no: i16, buf: &mut [u8; VERSION_STRING_LEN]) -> i16;

    fn get_parameters(&self, mod_no: i16, data: &mut SpcData) -> i16;
    fn set_parameters(&self, mod_no: i16, data: &SpcData) -> i16;
    fn get_parameter(&self, mod_no: i16, par_id: i16, value: &mut f32) -> i16;
    fn set_parameter(&self, mod_no: i16, par_id: i16, value: f32) -> i16;
    fn get_eeprom_data(&self, mod_no: i16, eep: &mut SpcEepData) -> i16;
    fn get_adjust_parameters(&self, mod_no: i16, adjust: &mut AdjustPara) -> i16;
    fn read_parameters_from_inifile(&self, data: &mut SpcData, ini_file: &CStr) -> i16;
    fn save_parameters_to_inifile(
        &self,
        data: &SpcData,
        dest_ini_file: &CStr,
        source_ini_file: Option<&CStr>,
        with_comments: bool,
    ) -> i16;

    fn test_state(&self, mod_no: i16, state: &mut i16) -> i16;
    fn get_sync_state(&self, mod_no: i16, sync_state: &mut i16) -> i16;
    fn get_time_from_start(&self, mod_no: i16, time: &mut f32) -> i16;
    fn get_break_time(&self, mod_no: i16, time: &mut f32) -> i16;
    fn get_actual_coltime(&self, mod_no: i16, time: &mut f32) -> i16;
    fn read_rates(&self, mod_no: i16, rates: &mut RateValues) -> i16;
    fn clear_rates(&self, mod_no: i16) -> i16;

    fn get_fifo_usage(&self, mod_no: i16, usage: &mut f32) -> i16;
    fn start_measurement(&self, mod_no: i16) -> i16;
    fn stop_measurement(&self, mod_no: i16) -> i16;
    /// `count` holds the capacity of `data` in words on entry and the words read on return.
    fn read_fifo(&self, mod_no: i16, count: &mut u32, data: &mut [u16]) -> i16;
    fn get_fifo_init_vars(
        &self,
        mod_no: i16,
        fifo_type: &mut i16,
        stream_type: &mut i16,
        mt_clock: &mut i32,
        spc_header: &mut u32,
    ) -> i16;
}

#[cfg(windows)]
pub use self::ffi::Spcm64;

#[cfg(windows)]
mod ffi {
    use std::ffi::CStr;

    use spcm_defs::{AdjustPara, RateValues, SpcData, SpcEepData, SpcModInfo, MAX_NO_OF_SPC};

    use super::{SpcmDll, VERSION_STRING_LEN};

    type CShort = libc::c_short;
    type CInt = libc::c_int;
    type CUint = libc::c_uint;
    type CUlong = libc::c_ulong;
    type CFloat = libc::c_float;
    type CStrPtr = *const libc::c_char;
    type CCharBuf = *mut libc::c_char;

    #[link(name = "spcm64")]
    extern "C" {
        fn SPC_get_error_string(error_id: CShort, dest_string: CCharBuf, max_length: CShort)
            -> CShort;

        fn SPC_init(ini_file: CStrPtr) -> CShort;
        fn SPC_close() -> CShort;
        fn SPC_get_init_status(mod_no: CShort) -> CShort;
        fn SPC_get_mode() -> CShort;
        fn SPC_set_mode(mode: CShort, force_use: CShort, in_use: *mut CInt) -> CShort;
        fn SPC_test_id(mod_no: CShort) -> CShort;
        fn SPC_get_module_info(mod_no: CShort, mod_info: *mut SpcModInfo) -> CShort;
        fn SPC_get_version(mod_no: CShort, version: CCharBuf) -> CShort;

        fn SPC_get_parameters(mod_no: CShort, data: *mut SpcData) -> CShort;
        fn SPC_set_parameters(mod_no: CShort, data: *mut SpcData) -> CShort;
        fn SPC_get_parameter(mod_no: CShort, par_id: CShort, value: *mut CFloat) -> CShort;
        fn SPC_set_parameter(mod_no: CShort, par_id: CShort, value: CFloat) -> CShort;
        fn SPC_get_eeprom_data(mod_no: CShort, eep_data: *mut SpcEepData) -> CShort;
        fn SPC_get_adjust_parameters(mod_no: CShort, adjpara: *mut AdjustPara) -> CShort;
        fn SPC_read_parameters_from_inifile(data: *mut SpcData, inifile: CStrPtr) -> CShort;
        fn SPC_save_parameters_to_inifile(
            data: *mut SpcData,
            dest_inifile: CStrPtr,
            source_inifile: CStrPtr,
            with_comments: CInt,
        ) -> CShort;

        fn SPC_test_state(mod_no: CShort, state: *mut CShort) -> CShort;
        fn SPC_get_sync_state(mod_no: CShort, sync_state: *mut CShort) -> CShort;
        fn SPC_get_time_from_start(mod_no: CShort, time: *mut CFloat) -> CShort;
        fn SPC_get_break_time(mod_no: CShort, time: *mut CFloat) -> CShort;
        fn SPC_get_actual_coltime(mod_no: CShort, time: *mut CFloat) -> CShort;
        fn SPC_read_rates(mod_no: CShort, rates: *mut RateValues) -> CShort;
        fn SPC_clear_rates(mod_no: CShort) -> CShort;

        fn SPC_get_fifo_usage(mod_no: CShort, usage_degree: *mut CFloat) -> CShort;
        fn SPC_start_measurement(mod_no: CShort) -> CShort;
        fn SPC_stop_measurement(mod_no: CShort) -> CShort;
        fn SPC_read_fifo(mod_no: CShort, count: *mut CUlong, data: *mut u16) -> CShort;
        fn SPC_get_fifo_init_vars(
            mod_no: CShort,
            fifo_type: *mut CShort,
            stream_type: *mut CShort,
            mt_clock: *mut CInt,
            spc_header: *mut CUint,
        ) -> CShort;
    }

    /// The SPCM DLL as installed by the vendor (`spcm64.dll`).
    ///
    /// A unit value: the DLL state is process-wide, so every `Spcm64` talks to the same
    /// driver context.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Spcm64;

    impl SpcmDll for Spcm64 {
        fn get_error_string(&self, code: i16, buf: &mut [u8]) -> i16 {
            let max_length = buf.len().min(i16::MAX as usize) as CShort;
            unsafe { SPC_get_error_string(code, buf.as_mut_ptr() as CCharBuf, max_length) }
        }

        fn init(&self, ini_file: &CStr) -> i16 {
            unsafe { SPC_init(ini_file.as_ptr()) }
        }

        fn close(&self) -> i16 {
            unsafe { SPC_close() }
        }

        fn get_init_status(&self, mod_no: i16) -> i16 {
            unsafe { SPC_get_init_status(mod_no) }
        }

        fn get_mode(&self) -> i16 {
            unsafe { SPC_get_mode() }
        }

        fn set_mode(&self, mode: i16, force_use: i16, in_use: &mut [i32; MAX_NO_OF_SPC]) -> i16 {
            unsafe { SPC_set_mode(mode, force_use, in_use.as_mut_ptr()) }
        }

        fn test_id(&self, mod_no: i16) -> i16 {
            unsafe { SPC_test_id(mod_no) }
        }

        fn get_module_info(&self, mod_no: i16, info: &mut SpcModInfo) -> i16 {
            unsafe { SPC_get_module_info(mod_no, info) }
        }

        fn get_version(&self, mod_no: i16, buf: &mut [u8; VERSION_STRING_LEN]) -> i16 {
            unsafe { SPC_get_version(mod_no, buf.as_mut_ptr() as CCharBuf) }
        }

        fn get_parameters(&self, mod_no: i16, data: &mut SpcData) -> i16 {
            unsafe { SPC_get_parameters(mod_no, data) }
        }

        fn set_parameters(&self, mod_no: i16, data: &SpcData) -> i16 {
            // The prototype is not const-qualified, but the DLL does not write the record.
            let mut copy = *data;
            unsafe { SPC_set_parameters(mod_no, &mut copy) }
        }

        fn get_parameter(&self, mod_no: i16, par_id: i16, value: &mut f32) -> i16 {
            unsafe { SPC_get_parameter(mod_no, par_id, value) }
        }

        fn set_parameter(&self, mod_no: i16, par_id: i16, value: f32) -> i16 {
            unsafe { SPC_set_parameter(mod_no, par_id, value) }
        }

        fn get_eeprom_data(&self, mod_no: i16, eep: &mut SpcEepData) -> i16 {
            unsafe { SPC_get_eeprom_data(mod_no, eep) }
        }

        fn get_adjust_parameters(&self, mod_no: i16, adjust: &mut AdjustPara) -> i16 {
            unsafe { SPC_get_adjust_parameters(mod_no, adjust) }
        }

        fn read_parameters_from_inifile(&self, data: &mut SpcData, ini_file: &CStr) -> i16 {
            unsafe { SPC_read_parameters_from_inifile(data, ini_file.as_ptr()) }
        }

        fn save_parameters_to_inifile(
            &self,
            data: &SpcData,
            dest_ini_file: &CStr,
            source_ini_file: Option<&CStr>,
            with_comments: bool,
        ) -> i16 {
            let mut copy = *data;
            let source = source_ini_file.map_or(std::ptr::null(), CStr::as_ptr);
            unsafe {
                SPC_save_parameters_to_inifile(
                    &mut copy,
                    dest_ini_file.as_ptr(),
                    source,
                    with_comments as CInt,
                )
            }
        }

        fn test_state(&self, mod_no: i16, state: &mut i16) -> i16 {
            unsafe { SPC_test_state(mod_no, state) }
        }

        fn get_sync_state(&self, mod_no: i16, sync_state: &mut i16) -> i16 {
            unsafe { SPC_get_sync_state(mod_no, sync_state) }
        }

        fn get_time_from_start(&self, mod_no: i16, time: &mut f32) -> i16 {
            unsafe { SPC_get_time_from_start(mod_no, time) }
        }

        fn get_break_time(&self, mod_no: i16, time: &mut f32) -> i16 {
            unsafe { SPC_get_break_time(mod_no, time) }
        }

        fn get_actual_coltime(&self, mod_no: i16, time: &mut f32) -> i16 {
            unsafe { SPC_get_actual_coltime(mod_no, time) }
        }

        fn read_rates(&self, mod_no: i16, rates: &mut RateValues) -> i16 {
            unsafe { SPC_read_rates(mod_no, rates) }
        }

        fn clear_rates(&self, mod_no: i16) -> i16 {
            unsafe { SPC_clear_rates(mod_no) }
        }

        fn get_fifo_usage(&self, mod_no: i16, usage: &mut f32) -> i16 {
            unsafe { SPC_get_fifo_usage(mod_no, usage) }
        }

        fn start_measurement(&self, mod_no: i16) -> i16 {
            unsafe { SPC_start_measurement(mod_no) }
        }

        fn stop_measurement(&self, mod_no: i16) -> i16 {
            unsafe { SPC_stop_measurement(mod_no) }
        }

        fn read_fifo(&self, mod_no: i16, count: &mut u32, data: &mut [u16]) -> i16 {
            // `unsigned long` is 32 bits on Windows.
            let mut words: CUlong = (*count).min(data.len() as u32) as CUlong;
            let ret = unsafe { SPC_read_fifo(mod_no, &mut words, data.as_mut_ptr()) };
            *count = words as u32;
            ret
        }

        fn get_fifo_init_vars(
            &self,
            mod_no: i16,
            fifo_type: &mut i16,
            stream_type: &mut i16,
            mt_clock: &mut i32,
            spc_header: &mut u32,
        ) -> i16 {
            unsafe {
                SPC_get_fifo_init_vars(mod_no, fifo_type, stream_type, mt_clock, spc_header)
            }
        }
    }
}
