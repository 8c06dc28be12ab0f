//! Safe wrappers for the SPCM DLL functions.
//!
//! ## Overview
//!
//! [`Spcm`] is an explicit handle to the DLL. Its methods map one-to-one to the vendor
//! functions: output pointers become return values, and a negative result becomes
//! [`SpcmError::Dll`] carrying the code and the message the DLL itself returns for it (see
//! [`Spcm::spcm_call`]). No method retries, caches or tracks device state; the DLL's own state
//! is process-wide and shared by every handle.
//!
//! A few functions deviate from the "negative means failure" rule, and the deviations are
//! kept as the DLL behaves:
//!
//! - `SPC_close` returns positive values on success.
//! - `SPC_get_init_status` reports per-module status codes as negative values; only the
//!   module-number error is raised.
//! - `SPC_read_rates` reports "not ready yet" with an error code; it becomes `Ok(None)`.
//!
//! ## Example
//!
//! ```ignore
//! # use bhspc_backend::*;
//! let spcm = Spcm::system()?;
//! spcm.init_with_mode(DllOperationMode::SimulateSpc150)?;
//! spcm.set_parameter(0, ParId::Mode, ParValue::Int(1))?;
//! spcm.start_measurement(0)?;
//! let words = spcm.read_fifo_to_vec(0, 32768)?;
//! spcm.stop_measurement(0)?;
//! spcm.close()?;
//! ```

use std::ffi::CString;
use std::path::Path;

use tracing::{debug, trace};

use spcm_defs::*;

use crate::dll::{SpcmDll, ERROR_STRING_LEN, VERSION_STRING_LEN};

/// Handle to the SPCM DLL.
#[derive(Debug)]
pub struct Spcm<D: SpcmDll> {
    dll: D,
}

#[cfg(windows)]
impl Spcm<crate::dll::Spcm64> {
    /// A handle to the installed vendor DLL. Fails if `spcm64.dll` cannot be found or is
    /// older than [`MIN_DLL_VERSION`].
    pub fn system() -> Result<Self> {
        let version = check_dll_version(crate::install::spcm_dll_version()?)?;
        debug!("spcm64.dll version {}", version);
        Ok(Spcm::new(crate::dll::Spcm64))
    }
}

/// Word count for `SPC_read_fifo`, which takes a 32-bit count.
pub fn fifo_word_count(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| SpcmError::BufferTooLarge { len })
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    let s = path
        .to_str()
        .ok_or_else(|| SpcmError::InvalidPath(path.display().to_string()))?;
    Ok(CString::new(s)?)
}

impl<D: SpcmDll> Spcm<D> {
    pub fn new(dll: D) -> Self {
        Spcm { dll }
    }

    pub fn dll(&self) -> &D {
        &self.dll
    }

    /// Invokes one DLL function and translates a negative result into an error.
    ///
    /// Non-negative results are returned as is, including positive values the vendor
    /// documents as warnings.
    pub fn spcm_call<F: FnOnce(&D) -> i16>(&self, function: &'static str, func: F) -> Result<i16> {
        trace!(function, "calling SPCM DLL");
        let ret = func(&self.dll);
        if ret < 0 {
            Err(self.dll_error(function, ret))
        } else {
            Ok(ret)
        }
    }

    fn dll_error(&self, function: &'static str, code: i16) -> SpcmError {
        let err = SpcmError::dll(code, self.lookup_message(code));
        debug!(function, %err, "SPCM call failed");
        err
    }

    /// Best effort: an empty message when the DLL has none for the code.
    fn lookup_message(&self, code: i16) -> String {
        let mut buf = [0u8; ERROR_STRING_LEN];
        if self.dll.get_error_string(code, &mut buf) < 0 {
            return String::new();
        }
        c_buf_to_string(&buf)
    }

    /// The DLL's message for an error code. Codes outside 16 bits are rejected without a call.
    pub fn error_string(&self, code: i64) -> Result<String> {
        let code = i16::try_from(code).map_err(|_| SpcmError::CodeOutOfRange { code })?;
        let mut buf = [0u8; ERROR_STRING_LEN];
        self.spcm_call("SPC_get_error_string", |dll| {
            dll.get_error_string(code, &mut buf)
        })?;
        Ok(c_buf_to_string(&buf))
    }

    /// Initializes the DLL and all modules from an INI file.
    pub fn init(&self, ini_file: &Path) -> Result<()> {
        let ini_file = path_to_cstring(ini_file)?;
        self.spcm_call("SPC_init", |dll| dll.init(&ini_file))?;
        Ok(())
    }

    /// Initializes with a minimal INI file selecting `mode`, written to a temporary directory
    /// that is removed once the call returns.
    pub fn init_with_mode(&self, mode: DllOperationMode) -> Result<()> {
        let ini = IniFile::new(&minimal_spcm_ini(mode))?;
        self.init(ini.path())
    }

    pub fn close(&self) -> Result<()> {
        let ret = self.spcm_call("SPC_close", |dll| dll.close())?;
        if ret > 0 {
            debug!(ret, "SPC_close returned a positive value");
        }
        Ok(())
    }

    /// Initialization status of a module. Only an out-of-range module number is an error.
    pub fn get_init_status(&self, mod_no: i16) -> Result<InitStatus> {
        trace!(function = "SPC_get_init_status", mod_no, "calling SPCM DLL");
        let ret = self.dll.get_init_status(mod_no);
        if ret == ErrorKind::ModNo.raw() {
            return Err(self.dll_error("SPC_get_init_status", ret));
        }
        Ok(InitStatus::from_raw(ret))
    }

    pub fn get_mode(&self) -> Result<DllOperationMode> {
        let ret = self.spcm_call("SPC_get_mode", |dll| dll.get_mode())?;
        Ok(DllOperationMode::from_raw(ret))
    }

    /// Changes the operation mode and the set of active modules.
    ///
    /// `in_use[i]` activates module `i`; modules beyond the end of `in_use` are deactivated.
    pub fn set_mode(&self, mode: DllOperationMode, force_use: bool, in_use: &[bool]) -> Result<()> {
        if in_use.len() > MAX_NO_OF_SPC {
            return Err(SpcmError::TooManyModules {
                given: in_use.len(),
                max: MAX_NO_OF_SPC,
            });
        }
        let mut flags = [0i32; MAX_NO_OF_SPC];
        for (flag, active) in flags.iter_mut().zip(in_use) {
            *flag = *active as i32;
        }
        self.spcm_call("SPC_set_mode", |dll| {
            dll.set_mode(mode.raw(), force_use as i16, &mut flags)
        })?;
        Ok(())
    }

    pub fn test_id(&self, mod_no: i16) -> Result<ModuleType> {
        let ret = self.spcm_call("SPC_test_id", |dll| dll.test_id(mod_no))?;
        Ok(ModuleType::from_raw(ret))
    }

    pub fn get_module_info(&self, mod_no: i16) -> Result<ModInfo> {
        let mut info = SpcModInfo::default();
        self.spcm_call("SPC_get_module_info", |dll| {
            dll.get_module_info(mod_no, &mut info)
        })?;
        Ok(ModInfo::from(&info))
    }

    /// FPGA version of the module.
    pub fn get_version(&self, mod_no: i16) -> Result<String> {
        let mut buf = [0u8; VERSION_STRING_LEN];
        self.spcm_call("SPC_get_version", |dll| dll.get_version(mod_no, &mut buf))?;
        Ok(c_buf_to_string(&buf))
    }

    pub fn get_parameters(&self, mod_no: i16) -> Result<SpcData> {
        let mut data = SpcData::zeroed();
        self.spcm_call("SPC_get_parameters", |dll| {
            dll.get_parameters(mod_no, &mut data)
        })?;
        Ok(data)
    }

    /// Writes the whole record. Pass a record obtained from [`Spcm::get_parameters`].
    pub fn set_parameters(&self, mod_no: i16, data: &SpcData) -> Result<()> {
        self.spcm_call("SPC_set_parameters", |dll| dll.set_parameters(mod_no, data))?;
        Ok(())
    }

    /// Reads one parameter. The DLL transports every value as `float`; integer parameters
    /// are truncated toward zero.
    pub fn get_parameter(&self, mod_no: i16, par_id: ParId) -> Result<ParValue> {
        let mut value = 0f32;
        self.spcm_call("SPC_get_parameter", |dll| {
            dll.get_parameter(mod_no, par_id.raw(), &mut value)
        })?;
        Ok(ParValue::from_f32(par_id.par_type(), value))
    }

    /// Writes one parameter. The value's type and range are checked against the parameter
    /// table before the DLL is called. The DLL takes the value as `float`, so integers it
    /// cannot hold exactly are rejected rather than rounded.
    pub fn set_parameter(&self, mod_no: i16, par_id: ParId, value: ParValue) -> Result<()> {
        SpcData::zeroed().set(par_id, value)?;
        let wire = value
            .exact_f32()
            .ok_or(SpcmError::ParValueOutOfRange { par_id, value })?;
        self.spcm_call("SPC_set_parameter", |dll| {
            dll.set_parameter(mod_no, par_id.raw(), wire)
        })?;
        Ok(())
    }

    pub fn get_eeprom_data(&self, mod_no: i16) -> Result<EepData> {
        let mut eep = SpcEepData::default();
        self.spcm_call("SPC_get_eeprom_data", |dll| {
            dll.get_eeprom_data(mod_no, &mut eep)
        })?;
        Ok(EepData::from(&eep))
    }

    pub fn get_adjust_parameters(&self, mod_no: i16) -> Result<AdjustPara> {
        let mut adjust = AdjustPara::default();
        self.spcm_call("SPC_get_adjust_parameters", |dll| {
            dll.get_adjust_parameters(mod_no, &mut adjust)
        })?;
        Ok(adjust)
    }

    pub fn read_parameters_from_inifile(&self, ini_file: &Path) -> Result<SpcData> {
        let ini_file = path_to_cstring(ini_file)?;
        let mut data = SpcData::zeroed();
        self.spcm_call("SPC_read_parameters_from_inifile", |dll| {
            dll.read_parameters_from_inifile(&mut data, &ini_file)
        })?;
        Ok(data)
    }

    /// Saves `data` to `dest_ini_file`. The DLL copies everything but the parameters from
    /// `source_ini_file`, or from the file `SPC_init` was called with when it is `None`
    /// (which must then still exist).
    pub fn save_parameters_to_inifile(
        &self,
        data: &SpcData,
        dest_ini_file: &Path,
        source_ini_file: Option<&Path>,
        with_comments: bool,
    ) -> Result<()> {
        let dest = path_to_cstring(dest_ini_file)?;
        let source = source_ini_file.map(path_to_cstring).transpose()?;
        self.spcm_call("SPC_save_parameters_to_inifile", |dll| {
            dll.save_parameters_to_inifile(data, &dest, source.as_deref(), with_comments)
        })?;
        Ok(())
    }

    pub fn test_state(&self, mod_no: i16) -> Result<MeasurementState> {
        let mut state = 0i16;
        self.spcm_call("SPC_test_state", |dll| dll.test_state(mod_no, &mut state))?;
        Ok(MeasurementState::from_bits_retain(state as u16))
    }

    pub fn get_sync_state(&self, mod_no: i16) -> Result<SyncState> {
        let mut state = 0i16;
        self.spcm_call("SPC_get_sync_state", |dll| {
            dll.get_sync_state(mod_no, &mut state)
        })?;
        Ok(SyncState::from_bits_retain(state as u16))
    }

    /// Seconds since the start of the measurement.
    pub fn get_time_from_start(&self, mod_no: i16) -> Result<f32> {
        let mut time = 0f32;
        self.spcm_call("SPC_get_time_from_start", |dll| {
            dll.get_time_from_start(mod_no, &mut time)
        })?;
        Ok(time)
    }

    pub fn get_break_time(&self, mod_no: i16) -> Result<f32> {
        let mut time = 0f32;
        self.spcm_call("SPC_get_break_time", |dll| {
            dll.get_break_time(mod_no, &mut time)
        })?;
        Ok(time)
    }

    pub fn get_actual_coltime(&self, mod_no: i16) -> Result<f32> {
        let mut time = 0f32;
        self.spcm_call("SPC_get_actual_coltime", |dll| {
            dll.get_actual_coltime(mod_no, &mut time)
        })?;
        Ok(time)
    }

    pub fn clear_rates(&self, mod_no: i16) -> Result<()> {
        self.spcm_call("SPC_clear_rates", |dll| dll.clear_rates(mod_no))?;
        Ok(())
    }

    /// Latched rate values, or `None` while the counting interval since the last clear or
    /// read has not elapsed.
    pub fn read_rates(&self, mod_no: i16) -> Result<Option<RateValues>> {
        let mut rates = RateValues::default();
        match self.spcm_call("SPC_read_rates", |dll| dll.read_rates(mod_no, &mut rates)) {
            Ok(_) => Ok(Some(rates)),
            Err(err) if err.is_kind(ErrorKind::RatesNotRdy) => {
                debug!(mod_no, "rates not ready");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Fill level of the FIFO, 0.0 to 1.0.
    pub fn get_fifo_usage(&self, mod_no: i16) -> Result<f32> {
        let mut usage = 0f32;
        self.spcm_call("SPC_get_fifo_usage", |dll| {
            dll.get_fifo_usage(mod_no, &mut usage)
        })?;
        Ok(usage)
    }

    pub fn start_measurement(&self, mod_no: i16) -> Result<()> {
        self.spcm_call("SPC_start_measurement", |dll| dll.start_measurement(mod_no))?;
        Ok(())
    }

    pub fn stop_measurement(&self, mod_no: i16) -> Result<()> {
        self.spcm_call("SPC_stop_measurement", |dll| dll.stop_measurement(mod_no))?;
        Ok(())
    }

    /// Reads up to `buf.len()` 16-bit words from the FIFO and returns the number read.
    ///
    /// Event records are 32 bits wide; the DLL only returns whole records, so an even-length
    /// buffer is filled with whole records.
    pub fn read_fifo(&self, mod_no: i16, buf: &mut [u16]) -> Result<usize> {
        let mut count = fifo_word_count(buf.len())?;
        self.spcm_call("SPC_read_fifo", |dll| dll.read_fifo(mod_no, &mut count, buf))?;
        Ok(count as usize)
    }

    /// Like [`Spcm::read_fifo`], into a newly allocated buffer trimmed to the words read.
    pub fn read_fifo_to_vec(&self, mod_no: i16, max_words: usize) -> Result<Vec<u16>> {
        fifo_word_count(max_words)?;
        let mut buf = vec![0u16; max_words];
        let n = self.read_fifo(mod_no, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Values needed to interpret the FIFO stream with the current parameters.
    pub fn get_fifo_init_vars(&self, mod_no: i16) -> Result<FifoInitVars> {
        let (mut fifo_type, mut stream_type) = (0i16, 0i16);
        let (mut mt_clock, mut spc_header) = (0i32, 0u32);
        self.spcm_call("SPC_get_fifo_init_vars", |dll| {
            dll.get_fifo_init_vars(
                mod_no,
                &mut fifo_type,
                &mut stream_type,
                &mut mt_clock,
                &mut spc_header,
            )
        })?;
        Ok(FifoInitVars::from_raw(fifo_type, stream_type, mt_clock, spc_header))
    }
}
