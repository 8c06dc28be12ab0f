//! Error taxonomy shared by the definitions and the DLL wrapper.
//!
//! Three kinds of failure exist:
//! 1. The DLL returned a negative code. [`SpcmError::Dll`] carries the raw code, its
//!    [`ErrorKind`] (or `ErrorKind::Unknown(code)` for codes added by newer DLLs) and the
//!    message the DLL itself returns for the code. Messages are never written locally.
//! 2. A value was rejected before any DLL call, because it cannot be passed safely or does
//!    not match the parameter table (type mismatch, out-of-range integer, oversized buffer,
//!    too many modules, strings with interior NUL bytes).
//! 3. Local I/O on temporary INI files, and locating or rejecting the installed DLL.
//!
//! Some polling queries return codes that are valid outcomes rather than errors (e.g.
//! [`ErrorKind::RatesNotRdy`]); the wrapper handles those before they become errors.

use std::ffi::NulError;

use thiserror::Error;

use crate::data::ParId;
use crate::param::{ParType, ParValue};
use crate::version::DllVersion;

spcm_enum! {
    /// Error codes of the SPCM DLL (`SPC_ERROR_KEYWORDS`), numbered 0, -1, -2, ...
    pub enum ErrorKind: i16 {
        NoError = 0 => "NONE",
        OpenFile = -1 => "OPEN_FILE",
        FileNvalid = -2 => "FILE_NVALID",
        MemAlloc = -3 => "MEM_ALLOC",
        ReadStr = -4 => "READ_STR",
        WrongId = -5 => "WRONG_ID",
        EepromChksum = -6 => "EEPROM_CHKSUM",
        EepromRead = -7 => "EEPROM_READ",
        EepromWrite = -8 => "EEPROM_WRITE",
        EepromWrEnable = -9 => "EEPROM_WR_ENABLE",
        BadParaId = -10 => "BAD_PARA_ID",
        BadParaVal = -11 => "BAD_PARA_VAL",
        HardTest = -12 => "HARD_TEST",
        BadFunc = -13 => "BAD_FUNC",
        NoActMod = -14 => "NO_ACT_MOD",
        InUse = -15 => "IN_USE",
        WindrvrVer = -16 => "WINDRVR_VER",
        WindrvrNopen = -17 => "WINDRVR_NOPEN",
        /// Module number out of range. Raised even by queries whose other negative results
        /// are statuses.
        ModNo = -18 => "MOD_NO",
        NotInit = -19 => "NOT_INIT",
        /// Rate counters not latched yet; a valid outcome of `SPC_read_rates`.
        RatesNotRdy = -20 => "RATES_NOT_RDY",
        NoLindata = -21 => "NO_LINDATA",
        WrongLicense = -22 => "WRONG_LICENSE",
        NoLicense = -23 => "NO_LICENSE",
        LicenseNotValid = -24 => "LICENSE_NOT_VALID",
        LicenseDateExp = -25 => "LICENSE_DATE_EXP",
        CantOpenUsb = -26 => "CANT_OPEN_USB",
        XilinxErr = -27 => "XILINX_ERR",
        NotActive = -28 => "NOT_ACTIVE",
    }
}

/// Every error of this crate and of the DLL wrapper.
#[derive(Error, Debug)]
pub enum SpcmError {
    #[error("SPCM error {code} ({kind}): {message}")]
    Dll {
        code: i16,
        kind: ErrorKind,
        message: String,
    },

    #[error("parameter {par_id} takes {expected} values, got {got}")]
    ParTypeMismatch {
        par_id: ParId,
        expected: ParType,
        got: ParValue,
    },

    #[error("value {value} does not fit parameter {par_id}")]
    ParValueOutOfRange { par_id: ParId, value: ParValue },

    #[error("buffer of {len} words exceeds the 32-bit FIFO word count")]
    BufferTooLarge { len: usize },

    #[error("{given} module flags given, the DLL manages at most {max} modules")]
    TooManyModules { given: usize, max: usize },

    #[error("error code {code} is outside the 16-bit range of SPCM codes")]
    CodeOutOfRange { code: i64 },

    #[error("path is not valid UTF-8: {0}")]
    InvalidPath(String),

    #[error("string passed to the DLL contains a NUL byte: {0}")]
    Nul(#[from] NulError),

    #[error("cannot find spcm64.dll (tried: {0})")]
    DllNotFound(String),

    #[error("spcm64.dll version {found} is not supported, {min} or later is required")]
    UnsupportedDllVersion { found: DllVersion, min: DllVersion },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type used throughout `spcm_defs` and `bhspc_backend`.
pub type Result<T> = std::result::Result<T, SpcmError>;

impl SpcmError {
    /// A translated DLL failure; the kind is derived from the code.
    pub fn dll(code: i16, message: impl Into<String>) -> Self {
        SpcmError::Dll {
            code,
            kind: ErrorKind::from_raw(code),
            message: message.into(),
        }
    }

    /// The raw DLL code, for DLL failures.
    pub fn code(&self) -> Option<i16> {
        match self {
            SpcmError::Dll { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SpcmError::Dll { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind() == Some(kind)
    }

    /// True for arguments rejected before calling the DLL.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            SpcmError::Dll { .. }
                | SpcmError::Io(_)
                | SpcmError::DllNotFound(_)
                | SpcmError::UnsupportedDllVersion { .. }
        )
    }
}
