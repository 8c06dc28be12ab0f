//! File version of the SPCM DLL.
//!
//! The record layouts in this crate follow the vendor header of DLL 4.0 and later; older DLLs
//! use smaller structs and must not be called.

use std::fmt;

use crate::error::{Result, SpcmError};

/// A Windows file version, `major.minor.build.revision`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DllVersion(pub u16, pub u16, pub u16, pub u16);

/// Oldest DLL whose struct layouts match this crate.
pub const MIN_DLL_VERSION: DllVersion = DllVersion(4, 0, 0, 0);

impl DllVersion {
    /// Decodes the `dwFileVersionMS`/`dwFileVersionLS` pair of a `VS_FIXEDFILEINFO`.
    pub fn from_ms_ls(ms: u32, ls: u32) -> Self {
        DllVersion(
            (ms >> 16) as u16,
            (ms & 0xffff) as u16,
            (ls >> 16) as u16,
            (ls & 0xffff) as u16,
        )
    }

    pub fn as_tuple(self) -> (u16, u16, u16, u16) {
        (self.0, self.1, self.2, self.3)
    }
}

impl fmt::Display for DllVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.0, self.1, self.2, self.3)
    }
}

/// Rejects DLLs older than [`MIN_DLL_VERSION`].
pub fn check_dll_version(found: DllVersion) -> Result<DllVersion> {
    if found < MIN_DLL_VERSION {
        return Err(SpcmError::UnsupportedDllVersion {
            found,
            min: MIN_DLL_VERSION,
        });
    }
    Ok(found)
}
