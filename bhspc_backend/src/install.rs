//! Locating the installed SPCM DLL and reading its file version.
//!
//! The SPCM application records its executable path under `HKCU\SOFTWARE\BH\SPCM`; the DLL
//! lives in the `DLL` directory next to it. Without that entry the default install directory
//! is tried.

use std::ffi::{c_void, OsStr};
use std::io;
use std::iter;
use std::mem;
use std::os::windows::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr;

use tracing::debug;
use windows_sys::Win32::Storage::FileSystem::{
    GetFileVersionInfoSizeW, GetFileVersionInfoW, VerQueryValueW, VS_FIXEDFILEINFO,
};
use winreg::enums::HKEY_CURRENT_USER;
use winreg::RegKey;

use spcm_defs::*;

pub const SPCM_DLL_NAME: &str = "spcm64.dll";

const SPCM_REGISTRY_KEY: &str = "SOFTWARE\\BH\\SPCM";
const DEFAULT_SPCM_DLL_DIR: &str = "C:/Program Files (x86)/BH/SPCM/DLL";

fn registry_dll_dir() -> Option<PathBuf> {
    let key = RegKey::predef(HKEY_CURRENT_USER)
        .open_subkey(SPCM_REGISTRY_KEY)
        .ok()?;
    let exe: String = key.get_value("FilePath").ok()?;
    Some(Path::new(&exe).parent()?.join("DLL"))
}

/// Directory holding `spcm64.dll`.
pub fn spcm_dll_dir() -> Result<PathBuf> {
    let candidates: Vec<PathBuf> = registry_dll_dir()
        .into_iter()
        .chain(iter::once(PathBuf::from(DEFAULT_SPCM_DLL_DIR)))
        .collect();
    for dir in &candidates {
        if dir.join(SPCM_DLL_NAME).is_file() {
            debug!("found {} in {}", SPCM_DLL_NAME, dir.display());
            return Ok(dir.clone());
        }
    }
    let tried: Vec<String> = candidates.iter().map(|d| d.display().to_string()).collect();
    Err(SpcmError::DllNotFound(tried.join(", ")))
}

fn to_wide(s: &OsStr) -> Vec<u16> {
    s.encode_wide().chain(iter::once(0)).collect()
}

/// Reads the fixed file version from a DLL's version resource.
pub fn file_version(path: &Path) -> Result<DllVersion> {
    let wide_path = to_wide(path.as_os_str());
    let mut handle = 0u32;
    // SAFETY: `wide_path` is NUL-terminated and outlives the call.
    let size = unsafe { GetFileVersionInfoSizeW(wide_path.as_ptr(), &mut handle) };
    if size == 0 {
        return Err(SpcmError::Io(io::Error::last_os_error()));
    }

    let mut info = vec![0u8; size as usize];
    // SAFETY: `info` has the `size` bytes the previous call asked for.
    let ok = unsafe {
        GetFileVersionInfoW(wide_path.as_ptr(), 0, size, info.as_mut_ptr().cast::<c_void>())
    };
    if ok == 0 {
        return Err(SpcmError::Io(io::Error::last_os_error()));
    }

    let root = to_wide(OsStr::new("\\"));
    let mut fixed: *mut c_void = ptr::null_mut();
    let mut len = 0u32;
    // SAFETY: `fixed` points into `info`, which stays alive until the fields are copied out.
    let ok = unsafe {
        VerQueryValueW(
            info.as_ptr().cast::<c_void>(),
            root.as_ptr(),
            &mut fixed,
            &mut len,
        )
    };
    if ok == 0 || fixed.is_null() || (len as usize) < mem::size_of::<VS_FIXEDFILEINFO>() {
        return Err(SpcmError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} has no version resource", path.display()),
        )));
    }
    // SAFETY: checked non-null and large enough above. No alignment is assumed.
    let fixed = unsafe { ptr::read_unaligned(fixed as *const VS_FIXEDFILEINFO) };
    Ok(DllVersion::from_ms_ls(
        fixed.dwFileVersionMS,
        fixed.dwFileVersionLS,
    ))
}

/// File version of the installed `spcm64.dll`.
pub fn spcm_dll_version() -> Result<DllVersion> {
    file_version(&spcm_dll_dir()?.join(SPCM_DLL_NAME))
}

#[cfg(test)]
mod test {
    use crate::install::*;

    #[test]
    fn missing_file_has_no_version() {
        let dir = tempfile::tempdir().unwrap();
        let err = file_version(&dir.path().join(SPCM_DLL_NAME)).unwrap_err();
        assert!(matches!(err, SpcmError::Io(_)));
        assert!(!err.is_validation());
    }

    #[test]
    fn file_without_version_resource() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SPCM_DLL_NAME);
        std::fs::write(&path, b"not a PE image").unwrap();
        assert!(file_version(&path).is_err());
    }

    #[test]
    fn not_found_lists_the_default_directory() {
        // Either the DLL is installed or the error names where it was looked for.
        match spcm_dll_dir() {
            Ok(dir) => assert!(dir.join(SPCM_DLL_NAME).is_file()),
            Err(err) => {
                assert!(matches!(err, SpcmError::DllNotFound(_)));
                assert!(err.to_string().contains(DEFAULT_SPCM_DLL_DIR));
            }
        }
    }
}
