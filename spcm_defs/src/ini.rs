//! Helpers for the vendor's INI configuration file.
//!
//! `SPC_init` only accepts a path, so an in-memory configuration has to be written out first.
//! The DLL refuses files whose first line is not a comment starting with `SPCM`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tempfile::TempDir;
use tracing::warn;

use crate::catalog::DllOperationMode;
use crate::error::Result;

/// File name used inside the temporary directory.
pub const INI_FILE_NAME: &str = "bhspc.ini";

/// The smallest INI text the DLL accepts: the marker line, a base section selecting hardware
/// or a simulation mode, and an empty module section (all parameters at their defaults).
pub fn minimal_spcm_ini(mode: DllOperationMode) -> String {
    format!(
        "; SPCM\n[spc_base]\nsimulation = {}\n[spc_module]\n",
        mode.raw()
    )
}

/// True when the first line is a comment whose text starts with `SPCM`.
pub fn has_spcm_marker(text: &str) -> bool {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    let marker = MARKER.get_or_init(|| {
        Regex::new(r"^\s*;\s*SPCM").expect("marker pattern is a valid regex")
    });
    text.lines().next().map_or(false, |line| marker.is_match(line))
}

/// An INI text written to a fresh temporary directory. The directory is removed on drop, so
/// the value must outlive the DLL call that reads the file.
#[derive(Debug)]
pub struct IniFile {
    dir: TempDir,
    path: PathBuf,
}

impl IniFile {
    pub fn new(text: &str) -> Result<IniFile> {
        if !has_spcm_marker(text) {
            warn!("INI text does not start with the '; SPCM' marker, the DLL will reject it");
        }
        let dir = tempfile::Builder::new().prefix("bhspc").tempdir()?;
        let path = dir.path().join(INI_FILE_NAME);
        fs::write(&path, text)?;
        Ok(IniFile { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}
