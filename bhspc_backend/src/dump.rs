//! Human-readable dump of the DLL and module state, for troubleshooting.

use std::io::Write;

use spcm_defs::{ErrorKind, Result, MAX_NO_OF_SPC};

use crate::dll::SpcmDll;
use crate::spcm::Spcm;

const WRAP_WIDTH: usize = 79;
const PARAM_INDENT: &str = "    ";

/// Writes everything the DLL reports about one module.
///
/// Each query that fails is reported inline and the dump continues. A failure of the first
/// query (`SPC_test_id`) ends the dump of this module, and is returned when it says the module
/// is not active.
pub fn dump_module_state<D: SpcmDll, W: Write>(
    spcm: &Spcm<D>,
    mod_no: i16,
    out: &mut W,
) -> Result<()> {
    let module_type = match spcm.test_id(mod_no) {
        Ok(module_type) => module_type,
        Err(err) if err.is_kind(ErrorKind::NotActive) => return Err(err),
        Err(err) => {
            writeln!(out, "Module {}: test_id() failed: {}", mod_no, err)?;
            return Ok(());
        }
    };
    writeln!(out, "Module {}: {}", mod_no, module_type)?;

    let init_status = spcm.get_init_status(mod_no);
    match &init_status {
        Ok(status) => writeln!(out, "  {} ({})", status, status.message())?,
        Err(err) => writeln!(out, "  get_init_status() failed: {}", err)?,
    }

    match spcm.get_module_info(mod_no) {
        Ok(info) => {
            if info.module_type != module_type {
                writeln!(out, "  ModInfo.module_type: {}", info.module_type)?;
            }
            writeln!(
                out,
                "  PCI bus/slot:        {}, {}",
                info.bus_number, info.slot_number
            )?;
            writeln!(out, "  ModInfo.in_use:      {}", info.in_use)?;
            if init_status.ok() != Some(info.init) {
                writeln!(out, "  ModInfo.init_status: {}", info.init)?;
            }
        }
        Err(err) => writeln!(out, "  get_module_info() failed: {}", err)?,
    }

    match spcm.get_eeprom_data(mod_no) {
        Ok(eep) => {
            writeln!(out, "  EEPData.module_type: {}", eep.module_type)?;
            writeln!(out, "  EEPData.serial_no:   {}", eep.serial_no)?;
            writeln!(out, "  EEPData.date:        {}", eep.date)?;
        }
        Err(err) => writeln!(out, "  get_eeprom_data() failed: {}", err)?,
    }

    match spcm.get_version(mod_no) {
        Ok(version) => writeln!(out, "  FPGA Version:        {}", version)?,
        Err(err) => writeln!(out, "  get_version() failed: {}", err)?,
    }

    match spcm.test_state(mod_no) {
        Ok(state) => writeln!(out, "  State:               {:?}", state)?,
        Err(err) => writeln!(out, "  test_state() failed: {}", err)?,
    }

    match spcm.get_sync_state(mod_no) {
        Ok(state) => writeln!(out, "  Sync state:          {:?}", state)?,
        Err(err) => writeln!(out, "  get_sync_state() failed: {}", err)?,
    }

    match spcm.get_parameters(mod_no) {
        Ok(data) => {
            let words: Vec<String> = data
                .items()
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            writeln!(out, "  Parameters:")?;
            for line in wrap_words(&words, WRAP_WIDTH, PARAM_INDENT) {
                writeln!(out, "{}", line)?;
            }
        }
        Err(err) => writeln!(out, "  get_parameters() failed: {}", err)?,
    }
    Ok(())
}

/// Writes the DLL operation mode followed by the state of each module in `modules`
/// (`None` meaning all modules). Inactive modules are reported, not returned as errors.
pub fn dump_state<D: SpcmDll, W: Write>(
    spcm: &Spcm<D>,
    modules: Option<&[i16]>,
    out: &mut W,
) -> Result<()> {
    let mode = spcm.get_mode()?;
    writeln!(out, "DLL mode: {}", mode)?;

    let all: Vec<i16> = (0..MAX_NO_OF_SPC as i16).collect();
    for &mod_no in modules.unwrap_or(all.as_slice()) {
        writeln!(out)?;
        match dump_module_state(spcm, mod_no, out) {
            Ok(()) => {}
            Err(err) if err.kind().is_some() => writeln!(out, "Module {} is not active", mod_no)?,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Greedy word wrap. Words longer than the width get a line of their own.
fn wrap_words(words: &[String], width: usize, indent: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::from(indent);
    for word in words {
        let empty = line.len() == indent.len();
        if !empty && line.len() + 1 + word.len() > width {
            lines.push(std::mem::replace(&mut line, String::from(indent)));
        } else if !empty {
            line.push(' ');
        }
        line.push_str(word);
    }
    if line.len() > indent.len() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod test {
    use crate::dump::*;

    fn words(s: &str) -> Vec<String> {
        s.split(' ').map(String::from).collect()
    }

    #[test]
    fn wrap_at_width() {
        let lines = wrap_words(&words("aaaa bbbb cccc"), 13, "  ");
        assert_eq!(lines, vec!["  aaaa bbbb", "  cccc"]);
        assert!(lines.iter().all(|l| l.len() <= 13));
    }

    #[test]
    fn long_words_are_not_broken() {
        let lines = wrap_words(&words("a cfd_limit_low=-12.5 b"), 10, "  ");
        assert_eq!(lines, vec!["  a", "  cfd_limit_low=-12.5", "  b"]);
    }

    #[test]
    fn nothing_to_wrap() {
        assert!(wrap_words(&[], 79, "    ").is_empty());
    }
}
