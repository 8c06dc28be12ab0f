//! Read-only records returned by the module-information queries.
//!
//! Each `repr(C)` struct transcribes a vendor struct. Structs the DLL only ever fills in
//! (never reads) end with a reserve, so a DLL release that appends fields cannot write past
//! the buffer. The EEPROM and adjustment records are read-only by policy: this crate does not
//! bind the vendor's write functions.

use std::fmt;

use crate::catalog::{FifoType, InUseStatus, InitStatus, ModuleType};
use crate::flags::StreamType;

/// Transcription of `SPCModInfo`.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct SpcModInfo {
    pub module_type: i16,
    pub bus_number: i16,
    pub slot_number: i16,
    pub in_use: i16,
    pub init: i16,
    pub base_adr: u16,
    reserve: [u8; 64],
}

impl Default for SpcModInfo {
    fn default() -> Self {
        Self {
            module_type: 0,
            bus_number: 0,
            slot_number: 0,
            in_use: 0,
            init: 0,
            base_adr: 0,
            reserve: [0; 64],
        }
    }
}

/// Module information, with the I/O base address left out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModInfo {
    pub module_type: ModuleType,
    pub bus_number: i16,
    pub slot_number: i16,
    pub in_use: InUseStatus,
    pub init: InitStatus,
}

impl From<&SpcModInfo> for ModInfo {
    fn from(raw: &SpcModInfo) -> Self {
        Self {
            module_type: ModuleType::from_raw(raw.module_type),
            bus_number: raw.bus_number,
            slot_number: raw.slot_number,
            in_use: InUseStatus::from_raw(raw.in_use),
            init: InitStatus::from_raw(raw.init),
        }
    }
}

/// Transcription of `SPC_Adjust_Para`: factory adjustment values stored in the EEPROM.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AdjustPara {
    pub vrt1: i16,
    pub vrt2: i16,
    pub vrt3: i16,
    pub dith_g: i16,
    pub gain_1: f32,
    pub gain_4: f32,
    pub gain_16: f32,
    pub gain_2: f32,
    pub gain_8: f32,
    pub tac_r0: f32,
    pub tac_r1: f32,
    pub tac_r2: f32,
    pub tac_r4: f32,
    pub tac_r8: f32,
    pub sync_div: i16,
}

/// Transcription of `SPC_EEP_Data`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct SpcEepData {
    pub module_type: [u8; 16],
    pub serial_no: [u8; 16],
    pub date: [u8; 16],
    pub adj_para: AdjustPara,
    reserve: [u8; 256],
}

impl Default for SpcEepData {
    fn default() -> Self {
        Self {
            module_type: [0; 16],
            serial_no: [0; 16],
            date: [0; 16],
            adj_para: AdjustPara::default(),
            reserve: [0; 256],
        }
    }
}

impl SpcEepData {
    /// Fills the identity strings, truncating each to 15 bytes plus the terminating NUL.
    pub fn with_identity(module_type: &str, serial_no: &str, date: &str) -> Self {
        let mut raw = SpcEepData::default();
        copy_c_str(&mut raw.module_type, module_type);
        copy_c_str(&mut raw.serial_no, serial_no);
        copy_c_str(&mut raw.date, date);
        raw
    }
}

fn copy_c_str(dest: &mut [u8], src: &str) {
    let n = src.len().min(dest.len() - 1);
    dest[..n].copy_from_slice(&src.as_bytes()[..n]);
    dest[n..].fill(0);
}

/// EEPROM contents: module identity and factory adjustment values.
#[derive(Clone, Debug, PartialEq)]
pub struct EepData {
    pub module_type: String,
    pub serial_no: String,
    pub date: String,
    pub adj_para: AdjustPara,
}

impl From<&SpcEepData> for EepData {
    fn from(raw: &SpcEepData) -> Self {
        Self {
            module_type: c_buf_to_string(&raw.module_type),
            serial_no: c_buf_to_string(&raw.serial_no),
            date: c_buf_to_string(&raw.date),
            adj_para: raw.adj_para,
        }
    }
}

/// Decodes a NUL-terminated byte buffer filled in by the DLL. Invalid UTF-8 is replaced.
pub fn c_buf_to_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Transcription of `rate_values`: count rates in 1/s.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RateValues {
    pub sync_rate: f32,
    pub cfd_rate: f32,
    pub tac_rate: f32,
    pub adc_rate: f32,
}

/// Values needed to interpret the FIFO data stream (`SPC_get_fifo_init_vars`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FifoInitVars {
    pub fifo_type: FifoType,
    pub stream_type: StreamType,
    /// Macro-time clock period in units of 0.1 ns.
    pub mt_clock: i32,
    /// The 4-byte header the vendor writes at the start of `.spc` files, in file order.
    pub spc_header: [u8; 4],
}

impl FifoInitVars {
    /// Builds the record from the raw outputs of `SPC_get_fifo_init_vars`.
    pub fn from_raw(fifo_type: i16, stream_type: i16, mt_clock: i32, spc_header: u32) -> Self {
        Self {
            fifo_type: FifoType::from_raw(fifo_type),
            stream_type: StreamType::from_bits_retain(stream_type as u16),
            mt_clock,
            spc_header: spc_header.to_le_bytes(),
        }
    }

    /// Macro-time clock period in nanoseconds.
    pub fn mt_clock_ns(&self) -> f64 {
        self.mt_clock as f64 * 0.1
    }
}

impl fmt::Display for ModInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} at PCI {}/{} ({}, {})",
            self.module_type, self.bus_number, self.slot_number, self.in_use, self.init
        )
    }
}

#[cfg(test)]
mod test {
    use crate::records::*;

    #[test]
    fn default_mod_info() {
        let info = ModInfo::from(&SpcModInfo::default());
        assert_eq!(info.module_type, ModuleType::Unknown(0));
        assert_eq!(info.in_use, InUseStatus::NotInUse);
        assert_eq!(info.init, InitStatus::Ok);
        assert_eq!(info.bus_number, 0);
    }

    #[test]
    fn eep_strings() {
        let raw = SpcEepData::with_identity("SPC-150", "123456789012345678", "");
        let eep = EepData::from(&raw);
        assert_eq!(eep.module_type, "SPC-150");
        assert_eq!(eep.serial_no, "123456789012345");
        assert_eq!(eep.date, "");
        assert_eq!(eep.adj_para.sync_div, 0);
    }

    #[test]
    fn c_buf_without_nul() {
        assert_eq!(c_buf_to_string(b"abc"), "abc");
        assert_eq!(c_buf_to_string(b"ab\0c"), "ab");
        assert_eq!(c_buf_to_string(b""), "");
    }

    #[test]
    fn fifo_init_vars_header() {
        let header = 250u32 | ((4 << 3) | (1 << 7)) << 24;
        let vars = FifoInitVars::from_raw(7, 0x101, 250, header);
        assert_eq!(vars.fifo_type, FifoType::Spc150);
        assert!(vars.stream_type.contains(StreamType::HAS_SPC_HEADER));
        assert!(vars.stream_type.contains(StreamType::BH_STREAM));
        assert_eq!(vars.spc_header, [250, 0, 0, (4 << 3) | (1 << 7)]);
        assert!((vars.mt_clock_ns() - 25.0).abs() < 1e-9);
    }
}
