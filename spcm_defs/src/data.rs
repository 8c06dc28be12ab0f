//! The device-parameter record (`SPCdata`) and its parameter-ID projection.
//!
//! ## Overview
//!
//! [`SpcData`] is a byte-for-byte transcription of the vendor's `SPCdata` struct: 256 bytes,
//! declared in the vendor's field order, including the trailing reserve. The DLL reads and
//! writes it whole (`SPC_get_parameters`, `SPC_set_parameters`, the INI-file calls), so the
//! layout is checked at compile time.
//!
//! Callers see the record through [`ParId`], the vendor's parameter numbering, which is not the
//! declaration order (e.g. `sync_freq_div` is declared after `tac_range` but numbered 5).
//! [`SpcData::items`], the `Debug` output and [`SpcData::diff`] all follow `ParId` order.
//!
//! Four fields are not part of the projection: `base_adr` and `init` (redundant with
//! [`crate::ModInfo`]), `pci_card_no` (the module index), and `test_eep` (whether the DLL
//! validated the EEPROM). They, and the reserve, still take part in equality, which is
//! byte-wise. A record built with [`SpcData::zeroed`] is structurally valid but does not
//! describe any real device; start from one read back from the DLL when writing parameters.
//!
//! ## Example
//!
//! ```
//! use spcm_defs::*;
//!
//! let mut data = SpcData::zeroed();
//! data.set(ParId::Mode, ParValue::Int(1)).unwrap();
//! data.set(ParId::CollectTime, ParValue::Float(0.01)).unwrap();
//! assert_eq!(data.mode, 1);
//! assert!(data.set(ParId::Mode, ParValue::Float(1.0)).is_err());
//! ```

use std::fmt;

use indexmap::IndexMap;

use crate::error::{Result, SpcmError};
use crate::param::{ParField, ParType, ParValue};

/// Size of `SPCdata` in the DLL versions this crate targets (4.0 and later).
pub const SPC_DATA_SIZE: usize = 256;

/// Transcription of the vendor `SPCdata` struct. Field meanings are documented in the
/// SPCM DLL manual; units are V or mV for thresholds, ns for TAC settings, s for timers.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct SpcData {
    base_adr: u16,
    init: i16,
    pub cfd_limit_low: f32,
    pub cfd_limit_high: f32,
    pub cfd_zc_level: f32,
    pub cfd_holdoff: f32,
    pub sync_zc_level: f32,
    pub sync_holdoff: f32,
    pub sync_threshold: f32,
    pub tac_range: f32,
    pub sync_freq_div: i16,
    pub tac_gain: i16,
    pub tac_offset: f32,
    pub tac_limit_low: f32,
    pub tac_limit_high: f32,
    pub adc_resolution: i16,
    pub ext_latch_delay: i16,
    pub collect_time: f32,
    pub display_time: f32,
    pub repeat_time: f32,
    pub stop_on_time: i16,
    pub stop_on_ovfl: i16,
    pub dither_range: i16,
    pub count_incr: i16,
    pub mem_bank: i16,
    pub dead_time_comp: i16,
    pub scan_control: u16,
    pub routing_mode: i16,
    pub tac_enable_hold: f32,
    pci_card_no: i16,
    pub mode: u16,
    pub scan_size_x: u32,
    pub scan_size_y: u32,
    pub scan_rout_x: u32,
    pub scan_rout_y: u32,
    pub scan_flyback: u32,
    pub scan_borders: u32,
    pub scan_polarity: u16,
    pub pixel_clock: u16,
    pub line_compression: u16,
    pub trigger: u16,
    pub pixel_time: f32,
    pub ext_pixclk_div: u32,
    pub rate_count_time: f32,
    pub macro_time_clk: i16,
    pub add_select: i16,
    test_eep: i16,
    pub adc_zoom: i16,
    pub img_size_x: u32,
    pub img_size_y: u32,
    pub img_rout_x: u32,
    pub img_rout_y: u32,
    pub xy_gain: i16,
    pub master_clock: i16,
    pub adc_sample_delay: i16,
    pub detector_type: i16,
    pub chan_enable: i16,
    pub chan_slope: i16,
    pub chan_spec_no: i16,
    pub x_axis_type: i16,
    pub tdc_control: u32,
    pub tdc_offset: [f32; 4],
    reserve: [u8; 60],
}

const _: () = assert!(std::mem::size_of::<SpcData>() == SPC_DATA_SIZE);

/// Defines [`ParId`] and the field accessors of [`SpcData`] from one table.
///
/// Entry: `Variant = id, "name" => field[index]?, Type;`
macro_rules! spc_parameters {
    (
        $(
            $variant:ident = $id:literal, $name:literal => $field:ident $([$idx:literal])?, $kind:ident;
        )*
    ) => {
        /// Vendor parameter identifier (`SPC_PARAMETERS_KEYWORDS`), as accepted by
        /// `SPC_get_parameter` and `SPC_set_parameter`.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ParId {
            $( $variant, )*
        }

        impl ParId {
            /// Every parameter, in vendor numbering order.
            pub const ALL: &'static [ParId] = &[$(ParId::$variant),*];

            pub fn from_raw(raw: i16) -> Option<ParId> {
                match raw {
                    $( $id => Some(ParId::$variant), )*
                    _ => None,
                }
            }

            pub fn raw(self) -> i16 {
                match self {
                    $( ParId::$variant => $id, )*
                }
            }

            /// Lower-case field name, as used by the INI file and the projected record.
            pub fn name(self) -> &'static str {
                match self {
                    $( ParId::$variant => $name, )*
                }
            }

            pub fn from_name(name: &str) -> Option<ParId> {
                match name {
                    $( $name => Some(ParId::$variant), )*
                    _ => None,
                }
            }

            pub fn par_type(self) -> ParType {
                match self {
                    $( ParId::$variant => ParType::$kind, )*
                }
            }
        }

        impl SpcData {
            /// Reads one projected field.
            pub fn get(&self, par_id: ParId) -> ParValue {
                match par_id {
                    $( ParId::$variant => self.$field $([$idx])?.to_value(), )*
                }
            }

            /// Writes one projected field. Fails without modifying the record when the value
            /// has the wrong type or does not fit the on-wire field.
            pub fn set(&mut self, par_id: ParId, value: ParValue) -> Result<()> {
                match par_id {
                    $( ParId::$variant => store(&mut self.$field $([$idx])?, par_id, value), )*
                }
            }
        }
    };
}

spc_parameters! {
    CfdLimitLow = 0, "cfd_limit_low" => cfd_limit_low, Float;
    CfdLimitHigh = 1, "cfd_limit_high" => cfd_limit_high, Float;
    CfdZcLevel = 2, "cfd_zc_level" => cfd_zc_level, Float;
    CfdHoldoff = 3, "cfd_holdoff" => cfd_holdoff, Float;
    SyncZcLevel = 4, "sync_zc_level" => sync_zc_level, Float;
    SyncFreqDiv = 5, "sync_freq_div" => sync_freq_div, Int;
    SyncHoldoff = 6, "sync_holdoff" => sync_holdoff, Float;
    SyncThreshold = 7, "sync_threshold" => sync_threshold, Float;
    TacRange = 8, "tac_range" => tac_range, Float;
    TacGain = 9, "tac_gain" => tac_gain, Int;
    TacOffset = 10, "tac_offset" => tac_offset, Float;
    TacLimitLow = 11, "tac_limit_low" => tac_limit_low, Float;
    TacLimitHigh = 12, "tac_limit_high" => tac_limit_high, Float;
    AdcResolution = 13, "adc_resolution" => adc_resolution, Int;
    ExtLatchDelay = 14, "ext_latch_delay" => ext_latch_delay, Int;
    CollectTime = 15, "collect_time" => collect_time, Float;
    DisplayTime = 16, "display_time" => display_time, Float;
    RepeatTime = 17, "repeat_time" => repeat_time, Float;
    StopOnTime = 18, "stop_on_time" => stop_on_time, Int;
    StopOnOvfl = 19, "stop_on_ovfl" => stop_on_ovfl, Int;
    DitherRange = 20, "dither_range" => dither_range, Int;
    CountIncr = 21, "count_incr" => count_incr, Int;
    MemBank = 22, "mem_bank" => mem_bank, Int;
    DeadTimeComp = 23, "dead_time_comp" => dead_time_comp, Int;
    ScanControl = 24, "scan_control" => scan_control, Int;
    RoutingMode = 25, "routing_mode" => routing_mode, Int;
    TacEnableHold = 26, "tac_enable_hold" => tac_enable_hold, Float;
    Mode = 27, "mode" => mode, Int;
    ScanSizeX = 28, "scan_size_x" => scan_size_x, Int;
    ScanSizeY = 29, "scan_size_y" => scan_size_y, Int;
    ScanRoutX = 30, "scan_rout_x" => scan_rout_x, Int;
    ScanRoutY = 31, "scan_rout_y" => scan_rout_y, Int;
    ScanPolarity = 32, "scan_polarity" => scan_polarity, Int;
    ScanFlyback = 33, "scan_flyback" => scan_flyback, Int;
    ScanBorders = 34, "scan_borders" => scan_borders, Int;
    PixelTime = 35, "pixel_time" => pixel_time, Float;
    PixelClock = 36, "pixel_clock" => pixel_clock, Int;
    LineCompression = 37, "line_compression" => line_compression, Int;
    Trigger = 38, "trigger" => trigger, Int;
    ExtPixclkDiv = 39, "ext_pixclk_div" => ext_pixclk_div, Int;
    RateCountTime = 40, "rate_count_time" => rate_count_time, Float;
    MacroTimeClk = 41, "macro_time_clk" => macro_time_clk, Int;
    AddSelect = 42, "add_select" => add_select, Int;
    AdcZoom = 43, "adc_zoom" => adc_zoom, Int;
    XyGain = 44, "xy_gain" => xy_gain, Int;
    ImgSizeX = 45, "img_size_x" => img_size_x, Int;
    ImgSizeY = 46, "img_size_y" => img_size_y, Int;
    ImgRoutX = 47, "img_rout_x" => img_rout_x, Int;
    ImgRoutY = 48, "img_rout_y" => img_rout_y, Int;
    MasterClock = 49, "master_clock" => master_clock, Int;
    AdcSampleDelay = 50, "adc_sample_delay" => adc_sample_delay, Int;
    DetectorType = 51, "detector_type" => detector_type, Int;
    XAxisType = 52, "x_axis_type" => x_axis_type, Int;
    ChanEnable = 53, "chan_enable" => chan_enable, Int;
    ChanSlope = 54, "chan_slope" => chan_slope, Int;
    ChanSpecNo = 55, "chan_spec_no" => chan_spec_no, Int;
    TdcControl = 56, "tdc_control" => tdc_control, Int;
    TdcOffset1 = 57, "tdc_offset1" => tdc_offset[0], Float;
    TdcOffset2 = 58, "tdc_offset2" => tdc_offset[1], Float;
    TdcOffset3 = 59, "tdc_offset3" => tdc_offset[2], Float;
    TdcOffset4 = 60, "tdc_offset4" => tdc_offset[3], Float;
}

fn store<T: ParField>(slot: &mut T, par_id: ParId, value: ParValue) -> Result<()> {
    if value.par_type() != T::TYPE {
        return Err(SpcmError::ParTypeMismatch {
            par_id,
            expected: T::TYPE,
            got: value,
        });
    }
    *slot = T::from_value(value).ok_or(SpcmError::ParValueOutOfRange { par_id, value })?;
    Ok(())
}

impl fmt::Display for ParId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl SpcData {
    /// An all-zero record. Valid, but not representative of any device.
    pub fn zeroed() -> Self {
        // SAFETY: every field is an integer, a float or an array of those.
        unsafe { std::mem::zeroed() }
    }

    /// The raw on-wire image, hidden fields and reserve included.
    pub fn as_bytes(&self) -> &[u8; SPC_DATA_SIZE] {
        // SAFETY: `SpcData` is `repr(C)`, exactly SPC_DATA_SIZE bytes and has no padding.
        unsafe { &*(self as *const SpcData as *const [u8; SPC_DATA_SIZE]) }
    }

    pub fn from_bytes(bytes: &[u8; SPC_DATA_SIZE]) -> Self {
        // SAFETY: any bit pattern is a valid `SpcData`.
        unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const SpcData) }
    }

    /// Projected fields in `ParId` order.
    pub fn items(&self) -> IndexMap<&'static str, ParValue> {
        ParId::ALL
            .iter()
            .map(|par_id| (par_id.name(), self.get(*par_id)))
            .collect()
    }

    /// Projected fields whose value in `self` differs from `other`, with `self`'s values.
    pub fn diff(&self, other: &SpcData) -> IndexMap<&'static str, ParValue> {
        ParId::ALL
            .iter()
            .filter(|par_id| !same_value(self.get(**par_id), other.get(**par_id)))
            .map(|par_id| (par_id.name(), self.get(*par_id)))
            .collect()
    }
}

fn same_value(a: ParValue, b: ParValue) -> bool {
    match (a, b) {
        (ParValue::Float(x), ParValue::Float(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

impl Default for SpcData {
    fn default() -> Self {
        SpcData::zeroed()
    }
}

impl PartialEq for SpcData {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for SpcData {}

impl fmt::Debug for SpcData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut s = f.debug_struct("SpcData");
        for par_id in ParId::ALL {
            let value = self.get(*par_id);
            s.field(par_id.name(), &format_args!("{}", value));
        }
        s.finish()
    }
}
