//! Integer catalogs reported or accepted by the SPCM DLL.
//!
//! Every catalog mirrors a list from the vendor header and adds an `Unknown(raw)` member, so a
//! DLL release that introduces new module types or modes degrades to "unknown" instead of
//! failing. Only [`InitStatus`] is written out by hand, because the vendor reports FPGA
//! configuration failures as a whole range of codes rather than a single value.

use std::fmt;

/// Number of SPC modules the DLL can manage at once (`MAX_NO_OF_SPC`).
pub const MAX_NO_OF_SPC: usize = 32;

spcm_enum! {
    /// SPC module type, as returned by `SPC_test_id` and found in `SPCModInfo`.
    pub enum ModuleType: i16 {
        Spc600 = 600 => "SPC_600",
        Spc630 = 630 => "SPC_630",
        Spc700 = 700 => "SPC_700",
        Spc730 = 730 => "SPC_730",
        Spc130 = 130 => "SPC_130",
        Spc830 = 830 => "SPC_830",
        Spc140 = 140 => "SPC_140",
        Spc930 = 930 => "SPC_930",
        Spc150 = 150 => "SPC_150",
        Spc130Em = 131 => "SPC_130_EM",
        Spc132 = 132 => "SPC_132",
        Spc150N = 151 => "SPC_150N",
        Spc150Nx = 152 => "SPC_150NX",
        Spc160 = 160 => "SPC_160",
        Spc160Pcie = 161 => "SPC_160_PCIE",
        Spc180 = 180 => "SPC_180",
        Spc180N = 181 => "SPC_180N",
        Spc180Nx = 182 => "SPC_180NX",
    }
}

spcm_enum! {
    /// DLL operation mode: real hardware, or simulation of one module type.
    ///
    /// Simulation modes are numbered after the module type they simulate.
    pub enum DllOperationMode: i16 {
        Hardware = 0 => "HARDWARE",
        SimulateSpc600 = 600 => "SIMULATE_SPC_600",
        SimulateSpc630 = 630 => "SIMULATE_SPC_630",
        SimulateSpc700 = 700 => "SIMULATE_SPC_700",
        SimulateSpc730 = 730 => "SIMULATE_SPC_730",
        SimulateSpc130 = 130 => "SIMULATE_SPC_130",
        SimulateSpc830 = 830 => "SIMULATE_SPC_830",
        SimulateSpc140 = 140 => "SIMULATE_SPC_140",
        SimulateSpc930 = 930 => "SIMULATE_SPC_930",
        SimulateSpc150 = 150 => "SIMULATE_SPC_150",
        SimulateSpc130Em = 131 => "SIMULATE_SPC_130_EM",
        SimulateSpc132 = 132 => "SIMULATE_SPC_132",
        SimulateSpc150N = 151 => "SIMULATE_SPC_150N",
        SimulateSpc150Nx = 152 => "SIMULATE_SPC_150NX",
        SimulateSpc160 = 160 => "SIMULATE_SPC_160",
        SimulateSpc160Pcie = 161 => "SIMULATE_SPC_160_PCIE",
        SimulateSpc180 = 180 => "SIMULATE_SPC_180",
        SimulateSpc180N = 181 => "SIMULATE_SPC_180N",
        SimulateSpc180Nx = 182 => "SIMULATE_SPC_180NX",
    }
}

impl DllOperationMode {
    pub fn is_simulation(self) -> bool {
        self != DllOperationMode::Hardware
    }
}

spcm_enum! {
    /// Whether a module is in use, and by whom (`SPCModInfo.in_use`).
    pub enum InUseStatus: i16 {
        InUseElsewhere = -1 => "IN_USE_ELSEWHERE",
        NotInUse = 0 => "NOT_IN_USE",
        InUseHere = 1 => "IN_USE_HERE",
    }
}

spcm_enum! {
    /// Layout of the photon records a module writes in FIFO mode.
    pub enum FifoType: i16 {
        Spc600Bits48 = 2 => "SPC_600_48BIT",
        Spc600Bits32 = 3 => "SPC_600_32BIT",
        Spc130 = 4 => "SPC_130",
        Spc830 = 5 => "SPC_830",
        Spc140 = 6 => "SPC_140",
        Spc150 = 7 => "SPC_150",
    }
}

/// Initialization result of a module (`SPC_get_init_status`, `SPCModInfo.init`).
///
/// Codes -100 through -199 all report a failed FPGA configuration and are folded into
/// [`InitStatus::XilinxErr`], which keeps the exact code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InitStatus {
    Ok,
    NotDone,
    WrongEepChksum,
    WrongModId,
    HardTestErr,
    CantOpenPciCard,
    ModInUse,
    WindrvrVer,
    WrongLicense,
    FirmwareVer,
    NoLicense,
    LicenseNotValid,
    LicenseDateExp,
    CantOpenUsb,
    XilinxErr(i16),
    Unknown(i16),
}

const XILINX_ERR_RANGE: std::ops::RangeInclusive<i16> = -199..=-100;

impl InitStatus {
    pub fn from_raw(raw: i16) -> Self {
        match raw {
            0 => InitStatus::Ok,
            -1 => InitStatus::NotDone,
            -2 => InitStatus::WrongEepChksum,
            -3 => InitStatus::WrongModId,
            -4 => InitStatus::HardTestErr,
            -5 => InitStatus::CantOpenPciCard,
            -6 => InitStatus::ModInUse,
            -7 => InitStatus::WindrvrVer,
            -8 => InitStatus::WrongLicense,
            -9 => InitStatus::FirmwareVer,
            -10 => InitStatus::NoLicense,
            -11 => InitStatus::LicenseNotValid,
            -12 => InitStatus::LicenseDateExp,
            -13 => InitStatus::CantOpenUsb,
            code if XILINX_ERR_RANGE.contains(&code) => InitStatus::XilinxErr(code),
            other => InitStatus::Unknown(other),
        }
    }

    pub fn raw(self) -> i16 {
        match self {
            InitStatus::Ok => 0,
            InitStatus::NotDone => -1,
            InitStatus::WrongEepChksum => -2,
            InitStatus::WrongModId => -3,
            InitStatus::HardTestErr => -4,
            InitStatus::CantOpenPciCard => -5,
            InitStatus::ModInUse => -6,
            InitStatus::WindrvrVer => -7,
            InitStatus::WrongLicense => -8,
            InitStatus::FirmwareVer => -9,
            InitStatus::NoLicense => -10,
            InitStatus::LicenseNotValid => -11,
            InitStatus::LicenseDateExp => -12,
            InitStatus::CantOpenUsb => -13,
            InitStatus::XilinxErr(code) | InitStatus::Unknown(code) => code,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InitStatus::Ok => "OK",
            InitStatus::NotDone => "NOT_DONE",
            InitStatus::WrongEepChksum => "WRONG_EEP_CHKSUM",
            InitStatus::WrongModId => "WRONG_MOD_ID",
            InitStatus::HardTestErr => "HARD_TEST_ERR",
            InitStatus::CantOpenPciCard => "CANT_OPEN_PCI_CARD",
            InitStatus::ModInUse => "MOD_IN_USE",
            InitStatus::WindrvrVer => "WINDRVR_VER",
            InitStatus::WrongLicense => "WRONG_LICENSE",
            InitStatus::FirmwareVer => "FIRMWARE_VER",
            InitStatus::NoLicense => "NO_LICENSE",
            InitStatus::LicenseNotValid => "LICENSE_NOT_VALID",
            InitStatus::LicenseDateExp => "LICENSE_DATE_EXP",
            InitStatus::CantOpenUsb => "CANT_OPEN_USB",
            InitStatus::XilinxErr(_) => "XILINX_ERR",
            InitStatus::Unknown(_) => "UNKNOWN",
        }
    }

    /// Short description, following the wording of the vendor manual.
    pub fn message(self) -> &'static str {
        match self {
            InitStatus::Ok => "Initialized",
            InitStatus::NotDone => "Not initialized",
            InitStatus::WrongEepChksum => "Wrong EEPROM checksum",
            InitStatus::WrongModId => "Wrong module ID",
            InitStatus::HardTestErr => "Hardware test failed",
            InitStatus::CantOpenPciCard => "Cannot open PCI card",
            InitStatus::ModInUse => "Module in use by another application",
            InitStatus::WindrvrVer => "Incorrect WinDriver version",
            InitStatus::WrongLicense => "Wrong license",
            InitStatus::FirmwareVer => "Incorrect firmware version",
            InitStatus::NoLicense => "No license",
            InitStatus::LicenseNotValid => "License not valid",
            InitStatus::LicenseDateExp => "License expired",
            InitStatus::CantOpenUsb => "Cannot open USB device",
            InitStatus::XilinxErr(_) => "FPGA configuration failed",
            InitStatus::Unknown(_) => "Unrecognized init status",
        }
    }

    pub fn is_ok(self) -> bool {
        self == InitStatus::Ok
    }
}

impl From<i16> for InitStatus {
    fn from(raw: i16) -> Self {
        InitStatus::from_raw(raw)
    }
}

impl fmt::Display for InitStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InitStatus::XilinxErr(code) | InitStatus::Unknown(code) => {
                write!(f, "{}({})", self.name(), code)
            }
            _ => write!(f, "{}", self.name()),
        }
    }
}
