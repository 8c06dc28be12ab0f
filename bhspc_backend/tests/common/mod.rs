//! In-memory stand-in for the SPCM DLL, modelled on the vendor's simulation mode.
//!
//! Only the behavior the wrappers depend on is reproduced: the error-string table,
//! initialization from an INI file, module activation, parameter storage, rate-counter
//! latching, FIFO data and the FIFO format query. Every call is recorded, and any function
//! can be made to fail with a given code.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::ffi::CStr;
use std::fs;
use std::path::PathBuf;

use bhspc_backend::{SpcmDll, VERSION_STRING_LEN};
use spcm_defs::*;
// The glob brings in the one-parameter `spcm_defs::Result`.
use std::result::Result;

pub const OPEN_FILE: i16 = -1;
pub const FILE_NVALID: i16 = -2;
pub const BAD_PARA_ID: i16 = -10;
pub const BAD_PARA_VAL: i16 = -11;
pub const NO_ACT_MOD: i16 = -14;
pub const MOD_NO: i16 = -18;
pub const NOT_INIT: i16 = -19;
pub const RATES_NOT_RDY: i16 = -20;
pub const NOT_ACTIVE: i16 = -28;

/// Words the simulated module puts into its FIFO per counting interval while armed.
pub const WORDS_PER_INTERVAL: usize = 64;

const FIFO_CAPACITY: usize = 8192;

fn message_for(code: i16) -> &'static str {
    match code {
        0 => "No error",
        OPEN_FILE => "Can't open configuration file",
        FILE_NVALID => "Configuration file is not valid",
        BAD_PARA_ID => "Wrong parameter ID",
        BAD_PARA_VAL => "Wrong parameter value",
        NO_ACT_MOD => "No active modules",
        MOD_NO => "Module number out of range",
        NOT_INIT => "SPCM DLL not initialized",
        RATES_NOT_RDY => "Rate values not ready yet",
        NOT_ACTIVE => "Module not active",
        _ => "Unknown error code",
    }
}

/// A simulated module's parameters, with the fields no parameter ID reaches set as the DLL
/// would set them.
pub fn simulated_parameters(mod_no: i16) -> SpcData {
    let mut bytes = *SpcData::zeroed().as_bytes();
    bytes[0] = 0x10; // base_adr
    bytes[88..90].copy_from_slice(&mod_no.to_le_bytes()); // pci_card_no
    bytes[140] = 1; // test_eep
    let mut data = SpcData::from_bytes(&bytes);
    data.set(ParId::SyncThreshold, ParValue::Float(-19.6)).unwrap();
    data.set(ParId::CfdLimitLow, ParValue::Float(-20.0)).unwrap();
    data.set(ParId::TacRange, ParValue::Float(50.0)).unwrap();
    data.set(ParId::SyncFreqDiv, ParValue::Int(4)).unwrap();
    data.set(ParId::CollectTime, ParValue::Float(0.01)).unwrap();
    data.set(ParId::AdcResolution, ParValue::Int(10)).unwrap();
    data
}

pub fn simulated_adjust_para() -> AdjustPara {
    AdjustPara {
        vrt1: 110,
        vrt2: 150,
        vrt3: 130,
        dith_g: 3,
        gain_1: 1.0,
        gain_2: 2.0,
        gain_4: 4.0,
        gain_8: 8.0,
        gain_16: 16.0,
        tac_r0: 50.0,
        tac_r1: 100.0,
        tac_r2: 200.0,
        tac_r4: 500.0,
        tac_r8: 1000.0,
        sync_div: 4,
    }
}

#[derive(Clone)]
struct Module {
    data: SpcData,
    armed: bool,
    rates_ready: bool,
    started_at_interval: u32,
    fifo: VecDeque<u16>,
}

impl Module {
    fn new(mod_no: i16) -> Self {
        Module {
            data: simulated_parameters(mod_no),
            armed: false,
            rates_ready: false,
            started_at_interval: 0,
            fifo: VecDeque::new(),
        }
    }
}

struct State {
    initialized: bool,
    mode: i16,
    ini_file: Option<PathBuf>,
    active: [bool; MAX_NO_OF_SPC],
    last_in_use: Option<[i32; MAX_NO_OF_SPC]>,
    modules: Vec<Module>,
    intervals: u32,
    next_word: u16,
}

#[derive(Default)]
pub struct FakeDll {
    state: RefCell<Option<State>>,
    calls: RefCell<Vec<&'static str>>,
    failures: RefCell<HashMap<&'static str, i16>>,
}

impl FakeDll {
    pub fn new() -> Self {
        FakeDll::default()
    }

    /// Every call of `function` returns `code` from now on.
    pub fn fail(&self, function: &'static str, code: i16) {
        self.failures.borrow_mut().insert(function, code);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// The activation list the last successful `set_mode` received.
    pub fn last_in_use(&self) -> Option<[i32; MAX_NO_OF_SPC]> {
        self.state.borrow().as_ref().and_then(|s| s.last_in_use)
    }

    /// Lets one counting interval pass: rates latch and armed modules collect photons.
    pub fn elapse(&self) {
        let mut guard = self.state.borrow_mut();
        let Some(state) = guard.as_mut() else { return };
        state.intervals += 1;
        for i in 0..MAX_NO_OF_SPC {
            if !state.active[i] {
                continue;
            }
            state.modules[i].rates_ready = true;
            if state.modules[i].armed {
                for _ in 0..WORDS_PER_INTERVAL {
                    let word = state.next_word;
                    state.next_word = state.next_word.wrapping_add(1);
                    if state.modules[i].fifo.len() < FIFO_CAPACITY {
                        state.modules[i].fifo.push_back(word);
                    }
                }
            }
        }
    }

    fn enter(&self, function: &'static str) -> Option<i16> {
        self.calls.borrow_mut().push(function);
        self.failures.borrow().get(function).copied()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> Result<T, i16>) -> Result<T, i16> {
        let mut guard = self.state.borrow_mut();
        match guard.as_mut() {
            Some(state) if state.initialized => f(state),
            _ => Err(NOT_INIT),
        }
    }

    /// Runs `f` on an active module.
    fn with_module(
        &self,
        mod_no: i16,
        f: impl FnOnce(&mut Module, &mut State) -> i16,
    ) -> i16 {
        let result = self.with_state(|state| {
            let index = module_index(mod_no)?;
            if !state.active[index] {
                return Err(NOT_ACTIVE);
            }
            let mut module = state.modules[index].clone();
            let ret = f(&mut module, state);
            state.modules[index] = module;
            Ok(ret)
        });
        result.unwrap_or_else(|code| code)
    }
}

fn module_index(mod_no: i16) -> Result<usize, i16> {
    usize::try_from(mod_no)
        .ok()
        .filter(|i| *i < MAX_NO_OF_SPC)
        .ok_or(MOD_NO)
}

fn write_c_str(buf: &mut [u8], s: &str) {
    if buf.is_empty() {
        return;
    }
    let n = s.len().min(buf.len() - 1);
    buf[..n].copy_from_slice(&s.as_bytes()[..n]);
    buf[n] = 0;
}

fn read_ini(path: &CStr) -> Result<String, i16> {
    let path = path.to_str().map_err(|_| OPEN_FILE)?;
    let text = fs::read_to_string(path).map_err(|_| OPEN_FILE)?;
    if !has_spcm_marker(&text) {
        return Err(FILE_NVALID);
    }
    Ok(text)
}

fn ini_entries(text: &str, section: &str) -> Vec<(String, String)> {
    let mut current = String::new();
    let mut entries = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.starts_with(';') || line.is_empty() {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = name.to_string();
        } else if current == section {
            if let Some((key, value)) = line.split_once('=') {
                entries.push((key.trim().to_string(), value.trim().to_string()));
            }
        }
    }
    entries
}

fn apply_ini_parameters(data: &mut SpcData, text: &str) -> Result<(), i16> {
    for (key, value) in ini_entries(text, "spc_module") {
        let Some(par_id) = ParId::from_name(&key) else { continue };
        let value = match par_id.par_type() {
            ParType::Int => value.parse::<i64>().map(ParValue::Int).map_err(|_| FILE_NVALID)?,
            ParType::Float => value.parse::<f32>().map(ParValue::Float).map_err(|_| FILE_NVALID)?,
        };
        data.set(par_id, value).map_err(|_| BAD_PARA_VAL)?;
    }
    Ok(())
}

fn status(result: Result<(), i16>) -> i16 {
    match result {
        Ok(()) => 0,
        Err(code) => code,
    }
}

impl SpcmDll for FakeDll {
    fn get_error_string(&self, code: i16, buf: &mut [u8]) -> i16 {
        if let Some(code) = self.enter("get_error_string") {
            return code;
        }
        write_c_str(buf, message_for(code));
        0
    }

    fn init(&self, ini_file: &CStr) -> i16 {
        if let Some(code) = self.enter("init") {
            return code;
        }
        let text = match read_ini(ini_file) {
            Ok(text) => text,
            Err(code) => return code,
        };
        let mode = ini_entries(&text, "spc_base")
            .into_iter()
            .find(|(key, _)| key == "simulation")
            .and_then(|(_, value)| value.parse::<i16>().ok())
            .unwrap_or(0);
        if mode == 0 {
            // No hardware present.
            return NO_ACT_MOD;
        }
        let modules = (0..MAX_NO_OF_SPC as i16).map(Module::new).collect();
        *self.state.borrow_mut() = Some(State {
            initialized: true,
            mode,
            ini_file: ini_file.to_str().ok().map(PathBuf::from),
            active: [true; MAX_NO_OF_SPC],
            last_in_use: None,
            modules,
            intervals: 0,
            next_word: 0,
        });
        0
    }

    fn close(&self) -> i16 {
        if let Some(code) = self.enter("close") {
            return code;
        }
        if let Some(state) = self.state.borrow_mut().as_mut() {
            state.initialized = false;
        }
        // The vendor DLL reports success on close with a positive value.
        1
    }

    fn get_init_status(&self, mod_no: i16) -> i16 {
        if let Some(code) = self.enter("get_init_status") {
            return code;
        }
        let result = self.with_state(|state| {
            let index = module_index(mod_no)?;
            Ok(if state.active[index] { 0 } else { -1 })
        });
        result.unwrap_or_else(|code| if code == MOD_NO { MOD_NO } else { -1 })
    }

    fn get_mode(&self) -> i16 {
        if let Some(code) = self.enter("get_mode") {
            return code;
        }
        self.with_state(|state| Ok(state.mode))
            .unwrap_or_else(|code| code)
    }

    fn set_mode(&self, mode: i16, _force_use: i16, in_use: &mut [i32; MAX_NO_OF_SPC]) -> i16 {
        if let Some(code) = self.enter("set_mode") {
            return code;
        }
        status(self.with_state(|state| {
            if in_use.iter().all(|flag| *flag == 0) {
                return Err(NO_ACT_MOD);
            }
            state.mode = mode;
            for (active, flag) in state.active.iter_mut().zip(in_use.iter()) {
                *active = *flag != 0;
            }
            state.last_in_use = Some(*in_use);
            Ok(())
        }))
    }

    fn test_id(&self, mod_no: i16) -> i16 {
        if let Some(code) = self.enter("test_id") {
            return code;
        }
        self.with_module(mod_no, |_, state| state.mode)
    }

    fn get_module_info(&self, mod_no: i16, info: &mut SpcModInfo) -> i16 {
        if let Some(code) = self.enter("get_module_info") {
            return code;
        }
        status(self.with_state(|state| {
            let index = module_index(mod_no)?;
            let active = state.active[index];
            info.module_type = state.mode;
            info.bus_number = 0;
            info.slot_number = mod_no;
            info.in_use = active as i16;
            info.init = if active { 0 } else { -1 };
            info.base_adr = 0x10;
            Ok(())
        }))
    }

    fn get_version(&self, mod_no: i16, buf: &mut [u8; VERSION_STRING_LEN]) -> i16 {
        if let Some(code) = self.enter("get_version") {
            return code;
        }
        self.with_module(mod_no, |_, _| {
            write_c_str(buf, "0");
            0
        })
    }

    fn get_parameters(&self, mod_no: i16, data: &mut SpcData) -> i16 {
        if let Some(code) = self.enter("get_parameters") {
            return code;
        }
        self.with_module(mod_no, |module, _| {
            *data = module.data;
            0
        })
    }

    fn set_parameters(&self, mod_no: i16, data: &SpcData) -> i16 {
        if let Some(code) = self.enter("set_parameters") {
            return code;
        }
        self.with_module(mod_no, |module, _| {
            for par_id in ParId::ALL {
                // Hidden fields stay as the DLL set them.
                let _ = module.data.set(*par_id, data.get(*par_id));
            }
            0
        })
    }

    fn get_parameter(&self, mod_no: i16, par_id: i16, value: &mut f32) -> i16 {
        if let Some(code) = self.enter("get_parameter") {
            return code;
        }
        self.with_module(mod_no, |module, _| match ParId::from_raw(par_id) {
            Some(par_id) => {
                *value = module.data.get(par_id).as_f32();
                0
            }
            None => BAD_PARA_ID,
        })
    }

    fn set_parameter(&self, mod_no: i16, par_id: i16, value: f32) -> i16 {
        if let Some(code) = self.enter("set_parameter") {
            return code;
        }
        self.with_module(mod_no, |module, _| {
            let Some(par_id) = ParId::from_raw(par_id) else {
                return BAD_PARA_ID;
            };
            let value = ParValue::from_f32(par_id.par_type(), value);
            match module.data.set(par_id, value) {
                Ok(()) => 0,
                Err(_) => BAD_PARA_VAL,
            }
        })
    }

    fn get_eeprom_data(&self, mod_no: i16, eep: &mut SpcEepData) -> i16 {
        if let Some(code) = self.enter("get_eeprom_data") {
            return code;
        }
        self.with_module(mod_no, |_, state| {
            let module_type = format!("SPC-{}", state.mode);
            *eep = SpcEepData::with_identity(&module_type, "SIM0000", "01-01-2024");
            eep.adj_para = simulated_adjust_para();
            0
        })
    }

    fn get_adjust_parameters(&self, mod_no: i16, adjust: &mut AdjustPara) -> i16 {
        if let Some(code) = self.enter("get_adjust_parameters") {
            return code;
        }
        self.with_module(mod_no, |_, _| {
            *adjust = simulated_adjust_para();
            0
        })
    }

    fn read_parameters_from_inifile(&self, data: &mut SpcData, ini_file: &CStr) -> i16 {
        if let Some(code) = self.enter("read_parameters_from_inifile") {
            return code;
        }
        status(read_ini(ini_file).and_then(|text| {
            let mut read = simulated_parameters(0);
            apply_ini_parameters(&mut read, &text)?;
            *data = read;
            Ok(())
        }))
    }

    fn save_parameters_to_inifile(
        &self,
        data: &SpcData,
        dest_ini_file: &CStr,
        source_ini_file: Option<&CStr>,
        with_comments: bool,
    ) -> i16 {
        if let Some(code) = self.enter("save_parameters_to_inifile") {
            return code;
        }
        status(self.with_state(|state| {
            let source_text = match source_ini_file {
                Some(source) => read_ini(source)?,
                None => {
                    let path = state.ini_file.clone().ok_or(OPEN_FILE)?;
                    fs::read_to_string(path).map_err(|_| OPEN_FILE)?
                }
            };
            let mut text = String::from("; SPCM\n[spc_base]\n");
            for (key, value) in ini_entries(&source_text, "spc_base") {
                text.push_str(&format!("{} = {}\n", key, value));
            }
            text.push_str("[spc_module]\n");
            for (name, value) in data.items() {
                if with_comments {
                    text.push_str(&format!("; {}\n", name));
                }
                text.push_str(&format!("{} = {}\n", name, value));
            }
            let dest = dest_ini_file.to_str().map_err(|_| OPEN_FILE)?;
            fs::write(dest, text).map_err(|_| OPEN_FILE)
        }))
    }

    fn test_state(&self, mod_no: i16, state_out: &mut i16) -> i16 {
        if let Some(code) = self.enter("test_state") {
            return code;
        }
        self.with_module(mod_no, |module, _| {
            let mut bits = MeasurementState::empty();
            if module.armed {
                bits |= MeasurementState::ARMED;
            }
            if module.fifo.is_empty() {
                bits |= MeasurementState::FIFO_EMPTY;
            }
            if module.fifo.len() >= FIFO_CAPACITY {
                bits |= MeasurementState::FIFO_OVERFLOW;
            }
            *state_out = bits.bits() as i16;
            0
        })
    }

    fn get_sync_state(&self, mod_no: i16, sync_state: &mut i16) -> i16 {
        if let Some(code) = self.enter("get_sync_state") {
            return code;
        }
        self.with_module(mod_no, |_, _| {
            *sync_state = SyncState::SYNC_OK.bits() as i16;
            0
        })
    }

    fn get_time_from_start(&self, mod_no: i16, time: &mut f32) -> i16 {
        if let Some(code) = self.enter("get_time_from_start") {
            return code;
        }
        self.with_module(mod_no, |module, state| {
            let intervals = if module.armed {
                state.intervals - module.started_at_interval
            } else {
                0
            };
            *time = intervals as f32 * 0.1;
            0
        })
    }

    fn get_break_time(&self, mod_no: i16, time: &mut f32) -> i16 {
        if let Some(code) = self.enter("get_break_time") {
            return code;
        }
        self.with_module(mod_no, |_, _| {
            *time = 0.0;
            0
        })
    }

    fn get_actual_coltime(&self, mod_no: i16, time: &mut f32) -> i16 {
        if let Some(code) = self.enter("get_actual_coltime") {
            return code;
        }
        self.with_module(mod_no, |module, _| {
            *time = module.data.collect_time;
            0
        })
    }

    fn read_rates(&self, mod_no: i16, rates: &mut RateValues) -> i16 {
        if let Some(code) = self.enter("read_rates") {
            return code;
        }
        self.with_module(mod_no, |module, _| {
            if !module.rates_ready {
                return RATES_NOT_RDY;
            }
            module.rates_ready = false;
            *rates = RateValues {
                sync_rate: 8.0e7,
                cfd_rate: 1.0e6,
                tac_rate: 9.0e5,
                adc_rate: 8.5e5,
            };
            0
        })
    }

    fn clear_rates(&self, mod_no: i16) -> i16 {
        if let Some(code) = self.enter("clear_rates") {
            return code;
        }
        self.with_module(mod_no, |module, _| {
            module.rates_ready = false;
            0
        })
    }

    fn get_fifo_usage(&self, mod_no: i16, usage: &mut f32) -> i16 {
        if let Some(code) = self.enter("get_fifo_usage") {
            return code;
        }
        self.with_module(mod_no, |module, _| {
            *usage = module.fifo.len() as f32 / FIFO_CAPACITY as f32;
            0
        })
    }

    fn start_measurement(&self, mod_no: i16) -> i16 {
        if let Some(code) = self.enter("start_measurement") {
            return code;
        }
        self.with_module(mod_no, |module, state| {
            module.armed = true;
            module.started_at_interval = state.intervals;
            0
        })
    }

    fn stop_measurement(&self, mod_no: i16) -> i16 {
        if let Some(code) = self.enter("stop_measurement") {
            return code;
        }
        self.with_module(mod_no, |module, _| {
            module.armed = false;
            0
        })
    }

    fn read_fifo(&self, mod_no: i16, count: &mut u32, data: &mut [u16]) -> i16 {
        if let Some(code) = self.enter("read_fifo") {
            return code;
        }
        self.with_module(mod_no, |module, _| {
            let capacity = (*count as usize).min(data.len());
            // Whole 32-bit records only.
            let n = capacity.min(module.fifo.len()) & !1;
            for (slot, word) in data.iter_mut().zip(module.fifo.drain(..n)) {
                *slot = word;
            }
            *count = n as u32;
            0
        })
    }

    fn get_fifo_init_vars(
        &self,
        mod_no: i16,
        fifo_type: &mut i16,
        stream_type: &mut i16,
        mt_clock: &mut i32,
        spc_header: &mut u32,
    ) -> i16 {
        if let Some(code) = self.enter("get_fifo_init_vars") {
            return code;
        }
        self.with_module(mod_no, |module, _| {
            *fifo_type = FifoType::Spc150.raw();
            *stream_type = (StreamType::BH_STREAM | StreamType::HAS_SPC_HEADER).bits() as i16;
            *mt_clock = if module.data.macro_time_clk == 0 { 250 } else { 500 };
            let routing_bits = 4u32;
            *spc_header = (*mt_clock as u32) | (((routing_bits << 3) | (1 << 7)) << 24);
            0
        })
    }
}
