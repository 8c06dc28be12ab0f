//! Python extension module (`import bhspc_backend`).
//!
//! Exposes the [`Spcm`] wrappers as methods of a `Spcm` class. The parameter record is a
//! `Data` class with one attribute per parameter; other records become dicts in field order.
//! Catalog values become their vendor names, flag sets stay raw integers and FIFO data is
//! returned as numpy `uint16` arrays. DLL failures raise `SPCMError` with
//! `(code, kind, message)` as arguments; local validation failures raise the matching builtin
//! exception (`TypeError`, `OverflowError`, `ValueError`).

use std::path::PathBuf;

use numpy::{PyArray, PyArray1};
use pyo3::basic::CompareOp;
use pyo3::exceptions::{
    PyAttributeError, PyException, PyOSError, PyOverflowError, PyRuntimeError, PyTypeError,
    PyValueError,
};
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict, PyFloat, PyLong};

use spcm_defs::*;

use crate::dll::Spcm64;
use crate::dump::{dump_module_state, dump_state};
use crate::install;
use crate::spcm::Spcm;

pyo3::create_exception!(bhspc_backend, SPCMError, PyException);

fn to_pyerr(err: SpcmError) -> PyErr {
    match err {
        SpcmError::Dll {
            code,
            kind,
            message,
        } => SPCMError::new_err((code, kind.to_string(), message)),
        SpcmError::ParTypeMismatch { .. } => PyTypeError::new_err(err.to_string()),
        SpcmError::ParValueOutOfRange { .. }
        | SpcmError::BufferTooLarge { .. }
        | SpcmError::CodeOutOfRange { .. } => PyOverflowError::new_err(err.to_string()),
        SpcmError::TooManyModules { .. } | SpcmError::InvalidPath(_) | SpcmError::Nul(_) => {
            PyValueError::new_err(err.to_string())
        }
        SpcmError::Io(_) => PyOSError::new_err(err.to_string()),
        SpcmError::DllNotFound(_) | SpcmError::UnsupportedDllVersion { .. } => {
            PyRuntimeError::new_err(err.to_string())
        }
    }
}

fn par_value_to_py(py: Python, value: ParValue) -> PyObject {
    match value {
        ParValue::Int(v) => v.to_object(py),
        ParValue::Float(v) => (v as f64).to_object(py),
    }
}

/// An int given for a float parameter is converted; a float given for an int parameter is
/// left for the type check to reject.
fn par_value_from_py(par_id: ParId, value: &PyAny) -> PyResult<ParValue> {
    let value = if value.downcast::<PyLong>().is_ok() {
        ParValue::Int(value.extract::<i64>()?)
    } else if value.downcast::<PyFloat>().is_ok() {
        ParValue::Float(value.extract::<f32>()?)
    } else {
        return Err(PyTypeError::new_err("parameter values must be int or float"));
    };
    Ok(value.widen_to(par_id.par_type()))
}

fn par_id_from_py(par_id: &PyAny) -> PyResult<ParId> {
    let found = if let Ok(name) = par_id.extract::<&str>() {
        ParId::from_name(&name.to_lowercase())
    } else {
        ParId::from_raw(par_id.extract::<i16>()?)
    };
    found.ok_or_else(|| PyValueError::new_err(format!("unknown parameter {}", par_id)))
}

fn spc_data_to_dict<'py>(py: Python<'py>, data: &SpcData) -> PyResult<&'py PyDict> {
    let dict = PyDict::new(py);
    for (name, value) in data.items() {
        dict.set_item(name, par_value_to_py(py, value))?;
    }
    Ok(dict)
}

fn no_such_parameter(name: &str) -> PyErr {
    PyAttributeError::new_err(format!("'Data' object has no attribute '{}'", name))
}

fn init_status_to_py(status: InitStatus) -> (&'static str, i16, &'static str) {
    (status.name(), status.raw(), status.message())
}

/// A module number or a list of them.
#[derive(FromPyObject)]
pub enum ModuleSelection {
    One(i16),
    Many(Vec<i16>),
}

impl ModuleSelection {
    fn into_vec(self) -> Vec<i16> {
        match self {
            ModuleSelection::One(mod_no) => vec![mod_no],
            ModuleSelection::Many(modules) => modules,
        }
    }
}

/// A whole `Data` record, or a dict of parameter name to value applied to the module's
/// current record.
#[derive(FromPyObject)]
pub enum ParameterUpdate<'a> {
    Record(PyRef<'a, PyData>),
    Values(&'a PyDict),
}

/// The parameter record (`SPCdata`), with one attribute per parameter.
#[pyclass(name = "Data")]
#[derive(Clone)]
pub struct PyData {
    inner: SpcData,
}

#[pymethods]
impl PyData {
    #[new]
    pub fn new() -> Self {
        PyData {
            inner: SpcData::zeroed(),
        }
    }

    /// Parameter names in parameter-ID order.
    #[classattr]
    fn _fields() -> Vec<&'static str> {
        ParId::ALL.iter().map(|par_id| par_id.name()).collect()
    }

    fn __getattr__(&self, py: Python, name: &str) -> PyResult<PyObject> {
        let par_id = ParId::from_name(name).ok_or_else(|| no_such_parameter(name))?;
        Ok(par_value_to_py(py, self.inner.get(par_id)))
    }

    fn __setattr__(&mut self, name: &str, value: &PyAny) -> PyResult<()> {
        let par_id = ParId::from_name(name).ok_or_else(|| no_such_parameter(name))?;
        let value = par_value_from_py(par_id, value)?;
        self.inner.set(par_id, value).map_err(to_pyerr)
    }

    fn __richcmp__(&self, py: Python, other: &PyAny, op: CompareOp) -> PyObject {
        let Ok(other) = other.extract::<PyRef<PyData>>() else {
            return py.NotImplemented();
        };
        match op {
            CompareOp::Eq => (self.inner == other.inner).into_py(py),
            CompareOp::Ne => (self.inner != other.inner).into_py(py),
            _ => py.NotImplemented(),
        }
    }

    fn __repr__(&self) -> String {
        let fields: Vec<String> = self
            .inner
            .items()
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        format!("<Data({})>", fields.join(", "))
    }

    pub fn copy(&self) -> PyData {
        self.clone()
    }

    fn __copy__(&self) -> PyData {
        self.clone()
    }

    pub fn items(&self, py: Python) -> Vec<(&'static str, PyObject)> {
        self.inner
            .items()
            .into_iter()
            .map(|(name, value)| (name, par_value_to_py(py, value)))
            .collect()
    }

    pub fn as_dict(&self, py: Python) -> PyResult<PyObject> {
        Ok(spc_data_to_dict(py, &self.inner)?.to_object(py))
    }

    /// The parameters whose values differ from `other`, with the values of this record.
    pub fn diff_as_dict(&self, py: Python, other: PyRef<PyData>) -> PyResult<PyObject> {
        let dict = PyDict::new(py);
        for (name, value) in self.inner.diff(&other.inner) {
            dict.set_item(name, par_value_to_py(py, value))?;
        }
        Ok(dict.to_object(py))
    }
}

fn adjust_para_to_dict<'py>(py: Python<'py>, adj: &AdjustPara) -> PyResult<&'py PyDict> {
    let dict = PyDict::new(py);
    dict.set_item("vrt1", adj.vrt1)?;
    dict.set_item("vrt2", adj.vrt2)?;
    dict.set_item("vrt3", adj.vrt3)?;
    dict.set_item("dith_g", adj.dith_g)?;
    dict.set_item("gain_1", adj.gain_1)?;
    dict.set_item("gain_2", adj.gain_2)?;
    dict.set_item("gain_4", adj.gain_4)?;
    dict.set_item("gain_8", adj.gain_8)?;
    dict.set_item("gain_16", adj.gain_16)?;
    dict.set_item("tac_r0", adj.tac_r0)?;
    dict.set_item("tac_r1", adj.tac_r1)?;
    dict.set_item("tac_r2", adj.tac_r2)?;
    dict.set_item("tac_r4", adj.tac_r4)?;
    dict.set_item("tac_r8", adj.tac_r8)?;
    dict.set_item("sync_div", adj.sync_div)?;
    Ok(dict)
}

/// Python handle to the SPCM DLL. The DLL state is process-wide; instances share it.
#[pyclass(name = "Spcm", unsendable)]
pub struct PySpcm {
    inner: Spcm<Spcm64>,
}

#[pymethods]
impl PySpcm {
    /// Fails with `RuntimeError` if `spcm64.dll` is missing or too old.
    #[new]
    pub fn new() -> PyResult<Self> {
        Ok(PySpcm {
            inner: Spcm::system().map_err(to_pyerr)?,
        })
    }

    pub fn get_error_string(&self, code: i64) -> PyResult<String> {
        self.inner.error_string(code).map_err(to_pyerr)
    }

    pub fn init(&self, ini_file: PathBuf) -> PyResult<()> {
        self.inner.init(&ini_file).map_err(to_pyerr)
    }

    /// Initializes with a minimal INI file selecting the given DLL operation mode.
    pub fn init_with_mode(&self, mode: i16) -> PyResult<()> {
        self.inner
            .init_with_mode(DllOperationMode::from_raw(mode))
            .map_err(to_pyerr)
    }

    pub fn close(&self) -> PyResult<()> {
        self.inner.close().map_err(to_pyerr)
    }

    /// `(name, code, message)` of the module's init status.
    pub fn get_init_status(&self, mod_no: i16) -> PyResult<(&'static str, i16, &'static str)> {
        let status = self.inner.get_init_status(mod_no).map_err(to_pyerr)?;
        Ok(init_status_to_py(status))
    }

    pub fn get_mode(&self) -> PyResult<String> {
        Ok(self.inner.get_mode().map_err(to_pyerr)?.to_string())
    }

    #[pyo3(signature = (mode, force_use, in_use))]
    pub fn set_mode(&self, mode: i16, force_use: bool, in_use: Vec<bool>) -> PyResult<()> {
        self.inner
            .set_mode(DllOperationMode::from_raw(mode), force_use, &in_use)
            .map_err(to_pyerr)
    }

    pub fn test_id(&self, mod_no: i16) -> PyResult<String> {
        Ok(self.inner.test_id(mod_no).map_err(to_pyerr)?.to_string())
    }

    pub fn get_module_info(&self, py: Python, mod_no: i16) -> PyResult<PyObject> {
        let info = self.inner.get_module_info(mod_no).map_err(to_pyerr)?;
        let dict = PyDict::new(py);
        dict.set_item("module_type", info.module_type.to_string())?;
        dict.set_item("bus_number", info.bus_number)?;
        dict.set_item("slot_number", info.slot_number)?;
        dict.set_item("in_use", info.in_use.to_string())?;
        dict.set_item("init", info.init.to_string())?;
        Ok(dict.to_object(py))
    }

    pub fn get_version(&self, mod_no: i16) -> PyResult<String> {
        self.inner.get_version(mod_no).map_err(to_pyerr)
    }
}

#[pymethods]
impl PySpcm {
    pub fn get_parameters(&self, mod_no: i16) -> PyResult<PyData> {
        let inner = self.inner.get_parameters(mod_no).map_err(to_pyerr)?;
        Ok(PyData { inner })
    }

    /// Writes a `Data` record as given. A dict (parameter name to value) is applied to the
    /// module's current record instead, so fields not exposed as parameters keep their
    /// device values.
    pub fn set_parameters(&self, mod_no: i16, data: ParameterUpdate<'_>) -> PyResult<()> {
        let data = match data {
            ParameterUpdate::Record(record) => record.inner,
            ParameterUpdate::Values(values) => {
                let mut data = self.inner.get_parameters(mod_no).map_err(to_pyerr)?;
                for (name, value) in values.iter() {
                    let par_id = par_id_from_py(name)?;
                    data.set(par_id, par_value_from_py(par_id, value)?)
                        .map_err(to_pyerr)?;
                }
                data
            }
        };
        self.inner.set_parameters(mod_no, &data).map_err(to_pyerr)
    }

    pub fn get_parameter(&self, py: Python, mod_no: i16, par_id: &PyAny) -> PyResult<PyObject> {
        let par_id = par_id_from_py(par_id)?;
        let value = self.inner.get_parameter(mod_no, par_id).map_err(to_pyerr)?;
        Ok(par_value_to_py(py, value))
    }

    pub fn set_parameter(&self, mod_no: i16, par_id: &PyAny, value: &PyAny) -> PyResult<()> {
        let par_id = par_id_from_py(par_id)?;
        let value = par_value_from_py(par_id, value)?;
        self.inner
            .set_parameter(mod_no, par_id, value)
            .map_err(to_pyerr)
    }

    pub fn get_eeprom_data(&self, py: Python, mod_no: i16) -> PyResult<PyObject> {
        let eep = self.inner.get_eeprom_data(mod_no).map_err(to_pyerr)?;
        let dict = PyDict::new(py);
        dict.set_item("module_type", eep.module_type)?;
        dict.set_item("serial_no", eep.serial_no)?;
        dict.set_item("date", eep.date)?;
        dict.set_item("adj_para", adjust_para_to_dict(py, &eep.adj_para)?)?;
        Ok(dict.to_object(py))
    }

    pub fn get_adjust_parameters(&self, py: Python, mod_no: i16) -> PyResult<PyObject> {
        let adj = self.inner.get_adjust_parameters(mod_no).map_err(to_pyerr)?;
        Ok(adjust_para_to_dict(py, &adj)?.to_object(py))
    }

    pub fn read_parameters_from_inifile(&self, ini_file: PathBuf) -> PyResult<PyData> {
        let inner = self
            .inner
            .read_parameters_from_inifile(&ini_file)
            .map_err(to_pyerr)?;
        Ok(PyData { inner })
    }

    #[pyo3(signature = (data, dest_inifile, source_inifile=None, with_comments=false))]
    pub fn save_parameters_to_inifile(
        &self,
        data: PyRef<PyData>,
        dest_inifile: PathBuf,
        source_inifile: Option<PathBuf>,
        with_comments: bool,
    ) -> PyResult<()> {
        self.inner
            .save_parameters_to_inifile(
                &data.inner,
                &dest_inifile,
                source_inifile.as_deref(),
                with_comments,
            )
            .map_err(to_pyerr)
    }
}

#[pymethods]
impl PySpcm {
    /// Measurement state bits; see `measurement_state_names`.
    pub fn test_state(&self, mod_no: i16) -> PyResult<u16> {
        Ok(self.inner.test_state(mod_no).map_err(to_pyerr)?.bits())
    }

    pub fn get_sync_state(&self, mod_no: i16) -> PyResult<u16> {
        Ok(self.inner.get_sync_state(mod_no).map_err(to_pyerr)?.bits())
    }

    pub fn get_time_from_start(&self, mod_no: i16) -> PyResult<f32> {
        self.inner.get_time_from_start(mod_no).map_err(to_pyerr)
    }

    pub fn get_break_time(&self, mod_no: i16) -> PyResult<f32> {
        self.inner.get_break_time(mod_no).map_err(to_pyerr)
    }

    pub fn get_actual_coltime(&self, mod_no: i16) -> PyResult<f32> {
        self.inner.get_actual_coltime(mod_no).map_err(to_pyerr)
    }

    pub fn clear_rates(&self, mod_no: i16) -> PyResult<()> {
        self.inner.clear_rates(mod_no).map_err(to_pyerr)
    }

    /// Rates as a dict, or None if not ready yet.
    pub fn read_rates(&self, py: Python, mod_no: i16) -> PyResult<Option<PyObject>> {
        let Some(rates) = self.inner.read_rates(mod_no).map_err(to_pyerr)? else {
            return Ok(None);
        };
        let dict = PyDict::new(py);
        dict.set_item("sync_rate", rates.sync_rate)?;
        dict.set_item("cfd_rate", rates.cfd_rate)?;
        dict.set_item("tac_rate", rates.tac_rate)?;
        dict.set_item("adc_rate", rates.adc_rate)?;
        Ok(Some(dict.to_object(py)))
    }

    pub fn get_fifo_usage(&self, mod_no: i16) -> PyResult<f32> {
        self.inner.get_fifo_usage(mod_no).map_err(to_pyerr)
    }

    pub fn start_measurement(&self, mod_no: i16) -> PyResult<()> {
        self.inner.start_measurement(mod_no).map_err(to_pyerr)
    }

    pub fn stop_measurement(&self, mod_no: i16) -> PyResult<()> {
        self.inner.stop_measurement(mod_no).map_err(to_pyerr)
    }

    /// Reads into an existing contiguous `uint16` array and returns the number of words read.
    pub fn read_fifo(&self, mod_no: i16, buf: &PyArray1<u16>) -> PyResult<usize> {
        // SAFETY: the slice is not retained past the call and Python cannot run concurrently
        // while the GIL is held.
        let slice = unsafe { buf.as_slice_mut() }
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        self.inner.read_fifo(mod_no, slice).map_err(to_pyerr)
    }

    pub fn read_fifo_to_array(&self, py: Python, mod_no: i16, max_words: usize) -> PyResult<PyObject> {
        let words = self
            .inner
            .read_fifo_to_vec(mod_no, max_words)
            .map_err(to_pyerr)?;
        Ok(PyArray::from_vec(py, words).to_object(py))
    }

    pub fn get_fifo_init_vars(&self, py: Python, mod_no: i16) -> PyResult<PyObject> {
        let vars = self.inner.get_fifo_init_vars(mod_no).map_err(to_pyerr)?;
        let dict = PyDict::new(py);
        dict.set_item("fifo_type", vars.fifo_type.to_string())?;
        dict.set_item("stream_type", vars.stream_type.bits())?;
        dict.set_item("mt_clock", vars.mt_clock)?;
        dict.set_item("spc_header", PyBytes::new(py, &vars.spc_header))?;
        Ok(dict.to_object(py))
    }

    /// The state dump as text. `modules` is a module number or a list of them; None dumps
    /// every module.
    #[pyo3(signature = (modules=Some(ModuleSelection::Many(vec![0]))))]
    pub fn dump_state(&self, modules: Option<ModuleSelection>) -> PyResult<String> {
        let modules = modules.map(ModuleSelection::into_vec);
        let mut out = Vec::new();
        dump_state(&self.inner, modules.as_deref(), &mut out).map_err(to_pyerr)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    pub fn dump_module_state(&self, mod_no: i16) -> PyResult<String> {
        let mut out = Vec::new();
        dump_module_state(&self.inner, mod_no, &mut out).map_err(to_pyerr)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

#[pyfunction]
#[pyo3(name = "minimal_spcm_ini")]
fn py_minimal_spcm_ini(mode: i16) -> String {
    minimal_spcm_ini(DllOperationMode::from_raw(mode))
}

/// Names of the flags set in a measurement state.
#[pyfunction]
fn measurement_state_names(bits: u16) -> Vec<&'static str> {
    MeasurementState::from_bits_retain(bits).names()
}

#[pyfunction]
#[pyo3(name = "measurement_state_bh_name")]
fn py_measurement_state_bh_name(name: &str) -> Option<&'static str> {
    measurement_state_bh_name(name)
}

/// File version of the installed `spcm64.dll` as a 4-tuple.
#[pyfunction]
#[pyo3(name = "spcm_dll_version")]
fn py_spcm_dll_version() -> PyResult<(u16, u16, u16, u16)> {
    Ok(install::spcm_dll_version().map_err(to_pyerr)?.as_tuple())
}

#[pymodule]
fn bhspc_backend(py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PySpcm>()?;
    m.add_class::<PyData>()?;
    m.add("SPCMError", py.get_type::<SPCMError>())?;
    m.add_function(wrap_pyfunction!(py_minimal_spcm_ini, m)?)?;
    m.add_function(wrap_pyfunction!(py_spcm_dll_version, m)?)?;
    m.add_function(wrap_pyfunction!(measurement_state_names, m)?)?;
    m.add_function(wrap_pyfunction!(py_measurement_state_bh_name, m)?)?;
    Ok(())
}
