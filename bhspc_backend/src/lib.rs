//! Safe bindings to the FIFO-mode subset of the Becker & Hickl SPCM DLL.
//!
//! - [`dll`]: the vendor function table behind the [`SpcmDll`] trait, and [`Spcm64`] linking
//!   `spcm64.dll` on Windows.
//! - [`spcm`]: the [`Spcm`] handle with one error-checked wrapper per vendor function.
//! - [`dump`]: a text dump of the DLL and module state.
//! - `install` (Windows): finds the installed `spcm64.dll` and reads its file version.
//!
//! Record layouts, catalogs and the error type come from `spcm_defs` and are re-exported.
//! With the `python` feature (Windows only) the crate also builds the `bhspc_backend`
//! Python extension module.

pub mod dll;
pub mod dump;
pub mod spcm;

#[cfg(windows)]
pub mod install;

#[cfg(all(windows, feature = "python"))]
mod python;

pub use crate::dll::*;
pub use crate::dump::*;
#[cfg(windows)]
pub use crate::install::*;
pub use crate::spcm::*;
pub use spcm_defs::*;
