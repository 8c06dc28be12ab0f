//! Definitions for the Becker & Hickl SPCM DLL that do not require the DLL itself.
//!
//! - [`data`]: the 256-byte device-parameter record and its parameter-ID projection.
//! - [`records`]: module information, EEPROM, rate and FIFO-format records.
//! - [`catalog`], [`flags`]: vendor constant lists and status bit sets. Values a newer DLL
//!   adds are kept as `Unknown(raw)` members or unnamed bits, never rejected.
//! - [`error`]: the error taxonomy shared with `bhspc_backend`.
//! - [`ini`]: generating and holding the vendor INI file.
//! - [`version`]: the minimum DLL file version the record layouts require.

#[macro_use]
mod macros;

pub mod catalog;
pub mod data;
pub mod error;
pub mod flags;
pub mod ini;
pub mod param;
pub mod records;
pub mod version;

pub use catalog::*;
pub use data::*;
pub use error::*;
pub use flags::*;
pub use ini::*;
pub use param::*;
pub use records::*;
pub use version::*;
