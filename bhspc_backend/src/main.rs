/*!
# SPCM state dump

Initializes the SPCM DLL, prints the DLL mode and the state of the selected modules to
stdout, and closes the DLL. Logs go to stderr; set `RUST_LOG=bhspc_backend=trace` to see
every DLL call.

```bash
bhspc_backend_bin --simulate 150 --modules 0,1
bhspc_backend_bin --ini C:/path/to/spcm.ini --all
```
*/

// Without the DLL the binary only reports that it cannot run.
#![cfg_attr(not(windows), allow(dead_code))]

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use bhspc_backend::*;

#[derive(Parser, Debug)]
#[command(name = "bhspc_backend_bin")]
#[command(about = "Print the state of Becker & Hickl SPC modules")]
#[command(version)]
struct Cli {
    /// Initialize in simulation mode, given as the simulated module type (e.g. 150)
    #[arg(long, value_name = "MODE", conflicts_with = "ini")]
    simulate: Option<i16>,

    /// Initialize from an existing SPCM INI file
    #[arg(long, value_name = "PATH")]
    ini: Option<PathBuf>,

    /// Modules to dump, comma separated
    #[arg(long, value_delimiter = ',', default_value = "0")]
    modules: Vec<i16>,

    /// Dump all 32 modules
    #[arg(long, conflicts_with = "modules")]
    all: bool,
}

fn run<D: SpcmDll, W: Write>(spcm: &Spcm<D>, cli: &Cli, out: &mut W) -> Result<()> {
    match (&cli.ini, cli.simulate) {
        (Some(path), _) => spcm.init(path)?,
        (None, Some(mode)) => spcm.init_with_mode(DllOperationMode::from_raw(mode))?,
        (None, None) => spcm.init_with_mode(DllOperationMode::Hardware)?,
    }
    let modules = if cli.all { None } else { Some(cli.modules.as_slice()) };
    let dumped = dump_state(spcm, modules, out);
    spcm.close()?;
    dumped
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    #[cfg(windows)]
    let result =
        Spcm::system().and_then(|spcm| run(&spcm, &cli, &mut std::io::stdout().lock()));
    #[cfg(not(windows))]
    let result: Result<()> = Err(SpcmError::Io(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "the SPCM DLL is only available on Windows",
    )));

    if let Err(err) = result {
        error!("{}", err);
        std::process::exit(1);
    }
}
