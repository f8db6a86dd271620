//! Command-line driver for the transaction link.
//!
//! This binary runs transactions against one of the built-in reference device models. It provides:
//! 1. **Demo:** A fixed get/set/block-transfer sequence that exercises both transports' happy paths.
//! 2. **Script run:** A JSON list of steps (`get`, `set`, `read`, `write`, `advance`, `reset`) with optional expected values.
//!
//! The device model follows the default transport: `fifo` drives the FIFO firmware, `register`
//! drives the register bank. Logging goes through `tracing`; `-v` raises the level and
//! `RUST_LOG` overrides it.

use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use simlink_core::bus::{BusHandle, BusLogger};
use simlink_core::config::{ConfigError, LinkConfig, TransportKind};
use simlink_core::devices::{FifoDevice, RegisterBank};
use simlink_core::{Link, UsbCommError};

#[derive(Parser, Debug)]
#[command(
    name = "simlink",
    author,
    version,
    about = "Register and burst transactions against a simulated device link",
    long_about = "Drive get/set/block-read/block-write transactions through a cycle-stepped device model.\n\nExamples:\n  simlink demo\n  simlink --transport register demo\n  simlink -vv --config link.json run steps.json"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON link configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Transport (and device model) to use, overriding the configuration.
    #[arg(long, value_enum, global = true)]
    transport: Option<TransportArg>,

    /// Trace every signal the host drives.
    #[arg(long, global = true)]
    trace_signals: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the built-in demonstration sequence.
    Demo,

    /// Run a JSON script of transaction steps.
    Run {
        /// Script path.
        script: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TransportArg {
    Fifo,
    Register,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Fifo => Self::Fifo,
            TransportArg::Register => Self::Register,
        }
    }
}

/// One scripted step.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum Step {
    Reset,
    Advance {
        cycles: u32,
    },
    Get {
        terminal: u16,
        reg: u32,
        #[serde(default)]
        timeout: u32,
        expect: Option<u16>,
    },
    Set {
        terminal: u16,
        reg: u32,
        value: u16,
        #[serde(default)]
        timeout: u32,
    },
    Read {
        terminal: u16,
        reg: u32,
        words: usize,
        #[serde(default)]
        timeout: u32,
        expect: Option<Vec<u32>>,
    },
    Write {
        terminal: u16,
        reg: u32,
        words: Vec<u32>,
        #[serde(default)]
        timeout: u32,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot read script {path}: {source}")]
    ScriptIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse script {path}: {source}")]
    ScriptParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("step {step}: {source}")]
    Link { step: usize, source: UsbCommError },
    #[error("step {step}: expected {expected}, got {actual}")]
    Mismatch {
        step: usize,
        expected: String,
        actual: String,
    },
}

type DynLink = Link<Box<dyn BusHandle>>;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.trace_signals);

    if let Err(err) = run(&cli) {
        error!(%err, "simlink failed");
        eprintln!("[!] {err}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8, trace_signals: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let directives = if trace_signals {
        format!("{level},simlink_core::bus=trace")
    } else {
        level.to_string()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let mut config = match &cli.config {
        Some(path) => LinkConfig::load(path)?,
        None => LinkConfig::default(),
    };
    if let Some(transport) = cli.transport {
        config.default_transport = transport.into();
    }

    let mut link = build_link(config, cli.trace_signals);
    link.power_on_reset();
    info!(transport = ?link.config().default_transport, "link up");

    match &cli.command {
        Commands::Demo => run_steps(&mut link, &demo_steps()),
        Commands::Run { script } => run_steps(&mut link, &load_script(script)?),
    }
}

fn build_link(config: LinkConfig, trace_signals: bool) -> DynLink {
    let device: Box<dyn BusHandle> = match config.default_transport {
        TransportKind::Fifo => Box::new(FifoDevice::new()),
        TransportKind::Register => Box::new(RegisterBank::new()),
    };
    let bus: Box<dyn BusHandle> = if trace_signals {
        Box::new(BusLogger::new(device, "link"))
    } else {
        device
    };
    Link::new(bus, config)
}

fn load_script(path: &Path) -> Result<Vec<Step>, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::ScriptIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::ScriptParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Set a register, read it back, read an unwritten one, then round-trip a small block.
fn demo_steps() -> Vec<Step> {
    let ramp: Vec<u32> = (0..10).map(|i| 0x1000 + i).collect();
    vec![
        Step::Set {
            terminal: 0,
            reg: 1,
            value: 10,
            timeout: 0,
        },
        Step::Get {
            terminal: 0,
            reg: 1,
            timeout: 0,
            expect: Some(10),
        },
        Step::Get {
            terminal: 0,
            reg: 0,
            timeout: 0,
            expect: Some(0),
        },
        Step::Set {
            terminal: 0,
            reg: 2,
            value: 0xab,
            timeout: 0,
        },
        Step::Get {
            terminal: 6,
            reg: 4,
            timeout: 0,
            expect: Some(512),
        },
        Step::Write {
            terminal: 0,
            reg: 3,
            words: ramp.clone(),
            timeout: 0,
        },
        Step::Read {
            terminal: 0,
            reg: 3,
            words: 10,
            timeout: 0,
            expect: Some(ramp.clone()),
        },
        Step::Read {
            terminal: 0,
            reg: 3,
            words: 8,
            timeout: 0,
            expect: Some(ramp[..8].to_vec()),
        },
    ]
}

fn run_steps(link: &mut DynLink, steps: &[Step]) -> Result<(), CliError> {
    for (index, step) in steps.iter().enumerate() {
        let step_no = index + 1;
        let wrap = |source| CliError::Link {
            step: step_no,
            source,
        };
        match step {
            Step::Reset => {
                link.power_on_reset();
                println!("[{step_no}] reset");
            }
            Step::Advance { cycles } => {
                link.advance(*cycles);
                println!("[{step_no}] advance {cycles} -> t={}", link.now());
            }
            Step::Get {
                terminal,
                reg,
                timeout,
                expect,
            } => {
                let value = link.get(*terminal, *reg, *timeout).map_err(wrap)?;
                println!("[{step_no}] get {terminal}:{reg:#x} = {value:#06x}");
                check(step_no, expect.as_ref(), &value)?;
            }
            Step::Set {
                terminal,
                reg,
                value,
                timeout,
            } => {
                link.set(*terminal, *reg, *value, *timeout).map_err(wrap)?;
                println!("[{step_no}] set {terminal}:{reg:#x} <- {value:#06x}");
            }
            Step::Read {
                terminal,
                reg,
                words,
                timeout,
                expect,
            } => {
                let data = link
                    .read_words(*terminal, *reg, *words, *timeout)
                    .map_err(wrap)?;
                println!("[{step_no}] read {terminal}:{reg:#x} x{words} = {data:x?}");
                check(step_no, expect.as_ref(), &data)?;
            }
            Step::Write {
                terminal,
                reg,
                words,
                timeout,
            } => {
                let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
                link.block_write(*terminal, *reg, &bytes, *timeout)
                    .map_err(wrap)?;
                println!("[{step_no}] write {terminal}:{reg:#x} x{}", words.len());
            }
        }
    }
    println!("[*] {} steps ok at t={}", steps.len(), link.now());
    Ok(())
}

fn check<T>(step: usize, expected: Option<&T>, actual: &T) -> Result<(), CliError>
where
    T: PartialEq + std::fmt::Debug,
{
    match expected {
        Some(expected) if expected != actual => Err(CliError::Mismatch {
            step,
            expected: format!("{expected:x?}"),
            actual: format!("{actual:x?}"),
        }),
        _ => Ok(()),
    }
}
