//! edgeos-ctl - inspect EdgeOS driver bring-up from the host
//!
//! Commands:
//! - `edgeos-ctl detect` - Show the detected platform
//! - `edgeos-ctl devices` - Boot and list registered devices
//! - `edgeos-ctl exercise` - Boot and run one operation on every device

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use edgeos_hal::{BoardId, BusFrame, DeviceClass, DriverHandle, DriverResult, PlatformDescriptor};
use edgeos_kernel::{BootConfig, KernelHandle};

#[derive(Parser)]
#[command(name = "edgeos-ctl")]
#[command(author = "EdgeOS Contributors")]
#[command(version)]
#[command(about = "EdgeOS driver registry inspector", long_about = None)]
struct Cli {
    /// Show kernel log output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the detected platform
    Detect,

    /// Boot and list registered devices
    Devices {
        #[command(flatten)]
        boot: BootArgs,

        /// Only list devices of this class
        #[arg(short, long)]
        class: Option<DeviceClass>,
    },

    /// Boot and run one operation on every device
    Exercise {
        #[command(flatten)]
        boot: BootArgs,
    },
}

#[derive(Args)]
struct BootArgs {
    /// Boot configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the board (e.g. sim, rpi4)
    #[arg(short, long)]
    board: Option<BoardId>,
}

impl BootArgs {
    fn boot(&self) -> anyhow::Result<KernelHandle> {
        let mut config = match &self.config {
            Some(path) => BootConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => BootConfig::default(),
        };
        if self.board.is_some() {
            config.board = self.board;
        }
        Ok(edgeos_kernel::init_with_config(config))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command {
        Commands::Detect => {
            show_platform(&edgeos_hal::detect());
        }

        Commands::Devices { boot, class } => {
            let kernel = boot.boot()?;
            show_platform(kernel.platform());
            list_devices(&kernel, class);
        }

        Commands::Exercise { boot } => {
            let kernel = boot.boot()?;
            show_platform(kernel.platform());
            let failed = exercise(&kernel);
            if failed > 0 {
                anyhow::bail!("{} device(s) failed", failed);
            }
        }
    }

    Ok(())
}

fn show_platform(platform: &PlatformDescriptor) {
    let board = if platform.is_unknown() {
        platform.board.to_string().yellow()
    } else {
        platform.board.to_string().green()
    };
    println!("{} {} ({})", "Platform:".bold(), board, platform.arch);

    let features: Vec<_> = platform.features.iter_names().map(|(name, _)| name).collect();
    if features.is_empty() {
        println!("{} none", "Features:".bold());
    } else {
        println!("{} {}", "Features:".bold(), features.join(", "));
    }
}

fn list_devices(kernel: &KernelHandle, class: Option<DeviceClass>) {
    let registry = kernel.registry();
    let view = match class {
        Some(class) => registry.lookup_by_class(class),
        None => registry.devices(),
    };

    println!();
    if view.is_empty() {
        println!("{}", "No devices registered".yellow());
    }
    for handle in &view {
        let dummy = kernel
            .report()
            .bound
            .iter()
            .any(|d| d.id == handle.id() && d.dummy);
        let name = if dummy {
            format!("{} (no hardware)", handle.name()).dimmed()
        } else {
            handle.name().normal()
        };
        println!(
            "  {:<8} {:<14} {:<20} {}",
            handle.id().to_string().cyan(),
            handle.class().to_string(),
            handle.address().to_string(),
            name
        );
    }

    for failure in &kernel.report().failures {
        println!("  {} {} '{}': {}", "failed".red(), failure.class, failure.name, failure.error);
    }
}

fn exercise(kernel: &KernelHandle) -> usize {
    println!();
    let mut failed = 0;
    for handle in &kernel.registry().devices() {
        let label = format!("{} {}", handle.id(), handle.name());
        match exercise_one(handle) {
            Ok(summary) => println!("  {} {:<24} {}", "ok".green(), label, summary),
            Err(e) => {
                failed += 1;
                println!("  {} {:<24} {}", "err".red(), label, e);
            }
        }
    }
    failed
}

fn exercise_one(handle: &DriverHandle) -> DriverResult<String> {
    if let Some(axis) = handle.as_motion() {
        axis.move_to(1.0, 2.0, 3.0)?;
        let (x, y, z) = axis.position()?;
        return Ok(format!("at ({:.1}, {:.1}, {:.1}): {}", x, y, z, axis.status()?));
    }
    if let Some(bus) = handle.as_digital_bus() {
        bus.send(0x10, &[0xDE, 0xAD])?;
        return Ok(match bus.receive()? {
            Some(BusFrame { id, payload }) => {
                format!("{} frame {:#x} ({} bytes)", bus.protocol(), id, payload.len())
            }
            None => format!("{} sent, nothing received", bus.protocol()),
        });
    }
    if let Some(adc) = handle.as_analog() {
        let volts = adc.read(0)?;
        return Ok(format!("{} channel(s), ch0 = {:.3} V", adc.channels(), volts));
    }
    if let Some(port) = handle.as_serial() {
        let echoed = port.transfer(b"ping")?;
        return Ok(format!("echoed {} of 4 bytes", echoed.len()));
    }
    if let Some(fusion) = handle.as_fusion() {
        let out = fusion.process(&vec![0.0; fusion.input_len()])?;
        return Ok(format!("{} in -> {:?}", fusion.input_len(), out));
    }
    Ok(String::from("no capability"))
}
