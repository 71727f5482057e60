//! encoder-bridge CLI: inspect and drive an encoder keyboard over raw HID.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use encoder_bridge_core::codec::{CommandGroup, Direction, Report, TelemetrySample, REPORT_LEN};
use encoder_bridge_core::config::{load_config, BridgeConfig};
use encoder_bridge_core::display::DisplayWriter;
use encoder_bridge_core::error::Error;
use encoder_bridge_core::event_loop::EventLoop;
use encoder_bridge_core::registry::{Controller, ControllerRegistry};
use encoder_bridge_core::session::DeviceSession;
use encoder_bridge_core::transport::{DeviceDescriptor, HidBackend, ReadOutcome, ReportTransport};
use std::ffi::CString;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// hidapi-backed enumeration and open.
struct CliHidBackend;

impl HidBackend for CliHidBackend {
    fn enumerate(&self) -> encoder_bridge_core::error::Result<Vec<DeviceDescriptor>> {
        encoder_bridge_core::device::enumerate_devices()
    }

    fn open(&self, path: &str) -> encoder_bridge_core::error::Result<Box<dyn ReportTransport>> {
        let api = hidapi::HidApi::new().map_err(|e| Error::Hid(format!("hidapi init: {e}")))?;
        let c_path = CString::new(path).map_err(|e| Error::SessionOpen {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        let device = api.open_path(&c_path).map_err(|e| {
            let reason = e.to_string();
            if reason.to_lowercase().contains("permission") {
                Error::PermissionDenied(format!("{path}: {reason}"))
            } else {
                Error::SessionOpen {
                    path: path.to_string(),
                    reason,
                }
            }
        })?;
        Ok(Box::new(CliHidTransport { device }))
    }
}

struct CliHidTransport {
    device: hidapi::HidDevice,
}

impl ReportTransport for CliHidTransport {
    fn read_report(&mut self, timeout: Duration) -> encoder_bridge_core::error::Result<ReadOutcome> {
        // hidapi strips the report ID on input; keep byte 0 for it.
        let mut report: Report = [0u8; REPORT_LEN];
        // Negative means "block forever" to hidapi.
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let n = self
            .device
            .read_timeout(&mut report[1..], timeout_ms)
            .map_err(|e| Error::Read(e.to_string()))?;
        if n == 0 {
            return Ok(ReadOutcome::TimedOut);
        }
        Ok(ReadOutcome::Report(report))
    }

    fn write_report(&mut self, report: &Report) -> encoder_bridge_core::error::Result<()> {
        self.device
            .write(report)
            .map_err(|e| Error::Write(e.to_string()))?;
        Ok(())
    }
}

/// Logs every event it receives. Used by `listen`.
struct LoggingController {
    group: CommandGroup,
}

impl Controller for LoggingController {
    fn name(&self) -> &str {
        self.group.name()
    }

    fn on_rotate(
        &mut self,
        direction: Direction,
        _display: &mut DisplayWriter<'_>,
    ) -> encoder_bridge_core::error::Result<()> {
        info!(group = %self.group, ?direction, "Rotate");
        Ok(())
    }

    fn on_press(&mut self, _display: &mut DisplayWriter<'_>) -> encoder_bridge_core::error::Result<()> {
        info!(group = %self.group, "Press");
        Ok(())
    }

    fn on_command(
        &mut self,
        code: u8,
        payload: &[u8],
        _display: &mut DisplayWriter<'_>,
    ) -> encoder_bridge_core::error::Result<()> {
        info!(
            group = %self.group,
            code = format_args!("0x{code:02X}"),
            payload = ?&payload[..8],
            "Command"
        );
        Ok(())
    }
}

#[derive(Parser)]
#[command(
    name = "encoder-bridge",
    version,
    about = "Bridge keyboard rotary encoders to desktop controls over raw HID"
)]
struct Cli {
    /// Path to a JSON config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List HID interfaces belonging to the configured keyboard.
    ListDevices {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Open the keyboard and log every encoder event.
    Listen,
    /// Show a status line on a group's screen.
    Status {
        /// Group name (telemetry, volume, voice, lamp) or tag such as 0xF2.
        group: String,
        text: String,
    },
    /// Show a selection frame on a group's screen.
    Selection {
        group: String,
        index: usize,
        total: usize,
        label: String,
    },
    /// Push one telemetry sample.
    Telemetry {
        #[arg(long, default_value_t = 0)]
        cpu: u8,
        #[arg(long, default_value_t = 0)]
        gpu: u8,
        #[arg(long, default_value_t = 0)]
        vram: u16,
        #[arg(long, default_value_t = 0)]
        ping: u16,
    },
    /// Print the default configuration as JSON.
    DefaultConfig,
}

fn parse_group(name: &str) -> Result<CommandGroup> {
    CommandGroup::from_name(name).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown group '{name}'. Valid groups: telemetry, volume, voice, lamp, or a tag 0xF0-0xF3"
        )
    })
}

fn open_session(config: &BridgeConfig) -> Result<DeviceSession> {
    DeviceSession::locate_and_open(&CliHidBackend, &config.device)
        .with_context(|| format!("open keyboard ({})", config.device))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };

    match cli.command {
        Commands::ListDevices { json } => {
            let devices = encoder_bridge_core::device::enumerate_devices()?;
            let matches = encoder_bridge_core::device::matching_interfaces(&devices, &config.device);
            if json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else if matches.is_empty() {
                println!("No matching keyboard found ({}).", config.device);
                println!("Ensure the keyboard is connected and udev rules grant access.");
            } else {
                for dev in &matches {
                    let raw = if config.device.matches_interface(dev) {
                        " [raw]"
                    } else {
                        ""
                    };
                    println!(
                        "{} (VID: 0x{:04X}, PID: 0x{:04X}, usage: 0x{:04X}/0x{:02X}, interface: {}, path: {}){raw}",
                        dev.product.as_deref().unwrap_or("unknown"),
                        dev.vendor_id,
                        dev.product_id,
                        dev.usage_page,
                        dev.usage,
                        dev.interface_number,
                        dev.path
                    );
                }
            }
        }
        Commands::Listen => {
            let session = open_session(&config)?;
            let mut registry = ControllerRegistry::new();
            for &group in CommandGroup::ALL {
                registry.register(group, Box::new(LoggingController { group }));
            }
            let mut event_loop =
                EventLoop::new(session, registry).with_poll_timeout(config.poll_timeout());
            let result = event_loop.run();
            println!("Session ended: {:?}", EventLoop::status_after(&result));
            result?;
        }
        Commands::Status { group, text } => {
            let group = parse_group(&group)?;
            let mut session = open_session(&config)?;
            DisplayWriter::new(&mut session, group).show_status(&text)?;
            println!("Status sent to {group}");
        }
        Commands::Selection {
            group,
            index,
            total,
            label,
        } => {
            let group = parse_group(&group)?;
            let mut session = open_session(&config)?;
            DisplayWriter::new(&mut session, group).show_selection(index, total, &label)?;
            println!("Selection {index}/{total} sent to {group}");
        }
        Commands::Telemetry {
            cpu,
            gpu,
            vram,
            ping,
        } => {
            let sample = TelemetrySample {
                cpu,
                gpu,
                vram,
                ping_ms: ping,
            };
            let mut session = open_session(&config)?;
            DisplayWriter::new(&mut session, CommandGroup::Telemetry).show_telemetry(&sample)?;
            println!("Telemetry sent: {sample:?}");
        }
        Commands::DefaultConfig => {
            println!("{}", serde_json::to_string_pretty(&BridgeConfig::default())?);
        }
    }

    Ok(())
}
