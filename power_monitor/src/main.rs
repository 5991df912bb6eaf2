use anyhow::bail;
use clap::Parser;
use env_logger::Env;
use log::{debug, error, info};
use power_monitor::config::{CpuSource, MonitorConfig};
use power_monitor::device::{stdout, DeviceInterface};
use power_monitor::monitor::{CrosPowerMonitor, HostCpuMonitor, PowerMonitor, ProcStatMonitor};
use power_monitor::output::{OutputFormat, ResultWriter};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use std::time::Duration;

const DEFAULT_CONFIG: &str = "./power_monitor.toml";

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
	#[arg(
		short,
		long,
		help = "Path to the config file [default: ./power_monitor.toml if present]"
	)]
	config: Option<PathBuf>,

	#[arg(long, help = "Measure the device at this host over SSH")]
	host: Option<String>,

	#[arg(
		short,
		long,
		default_value_t = 60,
		help = "Length of the measurement window in seconds"
	)]
	duration: u64,

	#[arg(
		short,
		long,
		conflicts_with = "duration",
		help = "Command to run on the device; the measurement window lasts until it exits"
	)]
	workload: Option<String>,

	#[arg(short, long, help = "File to write the result to instead of stdout")]
	out: Option<PathBuf>,

	#[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
	format: OutputFormat,

	#[arg(long, help = "Only report whether the device can be measured")]
	check: bool,
}

fn main() {
	dotenvy::dotenv().ok();
	env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

	let args = Args::parse();

	if let Err(error) = run(args) {
		error!("{error:#}");
		process::exit(1);
	}
}

fn run(args: Args) -> anyhow::Result<()> {
	let mut config = load_config(args.config.as_deref())?;
	if let Some(host) = &args.host {
		config = config.with_host(host);
	}

	let device = config.create_device()?;
	info!("Starting power_monitor on {}", device.name());

	match config.cpu.source {
		CpuSource::Device => measure(
			CrosPowerMonitor::new(device.as_ref(), ProcStatMonitor::new(device.as_ref())),
			&args,
		),
		CpuSource::Host => measure(
			CrosPowerMonitor::new(device.as_ref(), HostCpuMonitor::new()),
			&args,
		),
	}
}

fn load_config(path: Option<&Path>) -> anyhow::Result<MonitorConfig> {
	match path {
		Some(path) => MonitorConfig::read_config(path),
		None if Path::new(DEFAULT_CONFIG).exists() => MonitorConfig::read_config(DEFAULT_CONFIG),
		None => {
			info!("No config file found, measuring the local machine");
			Ok(MonitorConfig::default())
		}
	}
}

fn measure<D: DeviceInterface, M: PowerMonitor>(
	monitor: CrosPowerMonitor<D, M>,
	args: &Args,
) -> anyhow::Result<()> {
	if !monitor.can_monitor_power()? {
		bail!("Power can not be monitored on {}", monitor.device().name());
	}

	if args.check {
		let on_battery = monitor.is_on_battery_power()?;
		println!("can_monitor_power: true");
		println!("on_battery_power: {on_battery}");
		return Ok(());
	}

	let session = monitor.start_monitoring_power()?;

	match &args.workload {
		Some(workload) => {
			info!("Running workload \"{workload}\"");
			let output = monitor.device().run_cmd_on_device(&[workload.as_str()])?;
			debug!("Workload output: {}", stdout(&output));
		}
		None => {
			info!("Measuring for {}s", args.duration);
			thread::sleep(Duration::from_secs(args.duration));
		}
	}

	let result = monitor.stop_monitoring_power(session)?;

	let mut writer = ResultWriter::new(args.out.as_deref(), args.format)?;
	writer.write(&result)
}
