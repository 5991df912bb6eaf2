use crate::device::{stdout, DeviceInterface};
use crate::monitor::PowerMonitor;
use anyhow::{anyhow, Context};
use common::metrics::{CpuStats, MonitoringResult};
use log::{debug, info};
use std::str::FromStr;

/// Generic monitor reporting the CPU utilization of a device from the
/// `/proc/stat` counters read at the start and the end of the window.
pub struct ProcStatMonitor<D> {
	device: D,
}

#[derive(Debug)]
pub struct ProcStatSession {
	initial: CpuTimes,
}

#[derive(Debug, Clone, PartialEq)]
struct CpuTimes {
	total: Jiffies,
	per_cpu: Vec<Jiffies>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Jiffies {
	busy: u64,
	total: u64,
}

impl<D: DeviceInterface> ProcStatMonitor<D> {
	const IDENTIFIER: &'static str = "proc_stat";

	pub fn new(device: D) -> Self {
		Self { device }
	}

	fn read_cpu_times(&self) -> anyhow::Result<CpuTimes> {
		let output = self.device.run_cmd_on_device(&["cat", "/proc/stat"])?;
		CpuTimes::parse(stdout(&output))
	}
}

impl<D: DeviceInterface> PowerMonitor for ProcStatMonitor<D> {
	type Session = ProcStatSession;

	fn can_monitor_power(&self) -> anyhow::Result<bool> {
		match self.read_cpu_times() {
			Ok(_) => Ok(true),
			Err(error) => {
				info!("CPU statistics unavailable on {}: {error:#}", self.device.name());
				Ok(false)
			}
		}
	}

	fn start_monitoring_power(&self) -> anyhow::Result<Self::Session> {
		Ok(ProcStatSession {
			initial: self.read_cpu_times()?,
		})
	}

	fn stop_monitoring_power(&self, session: Self::Session) -> anyhow::Result<MonitoringResult> {
		let last = self.read_cpu_times()?;
		debug!("CPU times from {:?} to {:?}", session.initial, last);

		let mut result = MonitoringResult::new(Self::IDENTIFIER);
		result.component_utilization.cpu = Some(CpuStats {
			usage_percent: last.total.usage_since(&session.initial.total),
			per_cpu_percent: last
				.per_cpu
				.iter()
				.zip(&session.initial.per_cpu)
				.map(|(last, initial)| last.usage_since(initial))
				.collect(),
		});

		Ok(result)
	}
}

impl CpuTimes {
	fn parse(proc_stat: &str) -> anyhow::Result<Self> {
		let mut total = None;
		let mut per_cpu = Vec::new();

		for line in proc_stat.lines() {
			let mut fields = line.split_whitespace();
			match fields.next() {
				Some("cpu") => total = Some(Jiffies::parse(fields)?),
				Some(name) if name.starts_with("cpu") => per_cpu.push(Jiffies::parse(fields)?),
				_ => {}
			}
		}

		Ok(Self {
			total: total.ok_or(anyhow!("No aggregate cpu line in /proc/stat"))?,
			per_cpu,
		})
	}
}

impl Jiffies {
	/// Takes the counters following the cpu name. Only user, nice, system,
	/// idle, iowait, irq, softirq and steal are summed; guest time is already
	/// part of user time.
	fn parse<'a>(fields: impl Iterator<Item = &'a str>) -> anyhow::Result<Self> {
		let counters = fields
			.take(8)
			.map(|field| {
				u64::from_str(field).with_context(|| format!("Invalid cpu counter \"{field}\""))
			})
			.collect::<anyhow::Result<Vec<u64>>>()?;
		if counters.len() < 4 {
			return Err(anyhow!("Too few cpu counters in /proc/stat"));
		}

		let total: u64 = counters.iter().sum();
		let idle = counters[3] + counters.get(4).copied().unwrap_or_default();
		Ok(Self {
			busy: total - idle,
			total,
		})
	}

	fn usage_since(&self, initial: &Jiffies) -> f64 {
		let total = self.total.saturating_sub(initial.total);
		if total == 0 {
			return 0.0;
		}
		self.busy.saturating_sub(initial.busy) as f64 * 100.0 / total as f64
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::device::scripted::ScriptedDevice;

	const START: &str = "cpu  100 0 100 800 0 0 0 0 0 0
cpu0 50 0 50 400 0 0 0 0 0 0
cpu1 50 0 50 400 0 0 0 0 0 0
intr 12345 0 0
ctxt 6789
btime 1400000000
";
	const END: &str = "cpu  250 0 150 1000 100 0 0 0 0 0
cpu0 200 0 100 400 0 0 0 0 0 0
cpu1 50 0 50 600 100 0 0 0 0 0
intr 23456 0 0
ctxt 7890
btime 1400000000
";

	#[test]
	fn parses_aggregate_and_per_cpu_counters() {
		let times = CpuTimes::parse(START).unwrap();

		assert_eq!(
			times.total,
			Jiffies {
				busy: 200,
				total: 1000
			}
		);
		assert_eq!(times.per_cpu.len(), 2);
	}

	#[test]
	fn iowait_counts_as_idle() {
		let times = CpuTimes::parse("cpu  10 0 10 70 10 0 0 0\n").unwrap();

		assert_eq!(times.total, Jiffies { busy: 20, total: 100 });
	}

	#[test]
	fn missing_aggregate_line_is_an_error() {
		assert!(CpuTimes::parse("cpu0 1 2 3 4\n").is_err());
		assert!(CpuTimes::parse("cpu  1 2 x 4\n").is_err());
		assert!(CpuTimes::parse("cpu  1 2\n").is_err());
	}

	#[test]
	fn reports_usage_over_window() {
		let device = ScriptedDevice::new()
			.respond("cat /proc/stat", START)
			.respond("cat /proc/stat", END);
		let monitor = ProcStatMonitor::new(&device);

		let session = monitor.start_monitoring_power().unwrap();
		let result = monitor.stop_monitoring_power(session).unwrap();

		assert_eq!(result.identifier, "proc_stat");
		let cpu = result.component_utilization.cpu.unwrap();
		assert_eq!(cpu.usage_percent, 40.0);
		assert_eq!(cpu.per_cpu_percent, vec![100.0, 0.0]);
	}

	#[test]
	fn unchanged_counters_report_no_usage() {
		let device = ScriptedDevice::new().respond("cat /proc/stat", START);
		let monitor = ProcStatMonitor::new(&device);

		let session = monitor.start_monitoring_power().unwrap();
		let result = monitor.stop_monitoring_power(session).unwrap();

		assert_eq!(result.component_utilization.cpu.unwrap().usage_percent, 0.0);
	}

	#[test]
	fn cannot_monitor_without_proc_stat() {
		let device = ScriptedDevice::new().respond("cat /proc/stat", "");

		assert!(!ProcStatMonitor::new(&device).can_monitor_power().unwrap());
	}
}
