use crate::monitor::PowerMonitor;
use common::metrics::{CpuStats, MonitoringResult};
use log::{debug, info};
use sysinfo::{CpuRefreshKind, RefreshKind, System};

/// Generic monitor reporting the CPU utilization of the host the monitor runs
/// on.
///
/// Usage is measured by `sysinfo` between the refresh at the start of the
/// window and the one at its end.
#[derive(Debug, Default)]
pub struct HostCpuMonitor;

pub struct HostCpuSession {
	system: System,
}

impl HostCpuMonitor {
	const IDENTIFIER: &'static str = "sysinfo";

	pub fn new() -> Self {
		Self
	}

	fn cpu_refresh_kind() -> CpuRefreshKind {
		CpuRefreshKind::nothing().with_cpu_usage()
	}
}

impl PowerMonitor for HostCpuMonitor {
	type Session = HostCpuSession;

	fn can_monitor_power(&self) -> anyhow::Result<bool> {
		let system =
			System::new_with_specifics(RefreshKind::nothing().with_cpu(Self::cpu_refresh_kind()));
		Ok(!system.cpus().is_empty())
	}

	fn start_monitoring_power(&self) -> anyhow::Result<Self::Session> {
		info!("Getting host CPU info");
		let system =
			System::new_with_specifics(RefreshKind::nothing().with_cpu(Self::cpu_refresh_kind()));

		Ok(HostCpuSession { system })
	}

	fn stop_monitoring_power(&self, session: Self::Session) -> anyhow::Result<MonitoringResult> {
		let mut system = session.system;
		system.refresh_cpu_specifics(Self::cpu_refresh_kind());

		let per_cpu_percent: Vec<f64> = system
			.cpus()
			.iter()
			.map(|c| c.cpu_usage() as f64)
			.collect();
		let usage_percent = if per_cpu_percent.is_empty() {
			0.0
		} else {
			per_cpu_percent.iter().sum::<f64>() / per_cpu_percent.len() as f64
		};
		debug!("Host CPU usage: {usage_percent}% {per_cpu_percent:?}");

		let mut result = MonitoringResult::new(Self::IDENTIFIER);
		result.component_utilization.cpu = Some(CpuStats {
			usage_percent,
			per_cpu_percent,
		});

		Ok(result)
	}
}
