mod cros;
mod host_cpu;
mod proc_stat;

pub use cros::{is_on_battery_power, parse_power, CrosPowerMonitor, CrosSession};
pub use host_cpu::{HostCpuMonitor, HostCpuSession};
pub use proc_stat::{ProcStatMonitor, ProcStatSession};

use common::metrics::MonitoringResult;

/// Something that can measure a device over a window delimited by
/// `start_monitoring_power` and `stop_monitoring_power`.
///
/// The state recorded at the start of the window lives in the returned
/// session, which has to be handed back when stopping.
pub trait PowerMonitor {
	type Session;

	fn can_monitor_power(&self) -> anyhow::Result<bool>;

	fn start_monitoring_power(&self) -> anyhow::Result<Self::Session>;

	fn stop_monitoring_power(&self, session: Self::Session) -> anyhow::Result<MonitoringResult>;
}

/// Merges the CPU statistics of a generic monitor into a power result.
///
/// Without a power result the CPU result is returned as is.
pub fn combine_results(
	cpu_stats: MonitoringResult,
	power_stats: Option<MonitoringResult>,
) -> MonitoringResult {
	let Some(mut power_stats) = power_stats else {
		return cpu_stats;
	};

	if power_stats.component_utilization.cpu.is_none() {
		power_stats.component_utilization.cpu = cpu_stats.component_utilization.cpu;
	}
	power_stats
}
