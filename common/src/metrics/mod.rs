use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Result of one measurement window, as handed back to the caller of
/// `stop_monitoring_power`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringResult {
	pub identifier: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub power_samples_mw: Option<[f64; 2]>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub energy_consumption_mwh: Option<f64>,
	#[serde(default)]
	pub component_utilization: ComponentUtilization,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentUtilization {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub battery: Option<BatteryStats>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cpu: Option<CpuStats>,
}

/// Battery fields named after the kernel's power_supply sysfs attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryStats {
	pub charge_full: f64,
	pub charge_full_design: f64,
	pub charge_now: f64,
	pub current_now: f64,
	pub energy: f64,
	pub energy_rate: f64,
	pub voltage_now: f64,
}

/// CPU busy time over the measurement window in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuStats {
	pub usage_percent: f64,
	pub per_cpu_percent: Vec<f64>,
}

impl MonitoringResult {
	pub fn new(identifier: &str) -> Self {
		Self {
			identifier: identifier.to_string(),
			..Default::default()
		}
	}
}

impl FromStr for MonitoringResult {
	type Err = serde_json::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		serde_json::from_str(s)
	}
}
