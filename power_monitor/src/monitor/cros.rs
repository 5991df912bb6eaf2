use crate::device::{stdout, DeviceInterface};
use crate::monitor::{combine_results, PowerMonitor};
use crate::power_supply_info::{split_sample, PowerSupplyInfo};
use common::metrics::{BatteryStats, MonitoringResult};
use log::{debug, info, warn};
use std::cell::OnceCell;

const IDENTIFIER: &str = "power_supply_info";

/// Measures the battery power of a ChromeOS device through
/// `power_supply_info`.
///
/// The CPU statistics come from the wrapped generic monitor; this monitor only
/// adds the battery figures on top of them.
pub struct CrosPowerMonitor<D, M> {
	device: D,
	base: M,
	can_monitor_power: OnceCell<bool>,
}

/// State recorded by [`CrosPowerMonitor::start_monitoring_power`].
#[derive(Debug)]
pub struct CrosSession<S> {
	base: S,
	baseline: Option<Baseline>,
}

#[derive(Debug)]
struct Baseline {
	initial_power: PowerSupplyInfo,
	start_time: i64,
}

impl<S> CrosSession<S> {
	/// Whether a battery baseline was captured when the session started.
	pub fn has_baseline(&self) -> bool {
		self.baseline.is_some()
	}
}

impl<D: DeviceInterface, M: PowerMonitor> CrosPowerMonitor<D, M> {
	pub fn new(device: D, base: M) -> Self {
		Self {
			device,
			base,
			can_monitor_power: OnceCell::new(),
		}
	}

	pub fn device(&self) -> &D {
		&self.device
	}

	/// Checks whether the device currently runs on battery power.
	pub fn is_on_battery_power(&self) -> anyhow::Result<bool> {
		let status = self.device.run_cmd_on_device(&["power_supply_info"])?;
		let status = PowerSupplyInfo::parse(stdout(&status));
		if status.is_empty() {
			warn!("power_supply_info on {} returned no devices", self.device.name());
		}
		let board = self.device.get_board()?;

		let on_battery = is_on_battery_power(&status, &board)?;
		debug!("Board \"{board}\" on battery power: {on_battery}");
		Ok(on_battery)
	}

	fn sample_power(&self) -> anyhow::Result<(PowerSupplyInfo, i64)> {
		let sample = self
			.device
			.run_cmd_on_device(&["power_supply_info;", "date", "+%s"])?;
		let (power, time) = split_sample(stdout(&sample))?;

		Ok((PowerSupplyInfo::parse(&power), time))
	}
}

impl<D: DeviceInterface, M: PowerMonitor> PowerMonitor for CrosPowerMonitor<D, M> {
	type Session = CrosSession<M::Session>;

	fn can_monitor_power(&self) -> anyhow::Result<bool> {
		if let Some(can_monitor) = self.can_monitor_power.get() {
			return Ok(*can_monitor);
		}

		let can_monitor = self.base.can_monitor_power()?;
		Ok(*self.can_monitor_power.get_or_init(|| can_monitor))
	}

	fn start_monitoring_power(&self) -> anyhow::Result<Self::Session> {
		info!("Starting power monitoring on {}", self.device.name());
		let base = self.base.start_monitoring_power()?;

		let baseline = if self.is_on_battery_power()? {
			let (initial_power, start_time) = self.sample_power()?;
			info!("Captured battery baseline at {start_time}");
			Some(Baseline {
				initial_power,
				start_time,
			})
		} else {
			info!("Device is not on battery power, no battery baseline captured");
			None
		};

		Ok(CrosSession { base, baseline })
	}

	fn stop_monitoring_power(&self, session: Self::Session) -> anyhow::Result<MonitoringResult> {
		info!("Stopping power monitoring on {}", self.device.name());
		let cpu_stats = self.base.stop_monitoring_power(session.base)?;

		let power_stats = match (self.is_on_battery_power()?, session.baseline) {
			(true, Some(baseline)) => {
				let (final_power, end_time) = self.sample_power()?;
				// The length of the window is used to compute the energy consumption.
				let length_h = (end_time - baseline.start_time) as f64 / 3600.0;
				Some(parse_power(&baseline.initial_power, &final_power, length_h)?)
			}
			(true, None) => {
				warn!("Device switched to battery power during the measurement, omitting battery figures");
				None
			}
			(false, Some(_)) => {
				warn!("Device switched to AC power during the measurement, omitting battery figures");
				None
			}
			(false, None) => None,
		};

		Ok(combine_results(cpu_stats, power_stats))
	}
}

/// Determines whether a device runs on battery power from its parsed
/// `power_supply_info` output.
pub fn is_on_battery_power(status: &PowerSupplyInfo, board: &str) -> anyhow::Result<bool> {
	let mut on_battery = status.get("Line Power", "online")? == "no";
	// Butterfly can report AC as online for some time after unplugging.
	if board == "butterfly" {
		on_battery |= status.get("Battery", "state")? == "Discharging";
	}
	Ok(on_battery)
}

/// Computes power draw and energy consumption from the `power_supply_info`
/// output before and after a window of `length_h` hours.
///
/// The charge counter of the battery is too coarse for short windows, so the
/// energy is the average of both energy rates times the length of the window.
pub fn parse_power(
	initial: &PowerSupplyInfo,
	last: &PowerSupplyInfo,
	length_h: f64,
) -> anyhow::Result<MonitoringResult> {
	let initial_power_mw = initial.get_f64("Battery", "energy rate")? * 1000.0;
	let final_power_mw = last.get_f64("Battery", "energy rate")? * 1000.0;
	let average_power_mw = (initial_power_mw + final_power_mw) / 2.0;

	let mut result = MonitoringResult::new(IDENTIFIER);
	result.power_samples_mw = Some([initial_power_mw, final_power_mw]);
	result.energy_consumption_mwh = Some(average_power_mw * length_h);
	result.component_utilization.battery = Some(BatteryStats {
		charge_full: last.get_f64("Battery", "full charge")?,
		charge_full_design: last.get_f64("Battery", "full charge design")?,
		charge_now: last.get_f64("Battery", "charge")?,
		current_now: last.get_f64("Battery", "current")?,
		energy: last.get_f64("Battery", "energy")?,
		energy_rate: last.get_f64("Battery", "energy rate")?,
		voltage_now: last.get_f64("Battery", "voltage")?,
	});

	Ok(result)
}
