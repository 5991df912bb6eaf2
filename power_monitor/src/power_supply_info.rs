//! Parsing of the output of ChromeOS' `power_supply_info` command.
//!
//! The output consists of blocks like
//!
//! ```text
//! Device: Battery
//!   state:                   Discharging
//!   energy rate (W):         12.7849
//! ```
//!
//! Unit annotations such as `(W)` are dropped from the field names.

use anyhow::{anyhow, Context};
use regex::Regex;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

static DEVICE_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^Device:\s+(.*)").expect("device regex should compile"));
static FIELD_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\s+(.+):\s+(.+)").expect("field regex should compile"));
static UNIT_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(.*)\s+\(\w+\)").expect("unit regex should compile"));

/// Parsed `power_supply_info` output: device name -> field name -> value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerSupplyInfo {
	devices: HashMap<String, HashMap<String, String>>,
}

impl PowerSupplyInfo {
	pub fn parse(sample: &str) -> Self {
		let mut devices: HashMap<String, HashMap<String, String>> = HashMap::new();
		let mut device: Option<String> = None;

		for line in sample.lines() {
			if let Some(captures) = DEVICE_RE.captures(line) {
				device = Some(captures[1].trim().to_string()).filter(|name| !name.is_empty());
				continue;
			}

			let (Some(captures), Some(device)) = (FIELD_RE.captures(line), &device) else {
				continue;
			};
			let key = match UNIT_RE.captures(&captures[1]) {
				Some(unit) => unit[1].trim().to_string(),
				None => captures[1].trim().to_string(),
			};
			devices
				.entry(device.clone())
				.or_default()
				.insert(key, captures[2].trim().to_string());
		}

		Self { devices }
	}

	pub fn device(&self, device: &str) -> Option<&HashMap<String, String>> {
		self.devices.get(device)
	}

	pub fn get(&self, device: &str, field: &str) -> anyhow::Result<&str> {
		self.devices
			.get(device)
			.ok_or(anyhow!("power_supply_info has no device \"{device}\""))?
			.get(field)
			.map(String::as_str)
			.ok_or(anyhow!(
				"power_supply_info has no field \"{field}\" for device \"{device}\""
			))
	}

	pub fn get_f64(&self, device: &str, field: &str) -> anyhow::Result<f64> {
		let value = self.get(device, field)?;
		f64::from_str(value)
			.with_context(|| format!("\"{device}.{field}\" is not a number: \"{value}\""))
	}

	pub fn is_empty(&self) -> bool {
		self.devices.is_empty()
	}
}

/// Splits the output of `power_supply_info; date +%s` into the power report
/// and the epoch time at which it was taken.
pub fn split_sample(sample: &str) -> anyhow::Result<(String, i64)> {
	let sample = sample.trim();
	let (power, time) = match sample.rfind('\n') {
		Some(index) => (&sample[..index], &sample[index + 1..]),
		None => ("", sample),
	};
	let time = i64::from_str(time.trim())
		.with_context(|| format!("Sample does not end with an epoch time: \"{time}\""))?;

	Ok((power.to_string(), time))
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	pub(crate) const SAMPLE: &str = "Device: Line Power
  path:                    /sys/class/power_supply/AC
  online:                  no
  type:                    Mains
  enum type:               Disconnected
  model name:
  voltage (V):             0
  current (A):             0
Device: Battery
  path:                    /sys/class/power_supply/BAT0
  vendor:                  SANYO
  model name:              AP13J3K
  serial number:           0061
  state:                   Discharging
  voltage (V):             11.816
  energy (Wh):             31.8262
  energy rate (W):         12.7849
  current (A):             1.082
  charge (Ah):             2.6934
  full charge (Ah):        4.8262
  full charge design (Ah): 4.8262
  percentage:              55.8085
  display percentage:      57.9101
  technology:              Li-ion
";

	#[test]
	fn splits_at_last_newline() {
		let (power, time) = split_sample("A\nB\n12345").unwrap();

		assert_eq!(power, "A\nB");
		assert_eq!(time, 12345);
	}

	#[test]
	fn split_ignores_surrounding_whitespace() {
		let (power, time) = split_sample(&format!("{SAMPLE}1400000000\n")).unwrap();

		assert_eq!(power, SAMPLE.trim());
		assert_eq!(time, 1400000000);
	}

	#[test]
	fn split_fails_without_epoch_time() {
		assert!(split_sample("Device: Battery\n  state: Full").is_err());
		assert!(split_sample("").is_err());
	}

	#[test]
	fn unit_annotation_is_stripped() {
		let info = PowerSupplyInfo::parse("Device: Battery\n  energy rate (W): 5.0\n");

		let expected = HashMap::from([(
			"Battery".to_string(),
			HashMap::from([("energy rate".to_string(), "5.0".to_string())]),
		)]);
		assert_eq!(info.devices, expected);
	}

	#[test]
	fn parses_all_devices_of_sample() {
		let info = PowerSupplyInfo::parse(SAMPLE);

		assert_eq!(info.get("Line Power", "online").unwrap(), "no");
		assert_eq!(info.get("Line Power", "enum type").unwrap(), "Disconnected");
		assert!(info.get("Line Power", "model name").is_err());
		assert_eq!(info.get("Battery", "state").unwrap(), "Discharging");
		assert_eq!(info.get("Battery", "full charge design").unwrap(), "4.8262");
		assert_eq!(info.get_f64("Battery", "energy rate").unwrap(), 12.7849);
		assert_eq!(info.device("Line Power").unwrap().len(), 6);
		assert_eq!(info.device("Battery").unwrap().len(), 15);
	}

	#[test]
	fn fields_before_first_device_are_ignored() {
		let info = PowerSupplyInfo::parse("  orphan: value\nDevice: Battery\n  state: Full\n");

		assert_eq!(info.device("Battery").unwrap().len(), 1);
		assert_eq!(info.get("Battery", "state").unwrap(), "Full");
	}

	#[test]
	fn lines_without_field_are_ignored() {
		let info = PowerSupplyInfo::parse("Device: Battery\n  garbage\n\n  state:Full\n  vendor: X\n");

		assert_eq!(info.device("Battery").unwrap().len(), 1);
		assert_eq!(info.get("Battery", "vendor").unwrap(), "X");
	}

	#[test]
	fn device_without_fields_is_absent() {
		let info = PowerSupplyInfo::parse("Device: Line Power\nDevice: Battery\n  state: Full\n");

		assert!(info.device("Line Power").is_none());
		assert!(info.device("Battery").is_some());
	}

	#[test]
	fn duplicate_field_overwrites() {
		let info = PowerSupplyInfo::parse("Device: Battery\n  state: Charging\n  state: Full\n");

		assert_eq!(info.get("Battery", "state").unwrap(), "Full");
	}

	#[test]
	fn key_is_split_at_last_colon() {
		let info = PowerSupplyInfo::parse("Device: Battery\n  a: b: c\n");

		assert_eq!(info.get("Battery", "a: b").unwrap(), "c");
	}

	#[test]
	fn missing_field_is_an_error() {
		let info = PowerSupplyInfo::parse(SAMPLE);

		assert!(info.get("Battery", "temperature").is_err());
		assert!(info.get("USB", "online").is_err());
		assert!(info.get_f64("Battery", "state").is_err());
		assert!(PowerSupplyInfo::parse("").is_empty());
	}
}
