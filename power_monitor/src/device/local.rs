use crate::device::{collect_output, DeviceInterface};
use anyhow::Context;
use log::debug;
use std::process::Command;

/// Runs commands on the machine the monitor itself runs on.
#[derive(Debug, Default, Clone)]
pub struct LocalDevice;

impl DeviceInterface for LocalDevice {
	fn run_cmd_on_device(&self, args: &[&str]) -> anyhow::Result<Vec<String>> {
		let command = args.join(" ");
		debug!("Running \"{command}\" locally");

		let output = Command::new("sh")
			.arg("-c")
			.arg(&command)
			.output()
			.with_context(|| format!("Failed to run \"{command}\""))?;

		Ok(collect_output(&command, output))
	}

	fn name(&self) -> String {
		"localhost".to_string()
	}
}
