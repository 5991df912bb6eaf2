mod local;
#[cfg(test)]
pub(crate) mod scripted;
mod ssh;

pub use local::LocalDevice;
pub use ssh::SshDevice;

use anyhow::anyhow;
use log::{debug, warn};
use regex::Regex;
use std::process::Output;
use std::sync::LazyLock;

static BOARD_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"BOARD=(.*)").expect("board regex should compile"));

/// A device commands can be run on.
pub trait DeviceInterface {
	/// Joins `args` with spaces, runs the result through a shell on the device
	/// and returns `[stdout, stderr]`.
	///
	/// A non-zero exit status is not an error; only failing to run the command
	/// at all is.
	fn run_cmd_on_device(&self, args: &[&str]) -> anyhow::Result<Vec<String>>;

	/// Human-readable name of the device, used in log messages.
	fn name(&self) -> String;

	/// Returns the board name from `/etc/lsb-release`.
	fn get_board(&self) -> anyhow::Result<String> {
		let lsb_release = self.run_cmd_on_device(&["cat", "/etc/lsb-release"])?;
		parse_board(stdout(&lsb_release))
	}
}

impl<D: DeviceInterface + ?Sized> DeviceInterface for &D {
	fn run_cmd_on_device(&self, args: &[&str]) -> anyhow::Result<Vec<String>> {
		(**self).run_cmd_on_device(args)
	}

	fn name(&self) -> String {
		(**self).name()
	}
}

/// Extracts the board name from the content of `/etc/lsb-release`.
pub fn parse_board(lsb_release: &str) -> anyhow::Result<String> {
	BOARD_RE
		.captures(lsb_release)
		.map(|captures| captures[1].to_string())
		.ok_or(anyhow!("No BOARD entry found in /etc/lsb-release"))
}

/// Index 0 of a `run_cmd_on_device` result.
pub fn stdout(output: &[String]) -> &str {
	output.first().map(String::as_str).unwrap_or_default()
}

fn collect_output(command: &str, output: Output) -> Vec<String> {
	if !output.status.success() {
		warn!("Command \"{command}\" exited with {}", output.status);
	}

	let stdout = String::from_utf8_lossy(&output.stdout).to_string();
	let stderr = String::from_utf8_lossy(&output.stderr).to_string();
	debug!("Command \"{command}\" returned stdout: {stdout:?}, stderr: {stderr:?}");

	vec![stdout, stderr]
}
