use crate::device::{collect_output, DeviceInterface};
use anyhow::Context;
use log::debug;
use std::path::PathBuf;
use std::process::Command;

/// Runs commands on a remote device over `ssh`.
#[derive(Debug, Clone)]
pub struct SshDevice {
	host: String,
	user: String,
	port: u16,
	identity_file: Option<PathBuf>,
	options: Vec<String>,
}

impl SshDevice {
	pub fn new(
		host: &str,
		user: &str,
		port: u16,
		identity_file: Option<PathBuf>,
		options: Vec<String>,
	) -> Self {
		Self {
			host: host.to_string(),
			user: user.to_string(),
			port,
			identity_file,
			options,
		}
	}

	fn ssh_args(&self, command: &str) -> Vec<String> {
		let mut args = vec![
			"-o".to_string(),
			"BatchMode=yes".to_string(),
			"-p".to_string(),
			self.port.to_string(),
		];
		if let Some(identity_file) = &self.identity_file {
			args.push("-i".to_string());
			args.push(identity_file.to_string_lossy().to_string());
		}
		for option in &self.options {
			args.push("-o".to_string());
			args.push(option.clone());
		}
		args.push(format!("{}@{}", self.user, self.host));
		args.push(command.to_string());

		args
	}
}

impl DeviceInterface for SshDevice {
	fn run_cmd_on_device(&self, args: &[&str]) -> anyhow::Result<Vec<String>> {
		let command = args.join(" ");
		let ssh_args = self.ssh_args(&command);
		debug!("Running ssh {ssh_args:?}");

		let output = Command::new("ssh")
			.args(&ssh_args)
			.output()
			.with_context(|| format!("Failed to run \"{command}\" on {}", self.name()))?;

		Ok(collect_output(&command, output))
	}

	fn name(&self) -> String {
		format!("{}@{}:{}", self.user, self.host, self.port)
	}
}
