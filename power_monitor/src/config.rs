use crate::device::{DeviceInterface, LocalDevice, SshDevice};
use anyhow::{bail, Context};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MonitorConfig {
	#[serde(default)]
	pub device: DeviceConfig,
	#[serde(default)]
	pub cpu: CpuConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
	#[serde(default)]
	pub transport: Transport,
	pub host: Option<String>,
	#[serde(default = "DeviceConfig::default_user")]
	pub user: String,
	#[serde(default = "DeviceConfig::default_port")]
	pub port: u16,
	pub identity_file: Option<PathBuf>,
	#[serde(default)]
	pub ssh_options: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
	#[default]
	Local,
	Ssh,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CpuConfig {
	#[serde(default)]
	pub source: CpuSource,
}

/// Where the CPU statistics reported next to the battery figures come from.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CpuSource {
	/// `/proc/stat` of the measured device
	#[default]
	Device,
	/// the host running the monitor
	Host,
}

impl Default for DeviceConfig {
	fn default() -> Self {
		Self {
			transport: Transport::default(),
			host: None,
			user: Self::default_user(),
			port: Self::default_port(),
			identity_file: None,
			ssh_options: Vec::new(),
		}
	}
}

impl DeviceConfig {
	fn default_user() -> String {
		"root".to_string()
	}

	fn default_port() -> u16 {
		22
	}
}

impl MonitorConfig {
	pub fn read_config(path: impl AsRef<Path>) -> anyhow::Result<Self> {
		let path = path.as_ref();
		let config = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file {path:?}"))?;

		Self::from_toml(&config).with_context(|| format!("Invalid config file {path:?}"))
	}

	pub fn from_toml(config: &str) -> anyhow::Result<Self> {
		Ok(toml::from_str(config)?)
	}

	/// Points the config at a remote host reached over SSH.
	pub fn with_host(mut self, host: &str) -> Self {
		self.device.transport = Transport::Ssh;
		self.device.host = Some(host.to_string());
		self
	}

	pub fn create_device(&self) -> anyhow::Result<Box<dyn DeviceInterface>> {
		let device = &self.device;
		Ok(match device.transport {
			Transport::Local => Box::new(LocalDevice),
			Transport::Ssh => {
				let Some(host) = &device.host else {
					bail!("SSH transport requires a host");
				};
				Box::new(SshDevice::new(
					host,
					&device.user,
					device.port,
					device.identity_file.clone(),
					device.ssh_options.clone(),
				))
			}
		})
	}
}
