use clap::ValueEnum;
use common::metrics::MonitoringResult;
use csv::WriterBuilder;
use log::{debug, info};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
	#[default]
	Json,
	Csv,
}

/// Writes monitoring results to stdout or a file.
pub struct ResultWriter<W: Write> {
	out: W,
	format: OutputFormat,
}

impl ResultWriter<Box<dyn Write>> {
	/// Creates a writer for `path`, or for stdout when no path is given.
	pub fn new(path: Option<&Path>, format: OutputFormat) -> Result<Self, std::io::Error> {
		let out: Box<dyn Write> = match path {
			Some(path) => {
				info!("Writing results to {path:?}");
				Box::new(
					OpenOptions::new()
						.write(true)
						.create(true)
						.truncate(true)
						.open(path)?,
				)
			}
			None => Box::new(std::io::stdout()),
		};

		Ok(Self::from_writer(out, format))
	}
}

impl<W: Write> ResultWriter<W> {
	pub fn from_writer(out: W, format: OutputFormat) -> Self {
		Self { out, format }
	}

	pub fn write(&mut self, result: &MonitoringResult) -> anyhow::Result<()> {
		debug!("Writing result as {:?}", self.format);
		match self.format {
			OutputFormat::Json => {
				serde_json::to_writer_pretty(&mut self.out, result)?;
				self.out.write_all(b"\n")?;
			}
			OutputFormat::Csv => self.write_csv(result)?,
		}
		self.out.flush()?;

		Ok(())
	}

	pub fn into_inner(self) -> W {
		self.out
	}

	fn write_csv(&mut self, result: &MonitoringResult) -> anyhow::Result<()> {
		fn field(value: Option<f64>) -> String {
			value.map(|v| v.to_string()).unwrap_or_default()
		}

		let mut writer = WriterBuilder::new().delimiter(b';').from_writer(&mut self.out);
		writer.write_record([
			"identifier",
			"initial_power_mw",
			"final_power_mw",
			"energy_consumption_mwh",
			"charge_full",
			"charge_full_design",
			"charge_now",
			"current_now",
			"energy",
			"energy_rate",
			"voltage_now",
			"cpu_usage_percent",
		])?;

		let samples = result.power_samples_mw;
		let battery = result.component_utilization.battery.as_ref();
		writer.write_record(&[
			result.identifier.clone(),
			field(samples.map(|s| s[0])),
			field(samples.map(|s| s[1])),
			field(result.energy_consumption_mwh),
			field(battery.map(|b| b.charge_full)),
			field(battery.map(|b| b.charge_full_design)),
			field(battery.map(|b| b.charge_now)),
			field(battery.map(|b| b.current_now)),
			field(battery.map(|b| b.energy)),
			field(battery.map(|b| b.energy_rate)),
			field(battery.map(|b| b.voltage_now)),
			field(
				result
					.component_utilization
					.cpu
					.as_ref()
					.map(|c| c.usage_percent),
			),
		])?;
		writer.flush()?;

		Ok(())
	}
}
