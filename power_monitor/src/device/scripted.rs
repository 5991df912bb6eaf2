use crate::device::DeviceInterface;
use anyhow::anyhow;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

/// In-memory device answering commands from a script.
///
/// Responses registered for the same command are handed out in order; the
/// last one keeps being returned once the others are used up.
#[derive(Debug, Default)]
pub struct ScriptedDevice {
	responses: RefCell<HashMap<String, VecDeque<String>>>,
	calls: RefCell<Vec<String>>,
}

impl ScriptedDevice {
	pub fn new() -> Self {
		Default::default()
	}

	pub fn respond(self, command: &str, stdout: &str) -> Self {
		self.responses
			.borrow_mut()
			.entry(command.to_string())
			.or_default()
			.push_back(stdout.to_string());
		self
	}

	pub fn calls(&self) -> Vec<String> {
		self.calls.borrow().clone()
	}
}

impl DeviceInterface for ScriptedDevice {
	fn run_cmd_on_device(&self, args: &[&str]) -> anyhow::Result<Vec<String>> {
		let command = args.join(" ");
		self.calls.borrow_mut().push(command.clone());

		let mut responses = self.responses.borrow_mut();
		let queue = responses
			.get_mut(&command)
			.ok_or(anyhow!("Unexpected command \"{command}\""))?;
		let stdout = match queue.len() {
			0 => return Err(anyhow!("No response left for \"{command}\"")),
			1 => queue[0].clone(),
			_ => queue.pop_front().unwrap_or_default(),
		};

		Ok(vec![stdout, String::new()])
	}

	fn name(&self) -> String {
		"scripted".to_string()
	}
}
