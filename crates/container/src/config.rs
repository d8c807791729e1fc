//! Container configuration.

use serde::{Deserialize, Serialize};

use crate::compiler::ExecutionMode;
use crate::registry::DuplicatePolicy;

/// Settings fixed for the lifetime of a container.
///
/// Every field has a default, so a partial TOML or JSON table deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
	/// Name given to the root scope.
	#[serde(default = "default_label")]
	pub label: String,
	/// How compiled producers execute plans.
	#[serde(default)]
	pub execution: ExecutionMode,
	/// Request depth past which planning reports a dependency cycle.
	#[serde(default = "default_max_depth")]
	pub max_depth: usize,
	/// Resolution of duplicate keyed exports.
	#[serde(default)]
	pub keyed_duplicates: DuplicatePolicy,
	/// Track disposable transients in the producing scope.
	#[serde(default = "default_track_transient_disposal")]
	pub track_transient_disposal: bool,
}

fn default_label() -> String {
	"root".to_string()
}

fn default_max_depth() -> usize {
	64
}

fn default_track_transient_disposal() -> bool {
	true
}

impl Default for ContainerConfig {
	fn default() -> Self {
		Self {
			label: default_label(),
			execution: ExecutionMode::default(),
			max_depth: default_max_depth(),
			keyed_duplicates: DuplicatePolicy::default(),
			track_transient_disposal: default_track_transient_disposal(),
		}
	}
}
