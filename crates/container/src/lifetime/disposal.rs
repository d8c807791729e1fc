use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{DisposalError, DisposalFailure};
use crate::strategy::Disposer;
use crate::types::{Instance, TypeKey};

struct Tracked {
	ty: TypeKey,
	instance: Instance,
	disposer: Disposer,
}

/// Instances awaiting disposal, in registration order.
#[derive(Default)]
pub(crate) struct DisposalList {
	items: Mutex<Vec<Tracked>>,
}

impl DisposalList {
	pub(crate) fn track(&self, ty: &TypeKey, instance: &Instance, disposer: &Disposer) {
		self.items.lock().push(Tracked {
			ty: ty.clone(),
			instance: Arc::clone(instance),
			disposer: Arc::clone(disposer),
		});
	}

	pub(crate) fn len(&self) -> usize {
		self.items.lock().len()
	}

	/// Disposes every tracked instance, most recent first.
	///
	/// A failing disposer does not stop the rest; failures are reported together. Returns
	/// the number of instances disposed.
	pub(crate) fn dispose_all(&self) -> Result<usize, DisposalError> {
		let items = std::mem::take(&mut *self.items.lock());
		let count = items.len();
		let mut failures = Vec::new();

		for tracked in items.into_iter().rev() {
			if let Err(err) = (tracked.disposer)(&tracked.instance) {
				tracing::warn!(ty = %tracked.ty, error = %err, "disposer failed");
				failures.push(DisposalFailure {
					ty: tracked.ty,
					source: Arc::from(err),
				});
			}
		}

		if failures.is_empty() { Ok(count) } else { Err(DisposalError { failures }) }
	}
}
