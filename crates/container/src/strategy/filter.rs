use std::fmt;
use std::sync::Arc;

use super::{MetadataValue, Strategy};
use crate::types::TypeKey;

/// Shared predicate over strategies, used to filter and to prioritize collections.
#[derive(Clone)]
pub struct StrategyFilter(Arc<dyn Fn(&Strategy) -> bool + Send + Sync>);

impl StrategyFilter {
	pub fn new<F>(predicate: F) -> Self
	where
		F: Fn(&Strategy) -> bool + Send + Sync + 'static,
	{
		Self(Arc::new(predicate))
	}

	#[inline]
	pub fn matches(&self, strategy: &Strategy) -> bool {
		(self.0)(strategy)
	}

	pub fn has_metadata(key: impl Into<Arc<str>>) -> Self {
		let key = key.into();
		Self::new(move |s| s.metadata(&key).is_some())
	}

	pub fn has_metadata_value(key: impl Into<Arc<str>>, value: impl Into<MetadataValue>) -> Self {
		let key = key.into();
		let value = value.into();
		Self::new(move |s| s.metadata(&key) == Some(&value))
	}

	pub fn activation_type_is(ty: TypeKey) -> Self {
		Self::new(move |s| s.activation_type() == &ty)
	}

	pub fn activation_name_ends_with(suffix: impl Into<Arc<str>>) -> Self {
		let suffix = suffix.into();
		Self::new(move |s| s.activation_type().to_string().ends_with(&*suffix))
	}

	pub fn and(self, other: Self) -> Self {
		Self::new(move |s| self.matches(s) && other.matches(s))
	}

	pub fn or(self, other: Self) -> Self {
		Self::new(move |s| self.matches(s) || other.matches(s))
	}

	#[allow(clippy::should_implement_trait)]
	pub fn not(self) -> Self {
		Self::new(move |s| !self.matches(s))
	}
}

impl fmt::Debug for StrategyFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("StrategyFilter(..)")
	}
}
