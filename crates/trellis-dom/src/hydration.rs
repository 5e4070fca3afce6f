//! Hydration strategy selection.
//!
//! A root picks its strategy the first time it hydrates and keeps it for
//! the rest of its lifetime.

use std::fmt;
use std::sync::Arc;
use trellis_core::hydration::{DeviceSignals, HydrationStrategy, NetworkClass};

/// Host-supplied strategy selector.
pub type StrategySelector = dyn Fn(&DeviceSignals) -> HydrationStrategy + Send + Sync;

/// How a root chooses its hydration strategy.
#[derive(Clone)]
pub enum HydrationConfig {
	Fixed(HydrationStrategy),
	Select(Arc<StrategySelector>),
	/// Built-in selector, see [`adaptive_strategy`].
	Adaptive,
}

impl Default for HydrationConfig {
	fn default() -> Self {
		HydrationConfig::Fixed(HydrationStrategy::Full)
	}
}

impl From<HydrationStrategy> for HydrationConfig {
	fn from(strategy: HydrationStrategy) -> Self {
		HydrationConfig::Fixed(strategy)
	}
}

impl fmt::Debug for HydrationConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			HydrationConfig::Fixed(strategy) => f.debug_tuple("Fixed").field(strategy).finish(),
			HydrationConfig::Select(_) => f.write_str("Select(..)"),
			HydrationConfig::Adaptive => f.write_str("Adaptive"),
		}
	}
}

impl HydrationConfig {
	/// Wraps a selector function.
	pub fn select<F>(selector: F) -> Self
	where
		F: Fn(&DeviceSignals) -> HydrationStrategy + Send + Sync + 'static,
	{
		HydrationConfig::Select(Arc::new(selector))
	}

	/// Resolves the strategy for `signals`.
	pub fn choose(&self, signals: &DeviceSignals) -> HydrationStrategy {
		match self {
			HydrationConfig::Fixed(strategy) => *strategy,
			HydrationConfig::Select(selector) => selector(signals),
			HydrationConfig::Adaptive => adaptive_strategy(signals),
		}
	}
}

/// Picks the cheapest upfront strategy the device can afford.
pub fn adaptive_strategy(signals: &DeviceSignals) -> HydrationStrategy {
	if signals.is_low_powered_device {
		return HydrationStrategy::Resumable;
	}
	match signals.effective_network_class {
		NetworkClass::Slow2g | NetworkClass::TwoG => HydrationStrategy::Progressive,
		NetworkClass::ThreeG => HydrationStrategy::Selective,
		NetworkClass::FourG => HydrationStrategy::Full,
	}
}
