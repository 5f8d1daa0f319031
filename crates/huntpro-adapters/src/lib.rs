// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in device adapters for Hunt Pro.
//!
//! Each adapter checks the Bluetooth link (signal strength and advertised
//! services) before validating its category-specific metadata. Thresholds come
//! from the `[adapters.*]` configuration sections.

pub mod bluetooth;
pub mod rangefinder;
pub mod shot_timer;
pub mod weather;

use std::sync::Arc;

use huntpro_config::AdaptersConfig;
use huntpro_core::DeviceAdapter;
use serde_json::{Map, Value};

pub use bluetooth::{BluetoothDetails, BluetoothLink};
pub use rangefinder::RangefinderAdapter;
pub use shot_timer::ShotTimerAdapter;
pub use weather::WeatherMeterAdapter;

/// The default adapter set, one per built-in device type.
pub fn builtin_adapters(config: &AdaptersConfig) -> Vec<Arc<dyn DeviceAdapter>> {
    vec![
        Arc::new(RangefinderAdapter::new(&config.rangefinder)),
        Arc::new(WeatherMeterAdapter::new(&config.weather_meter)),
        Arc::new(ShotTimerAdapter::new(&config.shot_timer)),
    ]
}

/// Loose truthiness for flag-like metadata values.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

pub(crate) fn set_default(metadata: &mut Map<String, Value>, key: &str, value: impl Into<Value>) {
    metadata.entry(key).or_insert_with(|| value.into());
}
