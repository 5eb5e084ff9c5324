// Library exports for facetshape

pub mod chart;
pub mod classify;
pub mod data;
pub mod error;
pub mod ir;
pub mod runtime;
pub mod scale;
pub mod transform;
pub mod truncate;
pub mod units;
pub mod validate;

use serde::{Deserialize, Serialize};

use crate::scale::TickDensity;

pub use crate::chart::ChartKind;
pub use crate::error::ShapeError;
pub use crate::ir::ChartOutcome;
pub use crate::runtime::build_chart;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Keep the "Other" facet bucket.
    #[serde(default = "default_show_other")]
    pub show_other: bool,
    #[serde(default)]
    pub y_axis_label: Option<String>,
    /// Dependent axis of bar charts, sized by the full height.
    #[serde(default)]
    pub y_tick_density: TickDensity,
    /// Value axes of range and scatter charts.
    #[serde(default = "default_inset_density")]
    pub inset_tick_density: TickDensity,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_show_other() -> bool { true }
fn default_inset_density() -> TickDensity { TickDensity::INSET }

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            show_other: true,
            y_axis_label: None,
            y_tick_density: TickDensity::FULL_HEIGHT,
            inset_tick_density: TickDensity::INSET,
        }
    }
}
