use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ir::{AxisTickSpec, AxisValue, Series, Tick};
use crate::truncate::truncate_label;
use crate::units::{format_tick, UnitType};

/// Upper bound on ticks per axis, whatever the pixel extent.
pub const MAX_TICK_COUNT: usize = 1000;

/// Pixels budgeted per tick along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickDensity {
    pub pixels_per_tick: f64,
    /// Pixels of the extent taken by chart margins.
    #[serde(default)]
    pub margin: f64,
}

impl TickDensity {
    /// Axes sized by the full chart height.
    pub const FULL_HEIGHT: TickDensity = TickDensity {
        pixels_per_tick: 36.0,
        margin: 0.0,
    };

    /// Axes sized by the chart extent minus its margins.
    pub const INSET: TickDensity = TickDensity {
        pixels_per_tick: 70.0,
        margin: 50.0,
    };

    pub fn tick_count(&self, pixel_extent: f64) -> usize {
        if self.pixels_per_tick <= 0.0 || !pixel_extent.is_finite() {
            return 0;
        }
        let count = ((pixel_extent - self.margin) / self.pixels_per_tick).round().max(0.0) as usize;
        count.min(MAX_TICK_COUNT)
    }
}

impl Default for TickDensity {
    fn default() -> Self {
        Self::FULL_HEIGHT
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    /// Range of the finite values, `[0, 1]` when there are none.
    pub fn of(values: &[f64]) -> Self {
        let (min, max) = values
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        if min == f64::INFINITY {
            MinMax { min: 0.0, max: 1.0 }
        } else {
            MinMax { min, max }
        }
    }

    /// Bar charts always include 0.
    pub fn including_zero(self) -> Self {
        MinMax {
            min: self.min.min(0.0),
            max: self.max.max(0.0),
        }
    }
}

/// Derive tick count, spacing and labels for a numeric axis.
pub fn derive_ticks(values: &[f64], pixel_extent: f64, unit: UnitType, density: TickDensity) -> AxisTickSpec {
    derive_ticks_in(MinMax::of(values), pixel_extent, unit, density)
}

pub fn derive_ticks_in(domain: MinMax, pixel_extent: f64, unit: UnitType, density: TickDensity) -> AxisTickSpec {
    let tick_count = density.tick_count(pixel_extent);
    let tick_increment = if tick_count == 0 {
        None
    } else {
        Some((domain.max - domain.min) / tick_count as f64).filter(|inc| *inc > 0.0)
    };

    let values: Vec<f64> = match tick_increment {
        Some(inc) => (0..=tick_count).map(|i| domain.min + inc * i as f64).collect(),
        None if domain.min == domain.max => vec![domain.min],
        None => vec![domain.min, domain.max],
    };

    let ticks = values
        .into_iter()
        .map(|v| Tick {
            value: AxisValue::Number(v),
            label: format_tick(v, unit, tick_increment),
        })
        .collect();

    AxisTickSpec {
        label: String::new(),
        tick_count,
        tick_increment,
        domain: Some((domain.min, domain.max)),
        unit,
        ticks,
    }
}

/// Categorical axis over bar labels. With a single facet the axis is named
/// after it and tick labels are blank; otherwise labels are truncated to the
/// width each bar gets.
pub fn category_axis<I>(labels: I, domain_width: f64, single_facet_name: Option<&str>) -> AxisTickSpec
where
    I: IntoIterator<Item = String>,
{
    let labels: Vec<String> = labels.into_iter().collect();
    let max_width = domain_width / labels.len().max(1) as f64;

    let ticks = labels
        .into_iter()
        .map(|l| {
            let label = match single_facet_name {
                Some(_) => String::new(),
                None => truncate_label(&l, max_width),
            };
            Tick {
                value: AxisValue::Category(l),
                label,
            }
        })
        .collect::<Vec<_>>();

    AxisTickSpec {
        label: single_facet_name.unwrap_or_default().to_string(),
        tick_count: ticks.len(),
        tick_increment: None,
        domain: None,
        unit: UnitType::Unknown,
        ticks,
    }
}

/// Height of each stacked bar.
pub fn stack_totals(series: &Series) -> IndexMap<String, f64> {
    let mut totals: IndexMap<String, f64> = IndexMap::new();
    for point in series.iter().flatten() {
        if let Some(key) = point.x.as_category() {
            *totals.entry(key.to_string()).or_insert(0.0) += point.y;
        }
    }
    totals
}

/// Every y (and y0) value in the series.
pub fn y_values(series: &Series) -> Vec<f64> {
    series
        .iter()
        .flatten()
        .flat_map(|p| std::iter::once(p.y).chain(p.y0))
        .collect()
}

pub fn x_values(series: &Series) -> Vec<f64> {
    series.iter().flatten().filter_map(|p| p.x.as_number()).collect()
}
