use indexmap::IndexSet;
use serde::Serialize;

use crate::units::UnitType;

// =============================================================================
// Phase 1: Classification
// =============================================================================

/// Aggregate/facet/attribute shape of one result set.
///
/// Set equality ignores insertion order; iteration follows first appearance,
/// which for aggregates is SELECT clause order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub unique_aggregates: IndexSet<String>,
    pub unique_facets: IndexSet<String>,
    pub unique_non_aggregates: IndexSet<String>,
    pub row_count: usize,
    pub point_count: usize,
}

impl Classification {
    /// Position of an aggregate in SELECT order.
    pub fn aggregate_slot(&self, display_name: &str) -> Option<usize> {
        self.unique_aggregates.get_index_of(display_name)
    }
}

// =============================================================================
// Phase 2: Reshaping
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AxisValue {
    Category(String),
    Number(f64),
}

impl AxisValue {
    pub fn as_category(&self) -> Option<&str> {
        match self {
            AxisValue::Category(s) => Some(s),
            AxisValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AxisValue::Number(n) => Some(*n),
            AxisValue::Category(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub x: AxisValue,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y0: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    pub color: Option<String>,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_label: Option<String>,
}

/// Outer sequence per segment, inner sequence per bar or point.
pub type Series = Vec<Vec<SeriesPoint>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendItem {
    pub label: String,
    pub color: Option<String>,
}

// =============================================================================
// Phase 3: Scaling
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub value: AxisValue,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisTickSpec {
    pub label: String,
    pub tick_count: usize,
    pub tick_increment: Option<f64>,
    /// `None` for categorical axes.
    pub domain: Option<(f64, f64)>,
    pub unit: UnitType,
    pub ticks: Vec<Tick>,
}

impl AxisTickSpec {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Tick formatter for values not in `ticks`.
    pub fn format(&self, value: f64) -> String {
        crate::units::format_tick(value, self.unit, self.tick_increment)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AxisSpecs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<AxisTickSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<AxisTickSpec>,
}

impl AxisSpecs {
    pub fn axes(&self) -> impl Iterator<Item = &AxisTickSpec> {
        self.x.iter().chain(self.y.iter())
    }
}

// =============================================================================
// Phase 4: Outcome
// =============================================================================

/// What the rendering collaborator receives for one delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ChartOutcome {
    Loading,
    Error {
        message: String,
    },
    InvalidInput {
        title: String,
        description: String,
    },
    Empty,
    #[serde(rename_all = "camelCase")]
    Ready {
        series: Series,
        legend: Vec<LegendItem>,
        axis_specs: AxisSpecs,
    },
}
