use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::transform::{ChartShapeConfig, SeriesLayout};
use crate::validate::ShapeRequirement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    StackedBar,
    MultiFacetBar,
    Range,
    Scatter,
    Progress,
}

impl ChartKind {
    pub fn name(self) -> &'static str {
        match self {
            ChartKind::StackedBar => "stacked-bar",
            ChartKind::MultiFacetBar => "multi-facet-bar",
            ChartKind::Range => "range",
            ChartKind::Scatter => "scatter",
            ChartKind::Progress => "progress",
        }
    }

    pub fn requirement(self) -> ShapeRequirement {
        match self {
            ChartKind::StackedBar | ChartKind::MultiFacetBar => ShapeRequirement::SingleAggregateFaceted,
            ChartKind::Range => ShapeRequirement::DualAggregate,
            ChartKind::Scatter => ShapeRequirement::PointCloud,
            ChartKind::Progress => ShapeRequirement::SingleValue,
        }
    }

    pub fn shape_config(self) -> ChartShapeConfig {
        match self {
            ChartKind::StackedBar => ChartShapeConfig::new(SeriesLayout::Segmented).stack_facets(true),
            ChartKind::MultiFacetBar => ChartShapeConfig::new(SeriesLayout::Segmented),
            ChartKind::Range => ChartShapeConfig::new(SeriesLayout::Range),
            ChartKind::Scatter => ChartShapeConfig::new(SeriesLayout::Points)
                .numeric_axes(2)
                .size_from_third_aggregate(true),
            ChartKind::Progress => ChartShapeConfig::new(SeriesLayout::Gauge).numeric_axes(0),
        }
    }

    pub fn unsupported_description(self) -> &'static str {
        match self {
            ChartKind::StackedBar | ChartKind::MultiFacetBar => {
                "The provided NRQL query is not supported by this visualization. Please make sure to have exactly 1 aggregate function in the SELECT clause and at least one FACET clause."
            }
            ChartKind::Range => {
                "The provided NRQL query is not supported by this visualization. Please make sure to have 2 aggregate functions and 1 facet."
            }
            ChartKind::Scatter => {
                "The provided NRQL query is not supported by this visualization. This chart supports non-aggregate and aggregate queries with an optional FACET clause. Please make sure to have 2-3 aggregate functions in the SELECT clause if it is an aggregate query."
            }
            ChartKind::Progress => {
                "The provided NRQL query is not supported by this visualization. Please make sure to have a single aggregate function with no FACET or TIMESERIES clause."
            }
        }
    }
}
