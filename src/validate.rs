use tracing::debug;

use crate::chart::ChartKind;
use crate::error::{Result, ShapeError};
use crate::ir::Classification;

/// Query shapes a chart kind can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeRequirement {
    /// Exactly one aggregate broken down by at least one facet.
    SingleAggregateFaceted,
    /// Exactly two aggregates, facets optional.
    DualAggregate,
    /// Two or three aggregates, or at least two raw attributes, with at most one facet.
    PointCloud,
    /// One aggregate, no facets, one data point.
    SingleValue,
}

pub const MAX_POINT_AGGREGATES: usize = 3;

impl ShapeRequirement {
    pub fn is_satisfied_by(self, c: &Classification) -> bool {
        let aggregates = c.unique_aggregates.len();
        let facets = c.unique_facets.len();

        match self {
            ShapeRequirement::SingleAggregateFaceted => aggregates == 1 && facets >= 1,
            ShapeRequirement::DualAggregate => aggregates == 2,
            ShapeRequirement::PointCloud => match aggregates {
                0 => c.unique_non_aggregates.len() >= 2 && facets <= 1,
                1 => false,
                n => n <= MAX_POINT_AGGREGATES && facets <= 1,
            },
            ShapeRequirement::SingleValue => aggregates == 1 && facets == 0 && c.point_count == 1,
        }
    }
}

pub fn is_valid(classification: &Classification, requirement: ShapeRequirement) -> bool {
    requirement.is_satisfied_by(classification)
}

/// Check a classification against a chart kind's requirement.
pub fn validate(classification: &Classification, kind: ChartKind) -> Result<()> {
    if is_valid(classification, kind.requirement()) {
        return Ok(());
    }

    debug!(
        chart = kind.name(),
        aggregates = classification.unique_aggregates.len(),
        facets = classification.unique_facets.len(),
        "query shape rejected"
    );

    Err(ShapeError::UnsupportedQueryShape {
        chart: kind.name().to_string(),
        description: kind.unsupported_description().to_string(),
    })
}
