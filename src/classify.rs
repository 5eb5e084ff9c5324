use indexmap::IndexSet;
use tracing::debug;

use crate::data::{GroupDescriptor, QueryResultRow};
use crate::error::{Result, ShapeError};
use crate::ir::Classification;

/// Keys the query service injects into `units_data` for every result.
pub const INJECTED_UNIT_KEYS: [&str; 5] = ["begin_time", "end_time", "x", "y", "timestamp"];

/// Function tag TIMESERIES queries attach to bucketed rows.
pub const SERIES_MARKER: &str = "series";

#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    count_series_marker: bool,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the TIMESERIES bucket marker as an aggregate.
    pub fn count_series_marker(mut self, count: bool) -> Self {
        self.count_series_marker = count;
        self
    }

    pub fn classify(&self, rows: &[QueryResultRow]) -> Result<Classification> {
        if rows.is_empty() {
            return Err(ShapeError::EmptyResult);
        }

        let mut unique_aggregates = IndexSet::new();
        let mut unique_facets = IndexSet::new();
        let mut group_values = IndexSet::new();
        let mut unit_keys = IndexSet::new();
        let mut point_count = 0;

        for row in rows {
            for group in row.groups()? {
                group_values.insert(group.value_label());
                if group.is_function() && (self.count_series_marker || !is_series_marker(group)) {
                    unique_aggregates.insert(group.display_name.clone());
                } else if group.is_facet() {
                    unique_facets.insert(group.display_name.clone());
                }
            }
            if let Some(units) = row.units() {
                unit_keys.extend(units.keys().cloned());
            }
            point_count += row.data.len();
        }

        let unique_non_aggregates: IndexSet<String> = unit_keys
            .into_iter()
            .filter(|key| !INJECTED_UNIT_KEYS.contains(&key.as_str()))
            .filter(|key| !group_values.contains(key))
            .collect();

        let classification = Classification {
            unique_aggregates,
            unique_facets,
            unique_non_aggregates,
            row_count: rows.len(),
            point_count,
        };

        debug!(
            aggregates = classification.unique_aggregates.len(),
            facets = classification.unique_facets.len(),
            non_aggregates = classification.unique_non_aggregates.len(),
            rows = classification.row_count,
            "classified query result"
        );

        Ok(classification)
    }
}

/// Classify with the default classifier (series marker excluded).
pub fn classify(rows: &[QueryResultRow]) -> Result<Classification> {
    Classifier::default().classify(rows)
}

pub fn is_series_marker(group: &GroupDescriptor) -> bool {
    group.is_function() && (group.display_name == SERIES_MARKER || group.value_label() == SERIES_MARKER)
}

/// First aggregate tag on a row, skipping the series marker.
pub fn function_group(groups: &[GroupDescriptor]) -> Option<&GroupDescriptor> {
    groups.iter().find(|g| g.is_function() && !is_series_marker(g))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataPoint, GroupDescriptor, Metadata};
    use crate::units::UnitType;
    use indexmap::IndexMap;

    fn row(groups: Vec<GroupDescriptor>) -> QueryResultRow {
        QueryResultRow::aggregate(1.0, "#fff", groups)
    }

    #[test]
    fn test_classify_aggregate_and_facet() {
        let rows = vec![
            row(vec![
                GroupDescriptor::function("average", "average(duration)"),
                GroupDescriptor::facet("prod", "environment"),
            ]),
            row(vec![
                GroupDescriptor::function("average", "average(duration)"),
                GroupDescriptor::facet("staging", "environment"),
            ]),
        ];
        let c = classify(&rows).unwrap();
        assert_eq!(c.unique_aggregates, IndexSet::from(["average(duration)".to_string()]));
        assert_eq!(c.unique_facets, IndexSet::from(["environment".to_string()]));
        assert_eq!(c.row_count, 2);
        assert_eq!(c.point_count, 2);
    }

    #[test]
    fn test_aggregate_slots_follow_first_appearance() {
        let rows = vec![
            row(vec![GroupDescriptor::function("percentile", "p50"), GroupDescriptor::facet("a", "app")]),
            row(vec![GroupDescriptor::function("percentile", "p95"), GroupDescriptor::facet("a", "app")]),
        ];
        let c = classify(&rows).unwrap();
        assert_eq!(c.aggregate_slot("p50"), Some(0));
        assert_eq!(c.aggregate_slot("p95"), Some(1));
        assert_eq!(c.aggregate_slot("p99"), None);
    }

    #[test]
    fn test_series_marker_excluded_by_default() {
        let rows = vec![row(vec![
            GroupDescriptor::function("series", "series"),
            GroupDescriptor::function("count", "count(*)"),
        ])];
        assert_eq!(classify(&rows).unwrap().unique_aggregates.len(), 1);
        let counted = Classifier::new().count_series_marker(true).classify(&rows).unwrap();
        assert_eq!(counted.unique_aggregates.len(), 2);
    }

    #[test]
    fn test_non_aggregates_exclude_injected_and_grouped_keys() {
        let mut units = IndexMap::new();
        for key in ["begin_time", "end_time", "x", "y", "timestamp", "duration", "contentLength", "appName"] {
            units.insert(key.to_string(), UnitType::Unknown);
        }
        let rows = vec![QueryResultRow {
            data: vec![DataPoint::default()],
            metadata: Some(Metadata {
                color: None,
                groups: Some(vec![GroupDescriptor::facet("appName", "appName")]),
                units_data: units,
                name: None,
            }),
        }];
        let c = classify(&rows).unwrap();
        assert_eq!(
            c.unique_non_aggregates.iter().cloned().collect::<Vec<_>>(),
            vec!["duration".to_string(), "contentLength".to_string()]
        );
    }

    #[test]
    fn test_missing_groups_fails() {
        let rows = vec![QueryResultRow::default()];
        assert!(matches!(classify(&rows), Err(ShapeError::MalformedResult { .. })));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(classify(&[]), Err(ShapeError::EmptyResult));
    }
}
