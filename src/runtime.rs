// Runtime executor: one delivery in, one chart outcome out

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::chart::ChartKind;
use crate::classify::{classify, function_group};
use crate::data::{QueryResponse, QueryResultRow};
use crate::error::{Result, ShapeError};
use crate::ir::{AxisSpecs, ChartOutcome, Classification, Series};
use crate::scale::{category_axis, derive_ticks, derive_ticks_in, stack_totals, x_values, y_values, MinMax};
use crate::transform::{category_labels, legend_items, reshape, ChartShapeConfig, SeriesLayout};
use crate::units::UnitType;
use crate::ChartOptions;

pub const GENERIC_ERROR_MESSAGE: &str = "Oops! Something went wrong.";
pub const UNSUPPORTED_QUERY_TITLE: &str = "Unsupported NRQL query";

const CHART_LEFT_PADDING: f64 = 100.0;
const CHART_RIGHT_PADDING: f64 = 25.0;

/// Run classify → validate → reshape → derive ticks for one delivery.
///
/// Never fails: every error, and any panic raised while reshaping, is turned
/// into one of the non-ready outcomes.
pub fn build_chart(kind: ChartKind, response: &QueryResponse, options: &ChartOptions) -> ChartOutcome {
    if response.loading {
        return ChartOutcome::Loading;
    }

    let rows = match (&response.data, &response.error) {
        (Some(rows), _) => rows,
        (None, Some(error)) => {
            return outcome_for_error(ShapeError::QuerySyntaxError {
                message: error.message.clone(),
            })
        }
        (None, None) => return ChartOutcome::Empty,
    };

    if rows.is_empty() {
        return ChartOutcome::Empty;
    }

    match catch_unwind(AssertUnwindSafe(|| render_rows(kind, rows, options))) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(error)) => outcome_for_error(error),
        Err(_) => {
            warn!(chart = kind.name(), "reshaping panicked, reporting generic error");
            ChartOutcome::Error {
                message: GENERIC_ERROR_MESSAGE.to_string(),
            }
        }
    }
}

/// Map a failed pass onto the outcome the renderer shows.
pub fn outcome_for_error(error: ShapeError) -> ChartOutcome {
    match error {
        ShapeError::UnsupportedQueryShape { description, .. } => ChartOutcome::InvalidInput {
            title: UNSUPPORTED_QUERY_TITLE.to_string(),
            description,
        },
        ShapeError::QuerySyntaxError { message } => ChartOutcome::Error { message },
        ShapeError::EmptyResult => ChartOutcome::Empty,
        ShapeError::MalformedResult { reason } => {
            warn!(%reason, "malformed query result");
            ChartOutcome::Error {
                message: GENERIC_ERROR_MESSAGE.to_string(),
            }
        }
    }
}

fn render_rows(kind: ChartKind, rows: &[QueryResultRow], options: &ChartOptions) -> Result<ChartOutcome> {
    let classification = classify(rows)?;
    crate::validate::validate(&classification, kind)?;

    let config = kind.shape_config().show_other(options.show_other);
    let series = reshape(rows, &config)?;
    if series.iter().all(Vec::is_empty) {
        debug!(chart = kind.name(), "nothing left to draw after reshaping");
        return Ok(ChartOutcome::Empty);
    }

    let legend = legend_items(&series);
    let axis_specs = derive_axes(&config, rows, &classification, &series, options);

    Ok(ChartOutcome::Ready {
        series,
        legend,
        axis_specs,
    })
}

/// Axis specs for the axes a layout draws.
pub fn derive_axes(
    config: &ChartShapeConfig,
    rows: &[QueryResultRow],
    classification: &Classification,
    series: &Series,
    options: &ChartOptions,
) -> AxisSpecs {
    let width = f64::from(options.width);
    let height = f64::from(options.height);
    let y_unit = rows.first().map(|r| r.unit_for("y")).unwrap_or_default();

    match config.layout {
        SeriesLayout::Gauge => AxisSpecs::default(),
        SeriesLayout::Segmented => {
            let domain = if config.stack_facets {
                let totals: Vec<f64> = stack_totals(series).into_values().collect();
                MinMax::of(&totals)
            } else {
                MinMax::of(&y_values(series))
            };
            let y = derive_ticks_in(domain.including_zero(), height, y_unit, options.y_tick_density)
                .with_label(y_axis_label(options, classification, y_unit));
            let x = category_axis(category_labels(series), x_domain_width(width), single_facet_name(classification));
            AxisSpecs { x: Some(x), y: Some(y) }
        }
        SeriesLayout::Range => {
            let y = derive_ticks(&y_values(series), height, y_unit, options.inset_tick_density)
                .with_label(y_axis_label(options, classification, y_unit));
            let x = category_axis(category_labels(series), x_domain_width(width), None);
            AxisSpecs { x: Some(x), y: Some(y) }
        }
        SeriesLayout::Points => {
            let [(x_name, x_unit), (y_name, y_unit)] = point_dimensions(rows, classification);
            let x = derive_ticks(&x_values(series), width, x_unit, options.inset_tick_density).with_label(x_name);
            let y = derive_ticks(&y_values(series), height, y_unit, options.inset_tick_density)
                .with_label(options.y_axis_label.clone().unwrap_or(y_name));
            AxisSpecs { x: Some(x), y: Some(y) }
        }
    }
}

fn x_domain_width(width: f64) -> f64 {
    (width - CHART_LEFT_PADDING - CHART_RIGHT_PADDING).max(0.0)
}

fn single_facet_name(classification: &Classification) -> Option<&str> {
    match classification.unique_facets.len() {
        1 => classification.unique_facets.first().map(String::as_str),
        _ => None,
    }
}

/// Configured label, else the aggregates with the unit suffix.
fn y_axis_label(options: &ChartOptions, classification: &Classification, unit: UnitType) -> String {
    if let Some(label) = &options.y_axis_label {
        return label.clone();
    }

    let name = classification
        .unique_aggregates
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    match unit.suffix() {
        "" => name,
        suffix => format!("{} ({})", name, suffix),
    }
}

/// Names and units of the x and y dimensions of a point chart.
fn point_dimensions(rows: &[QueryResultRow], classification: &Classification) -> [(String, UnitType); 2] {
    let dimension = |i: usize| -> (String, UnitType) {
        if classification.unique_aggregates.len() >= 2 {
            let name = classification.unique_aggregates.get_index(i).cloned().unwrap_or_default();
            (name.clone(), aggregate_unit(rows, &name))
        } else {
            let name = classification.unique_non_aggregates.get_index(i).cloned().unwrap_or_default();
            let unit = rows.first().map(|r| r.unit_for(&name)).unwrap_or_default();
            (name, unit)
        }
    };
    [dimension(0), dimension(1)]
}

fn aggregate_unit(rows: &[QueryResultRow], aggregate: &str) -> UnitType {
    rows.iter()
        .find(|row| {
            row.groups()
                .ok()
                .and_then(function_group)
                .is_some_and(|g| g.display_name == aggregate)
        })
        .map(|row| row.unit_for("y"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GroupDescriptor, QueryError};
    use crate::ir::AxisValue;

    fn row(y: f64, color: &str, aggregate: &str, facets: &[(&str, &str)]) -> QueryResultRow {
        let mut groups = vec![GroupDescriptor::function("f", aggregate)];
        groups.extend(facets.iter().map(|(v, n)| GroupDescriptor::facet(v, n)));
        let mut row = QueryResultRow::aggregate(y, color, groups);
        if let Some(meta) = row.metadata.as_mut() {
            meta.units_data.insert("y".to_string(), UnitType::Ms);
        }
        row
    }

    fn stacked_rows() -> Vec<QueryResultRow> {
        vec![
            row(10.0, "red", "average(duration)", &[("prod", "environment"), ("catalog", "appName")]),
            row(20.0, "blue", "average(duration)", &[("prod", "environment"), ("checkout", "appName")]),
            row(5.0, "red", "average(duration)", &[("staging", "environment"), ("catalog", "appName")]),
        ]
    }

    #[test]
    fn test_loading_state() {
        let response = QueryResponse {
            loading: true,
            ..Default::default()
        };
        assert_eq!(build_chart(ChartKind::StackedBar, &response, &ChartOptions::default()), ChartOutcome::Loading);
    }

    #[test]
    fn test_syntax_error_passes_through() {
        let response = QueryResponse {
            loading: false,
            error: Some(QueryError {
                message: "NRQL Syntax Error: Error at line 1 position 8".to_string(),
            }),
            data: None,
        };
        let outcome = build_chart(ChartKind::Range, &response, &ChartOptions::default());
        assert_eq!(
            outcome,
            ChartOutcome::Error {
                message: "NRQL Syntax Error: Error at line 1 position 8".to_string()
            }
        );
    }

    #[test]
    fn test_empty_result() {
        let outcome = build_chart(ChartKind::StackedBar, &QueryResponse::ready(vec![]), &ChartOptions::default());
        assert_eq!(outcome, ChartOutcome::Empty);
    }

    #[test]
    fn test_invalid_shape() {
        let rows = vec![row(1.0, "red", "count(*)", &[])];
        let outcome = build_chart(ChartKind::StackedBar, &QueryResponse::ready(rows), &ChartOptions::default());
        match outcome {
            ChartOutcome::InvalidInput { title, description } => {
                assert_eq!(title, UNSUPPORTED_QUERY_TITLE);
                assert!(description.contains("FACET clause"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_malformed_is_generic_error() {
        let rows = vec![QueryResultRow::default()];
        let outcome = build_chart(ChartKind::StackedBar, &QueryResponse::ready(rows), &ChartOptions::default());
        assert_eq!(
            outcome,
            ChartOutcome::Error {
                message: GENERIC_ERROR_MESSAGE.to_string()
            }
        );
    }

    #[test]
    fn test_stacked_bar_ready() {
        let outcome = build_chart(ChartKind::StackedBar, &QueryResponse::ready(stacked_rows()), &ChartOptions::default());
        let ChartOutcome::Ready { series, legend, axis_specs } = outcome else {
            panic!("expected ready outcome");
        };
        assert_eq!(series.len(), 2);
        assert_eq!(legend.len(), 2);

        let y = axis_specs.y.unwrap();
        assert_eq!(y.label, "average(duration) (ms)");
        // prod stacks to 30
        assert_eq!(y.domain, Some((0.0, 30.0)));
        assert_eq!(y.tick_count, 17);

        let x = axis_specs.x.unwrap();
        assert_eq!(x.label, "");
        assert_eq!(x.ticks.len(), 2);
        assert_eq!(x.ticks[0].value, AxisValue::Category("prod".to_string()));
        assert_eq!(x.ticks[0].label, "prod");
    }

    #[test]
    fn test_multi_facet_bar_domain_is_max_value() {
        let outcome = build_chart(ChartKind::MultiFacetBar, &QueryResponse::ready(stacked_rows()), &ChartOptions::default());
        let ChartOutcome::Ready { axis_specs, .. } = outcome else {
            panic!("expected ready outcome");
        };
        assert_eq!(axis_specs.y.unwrap().domain, Some((0.0, 20.0)));
    }

    #[test]
    fn test_single_facet_axis_uses_display_name() {
        let rows = vec![
            row(10.0, "red", "count(*)", &[("prod", "environment")]),
            row(20.0, "blue", "count(*)", &[("staging", "environment")]),
        ];
        let outcome = build_chart(ChartKind::StackedBar, &QueryResponse::ready(rows), &ChartOptions::default());
        let ChartOutcome::Ready { axis_specs, .. } = outcome else {
            panic!("expected ready outcome");
        };
        let x = axis_specs.x.unwrap();
        assert_eq!(x.label, "environment");
        assert!(x.ticks.iter().all(|t| t.label.is_empty()));
    }

    #[test]
    fn test_configured_y_label_and_hidden_other() {
        let mut rows = stacked_rows();
        rows.push(row(99.0, "gray", "average(duration)", &[("Other", "environment"), ("catalog", "appName")]));
        let options = ChartOptions {
            show_other: false,
            y_axis_label: Some("Latency".to_string()),
            ..Default::default()
        };
        let outcome = build_chart(ChartKind::StackedBar, &QueryResponse::ready(rows), &options);
        let ChartOutcome::Ready { axis_specs, .. } = outcome else {
            panic!("expected ready outcome");
        };
        let y = axis_specs.y.unwrap();
        assert_eq!(y.label, "Latency");
        assert_eq!(y.domain, Some((0.0, 30.0)));
    }

    #[test]
    fn test_range_outcome() {
        let rows = vec![
            row(100.0, "#11a", "p50", &[("catalog-service", "appName")]),
            row(250.0, "#11a", "p95", &[("catalog-service", "appName")]),
        ];
        let outcome = build_chart(ChartKind::Range, &QueryResponse::ready(rows), &ChartOptions::default());
        let ChartOutcome::Ready { series, axis_specs, .. } = outcome else {
            panic!("expected ready outcome");
        };
        assert_eq!(series[0][0].y0, Some(100.0));
        let y = axis_specs.y.unwrap();
        assert_eq!(y.domain, Some((100.0, 250.0)));
        // (600 - 50) / 70
        assert_eq!(y.tick_count, 8);
    }

    #[test]
    fn test_progress_outcome() {
        let rows = vec![row(75.0, "green", "percentage(count(*))", &[])];
        let outcome = build_chart(ChartKind::Progress, &QueryResponse::ready(rows), &ChartOptions::default());
        let ChartOutcome::Ready { series, legend, axis_specs } = outcome else {
            panic!("expected ready outcome");
        };
        assert_eq!(series[0][1].y, 25.0);
        assert!(legend.is_empty());
        assert_eq!(axis_specs.axes().count(), 0);
    }

    #[test]
    fn test_scatter_axes_named_after_aggregates() {
        let facet = [("catalog", "appName")];
        let rows = vec![
            row(1.0, "red", "average(duration)", &facet),
            row(2.0, "red", "max(duration)", &facet),
        ];
        let outcome = build_chart(ChartKind::Scatter, &QueryResponse::ready(rows), &ChartOptions::default());
        let ChartOutcome::Ready { axis_specs, .. } = outcome else {
            panic!("expected ready outcome");
        };
        assert_eq!(axis_specs.x.unwrap().label, "average(duration)");
        let y = axis_specs.y.unwrap();
        assert_eq!(y.label, "max(duration)");
        assert_eq!(y.unit, UnitType::Ms);
    }
}
