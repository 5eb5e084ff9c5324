use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::{debug, trace};

use crate::classify::{classify, function_group};
use crate::data::{GroupDescriptor, QueryResultRow};
use crate::error::{Result, ShapeError};
use crate::ir::{AxisValue, Classification, LegendItem, Series, SeriesPoint};
use crate::units::format_locale;

/// Facet value the query service uses for the long-tail bucket.
pub const OTHER_LABEL: &str = "Other";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SeriesLayout {
    /// One sequence per last-facet value, one entry per remaining facet combination.
    Segmented,
    /// One entry per facet group spanning two aggregates.
    Range,
    /// Numeric x/y (and optional z) points.
    Points,
    /// A single value split into progress and remainder.
    Gauge,
}

/// How flat result rows map onto series for one chart kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartShapeConfig {
    pub layout: SeriesLayout,
    /// Segments stack on one bar per label instead of sitting side by side.
    pub stack_facets: bool,
    /// Number of value axes; 2 means the x axis is numeric too.
    pub numeric_axes: usize,
    /// A third aggregate (or attribute) becomes `z`, the point size.
    pub size_from_third_aggregate: bool,
    pub show_other: bool,
}

impl ChartShapeConfig {
    pub fn new(layout: SeriesLayout) -> Self {
        Self {
            layout,
            stack_facets: false,
            numeric_axes: 1,
            size_from_third_aggregate: false,
            show_other: true,
        }
    }

    pub fn stack_facets(mut self, stack: bool) -> Self {
        self.stack_facets = stack;
        self
    }

    pub fn numeric_axes(mut self, axes: usize) -> Self {
        self.numeric_axes = axes;
        self
    }

    pub fn size_from_third_aggregate(mut self, enabled: bool) -> Self {
        self.size_from_third_aggregate = enabled;
        self
    }

    pub fn show_other(mut self, show: bool) -> Self {
        self.show_other = show;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetLabels {
    pub bar_label: String,
    pub segment_label: String,
}

impl FacetLabels {
    fn is_other(&self) -> bool {
        self.bar_label == OTHER_LABEL || self.segment_label == OTHER_LABEL
    }
}

/// Any facet of the row sits in the "Other" bucket.
fn has_other_facet(groups: &[GroupDescriptor]) -> bool {
    groups.iter().any(|g| g.is_facet() && g.value_label() == OTHER_LABEL)
}

/// Comma separated values of the facet groups.
pub fn facet_label<'a>(groups: impl IntoIterator<Item = &'a GroupDescriptor>) -> String {
    groups
        .into_iter()
        .filter(|g| g.is_facet())
        .map(GroupDescriptor::value_label)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Segment label from the last facet, bar label from the ones before it.
/// With a single facet both are that facet's value.
pub fn facet_labels(groups: &[GroupDescriptor]) -> Option<FacetLabels> {
    let facets: Vec<&GroupDescriptor> = groups.iter().filter(|g| g.is_facet()).collect();
    let (last, rest) = facets.split_last()?;
    let segment_label = last.value_label();
    let bar_label = if rest.is_empty() {
        segment_label.clone()
    } else {
        facet_label(rest.iter().copied())
    };

    Some(FacetLabels {
        bar_label,
        segment_label,
    })
}

/// All facet values of a row, the key range and scatter charts group by.
pub fn facet_group_name(groups: &[GroupDescriptor]) -> String {
    facet_label(groups)
}

/// Main entry point: reshape flat result rows into series.
pub fn reshape(rows: &[QueryResultRow], config: &ChartShapeConfig) -> Result<Series> {
    if rows.is_empty() {
        return Err(ShapeError::EmptyResult);
    }

    let series = match config.layout {
        SeriesLayout::Segmented => reshape_segments(rows, config)?,
        SeriesLayout::Range => reshape_range(rows, &classify(rows)?, config)?,
        SeriesLayout::Points => reshape_points(rows, &classify(rows)?, config)?,
        SeriesLayout::Gauge => reshape_gauge(rows)?,
    };

    debug!(
        layout = ?config.layout,
        sequences = series.len(),
        points = series.iter().map(Vec::len).sum::<usize>(),
        "reshaped query result"
    );

    Ok(series)
}

// -----------------------------------------------------------------------------
// Segmented (stacked / grouped bars)
// -----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SegmentAccumulator {
    values: IndexMap<String, IndexMap<String, f64>>,
    colors: IndexMap<String, Option<String>>,
}

impl SegmentAccumulator {
    fn absorb(mut self, row: &QueryResultRow, show_other: bool) -> Result<Self> {
        let labels = facet_labels(row.groups()?)
            .ok_or_else(|| ShapeError::malformed("segmented layout needs at least one FACET attribute"))?;

        if !show_other && labels.is_other() {
            trace!(bar = %labels.bar_label, "dropping Other bucket");
            return Ok(self);
        }

        let y = row.first_y()?;
        // first color seen for a segment wins
        self.colors
            .entry(labels.segment_label.clone())
            .or_insert_with(|| row.color());
        self.values
            .entry(labels.segment_label)
            .or_default()
            .insert(labels.bar_label, y);

        Ok(self)
    }
}

fn reshape_segments(rows: &[QueryResultRow], config: &ChartShapeConfig) -> Result<Series> {
    let SegmentAccumulator { values, colors } = rows
        .iter()
        .try_fold(SegmentAccumulator::default(), |acc, row| acc.absorb(row, config.show_other))?;

    let suffix = rows[0].unit_for("y").suffix();

    Ok(values
        .into_iter()
        .map(|(segment, bars)| {
            let color = colors.get(&segment).cloned().flatten();
            bars.into_iter()
                .map(|(bar, y)| SeriesPoint {
                    x: AxisValue::Category(bar),
                    y,
                    y0: None,
                    z: None,
                    color: color.clone(),
                    label: format!("{}\n{}{}", segment, format_locale(y), suffix),
                    segment_label: Some(segment.clone()),
                })
                .collect::<Vec<_>>()
        })
        .collect())
}

// -----------------------------------------------------------------------------
// Aggregate slots (range / aggregate scatter)
// -----------------------------------------------------------------------------

#[derive(Debug)]
struct SlotRow {
    color: Option<String>,
    values: Vec<Option<f64>>,
}

/// Second pass of the two-pass range algorithm: every row lands in the slot
/// of its aggregate. Slots follow each aggregate's first appearance in the
/// result, which the query service emits in SELECT order.
fn collect_slots(
    rows: &[QueryResultRow],
    classification: &Classification,
    slots: usize,
    show_other: bool,
) -> Result<IndexMap<String, SlotRow>> {
    rows.iter().try_fold(IndexMap::new(), |mut acc: IndexMap<String, SlotRow>, row| -> Result<_> {
        let groups = row.groups()?;
        if !show_other && has_other_facet(groups) {
            trace!("dropping Other bucket");
            return Ok(acc);
        }
        let key = facet_group_name(groups);
        let function = function_group(groups)
            .ok_or_else(|| ShapeError::malformed("result row carries no aggregate function tag"))?;
        let slot = classification
            .aggregate_slot(&function.display_name)
            .filter(|&s| s < slots)
            .ok_or_else(|| {
                ShapeError::malformed(format!("unexpected aggregate '{}'", function.display_name))
            })?;
        let y = row.first_y()?;

        let entry = acc.entry(key.clone()).or_insert_with(|| SlotRow {
            color: row.color(),
            values: vec![None; slots],
        });
        if entry.values[slot].is_some() {
            return Err(ShapeError::malformed(format!(
                "duplicate value for aggregate '{}' in facet group '{}'",
                function.display_name, key
            )));
        }
        entry.values[slot] = Some(y);

        Ok(acc)
    })
}

fn slot_value(row: &SlotRow, slot: usize, key: &str, classification: &Classification) -> Result<f64> {
    row.values.get(slot).copied().flatten().ok_or_else(|| {
        let aggregate = classification
            .unique_aggregates
            .get_index(slot)
            .map(String::as_str)
            .unwrap_or("?");
        ShapeError::malformed(format!(
            "facet group '{}' is missing a value for aggregate '{}'",
            key, aggregate
        ))
    })
}

fn non_empty(key: &str) -> Option<String> {
    (!key.is_empty()).then(|| key.to_string())
}

fn reshape_range(
    rows: &[QueryResultRow],
    classification: &Classification,
    config: &ChartShapeConfig,
) -> Result<Series> {
    if classification.unique_aggregates.len() < 2 {
        return Err(ShapeError::malformed("range layout needs two aggregate functions"));
    }

    let slots = collect_slots(rows, classification, 2, config.show_other)?;
    let entries = slots
        .iter()
        .map(|(key, row)| -> Result<SeriesPoint> {
            let low = slot_value(row, 0, key, classification)?;
            let high = slot_value(row, 1, key, classification)?;
            let span = format!("{} - {}", format_locale(low), format_locale(high));
            Ok(SeriesPoint {
                x: AxisValue::Category(key.clone()),
                y: high,
                y0: Some(low),
                z: None,
                color: row.color.clone(),
                label: if key.is_empty() { span } else { format!("{} {}", key, span) },
                segment_label: non_empty(key),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(vec![entries])
}

// -----------------------------------------------------------------------------
// Points (scatter)
// -----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct PointAccumulator {
    sequences: IndexMap<String, Vec<SeriesPoint>>,
    colors: IndexMap<String, Option<String>>,
}

impl PointAccumulator {
    fn push(mut self, key: &str, row_color: Option<String>, x: f64, y: f64, z: Option<f64>) -> Self {
        let color = self
            .colors
            .entry(key.to_string())
            .or_insert(row_color)
            .clone();
        let coords = format!("{}, {}", format_locale(x), format_locale(y));
        let point = SeriesPoint {
            x: AxisValue::Number(x),
            y,
            y0: None,
            z,
            color,
            label: if key.is_empty() { coords } else { format!("{}: {}", key, coords) },
            segment_label: non_empty(key),
        };
        self.sequences.entry(key.to_string()).or_default().push(point);
        self
    }

    fn into_series(self) -> Series {
        self.sequences.into_values().collect()
    }
}

fn reshape_points(
    rows: &[QueryResultRow],
    classification: &Classification,
    config: &ChartShapeConfig,
) -> Result<Series> {
    if classification.unique_aggregates.len() >= 2 {
        aggregate_points(rows, classification, config)
    } else {
        attribute_points(rows, classification, config)
    }
}

fn aggregate_points(
    rows: &[QueryResultRow],
    classification: &Classification,
    config: &ChartShapeConfig,
) -> Result<Series> {
    let slot_count = classification.unique_aggregates.len().min(3);
    let slots = collect_slots(rows, classification, slot_count, config.show_other)?;

    let acc = slots.iter().try_fold(PointAccumulator::default(), |acc, (key, row)| {
        let x = slot_value(row, 0, key, classification)?;
        let y = slot_value(row, 1, key, classification)?;
        let z = if config.size_from_third_aggregate && slot_count > 2 {
            Some(slot_value(row, 2, key, classification)?)
        } else {
            None
        };
        Ok::<_, ShapeError>(acc.push(key, row.color.clone(), x, y, z))
    })?;

    Ok(acc.into_series())
}

fn attribute_points(
    rows: &[QueryResultRow],
    classification: &Classification,
    config: &ChartShapeConfig,
) -> Result<Series> {
    let attributes: Vec<&String> = classification.unique_non_aggregates.iter().take(3).collect();
    let (x_attr, y_attr) = match attributes.as_slice() {
        [x, y, ..] => (x.as_str(), y.as_str()),
        _ => return Err(ShapeError::malformed("point layout needs two numeric attributes")),
    };
    let z_attr = attributes
        .get(2)
        .filter(|_| config.size_from_third_aggregate)
        .map(|s| s.as_str());

    let acc = rows.iter().try_fold(PointAccumulator::default(), |acc, row| -> Result<PointAccumulator> {
        let groups = row.groups()?;
        if !config.show_other && has_other_facet(groups) {
            return Ok(acc);
        }
        let key = facet_group_name(groups);
        let acc = row.data.iter().fold(acc, |acc, point| {
            match (point.number(x_attr), point.number(y_attr)) {
                (Some(x), Some(y)) => {
                    let z = z_attr.and_then(|attr| point.number(attr));
                    acc.push(&key, row.color(), x, y, z)
                }
                _ => {
                    trace!(x = x_attr, y = y_attr, "skipping point without numeric coordinates");
                    acc
                }
            }
        });
        Ok(acc)
    })?;

    Ok(acc.into_series())
}

// -----------------------------------------------------------------------------
// Gauge (progress)
// -----------------------------------------------------------------------------

fn reshape_gauge(rows: &[QueryResultRow]) -> Result<Series> {
    let row = &rows[0];
    let percent = row.first_y()?;
    let label = format!("{}%", percent.round());

    Ok(vec![vec![
        SeriesPoint {
            x: AxisValue::Category("progress".to_string()),
            y: percent,
            y0: None,
            z: None,
            color: row.color(),
            label: label.clone(),
            segment_label: None,
        },
        SeriesPoint {
            x: AxisValue::Category("remainder".to_string()),
            y: 100.0 - percent,
            y0: None,
            z: None,
            color: None,
            label,
            segment_label: None,
        },
    ]])
}

// -----------------------------------------------------------------------------
// Series helpers
// -----------------------------------------------------------------------------

/// One legend entry per segment label, first color seen.
pub fn legend_items(series: &Series) -> Vec<LegendItem> {
    let mut items: IndexMap<&str, Option<String>> = IndexMap::new();
    for point in series.iter().flatten() {
        if let Some(label) = point.segment_label.as_deref() {
            items.entry(label).or_insert_with(|| point.color.clone());
        }
    }

    items
        .into_iter()
        .map(|(label, color)| LegendItem {
            label: label.to_string(),
            color,
        })
        .collect()
}

/// Distinct category x values in first-seen order.
pub fn category_labels(series: &Series) -> IndexSet<String> {
    series
        .iter()
        .flatten()
        .filter_map(|p| p.x.as_category())
        .map(str::to_string)
        .collect()
}
