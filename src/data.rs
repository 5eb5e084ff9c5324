use anyhow::{anyhow, Context};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ShapeError};
use crate::units::UnitType;

/// Kind of tag attached to a result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    Function,
    Facet,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDescriptor {
    #[serde(rename = "type")]
    pub group_type: GroupType,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default, rename = "displayName")]
    pub display_name: String,
}

impl GroupDescriptor {
    pub fn function(value: &str, display_name: &str) -> Self {
        Self {
            group_type: GroupType::Function,
            value: Some(Value::String(value.to_string())),
            display_name: display_name.to_string(),
        }
    }

    pub fn facet(value: &str, display_name: &str) -> Self {
        Self {
            group_type: GroupType::Facet,
            value: Some(Value::String(value.to_string())),
            display_name: display_name.to_string(),
        }
    }

    pub fn is_facet(&self) -> bool {
        self.group_type == GroupType::Facet
    }

    pub fn is_function(&self) -> bool {
        self.group_type == GroupType::Function
    }

    /// The tag value as a label. Missing values render as `"null"`.
    pub fn value_label(&self) -> String {
        match &self.value {
            None | Some(Value::Null) => "null".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub groups: Option<Vec<GroupDescriptor>>,
    #[serde(default)]
    pub units_data: IndexMap<String, UnitType>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One element of a row's `data` array: `y` for aggregates, arbitrary
/// attributes for raw event queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataPoint(pub IndexMap<String, Value>);

impl DataPoint {
    pub fn with_y(y: f64) -> Self {
        let mut attributes = IndexMap::new();
        attributes.insert("y".to_string(), Value::from(y));
        Self(attributes)
    }

    pub fn number(&self, attribute: &str) -> Option<f64> {
        self.0.get(attribute).and_then(Value::as_f64)
    }

    pub fn y(&self) -> Option<f64> {
        self.number("y")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResultRow {
    #[serde(default)]
    pub data: Vec<DataPoint>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl QueryResultRow {
    /// Convenience constructor for a single-valued aggregate row.
    pub fn aggregate(y: f64, color: &str, groups: Vec<GroupDescriptor>) -> Self {
        Self {
            data: vec![DataPoint::with_y(y)],
            metadata: Some(Metadata {
                color: Some(color.to_string()),
                groups: Some(groups),
                units_data: IndexMap::new(),
                name: None,
            }),
        }
    }

    pub fn groups(&self) -> Result<&[GroupDescriptor]> {
        self.metadata
            .as_ref()
            .and_then(|m| m.groups.as_deref())
            .ok_or_else(|| ShapeError::malformed("result row is missing metadata.groups"))
    }

    pub fn facet_groups(&self) -> Result<Vec<&GroupDescriptor>> {
        Ok(self.groups()?.iter().filter(|g| g.is_facet()).collect())
    }

    pub fn color(&self) -> Option<String> {
        self.metadata.as_ref().and_then(|m| m.color.clone())
    }

    pub fn units(&self) -> Option<&IndexMap<String, UnitType>> {
        self.metadata.as_ref().map(|m| &m.units_data)
    }

    pub fn unit_for(&self, field: &str) -> UnitType {
        self.units()
            .and_then(|u| u.get(field).copied())
            .unwrap_or_default()
    }

    /// `y` of the first data point.
    pub fn first_y(&self) -> Result<f64> {
        self.data
            .first()
            .and_then(DataPoint::y)
            .ok_or_else(|| ShapeError::malformed("result row has no numeric y value"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryError {
    pub message: String,
}

/// One delivery from the query collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub loading: bool,
    #[serde(default)]
    pub error: Option<QueryError>,
    #[serde(default)]
    pub data: Option<Vec<QueryResultRow>>,
}

impl QueryResponse {
    pub fn ready(rows: Vec<QueryResultRow>) -> Self {
        Self {
            loading: false,
            error: None,
            data: Some(rows),
        }
    }

    /// Accepts either a bare array of rows or a full response object.
    pub fn from_json(value: &Value) -> anyhow::Result<Self> {
        match value {
            Value::Array(_) => {
                let rows: Vec<QueryResultRow> = serde_json::from_value(value.clone())
                    .context("Failed to decode query result rows")?;
                Ok(Self::ready(rows))
            }
            Value::Object(_) => serde_json::from_value(value.clone())
                .context("Failed to decode query response"),
            _ => Err(anyhow!(
                "Input must be a JSON array of result rows or a query response object"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_array() {
        let value = json!([{
            "data": [{ "y": 12.5 }],
            "metadata": {
                "color": "#0079bf",
                "groups": [
                    { "type": "function", "value": "average", "displayName": "average(duration)" },
                    { "type": "facet", "value": "prod", "displayName": "environment" }
                ],
                "units_data": { "y": "MS" },
                "name": "prod"
            }
        }]);
        let response = QueryResponse::from_json(&value).unwrap();
        let rows = response.data.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].first_y().unwrap(), 12.5);
        assert_eq!(rows[0].unit_for("y"), UnitType::Ms);
        assert_eq!(rows[0].facet_groups().unwrap()[0].value_label(), "prod");
    }

    #[test]
    fn test_from_json_response_object() {
        let value = json!({ "loading": false, "error": { "message": "NRQL Syntax Error: Error at line 1" } });
        let response = QueryResponse::from_json(&value).unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.error.unwrap().message, "NRQL Syntax Error: Error at line 1");
    }

    #[test]
    fn test_from_json_rejects_scalar() {
        assert!(QueryResponse::from_json(&json!(42)).is_err());
    }

    #[test]
    fn test_missing_groups_is_malformed() {
        let row = QueryResultRow {
            data: vec![DataPoint::with_y(1.0)],
            metadata: Some(Metadata::default()),
        };
        assert!(matches!(row.groups(), Err(ShapeError::MalformedResult { .. })));
    }

    #[test]
    fn test_value_label_null_and_numbers() {
        let missing = GroupDescriptor {
            group_type: GroupType::Facet,
            value: None,
            display_name: "host".to_string(),
        };
        assert_eq!(missing.value_label(), "null");
        let numeric = GroupDescriptor {
            group_type: GroupType::Facet,
            value: Some(json!(404)),
            display_name: "httpResponseCode".to_string(),
        };
        assert_eq!(numeric.value_label(), "404");
    }
}
