//! Request payload validation
//!
//! Turns an untrusted JSON payload into a [`Cube`]. Every rejection names
//! the exact field path that caused it, e.g.
//! `dimensions[0].hierarchies[1].levels`, so the caller can point the user
//! straight at the problem.
//!
//! Field names follow the wire format of the cube API: `cube_name`,
//! `table_name`, `dimensions`, `measures`, and camelCase for the Mondrian
//! attributes (`hasAll`, `allMemberName`, `uniqueMembers`, `formatString`).

use serde_json::{Map, Value};

use crate::cube::{Aggregator, Cube, Dimension, Hierarchy, Level, LevelType, Measure};
use crate::error::{Result, SchemaError};

/// Validate a cube payload
pub fn validate(payload: &Value) -> Result<Cube> {
    let obj = Obj::new(payload, String::new())?;

    let name = obj.required_str("cube_name")?;
    let table = obj.required_str("table_name")?;
    let dimensions = obj.non_empty_list("dimensions", dimension)?;
    let measures = obj.non_empty_list("measures", measure)?;

    Ok(Cube {
        name,
        table,
        dimensions,
        measures,
    })
}

fn dimension(obj: Obj<'_>) -> Result<Dimension> {
    Ok(Dimension {
        name: obj.required_str("name")?,
        hierarchies: obj.non_empty_list("hierarchies", hierarchy)?,
    })
}

fn hierarchy(obj: Obj<'_>) -> Result<Hierarchy> {
    let name = obj.optional_str("name")?;
    let has_all = obj.optional_bool("hasAll")?.unwrap_or(true);
    let all_member_name = obj.optional_str("allMemberName")?;
    if all_member_name.is_some() && !has_all {
        return Err(SchemaError::invalid(
            obj.path("allMemberName"),
            "allMemberName requires hasAll to be true",
        ));
    }

    Ok(Hierarchy {
        name,
        has_all,
        all_member_name,
        levels: obj.non_empty_list("levels", level)?,
    })
}

fn level(obj: Obj<'_>) -> Result<Level> {
    let level_type = match obj.optional_str("type")? {
        None => LevelType::default(),
        Some(tag) => LevelType::parse(&tag).ok_or_else(|| {
            SchemaError::invalid(
                obj.path("type"),
                format!("unknown level type '{}', expected one of {}", tag, list(LevelType::ALL)),
            )
        })?,
    };

    Ok(Level {
        name: obj.required_str("name")?,
        column: obj.required_str("column")?,
        level_type,
        unique_members: obj.optional_bool("uniqueMembers")?,
    })
}

fn measure(obj: Obj<'_>) -> Result<Measure> {
    let aggregator = match obj.optional_str("aggregator")? {
        None => Aggregator::default(),
        Some(tag) => Aggregator::parse(&tag).ok_or_else(|| {
            SchemaError::invalid(
                obj.path("aggregator"),
                format!("unknown aggregator '{}', expected one of {}", tag, list(Aggregator::ALL)),
            )
        })?,
    };

    Ok(Measure {
        name: obj.required_str("name")?,
        column: obj.required_str("column")?,
        aggregator,
        format_string: obj.optional_str("formatString")?,
    })
}

fn list<T: std::fmt::Display>(values: impl IntoIterator<Item = T>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A JSON object together with its path from the payload root
struct Obj<'a> {
    fields: &'a Map<String, Value>,
    path: String,
}

impl<'a> Obj<'a> {
    fn new(value: &'a Value, path: String) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields, path }),
            other => Err(SchemaError::invalid(
                if path.is_empty() { "$".to_string() } else { path },
                format!("expected an object, got {}", type_name(other)),
            )),
        }
    }

    fn path(&self, field: &str) -> String {
        if self.path.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", self.path, field)
        }
    }

    /// Field value, treating explicit `null` as absent
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    fn required_str(&self, field: &str) -> Result<String> {
        match self.optional_str(field)? {
            Some(s) => Ok(s),
            None => Err(SchemaError::invalid(self.path(field), "field is required")),
        }
    }

    fn optional_str(&self, field: &str) -> Result<Option<String>> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => {
                Err(SchemaError::invalid(self.path(field), "must not be empty"))
            }
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(SchemaError::invalid(
                self.path(field),
                format!("expected a string, got {}", type_name(other)),
            )),
        }
    }

    fn optional_bool(&self, field: &str) -> Result<Option<bool>> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(SchemaError::invalid(
                self.path(field),
                format!("expected a boolean, got {}", type_name(other)),
            )),
        }
    }

    /// Convert a required array field, rejecting an empty array
    fn non_empty_list<T>(&self, field: &str, item: fn(Obj<'a>) -> Result<T>) -> Result<Vec<T>> {
        let path = self.path(field);
        let items = match self.get(field) {
            None => return Err(SchemaError::invalid(path, "field is required")),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(SchemaError::invalid(
                    path,
                    format!("expected an array, got {}", type_name(other)),
                ))
            }
        };
        if items.is_empty() {
            return Err(SchemaError::invalid(path, "must contain at least one entry"));
        }

        items
            .iter()
            .enumerate()
            .map(|(i, value)| item(Obj::new(value, format!("{}[{}]", path, i))?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "cube_name": "Vehicle Sales",
            "table_name": "sales",
            "dimensions": [{
                "name": "Time",
                "hierarchies": [
                    { "hasAll": true, "allMemberName": "All Years",
                      "levels": [{ "name": "Year", "column": "year", "type": "Integer", "uniqueMembers": true }] },
                    { "name": "Fiscal", "hasAll": false,
                      "levels": [{ "name": "Quarter", "column": "fiscal_quarter" }] }
                ]
            }],
            "measures": [
                { "name": "Units", "column": "units", "formatString": "#,###" },
                { "name": "Revenue", "column": "revenue", "aggregator": "max" }
            ]
        })
    }

    fn field_path(result: Result<Cube>) -> String {
        match result {
            Err(SchemaError::ValidationError { field_path, .. }) => field_path,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_payload_with_defaults() {
        let cube = validate(&payload()).unwrap();
        assert_eq!(cube.name, "Vehicle Sales");
        assert_eq!(cube.table, "sales");

        let fiscal = &cube.dimensions[0].hierarchies[1];
        assert_eq!(fiscal.name.as_deref(), Some("Fiscal"));
        assert!(!fiscal.has_all);
        assert_eq!(fiscal.levels[0].level_type, LevelType::String);
        assert_eq!(fiscal.levels[0].unique_members, None);

        assert_eq!(cube.measures[0].aggregator, Aggregator::Sum);
        assert_eq!(cube.measures[1].aggregator, Aggregator::Max);
    }

    #[test]
    fn test_child_order_is_preserved() {
        let cube = validate(&payload()).unwrap();
        let names: Vec<_> = cube.measures.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Units", "Revenue"]);
    }

    #[test]
    fn test_null_optional_fields_are_absent() {
        let mut p = payload();
        p["dimensions"][0]["hierarchies"][0]["name"] = Value::Null;
        p["measures"][0]["formatString"] = Value::Null;
        let cube = validate(&p).unwrap();
        assert_eq!(cube.dimensions[0].hierarchies[0].name, None);
        assert_eq!(cube.measures[0].format_string, None);
    }

    #[test]
    fn test_empty_collections_have_distinct_paths() {
        let mut no_measures = payload();
        no_measures["measures"] = json!([]);

        let mut no_hierarchies = payload();
        no_hierarchies["dimensions"][0]["hierarchies"] = json!([]);

        let mut no_levels = payload();
        no_levels["dimensions"][0]["hierarchies"][1]["levels"] = json!([]);

        let mut no_dimensions = payload();
        no_dimensions["dimensions"] = json!([]);

        assert_eq!(field_path(validate(&no_measures)), "measures");
        assert_eq!(field_path(validate(&no_hierarchies)), "dimensions[0].hierarchies");
        assert_eq!(field_path(validate(&no_levels)), "dimensions[0].hierarchies[1].levels");
        assert_eq!(field_path(validate(&no_dimensions)), "dimensions");
    }

    #[test]
    fn test_missing_required_field() {
        let mut p = payload();
        p["measures"][1].as_object_mut().unwrap().remove("column");
        assert_eq!(field_path(validate(&p)), "measures[1].column");

        let mut p = payload();
        p.as_object_mut().unwrap().remove("table_name");
        assert_eq!(field_path(validate(&p)), "table_name");
    }

    #[test]
    fn test_wrong_types_are_rejected() {
        let mut p = payload();
        p["dimensions"][0]["hierarchies"][0]["hasAll"] = json!("yes");
        assert_eq!(field_path(validate(&p)), "dimensions[0].hierarchies[0].hasAll");

        let mut p = payload();
        p["dimensions"][0]["hierarchies"] = json!({ "levels": [] });
        assert_eq!(field_path(validate(&p)), "dimensions[0].hierarchies");

        let mut p = payload();
        p["measures"][0] = json!("Units");
        assert_eq!(field_path(validate(&p)), "measures[0]");

        assert_eq!(field_path(validate(&json!([1, 2]))), "$");
    }

    #[test]
    fn test_unknown_enum_values_are_rejected() {
        let mut p = payload();
        p["measures"][0]["aggregator"] = json!("median");
        match validate(&p) {
            Err(SchemaError::ValidationError { field_path, reason }) => {
                assert_eq!(field_path, "measures[0].aggregator");
                assert!(reason.contains("median"));
                assert!(reason.contains("sum, count, avg, min, max"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let mut p = payload();
        p["dimensions"][0]["hierarchies"][0]["levels"][0]["type"] = json!("Date");
        assert_eq!(field_path(validate(&p)), "dimensions[0].hierarchies[0].levels[0].type");
    }

    #[test]
    fn test_empty_names_are_rejected() {
        let mut p = payload();
        p["cube_name"] = json!("  ");
        assert_eq!(field_path(validate(&p)), "cube_name");
    }

    #[test]
    fn test_all_member_name_requires_has_all() {
        let mut p = payload();
        p["dimensions"][0]["hierarchies"][1]["allMemberName"] = json!("All Quarters");
        assert_eq!(
            field_path(validate(&p)),
            "dimensions[0].hierarchies[1].allMemberName"
        );
    }
}
