//! Typed cube definitions
//!
//! These are the canonical, already-validated shapes of a cube and its
//! parts. Nothing here checks invariants; build them through
//! [`crate::validate::validate`] when the input is untrusted.

use serde::Serialize;
use std::fmt;

use crate::xml::Element;

/// Data type of a level's member values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LevelType {
    #[default]
    String,
    Numeric,
    Integer,
    Boolean,
}

impl LevelType {
    pub const ALL: [LevelType; 4] = [
        LevelType::String,
        LevelType::Numeric,
        LevelType::Integer,
        LevelType::Boolean,
    ];

    /// Attribute value written to the schema file
    pub fn as_str(&self) -> &'static str {
        match self {
            LevelType::String => "String",
            LevelType::Numeric => "Numeric",
            LevelType::Integer => "Integer",
            LevelType::Boolean => "Boolean",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl fmt::Display for LevelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregation applied to a measure's column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Aggregator {
    #[default]
    Sum,
    Count,
    Avg,
    Min,
    Max,
}

impl Aggregator {
    pub const ALL: [Aggregator; 5] = [
        Aggregator::Sum,
        Aggregator::Count,
        Aggregator::Avg,
        Aggregator::Min,
        Aggregator::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregator::Sum => "sum",
            Aggregator::Count => "count",
            Aggregator::Avg => "avg",
            Aggregator::Min => "min",
            Aggregator::Max => "max",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == value)
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub name: String,
    pub column: String,
    pub level_type: LevelType,
    pub unique_members: Option<bool>,
}

/// An ordered drill path through a dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hierarchy {
    pub name: Option<String>,
    pub has_all: bool,
    /// Only set when `has_all` is true
    pub all_member_name: Option<String>,
    pub levels: Vec<Level>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub hierarchies: Vec<Hierarchy>,
}

/// An aggregated fact bound to a fact-table column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measure {
    pub name: String,
    pub column: String,
    pub aggregator: Aggregator,
    pub format_string: Option<String>,
}

/// A complete cube definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cube {
    pub name: String,
    /// Name of the fact table
    pub table: String,
    pub dimensions: Vec<Dimension>,
    pub measures: Vec<Measure>,
}

/// Short description of a cube, reported after a mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CubeSummary {
    pub cube_name: String,
    pub table_name: String,
    pub dimensions_count: usize,
    pub measures_count: usize,
}

impl Cube {
    /// Build the `<Cube>` element written to the schema file
    pub fn to_element(&self) -> Element {
        let mut cube = Element::new("Cube").with_attr("name", &self.name);
        cube.push(Element::new("Table").with_attr("name", &self.table));

        for dimension in &self.dimensions {
            let mut dim = Element::new("Dimension").with_attr("name", &dimension.name);
            for hierarchy in &dimension.hierarchies {
                dim.push(hierarchy.to_element());
            }
            cube.push(dim);
        }

        for measure in &self.measures {
            let mut el = Element::new("Measure")
                .with_attr("name", &measure.name)
                .with_attr("column", &measure.column)
                .with_attr("aggregator", measure.aggregator.as_str());
            if let Some(format) = &measure.format_string {
                el.set_attr("formatString", format);
            }
            cube.push(el);
        }

        cube
    }

    pub fn summary(&self) -> CubeSummary {
        CubeSummary {
            cube_name: self.name.clone(),
            table_name: self.table.clone(),
            dimensions_count: self.dimensions.len(),
            measures_count: self.measures.len(),
        }
    }
}

impl Hierarchy {
    fn to_element(&self) -> Element {
        let mut el = Element::new("Hierarchy");
        if let Some(name) = &self.name {
            el.set_attr("name", name);
        }
        el.set_attr("hasAll", if self.has_all { "true" } else { "false" });
        if let Some(all_member) = &self.all_member_name {
            el.set_attr("allMemberName", all_member);
        }

        for level in &self.levels {
            let mut level_el = Element::new("Level")
                .with_attr("name", &level.name)
                .with_attr("column", &level.column)
                .with_attr("type", level.level_type.as_str());
            if let Some(unique) = level.unique_members {
                level_el.set_attr("uniqueMembers", if unique { "true" } else { "false" });
            }
            el.push(level_el);
        }

        el
    }
}
