//! The in-memory schema document
//!
//! A [`SchemaDocument`] owns the parsed element tree for the duration of one
//! operation. Cubes are the `<Cube>` children of the `<Schema>` root and are
//! addressed by their position in the root's child list; everything else in
//! the tree is carried along untouched.

use std::path::{Path, PathBuf};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tracing::debug;

use crate::checksum::Checksum;
use crate::cube::Cube;
use crate::error::{Result, SchemaError};
use crate::xml::{self, Element, Node};

/// Root element of a schema document
pub const SCHEMA_TAG: &str = "Schema";
/// Element holding one cube
pub const CUBE_TAG: &str = "Cube";

/// Where a document was loaded from and what the bytes were at that time
#[derive(Debug, Clone)]
pub struct Origin {
    pub path: PathBuf,
    pub checksum: Checksum,
}

/// A parsed schema document
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    root: Element,
    origin: Option<Origin>,
}

impl SchemaDocument {
    /// Create an empty schema with the given name
    pub fn new(schema_name: &str) -> Self {
        Self {
            root: Element::new(SCHEMA_TAG).with_attr("name", schema_name),
            origin: None,
        }
    }

    /// Parse document text; `source` is only used in error messages
    pub fn parse(text: &str, source: &Path) -> Result<Self> {
        let root = xml::parse(text).map_err(|e| SchemaError::malformed(source, e))?;
        if root.name != SCHEMA_TAG {
            return Err(SchemaError::malformed(
                source,
                format!("root element must be <{}>, found <{}>", SCHEMA_TAG, root.name),
            ));
        }
        for (i, cube) in root.elements().filter(|e| e.name == CUBE_TAG).enumerate() {
            if cube.attr("name").is_none() {
                return Err(SchemaError::malformed(
                    source,
                    format!("cube #{} has no name attribute", i + 1),
                ));
            }
        }
        Ok(Self { root, origin: None })
    }

    /// Parse raw file bytes and remember their origin
    pub fn from_bytes(bytes: &[u8], path: &Path) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| SchemaError::malformed(path, format!("invalid UTF-8: {}", e)))?;
        let mut doc = Self::parse(text, path)?;
        doc.origin = Some(Origin {
            path: path.to_path_buf(),
            checksum: Checksum::from_bytes(bytes),
        });
        Ok(doc)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    /// Every cube name in document order
    pub fn enumerate(&self) -> Vec<&str> {
        self.cubes().filter_map(|(_, cube)| cube.attr("name")).collect()
    }

    /// Find a cube by exact, case-sensitive name
    pub fn locate(&self, name: &str) -> Result<&Element> {
        debug!(cube = name, "locating cube");
        match self.position(name) {
            Some(index) => match &self.root.children[index] {
                Node::Element(cube) => Ok(cube),
                _ => Err(self.not_found(name)),
            },
            None => Err(self.not_found(name)),
        }
    }

    /// Canonical XML for one cube
    pub fn cube_xml(&self, name: &str) -> Result<String> {
        let cube = self.locate(name)?;
        xml::write_fragment(cube).map_err(|e| SchemaError::malformed(self.source_path(), e))
    }

    /// Append a new cube after the last existing one
    pub fn create(&mut self, cube: &Cube) -> Result<()> {
        if self.position(&cube.name).is_some() {
            return Err(SchemaError::DuplicateName {
                name: cube.name.clone(),
            });
        }

        let insert_at = self
            .cubes()
            .last()
            .map(|(index, _)| index + 1)
            .unwrap_or(self.root.children.len());
        self.root
            .children
            .insert(insert_at, Node::Element(cube.to_element()));
        Ok(())
    }

    /// Replace the cube called `name` in place, possibly renaming it
    pub fn replace(&mut self, name: &str, cube: &Cube) -> Result<()> {
        let index = self.position(name).ok_or_else(|| self.not_found(name))?;
        if cube.name != name && self.position(&cube.name).is_some() {
            return Err(SchemaError::DuplicateName {
                name: cube.name.clone(),
            });
        }
        self.root.children[index] = Node::Element(cube.to_element());
        Ok(())
    }

    /// Remove the cube called `name`, returning its element
    pub fn remove(&mut self, name: &str) -> Result<Element> {
        let index = self.position(name).ok_or_else(|| self.not_found(name))?;
        match self.root.children.remove(index) {
            Node::Element(cube) => Ok(cube),
            _ => Err(self.not_found(name)),
        }
    }

    /// Serialize in canonical form
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, xml::XmlError> {
        xml::write_document(&self.root)
    }

    /// Root-level cubes with their index in the root's children
    fn cubes(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.root
            .children
            .iter()
            .enumerate()
            .filter_map(|(i, node)| match node {
                Node::Element(el) if el.name == CUBE_TAG => Some((i, el)),
                _ => None,
            })
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.cubes()
            .find(|(_, cube)| cube.attr("name") == Some(name))
            .map(|(index, _)| index)
    }

    fn not_found(&self, name: &str) -> SchemaError {
        let available: Vec<String> = self.enumerate().into_iter().map(String::from).collect();
        let suggestion = suggest(name, &available);
        SchemaError::RecordNotFound {
            name: name.to_string(),
            available,
            suggestion,
        }
    }

    fn source_path(&self) -> PathBuf {
        self.origin
            .as_ref()
            .map(|o| o.path.clone())
            .unwrap_or_default()
    }
}

/// Closest existing name: a case-insensitive match first, then the best
/// fuzzy match
fn suggest(query: &str, available: &[String]) -> Option<String> {
    if query.trim().is_empty() {
        return None;
    }
    if let Some(exact) = available.iter().find(|n| n.eq_ignore_ascii_case(query)) {
        return Some(exact.clone());
    }

    let matcher = SkimMatcherV2::default();
    available
        .iter()
        .filter_map(|name| matcher.fuzzy_match(name, query).map(|score| (score, name)))
        .max_by_key(|(score, _)| *score)
        .map(|(_, name)| name.clone())
}
