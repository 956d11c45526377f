//! Named entity graphs
//!
//! An entity graph lists which associations a fetch should load together
//! with the root entity. Subgraphs describe the associations of an
//! association. Paths are dotted attribute names (`orderItems.item`).

use crate::errors::{OrmStudyError, Result};
use std::collections::BTreeMap;

/// One attribute of a graph, optionally with its own subgraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeNode {
    attribute: String,
    subgraph: Vec<AttributeNode>,
}

impl AttributeNode {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            subgraph: Vec::new(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Add attributes to this node's subgraph
    pub fn add_attribute_nodes(&mut self, attributes: &[&str]) -> &mut Self {
        for attribute in attributes {
            if !self.subgraph.iter().any(|n| n.attribute == *attribute) {
                self.subgraph.push(AttributeNode::new(*attribute));
            }
        }
        self
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        let path = if prefix.is_empty() {
            self.attribute.clone()
        } else {
            format!("{}.{}", prefix, self.attribute)
        };
        out.push(path.clone());
        for child in &self.subgraph {
            child.collect_paths(&path, out);
        }
    }
}

/// A named fetch plan rooted at one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityGraph {
    name: String,
    entity: String,
    nodes: Vec<AttributeNode>,
}

impl EntityGraph {
    pub fn new(name: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
            nodes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Add plain attribute nodes
    pub fn add_attribute_nodes(&mut self, attributes: &[&str]) -> &mut Self {
        for attribute in attributes {
            self.node_mut(attribute);
        }
        self
    }

    /// Add (or reopen) the subgraph of `attribute`
    pub fn add_subgraph(&mut self, attribute: &str) -> &mut AttributeNode {
        self.node_mut(attribute)
    }

    fn node_mut(&mut self, attribute: &str) -> &mut AttributeNode {
        let idx = match self.nodes.iter().position(|n| n.attribute == attribute) {
            Some(idx) => idx,
            None => {
                self.nodes.push(AttributeNode::new(attribute));
                self.nodes.len() - 1
            }
        };
        &mut self.nodes[idx]
    }

    /// Every dotted path the graph covers, depth first
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.collect_paths("", &mut out);
        }
        out
    }

    /// Whether a fetch using this graph loads `path`
    pub fn contains(&self, path: &str) -> bool {
        self.paths().iter().any(|p| p == path)
    }

    /// Check every path against the attributes the entity actually maps
    ///
    /// # Errors
    ///
    /// `UnknownGraphAttribute` for the first path not in `known_paths`.
    pub fn validate(&self, known_paths: &[&str]) -> Result<()> {
        for path in self.paths() {
            if !known_paths.contains(&path.as_str()) {
                return Err(OrmStudyError::UnknownGraphAttribute {
                    graph: self.name.clone(),
                    attribute: path,
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Registry of named graphs
#[derive(Debug, Clone, Default)]
pub struct EntityGraphs {
    graphs: BTreeMap<String, EntityGraph>,
}

impl EntityGraphs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, graph: EntityGraph) {
        self.graphs.insert(graph.name.clone(), graph);
    }

    /// Look up a graph by name
    ///
    /// # Errors
    ///
    /// `MissingMapping` when no graph has that name.
    pub fn get(&self, name: &str) -> Result<&EntityGraph> {
        self.graphs.get(name).ok_or_else(|| {
            OrmStudyError::EntityGraphNotFound {
                name: name.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;

    fn order_with_all() -> EntityGraph {
        let mut graph = EntityGraph::new("Order.withAll", "Order");
        graph.add_attribute_nodes(&["member"]);
        graph.add_subgraph("orderItems").add_attribute_nodes(&["item"]);
        graph
    }

    #[test]
    fn test_paths_are_depth_first() {
        assert_eq!(
            order_with_all().paths(),
            vec!["member", "orderItems", "orderItems.item"]
        );
    }

    #[test]
    fn test_contains() {
        let graph = order_with_all();
        assert!(graph.contains("member"));
        assert!(graph.contains("orderItems.item"));
        assert!(!graph.contains("item"));
    }

    #[test]
    fn test_duplicate_nodes_collapse() {
        let mut graph = EntityGraph::new("g", "Order");
        graph.add_attribute_nodes(&["member", "member"]);
        graph.add_subgraph("member");
        assert_eq!(graph.paths(), vec!["member"]);
    }

    #[test]
    fn test_validate_rejects_misspelled_attribute() {
        let mut graph = EntityGraph::new("adhoc", "Order");
        graph.add_subgraph("orderItems").add_attribute_nodes(&["items"]);

        let err = graph
            .validate(&["member", "orderItems", "orderItems.item"])
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::MissingMapping);
        assert!(err.message().contains("orderItems.items"));
    }

    #[test]
    fn test_registry_lookup() {
        let mut graphs = EntityGraphs::new();
        graphs.register(order_with_all());
        assert!(graphs.get("Order.withAll").is_ok());
        assert!(graphs.get("Order.none").is_err());
    }
}
