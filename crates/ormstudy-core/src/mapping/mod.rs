//! Mapping vocabulary
//!
//! Declarative pieces an entity mapping is assembled from. None of them touch
//! the database; the store consults them while reading and writing rows.

pub mod converter;
pub mod entity_graph;
pub mod listener;
pub mod named_query;

pub use converter::{AttributeConverter, BooleanToYnConverter};
pub use entity_graph::{AttributeNode, EntityGraph, EntityGraphs};
pub use listener::{EntityListener, LoggingListener};
pub use named_query::{
    NamedQueries, NamedQuery, NamedStoredProcedure, ParameterMode, ProcedureParameter,
    ResultSetMapping,
};
