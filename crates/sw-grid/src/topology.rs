//! Undirected transmission network with vertex positions.

use crate::error::{GridError, GridResult};
use nalgebra::DMatrix;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// A bus/generator site.
#[derive(Clone, Debug, PartialEq)]
pub struct Vertex {
    pub id: String,
    /// Longitude
    pub lon: f64,
    /// Latitude
    pub lat: f64,
}

/// A transmission line. `coupling` overrides the default susceptance.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Line {
    pub coupling: Option<f64>,
}

/// Builder for constructing a topology incrementally.
///
/// Use `add_vertex` and `add_line`, then call `build()` to validate and
/// freeze it into an immutable `Topology`.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    vertices: Vec<Vertex>,
    lines: Vec<(String, String, Option<f64>)>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex and return its 0-based index.
    pub fn add_vertex(&mut self, id: impl Into<String>, lon: f64, lat: f64) -> usize {
        self.vertices.push(Vertex {
            id: id.into(),
            lon,
            lat,
        });
        self.vertices.len() - 1
    }

    /// Add a line between two vertex ids.
    ///
    /// Adding the same pair twice keeps one line with the later coupling.
    pub fn add_line(&mut self, from: impl Into<String>, to: impl Into<String>, coupling: Option<f64>) {
        self.lines.push((from.into(), to.into(), coupling));
    }

    /// Validate and build the topology.
    ///
    /// Vertex indices follow insertion order.
    pub fn build(self) -> GridResult<Topology> {
        let mut graph = UnGraph::with_capacity(self.vertices.len(), self.lines.len());
        let mut index = HashMap::with_capacity(self.vertices.len());

        for vertex in self.vertices {
            if !vertex.lon.is_finite() || !vertex.lat.is_finite() {
                return Err(GridError::NonFinite {
                    what: "position",
                    id: vertex.id,
                });
            }
            if index.contains_key(&vertex.id) {
                return Err(GridError::DuplicateVertex(vertex.id));
            }
            let id = vertex.id.clone();
            let node = graph.add_node(vertex);
            index.insert(id, node);
        }

        for (from, to, coupling) in self.lines {
            let lookup = |id: &str| {
                index
                    .get(id)
                    .copied()
                    .ok_or_else(|| GridError::UnknownVertex {
                        from: from.clone(),
                        to: to.clone(),
                        missing: id.to_string(),
                    })
            };
            let a = lookup(&from)?;
            let b = lookup(&to)?;
            if a == b {
                return Err(GridError::SelfLoop(from));
            }
            if let Some(k) = coupling {
                if !k.is_finite() {
                    return Err(GridError::NonFinite {
                        what: "line coupling",
                        id: format!("{from}-{to}"),
                    });
                }
            }
            if graph.find_edge(a, b).is_some() {
                tracing::debug!(%from, %to, "duplicate line merged");
            }
            graph.update_edge(a, b, Line { coupling });
        }

        tracing::debug!(
            vertices = graph.node_count(),
            lines = graph.edge_count(),
            "topology built"
        );

        Ok(Topology { graph, index })
    }
}

/// Immutable network topology.
#[derive(Clone, Debug)]
pub struct Topology {
    graph: UnGraph<Vertex, Line>,
    index: HashMap<String, NodeIndex>,
}

impl Topology {
    pub fn graph(&self) -> &UnGraph<Vertex, Line> {
        &self.graph
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn line_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Vertices in index order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.graph.node_weights()
    }

    /// Lines as `(from_index, to_index, line)`.
    pub fn lines(&self) -> impl Iterator<Item = (usize, usize, Line)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), *e.weight()))
    }

    /// Index of a vertex id.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).map(|n| n.index())
    }

    pub fn vertex(&self, id: &str) -> Option<&Vertex> {
        self.index.get(id).map(|&n| &self.graph[n])
    }

    /// Symmetric coupling matrix in vertex order.
    ///
    /// Lines without their own coupling use `default_k`.
    pub fn coupling_matrix(&self, default_k: f64) -> DMatrix<f64> {
        let n = self.vertex_count();
        let mut k = DMatrix::zeros(n, n);
        for (a, b, line) in self.lines() {
            let value = line.coupling.unwrap_or(default_k);
            k[(a, b)] = value;
            k[(b, a)] = value;
        }
        k
    }

    /// Symmetric coupling matrix with rows ordered by `order`.
    ///
    /// `order` must name every vertex exactly once; entry `(i, j)` couples
    /// `order[i]` and `order[j]`.
    pub fn coupling_matrix_for(&self, order: &[&str], default_k: f64) -> GridResult<DMatrix<f64>> {
        let mut position = vec![usize::MAX; self.vertex_count()];
        for (row, id) in order.iter().enumerate() {
            let v = self.index_of(id).ok_or_else(|| GridError::UnknownVertex {
                from: "<ordering>".to_string(),
                to: "<ordering>".to_string(),
                missing: id.to_string(),
            })?;
            if position[v] != usize::MAX {
                return Err(GridError::DuplicateVertex(id.to_string()));
            }
            position[v] = row;
        }
        if let Some(v) = position.iter().position(|&p| p == usize::MAX) {
            return Err(GridError::UnknownVertex {
                from: "<ordering>".to_string(),
                to: "<ordering>".to_string(),
                missing: self.graph[NodeIndex::new(v)].id.clone(),
            });
        }

        let natural = self.coupling_matrix(default_k);
        let n = order.len();
        let mut k = DMatrix::zeros(n, n);
        for a in 0..n {
            for b in 0..n {
                k[(position[a], position[b])] = natural[(a, b)];
            }
        }
        Ok(k)
    }
}
