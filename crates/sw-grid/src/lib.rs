//! sw-grid: network topology for swing models.
//!
//! Provides:
//! - Vertices (with map positions) and transmission lines in an undirected graph
//! - Incremental builder with validation
//! - Loading from a vertices CSV and a links CSV
//! - Translation of the line list into a symmetric, zero-diagonal coupling matrix
//!
//! # Example
//!
//! ```
//! use sw_grid::TopologyBuilder;
//!
//! let mut builder = TopologyBuilder::new();
//! builder.add_vertex("a", 10.0, 50.0);
//! builder.add_vertex("b", 11.0, 51.0);
//! builder.add_line("a", "b", None);
//! let topology = builder.build().unwrap();
//!
//! let k = topology.coupling_matrix(400.0);
//! assert_eq!(k[(0, 1)], 400.0);
//! assert_eq!(k[(1, 0)], 400.0);
//! ```

pub mod error;
pub mod loader;
pub mod topology;

pub use error::{GridError, GridResult};
pub use loader::{LinkRecord, VertexRecord, load_grid_csv, read_grid_csv};
pub use topology::{Line, Topology, TopologyBuilder, Vertex};
