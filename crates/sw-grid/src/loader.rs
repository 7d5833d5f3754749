//! Loading a topology from a vertices CSV and a links CSV.
//!
//! Vertices file columns: `v_id,lon,lat`.
//! Links file columns: `v_id_1,v_id_2` and optionally `k` (line coupling).

use crate::error::{GridError, GridResult};
use crate::topology::{Topology, TopologyBuilder};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// A single row of the vertices file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VertexRecord {
    pub v_id: String,
    pub lon: f64,
    pub lat: f64,
}

/// A single row of the links file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinkRecord {
    pub v_id_1: String,
    pub v_id_2: String,
    #[serde(default)]
    pub k: Option<f64>,
}

/// Load a topology from two CSV files.
pub fn load_grid_csv(vertices_path: &Path, links_path: &Path) -> GridResult<Topology> {
    let open = |path: &Path| {
        File::open(path).map_err(|source| GridError::Io {
            path: path.to_path_buf(),
            source,
        })
    };
    read_grid_csv(open(vertices_path)?, open(links_path)?)
}

/// Read a topology from any two CSV sources.
pub fn read_grid_csv(vertices: impl Read, links: impl Read) -> GridResult<Topology> {
    let mut builder = TopologyBuilder::new();

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(vertices);
    for row in reader.deserialize() {
        let vertex: VertexRecord = row?;
        builder.add_vertex(vertex.v_id, vertex.lon, vertex.lat);
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(links);
    for row in reader.deserialize() {
        let link: LinkRecord = row?;
        builder.add_line(link.v_id_1, link.v_id_2, link.k);
    }

    builder.build()
}
