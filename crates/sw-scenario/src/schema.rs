//! Scenario schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub layout: LayoutDef,
    pub machines: Vec<MachineDef>,
    pub coupling: CouplingDef,
    #[serde(default)]
    pub events: Vec<EventDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<InitialStateDef>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutDef {
    #[default]
    Blocked,
    Interleaved,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MachineDef {
    pub id: String,
    pub inertia: f64,
    pub damping: f64,
    pub power: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouplingDef {
    /// Full matrix in machine order.
    Matrix { k: Vec<Vec<f64>> },
    /// Explicit lines between machine ids.
    Lines { lines: Vec<LineDef> },
    /// Vertices/links CSV files; vertex ids must match machine ids.
    /// Relative paths resolve against the scenario file's directory.
    GridCsv {
        vertices: PathBuf,
        links: PathBuf,
        default_k: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineDef {
    pub from: String,
    pub to: String,
    pub k: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventDef {
    pub time: f64,
    #[serde(flatten)]
    pub action: EventActionDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventActionDef {
    LoadJump {
        delta: Vec<f64>,
    },
    LineDrop {
        from: String,
        to: String,
    },
    Replace {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        inertias: Option<Vec<f64>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dampings: Option<Vec<f64>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        powers: Option<Vec<f64>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        k: Option<Vec<Vec<f64>>>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitialStateDef {
    pub phi: Vec<f64>,
    pub omega: Vec<f64>,
}
