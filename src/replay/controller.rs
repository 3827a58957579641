//! Topology controller interface used by the replay engine.
//!
//! The emulated testbed lives outside this crate; everything the engine needs
//! from it goes through this synchronous request/response trait.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::allocator::Interface;
use crate::error::Result;
use crate::id::{IfaceId, NodeId, SessionId};

/// Loss applied to a link that is up.
pub const LINK_UP_LOSS: f32 = 0.0;
/// Loss applied to a link that is physically present but logically down.
pub const LINK_DOWN_LOSS: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Configuration,
    Instantiation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSpec {
    pub id: NodeId,
    pub name: String,
    pub model: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkSpec {
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub iface_a: Interface,
    pub iface_b: Interface,
    pub loss: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkEdit {
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub iface_a: IfaceId,
    pub iface_b: IfaceId,
    pub loss: f32,
}

/// Minimal testbed API for the replay engine.
pub trait TopologyController {
    fn create_session(&mut self) -> Result<SessionId>;
    fn set_session_state(&mut self, session: SessionId, state: SessionState) -> Result<()>;
    fn set_session_options(
        &mut self,
        session: SessionId,
        options: &BTreeMap<String, String>,
    ) -> Result<()>;
    fn add_node(&mut self, session: SessionId, node: &NodeSpec) -> Result<()>;
    fn add_link(&mut self, session: SessionId, link: &LinkSpec) -> Result<()>;
    fn edit_link(&mut self, session: SessionId, edit: &LinkEdit) -> Result<()>;
    fn get_node_config_file(
        &mut self,
        session: SessionId,
        node: NodeId,
        service: &str,
        file: &str,
    ) -> Result<String>;
    fn set_node_config_file(
        &mut self,
        session: SessionId,
        node: NodeId,
        service: &str,
        file: &str,
        text: &str,
    ) -> Result<()>;
    fn teardown_session(&mut self, session: SessionId) -> Result<()>;
}
