//! 内存拓扑控制器
//!
//! 在进程内维护会话、节点、链路与服务配置文件，并记录每一次调用，
//! 用于 dry run 与测试。调用日志可直接序列化为 JSON。

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::allocator::NodePair;
use super::controller::{LinkEdit, LinkSpec, NodeSpec, SessionState, TopologyController};
use crate::error::{Error, Result};
use crate::id::{IdCounter, NodeId, SessionId};
use tracing::{debug, trace};

/// 一次控制器调用（用于离线检查回放过程）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum ControllerCall {
    CreateSession {
        session: SessionId,
    },
    SetSessionState {
        session: SessionId,
        state: SessionState,
    },
    SetSessionOptions {
        session: SessionId,
        options: BTreeMap<String, String>,
    },
    AddNode {
        session: SessionId,
        node: NodeSpec,
    },
    AddLink {
        session: SessionId,
        link: LinkSpec,
    },
    EditLink {
        session: SessionId,
        edit: LinkEdit,
    },
    GetNodeConfigFile {
        session: SessionId,
        node: NodeId,
        service: String,
        file: String,
    },
    SetNodeConfigFile {
        session: SessionId,
        node: NodeId,
        service: String,
        file: String,
        bytes: usize,
    },
    TeardownSession {
        session: SessionId,
    },
}

/// 内存中的节点
#[derive(Debug, Clone)]
pub struct MemNode {
    pub spec: NodeSpec,
    files: BTreeMap<(String, String), String>,
}

impl MemNode {
    pub fn file(&self, service: &str, file: &str) -> Option<&str> {
        self.files
            .get(&(service.to_string(), file.to_string()))
            .map(String::as_str)
    }
}

/// 内存中的链路
#[derive(Debug, Clone)]
pub struct MemLink {
    pub spec: LinkSpec,
    pub loss: f32,
}

impl MemLink {
    pub fn is_up(&self) -> bool {
        self.loss < 100.0
    }
}

/// 内存中的会话
#[derive(Debug, Default)]
pub struct MemSession {
    state: Option<SessionState>,
    options: BTreeMap<String, String>,
    nodes: BTreeMap<NodeId, MemNode>,
    links: BTreeMap<NodePair, MemLink>,
    torn_down: bool,
}

impl MemSession {
    pub fn state(&self) -> Option<SessionState> {
        self.state
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn node(&self, id: NodeId) -> Option<&MemNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &MemNode> {
        self.nodes.values()
    }

    pub fn link(&self, pair: NodePair) -> Option<&MemLink> {
        self.links.get(&pair)
    }

    pub fn links(&self) -> impl Iterator<Item = &MemLink> {
        self.links.values()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

/// 进程内拓扑控制器
#[derive(Debug, Default)]
pub struct MemoryController {
    next_session: IdCounter,
    sessions: BTreeMap<SessionId, MemSession>,
    /// 节点创建时写入的服务配置文件
    service_files: HashMap<(String, String), String>,
    calls: Vec<ControllerCall>,
}

impl MemoryController {
    pub fn new() -> Self {
        Self {
            next_session: IdCounter::starting_at(1),
            ..Self::default()
        }
    }

    /// 注册每个新节点都会带有的服务配置文件
    pub fn with_service_file(
        mut self,
        service: impl Into<String>,
        file: impl Into<String>,
        contents: impl Into<String>,
    ) -> Self {
        self.service_files
            .insert((service.into(), file.into()), contents.into());
        self
    }

    pub fn session(&self, id: SessionId) -> Option<&MemSession> {
        self.sessions.get(&id)
    }

    /// 全部调用记录（按调用顺序）
    pub fn calls(&self) -> &[ControllerCall] {
        &self.calls
    }

    fn live_session(&mut self, op: &'static str, id: SessionId) -> Result<&mut MemSession> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| Error::controller(op, format!("unknown session {}", id.0)))?;
        if session.torn_down {
            return Err(Error::controller(
                op,
                format!("session {} has been torn down", id.0),
            ));
        }
        Ok(session)
    }
}

impl TopologyController for MemoryController {
    fn create_session(&mut self) -> Result<SessionId> {
        let id = SessionId(self.next_session.next());
        self.sessions.insert(id, MemSession::default());
        self.calls.push(ControllerCall::CreateSession { session: id });
        debug!(session = id.0, "创建会话");
        Ok(id)
    }

    fn set_session_state(&mut self, session: SessionId, state: SessionState) -> Result<()> {
        self.live_session("set_session_state", session)?.state = Some(state);
        self.calls
            .push(ControllerCall::SetSessionState { session, state });
        Ok(())
    }

    fn set_session_options(
        &mut self,
        session: SessionId,
        options: &BTreeMap<String, String>,
    ) -> Result<()> {
        let s = self.live_session("set_session_options", session)?;
        s.options
            .extend(options.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.calls.push(ControllerCall::SetSessionOptions {
            session,
            options: options.clone(),
        });
        Ok(())
    }

    fn add_node(&mut self, session: SessionId, node: &NodeSpec) -> Result<()> {
        let files: BTreeMap<_, _> = self
            .service_files
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let s = self.live_session("add_node", session)?;
        if s.nodes.contains_key(&node.id) {
            return Err(Error::controller(
                "add_node",
                format!("node {} already exists", node.id),
            ));
        }
        s.nodes.insert(
            node.id,
            MemNode {
                spec: node.clone(),
                files,
            },
        );
        self.calls.push(ControllerCall::AddNode {
            session,
            node: node.clone(),
        });
        trace!(node = %node.id, name = %node.name, "添加节点");
        Ok(())
    }

    fn add_link(&mut self, session: SessionId, link: &LinkSpec) -> Result<()> {
        let s = self.live_session("add_link", session)?;
        for id in [link.node_a, link.node_b] {
            if !s.nodes.contains_key(&id) {
                return Err(Error::controller("add_link", format!("unknown node {id}")));
            }
        }
        let pair = NodePair::new(link.node_a, link.node_b);
        if s.links.contains_key(&pair) {
            return Err(Error::controller(
                "add_link",
                format!("link {pair} already exists"),
            ));
        }
        s.links.insert(
            pair,
            MemLink {
                spec: link.clone(),
                loss: link.loss,
            },
        );
        self.calls.push(ControllerCall::AddLink {
            session,
            link: link.clone(),
        });
        trace!(pair = %pair, loss = link.loss, "添加链路");
        Ok(())
    }

    fn edit_link(&mut self, session: SessionId, edit: &LinkEdit) -> Result<()> {
        let s = self.live_session("edit_link", session)?;
        let pair = NodePair::new(edit.node_a, edit.node_b);
        let link = s
            .links
            .get_mut(&pair)
            .ok_or_else(|| Error::controller("edit_link", format!("unknown link {pair}")))?;
        if link.spec.iface_a.id != edit.iface_a || link.spec.iface_b.id != edit.iface_b {
            return Err(Error::controller(
                "edit_link",
                format!("interface ids do not match link {pair}"),
            ));
        }
        link.loss = edit.loss;
        self.calls.push(ControllerCall::EditLink {
            session,
            edit: edit.clone(),
        });
        trace!(pair = %pair, loss = edit.loss, "修改链路");
        Ok(())
    }

    fn get_node_config_file(
        &mut self,
        session: SessionId,
        node: NodeId,
        service: &str,
        file: &str,
    ) -> Result<String> {
        let s = self.live_session("get_node_config_file", session)?;
        let text = s
            .nodes
            .get(&node)
            .ok_or_else(|| Error::controller("get_node_config_file", format!("unknown node {node}")))?
            .file(service, file)
            .ok_or_else(|| {
                Error::controller(
                    "get_node_config_file",
                    format!("node {node} has no file {service}/{file}"),
                )
            })?
            .to_string();
        self.calls.push(ControllerCall::GetNodeConfigFile {
            session,
            node,
            service: service.to_string(),
            file: file.to_string(),
        });
        Ok(text)
    }

    fn set_node_config_file(
        &mut self,
        session: SessionId,
        node: NodeId,
        service: &str,
        file: &str,
        text: &str,
    ) -> Result<()> {
        let s = self.live_session("set_node_config_file", session)?;
        let mem = s.nodes.get_mut(&node).ok_or_else(|| {
            Error::controller("set_node_config_file", format!("unknown node {node}"))
        })?;
        mem.files
            .insert((service.to_string(), file.to_string()), text.to_string());
        self.calls.push(ControllerCall::SetNodeConfigFile {
            session,
            node,
            service: service.to_string(),
            file: file.to_string(),
            bytes: text.len(),
        });
        Ok(())
    }

    fn teardown_session(&mut self, session: SessionId) -> Result<()> {
        self.live_session("teardown_session", session)?.torn_down = true;
        self.calls.push(ControllerCall::TeardownSession { session });
        debug!(session = session.0, "会话已关闭");
        Ok(())
    }
}
