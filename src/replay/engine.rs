//! 回放引擎
//!
//! 把解码后的事件流驱动到拓扑控制器上。状态机：
//! `Setup → Linking → Configuring → Running → Terminal`。
//!
//! - Setup：创建会话，为参与节点（在前 `max_steps` 个事件 step 内出现在某条 `ae` 中）
//!   建节点并取回原始配置；
//! - Linking：预扫描同一窗口，为每个节点对分配子网并以 100% 丢包建链；
//! - Configuring：改写每个节点的配置并写回；
//! - Running：逐 step 等待后应用 `ae`（丢包 0）/`de`（丢包 100）；
//! - Terminal：关闭会话。
//!
//! 任一错误立即中止，已应用的拓扑修改不会回滚。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use super::allocator::{InterfaceAllocator, NodePair};
use super::config::ReplayConfig;
use super::controller::{
    LINK_DOWN_LOSS, LINK_UP_LOSS, LinkEdit, LinkSpec, NodeSpec, SessionState, TopologyController,
};
use super::node_map::NodeMap;
use super::pacer::Pacer;
use super::patcher::ConfigPatcher;
use crate::dgs::{DgsDocument, DgsStep, EdgeOp};
use crate::error::{Error, Result};
use crate::id::{IdCounter, NodeId, SessionId};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Linking,
    Configuring,
    Running,
    Terminal,
}

/// 一次回放的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub nodes_created: usize,
    pub nodes_skipped: usize,
    pub links_created: usize,
    pub steps_run: usize,
    pub links_activated: usize,
    pub links_deactivated: usize,
}

/// 回放引擎。每个实例只对应一个会话，只能运行一次。
pub struct ReplayEngine {
    cfg: ReplayConfig,
    phase: Phase,
    session: Option<SessionId>,
    node_ids: IdCounter,
    grid_slots: IdCounter,
    node_map: NodeMap,
    configs: BTreeMap<NodeId, String>,
    allocator: InterfaceAllocator,
    patcher: ConfigPatcher,
    /// 当前处于 up 状态的边名 → 节点对
    open_edges: HashMap<String, NodePair>,
    cancel: Arc<AtomicBool>,
    report: ReplayReport,
}

impl ReplayEngine {
    pub fn new(cfg: ReplayConfig) -> Result<Self> {
        cfg.validate()?;
        let allocator = InterfaceAllocator::new(cfg.addressing.clone())?;
        let patcher = ConfigPatcher::new(cfg.patch.clone());
        Ok(Self {
            cfg,
            phase: Phase::Setup,
            session: None,
            node_ids: IdCounter::starting_at(1),
            grid_slots: IdCounter::default(),
            node_map: NodeMap::default(),
            configs: BTreeMap::new(),
            allocator,
            patcher,
            open_edges: HashMap::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            report: ReplayReport::default(),
        })
    }

    /// 外部中断标志：置位后在下一个 step 或事件之前中止
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    pub fn node_map(&self) -> &NodeMap {
        &self.node_map
    }

    pub fn allocator(&self) -> &InterfaceAllocator {
        &self.allocator
    }

    pub fn report(&self) -> &ReplayReport {
        &self.report
    }

    /// 运行完整回放
    #[tracing::instrument(skip_all, fields(graph = %doc.graph_name))]
    pub fn run(
        &mut self,
        doc: &DgsDocument,
        controller: &mut dyn TopologyController,
        pacer: &mut dyn Pacer,
    ) -> Result<ReplayReport> {
        if self.phase != Phase::Setup || self.session.is_some() {
            return Err(Error::invariant("replay engine has already been used"));
        }

        let window = self.window(doc);
        info!(
            nodes = doc.nodes.len(),
            steps = doc.steps.len(),
            window = window.len(),
            "▶️  开始回放"
        );

        let session = self.setup(doc, window, controller)?;
        self.enter(Phase::Linking);
        self.link(window, session, controller)?;
        self.enter(Phase::Configuring);
        self.configure(session, controller)?;

        if self.cfg.interactive {
            pacer.confirm("press enter to start the simulation")?;
        }
        controller.set_session_state(session, SessionState::Instantiation)?;

        self.enter(Phase::Running);
        self.run_steps(window, session, controller, pacer)?;
        if window.len() < doc.steps.len() {
            info!(
                ran = window.len(),
                total = doc.steps.len(),
                "已达到 step 上限，提前结束"
            );
        }

        self.enter(Phase::Terminal);
        controller.teardown_session(session)?;
        info!(
            nodes = self.report.nodes_created,
            links = self.report.links_created,
            steps = self.report.steps_run,
            "✅ 回放完成"
        );
        Ok(self.report.clone())
    }

    /// 受 `max_steps` 限制的事件 step 窗口
    fn window<'d>(&self, doc: &'d DgsDocument) -> &'d [DgsStep] {
        let n = self
            .cfg
            .max_steps
            .map_or(doc.steps.len(), |max| max.min(doc.steps.len()));
        &doc.steps[..n]
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "阶段切换");
        self.phase = phase;
    }

    fn setup(
        &mut self,
        doc: &DgsDocument,
        window: &[DgsStep],
        controller: &mut dyn TopologyController,
    ) -> Result<SessionId> {
        let participating = participating_nodes(window);

        let session = controller.create_session()?;
        self.session = Some(session);
        controller.set_session_state(session, SessionState::Configuration)?;

        if let Some(net) = &self.cfg.control_net {
            let options = BTreeMap::from([("controlnet".to_string(), net.clone())]);
            controller.set_session_options(session, &options)?;
            info!(control_net = %net, "已设置控制网络");
        }

        if let Some(ctrl) = &self.cfg.control_node {
            let node = NodeSpec {
                id: NodeId(self.node_ids.next()),
                name: ctrl.name.clone(),
                model: ctrl.model.clone(),
                position: ctrl.position,
            };
            controller.add_node(session, &node)?;
            info!(node = %node.id, name = %node.name, "已添加控制节点");
        }

        for name in &doc.nodes {
            if !participating.contains(name.as_str()) {
                debug!(name = %name, "节点在截止前未参与任何链路，跳过");
                self.report.nodes_skipped += 1;
                continue;
            }

            let id = NodeId(self.node_ids.next());
            self.node_map.insert(name, id)?;
            let node = NodeSpec {
                id,
                name: name.clone(),
                model: self.cfg.node_model.clone(),
                position: self.cfg.grid.position(self.grid_slots.next()),
            };
            controller.add_node(session, &node)?;

            let text = controller.get_node_config_file(
                session,
                id,
                &self.cfg.service,
                &self.cfg.config_file,
            )?;
            self.configs.insert(id, text);
            self.report.nodes_created += 1;
            debug!(node = %id, name = %name, "已添加节点");
        }

        info!(
            created = self.report.nodes_created,
            skipped = self.report.nodes_skipped,
            "节点创建完成"
        );
        Ok(session)
    }

    fn link(
        &mut self,
        window: &[DgsStep],
        session: SessionId,
        controller: &mut dyn TopologyController,
    ) -> Result<()> {
        for st in window {
            for op in &st.ops {
                let EdgeOp::Add { a, b, line, .. } = op else {
                    continue;
                };
                let pair = NodePair::new(
                    self.node_map.resolve(a, *line)?,
                    self.node_map.resolve(b, *line)?,
                );
                if self.allocator.get(&pair).is_some() {
                    continue;
                }

                let alloc = self.allocator.allocate(pair)?.clone();
                controller.add_link(
                    session,
                    &LinkSpec {
                        node_a: pair.low(),
                        node_b: pair.high(),
                        iface_a: alloc.iface_a.clone(),
                        iface_b: alloc.iface_b.clone(),
                        loss: LINK_DOWN_LOSS,
                    },
                )?;
                self.patcher
                    .accumulate(pair.low(), alloc.iface_b.ip4.to_string())?;
                self.patcher
                    .accumulate(pair.high(), alloc.iface_a.ip4.to_string())?;
                self.report.links_created += 1;
                debug!(pair = %pair, subnet = alloc.subnet.0, "已添加链路（down）");
            }
        }
        info!(links = self.report.links_created, "链路预分配完成");
        Ok(())
    }

    fn configure(
        &mut self,
        session: SessionId,
        controller: &mut dyn TopologyController,
    ) -> Result<()> {
        for (id, text) in self.configs.iter_mut() {
            let patched = self.patcher.finalize(*id, text)?;
            controller.set_node_config_file(
                session,
                *id,
                &self.cfg.service,
                &self.cfg.config_file,
                &patched,
            )?;
            *text = patched;
        }
        info!(nodes = self.configs.len(), "节点配置已更新");
        Ok(())
    }

    fn run_steps(
        &mut self,
        window: &[DgsStep],
        session: SessionId,
        controller: &mut dyn TopologyController,
        pacer: &mut dyn Pacer,
    ) -> Result<()> {
        let mut last_step = 0;
        for st in window {
            self.check_cancel(st.step)?;
            if self.cfg.interactive {
                pacer.confirm(&format!("press enter to run step {}", st.step))?;
            }
            pacer.pause(self.cfg.step_delay(st.step - last_step));
            last_step = st.step;

            debug!(step = st.step, ops = st.ops.len(), "执行 step");
            for op in &st.ops {
                self.check_cancel(st.step)?;
                self.apply(op, st.step, session, controller)?;
            }
            self.report.steps_run += 1;
        }
        Ok(())
    }

    fn apply(
        &mut self,
        op: &EdgeOp,
        step: u64,
        session: SessionId,
        controller: &mut dyn TopologyController,
    ) -> Result<()> {
        match op {
            EdgeOp::Add { edge, a, b, line } => {
                if self.open_edges.contains_key(edge) {
                    return Err(Error::invariant(format!(
                        "edge {edge} added at line {line} (step {step}) is already up"
                    )));
                }
                let pair = NodePair::new(
                    self.node_map.resolve(a, *line)?,
                    self.node_map.resolve(b, *line)?,
                );
                controller.edit_link(session, &self.edit_for(pair, LINK_UP_LOSS)?)?;
                self.open_edges.insert(edge.clone(), pair);
                self.report.links_activated += 1;
                debug!(edge = %edge, pair = %pair, "链路 up");
            }
            EdgeOp::Delete { edge, line } => {
                let pair = self.open_edges.remove(edge).ok_or_else(|| {
                    Error::invariant(format!(
                        "delete of edge {edge} at line {line} (step {step}) without a tracked add"
                    ))
                })?;
                controller.edit_link(session, &self.edit_for(pair, LINK_DOWN_LOSS)?)?;
                self.report.links_deactivated += 1;
                debug!(edge = %edge, pair = %pair, "链路 down");
            }
        }
        Ok(())
    }

    fn edit_for(&self, pair: NodePair, loss: f32) -> Result<LinkEdit> {
        let alloc = self.allocator.get(&pair).ok_or_else(|| {
            Error::invariant(format!("no link was allocated for node pair {pair}"))
        })?;
        Ok(LinkEdit {
            node_a: pair.low(),
            node_b: pair.high(),
            iface_a: alloc.iface_a.id,
            iface_b: alloc.iface_b.id,
            loss,
        })
    }

    fn check_cancel(&self, step: u64) -> Result<()> {
        if self.cancel.load(Ordering::SeqCst) {
            warn!(step, "收到中断，停止回放");
            return Err(Error::Cancelled { step });
        }
        Ok(())
    }
}

/// 在窗口内出现在任一 `ae` 中的节点
fn participating_nodes(window: &[DgsStep]) -> HashSet<&str> {
    window
        .iter()
        .flat_map(|st| st.ops.iter())
        .filter_map(|op| match op {
            EdgeOp::Add { a, b, .. } => Some([a.as_str(), b.as_str()]),
            EdgeOp::Delete { .. } => None,
        })
        .flatten()
        .collect()
}
