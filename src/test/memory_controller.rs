use std::collections::BTreeMap;

use crate::Error;
use crate::id::{IfaceId, NodeId, SessionId};
use crate::replay::{
    AddressingConfig, ControllerCall, InterfaceAllocator, LINK_DOWN_LOSS, LINK_UP_LOSS, LinkEdit,
    LinkSpec, MemoryController, NodePair, NodeSpec, Position, SessionState, TopologyController,
};

fn node(id: u32) -> NodeSpec {
    NodeSpec {
        id: NodeId(id),
        name: format!("n{id}"),
        model: "DTN".to_string(),
        position: Position { x: 0, y: 0 },
    }
}

fn link(alloc: &mut InterfaceAllocator, a: u32, b: u32) -> LinkSpec {
    let pair = NodePair::new(NodeId(a), NodeId(b));
    let l = alloc.allocate(pair).expect("allocate").clone();
    LinkSpec {
        node_a: pair.low(),
        node_b: pair.high(),
        iface_a: l.iface_a,
        iface_b: l.iface_b,
        loss: LINK_DOWN_LOSS,
    }
}

fn edit(spec: &LinkSpec, loss: f32) -> LinkEdit {
    LinkEdit {
        node_a: spec.node_a,
        node_b: spec.node_b,
        iface_a: spec.iface_a.id,
        iface_b: spec.iface_b.id,
        loss,
    }
}

fn controller_error(res: crate::Result<impl std::fmt::Debug>, op: &str) {
    match res {
        Err(Error::Controller { op: got, .. }) => assert_eq!(got, op),
        other => panic!("expected controller error in {op}, got {other:?}"),
    }
}

#[test]
fn sessions_are_numbered_from_one() {
    let mut ctl = MemoryController::new();
    assert_eq!(ctl.create_session().expect("session"), SessionId(1));
    assert_eq!(ctl.create_session().expect("session"), SessionId(2));
}

#[test]
fn session_state_options_and_nodes_are_recorded() {
    let mut ctl = MemoryController::new().with_service_file("dtnd", "dtnd.toml", "cfg");
    let s = ctl.create_session().expect("session");
    ctl.set_session_state(s, SessionState::Configuration)
        .expect("state");
    let options = BTreeMap::from([("controlnet".to_string(), "172.16.0.0/24".to_string())]);
    ctl.set_session_options(s, &options).expect("options");
    ctl.add_node(s, &node(1)).expect("node");

    let session = ctl.session(s).expect("session exists");
    assert_eq!(session.state(), Some(SessionState::Configuration));
    assert_eq!(session.option("controlnet"), Some("172.16.0.0/24"));
    let n1 = session.node(NodeId(1)).expect("node 1");
    assert_eq!(n1.file("dtnd", "dtnd.toml"), Some("cfg"));
    assert_eq!(ctl.calls().len(), 4);
    assert!(matches!(ctl.calls()[3], ControllerCall::AddNode { .. }));
}

#[test]
fn config_files_round_trip_through_the_node() {
    let mut ctl = MemoryController::new().with_service_file("dtnd", "dtnd.toml", "old");
    let s = ctl.create_session().expect("session");
    ctl.add_node(s, &node(1)).expect("node");
    assert_eq!(
        ctl.get_node_config_file(s, NodeId(1), "dtnd", "dtnd.toml")
            .expect("get"),
        "old"
    );
    ctl.set_node_config_file(s, NodeId(1), "dtnd", "dtnd.toml", "new")
        .expect("set");
    assert_eq!(
        ctl.get_node_config_file(s, NodeId(1), "dtnd", "dtnd.toml")
            .expect("get"),
        "new"
    );
    controller_error(
        ctl.get_node_config_file(s, NodeId(1), "dtnd", "missing.toml"),
        "get_node_config_file",
    );
    controller_error(
        ctl.get_node_config_file(s, NodeId(9), "dtnd", "dtnd.toml"),
        "get_node_config_file",
    );
}

#[test]
fn links_toggle_loss_through_edits() {
    let mut alloc = InterfaceAllocator::new(AddressingConfig::default()).expect("alloc");
    let mut ctl = MemoryController::new();
    let s = ctl.create_session().expect("session");
    ctl.add_node(s, &node(1)).expect("node");
    ctl.add_node(s, &node(2)).expect("node");

    let spec = link(&mut alloc, 2, 1);
    ctl.add_link(s, &spec).expect("link");
    let pair = NodePair::new(NodeId(1), NodeId(2));
    assert!(!ctl.session(s).and_then(|x| x.link(pair)).expect("link").is_up());

    ctl.edit_link(s, &edit(&spec, LINK_UP_LOSS)).expect("up");
    assert!(ctl.session(s).and_then(|x| x.link(pair)).expect("link").is_up());

    ctl.edit_link(s, &edit(&spec, LINK_DOWN_LOSS)).expect("down");
    assert!(!ctl.session(s).and_then(|x| x.link(pair)).expect("link").is_up());
}

#[test]
fn invalid_links_are_rejected() {
    let mut alloc = InterfaceAllocator::new(AddressingConfig::default()).expect("alloc");
    let mut ctl = MemoryController::new();
    let s = ctl.create_session().expect("session");
    ctl.add_node(s, &node(1)).expect("node");
    controller_error(ctl.add_node(s, &node(1)), "add_node");

    let dangling = link(&mut alloc, 1, 2);
    controller_error(ctl.add_link(s, &dangling), "add_link");

    ctl.add_node(s, &node(2)).expect("node");
    ctl.add_link(s, &dangling).expect("link");
    controller_error(ctl.add_link(s, &dangling), "add_link");

    let mut wrong_iface = edit(&dangling, LINK_UP_LOSS);
    wrong_iface.iface_a = IfaceId(7);
    controller_error(ctl.edit_link(s, &wrong_iface), "edit_link");

    ctl.add_node(s, &node(3)).expect("node");
    let unknown = link(&mut alloc, 1, 3);
    controller_error(ctl.edit_link(s, &edit(&unknown, LINK_UP_LOSS)), "edit_link");
}

#[test]
fn torn_down_and_unknown_sessions_refuse_calls() {
    let mut ctl = MemoryController::new();
    let s = ctl.create_session().expect("session");
    ctl.teardown_session(s).expect("teardown");
    assert!(ctl.session(s).expect("session").is_torn_down());
    controller_error(ctl.add_node(s, &node(1)), "add_node");
    controller_error(ctl.teardown_session(s), "teardown_session");
    controller_error(
        ctl.set_session_state(SessionId(42), SessionState::Instantiation),
        "set_session_state",
    );
}

#[test]
fn call_log_serializes_as_tagged_json() {
    let mut ctl = MemoryController::new();
    let s = ctl.create_session().expect("session");
    ctl.set_session_state(s, SessionState::Instantiation)
        .expect("state");
    let json = serde_json::to_value(ctl.calls()).expect("serialize");
    assert_eq!(json[0]["call"], "create_session");
    assert_eq!(json[0]["session"], 1);
    assert_eq!(json[1]["call"], "set_session_state");
    assert_eq!(json[1]["state"], "instantiation");
}
