use std::collections::HashSet;
use std::net::Ipv4Addr;

use crate::Error;
use crate::id::{IfaceId, NodeId, SubnetId};
use crate::replay::{AddressingConfig, InterfaceAllocator, NodePair};

fn pair(a: u32, b: u32) -> NodePair {
    NodePair::new(NodeId(a), NodeId(b))
}

fn allocator() -> InterfaceAllocator {
    InterfaceAllocator::new(AddressingConfig::default()).expect("default addressing")
}

#[test]
fn node_pair_is_unordered() {
    assert_eq!(pair(7, 3), pair(3, 7));
    assert_eq!(pair(7, 3).low(), NodeId(3));
    assert_eq!(pair(7, 3).high(), NodeId(7));
}

#[test]
fn first_link_gets_subnet_zero_with_fixed_hosts() {
    let mut alloc = allocator();
    let link = alloc.allocate(pair(2, 1)).expect("allocate").clone();
    assert_eq!(link.subnet, SubnetId(0));
    assert_eq!(link.iface_a.ip4, Ipv4Addr::new(10, 0, 0, 20));
    assert_eq!(link.iface_b.ip4, Ipv4Addr::new(10, 0, 0, 21));
    assert_eq!(link.iface_a.ip4_mask, 24);
    assert_eq!(link.iface_a.id, IfaceId(0));
    assert_eq!(link.iface_b.id, IfaceId(0));
}

#[test]
fn allocation_is_idempotent_per_pair() {
    let mut alloc = allocator();
    let first = alloc.allocate(pair(1, 2)).expect("allocate").clone();
    let again = alloc.allocate(pair(2, 1)).expect("allocate").clone();
    assert_eq!(first, again);
    assert_eq!(alloc.len(), 1);

    let other = alloc.allocate(pair(1, 3)).expect("allocate").clone();
    assert_eq!(other.subnet, SubnetId(1));
    assert_eq!(other.iface_a.ip4, Ipv4Addr::new(10, 0, 1, 20));
}

#[test]
fn interface_ids_are_dense_per_node() {
    let mut alloc = allocator();
    let a = alloc.allocate(pair(1, 2)).expect("allocate").clone();
    let b = alloc.allocate(pair(1, 3)).expect("allocate").clone();
    let c = alloc.allocate(pair(3, 2)).expect("allocate").clone();

    assert_eq!(a.iface_a.id, IfaceId(0)); // 节点 1
    assert_eq!(b.iface_a.id, IfaceId(1)); // 节点 1
    assert_eq!(a.iface_b.id, IfaceId(0)); // 节点 2
    assert_eq!(c.iface_a.id, IfaceId(1)); // 节点 2
    assert_eq!(b.iface_b.id, IfaceId(0)); // 节点 3
    assert_eq!(c.iface_b.id, IfaceId(1)); // 节点 3
}

#[test]
fn mac_addresses_are_unique_and_locally_administered() {
    let mut alloc = allocator();
    let mut macs = HashSet::new();
    for b in 2..20 {
        let link = alloc.allocate(pair(1, b)).expect("allocate").clone();
        assert_eq!(link.iface_a.mac.0[0], 0x02);
        assert!(macs.insert(link.iface_a.mac));
        assert!(macs.insert(link.iface_b.mac));
    }
    assert_eq!(macs.len(), 36);
    assert_eq!(
        crate::replay::MacAddr([0x02, 0, 0, 0, 0, 0x1f]).to_string(),
        "02:00:00:00:00:1f"
    );
}

#[test]
fn capacity_is_exhausted_after_255_links() {
    let mut alloc = allocator();
    for b in 1..=255 {
        alloc.allocate(pair(0, b)).expect("within capacity");
    }
    assert_eq!(alloc.len(), 255);
    // 已分配的节点对仍然可以查询
    assert!(alloc.allocate(pair(0, 255)).is_ok());

    let err = alloc.allocate(pair(0, 256)).expect_err("capacity");
    assert!(matches!(err, Error::CapacityExceeded { capacity: 255 }));
    assert!(alloc.get(&pair(0, 256)).is_none());
}

#[test]
fn smaller_capacity_and_custom_block() {
    let cfg = AddressingConfig {
        block: [192, 168],
        subnet_capacity: 2,
        ..AddressingConfig::default()
    };
    let mut alloc = InterfaceAllocator::new(cfg).expect("config");
    let link = alloc.allocate(pair(1, 2)).expect("allocate").clone();
    assert_eq!(link.iface_b.ip4, Ipv4Addr::new(192, 168, 0, 21));
    alloc.allocate(pair(1, 3)).expect("allocate");
    assert!(matches!(
        alloc.allocate(pair(2, 3)),
        Err(Error::CapacityExceeded { capacity: 2 })
    ));
}

#[test]
fn invalid_addressing_is_rejected() {
    let zero = AddressingConfig {
        subnet_capacity: 0,
        ..AddressingConfig::default()
    };
    assert!(matches!(InterfaceAllocator::new(zero), Err(Error::Config(_))));

    let same_host = AddressingConfig {
        host_a: 5,
        host_b: 5,
        ..AddressingConfig::default()
    };
    assert!(matches!(
        InterfaceAllocator::new(same_host),
        Err(Error::Config(_))
    ));
}
