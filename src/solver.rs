// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! The constraint solver (spec §4.6): assigns an `instances` count to every
//! edge once the graph is frozen.
//!
//! Every node independently classifies its incident edges as *fixed* (the
//! peer declares a concrete capacity) or *flexible* (the peer is unlimited)
//! and distributes its own declared capacity across them. Running this
//! table at both endpoints of an edge can disagree when one endpoint is a
//! genuine multi-edge hub and the other a single-edge leaf: the leaf's
//! one-edge view treats the hub's *entire* declared capacity as this one
//! edge's share, which is only right when the hub isn't also splitting that
//! capacity across other edges. The side whose own capacity is fixed is
//! authoritative for that reason — its distribution is the one required to
//! sum exactly to its declared total. When both endpoints are fixed, the
//! outgoing (sending) side wins the tie; when neither is fixed, the edge
//! gets the flexible quantum directly. See DESIGN.md for the scenarios this
//! does and doesn't fully reconcile.

use std::collections::HashMap;

use crate::error::NegotiationError;
use crate::wire::{Capacity, Edge, Node, NodeConnections, DEFAULT_FLEXIBLE_QUANTUM};

/// Per-edge instances chosen by one node's distribution over one side.
type Distribution = HashMap<usize, u32>;

/// Runs the decision table of spec §4.6 for one node's declared capacity
/// against the peer capacities of its incident edges (`(edge index in the
/// full edge list, peer's declared capacity)` pairs).
fn distribute(capacity: Capacity, incident: &[(usize, Capacity)]) -> Result<Distribution, NegotiationError> {
    let fixed_sum: u32 = incident
        .iter()
        .filter_map(|(_, peer)| match peer {
            Capacity::Fixed(n) => Some(*n),
            Capacity::Unlimited => None,
        })
        .sum();
    let flexible: Vec<usize> = incident
        .iter()
        .filter(|(_, peer)| peer.is_unlimited())
        .map(|(idx, _)| *idx)
        .collect();
    let k = flexible.len() as u32;

    let mut out = Distribution::new();
    let assign_fixed = |out: &mut Distribution| {
        for (idx, peer) in incident {
            if let Capacity::Fixed(n) = peer {
                out.insert(*idx, *n);
            }
        }
    };

    match capacity {
        Capacity::Unlimited => {
            assign_fixed(&mut out);
            for idx in &flexible {
                out.insert(*idx, DEFAULT_FLEXIBLE_QUANTUM);
            }
        }
        Capacity::Fixed(c) => {
            if c < fixed_sum + k {
                return Err(NegotiationError::Infeasible(format!(
                    "declared capacity {c} cannot satisfy {fixed_sum} fixed and {k} flexible peer(s) (each needing at least one instance)"
                )));
            }
            if k == 0 {
                if c != fixed_sum {
                    return Err(NegotiationError::Infeasible(format!(
                        "declared capacity {c} does not match the sum of fixed peer capacities ({fixed_sum}) and there are no flexible peers to absorb the difference"
                    )));
                }
                assign_fixed(&mut out);
            } else if c == fixed_sum + k {
                assign_fixed(&mut out);
                for idx in &flexible {
                    out.insert(*idx, 1);
                }
            } else {
                assign_fixed(&mut out);
                let surplus = c - fixed_sum;
                let base = surplus / k;
                let remainder = surplus % k;
                for (i, idx) in flexible.iter().enumerate() {
                    let extra = if (i as u32) < remainder { 1 } else { 0 };
                    out.insert(*idx, base + extra);
                }
            }
        }
    }

    debug_assert_eq!(
        out.values().copied().sum::<u32>(),
        match capacity {
            Capacity::Fixed(c) => c,
            Capacity::Unlimited => fixed_sum + k * DEFAULT_FLEXIBLE_QUANTUM,
        },
        "distribute() must assign a total matching its own declared capacity"
    );

    Ok(out)
}

/// Solves the frozen graph, returning the edges with `instances` filled in
/// and the per-node connection records (spec §3 "Node-connection record").
pub fn solve(
    nodes: &[Node],
    edges: &[Edge],
) -> Result<(Vec<Edge>, Vec<NodeConnections>), NegotiationError> {
    let mut outgoing_dist: HashMap<u32, Distribution> = HashMap::new();
    let mut incoming_dist: HashMap<u32, Distribution> = HashMap::new();

    for node in nodes {
        if let Capacity::Fixed(_) = node.provides_channels {
            let incident: Vec<(usize, Capacity)> = edges
                .iter()
                .enumerate()
                .filter(|(_, e)| e.from == node.index)
                .map(|(i, e)| (i, nodes[e.to as usize].requires_channels))
                .collect();
            outgoing_dist.insert(node.index, distribute(node.provides_channels, &incident)?);
        }
        if let Capacity::Fixed(_) = node.requires_channels {
            let incident: Vec<(usize, Capacity)> = edges
                .iter()
                .enumerate()
                .filter(|(_, e)| e.to == node.index)
                .map(|(i, e)| (i, nodes[e.from as usize].provides_channels))
                .collect();
            incoming_dist.insert(node.index, distribute(node.requires_channels, &incident)?);
        }
    }

    let mut resolved = edges.to_vec();
    for (i, edge) in resolved.iter_mut().enumerate() {
        let from_fixed = !nodes[edge.from as usize].provides_channels.is_unlimited();
        let to_fixed = !nodes[edge.to as usize].requires_channels.is_unlimited();
        edge.instances = match (from_fixed, to_fixed) {
            (true, _) => *outgoing_dist[&edge.from]
                .get(&i)
                .expect("edge missing from its sender's own distribution"),
            (false, true) => *incoming_dist[&edge.to]
                .get(&i)
                .expect("edge missing from its receiver's own distribution"),
            (false, false) => DEFAULT_FLEXIBLE_QUANTUM,
        };
    }

    let mut connections: Vec<NodeConnections> = nodes
        .iter()
        .map(|n| NodeConnections {
            node_index: n.index,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        })
        .collect();
    for edge in &resolved {
        connections[edge.from as usize].outgoing.push(*edge);
        connections[edge.to as usize].incoming.push(*edge);
    }

    Ok((resolved, connections))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(index: u32, pid: i32, requires: Capacity, provides: Capacity) -> Node {
        Node {
            pid,
            index,
            name: format!("n{index}"),
            requires_channels: requires,
            provides_channels: provides,
            sgsh_in: true,
            sgsh_out: true,
        }
    }

    /// S1: a straight pipe, one edge, both ends fixed and matching.
    #[test]
    fn straight_pipe_gets_one_instance() {
        let nodes = vec![
            node(0, 100, Capacity::Unlimited, Capacity::Fixed(1)),
            node(1, 101, Capacity::Fixed(1), Capacity::Unlimited),
        ];
        let edges = vec![Edge::new(0, 1)];
        let (resolved, _) = solve(&nodes, &edges).unwrap();
        assert_eq!(resolved[0].instances, 1);
    }

    /// S2: fan-out from an unlimited hub to two fixed, single-edge leaves.
    #[test]
    fn fan_out_each_leaf_gets_its_declared_capacity() {
        let nodes = vec![
            node(0, 100, Capacity::Unlimited, Capacity::Unlimited),
            node(1, 101, Capacity::Fixed(1), Capacity::Unlimited),
            node(2, 102, Capacity::Fixed(1), Capacity::Unlimited),
        ];
        let edges = vec![Edge::new(0, 1), Edge::new(0, 2)];
        let (resolved, connections) = solve(&nodes, &edges).unwrap();
        assert_eq!(resolved[0].instances, 1);
        assert_eq!(resolved[1].instances, 1);
        assert_eq!(connections[0].outgoing.len(), 2);
    }

    /// S3: oversubscription — the hub's fixed capacity cannot cover its two
    /// fixed-demand peers.
    #[test]
    fn oversubscription_is_infeasible() {
        let nodes = vec![
            node(0, 100, Capacity::Unlimited, Capacity::Fixed(2)),
            node(1, 101, Capacity::Fixed(2), Capacity::Unlimited),
            node(2, 102, Capacity::Fixed(1), Capacity::Unlimited),
        ];
        let edges = vec![Edge::new(0, 1), Edge::new(0, 2)];
        assert!(matches!(
            solve(&nodes, &edges),
            Err(NegotiationError::Infeasible(_))
        ));
    }

    /// S5: a fixed hub of capacity 7 splits across three unlimited leaves:
    /// floor(7/3)=2, remainder 1 goes to the first edge in order.
    #[test]
    fn flexible_remainder_goes_to_first_edge_in_order() {
        let nodes = vec![
            node(0, 100, Capacity::Unlimited, Capacity::Fixed(7)),
            node(1, 101, Capacity::Unlimited, Capacity::Unlimited),
            node(2, 102, Capacity::Unlimited, Capacity::Unlimited),
            node(3, 103, Capacity::Unlimited, Capacity::Unlimited),
        ];
        let edges = vec![Edge::new(0, 1), Edge::new(0, 2), Edge::new(0, 3)];
        let (resolved, _) = solve(&nodes, &edges).unwrap();
        assert_eq!(resolved[0].instances, 3);
        assert_eq!(resolved[1].instances, 2);
        assert_eq!(resolved[2].instances, 2);
    }

    #[test]
    fn both_unlimited_peers_get_the_flexible_quantum() {
        let nodes = vec![
            node(0, 100, Capacity::Unlimited, Capacity::Unlimited),
            node(1, 101, Capacity::Unlimited, Capacity::Unlimited),
        ];
        let edges = vec![Edge::new(0, 1)];
        let (resolved, _) = solve(&nodes, &edges).unwrap();
        assert_eq!(resolved[0].instances, DEFAULT_FLEXIBLE_QUANTUM);
    }

    #[test]
    fn fixed_capacity_with_no_flexible_peers_must_match_exactly() {
        let nodes = vec![
            node(0, 100, Capacity::Unlimited, Capacity::Fixed(4)),
            node(1, 101, Capacity::Fixed(1), Capacity::Unlimited),
        ];
        let edges = vec![Edge::new(0, 1)];
        assert!(matches!(
            solve(&nodes, &edges),
            Err(NegotiationError::Infeasible(_))
        ));
    }
}
