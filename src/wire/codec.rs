// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Encoding and decoding of a [`MessageBlock`] as the sequence of chunks
//! described in spec §4.2.

use bincode::Options;
use serde::{Deserialize, Serialize};

use super::edge::Edge;
use super::header::WireHeader;
use super::message::MessageBlock;
use super::node::{Node, WireNode};
use super::solution::{NodeConnections, SolutionHeader};
use super::types::{FdSide, StateFlag};
use crate::error::{NegotiationError, TransportError};

/// Upper bound on how many node/edge/solution records a single chunk may
/// claim, guarding against an absurd header turning a short read into an
/// unbounded allocation (spec §4.2 "over-sized message").
const MAX_RECORDS: u32 = 1 << 20;

fn codec_options() -> impl Options {
    bincode::options()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

fn wire_size_of<T: Serialize>(template: &T) -> usize {
    codec_options()
        .serialized_size(template)
        .expect("fixed-width wire record must be sizeable") as usize
}

fn encode_into<T: Serialize>(value: &T) -> Result<Vec<u8>, NegotiationError> {
    codec_options()
        .serialize(value)
        .map_err(|e| NegotiationError::Transport(TransportError::Codec(e)))
}

fn decode_from<T: for<'de> Deserialize<'de>>(buf: &[u8]) -> Result<T, NegotiationError> {
    codec_options()
        .deserialize(buf)
        .map_err(|e| NegotiationError::Transport(TransportError::Codec(e)))
}

fn decode_array<T: for<'de> Deserialize<'de>>(
    buf: &[u8],
    count: usize,
    record_size: usize,
) -> Result<Vec<T>, NegotiationError> {
    let mut out = Vec::with_capacity(count);
    let mut offset = 0;
    for _ in 0..count {
        let record = decode_from(&buf[offset..offset + record_size])?;
        out.push(record);
        offset += record_size;
    }
    Ok(out)
}

fn check_record_count(count: u32) -> Result<(), NegotiationError> {
    if count > MAX_RECORDS {
        return Err(NegotiationError::Transport(TransportError::Oversize {
            limit: MAX_RECORDS as usize,
            actual: count as usize,
        }));
    }
    Ok(())
}

/// A pair of standard channels a tool can alternate non-blocking reads and
/// writes across (spec §4.2, §5). Implemented by [`crate::platform::PeerChannels`];
/// kept as a trait here so the codec has no dependency on raw file
/// descriptors or `nix`.
pub trait AlternatingChannels {
    /// Reads exactly `buf.len()` bytes, trying every sgsh-active side in
    /// turn; returns which side delivered them.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<FdSide, NegotiationError>;

    /// Writes `buf` in full on the named side.
    fn write_chunk(&mut self, side: FdSide, buf: &[u8]) -> Result<(), NegotiationError>;

    /// Whether `side` is sgsh-active for this tool (spec §4.2's narrowing).
    fn is_active(&self, side: FdSide) -> bool;
}

/// Reads one message block, per spec §4.2. Returns the block and the side it
/// arrived on (the round controller inverts its forwarding direction from
/// this).
pub fn read_message(
    peer: &mut impl AlternatingChannels,
) -> Result<(MessageBlock, FdSide), NegotiationError> {
    let header_template = WireHeader::template();
    let header_size = wire_size_of(&header_template);
    let mut header_buf = vec![0u8; header_size];
    let side = peer.read_chunk(&mut header_buf)?;
    let header: WireHeader = decode_from(&header_buf)?;

    check_record_count(header.n_nodes)?;
    let node_template = WireNode::template();
    let node_size = wire_size_of(&node_template);
    let mut nodes_buf = vec![0u8; header.n_nodes as usize * node_size];
    if !nodes_buf.is_empty() {
        peer.read_chunk(&mut nodes_buf)?;
    }
    let wire_nodes: Vec<WireNode> =
        decode_array(&nodes_buf, header.n_nodes as usize, node_size)?;
    let nodes = wire_nodes.into_iter().map(Node::from_wire).collect();

    let state = header.state_flag;
    let (edges, solution) = match state {
        StateFlag::Negotiation => {
            check_record_count(header.n_edges)?;
            let edge_size = wire_size_of(&Edge::new(0, 0));
            let mut edges_buf = vec![0u8; header.n_edges as usize * edge_size];
            if !edges_buf.is_empty() {
                peer.read_chunk(&mut edges_buf)?;
            }
            let edges = decode_array(&edges_buf, header.n_edges as usize, edge_size)?;
            (edges, None)
        }
        StateFlag::SolutionShare => {
            let solution = read_solution(peer, header.n_nodes as usize)?;
            (Vec::new(), Some(solution))
        }
        StateFlag::NegotiationEnd | StateFlag::Error => (Vec::new(), None),
    };

    let dispatcher = header.dispatcher()?;
    let block = MessageBlock {
        version: header.version,
        nodes,
        edges,
        initiator_pid: header.initiator_pid,
        state,
        serial_no: header.serial_no,
        dispatcher,
        solution,
    };
    Ok((block, side))
}

/// Writes one message block on `side`, per spec §4.2.
pub fn write_message(
    peer: &mut impl AlternatingChannels,
    block: &MessageBlock,
    side: FdSide,
) -> Result<(), NegotiationError> {
    let header = WireHeader::from_block(block);
    peer.write_chunk(side, &encode_into(&header)?)?;

    let mut nodes_buf = Vec::new();
    for node in &block.nodes {
        nodes_buf.extend(encode_into(&node.to_wire())?);
    }
    if !nodes_buf.is_empty() {
        peer.write_chunk(side, &nodes_buf)?;
    }

    match block.state {
        StateFlag::Negotiation => {
            let mut edges_buf = Vec::new();
            for edge in &block.edges {
                edges_buf.extend(encode_into(edge)?);
            }
            if !edges_buf.is_empty() {
                peer.write_chunk(side, &edges_buf)?;
            }
        }
        StateFlag::SolutionShare => {
            let solution = block.solution.as_deref().ok_or_else(|| {
                NegotiationError::ProtocolStructure(
                    "SOLUTION_SHARE block carries no solution".into(),
                )
            })?;
            write_solution(peer, side, solution)?;
        }
        StateFlag::NegotiationEnd | StateFlag::Error => {}
    }
    Ok(())
}

fn read_solution(
    peer: &mut impl AlternatingChannels,
    n_nodes: usize,
) -> Result<Vec<NodeConnections>, NegotiationError> {
    let header_size = wire_size_of(&SolutionHeader {
        node_index: 0,
        n_incoming: 0,
        n_outgoing: 0,
    });
    let mut headers_buf = vec![0u8; n_nodes * header_size];
    if !headers_buf.is_empty() {
        peer.read_chunk(&mut headers_buf)?;
    }
    let headers: Vec<SolutionHeader> = decode_array(&headers_buf, n_nodes, header_size)?;

    let edge_size = wire_size_of(&Edge::new(0, 0));
    let mut out = Vec::with_capacity(n_nodes);
    for h in headers {
        check_record_count(h.n_incoming)?;
        check_record_count(h.n_outgoing)?;

        let mut incoming_buf = vec![0u8; h.n_incoming as usize * edge_size];
        if !incoming_buf.is_empty() {
            peer.read_chunk(&mut incoming_buf)?;
        }
        let incoming = decode_array(&incoming_buf, h.n_incoming as usize, edge_size)?;

        let mut outgoing_buf = vec![0u8; h.n_outgoing as usize * edge_size];
        if !outgoing_buf.is_empty() {
            peer.read_chunk(&mut outgoing_buf)?;
        }
        let outgoing = decode_array(&outgoing_buf, h.n_outgoing as usize, edge_size)?;

        out.push(NodeConnections {
            node_index: h.node_index,
            incoming,
            outgoing,
        });
    }
    Ok(out)
}

fn write_solution(
    peer: &mut impl AlternatingChannels,
    side: FdSide,
    solution: &[NodeConnections],
) -> Result<(), NegotiationError> {
    let mut headers_buf = Vec::new();
    for connections in solution {
        headers_buf.extend(encode_into(&SolutionHeader::of(connections))?);
    }
    if !headers_buf.is_empty() {
        peer.write_chunk(side, &headers_buf)?;
    }

    for connections in solution {
        let mut incoming_buf = Vec::new();
        for edge in &connections.incoming {
            incoming_buf.extend(encode_into(edge)?);
        }
        if !incoming_buf.is_empty() {
            peer.write_chunk(side, &incoming_buf)?;
        }

        let mut outgoing_buf = Vec::new();
        for edge in &connections.outgoing {
            outgoing_buf.extend(encode_into(edge)?);
        }
        if !outgoing_buf.is_empty() {
            peer.write_chunk(side, &outgoing_buf)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::types::Capacity;
    use std::collections::VecDeque;

    /// An in-memory stand-in for the two standard channels, used to test the
    /// codec without touching real file descriptors.
    struct MemChannels {
        stdin: VecDeque<u8>,
        stdout: VecDeque<u8>,
        written: Vec<(FdSide, Vec<u8>)>,
    }

    impl AlternatingChannels for MemChannels {
        fn read_chunk(&mut self, buf: &mut [u8]) -> Result<FdSide, NegotiationError> {
            let (side, queue) = if self.stdin.len() >= buf.len() {
                (FdSide::Stdin, &mut self.stdin)
            } else {
                (FdSide::Stdout, &mut self.stdout)
            };
            if queue.len() < buf.len() {
                return Err(NegotiationError::Transport(TransportError::ShortRead {
                    expected: buf.len(),
                    got: queue.len(),
                }));
            }
            for slot in buf.iter_mut() {
                *slot = queue.pop_front().unwrap();
            }
            Ok(side)
        }

        fn write_chunk(&mut self, side: FdSide, buf: &[u8]) -> Result<(), NegotiationError> {
            self.written.push((side, buf.to_vec()));
            match side {
                FdSide::Stdin => self.stdin.extend(buf),
                FdSide::Stdout => self.stdout.extend(buf),
            }
            Ok(())
        }

        fn is_active(&self, _side: FdSide) -> bool {
            true
        }
    }

    fn sample_node(pid: i32, index: u32) -> Node {
        Node {
            pid,
            index,
            name: "tr".to_string(),
            requires_channels: Capacity::Fixed(1),
            provides_channels: Capacity::Unlimited,
            sgsh_in: true,
            sgsh_out: false,
        }
    }

    #[test]
    fn round_trips_negotiation_block() {
        let block = MessageBlock {
            version: super::message::PROTOCOL_VERSION,
            nodes: vec![sample_node(100, 0), sample_node(101, 1)],
            edges: vec![Edge::new(0, 1)],
            initiator_pid: 100,
            state: StateFlag::Negotiation,
            serial_no: 3,
            dispatcher: None,
            solution: None,
        };
        let mut channels = MemChannels {
            stdin: VecDeque::new(),
            stdout: VecDeque::new(),
            written: Vec::new(),
        };
        write_message(&mut channels, &block, FdSide::Stdout).unwrap();
        let (decoded, side) = read_message(&mut channels).unwrap();
        assert_eq!(side, FdSide::Stdout);
        assert_eq!(decoded.nodes.len(), 2);
        assert_eq!(decoded.nodes[0].pid, 100);
        assert_eq!(decoded.nodes[0].provides_channels, Capacity::Unlimited);
        assert_eq!(decoded.edges, block.edges);
        assert_eq!(decoded.serial_no, 3);
    }

    #[test]
    fn round_trips_solution_block() {
        let block = MessageBlock {
            version: super::message::PROTOCOL_VERSION,
            nodes: vec![sample_node(100, 0)],
            edges: Vec::new(),
            initiator_pid: 100,
            state: StateFlag::SolutionShare,
            serial_no: 9,
            dispatcher: None,
            solution: Some(vec![NodeConnections {
                node_index: 0,
                incoming: vec![],
                outgoing: vec![Edge {
                    from: 0,
                    to: 1,
                    instances: 3,
                }],
            }]),
        };
        let mut channels = MemChannels {
            stdin: VecDeque::new(),
            stdout: VecDeque::new(),
            written: Vec::new(),
        };
        write_message(&mut channels, &block, FdSide::Stdin).unwrap();
        let (decoded, _) = read_message(&mut channels).unwrap();
        let solution = decoded.solution.unwrap();
        assert_eq!(solution.len(), 1);
        assert_eq!(solution[0].outgoing[0].instances, 3);
    }
}
