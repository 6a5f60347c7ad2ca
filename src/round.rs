// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! The round controller (spec §4.5): drives the negotiation loop from
//! initial creation or first arrival through to DONE or ERROR.

use crate::broadcast;
use crate::competition::{self, Verdict};
use crate::error::NegotiationError;
use crate::graph::{self, SelfDescriptor};
use crate::receiver;
use crate::solver;
use crate::wire::{self, AlternatingChannels, DispatcherTag, FdSide, MessageBlock, StateFlag};

/// What a negotiation produced for the calling tool (spec §6, §4.8).
#[derive(Debug)]
pub struct NegotiationOutcome {
    pub state: StateFlag,
    pub input_fds: Vec<std::os::unix::io::OwnedFd>,
    pub output_fds: Vec<std::os::unix::io::OwnedFd>,
}

fn opposite_or_same(peer: &impl AlternatingChannels, side: FdSide) -> FdSide {
    let opposite = side.opposite();
    if peer.is_active(opposite) {
        opposite
    } else {
        side
    }
}

fn self_index(block: &MessageBlock, descriptor: &SelfDescriptor) -> Result<u32, NegotiationError> {
    block
        .find_node_by_pid(descriptor.pid)
        .map(|n| n.index)
        .ok_or_else(|| {
            NegotiationError::ProtocolStructure("this tool's own node is unregistered".into())
        })
}

/// Runs the full negotiation loop for this tool and returns once it has
/// exchanged pipe descriptors, or hits a fatal error (spec §4.5).
pub fn run(
    descriptor: SelfDescriptor,
    peer: &mut impl AlternatingChannels,
) -> Result<NegotiationOutcome, NegotiationError> {
    let mut chosen: Option<MessageBlock> = None;
    let mut last_departure_serial: Option<u64> = None;

    // Initial state selection (spec §4.5): a tool with sgsh_out && !sgsh_in
    // creates the first block and writes on stdout; everyone else starts by
    // reading.
    if descriptor.sgsh_out && !descriptor.sgsh_in {
        let mut block = MessageBlock::new_initial(descriptor.pid);
        graph::register_arrival(&mut block, &descriptor, None)?;
        let index = self_index(&block, &descriptor)?;
        block.dispatcher = Some(DispatcherTag {
            index,
            fd_direction: FdSide::Stdout,
        });
        last_departure_serial = Some(block.serial_no);
        wire::write_message(peer, &block, FdSide::Stdout)?;
        chosen = Some(block);
    }

    loop {
        let (incoming, arrival_side) = wire::read_message(peer)?;
        match incoming.state {
            StateFlag::Error => {
                return Err(NegotiationError::ProtocolStructure(
                    "peer transitioned to the ERROR state".into(),
                ))
            }

            StateFlag::SolutionShare => {
                let forward_side = opposite_or_same(peer, arrival_side);
                let mut block = incoming;
                let index = self_index(&block, &descriptor)?;
                block.dispatcher = Some(DispatcherTag {
                    index,
                    fd_direction: forward_side,
                });
                wire::write_message(peer, &block, forward_side)?;
                return finish_solution_share(&block, index);
            }

            // Never observed on the wire under the initiator-gated detection
            // scheme below, but handled for robustness (spec §4.5's literal
            // transition still names it).
            StateFlag::NegotiationEnd => {
                let mut block = incoming;
                return solve_and_broadcast(&descriptor, peer, &mut block, arrival_side);
            }

            StateFlag::Negotiation => {
                let mut incoming = incoming;
                let dispatcher = incoming.dispatcher.ok_or_else(|| {
                    NegotiationError::ProtocolStructure(
                        "negotiation block carries no dispatcher tag".into(),
                    )
                })?;

                let verdict = competition::compete(chosen.as_ref(), &incoming);
                let mut surviving = match verdict {
                    Verdict::Suppress => continue,
                    Verdict::AdoptIncoming => incoming,
                    Verdict::KeepCurrent => chosen
                        .take()
                        .expect("KeepCurrent implies a currently held block"),
                };
                graph::register_arrival(
                    &mut surviving,
                    &descriptor,
                    Some((dispatcher.index, arrival_side)),
                )?;

                if surviving.initiator_pid == descriptor.pid
                    && last_departure_serial == Some(surviving.serial_no)
                {
                    return solve_and_broadcast(&descriptor, peer, &mut surviving, arrival_side);
                }

                let forward_side = opposite_or_same(peer, arrival_side);
                let index = self_index(&surviving, &descriptor)?;
                surviving.dispatcher = Some(DispatcherTag {
                    index,
                    fd_direction: forward_side,
                });
                wire::write_message(peer, &surviving, forward_side)?;
                if surviving.initiator_pid == descriptor.pid {
                    last_departure_serial = Some(surviving.serial_no);
                }
                chosen = Some(surviving);
            }
        }
    }
}

fn solve_and_broadcast(
    descriptor: &SelfDescriptor,
    peer: &mut impl AlternatingChannels,
    block: &mut MessageBlock,
    arrival_side: FdSide,
) -> Result<NegotiationOutcome, NegotiationError> {
    let (resolved_edges, solution) = solver::solve(&block.nodes, &block.edges)?;
    block.edges = resolved_edges;
    block.solution = Some(solution);
    block.state = StateFlag::SolutionShare;
    block.serial_no += 1;

    let forward_side = opposite_or_same(peer, arrival_side);
    let index = self_index(block, descriptor)?;
    block.dispatcher = Some(DispatcherTag {
        index,
        fd_direction: forward_side,
    });
    wire::write_message(peer, block, forward_side)?;
    finish_solution_share(block, index)
}

fn finish_solution_share(
    block: &MessageBlock,
    self_index: u32,
) -> Result<NegotiationOutcome, NegotiationError> {
    let solution = block.solution.as_ref().ok_or_else(|| {
        NegotiationError::ProtocolStructure("SOLUTION_SHARE block carries no solution".into())
    })?;
    let mine = solution
        .iter()
        .find(|c| c.node_index == self_index)
        .ok_or_else(|| {
            NegotiationError::ProtocolStructure(
                "graph solution carries no entry for this tool's node".into(),
            )
        })?;

    let output_fds = broadcast::send_outgoing(&mine.outgoing)?;
    let input_fds = receiver::receive_incoming(&mine.incoming)?;
    Ok(NegotiationOutcome {
        state: StateFlag::SolutionShare,
        input_fds,
        output_fds,
    })
}
