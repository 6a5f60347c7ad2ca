// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! The competition rule (spec §4.4): which of two message blocks is
//! authoritative, and whether the survivor should be forwarded.

use crate::wire::MessageBlock;

/// The result of comparing a locally held block (if any) against a freshly
/// arrived one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Adopt the incoming block; forward it after registering self/edge.
    AdoptIncoming,
    /// Keep the currently held block and forward it (the "same block coming
    /// around" case where the incoming copy is stale).
    KeepCurrent,
    /// Discard the incoming block; do not forward anything.
    Suppress,
}

/// Applies spec §4.4's lexicographic rule. `current` is `None` on a tool's
/// very first arrival, before it has anything to compare against.
pub fn compete(current: Option<&MessageBlock>, incoming: &MessageBlock) -> Verdict {
    let Some(current) = current else {
        return Verdict::AdoptIncoming;
    };
    if incoming.initiator_pid < current.initiator_pid {
        Verdict::AdoptIncoming
    } else if incoming.initiator_pid > current.initiator_pid {
        Verdict::Suppress
    } else if incoming.serial_no > current.serial_no {
        Verdict::AdoptIncoming
    } else {
        Verdict::KeepCurrent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::StateFlag;

    fn block(initiator_pid: i32, serial_no: u64) -> MessageBlock {
        let mut b = MessageBlock::new_initial(initiator_pid);
        b.state = StateFlag::Negotiation;
        b.serial_no = serial_no;
        b
    }

    #[test]
    fn first_arrival_is_always_adopted() {
        assert_eq!(compete(None, &block(100, 0)), Verdict::AdoptIncoming);
    }

    #[test]
    fn smaller_initiator_pid_wins() {
        let current = block(200, 5);
        let incoming = block(100, 0);
        assert_eq!(compete(Some(&current), &incoming), Verdict::AdoptIncoming);
    }

    #[test]
    fn larger_initiator_pid_is_suppressed() {
        let current = block(100, 5);
        let incoming = block(200, 0);
        assert_eq!(compete(Some(&current), &incoming), Verdict::Suppress);
    }

    #[test]
    fn same_initiator_higher_serial_wins() {
        let current = block(100, 5);
        let incoming = block(100, 6);
        assert_eq!(compete(Some(&current), &incoming), Verdict::AdoptIncoming);
    }

    #[test]
    fn same_initiator_stale_serial_keeps_current() {
        let current = block(100, 6);
        let incoming = block(100, 5);
        assert_eq!(compete(Some(&current), &incoming), Verdict::KeepCurrent);
    }
}
