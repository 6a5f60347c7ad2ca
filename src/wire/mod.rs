// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! The message-block data model and wire codec (spec §3, §4.2).

mod codec;
mod edge;
mod fixed_name;
mod header;
mod message;
mod node;
mod solution;
mod types;

pub use codec::{read_message, write_message, AlternatingChannels};
pub use edge::Edge;
pub use message::{MessageBlock, PROTOCOL_VERSION};
pub use node::Node;
pub use solution::NodeConnections;
pub use types::{Capacity, DispatcherTag, FdSide, StateFlag, DEFAULT_FLEXIBLE_QUANTUM, NODE_NAME_LEN};
