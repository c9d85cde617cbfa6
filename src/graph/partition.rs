// Copyright 2022 Singularity Data
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Partition: a connected component of the join graph, handed independently
//! to the plan search (§3 Data Model, "Partition"; §4.6 Edge & partition
//! discovery).

use crate::graph::{NodeId, NodeSet, TermSet};

/// A partition's node count cannot exceed the number of bits a single
/// `usize`-keyed rank/order encoding can address, minus two guard bits the
/// plan search reserves for an empty-set and a full-set sentinel
/// (`qo_partition`'s `MAX_JOIN_PARTITION_NODES` equivalent). On a 64-bit
/// host this is `64 - 2 = 62`; a query this wide should fail graph
/// construction (§5 resource limits) rather than silently truncate.
pub const MAX_PARTITION_NODES: usize = usize::BITS as usize - 2;

/// One connected component of the join graph: a set of nodes together with
/// the edges (two-or-more-node terms) wholly contained in it, and the
/// outer-join dependencies that must be respected when the plan search
/// orders them.
#[derive(Debug, Clone)]
pub struct Partition {
    pub id: crate::graph::PartitionId,
    pub nodes: NodeSet,
    pub edges: TermSet,
    /// Union, over every node in this partition, of that node's
    /// `outer_dep_set`; nodes outside the partition this one's plan must
    /// already have placed before the plan search can consider it.
    pub dependencies: NodeSet,
    /// Dense `0..nodes.len()` position assigned to each member node, the
    /// bit index the plan search's subset-enumeration encoding actually
    /// uses (`qo_partition::nodes[]` order).
    pub node_order: Vec<NodeId>,
}

impl Partition {
    /// Position of `node` within [`Self::node_order`], the index the plan
    /// search's subset bitmask uses for it. `None` if `node` is not a
    /// member of this partition.
    pub fn local_index(&self, node: NodeId) -> Option<usize> {
        self.node_order.iter().position(|&n| n == node)
    }
}
