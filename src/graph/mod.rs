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

//! The query-graph data model (spec §3): nodes, segments, terms, index
//! entries, partitions, and correlated-subquery descriptors, all referenced
//! by the typed indices of [`crate::arena`].

pub mod index;
pub mod node;
pub mod partition;
pub mod segment;
pub mod subquery;
pub mod term;

use crate::arena::Id;
use crate::bitset::TypedBitSet;

pub use index::IndexEntry;
pub use node::Node;
pub use partition::Partition;
pub use segment::Segment;
pub use subquery::Subquery;
pub use term::Term;

pub type NodeId = Id<Node>;
pub type SegId = Id<Segment>;
pub type TermId = Id<Term>;
pub type IndexId = Id<IndexEntry>;
pub type PartitionId = Id<Partition>;
pub type SubqueryId = Id<Subquery>;

pub type NodeSet = TypedBitSet<Node>;
pub type SegSet = TypedBitSet<Segment>;
pub type TermSet = TypedBitSet<Term>;
pub type SubquerySet = TypedBitSet<Subquery>;
