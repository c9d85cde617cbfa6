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

//! The plan-search seam (spec §1 Non-goals: "choosing the winning plan (we
//! serve plans, we don't search them)"; §4.7, §4.12: "Given a chosen plan...
//! emits an execution tree").
//!
//! `qo_planner_search`/`qo_to_xasl` are named in spec §1 as external
//! collaborators this crate invokes but never implements. [`PlanSearch`] is
//! that invocation point: an external cost-based enumerator implements it
//! over the [`Env`] this crate builds, and [`crate::xasl`] lowers whatever
//! [`ChosenPlan`] it returns. This crate ships no implementation of the
//! trait, the same way [`crate::catalog::SchemaCatalog`] ships none — both
//! are seams, proven out only by the mock catalogs/plans in `#[cfg(test)]`.

use crate::env::Env;
use crate::error::Result;
use crate::graph::{IndexId, NodeId, PartitionId};

/// How one node's scan is driven: a full heap scan, or an index scan keyed
/// by a specific [`IndexId`] discovered for that node (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessChoice {
    Sequential,
    Index(IndexId),
}

/// The plan search's decision for one node in its chosen join order:
/// which access path to drive it with, at the position it occupies in the
/// left-deep join order the search settled on.
#[derive(Debug, Clone, Copy)]
pub struct NodePlan {
    pub node: NodeId,
    pub access: AccessChoice,
}

/// A fully decided physical plan for one [`crate::graph::Partition`], as
/// handed to [`crate::xasl`] lowering. Every field here is something the
/// plan search alone can determine (it has seen costs; this crate has not):
/// join order, access method per node, and the handful of post-planner
/// annotations spec §3's Index entry/§4.11 name (`orderby_skip`,
/// `groupby_skip`, multi-range optimization eligibility).
#[derive(Debug, Clone)]
pub struct ChosenPlan {
    /// Left-deep join order, one entry per node of the partition, outer to
    /// inner.
    pub order: Vec<NodePlan>,
    /// True iff the chosen access path already produces rows in the
    /// statement's `ORDER BY` order, so the `ORDER BY` list can be dropped
    /// and no sort step is needed (§4.11, §8 scenario 6).
    pub orderby_skip: bool,
    /// True iff the chosen access path already produces rows in `GROUP BY`
    /// order, so grouping can be done streaming rather than by a separate
    /// sort+group step.
    pub groupby_skip: bool,
    /// True when the plan search additionally chose a multi-range-scan
    /// optimization (MRO) for this partition, which makes
    /// ordby-num-to-key-limit rewriting eligible (§4.11).
    pub multi_range_optimization: bool,
}

impl ChosenPlan {
    /// Sequential scan of every node in `Env`'s own (FROM-list) order, no
    /// post-planner annotations set. A reasonable fallback a caller without
    /// a real cost-based search can hand to [`crate::xasl`] to get a
    /// correct, if unoptimized, plan — matching the degraded path spec §7
    /// describes for an optimizer that declines to run.
    pub fn sequential_fallback(e: &Env) -> Self {
        ChosenPlan {
            order: e
                .nodes
                .iter()
                .map(|(id, _)| NodePlan {
                    node: id,
                    access: AccessChoice::Sequential,
                })
                .collect(),
            orderby_skip: false,
            groupby_skip: false,
            multi_range_optimization: false,
        }
    }
}

/// The external plan enumerator/costing engine's interface into this crate.
/// Never implemented here (§1: out of scope); [`crate::xasl::assemble`]
/// takes a [`ChosenPlan`] directly so tests can supply one without a real
/// implementation of this trait.
pub trait PlanSearch {
    fn choose_plan(&self, env: &Env, partition: PartitionId) -> Result<ChosenPlan>;
}
