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

//! Query graph builder and plan lowering core of a relational query optimizer.
//!
//! This crate ingests an already-bound, already-typed parse tree ([`parse_tree`])
//! and produces two things:
//!
//! - a *query graph* ([`env::Env`]/[`graph`]): nodes, segments, terms, edges,
//!   partitions and an inventory of usable indexes, ready for an external plan
//!   search (see [`planner::PlanSearch`]) to pick a join order and access
//!   paths over; and
//! - given such a chosen plan, an executable [`xasl`] tree the runtime engine
//!   can interpret.
//!
//! Choosing the winning plan, rewriting the parse tree, executing the plan,
//! and the SQL grammar itself are all out of scope; see `SPEC_FULL.md`.

pub mod access_spec;
pub mod arena;
pub mod bitset;
pub mod catalog;
pub mod config;
pub mod edges;
pub mod env;
pub mod error;
pub mod graph;
pub mod graph_builder;
pub mod index_discovery;
pub mod outer_join;
pub mod parse_tree;
pub mod planner;
pub mod predicate;
pub mod regu;
pub mod symbol_table;
pub mod term_analyzer;
pub mod value;
pub mod xasl;

#[cfg(test)]
mod test_support;

pub use env::Env;
pub use error::{Error, Result};
