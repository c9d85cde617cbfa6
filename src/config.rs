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

//! The parameter service collaborator (spec §6 / SPEC_FULL §2 ambient):
//! read-only for the duration of one optimization (§5), never mutated by the
//! core itself.

use bitflags::bitflags;

bitflags! {
    /// `OPTIMIZATION_LEVEL`'s bitfield shape: a disable bit, a
    /// skip-execution bit, and dump-plan bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OptimizationLevel: u32 {
        const DISABLE_OPTIMIZATION = 0b0000_0001;
        const SKIP_EXECUTION       = 0b0000_0010;
        const DUMP_QUERY_GRAPH     = 0b0000_0100;
        const DUMP_XASL            = 0b0000_1000;
        const DUMP_PLAN_COST       = 0b0001_0000;
    }
}

impl Default for OptimizationLevel {
    fn default() -> Self {
        OptimizationLevel::empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTraceFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct OptimizerParams {
    pub level: OptimizationLevel,
    pub xasl_debug_dump: bool,
    pub sort_limit_max_count: u32,
    pub query_trace_format: QueryTraceFormat,
}

impl Default for OptimizerParams {
    fn default() -> Self {
        Self {
            level: OptimizationLevel::empty(),
            xasl_debug_dump: false,
            sort_limit_max_count: 1000,
            query_trace_format: QueryTraceFormat::Text,
        }
    }
}

impl OptimizerParams {
    pub fn optimization_disabled(&self) -> bool {
        self.level.contains(OptimizationLevel::DISABLE_OPTIMIZATION)
    }

    pub fn skip_execution(&self) -> bool {
        self.level.contains(OptimizationLevel::SKIP_EXECUTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_fully_optimized_and_executed() {
        let params = OptimizerParams::default();
        assert!(!params.optimization_disabled());
        assert!(!params.skip_execution());
        assert_eq!(params.sort_limit_max_count, 1000);
    }

    #[test]
    fn disable_optimization_bit_is_independent_of_skip_execution() {
        let mut params = OptimizerParams::default();
        params.level |= OptimizationLevel::DISABLE_OPTIMIZATION;
        assert!(params.optimization_disabled());
        assert!(!params.skip_execution());
    }

    #[test]
    fn dump_bits_compose_without_disturbing_each_other() {
        let level = OptimizationLevel::DUMP_QUERY_GRAPH | OptimizationLevel::DUMP_XASL;
        assert!(level.contains(OptimizationLevel::DUMP_QUERY_GRAPH));
        assert!(level.contains(OptimizationLevel::DUMP_XASL));
        assert!(!level.contains(OptimizationLevel::DUMP_PLAN_COST));
    }
}
