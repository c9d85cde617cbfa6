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

//! Error kinds for the optimizer core (spec §7).
//!
//! The original implementation this crate is modeled on threads a single
//! intra-function escape point (`catch_`/`QO_ABORT`) through every allocation
//! and invariant check site of one optimization. There is no suspension point
//! and no cross-phase escape (§5), so an ordinary `Result` propagated with `?`
//! is a faithful, safe replacement: on any `Err`, the caller drops the
//! partially built `Env`/XASL whole rather than trying to salvage it.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Allocation failure anywhere during graph or XASL construction. The
    /// caller should fall back to an unoptimized execution path.
    #[error("out of memory constructing query graph: {0}")]
    ResourceExhausted(String),

    /// The query is structurally outside what this core can graph: too many
    /// FROM-list entries, or a conjunct shape `qo_validate` doesn't accept.
    #[error("unsupported query shape: {reason}")]
    Unsupported { reason: String },

    /// An internal invariant was violated. In the original this aborts the
    /// process in debug builds; here it is always a recoverable error, with
    /// the call site recorded the way `QO_ASSERT` records file/line.
    #[error("internal optimizer invariant violated at {file}:{line}: {msg}")]
    Internal {
        msg: String,
        file: &'static str,
        line: u32,
    },
}

/// The `Result`-propagation analog of `QO_ASSERT`/`QO_ABORT`: logs at error
/// severity with the call site and returns early with [`Error::Internal`].
macro_rules! qo_assert {
    ($cond:expr, $($msg:tt)*) => {
        if !($cond) {
            let msg = format!($($msg)*);
            tracing::error!(file = file!(), line = line!(), "{msg}");
            return Err($crate::error::Error::Internal {
                msg,
                file: file!(),
                line: line!(),
            });
        }
    };
}

pub(crate) use qo_assert;
