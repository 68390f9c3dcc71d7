// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Tracing setup and log line markers.

use std::env;

use tracing_subscriber::EnvFilter;

pub const RECV: &str = "<--";
pub const SEND: &str = "-->";

/// Directive used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Initialize tracing.
///
/// The filter is read from the `RUST_LOG` environment variable, falling back to
/// [`DEFAULT_LOG_FILTER`]. Safe to call more than once; only the first call installs the
/// subscriber.
///
/// # Errors
///
/// Returns an error if the `RUST_LOG` directives cannot be parsed.
pub fn init_tracing() -> anyhow::Result<()> {
    let directives = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
    let env_filter = EnvFilter::try_new(&directives)
        .map_err(|e| anyhow::anyhow!("Invalid RUST_LOG directives '{directives}': {e}"))?;

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .try_init()
        .is_ok()
    {
        tracing::debug!("Initialized tracing logs with filter {directives}");
    }
    Ok(())
}
