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

//! Logging utilities
//!
//! The crate logs through the `log` facade; these helpers install
//! `env_logger` for hosts (simulations, test binaries) that have no logger.

/// Initialize logging with default configuration (`RUST_LOG`)
pub fn init_logging() {
    env_logger::init();
}

/// Initialize logging with specific level
pub fn init_logging_with_level(level: log::LevelFilter) {
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// Initialize logging unless a logger is already installed.
///
/// Returns `false` when another logger was already in place.
pub fn try_init_logging() -> bool {
    env_logger::Builder::from_default_env().try_init().is_ok()
}

#[macro_export]
macro_rules! srmpi_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! srmpi_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! srmpi_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! srmpi_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

#[macro_export]
macro_rules! srmpi_trace {
    ($($arg:tt)*) => {
        log::trace!($($arg)*)
    };
}
