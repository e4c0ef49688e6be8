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

//! Error handling for bridge operations
//!
//! Errors fall into three groups that callers treat differently:
//! connection failures (fatal to session initialization), store operation
//! failures (non-fatal, reported to the coordinator only) and process-group
//! communication failures.

use std::fmt;

/// Stable error codes, one per error class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    KeyError = 2,
    TypeError = 3,
    Invalid = 4,
    SerializationError = 11,
    ConnectionError = 20,
    StoreError = 21,
    CommunicationError = 22,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::KeyError => write!(f, "Key error"),
            Code::TypeError => write!(f, "Type error"),
            Code::Invalid => write!(f, "Invalid"),
            Code::SerializationError => write!(f, "Serialization error"),
            Code::ConnectionError => write!(f, "Connection error"),
            Code::StoreError => write!(f, "Store error"),
            Code::CommunicationError => write!(f, "Communication error"),
        }
    }
}

/// Main error type for bridge operations
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Key not found: {0}")]
    KeyError(String),

    #[error("Store operation failed: {0}")]
    Store(String),

    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Communication error: {0}")]
    Communication(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid operation: {0}")]
    Invalid(String),
}

impl BridgeError {
    /// Get the error code
    pub fn code(&self) -> Code {
        match self {
            BridgeError::Connection(_) => Code::ConnectionError,
            BridgeError::KeyError(_) => Code::KeyError,
            BridgeError::Store(_) => Code::StoreError,
            #[cfg(feature = "redis")]
            BridgeError::Redis(e) if e.is_connection_refusal() => Code::ConnectionError,
            #[cfg(feature = "redis")]
            BridgeError::Redis(_) => Code::StoreError,
            BridgeError::Communication(_) => Code::CommunicationError,
            BridgeError::TypeError(_) => Code::TypeError,
            BridgeError::Serialization(_) => Code::SerializationError,
            BridgeError::Invalid(_) => Code::Invalid,
        }
    }

    /// Whether this error came from a put/get/delete against the store.
    ///
    /// Such failures are reported to the coordinator but never end the
    /// session; the caller decides whether to retry.
    pub fn is_store_error(&self) -> bool {
        matches!(
            self.code(),
            Code::KeyError | Code::StoreError | Code::TypeError | Code::SerializationError
        )
    }
}

/// Type alias for Results using BridgeError
pub type BridgeResult<T> = Result<T, BridgeError>;
