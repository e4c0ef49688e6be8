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

//! Process groups and the collective operations built on them

pub mod communicator;
pub mod ops;
pub mod threaded;

#[cfg(feature = "mpi")]
pub mod mpi;

// Re-exports for convenience
pub use communicator::ProcessGroup;
pub use threaded::ThreadedGroup;

/// Backend behind a process group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommType {
    /// Ranks are threads of one process
    Local,
    #[cfg(feature = "mpi")]
    Mpi,
}
