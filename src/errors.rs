// Copyright 2023 Fondazione LINKS

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at

//     http://www.apache.org/licenses/LICENSE-2.0

// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown or already released handle: {0}")]
    InvalidHandle(u64),
    #[error("Operation not valid in the current context state: {0}")]
    InvalidState(String),
    #[error("Message index out of range: {index} (message count is {count})")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("Duplicate message index: {0}")]
    DuplicateMessageIndex(usize),
    #[error("No public key set on the commitment context")]
    MissingPublicKey,
    #[error("Public key already set on the commitment context")]
    AlreadySet,
    #[error("Missing message: {0}")]
    MissingMessage(String),
    #[error("Verification failed: {0}")]
    VerificationFailed(String),
    #[error("Revealed index set does not match the proof: {0}")]
    RevealedSetMismatch(String),
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Allocation failure: {0}")]
    AllocationFailure(String),
}
