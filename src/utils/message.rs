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

use crate::bbsplus::ciphersuites::BbsCiphersuite;
use crate::errors::Error;
use crate::utils::util::hash_to_scalar;
use bls12_381_plus::Scalar;
use elliptic_curve::hash2curve::ExpandMsg;
use ff::Field;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// A signed message, addressed by its zero-based index in the ordered
/// sequence fixed at signing time. The scalar is the canonical image of the
/// message octets under [`BBSplusMessage::map_message_to_scalar_as_hash`];
/// a UTF-8 string and its byte encoding map to the same scalar.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BBSplusMessage {
    pub value: Scalar,
}

impl BBSplusMessage {
    pub fn new(msg: Scalar) -> Self {
        Self { value: msg }
    }

    pub fn random(rng: impl RngCore) -> Self {
        Self::new(Scalar::random(rng))
    }

    /// Hash arbitrary octets into the scalar field with the ciphersuite's
    /// message domain separation tag.
    pub fn map_message_to_scalar_as_hash<CS>(data: &[u8]) -> Result<Self, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        let scalar = hash_to_scalar::<CS>(data, &CS::map_msg_dst())?;
        Ok(Self { value: scalar })
    }

    pub fn messages_to_scalar<CS>(messages: &[Vec<u8>]) -> Result<Vec<Self>, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        messages
            .iter()
            .map(|m| Self::map_message_to_scalar_as_hash::<CS>(m))
            .collect()
    }

    pub fn to_bytes_be(&self) -> [u8; 32] {
        self.value.to_be_bytes()
    }
}
