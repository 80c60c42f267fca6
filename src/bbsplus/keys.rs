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

use super::ciphersuites::BbsCiphersuite;
use crate::errors::Error;
use crate::utils::util::{hash_to_scalar, i2osp};
use bls12_381_plus::{G2Affine, G2Projective, Scalar};
use elliptic_curve::group::Curve;
use elliptic_curve::hash2curve::ExpandMsg;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BBSplusPublicKey(pub G2Projective);

impl BBSplusPublicKey {
    pub fn to_bytes(&self) -> [u8; G2Affine::COMPRESSED_BYTES] {
        self.0.to_affine().to_compressed()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; G2Affine::COMPRESSED_BYTES] = bytes
            .try_into()
            .map_err(|_| Error::MalformedInput("invalid public key length".to_owned()))?;
        let g2 = G2Affine::from_compressed(&bytes);
        if g2.is_none().into() {
            return Err(Error::MalformedInput("invalid public key encoding".to_owned()));
        }
        Ok(Self(G2Projective::from(g2.unwrap())))
    }

    pub fn encode(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BBSplusSecretKey(pub Scalar);

impl BBSplusSecretKey {
    //in BE order
    pub fn to_bytes(&self) -> [u8; Scalar::BYTES] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; Scalar::BYTES] = bytes
            .try_into()
            .map_err(|_| Error::MalformedInput("invalid secret key length".to_owned()))?;
        let s = Scalar::from_be_bytes(&bytes);
        if s.is_none().into() {
            return Err(Error::MalformedInput("invalid secret key encoding".to_owned()));
        }
        Ok(Self(s.unwrap()))
    }

    pub fn encode(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// A BBS+ key pair. The public key is `SK * BP2` and is never mutated after
/// creation.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct KeyPair {
    public: BBSplusPublicKey,
    private: BBSplusSecretKey,
}

impl KeyPair {
    /// Generate a key pair. With `seed` the output is deterministic; without
    /// one, `IKM_LEN` octets are drawn from the operating system CSPRNG.
    ///
    /// Fails with [`Error::AllocationFailure`] only if the system entropy
    /// source is exhausted, and with [`Error::MalformedInput`] if a supplied
    /// seed is shorter than `IKM_LEN`.
    pub fn generate<CS>(seed: Option<&[u8]>) -> Result<Self, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        let key_material = match seed {
            Some(ikm) => {
                if ikm.len() < CS::IKM_LEN {
                    return Err(Error::MalformedInput(format!(
                        "seed must be at least {} octets",
                        CS::IKM_LEN
                    )));
                }
                ikm.to_vec()
            }
            None => {
                let mut ikm = vec![0u8; CS::IKM_LEN];
                OsRng
                    .try_fill_bytes(&mut ikm)
                    .map_err(|e| Error::AllocationFailure(e.to_string()))?;
                ikm
            }
        };

        let sk = key_gen::<CS>(&key_material)?;
        let pk = sk_to_pk(sk);

        Ok(Self {
            public: BBSplusPublicKey(pk),
            private: BBSplusSecretKey(sk),
        })
    }

    pub fn public_key(&self) -> &BBSplusPublicKey {
        &self.public
    }

    pub fn private_key(&self) -> &BBSplusSecretKey {
        &self.private
    }

    /// Returns the couple `(sk, pk)`.
    pub fn into_parts(self) -> (BBSplusSecretKey, BBSplusPublicKey) {
        (self.private, self.public)
    }
}

/// SK = hash_to_scalar(key_material || I2OSP(0, 2), keygen_dst)
fn key_gen<CS>(key_material: &[u8]) -> Result<Scalar, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let derive_input = [key_material, &i2osp(0, 2)].concat();
    hash_to_scalar::<CS>(&derive_input, &CS::keygen_dst())
}

/// PK = SK * BP2
fn sk_to_pk(sk: Scalar) -> G2Projective {
    G2Affine::generator() * sk
}
