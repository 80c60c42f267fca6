// Copyright 2025 Fondazione LINKS

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
use super::generators::Generators;
use super::keys::BBSplusPublicKey;
use crate::errors::Error;
use crate::utils::message::BBSplusMessage;
use crate::utils::util::{
    calculate_blind_challenge, calculate_random_scalars, get_random, parse_g1_projective,
    ScalarExt,
};
use bls12_381_plus::{G1Projective, Scalar};
use elliptic_curve::group::Curve;
use elliptic_curve::hash2curve::ExpandMsg;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Opaque identifier of a live [`BlindCommitmentContext`], scoped to the
/// process lifetime.
pub type Handle = u64;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ContextState {
    Created,
    Populating,
}

/// Registry slot. A context is `Busy` while a `finish` computation is in
/// flight, so concurrent operations on the same handle are rejected with
/// [`Error::InvalidState`] instead of racing the in-place mutation.
enum Slot {
    Ready(BlindCommitmentContext),
    Busy,
}

static REGISTRY: Lazy<Mutex<HashMap<Handle, Slot>>> = Lazy::new(Default::default);
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

fn registry() -> MutexGuard<'static, HashMap<Handle, Slot>> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builder state for a blind issuance: the holder populates every message
/// index, then `finish` produces a Pedersen commitment over the hidden
/// messages, a proof of knowledge of its opening and the blinding factor to
/// unblind the eventual signature.
///
/// States: `Created` -> `Populating` -> released (on `finish` or `discard`).
/// A released handle is unknown to the registry; any further operation on it
/// fails with [`Error::InvalidHandle`].
#[derive(Debug)]
pub struct BlindCommitmentContext {
    message_count: usize,
    public_key: Option<BBSplusPublicKey>,
    messages: Vec<Option<Vec<u8>>>,
    state: ContextState,
}

impl BlindCommitmentContext {
    /// Allocate a context for exactly `message_count` (>= 1) hidden messages.
    pub fn init(message_count: usize) -> Result<Handle, Error> {
        if message_count == 0 {
            return Err(Error::MissingMessage(
                "message count must be at least 1".to_owned(),
            ));
        }

        let context = BlindCommitmentContext {
            message_count,
            public_key: None,
            messages: vec![None; message_count],
            state: ContextState::Created,
        };

        let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
        registry().insert(handle, Slot::Ready(context));
        Ok(handle)
    }

    /// Record the signer public key. May be called at most once.
    pub fn set_public_key(handle: Handle, pk: &BBSplusPublicKey) -> Result<(), Error> {
        let mut registry = registry();
        let context = lookup(&mut registry, handle)?;

        if context.public_key.is_some() {
            return Err(Error::AlreadySet);
        }
        context.public_key = Some(pk.clone());
        context.state = ContextState::Populating;
        Ok(())
    }

    /// Record the UTF-8 encoding of `message` at `index`. Hashes to the same
    /// scalar as [`Self::add_message_bytes`] over the equivalent octets.
    pub fn add_message_str(handle: Handle, index: usize, message: &str) -> Result<(), Error> {
        Self::add_message_bytes(handle, index, message.as_bytes())
    }

    /// Record a message at `index`. Each index may be set exactly once and
    /// must be below the declared message count.
    pub fn add_message_bytes(handle: Handle, index: usize, message: &[u8]) -> Result<(), Error> {
        let mut registry = registry();
        let context = lookup(&mut registry, handle)?;

        if index >= context.message_count {
            return Err(Error::IndexOutOfRange {
                index,
                count: context.message_count,
            });
        }
        if context.messages[index].is_some() {
            return Err(Error::DuplicateMessageIndex(index));
        }
        context.messages[index] = Some(message.to_vec());
        context.state = ContextState::Populating;
        Ok(())
    }

    /// Compute the commitment bundle and release the handle.
    ///
    /// Requires the public key and every index `0..message_count` to be set;
    /// on [`Error::MissingPublicKey`] / [`Error::MissingMessage`] the context
    /// stays registered in `Populating` so the caller can correct and retry.
    /// On success the handle is released exactly once and a second `finish`
    /// fails with [`Error::InvalidHandle`].
    pub fn finish<CS>(handle: Handle) -> Result<CommitmentBundle, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        // Validate under the lock, then check the context out as Busy so the
        // commitment computation does not serialize unrelated handles.
        let context = {
            let mut registry = registry();
            let context = lookup(&mut registry, handle)?;

            if context.public_key.is_none() {
                return Err(Error::MissingPublicKey);
            }
            if let Some(missing) = context.messages.iter().position(Option::is_none) {
                return Err(Error::MissingMessage(format!(
                    "index {} not populated",
                    missing
                )));
            }

            match registry.insert(handle, Slot::Busy) {
                Some(Slot::Ready(context)) => context,
                _ => return Err(Error::InvalidState("context is busy".to_owned())),
            }
        };

        match compute_bundle::<CS>(&context) {
            Ok(bundle) => {
                registry().remove(&handle);
                Ok(bundle)
            }
            Err(e) => {
                // Hashing failures are unrecoverable input errors: the
                // context is discarded rather than left for retry.
                registry().remove(&handle);
                Err(e)
            }
        }
    }

    /// Explicitly release a context without finishing it.
    pub fn discard(handle: Handle) -> Result<(), Error> {
        let mut registry = registry();
        match registry.get(&handle) {
            None => Err(Error::InvalidHandle(handle)),
            Some(Slot::Busy) => Err(Error::InvalidState("context is busy".to_owned())),
            Some(Slot::Ready(_)) => {
                registry.remove(&handle);
                Ok(())
            }
        }
    }
}

fn lookup<'a>(
    registry: &'a mut HashMap<Handle, Slot>,
    handle: Handle,
) -> Result<&'a mut BlindCommitmentContext, Error> {
    match registry.get_mut(&handle) {
        None => Err(Error::InvalidHandle(handle)),
        Some(Slot::Busy) => Err(Error::InvalidState("context is busy".to_owned())),
        Some(Slot::Ready(context)) => Ok(context),
    }
}

/// C = Q1 * r + H_1 * msg_1 + ... + H_L * msg_L, with a Schnorr-style proof
/// of knowledge of (r, msg_1..msg_L) made non-interactive by Fiat-Shamir.
fn compute_bundle<CS>(context: &BlindCommitmentContext) -> Result<CommitmentBundle, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let L = context.message_count;
    let generators = Generators::create::<CS>(L);

    let mut message_scalars: Vec<BBSplusMessage> = Vec::with_capacity(L);
    for message in &context.messages {
        let octets = message
            .as_deref()
            .ok_or_else(|| Error::MissingMessage("index not populated".to_owned()))?;
        message_scalars.push(BBSplusMessage::map_message_to_scalar_as_hash::<CS>(octets)?);
    }

    let r = get_random();
    let mut commitment = generators.q1 * r;
    for (H_i, m_i) in generators.message_generators.iter().zip(&message_scalars) {
        commitment += H_i * m_i.value;
    }

    let random_scalars = calculate_random_scalars(L + 1);
    let s_tilde = random_scalars[0];
    let m_tilde = &random_scalars[1..];

    let mut Cbar = generators.q1 * s_tilde;
    for (H_i, m_tilde_i) in generators.message_generators.iter().zip(m_tilde) {
        Cbar += H_i * m_tilde_i;
    }

    let mut basis = vec![generators.q1];
    basis.extend_from_slice(&generators.message_generators);
    let challenge = calculate_blind_challenge::<CS>(commitment, Cbar, &basis)?;

    let s_cap = s_tilde + r * challenge;
    let m_cap: Vec<Scalar> = m_tilde
        .iter()
        .zip(&message_scalars)
        .map(|(m_tilde_i, m_i)| m_tilde_i + m_i.value * challenge)
        .collect();

    Ok(CommitmentBundle {
        commitment,
        proof: BBSplusZKPoK {
            s_cap,
            m_cap,
            challenge,
        },
        blinding_factor: BlindFactor(r),
    })
}

/// Verify, signer side, that `commitment` opens to `message_count`
/// well-formed scalars under the shared generator set. The hidden messages
/// are not learned.
pub fn verify_commitment<CS>(
    commitment: &[u8],
    proof: &[u8],
    message_count: usize,
) -> Result<(), Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let commitment = parse_g1_projective(commitment)?;
    let proof = BBSplusZKPoK::from_bytes(proof)?;

    if proof.m_cap.len() != message_count {
        return Err(Error::VerificationFailed(format!(
            "proof covers {} hidden messages, expected {}",
            proof.m_cap.len(),
            message_count
        )));
    }

    let generators = Generators::create::<CS>(message_count);
    let mut Cbar = generators.q1 * proof.s_cap;
    for (H_i, m_cap_i) in generators.message_generators.iter().zip(&proof.m_cap) {
        Cbar += H_i * m_cap_i;
    }
    Cbar += commitment * (-proof.challenge);

    let mut basis = vec![generators.q1];
    basis.extend_from_slice(&generators.message_generators);
    let cv = calculate_blind_challenge::<CS>(commitment, Cbar, &basis)?;

    if cv != proof.challenge {
        return Err(Error::VerificationFailed(
            "commitment proof challenge mismatch".to_owned(),
        ));
    }
    Ok(())
}

/// Zero-knowledge proof that a commitment opens to well-formed scalars.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BBSplusZKPoK {
    s_cap: Scalar,
    m_cap: Vec<Scalar>,
    challenge: Scalar,
}

impl BBSplusZKPoK {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = Vec::new();
        bytes.extend_from_slice(&self.s_cap.to_bytes_be());
        self.m_cap
            .iter()
            .for_each(|m| bytes.extend_from_slice(&m.to_bytes_be()));
        bytes.extend_from_slice(&self.challenge.to_bytes_be());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < 2 * Scalar::BYTES || bytes.len() % Scalar::BYTES != 0 {
            return Err(Error::MalformedInput(
                "invalid commitment proof length".to_owned(),
            ));
        }

        let mut scalars: Vec<Scalar> = Vec::with_capacity(bytes.len() / Scalar::BYTES);
        for chunk in bytes.chunks_exact(Scalar::BYTES) {
            scalars.push(Scalar::from_bytes_be(chunk)?);
        }

        let challenge = scalars
            .pop()
            .ok_or_else(|| Error::MalformedInput("empty commitment proof".to_owned()))?;
        let s_cap = scalars.remove(0);
        Ok(Self {
            s_cap,
            m_cap: scalars,
            challenge,
        })
    }
}

/// The committer's blinding scalar, retained to unblind the eventual
/// signature.
#[derive(Clone, Debug, PartialEq)]
pub struct BlindFactor(pub(crate) Scalar);

impl BlindFactor {
    pub fn random() -> Self {
        Self(get_random())
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, Error> {
        Ok(Self(Scalar::from_bytes_be(bytes)?))
    }
}

/// Output of a finished [`BlindCommitmentContext`]: the commitment, the
/// proof of knowledge of its opening ("context" for the signer) and the
/// blinding factor retained by the committer.
#[derive(Debug, PartialEq)]
pub struct CommitmentBundle {
    commitment: G1Projective,
    proof: BBSplusZKPoK,
    blinding_factor: BlindFactor,
}

impl CommitmentBundle {
    pub fn commitment_to_bytes(&self) -> [u8; G1Projective::COMPRESSED_BYTES] {
        self.commitment.to_affine().to_compressed()
    }

    pub fn proof_to_bytes(&self) -> Vec<u8> {
        self.proof.to_bytes()
    }

    pub fn blinding_factor(&self) -> &BlindFactor {
        &self.blinding_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbsplus::ciphersuites::Bls12381Sha256;
    use crate::bbsplus::keys::KeyPair;

    fn keypair() -> KeyPair {
        KeyPair::generate::<Bls12381Sha256>(Some(&[9u8; 32])).unwrap()
    }

    fn populated_context(message_count: usize) -> Handle {
        let handle = BlindCommitmentContext::init(message_count).unwrap();
        BlindCommitmentContext::set_public_key(handle, keypair().public_key()).unwrap();
        for i in 0..message_count {
            BlindCommitmentContext::add_message_str(handle, i, &format!("message {}", i)).unwrap();
        }
        handle
    }

    #[test]
    fn zero_message_count_is_rejected() {
        assert!(matches!(
            BlindCommitmentContext::init(0),
            Err(Error::MissingMessage(_))
        ));
    }

    #[test]
    fn finish_produces_verifiable_commitment() {
        let handle = populated_context(3);
        let bundle = BlindCommitmentContext::finish::<Bls12381Sha256>(handle).unwrap();

        verify_commitment::<Bls12381Sha256>(
            &bundle.commitment_to_bytes(),
            &bundle.proof_to_bytes(),
            3,
        )
        .unwrap();
    }

    #[test]
    fn finish_releases_the_handle() {
        let handle = populated_context(2);
        BlindCommitmentContext::finish::<Bls12381Sha256>(handle).unwrap();
        assert_eq!(
            BlindCommitmentContext::finish::<Bls12381Sha256>(handle),
            Err(Error::InvalidHandle(handle))
        );
    }

    #[test]
    fn missing_message_keeps_context_alive() {
        let handle = BlindCommitmentContext::init(2).unwrap();
        BlindCommitmentContext::set_public_key(handle, keypair().public_key()).unwrap();
        BlindCommitmentContext::add_message_str(handle, 0, "only one").unwrap();

        assert!(matches!(
            BlindCommitmentContext::finish::<Bls12381Sha256>(handle),
            Err(Error::MissingMessage(_))
        ));

        // The handle survived the failed finish; correcting it succeeds.
        BlindCommitmentContext::add_message_str(handle, 1, "the other").unwrap();
        BlindCommitmentContext::finish::<Bls12381Sha256>(handle).unwrap();
    }

    #[test]
    fn missing_public_key_is_reported() {
        let handle = BlindCommitmentContext::init(1).unwrap();
        BlindCommitmentContext::add_message_str(handle, 0, "m").unwrap();
        assert_eq!(
            BlindCommitmentContext::finish::<Bls12381Sha256>(handle),
            Err(Error::MissingPublicKey)
        );
        BlindCommitmentContext::discard(handle).unwrap();
    }

    #[test]
    fn public_key_may_be_set_once() {
        let handle = BlindCommitmentContext::init(1).unwrap();
        let keypair = keypair();
        BlindCommitmentContext::set_public_key(handle, keypair.public_key()).unwrap();
        assert_eq!(
            BlindCommitmentContext::set_public_key(handle, keypair.public_key()),
            Err(Error::AlreadySet)
        );
        BlindCommitmentContext::discard(handle).unwrap();
    }

    #[test]
    fn duplicate_index_is_rejected() {
        let handle = BlindCommitmentContext::init(2).unwrap();
        BlindCommitmentContext::add_message_str(handle, 0, "first").unwrap();
        assert_eq!(
            BlindCommitmentContext::add_message_str(handle, 0, "again"),
            Err(Error::DuplicateMessageIndex(0))
        );
        BlindCommitmentContext::discard(handle).unwrap();
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let handle = BlindCommitmentContext::init(2).unwrap();
        assert_eq!(
            BlindCommitmentContext::add_message_str(handle, 2, "overflow"),
            Err(Error::IndexOutOfRange { index: 2, count: 2 })
        );
        BlindCommitmentContext::discard(handle).unwrap();
    }

    #[test]
    fn operations_on_unknown_handle_fail() {
        let unknown = u64::MAX;
        assert_eq!(
            BlindCommitmentContext::add_message_str(unknown, 0, "m"),
            Err(Error::InvalidHandle(unknown))
        );
        assert_eq!(
            BlindCommitmentContext::discard(unknown),
            Err(Error::InvalidHandle(unknown))
        );
    }

    #[test]
    fn discarded_handle_is_released() {
        let handle = BlindCommitmentContext::init(1).unwrap();
        BlindCommitmentContext::discard(handle).unwrap();
        assert_eq!(
            BlindCommitmentContext::discard(handle),
            Err(Error::InvalidHandle(handle))
        );
    }

    #[test]
    fn tampered_commitment_proof_fails() {
        let handle = populated_context(2);
        let bundle = BlindCommitmentContext::finish::<Bls12381Sha256>(handle).unwrap();

        let mut proof = bundle.proof_to_bytes();
        let last = proof.len() - 1;
        proof[last] ^= 0x01;

        let result =
            verify_commitment::<Bls12381Sha256>(&bundle.commitment_to_bytes(), &proof, 2);
        assert!(result.is_err());
    }
}
