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
use super::generators::Generators;
use super::keys::BBSplusPublicKey;
use super::signature::{compute_B, BBSplusSignature};
use crate::errors::Error;
use crate::utils::message::BBSplusMessage;
use crate::utils::util::{
    calculate_domain, calculate_random_scalars, get_messages, get_remaining_indexes,
    hash_to_scalar, i2osp, parse_g1_projective, ScalarExt,
};
use bls12_381_plus::{multi_miller_loop, G1Projective, G2Prepared, G2Projective, Gt, Scalar};
use elliptic_curve::group::Curve;
use elliptic_curve::hash2curve::ExpandMsg;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A zero-knowledge proof of knowledge of a BBS+ signature, disclosing a
/// chosen subset of the signed messages.
///
/// `Abar` is a fresh re-randomization of the signature point, so proofs over
/// the same signature are unlinkable. Every undisclosed message (and the
/// signature scalars `e` and `s`) appears only through a Schnorr response
/// bound to the verifier nonce via the Fiat-Shamir challenge. The disclosed
/// index set is part of the proof encoding and must match the verifier's
/// revealed messages exactly.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BBSplusPoKSignature {
    Abar: G1Projective,
    Bbar: G1Projective,
    D: G1Projective,
    e_cap: Scalar,
    r1_cap: Scalar,
    r3_cap: Scalar,
    s_cap: Scalar,
    m_cap: Vec<Scalar>,
    challenge: Scalar,
    disclosed_indexes: Vec<usize>,
}

impl BBSplusPoKSignature {
    /// Fixed-size prefix: 3 G1 points, 5 scalars, 8-octet index count.
    const PREFIX_BYTES: usize = 3 * 48 + 5 * 32 + 8;

    /// Create a selective-disclosure proof for `signature`, revealing exactly
    /// the messages at `disclosed_indexes` and binding the caller `nonce`.
    pub fn proof_gen<CS>(
        signature: &BBSplusSignature,
        pk: &BBSplusPublicKey,
        nonce: &[u8],
        messages: &[Vec<u8>],
        disclosed_indexes: &[usize],
    ) -> Result<Self, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        if messages.is_empty() {
            return Err(Error::MissingMessage("empty message sequence".to_owned()));
        }

        let L = messages.len();
        let mut disclosed_indexes = disclosed_indexes.to_vec();
        disclosed_indexes.sort_unstable();
        if let Some(duplicate) = disclosed_indexes.windows(2).find(|w| w[0] == w[1]) {
            return Err(Error::DuplicateMessageIndex(duplicate[0]));
        }
        if let Some(&invalid) = disclosed_indexes.iter().find(|&&i| i >= L) {
            return Err(Error::IndexOutOfRange {
                index: invalid,
                count: L,
            });
        }

        let message_scalars = BBSplusMessage::messages_to_scalar::<CS>(messages)?;
        let generators = Generators::create::<CS>(L);

        core_proof_gen::<CS>(
            pk,
            signature,
            &generators,
            &message_scalars,
            &disclosed_indexes,
            nonce,
        )
    }

    /// Verify this proof against the revealed messages (`index -> octets`)
    /// and the same nonce the prover committed to.
    pub fn proof_verify<CS>(
        &self,
        pk: &BBSplusPublicKey,
        disclosed_messages: &BTreeMap<usize, Vec<u8>>,
        nonce: &[u8],
    ) -> Result<(), Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        let supplied: Vec<usize> = disclosed_messages.keys().copied().collect();
        if supplied != self.disclosed_indexes {
            return Err(Error::RevealedSetMismatch(format!(
                "proof disclosed {:?}, caller supplied {:?}",
                self.disclosed_indexes, supplied
            )));
        }

        let disclosed_octets: Vec<Vec<u8>> = disclosed_messages.values().cloned().collect();
        let disclosed_scalars = BBSplusMessage::messages_to_scalar::<CS>(&disclosed_octets)?;

        core_proof_verify::<CS>(pk, self, &disclosed_scalars, nonce)
    }

    /// Indices of the messages this proof discloses, recovered from the
    /// proof itself.
    pub fn disclosed_indexes(&self) -> &[usize] {
        &self.disclosed_indexes
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = Vec::new();
        bytes.extend_from_slice(&self.Abar.to_affine().to_compressed());
        bytes.extend_from_slice(&self.Bbar.to_affine().to_compressed());
        bytes.extend_from_slice(&self.D.to_affine().to_compressed());
        bytes.extend_from_slice(&self.e_cap.to_bytes_be());
        bytes.extend_from_slice(&self.r1_cap.to_bytes_be());
        bytes.extend_from_slice(&self.r3_cap.to_bytes_be());
        bytes.extend_from_slice(&self.s_cap.to_bytes_be());
        bytes.extend_from_slice(&self.challenge.to_bytes_be());
        bytes.extend_from_slice(&i2osp(self.disclosed_indexes.len(), 8));
        self.disclosed_indexes
            .iter()
            .for_each(|&i| bytes.extend_from_slice(&i2osp(i, 8)));
        self.m_cap
            .iter()
            .for_each(|m| bytes.extend_from_slice(&m.to_bytes_be()));
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < Self::PREFIX_BYTES {
            return Err(Error::MalformedInput("proof too short".to_owned()));
        }

        let Abar = parse_g1_projective(&bytes[0..48])?;
        let Bbar = parse_g1_projective(&bytes[48..96])?;
        let D = parse_g1_projective(&bytes[96..144])?;
        let e_cap = Scalar::from_bytes_be(&bytes[144..176])?;
        let r1_cap = Scalar::from_bytes_be(&bytes[176..208])?;
        let r3_cap = Scalar::from_bytes_be(&bytes[208..240])?;
        let s_cap = Scalar::from_bytes_be(&bytes[240..272])?;
        let challenge = Scalar::from_bytes_be(&bytes[272..304])?;

        let R = u64::from_be_bytes(
            bytes[304..312]
                .try_into()
                .map_err(|_| Error::MalformedInput("invalid index count".to_owned()))?,
        );
        let R = usize::try_from(R)
            .map_err(|_| Error::MalformedInput("invalid index count".to_owned()))?;

        // Bound the count before any arithmetic on it; the field is untrusted.
        let rest = &bytes[Self::PREFIX_BYTES..];
        if R > rest.len() / 8 || (rest.len() - R * 8) % Scalar::BYTES != 0 {
            return Err(Error::MalformedInput("invalid proof length".to_owned()));
        }

        let mut disclosed_indexes: Vec<usize> = Vec::with_capacity(R);
        for chunk in rest[..R * 8].chunks_exact(8) {
            let index = u64::from_be_bytes(
                chunk
                    .try_into()
                    .map_err(|_| Error::MalformedInput("invalid index encoding".to_owned()))?,
            ) as usize;
            if disclosed_indexes.last().map_or(false, |&last| last >= index) {
                return Err(Error::MalformedInput(
                    "disclosed indexes not strictly increasing".to_owned(),
                ));
            }
            disclosed_indexes.push(index);
        }

        let mut m_cap: Vec<Scalar> = Vec::new();
        for chunk in rest[R * 8..].chunks_exact(Scalar::BYTES) {
            m_cap.push(Scalar::from_bytes_be(chunk)?);
        }

        Ok(Self {
            Abar,
            Bbar,
            D,
            e_cap,
            r1_cap,
            r3_cap,
            s_cap,
            m_cap,
            challenge,
            disclosed_indexes,
        })
    }

    pub fn encode(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

struct ProofInitResult {
    Abar: G1Projective,
    Bbar: G1Projective,
    D: G1Projective,
    T1: G1Projective,
    T2: G1Projective,
    domain: Scalar,
}

fn core_proof_gen<CS>(
    pk: &BBSplusPublicKey,
    signature: &BBSplusSignature,
    generators: &Generators,
    messages: &[BBSplusMessage],
    disclosed_indexes: &[usize],
    nonce: &[u8],
) -> Result<BBSplusPoKSignature, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let L = messages.len();
    let undisclosed_indexes = get_remaining_indexes(L, disclosed_indexes);
    let U = undisclosed_indexes.len();

    let disclosed_messages = get_messages(messages, disclosed_indexes);
    let undisclosed_messages = get_messages(messages, &undisclosed_indexes);

    let random_scalars = calculate_random_scalars(6 + U);

    let init_res = proof_init::<CS>(
        pk,
        signature,
        generators,
        &random_scalars,
        messages,
        &undisclosed_indexes,
    )?;

    let challenge = proof_challenge_calculate::<CS>(
        &init_res,
        disclosed_indexes,
        &disclosed_messages,
        nonce,
    )?;

    proof_finalize(
        &init_res,
        challenge,
        signature,
        &random_scalars,
        &undisclosed_messages,
        disclosed_indexes,
    )
}

fn proof_init<CS>(
    pk: &BBSplusPublicKey,
    signature: &BBSplusSignature,
    generators: &Generators,
    random_scalars: &[Scalar],
    messages: &[BBSplusMessage],
    undisclosed_indexes: &[usize],
) -> Result<ProofInitResult, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let U = undisclosed_indexes.len();
    if random_scalars.len() != 6 + U {
        return Err(Error::MalformedInput("wrong number of random scalars".to_owned()));
    }

    let domain = calculate_domain::<CS>(pk, generators)?;
    let B = compute_B(generators, signature.s, domain, messages);

    let r1 = random_scalars[0];
    let r2 = random_scalars[1];
    let e_tilde = random_scalars[2];
    let r1_tilde = random_scalars[3];
    let r3_tilde = random_scalars[4];
    let s_tilde = random_scalars[5];
    let m_tilde = &random_scalars[6..(6 + U)];

    let D = B * r2;
    let Abar = signature.A * (r1 * r2);
    let Bbar = D * r1 - Abar * signature.e;

    let T1 = Abar * e_tilde + D * r1_tilde;
    let mut T2 = D * r3_tilde + generators.q1 * s_tilde;
    for (j, &i) in undisclosed_indexes.iter().enumerate() {
        T2 += generators.message_generators[i] * m_tilde[j];
    }

    Ok(ProofInitResult {
        Abar,
        Bbar,
        D,
        T1,
        T2,
        domain,
    })
}

/// challenge = hash_to_scalar(Abar || Bbar || D || T1 || T2 || R ||
///                            i_1 || ... || i_R || msg_i1 || ... || msg_iR ||
///                            domain || I2OSP(length(nonce), 8) || nonce)
fn proof_challenge_calculate<CS>(
    init_res: &ProofInitResult,
    disclosed_indexes: &[usize],
    disclosed_messages: &[BBSplusMessage],
    nonce: &[u8],
) -> Result<Scalar, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    if disclosed_messages.len() != disclosed_indexes.len() {
        return Err(Error::MalformedInput(
            "number of disclosed messages differs from number of disclosed indexes".to_owned(),
        ));
    }

    let mut c_arr: Vec<u8> = Vec::new();
    c_arr.extend_from_slice(&init_res.Abar.to_affine().to_compressed());
    c_arr.extend_from_slice(&init_res.Bbar.to_affine().to_compressed());
    c_arr.extend_from_slice(&init_res.D.to_affine().to_compressed());
    c_arr.extend_from_slice(&init_res.T1.to_affine().to_compressed());
    c_arr.extend_from_slice(&init_res.T2.to_affine().to_compressed());
    c_arr.extend_from_slice(&i2osp(disclosed_indexes.len(), 8));
    disclosed_indexes
        .iter()
        .for_each(|&i| c_arr.extend_from_slice(&i2osp(i, 8)));
    disclosed_messages
        .iter()
        .for_each(|m| c_arr.extend_from_slice(&m.to_bytes_be()));
    c_arr.extend_from_slice(&init_res.domain.to_bytes_be());
    c_arr.extend_from_slice(&i2osp(nonce.len(), 8));
    c_arr.extend_from_slice(nonce);

    hash_to_scalar::<CS>(&c_arr, &CS::proof_challenge_dst())
}

fn proof_finalize(
    init_res: &ProofInitResult,
    challenge: Scalar,
    signature: &BBSplusSignature,
    random_scalars: &[Scalar],
    undisclosed_messages: &[BBSplusMessage],
    disclosed_indexes: &[usize],
) -> Result<BBSplusPoKSignature, Error> {
    let U = undisclosed_messages.len();

    let r1 = random_scalars[0];
    let r2 = random_scalars[1];
    let e_tilde = random_scalars[2];
    let r1_tilde = random_scalars[3];
    let r3_tilde = random_scalars[4];
    let s_tilde = random_scalars[5];
    let m_tilde = &random_scalars[6..(6 + U)];

    let r3: Option<Scalar> = r2.invert().into();
    let r3 = r3.ok_or_else(|| Error::MalformedInput("degenerate random scalar".to_owned()))?;

    let e_cap = e_tilde + signature.e * challenge;
    let r1_cap = r1_tilde - r1 * challenge;
    let r3_cap = r3_tilde - r3 * challenge;
    let s_cap = s_tilde + signature.s * challenge;

    let m_cap: Vec<Scalar> = m_tilde
        .iter()
        .zip(undisclosed_messages)
        .map(|(m_tilde_j, m_j)| m_tilde_j + m_j.value * challenge)
        .collect();

    Ok(BBSplusPoKSignature {
        Abar: init_res.Abar,
        Bbar: init_res.Bbar,
        D: init_res.D,
        e_cap,
        r1_cap,
        r3_cap,
        s_cap,
        m_cap,
        challenge,
        disclosed_indexes: disclosed_indexes.to_vec(),
    })
}

fn core_proof_verify<CS>(
    pk: &BBSplusPublicKey,
    proof: &BBSplusPoKSignature,
    disclosed_messages: &[BBSplusMessage],
    nonce: &[u8],
) -> Result<(), Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let init_res = proof_verify_init::<CS>(pk, proof, disclosed_messages)?;

    let challenge = proof_challenge_calculate::<CS>(
        &init_res,
        &proof.disclosed_indexes,
        disclosed_messages,
        nonce,
    )?;

    if proof.challenge != challenge {
        return Err(Error::VerificationFailed("invalid challenge".to_owned()));
    }

    // e(Abar, PK) * e(Bbar, -BP2) == 1
    let BP2 = G2Projective::GENERATOR;
    let term1 = (&proof.Abar.to_affine(), &G2Prepared::from(pk.0.to_affine()));
    let term2 = (&proof.Bbar.to_affine(), &G2Prepared::from(-BP2.to_affine()));

    let pairing = multi_miller_loop(&[term1, term2]).final_exponentiation();

    if pairing == Gt::IDENTITY {
        Ok(())
    } else {
        Err(Error::VerificationFailed(
            "proof pairing equation does not hold".to_owned(),
        ))
    }
}

fn proof_verify_init<CS>(
    pk: &BBSplusPublicKey,
    proof: &BBSplusPoKSignature,
    disclosed_messages: &[BBSplusMessage],
) -> Result<ProofInitResult, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let U = proof.m_cap.len();
    let R = proof.disclosed_indexes.len();
    let L = U + R;

    if disclosed_messages.len() != R {
        return Err(Error::MalformedInput(
            "number of disclosed messages differs from number of disclosed indexes".to_owned(),
        ));
    }
    if let Some(&invalid) = proof.disclosed_indexes.iter().find(|&&i| i >= L) {
        return Err(Error::IndexOutOfRange {
            index: invalid,
            count: L,
        });
    }

    let undisclosed_indexes = get_remaining_indexes(L, &proof.disclosed_indexes);
    let generators = Generators::create::<CS>(L);
    let domain = calculate_domain::<CS>(pk, &generators)?;

    let T1 = proof.Bbar * proof.challenge + proof.Abar * proof.e_cap + proof.D * proof.r1_cap;

    let mut Bv = generators.g1_base_point + generators.q2 * domain;
    for (i, m_i) in proof.disclosed_indexes.iter().zip(disclosed_messages) {
        Bv += generators.message_generators[*i] * m_i.value;
    }

    let mut T2 = Bv * proof.challenge + proof.D * proof.r3_cap + generators.q1 * proof.s_cap;
    for (j, &i) in undisclosed_indexes.iter().enumerate() {
        T2 += generators.message_generators[i] * proof.m_cap[j];
    }

    Ok(ProofInitResult {
        Abar: proof.Abar,
        Bbar: proof.Bbar,
        D: proof.D,
        T1,
        T2,
        domain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbsplus::ciphersuites::Bls12381Sha256;
    use crate::bbsplus::keys::KeyPair;

    fn setup() -> (KeyPair, Vec<Vec<u8>>, BBSplusSignature) {
        let keypair = KeyPair::generate::<Bls12381Sha256>(Some(&[2u8; 32])).unwrap();
        let messages = vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()];
        let signature = BBSplusSignature::sign::<Bls12381Sha256>(
            &messages,
            keypair.private_key(),
            keypair.public_key(),
        )
        .unwrap();
        (keypair, messages, signature)
    }

    #[test]
    fn proof_round_trip() {
        let (keypair, messages, signature) = setup();
        let nonce = b"verifier nonce";

        let proof = BBSplusPoKSignature::proof_gen::<Bls12381Sha256>(
            &signature,
            keypair.public_key(),
            nonce,
            &messages,
            &[0, 2],
        )
        .unwrap();

        let mut disclosed = BTreeMap::new();
        disclosed.insert(0usize, messages[0].clone());
        disclosed.insert(2usize, messages[2].clone());

        proof
            .proof_verify::<Bls12381Sha256>(keypair.public_key(), &disclosed, nonce)
            .unwrap();
    }

    #[test]
    fn duplicate_disclosed_index_is_rejected() {
        let (keypair, messages, signature) = setup();
        let result = BBSplusPoKSignature::proof_gen::<Bls12381Sha256>(
            &signature,
            keypair.public_key(),
            b"n",
            &messages,
            &[1, 1],
        );
        assert_eq!(result.unwrap_err(), Error::DuplicateMessageIndex(1));
    }

    #[test]
    fn out_of_range_disclosed_index_is_rejected() {
        let (keypair, messages, signature) = setup();
        let result = BBSplusPoKSignature::proof_gen::<Bls12381Sha256>(
            &signature,
            keypair.public_key(),
            b"n",
            &messages,
            &[3],
        );
        assert!(matches!(result, Err(Error::IndexOutOfRange { .. })));
    }

    #[test]
    fn revealed_set_mismatch_is_reported() {
        let (keypair, messages, signature) = setup();
        let proof = BBSplusPoKSignature::proof_gen::<Bls12381Sha256>(
            &signature,
            keypair.public_key(),
            b"n",
            &messages,
            &[0],
        )
        .unwrap();

        let mut disclosed = BTreeMap::new();
        disclosed.insert(1usize, messages[1].clone());

        let result =
            proof.proof_verify::<Bls12381Sha256>(keypair.public_key(), &disclosed, b"n");
        assert!(matches!(result, Err(Error::RevealedSetMismatch(_))));
    }

    #[test]
    fn oversized_index_count_is_malformed() {
        let (keypair, messages, signature) = setup();
        let proof = BBSplusPoKSignature::proof_gen::<Bls12381Sha256>(
            &signature,
            keypair.public_key(),
            b"n",
            &messages,
            &[0],
        )
        .unwrap();

        // Valid points and scalars, but the index count field claims more
        // entries than the buffer could ever hold.
        let mut bytes = proof.to_bytes();
        bytes[304..312].copy_from_slice(&u64::MAX.to_be_bytes());

        assert!(matches!(
            BBSplusPoKSignature::from_bytes(&bytes),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn proof_bytes_round_trip() {
        let (keypair, messages, signature) = setup();
        let proof = BBSplusPoKSignature::proof_gen::<Bls12381Sha256>(
            &signature,
            keypair.public_key(),
            b"n",
            &messages,
            &[1],
        )
        .unwrap();

        let decoded = BBSplusPoKSignature::from_bytes(&proof.to_bytes()).unwrap();
        assert_eq!(decoded, proof);
    }
}
