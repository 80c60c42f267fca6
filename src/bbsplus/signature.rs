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
use super::keys::{BBSplusPublicKey, BBSplusSecretKey};
use crate::errors::Error;
use crate::utils::message::BBSplusMessage;
use crate::utils::util::{
    calculate_domain, get_random, hash_to_scalar, parse_g1_projective, serialize, ScalarExt,
};
use bls12_381_plus::{multi_miller_loop, G1Projective, G2Prepared, G2Projective, Gt, Scalar};
use elliptic_curve::group::Curve;
use elliptic_curve::hash2curve::ExpandMsg;
use serde::{Deserialize, Serialize};

/// A BBS+ signature (A, e, s) over an ordered message sequence.
///
/// `s` is drawn fresh at signing time so two signatures over the same
/// messages are unlinkable, `e` is derived by hashing the secret key, the
/// domain and all message scalars, and `A = B * (SK + e)^-1` with
/// `B = P1 + Q1 * s + Q2 * domain + H_1 * msg_1 + ... + H_L * msg_L`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BBSplusSignature {
    pub A: G1Projective,
    pub e: Scalar,
    pub s: Scalar,
}

impl BBSplusSignature {
    pub const BYTES: usize = 112;

    pub fn to_bytes(&self) -> [u8; Self::BYTES] {
        let mut bytes = [0u8; Self::BYTES];
        bytes[0..48].copy_from_slice(&self.A.to_affine().to_compressed());
        bytes[48..80].copy_from_slice(&self.e.to_bytes_be());
        bytes[80..112].copy_from_slice(&self.s.to_bytes_be());
        bytes
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() != Self::BYTES {
            return Err(Error::MalformedInput("invalid signature length".to_owned()));
        }
        let A = parse_g1_projective(&data[0..48])?;
        let e = Scalar::from_bytes_be(&data[48..80])?;
        let s = Scalar::from_bytes_be(&data[80..112])?;
        Ok(Self { A, e, s })
    }

    /// Sign an ordered, non-empty message sequence.
    pub fn sign<CS>(
        messages: &[Vec<u8>],
        sk: &BBSplusSecretKey,
        pk: &BBSplusPublicKey,
    ) -> Result<Self, Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        if messages.is_empty() {
            return Err(Error::MissingMessage("empty message sequence".to_owned()));
        }

        let message_scalars = BBSplusMessage::messages_to_scalar::<CS>(messages)?;
        let generators = Generators::create::<CS>(messages.len());
        core_sign::<CS>(sk, pk, &generators, &message_scalars)
    }

    /// Verify this signature against the exact message sequence used at
    /// signing time. A single altered, reordered or missing message fails.
    pub fn verify<CS>(&self, pk: &BBSplusPublicKey, messages: &[Vec<u8>]) -> Result<(), Error>
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        if messages.is_empty() {
            return Err(Error::MissingMessage("empty message sequence".to_owned()));
        }

        let message_scalars = BBSplusMessage::messages_to_scalar::<CS>(messages)?;
        let generators = Generators::create::<CS>(messages.len());
        core_verify::<CS>(pk, self, &generators, &message_scalars)
    }

    pub fn encode(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// B = P1 + Q1 * s + Q2 * domain + H_1 * msg_1 + ... + H_L * msg_L
pub(crate) fn compute_B(
    generators: &Generators,
    s: Scalar,
    domain: Scalar,
    messages: &[BBSplusMessage],
) -> G1Projective {
    let mut B = generators.g1_base_point + generators.q1 * s + generators.q2 * domain;
    for (H_i, m_i) in generators.message_generators.iter().zip(messages) {
        B += H_i * m_i.value;
    }
    B
}

fn core_sign<CS>(
    sk: &BBSplusSecretKey,
    pk: &BBSplusPublicKey,
    generators: &Generators,
    messages: &[BBSplusMessage],
) -> Result<BBSplusSignature, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    if generators.message_generators.len() != messages.len() {
        return Err(Error::MalformedInput("wrong number of generators".to_owned()));
    }

    let domain = calculate_domain::<CS>(pk, generators)?;
    let signature_dst = CS::signature_dst();

    // Redraw s on a degenerate (SK + e) or identity A; with a uniform s this
    // terminates on the first iteration except with negligible probability.
    loop {
        let s = get_random();

        let mut e_input: Vec<Scalar> = Vec::with_capacity(3 + messages.len());
        e_input.push(sk.0);
        e_input.push(domain);
        e_input.push(s);
        messages.iter().for_each(|m| e_input.push(m.value));
        let e = hash_to_scalar::<CS>(&serialize(&e_input), &signature_dst)?;

        let inverse: Option<Scalar> = (sk.0 + e).invert().into();
        if let Some(inverse) = inverse {
            let B = compute_B(generators, s, domain, messages);
            let A = B * inverse;
            if A != G1Projective::IDENTITY {
                return Ok(BBSplusSignature { A, e, s });
            }
        }
    }
}

pub(crate) fn core_verify<CS>(
    pk: &BBSplusPublicKey,
    signature: &BBSplusSignature,
    generators: &Generators,
    messages: &[BBSplusMessage],
) -> Result<(), Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    if generators.message_generators.len() != messages.len() {
        return Err(Error::MalformedInput("wrong number of generators".to_owned()));
    }

    let domain = calculate_domain::<CS>(pk, generators)?;
    let B = compute_B(generators, signature.s, domain, messages);

    // e(A, PK + BP2 * e) == e(B, BP2)
    let BP2 = G2Projective::GENERATOR;
    let A2 = pk.0 + BP2 * signature.e;

    let term1 = (&signature.A.to_affine(), &G2Prepared::from(A2.to_affine()));
    let term2 = (&B.to_affine(), &G2Prepared::from(-BP2.to_affine()));

    let pairing = multi_miller_loop(&[term1, term2]).final_exponentiation();

    if pairing == Gt::IDENTITY {
        Ok(())
    } else {
        Err(Error::VerificationFailed(
            "signature pairing equation does not hold".to_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbsplus::ciphersuites::Bls12381Sha256;
    use crate::bbsplus::keys::KeyPair;

    fn messages() -> Vec<Vec<u8>> {
        vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
    }

    #[test]
    fn sign_and_verify() {
        let keypair = KeyPair::generate::<Bls12381Sha256>(Some(&[1u8; 32])).unwrap();
        let signature = BBSplusSignature::sign::<Bls12381Sha256>(
            &messages(),
            keypair.private_key(),
            keypair.public_key(),
        )
        .unwrap();
        assert!(signature
            .verify::<Bls12381Sha256>(keypair.public_key(), &messages())
            .is_ok());
    }

    #[test]
    fn empty_message_sequence_is_rejected() {
        let keypair = KeyPair::generate::<Bls12381Sha256>(Some(&[1u8; 32])).unwrap();
        let result = BBSplusSignature::sign::<Bls12381Sha256>(
            &[],
            keypair.private_key(),
            keypair.public_key(),
        );
        assert!(matches!(result, Err(Error::MissingMessage(_))));
    }

    #[test]
    fn signature_bytes_round_trip() {
        let keypair = KeyPair::generate::<Bls12381Sha256>(Some(&[1u8; 32])).unwrap();
        let signature = BBSplusSignature::sign::<Bls12381Sha256>(
            &messages(),
            keypair.private_key(),
            keypair.public_key(),
        )
        .unwrap();
        let decoded = BBSplusSignature::from_bytes(&signature.to_bytes()).unwrap();
        assert_eq!(decoded, signature);
    }

    #[test]
    fn truncated_signature_is_malformed() {
        let result = BBSplusSignature::from_bytes(&[0u8; 64]);
        assert!(matches!(result, Err(Error::MalformedInput(_))));
    }
}
