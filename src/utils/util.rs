use crate::bbsplus::ciphersuites::BbsCiphersuite;
use crate::bbsplus::generators::Generators;
use crate::bbsplus::keys::BBSplusPublicKey;
use crate::errors::Error;
use crate::utils::message::BBSplusMessage;
use bls12_381_plus::{G1Affine, G1Projective, Scalar};
use elliptic_curve::group::Curve;
use elliptic_curve::hash2curve::{ExpandMsg, Expander};
use rand::RngCore;

/// Big-endian integer-to-octet-string conversion, truncated/padded to `len` octets.
pub fn i2osp(x: usize, len: usize) -> Vec<u8> {
    let be = (x as u64).to_be_bytes();
    be[be.len() - len..].to_vec()
}

/// hash_to_scalar(msg_octets, dst): expand the input to `EXPAND_LEN` uniform
/// octets and reduce into the scalar field, retrying with an appended counter
/// in the (negligible) case the result is zero.
pub fn hash_to_scalar<CS>(msg_octets: &[u8], dst: &[u8]) -> Result<Scalar, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    if dst.len() > 255 {
        return Err(Error::MalformedInput("dst longer than 255 octets".to_owned()));
    }

    let mut counter: u8 = 0;
    let mut uniform_bytes = vec![0u8; CS::EXPAND_LEN];

    loop {
        let msg_prime = [msg_octets, &[counter]].concat();
        CS::Expander::expand_message(&[&msg_prime], &[dst], CS::EXPAND_LEN)
            .map_err(|_| Error::MalformedInput("hash-to-scalar expansion failed".to_owned()))?
            .fill_bytes(&mut uniform_bytes);

        let okm: &[u8; 48] = uniform_bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::MalformedInput("invalid expansion length".to_owned()))?;
        let hashed_scalar = Scalar::from_okm(okm);

        if hashed_scalar != Scalar::ZERO {
            return Ok(hashed_scalar);
        }

        counter = counter
            .checked_add(1)
            .ok_or_else(|| Error::MalformedInput("hash-to-scalar counter exhausted".to_owned()))?;
    }
}

/// A uniformly random scalar from the process CSPRNG.
pub fn get_random() -> Scalar {
    let mut rng = rand::thread_rng();
    let mut buf = [0u8; 48];
    rng.fill_bytes(&mut buf);
    Scalar::from_okm(&buf)
}

pub fn calculate_random_scalars(count: usize) -> Vec<Scalar> {
    (0..count).map(|_| get_random()).collect()
}

/// A fresh 32-octet nonce for proof presentation.
pub fn generate_nonce() -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let mut nonce = vec![0u8; 32];
    rng.fill_bytes(&mut nonce);
    nonce
}

/// Concatenation of the big-endian encodings of `scalars`.
pub fn serialize(scalars: &[Scalar]) -> Vec<u8> {
    let mut result: Vec<u8> = Vec::with_capacity(scalars.len() * Scalar::BYTES);
    for s in scalars {
        result.extend_from_slice(&s.to_be_bytes());
    }
    result
}

pub fn get_remaining_indexes(length: usize, indexes: &[usize]) -> Vec<usize> {
    (0..length).filter(|i| !indexes.contains(i)).collect()
}

pub fn get_messages(messages: &[BBSplusMessage], indexes: &[usize]) -> Vec<BBSplusMessage> {
    indexes.iter().map(|&i| messages[i]).collect()
}

pub fn parse_g1_projective(bytes: &[u8]) -> Result<G1Projective, Error> {
    let compressed: [u8; G1Projective::COMPRESSED_BYTES] = bytes
        .try_into()
        .map_err(|_| Error::MalformedInput("invalid G1 point length".to_owned()))?;
    let point = G1Affine::from_compressed(&compressed);
    if point.is_none().into() {
        return Err(Error::MalformedInput("invalid G1 point encoding".to_owned()));
    }
    Ok(G1Projective::from(point.unwrap()))
}

pub trait ScalarExt: Sized {
    fn to_bytes_be(&self) -> [u8; 32];
    fn from_bytes_be(bytes: &[u8]) -> Result<Self, Error>;
}

impl ScalarExt for Scalar {
    fn to_bytes_be(&self) -> [u8; 32] {
        self.to_be_bytes()
    }

    fn from_bytes_be(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; Scalar::BYTES] = bytes
            .try_into()
            .map_err(|_| Error::MalformedInput("invalid scalar length".to_owned()))?;
        let s = Scalar::from_be_bytes(&bytes);
        if s.is_none().into() {
            return Err(Error::MalformedInput("non-canonical scalar encoding".to_owned()));
        }
        Ok(s.unwrap())
    }
}

/// domain = hash_to_scalar(PK || L || Q1 || Q2 || H_1 || ... || H_L || ciphersuite_id)
///
/// Binds the public key and the full generator set used at signing time, so a
/// signature or proof cannot be verified against a different message count.
pub(crate) fn calculate_domain<CS>(
    pk: &BBSplusPublicKey,
    generators: &Generators,
) -> Result<Scalar, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let L = generators.message_generators.len();

    let mut dom_input: Vec<u8> = Vec::new();
    dom_input.extend_from_slice(&pk.to_bytes());
    dom_input.extend_from_slice(&i2osp(L, 8));
    dom_input.extend_from_slice(&generators.q1.to_affine().to_compressed());
    dom_input.extend_from_slice(&generators.q2.to_affine().to_compressed());
    generators
        .message_generators
        .iter()
        .for_each(|h| dom_input.extend_from_slice(&h.to_affine().to_compressed()));
    dom_input.extend_from_slice(CS::ID);

    hash_to_scalar::<CS>(&dom_input, &CS::h2s_dst())
}

/// challenge = hash_to_scalar(C || Cbar || n || G_1 || ... || G_n)
///
/// Fiat-Shamir challenge for the commitment proof-of-knowledge; the generator
/// list is bound so the proof cannot be replayed under a different basis.
pub(crate) fn calculate_blind_challenge<CS>(
    commitment: G1Projective,
    Cbar: G1Projective,
    generators: &[G1Projective],
) -> Result<Scalar, Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    let mut c_arr: Vec<u8> = Vec::new();
    c_arr.extend_from_slice(&commitment.to_affine().to_compressed());
    c_arr.extend_from_slice(&Cbar.to_affine().to_compressed());
    c_arr.extend_from_slice(&i2osp(generators.len(), 8));
    generators
        .iter()
        .for_each(|g| c_arr.extend_from_slice(&g.to_affine().to_compressed()));

    hash_to_scalar::<CS>(&c_arr, &CS::blind_challenge_dst())
}
