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
use bls12_381_plus::G1Projective;
use elliptic_curve::hash2curve::{ExpandMsg, Expander};

/// Deterministic generator set for a fixed message count.
///
/// `q1` carries the signature blinding scalar `s`, `q2` the domain scalar,
/// and `message_generators[i]` the message at index `i`. All parties derive
/// the same set from the ciphersuite seeds, so indices line up between
/// commitment, signing and proof verification by construction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Generators {
    pub g1_base_point: G1Projective,
    pub q1: G1Projective,
    pub q2: G1Projective,
    pub message_generators: Vec<G1Projective>,
}

impl Generators {
    /// Create `q1`, `q2` and `message_count` message generators.
    pub fn create<CS>(message_count: usize) -> Generators
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        let base_point = Self::create_g1_base_point::<CS>();
        let mut generators: Vec<G1Projective> = Vec::with_capacity(message_count + 2);

        let mut v = vec![0u8; CS::EXPAND_LEN];
        let mut buffer = vec![0u8; CS::EXPAND_LEN];

        CS::Expander::expand_message(&[CS::GENERATOR_SEED], &[CS::GENERATOR_SEED_DST], CS::EXPAND_LEN)
            .expect("expand_message with fixed ciphersuite parameters")
            .fill_bytes(&mut v);

        let mut n = 1u32;
        while generators.len() < message_count + 2 {
            v.append(n.to_be_bytes().to_vec().as_mut());
            CS::Expander::expand_message(&[&v], &[CS::GENERATOR_SEED_DST], CS::EXPAND_LEN)
                .expect("expand_message with fixed ciphersuite parameters")
                .fill_bytes(&mut buffer);
            v = buffer.clone();
            n += 1;
            let candidate = G1Projective::hash::<CS::Expander>(&v, CS::GENERATOR_DST);
            if !generators.contains(&candidate) && candidate != base_point {
                generators.push(candidate);
            }
        }

        Generators {
            g1_base_point: base_point,
            q1: generators[0],
            q2: generators[1],
            message_generators: generators[2..].to_vec(),
        }
    }

    fn create_g1_base_point<CS>() -> G1Projective
    where
        CS: BbsCiphersuite,
        CS::Expander: for<'a> ExpandMsg<'a>,
    {
        let mut v = vec![0u8; CS::EXPAND_LEN];
        CS::Expander::expand_message(&[CS::GENERATOR_SEED_BP], &[CS::GENERATOR_SEED_DST], CS::EXPAND_LEN)
            .expect("expand_message with fixed ciphersuite parameters")
            .fill_bytes(&mut v);

        let extra = 1u32.to_be_bytes();
        let buffer = [v.as_slice(), &extra].concat();

        CS::Expander::expand_message(&[&buffer], &[CS::GENERATOR_SEED_DST], CS::EXPAND_LEN)
            .expect("expand_message with fixed ciphersuite parameters")
            .fill_bytes(&mut v);

        G1Projective::hash::<CS::Expander>(&v, CS::GENERATOR_DST)
    }
}
