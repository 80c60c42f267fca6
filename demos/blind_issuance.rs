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

use std::collections::BTreeMap;
use std::env;

use blindsig::bbsplus::ciphersuites::{BbsCiphersuite, Bls12381Sha256, Bls12381Shake256};
use blindsig::bbsplus::commitment::{verify_commitment, BlindCommitmentContext};
use blindsig::bbsplus::keys::KeyPair;
use blindsig::bbsplus::proof::BBSplusPoKSignature;
use blindsig::bbsplus::signature::BBSplusSignature;
use blindsig::errors::Error;
use blindsig::utils::util::generate_nonce;
use elliptic_curve::hash2curve::ExpandMsg;

const MSGS: [&str; 3] = [
    "alice@example.org",
    "credential-id-4521",
    "issued-2025-03-14",
];

fn blind_issuance_main<CS>() -> Result<(), Error>
where
    CS: BbsCiphersuite,
    CS::Expander: for<'a> ExpandMsg<'a>,
{
    log::info!("Messages: {:?}", MSGS);

    log::info!("Keypair Generation");
    let issuer_keypair = KeyPair::generate::<CS>(None)?;
    let issuer_pk = issuer_keypair.public_key();
    log::info!("SK: {}", issuer_keypair.private_key().encode());
    log::info!("PK: {}", issuer_pk.encode());

    // Holder: populate a commitment context over the messages to be hidden
    // from the issuer.
    log::info!("Computing pedersen commitment on messages");
    let handle = BlindCommitmentContext::init(MSGS.len())?;
    BlindCommitmentContext::set_public_key(handle, issuer_pk)?;
    for (i, msg) in MSGS.iter().enumerate() {
        BlindCommitmentContext::add_message_str(handle, i, msg)?;
    }
    let bundle = BlindCommitmentContext::finish::<CS>(handle)?;
    log::info!("Commitment: {}", hex::encode(bundle.commitment_to_bytes()));

    // Issuer: check the commitment opens to well-formed scalars before
    // issuing over it.
    log::info!("Verification of the Zero-Knowledge proof of the committed messages");
    verify_commitment::<CS>(
        &bundle.commitment_to_bytes(),
        &bundle.proof_to_bytes(),
        MSGS.len(),
    )?;
    log::info!("Commitment is VALID!");

    let messages: Vec<Vec<u8>> = MSGS.iter().map(|m| m.as_bytes().to_vec()).collect();

    log::info!("Signature Computation...");
    let signature =
        BBSplusSignature::sign::<CS>(&messages, issuer_keypair.private_key(), issuer_pk)?;
    log::info!("Signature: {}", signature.encode());

    log::info!("Signature verification...");
    signature.verify::<CS>(issuer_pk, &messages)?;
    log::info!("Signature is VALID!");

    // Holder receives a nonce from the Verifier.
    let nonce_verifier = generate_nonce();
    log::info!("Generate Nonce...");
    log::info!("Nonce: {}", hex::encode(&nonce_verifier));

    // Holder discloses only the credential id.
    let disclosed_indexes = [1usize];
    log::info!("Computation of a Zero-Knowledge proof-of-knowledge of the signature");
    let proof = BBSplusPoKSignature::proof_gen::<CS>(
        &signature,
        issuer_pk,
        &nonce_verifier,
        &messages,
        &disclosed_indexes,
    )?;
    log::info!("Proof: {}", proof.encode());

    log::info!("Signature Proof of Knowledge verification...");
    let mut disclosed = BTreeMap::new();
    for &i in &disclosed_indexes {
        disclosed.insert(i, messages[i].clone());
    }
    proof.proof_verify::<CS>(issuer_pk, &disclosed, &nonce_verifier)?;
    log::info!("Signature Proof of Knowledge is VALID!");

    Ok(())
}

fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        println!(
            "Usage: {} <cipher_suite>
                Ciphersuites:
                    - BLS12-381-SHA-256
                    - BLS12-381-SHAKE-256",
            args[0]
        );
        return;
    }

    let cipher_suite = &args[1];

    let result = match cipher_suite.as_str() {
        "BLS12-381-SHA-256" => {
            log::info!("Ciphersuite: BLS12-381-SHA-256");
            blind_issuance_main::<Bls12381Sha256>()
        }
        "BLS12-381-SHAKE-256" => {
            log::info!("Ciphersuite: BLS12-381-SHAKE-256");
            blind_issuance_main::<Bls12381Shake256>()
        }
        _ => {
            println!("Unknown cipher suite: {}", cipher_suite);
            return;
        }
    };

    if let Err(e) = result {
        log::error!("Error: {}", e);
    }
}
