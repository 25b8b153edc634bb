//! The Groth16 prover adapter
//!
//! Proving runs in three external stages: the circom wasm witness
//! generator, Groth16 proof creation over the zkey, and a local
//! verification before the proof is surfaced. The on-chain verifier expects
//! each G2 coordinate pair in reversed order relative to the prover's
//! native output, so [`Proof`] stores the swapped form and the adapter
//! un-swaps on its way back into the Groth16 verifier.

use std::io::Cursor;

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_circom::{read_zkey, CircomReduction, WitnessCalculator};
use ark_ff::{BigInteger, PrimeField, UniformRand};
use ark_groth16::{prepare_verifying_key, Groth16, VerifyingKey};
use ark_snark::SNARK;
use rand::rngs::OsRng;
use rg_primitives::Element;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wasmer::{Module, Store};

use crate::artifacts::ArtifactStore;
use crate::{Erc20PrivateInputs, Error, PublicInputs, Result, LARGE_INPUTS, SMALL_INPUTS};

/// The two compiled spend circuits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CircuitKind {
    Erc20Small,
    Erc20Large,
}

impl CircuitKind {
    /// The artifact base name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Erc20Small => "erc20small",
            Self::Erc20Large => "erc20large",
        }
    }

    /// The circuit's input arity
    #[must_use]
    pub fn inputs(self) -> usize {
        match self {
            Self::Erc20Small => SMALL_INPUTS,
            Self::Erc20Large => LARGE_INPUTS,
        }
    }
}

/// A Groth16 proof in the on-chain verifier's encoding
///
/// `b` carries each coordinate pair with the imaginary component first, the
/// order the Solidity pairing precompile wrapper expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub a: [Element; 2],
    pub b: [[Element; 2]; 2],
    pub c: [Element; 2],
}

impl Proof {
    /// Re-encode a prover-native proof, swapping each G2 pair
    #[must_use]
    pub fn from_ark(proof: &ark_groth16::Proof<Bn254>) -> Self {
        Self {
            a: [fq_element(proof.a.x), fq_element(proof.a.y)],
            b: [
                [fq_element(proof.b.x.c1), fq_element(proof.b.x.c0)],
                [fq_element(proof.b.y.c1), fq_element(proof.b.y.c0)],
            ],
            c: [fq_element(proof.c.x), fq_element(proof.c.y)],
        }
    }

    /// Decode back to the prover-native order for the Groth16 verifier
    pub fn to_ark(&self) -> Result<ark_groth16::Proof<Bn254>> {
        let a = G1Affine::new_unchecked(element_fq(self.a[0])?, element_fq(self.a[1])?);
        let b = G2Affine::new_unchecked(
            Fq2::new(element_fq(self.b[0][1])?, element_fq(self.b[0][0])?),
            Fq2::new(element_fq(self.b[1][1])?, element_fq(self.b[1][0])?),
        );
        let c = G1Affine::new_unchecked(element_fq(self.c[0])?, element_fq(self.c[1])?);

        let on_curve = a.is_on_curve() && b.is_on_curve() && c.is_on_curve();
        if !on_curve {
            return Err(Error::ProofVerifyFailed("proof point not on curve"));
        }

        Ok(ark_groth16::Proof { a, b, c })
    }
}

/// Drives the witness generator and Groth16 over the circuit artifacts
pub struct Prover {
    artifacts: ArtifactStore,
}

impl Prover {
    #[must_use]
    pub fn new(artifact_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            artifacts: ArtifactStore::new(artifact_dir),
        }
    }

    /// Prove a spend
    ///
    /// The proof is locally re-verified before being returned; a proof that
    /// fails its own verification (witness-generator drift, artifact
    /// mismatch) surfaces as [`Error::ProofGenFailed`] and never reaches
    /// the chain.
    ///
    /// Witness generation and proving block for seconds on the large
    /// circuit; callers must not hold any lock across this call.
    #[tracing::instrument(err, skip(self, private), fields(circuit = circuit.name()))]
    pub fn prove(&self, circuit: CircuitKind, private: &Erc20PrivateInputs) -> Result<Proof> {
        private.validate()?;
        if private.inputs.len() != circuit.inputs() {
            return Err(Error::InvalidWitness("witness arity does not match circuit"));
        }

        let artifacts = self.artifacts.load(circuit)?;

        let witness = {
            let mut store = Store::default();
            let module = Module::new(&store, &artifacts.wasm)
                .map_err(|e| Error::WitnessGeneration(format!("wasm compile: {e}")))?;
            let mut calculator = WitnessCalculator::from_module(&mut store, module)
                .map_err(|e| Error::WitnessGeneration(e.to_string()))?;

            calculator
                .calculate_witness_element::<Fr, _>(&mut store, private.to_signal_map(), false)
                .map_err(|e| Error::WitnessGeneration(e.to_string()))?
        };
        debug!(signals = witness.len(), "witness generated");

        let mut cursor = Cursor::new(&artifacts.zkey);
        let (proving_key, matrices) = read_zkey(&mut cursor)
            .map_err(|e| Error::WitnessGeneration(format!("zkey parse: {e}")))?;

        let ark_proof = Groth16::<Bn254, CircomReduction>::create_proof_with_reduction_and_matrices(
            &proving_key,
            Fr::rand(&mut OsRng),
            Fr::rand(&mut OsRng),
            &matrices,
            matrices.num_instance_variables,
            matrices.num_constraints,
            &witness,
        )
        .map_err(|e| Error::WitnessGeneration(format!("groth16 prove: {e}")))?;

        let proof = Proof::from_ark(&ark_proof);

        // self-verify before surfacing: catches format drift at the
        // earliest point
        let public = private.public_inputs();
        if !verify_with_key(&proving_key.vk, &public, &proof) {
            return Err(Error::ProofGenFailed("self-verification rejected the proof"));
        }

        Ok(proof)
    }

    /// Verify a spend proof
    ///
    /// The public-input hash is always re-derived from `public`; an
    /// externally supplied hash is never trusted.
    #[tracing::instrument(err, skip(self, public, proof), fields(circuit = circuit.name()))]
    pub fn verify(
        &self,
        circuit: CircuitKind,
        public: &PublicInputs,
        proof: &Proof,
    ) -> Result<bool> {
        let artifacts = self.artifacts.load(circuit)?;

        let mut cursor = Cursor::new(&artifacts.zkey);
        let (proving_key, _) = read_zkey(&mut cursor)
            .map_err(|e| Error::WitnessGeneration(format!("zkey parse: {e}")))?;

        Ok(verify_with_key(&proving_key.vk, public, proof))
    }
}

fn verify_with_key(vk: &VerifyingKey<Bn254>, public: &PublicInputs, proof: &Proof) -> bool {
    // a proof that does not even decode to curve points cannot verify
    let Ok(ark_proof) = proof.to_ark() else {
        return false;
    };

    let pvk = prepare_verifying_key(vk);
    let hash_of_inputs = public.hash().to_fr();

    Groth16::<Bn254>::verify_with_processed_vk(&pvk, &[hash_of_inputs], &ark_proof)
        .unwrap_or(false)
}

fn fq_element(value: Fq) -> Element {
    let bytes = value.into_bigint().to_bytes_be();
    let mut padded = [0u8; 32];
    padded[32 - bytes.len()..].copy_from_slice(&bytes);
    Element::from_be_bytes(padded)
}

fn element_fq(element: Element) -> Result<Fq> {
    let fq = Fq::from_be_bytes_mod_order(&element.to_be_bytes());

    // reject non-canonical encodings rather than silently reducing them
    if fq_element(fq) != element {
        return Err(Error::ProofVerifyFailed(
            "proof coordinate exceeds the base field",
        ));
    }

    Ok(fq)
}
