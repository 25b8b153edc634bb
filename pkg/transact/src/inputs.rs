use std::collections::HashMap;

use num_bigint::BigUint;
use rg_merkle::MerklePath;
use rg_note::nullifier;
use rg_primitives::{digest, jubjub, Element};
use serde_json::json;

use crate::{Error, Result, LARGE_INPUTS, OUTPUTS, SMALL_INPUTS};

/// The adapter binding baked into a proof
///
/// An off-chain adapter contract and its parameters are hashed into the
/// public inputs so a proof cannot be replayed through a different adapter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdaptId {
    pub contract: Element,
    pub parameters: Element,
}

impl AdaptId {
    /// `sha256(contract || parameters) mod p`
    #[must_use]
    pub fn hash(&self) -> Element {
        let mut bytes = Vec::with_capacity(64);
        bytes.extend_from_slice(&self.contract.to_be_bytes());
        bytes.extend_from_slice(&self.parameters.to_be_bytes());
        digest::sha256_to_element(&bytes)
    }
}

/// One spend input of the witness: the secrets proving ownership of a leaf
/// plus its inclusion path
///
/// Dummy inputs carry `value = 0`, a throwaway key, a zeroed path and
/// position 0; the circuit skips their inclusion check.
#[derive(Clone, Debug)]
pub struct SpendInput {
    pub spending_key: Element,
    pub random: Element,
    pub value: u128,
    pub path: MerklePath,
    pub position: u64,
    pub nullifier: Element,
}

impl SpendInput {
    #[must_use]
    pub fn is_dummy(&self) -> bool {
        self.value == 0
    }

    /// Recompute this input's leaf commitment from its secrets
    pub fn commitment(&self, token: Element) -> Result<Element> {
        let pubkey = jubjub::private_to_public(self.spending_key);
        let (x, y) = jubjub::unpack_point_coords(&pubkey)?;
        Ok(rg_primitives::poseidon(&[
            x,
            y,
            Element::from(self.value),
            self.random,
            token,
        ]))
    }
}

/// The full private witness of an ERC-20 spend
///
/// Everything here except the values echoed in [`PublicInputs`] stays
/// private; the circuit exposes a single public input, the hash of the
/// public values (see [`PublicInputs::hash`]).
#[derive(Clone, Debug)]
pub struct Erc20PrivateInputs {
    pub adapt_id: AdaptId,
    pub token: Element,
    pub deposit_amount: u128,
    pub withdraw_amount: u128,
    pub output_token_field: Element,
    pub output_eth_address: Element,
    pub inputs: Vec<SpendInput>,
    pub tree_number: u64,
    pub merkle_root: Element,
    /// Unpacked recipient pubkey per output
    pub recipient_pubkeys: Vec<(Element, Element)>,
    pub random_out: Vec<Element>,
    pub values_out: Vec<u128>,
    pub commitments_out: Vec<Element>,
    pub ciphertext_hash: Element,
}

impl Erc20PrivateInputs {
    #[must_use]
    pub fn nullifiers(&self) -> Vec<Element> {
        self.inputs.iter().map(|input| input.nullifier).collect()
    }

    /// The values the verifier re-derives the public-input hash from
    #[must_use]
    pub fn public_inputs(&self) -> PublicInputs {
        PublicInputs {
            adapt_id_hash: self.adapt_id.hash(),
            deposit_amount: self.deposit_amount,
            withdraw_amount: self.withdraw_amount,
            output_token_field: self.output_token_field,
            output_eth_address: self.output_eth_address,
            tree_number: self.tree_number,
            merkle_root: self.merkle_root,
            nullifiers: self.nullifiers(),
            commitments_out: self.commitments_out.clone(),
            ciphertext_hash: self.ciphertext_hash,
        }
    }

    /// Check every circuit precondition that must hold before proving
    pub fn validate(&self) -> Result<()> {
        if self.inputs.len() != SMALL_INPUTS && self.inputs.len() != LARGE_INPUTS {
            return Err(Error::InvalidWitness("input count selects no circuit"));
        }

        let outputs_consistent = self.recipient_pubkeys.len() == OUTPUTS
            && self.random_out.len() == OUTPUTS
            && self.values_out.len() == OUTPUTS
            && self.commitments_out.len() == OUTPUTS;
        if !outputs_consistent {
            return Err(Error::InvalidWitness("outputs must be padded to three"));
        }

        let nullifiers = self.nullifiers();
        for (i, nullifier) in nullifiers.iter().enumerate() {
            if nullifiers[..i].contains(nullifier) {
                return Err(Error::InvalidWitness("duplicate nullifier"));
            }
        }

        for (i, input) in self.inputs.iter().enumerate() {
            let expected =
                nullifier(input.spending_key, self.tree_number, input.position);
            if input.nullifier != expected {
                return Err(Error::InvalidWitness("nullifier does not match its leaf"));
            }

            // dummies carry a zero path the circuit never checks
            if input.is_dummy() {
                continue;
            }

            let commitment = input.commitment(self.token)?;
            if input.path.compute_root(commitment) != self.merkle_root {
                return Err(Error::RootNotKnown { input: i });
            }
            if input.path.position() != input.position {
                return Err(Error::InvalidWitness("path indices disagree with position"));
            }
        }

        Ok(())
    }

    /// The witness generator's input assignment, with every field value as a
    /// decimal string
    #[must_use]
    pub fn to_assignment_json(&self) -> serde_json::Value {
        json!({
            "adaptID": decimal(self.adapt_id.hash()),
            "tokenField": decimal(self.token),
            "depositAmount": decimal(Element::from(self.deposit_amount)),
            "withdrawAmount": decimal(Element::from(self.withdraw_amount)),
            "outputTokenField": decimal(self.output_token_field),
            "outputEthAddress": decimal(self.output_eth_address),
            "randomIn": self.inputs.iter().map(|i| decimal(i.random)).collect::<Vec<_>>(),
            "valuesIn": self.inputs.iter().map(|i| decimal(Element::from(i.value))).collect::<Vec<_>>(),
            "spendingKeys": self.inputs.iter().map(|i| decimal(i.spending_key)).collect::<Vec<_>>(),
            "treeNumber": decimal(Element::from(self.tree_number)),
            "merkleRoot": decimal(self.merkle_root),
            "nullifiers": self.nullifiers().iter().map(|n| decimal(*n)).collect::<Vec<_>>(),
            "pathElements": self.inputs.iter()
                .map(|i| i.path.elements.iter().map(|e| decimal(*e)).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
            "pathIndices": self.inputs.iter().map(|i| decimal(Element::from(i.position))).collect::<Vec<_>>(),
            "recipientPK": self.recipient_pubkeys.iter()
                .map(|(x, y)| vec![decimal(*x), decimal(*y)])
                .collect::<Vec<_>>(),
            "randomOut": self.random_out.iter().map(|r| decimal(*r)).collect::<Vec<_>>(),
            "valuesOut": self.values_out.iter().map(|v| decimal(Element::from(*v))).collect::<Vec<_>>(),
            "commitmentsOut": self.commitments_out.iter().map(|c| decimal(*c)).collect::<Vec<_>>(),
            "ciphertextHash": decimal(self.ciphertext_hash),
        })
    }

    /// The same assignment as flat per-signal integer lists (the shape the
    /// wasm witness calculator consumes; 2D signals are flattened in row
    /// order)
    #[must_use]
    pub fn to_signal_map(&self) -> HashMap<String, Vec<num_bigint::BigInt>> {
        let int = |e: Element| num_bigint::BigInt::from(biguint(e));
        let mut signals = HashMap::new();

        let mut insert = |name: &str, values: Vec<num_bigint::BigInt>| {
            signals.insert(name.to_string(), values);
        };

        insert("adaptID", vec![int(self.adapt_id.hash())]);
        insert("tokenField", vec![int(self.token)]);
        insert("depositAmount", vec![int(Element::from(self.deposit_amount))]);
        insert("withdrawAmount", vec![int(Element::from(self.withdraw_amount))]);
        insert("outputTokenField", vec![int(self.output_token_field)]);
        insert("outputEthAddress", vec![int(self.output_eth_address)]);
        insert("randomIn", self.inputs.iter().map(|i| int(i.random)).collect());
        insert(
            "valuesIn",
            self.inputs.iter().map(|i| int(Element::from(i.value))).collect(),
        );
        insert(
            "spendingKeys",
            self.inputs.iter().map(|i| int(i.spending_key)).collect(),
        );
        insert("treeNumber", vec![int(Element::from(self.tree_number))]);
        insert("merkleRoot", vec![int(self.merkle_root)]);
        insert("nullifiers", self.nullifiers().iter().map(|n| int(*n)).collect());
        insert(
            "pathElements",
            self.inputs
                .iter()
                .flat_map(|i| i.path.elements.iter().map(|e| int(*e)))
                .collect(),
        );
        insert(
            "pathIndices",
            self.inputs.iter().map(|i| int(Element::from(i.position))).collect(),
        );
        insert(
            "recipientPK",
            self.recipient_pubkeys
                .iter()
                .flat_map(|(x, y)| [int(*x), int(*y)])
                .collect(),
        );
        insert("randomOut", self.random_out.iter().map(|r| int(*r)).collect());
        insert(
            "valuesOut",
            self.values_out.iter().map(|v| int(Element::from(*v))).collect(),
        );
        insert(
            "commitmentsOut",
            self.commitments_out.iter().map(|c| int(*c)).collect(),
        );
        insert("ciphertextHash", vec![int(self.ciphertext_hash)]);

        signals
    }
}

/// The public values bound into a spend
///
/// The circuit exposes exactly one public input: [`PublicInputs::hash`].
/// The wallet never trusts an externally supplied hash; both prove and
/// verify re-derive it from these values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicInputs {
    pub adapt_id_hash: Element,
    pub deposit_amount: u128,
    pub withdraw_amount: u128,
    pub output_token_field: Element,
    pub output_eth_address: Element,
    pub tree_number: u64,
    pub merkle_root: Element,
    pub nullifiers: Vec<Element>,
    pub commitments_out: Vec<Element>,
    pub ciphertext_hash: Element,
}

impl PublicInputs {
    /// `sha256` over every public value, each left-padded to 32 bytes, in
    /// the circuit's fixed order, reduced mod p
    #[must_use]
    pub fn hash(&self) -> Element {
        let mut bytes = Vec::new();

        let mut push = |element: Element| bytes.extend_from_slice(&element.to_be_bytes());

        push(self.adapt_id_hash);
        push(Element::from(self.deposit_amount));
        push(Element::from(self.withdraw_amount));
        push(self.output_token_field);
        push(self.output_eth_address);
        push(Element::from(self.tree_number));
        push(self.merkle_root);
        for nullifier in &self.nullifiers {
            push(*nullifier);
        }
        for commitment in &self.commitments_out {
            push(*commitment);
        }
        push(self.ciphertext_hash);

        digest::sha256_to_element(&bytes)
    }
}

fn biguint(element: Element) -> BigUint {
    BigUint::from_bytes_be(&element.reduce().to_be_bytes())
}

fn decimal(element: Element) -> String {
    biguint(element).to_str_radix(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn public_inputs() -> PublicInputs {
        PublicInputs {
            adapt_id_hash: AdaptId::default().hash(),
            deposit_amount: 0,
            withdraw_amount: 5,
            output_token_field: Element::new(1),
            output_eth_address: Element::new(2),
            tree_number: 0,
            merkle_root: Element::new(3),
            nullifiers: vec![Element::new(4), Element::new(5)],
            commitments_out: vec![Element::new(6), Element::new(7), Element::new(8)],
            ciphertext_hash: Element::new(9),
        }
    }

    #[test]
    fn hash_is_deterministic_and_canonical() {
        let inputs = public_inputs();
        assert_eq!(inputs.hash(), inputs.hash());
        assert!(inputs.hash().is_canonical());
    }

    #[test]
    fn hash_binds_every_field() {
        let base = public_inputs().hash();

        let mut changed = public_inputs();
        changed.withdraw_amount = 6;
        assert_ne!(changed.hash(), base);

        let mut changed = public_inputs();
        changed.nullifiers[1] = Element::new(50);
        assert_ne!(changed.hash(), base);

        let mut changed = public_inputs();
        changed.commitments_out[0] = Element::new(50);
        assert_ne!(changed.hash(), base);

        let mut changed = public_inputs();
        changed.ciphertext_hash = Element::new(50);
        assert_ne!(changed.hash(), base);
    }

    #[test]
    fn adapt_id_hash_changes_with_parameters() {
        let a = AdaptId {
            contract: Element::new(1),
            parameters: Element::new(2),
        };
        let b = AdaptId {
            contract: Element::new(1),
            parameters: Element::new(3),
        };

        assert_ne!(a.hash(), b.hash());
        assert!(a.hash().is_canonical());
    }

    #[test]
    fn decimal_strings_are_decimal() {
        assert_eq!(decimal(Element::new(255)), "255");
        assert_eq!(decimal(Element::ZERO), "0");
    }
}
