//! The full offline spend flow: deposit, scan, build, observe the spend,
//! rescan.

use rg_merkle::TreeMirror;
use rg_note::Commitment;
use rg_testutil::{deposit, receiving_pubkey, token, wallet, ENCRYPTION_KEY};
use rg_transact::{CircuitKind, Erc20Transaction, OUTPUTS};
use rg_wallet::scan_index;

#[tokio::test]
async fn deposit_transfer_and_spend_detection() {
    let wallet = wallet("f100");
    let mirror = TreeMirror::new(1);

    // deposit a single large note and scan it in
    let amount = 11 * 10u128.pow(24);
    deposit(&mirror, receiving_pubkey(&wallet, 0), amount, 1);
    assert!(wallet.scan(1, &mirror, &ENCRYPTION_KEY).await.unwrap());

    let txos = wallet.txos(1, &mirror).unwrap();
    assert_eq!(txos.len(), 1);
    assert_eq!(txos[0].note.amount, amount);
    assert_eq!(txos[0].spend_txid, None);

    // build a transfer of 300 to a fresh pubkey
    let recipient = rg_testutil::keypair(b"fresh recipient");
    let mut transaction = Erc20Transaction::new(1, token());
    transaction
        .outputs
        .push(rg_note::Note::new(recipient.public_key, 300, token()));

    let built = transaction.generate_inputs(&wallet, &mirror).unwrap();

    assert_eq!(built.circuit, CircuitKind::Erc20Small);
    assert_eq!(built.outputs.len(), OUTPUTS);
    assert_eq!(built.outputs[0].amount, 300);
    // one dummy input pads the single real note; one dummy output pads
    // recipient + change
    assert_eq!(built.spent.len(), 1);
    assert_eq!(built.outputs[1].amount, amount - 300);
    assert_eq!(built.outputs[2].amount, 0);

    // pretend the chain accepted the spend: the new commitment batch lands
    // and the nullifier is observed
    let spend_txid = [0x77u8; 32];
    let entries: Vec<_> = built
        .inputs
        .commitments_out
        .iter()
        .zip(&built.ciphertexts)
        .map(|(hash, bundle)| {
            (
                Commitment::Encrypted(rg_note::EncryptedCommitment {
                    hash: *hash,
                    sender_pubkey: bundle.sender_pubkey,
                    ciphertext: bundle.ciphertext.clone(),
                    reveal_key: bundle.reveal_key.clone(),
                }),
                spend_txid,
            )
        })
        .collect();
    // the ciphertexts are opaque to keys other than the recipients'
    let stranger = rg_testutil::keypair(b"stranger");
    assert!(scan_index(&stranger, &entries[0].0).is_none());

    mirror
        .insert_commitments(0, mirror.leaf_count(0), &entries)
        .unwrap();
    for input in built.inputs.inputs.iter().filter(|input| !input.is_dummy()) {
        mirror.mark_nullified(input.nullifier, spend_txid);
    }

    // rescan: the original TXO is now spent, and the change output comes
    // back to the wallet
    assert!(wallet.scan(1, &mirror, &ENCRYPTION_KEY).await.unwrap());

    let txos = wallet.txos(1, &mirror).unwrap();
    let original = txos.iter().find(|t| t.position == 0).unwrap();
    assert_eq!(original.spend_txid, Some(spend_txid));

    let change = txos.iter().find(|t| t.change).unwrap();
    assert_eq!(change.note.amount, amount - 300);
    assert_eq!(change.txid, spend_txid);

    let balances = wallet.balances(1, &mirror).unwrap();
    assert_eq!(balances[&token()].balance, amount - 300);
}
