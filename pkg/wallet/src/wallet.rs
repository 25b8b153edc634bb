use std::collections::HashMap;
use std::sync::Arc;

use borsh::{BorshDeserialize, BorshSerialize};
use parking_lot::Mutex;
use rg_merkle::TreeMirror;
use rg_note::{nullifier, Commitment, Note};
use rg_primitives::jubjub::{self, Keypair};
use rg_primitives::TxId;
use rg_store::{keys as layout, open_value, seal_value, KeyValueStore};
use tokio::sync::broadcast;
use tracing::debug;

use crate::keys::KeyChain;
use crate::{
    Balances, BalancesByTree, Error, Result, TokenBalance, TxoRecord, WalletDetails,
};

/// How many consecutive unused derivation indices the sweep looks past the
/// highest used one before giving up
pub const DEFAULT_GAP_LIMIT: u64 = 5;

#[derive(BorshSerialize, BorshDeserialize)]
struct MnemonicBlob {
    mnemonic: String,
    derivation_path: String,
}

/// A shielded wallet bound to one key-value store
///
/// The wallet keeps its keys in memory only; the mnemonic is persisted
/// encrypted under the caller's symmetric key, and every call that touches
/// encrypted storage re-checks that key against the in-memory one.
pub struct Wallet<S> {
    id: String,
    store: Arc<S>,
    keys: KeyChain,
    encryption_key: [u8; 32],
    gap_limit: u64,
    scan_locks: Mutex<HashMap<u64, Arc<tokio::sync::Mutex<()>>>>,
    scanned_tx: broadcast::Sender<u64>,
}

impl<S: KeyValueStore> Wallet<S> {
    /// Create a wallet from a mnemonic and persist the encrypted mnemonic
    /// blob
    pub fn create(
        store: Arc<S>,
        id: impl Into<String>,
        mnemonic: &str,
        derivation_path: &str,
        encryption_key: [u8; 32],
    ) -> Result<Self> {
        let id = id.into();
        let keys = KeyChain::from_mnemonic(mnemonic, derivation_path)?;

        let blob = MnemonicBlob {
            mnemonic: mnemonic.to_string(),
            derivation_path: derivation_path.to_string(),
        };
        let plaintext = borsh::to_vec(&blob).expect("in-memory serialization cannot fail");
        store.put(
            &layout::mnemonic_key(&id),
            &seal_value(&encryption_key, &plaintext),
        )?;

        Ok(Self::assemble(store, id, keys, encryption_key))
    }

    /// Load a previously created wallet
    ///
    /// Fails with [`Error::WrongEncryptionKey`] when the stored mnemonic
    /// blob does not decrypt under the supplied key.
    pub fn load(store: Arc<S>, id: impl Into<String>, encryption_key: [u8; 32]) -> Result<Self> {
        let id = id.into();

        let sealed = store
            .get(&layout::mnemonic_key(&id))?
            .ok_or(Error::Corrupt("no mnemonic blob for wallet id"))?;
        let plaintext = open_value(&encryption_key, &sealed)?;

        // CTR gives no authenticity: a wrong key surfaces as undecodable borsh
        let blob =
            MnemonicBlob::try_from_slice(&plaintext).map_err(|_| Error::WrongEncryptionKey)?;
        let keys = KeyChain::from_mnemonic(&blob.mnemonic, &blob.derivation_path)
            .map_err(|_| Error::WrongEncryptionKey)?;

        Ok(Self::assemble(store, id, keys, encryption_key))
    }

    fn assemble(store: Arc<S>, id: String, keys: KeyChain, encryption_key: [u8; 32]) -> Self {
        let (scanned_tx, _) = broadcast::channel(16);
        Self {
            id,
            store,
            keys,
            encryption_key,
            gap_limit: DEFAULT_GAP_LIMIT,
            scan_locks: Mutex::new(HashMap::new()),
            scanned_tx,
        }
    }

    #[must_use]
    pub fn with_gap_limit(mut self, gap_limit: u64) -> Self {
        self.gap_limit = gap_limit;
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The receiving address at a derivation index
    #[must_use]
    pub fn address(&self, index: u64, chain_id: Option<u64>) -> String {
        self.keys.address(index, chain_id)
    }

    /// The keypair a TXO record was received at
    #[must_use]
    pub fn keypair_for(&self, record: &TxoRecord) -> Keypair {
        self.keys.keypair(record.change, record.index)
    }

    /// The change keypair at an index (index 0 receives transaction change)
    #[must_use]
    pub fn change_keypair(&self, index: u64) -> Keypair {
        self.keys.keypair(true, index)
    }

    /// The audit view key (see [`KeyChain::view_key`])
    #[must_use]
    pub fn view_key(&self) -> [u8; 32] {
        self.keys.view_key()
    }

    /// Notifications for completed scans, carrying the chain id
    #[must_use]
    pub fn subscribe_scanned(&self) -> broadcast::Receiver<u64> {
        self.scanned_tx.subscribe()
    }

    /// Scan a chain's mirror for commitments addressed to this wallet
    ///
    /// Scans are serialized per chain: a second call while one is in flight
    /// observes the lock and returns `Ok(false)` without doing any work.
    #[tracing::instrument(err, skip(self, mirror, encryption_key), fields(wallet = %self.id))]
    pub async fn scan(
        &self,
        chain_id: u64,
        mirror: &TreeMirror,
        encryption_key: &[u8; 32],
    ) -> Result<bool> {
        self.check_key(encryption_key)?;

        let lock = self.chain_lock(chain_id);
        let Ok(_guard) = lock.try_lock() else {
            debug!(chain_id, "scan already in flight");
            return Ok(false);
        };

        let mut details = self.load_details()?;
        details.extend_trees(mirror.latest_tree());

        for tree in 0..=mirror.latest_tree() {
            let start = details.tree_scanned_heights[tree as usize];
            let candidates = mirror.commitments_from(tree, start);
            if candidates.is_empty() {
                continue;
            }

            for change in [false, true] {
                let height = self.scan_leaves(chain_id, tree, &candidates, change, &details)?;
                details.raise_height(change, height);
            }

            details.tree_scanned_heights[tree as usize] = start + candidates.len() as u64;
            debug!(chain_id, tree, scanned = candidates.len(), "tree scanned");
        }

        self.save_details(&details)?;
        let _ = self.scanned_tx.send(chain_id);

        Ok(true)
    }

    /// Sweep derivation indices against a batch of candidate commitments
    ///
    /// Indices `[0, height + gap_limit)` are scanned; a match at index `i`
    /// lifts the height to `i`, which extends the window. The sweep ends
    /// when a full window has been scanned without extending it.
    fn scan_leaves(
        &self,
        chain_id: u64,
        tree: u64,
        candidates: &[(u64, Commitment, TxId)],
        change: bool,
        details: &WalletDetails,
    ) -> Result<u64> {
        let mut height = details.height(change);
        let mut scanned = 0u64;

        loop {
            let target = height + self.gap_limit;
            if target <= scanned {
                break;
            }

            for index in scanned..target {
                let keypair = self.keys.keypair(change, index);

                for (position, commitment, txid) in candidates {
                    let Some(note) = scan_index(&keypair, commitment) else {
                        continue;
                    };

                    self.store_txo(chain_id, tree, *position, index, change, *txid, &keypair, note)?;
                    height = height.max(index);
                }
            }

            scanned = target;
        }

        Ok(height)
    }

    #[allow(clippy::too_many_arguments)]
    fn store_txo(
        &self,
        chain_id: u64,
        tree: u64,
        position: u64,
        index: u64,
        change: bool,
        txid: TxId,
        keypair: &Keypair,
        note: Note,
    ) -> Result<()> {
        let key = layout::txo_key(&self.id, chain_id, tree, position);

        // records are immutable apart from spend_txid: never overwrite
        if self.store.get(&key)?.is_some() {
            return Ok(());
        }

        let record = TxoRecord {
            tree,
            position,
            index,
            change,
            txid,
            spend_txid: None,
            nullifier: nullifier(keypair.private_key, tree, position),
            note,
        };

        debug!(tree, position, index, change, "received note");
        self.store.put(
            &key,
            &borsh::to_vec(&record).expect("in-memory serialization cannot fail"),
        )?;
        Ok(())
    }

    /// All of the wallet's TXO records on a chain
    ///
    /// Any record still marked unspent is re-checked against the mirror's
    /// nullifier index and, if its spend has since been observed, updated in
    /// place before being returned.
    pub fn txos(&self, chain_id: u64, mirror: &TreeMirror) -> Result<Vec<TxoRecord>> {
        let mut records = Vec::new();

        for (key, value) in self.store.scan_prefix(&layout::txo_prefix(&self.id, chain_id))? {
            let mut record = TxoRecord::try_from_slice(&value)
                .map_err(|_| Error::Corrupt("undecodable txo record"))?;

            if record.spend_txid.is_none() {
                if let Some(spend_txid) = mirror.get_nullified(record.nullifier) {
                    record.spend_txid = Some(spend_txid);
                    self.store.put(
                        &key,
                        &borsh::to_vec(&record).expect("in-memory serialization cannot fail"),
                    )?;
                }
            }

            records.push(record);
        }

        Ok(records)
    }

    /// Unspent value grouped by token
    pub fn balances(&self, chain_id: u64, mirror: &TreeMirror) -> Result<Balances> {
        let mut balances = Balances::new();

        for record in self.txos(chain_id, mirror)? {
            if record.is_unspent() {
                balances
                    .entry(record.note.token)
                    .or_insert_with(TokenBalance::default)
                    .push(record);
            }
        }

        Ok(balances)
    }

    /// Unspent value grouped by token, then by tree
    pub fn balances_by_tree(&self, chain_id: u64, mirror: &TreeMirror) -> Result<BalancesByTree> {
        let mut balances = BalancesByTree::new();

        for record in self.txos(chain_id, mirror)? {
            if record.is_unspent() {
                balances
                    .entry(record.note.token)
                    .or_insert_with(HashMap::new)
                    .entry(record.tree)
                    .or_insert_with(TokenBalance::default)
                    .push(record);
            }
        }

        Ok(balances)
    }

    fn check_key(&self, encryption_key: &[u8; 32]) -> Result<()> {
        if *encryption_key != self.encryption_key {
            return Err(Error::WrongEncryptionKey);
        }
        Ok(())
    }

    fn chain_lock(&self, chain_id: u64) -> Arc<tokio::sync::Mutex<()>> {
        self.scan_locks
            .lock()
            .entry(chain_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn load_details(&self) -> Result<WalletDetails> {
        let Some(sealed) = self.store.get(&layout::wallet_details_key(&self.id))? else {
            return Ok(WalletDetails::default());
        };

        let plaintext = open_value(&self.encryption_key, &sealed)?;
        WalletDetails::try_from_slice(&plaintext).map_err(|_| Error::Corrupt("wallet details"))
    }

    fn save_details(&self, details: &WalletDetails) -> Result<()> {
        let plaintext = borsh::to_vec(details).expect("in-memory serialization cannot fail");
        self.store.put(
            &layout::wallet_details_key(&self.id),
            &seal_value(&self.encryption_key, &plaintext),
        )?;
        Ok(())
    }
}

/// Check a single commitment against a single derived keypair
///
/// Cleartext deposits match by pubkey equality; encrypted commitments are
/// tried via ECDH + decryption. Cryptographic failures (an undecodable
/// sender point, a malformed ciphertext) mean "not ours" and never abort
/// the sweep.
#[must_use]
pub fn scan_index(keypair: &Keypair, commitment: &Commitment) -> Option<Note> {
    match commitment {
        Commitment::Generated(note) => {
            (note.pubkey == keypair.public_key).then(|| note.clone())
        }
        Commitment::Encrypted(encrypted) => {
            let shared = jubjub::ecdh(keypair.private_key, &encrypted.sender_pubkey).ok()?;
            let note = Note::decrypt(&encrypted.ciphertext, &shared).ok()?;
            (note.pubkey == keypair.public_key).then_some(note)
        }
    }
}

#[cfg(test)]
mod tests {
    use rg_note::EncryptedCommitment;
    use rg_primitives::{aes, Element};
    use rg_store::MemoryStore;

    use super::*;

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const KEY: [u8; 32] = [9u8; 32];

    fn wallet() -> Wallet<MemoryStore> {
        Wallet::create(
            Arc::new(MemoryStore::new()),
            "77aa",
            PHRASE,
            crate::DEFAULT_DERIVATION_PATH,
            KEY,
        )
        .unwrap()
    }

    fn token() -> Element {
        Element::from_be_slice(&[0xee; 20]).unwrap()
    }

    fn deposit(mirror: &TreeMirror, pubkey: [u8; 32], amount: u128, txid: u8) {
        let tree = 0;
        let start = mirror.leaf_count(tree);
        let note = Note::with_random(pubkey, Element::new(u64::from(txid)), amount, token());
        mirror
            .insert_commitments(tree, start, &[(Commitment::Generated(note), [txid; 32])])
            .unwrap();
    }

    #[tokio::test]
    async fn deposit_is_scanned_into_a_txo() {
        let wallet = wallet();
        let mirror = TreeMirror::new(1);

        let amount = 11 * 10u128.pow(24);
        deposit(&mirror, wallet.keypair_for_index(0).public_key, amount, 1);

        assert!(wallet.scan(1, &mirror, &KEY).await.unwrap());

        let txos = wallet.txos(1, &mirror).unwrap();
        assert_eq!(txos.len(), 1);
        assert_eq!(txos[0].note.amount, amount);
        assert_eq!(txos[0].spend_txid, None);
        assert_eq!(txos[0].index, 0);
        assert!(!txos[0].change);

        let balances = wallet.balances(1, &mirror).unwrap();
        assert_eq!(balances[&token()].balance, amount);
    }

    #[tokio::test]
    async fn encrypted_commitment_is_scanned() {
        let wallet = wallet();
        let mirror = TreeMirror::new(1);

        let recipient = wallet.keypair_for_index(0);
        let note = Note::with_random(recipient.public_key, Element::new(5), 300, token());

        let sender = Keypair::from_seed(b"sender");
        let shared = jubjub::ecdh(sender.private_key, &recipient.public_key).unwrap();

        let encrypted = EncryptedCommitment {
            hash: note.commitment().unwrap(),
            sender_pubkey: sender.public_key,
            ciphertext: note.encrypt(&shared),
            reveal_key: aes::encrypt(&shared, &[1u8; 32]),
        };
        mirror
            .insert_commitments(0, 0, &[(Commitment::Encrypted(encrypted), [2; 32])])
            .unwrap();

        wallet.scan(1, &mirror, &KEY).await.unwrap();

        let txos = wallet.txos(1, &mirror).unwrap();
        assert_eq!(txos.len(), 1);
        assert_eq!(txos[0].note, note);
    }

    #[tokio::test]
    async fn scan_is_idempotent() {
        let wallet = wallet();
        let mirror = TreeMirror::new(1);
        deposit(&mirror, wallet.keypair_for_index(0).public_key, 100, 1);

        wallet.scan(1, &mirror, &KEY).await.unwrap();
        let details_before = wallet.load_details().unwrap();
        let txos_before = wallet.txos(1, &mirror).unwrap();

        wallet.scan(1, &mirror, &KEY).await.unwrap();
        assert_eq!(wallet.load_details().unwrap(), details_before);
        assert_eq!(wallet.txos(1, &mirror).unwrap(), txos_before);
    }

    #[tokio::test]
    async fn gap_limit_boundary() {
        // a note at index gap_limit - 1 is found by one scan
        let wallet = wallet();
        let mirror = TreeMirror::new(1);
        deposit(
            &mirror,
            wallet.keypair_for_index(DEFAULT_GAP_LIMIT - 1).public_key,
            100,
            1,
        );

        wallet.scan(1, &mirror, &KEY).await.unwrap();
        assert_eq!(wallet.txos(1, &mirror).unwrap().len(), 1);
        assert_eq!(wallet.load_details().unwrap().primary_height, 4);

        // a note at index gap_limit is out of the sweep window of a fresh
        // wallet
        let other = Wallet::create(
            Arc::new(MemoryStore::new()),
            "77ab",
            PHRASE,
            "m/44'/1984'/0'/1'",
            KEY,
        )
        .unwrap();
        let mirror = TreeMirror::new(1);
        deposit(
            &mirror,
            other.keypair_for_index(DEFAULT_GAP_LIMIT).public_key,
            100,
            1,
        );

        other.scan(1, &mirror, &KEY).await.unwrap();
        assert_eq!(other.txos(1, &mirror).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn spend_is_detected_via_nullifier_index() {
        let wallet = wallet();
        let mirror = TreeMirror::new(1);
        deposit(&mirror, wallet.keypair_for_index(0).public_key, 100, 1);

        wallet.scan(1, &mirror, &KEY).await.unwrap();
        let record = wallet.txos(1, &mirror).unwrap().remove(0);

        mirror.mark_nullified(record.nullifier, [0xdd; 32]);

        let txos = wallet.txos(1, &mirror).unwrap();
        assert_eq!(txos[0].spend_txid, Some([0xdd; 32]));
        assert!(wallet.balances(1, &mirror).unwrap().is_empty());

        // the update persisted: a second read agrees
        let txos = wallet.txos(1, &mirror).unwrap();
        assert_eq!(txos[0].spend_txid, Some([0xdd; 32]));
    }

    #[tokio::test]
    async fn wrong_encryption_key_is_rejected() {
        let wallet = wallet();
        let mirror = TreeMirror::new(1);

        let result = wallet.scan(1, &mirror, &[0u8; 32]).await;
        assert!(matches!(result, Err(Error::WrongEncryptionKey)));
    }

    #[tokio::test]
    async fn second_scan_observes_the_lock() {
        let wallet = Arc::new(wallet());
        let mirror = TreeMirror::new(1);

        let lock = wallet.chain_lock(1);
        let guard = lock.lock().await;

        // with the chain lock held, scan backs off without touching state
        assert!(!wallet.scan(1, &mirror, &KEY).await.unwrap());
        drop(guard);

        assert!(wallet.scan(1, &mirror, &KEY).await.unwrap());
    }

    #[test]
    fn load_roundtrip_and_wrong_key() {
        let store = Arc::new(MemoryStore::new());
        let created = Wallet::create(
            store.clone(),
            "beef",
            PHRASE,
            crate::DEFAULT_DERIVATION_PATH,
            KEY,
        )
        .unwrap();

        let loaded = Wallet::load(store.clone(), "beef", KEY).unwrap();
        assert_eq!(
            created.keypair_for_index(0).public_key,
            loaded.keypair_for_index(0).public_key
        );

        assert!(matches!(
            Wallet::load(store, "beef", [1u8; 32]),
            Err(Error::WrongEncryptionKey)
        ));
    }

    impl Wallet<MemoryStore> {
        fn keypair_for_index(&self, index: u64) -> Keypair {
            self.keys.keypair(false, index)
        }
    }
}
