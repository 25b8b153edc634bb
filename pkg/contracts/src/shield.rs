use std::time::Duration;

use ethereum_types::{Address, H256, U256};
use rg_merkle::TreeMirror;
use rg_note::{EncryptedCommitment, Note};
use rg_primitives::aes::{BlockCiphertext, Ciphertext};
use rg_primitives::{jubjub, Element, TxId};
use rg_store::{keys as layout, KeyValueStore};
use sha3::{Digest, Keccak256};
use tokio::sync::watch;
use tracing::{debug, warn};
use web3::contract::Contract;
use web3::ethabi::{self, ParamType, Token};
use web3::signing::{Key, SecretKey, SecretKeyRef};
use web3::transports::Http;
use web3::types::{FilterBuilder, Log};

use crate::calldata::{DepositPreimage, TransactSpend};
use crate::client::IsNetworkFailure;
use crate::events::{apply_events, ShieldEvent};
use crate::{Client, Error, Result, MAX_RETRIES, SCAN_CHUNK};

const GENERATED_COMMITMENT_BATCH_SIG: &str =
    "GeneratedCommitmentBatch(uint256,uint256,(uint256[2],uint256,uint256,uint8,uint256,uint256)[])";
const COMMITMENT_BATCH_SIG: &str =
    "CommitmentBatch(uint256,uint256,(uint256,uint256[],uint256[2],uint256[])[])";
const NULLIFIER_SIG: &str = "Nullifier(uint256)";

/// The functions this library calls, as an inline ABI document
const SHIELD_ABI: &str = r#"[
  {
    "name": "generateDeposit",
    "type": "function",
    "stateMutability": "nonpayable",
    "outputs": [],
    "inputs": [
      {
        "name": "_transactions",
        "type": "tuple[]",
        "components": [
          { "name": "pubkey", "type": "uint256[2]" },
          { "name": "random", "type": "uint256" },
          { "name": "amount", "type": "uint256" },
          { "name": "tokenType", "type": "uint8" },
          { "name": "tokenSubID", "type": "uint256" },
          { "name": "token", "type": "uint256" }
        ]
      }
    ]
  },
  {
    "name": "transact",
    "type": "function",
    "stateMutability": "nonpayable",
    "outputs": [],
    "inputs": [
      {
        "name": "_transactions",
        "type": "tuple[]",
        "components": [
          {
            "name": "proof",
            "type": "tuple",
            "components": [
              { "name": "a", "type": "uint256[2]" },
              { "name": "b", "type": "uint256[2][2]" },
              { "name": "c", "type": "uint256[2]" }
            ]
          },
          { "name": "adaptIDcontract", "type": "address" },
          { "name": "adaptIDparameters", "type": "uint256" },
          { "name": "depositAmount", "type": "uint120" },
          { "name": "withdrawAmount", "type": "uint120" },
          { "name": "tokenType", "type": "uint8" },
          { "name": "tokenSubID", "type": "uint256" },
          { "name": "tokenField", "type": "uint256" },
          { "name": "outputEthAddress", "type": "address" },
          { "name": "treeNumber", "type": "uint256" },
          { "name": "merkleRoot", "type": "uint256" },
          { "name": "nullifiers", "type": "uint256[]" },
          {
            "name": "commitmentsOut",
            "type": "tuple[]",
            "components": [
              { "name": "hash", "type": "uint256" },
              { "name": "ciphertext", "type": "uint256[]" },
              { "name": "senderPubKey", "type": "uint256[2]" },
              { "name": "revealKey", "type": "uint256[]" }
            ]
          }
        ]
      }
    ]
  }
]"#;

/// The shield contract: event source and calldata sink
#[derive(Clone, Debug)]
pub struct ShieldContract {
    client: Client,
    contract: Contract<Http>,
    signer: SecretKey,
    signer_address: Address,
    address: Address,
}

impl ShieldContract {
    pub fn new(client: Client, address: Address, signer: SecretKey) -> Result<Self> {
        let contract = client.contract_at(address, SHIELD_ABI)?;
        let signer_address = Key::address(&SecretKeyRef::new(&signer));

        Ok(Self {
            client,
            contract,
            signer,
            signer_address,
            address,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Submit cleartext deposit notes
    #[tracing::instrument(err, ret, skip(self, notes))]
    pub async fn generate_deposit(&self, notes: &[Note]) -> Result<H256> {
        let preimages = notes
            .iter()
            .map(|note| Ok(DepositPreimage::from_note(note)?.to_token()))
            .collect::<Result<Vec<_>>>()?;

        self.client
            .call(
                &self.contract,
                "generateDeposit",
                (Token::Array(preimages),),
                &self.signer,
                self.signer_address,
            )
            .await
    }

    /// Submit proved spends
    #[tracing::instrument(err, ret, skip(self, spends))]
    pub async fn transact(&self, spends: &[TransactSpend]) -> Result<H256> {
        let spends = spends.iter().map(TransactSpend::to_token).collect();

        self.client
            .call(
                &self.contract,
                "transact",
                (Token::Array(spends),),
                &self.signer,
                self.signer_address,
            )
            .await
    }

    /// Fetch and decode the contract's events in a block range
    ///
    /// One `eth_getLogs` query carries all three event filters; nothing
    /// else is ever requested.
    pub async fn fetch_events(&self, from_block: u64, to_block: u64) -> Result<Vec<ShieldEvent>> {
        let filter = FilterBuilder::default()
            .address(vec![self.address])
            .from_block(from_block.into())
            .to_block(to_block.into())
            .topics(
                Some(vec![
                    generated_commitment_batch_topic(),
                    commitment_batch_topic(),
                    nullifier_topic(),
                ]),
                None,
                None,
                None,
            )
            .build();

        let logs = self.client.client().eth().logs(filter).await?;

        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            if let Some(event) = parse_log(&log)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Replay chain history into the mirror in bounded chunks
    ///
    /// Each chunk is retried up to [`MAX_RETRIES`] times with exponentially
    /// capped delays, then surfaced as [`Error::RpcRetryExhausted`]. The
    /// replay cursor is persisted after every chunk, and the cancellation
    /// signal is observed between chunks.
    #[tracing::instrument(err, skip(self, mirror, store, cancel))]
    pub async fn sync_history<S: KeyValueStore>(
        &self,
        mirror: &TreeMirror,
        store: &S,
        start_block: u64,
        cancel: &watch::Receiver<bool>,
    ) -> Result<u64> {
        let cursor_key = layout::last_synced_block_key(self.client.chain_id());

        let mut from = match store.get(&cursor_key)? {
            Some(bytes) => last_synced(&bytes)? + 1,
            None => start_block,
        };

        let head = self.client.block_number().await?;

        while from <= head {
            if *cancel.borrow() {
                debug!(from, "replay cancelled");
                break;
            }

            let to = (from + SCAN_CHUNK - 1).min(head);
            let events = self.fetch_chunk(from, to).await?;
            apply_events(mirror, &events)?;

            store.put(&cursor_key, &to.to_be_bytes())?;
            debug!(from, to, events = events.len(), "chunk replayed");

            from = to + 1;
        }

        Ok(from.saturating_sub(1))
    }

    async fn fetch_chunk(&self, from: u64, to: u64) -> Result<Vec<ShieldEvent>> {
        let mut delay = Duration::from_secs(1);

        for attempt in 1..=MAX_RETRIES {
            match self.fetch_events(from, to).await {
                Ok(events) => return Ok(events),
                Err(Error::Web3(err)) if err.is_network_failure() => {
                    if attempt == MAX_RETRIES {
                        return Err(Error::RpcRetryExhausted {
                            attempts: MAX_RETRIES,
                        });
                    }
                    warn!(attempt, from, to, "chunk fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_secs(16));
                }
                Err(other) => return Err(other),
            }
        }

        unreachable!("loop returns within MAX_RETRIES attempts")
    }
}

fn last_synced(bytes: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = bytes
        .try_into()
        .map_err(|_| rg_store::Error::DbCorruption("replay cursor"))?;
    Ok(u64::from_be_bytes(bytes))
}

fn event_topic(signature: &str) -> H256 {
    H256::from_slice(&Keccak256::digest(signature.as_bytes()))
}

fn generated_commitment_batch_topic() -> H256 {
    event_topic(GENERATED_COMMITMENT_BATCH_SIG)
}

fn commitment_batch_topic() -> H256 {
    event_topic(COMMITMENT_BATCH_SIG)
}

fn nullifier_topic() -> H256 {
    event_topic(NULLIFIER_SIG)
}

/// Decode one log into a [`ShieldEvent`]
///
/// Logs with an unrecognized topic yield `None` (the node may hand back
/// more than we filtered for; that is its problem, not ours to crash on).
pub fn parse_log(log: &Log) -> Result<Option<ShieldEvent>> {
    let Some(topic) = log.topics.first() else {
        return Ok(None);
    };
    let txid: TxId = log.transaction_hash.unwrap_or_default().0;

    if *topic == generated_commitment_batch_topic() {
        return parse_generated_batch(&log.data.0, txid).map(Some);
    }
    if *topic == commitment_batch_topic() {
        return parse_commitment_batch(&log.data.0, txid).map(Some);
    }
    if *topic == nullifier_topic() {
        return parse_nullifier(&log.data.0, txid).map(Some);
    }

    Ok(None)
}

fn parse_generated_batch(data: &[u8], txid: TxId) -> Result<ShieldEvent> {
    let preimage = ParamType::Tuple(vec![
        ParamType::FixedArray(Box::new(ParamType::Uint(256)), 2),
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(8),
        ParamType::Uint(256),
        ParamType::Uint(256),
    ]);
    let tokens = ethabi::decode(
        &[
            ParamType::Uint(256),
            ParamType::Uint(256),
            ParamType::Array(Box::new(preimage)),
        ],
        data,
    )?;
    let [tree, start_position, commitments] = three(tokens)?;

    let commitments = as_array(commitments)?
        .into_iter()
        .map(|token| {
            let fields = as_tuple(token, 6)?;
            let mut fields = fields.into_iter();

            let (x, y) = as_pair(fields.next().expect("arity checked"))?;
            let random = as_element(fields.next().expect("arity checked"))?;
            let amount = as_u128(fields.next().expect("arity checked"))?;
            // skip tokenType and tokenSubID: only ERC-20 is modeled
            fields.next();
            fields.next();
            let token = as_element(fields.next().expect("arity checked"))?;

            DepositPreimage {
                pubkey: (x, y),
                random,
                amount,
                token,
            }
            .to_note()
        })
        .collect::<Result<Vec<Note>>>()?;

    Ok(ShieldEvent::GeneratedCommitmentBatch {
        tree: as_u64(tree)?,
        start_position: as_u64(start_position)?,
        commitments,
        txid,
    })
}

fn parse_commitment_batch(data: &[u8], txid: TxId) -> Result<ShieldEvent> {
    let commitment = ParamType::Tuple(vec![
        ParamType::Uint(256),
        ParamType::Array(Box::new(ParamType::Uint(256))),
        ParamType::FixedArray(Box::new(ParamType::Uint(256)), 2),
        ParamType::Array(Box::new(ParamType::Uint(256))),
    ]);
    let tokens = ethabi::decode(
        &[
            ParamType::Uint(256),
            ParamType::Uint(256),
            ParamType::Array(Box::new(commitment)),
        ],
        data,
    )?;
    let [tree, start_position, commitments] = three(tokens)?;

    let commitments = as_array(commitments)?
        .into_iter()
        .map(|token| {
            let fields = as_tuple(token, 4)?;
            let mut fields = fields.into_iter();

            let hash = as_element(fields.next().expect("arity checked"))?;
            let ciphertext = as_words(fields.next().expect("arity checked"))?;
            let (x, y) = as_pair(fields.next().expect("arity checked"))?;
            let reveal = as_words(fields.next().expect("arity checked"))?;

            // an off-curve sender key can never decrypt anything, but its
            // leaf still occupies the position: keep it with a null sender
            let sender_pubkey = jubjub::pack_point_coords(x, y).unwrap_or([0u8; 32]);

            Ok(EncryptedCommitment {
                hash,
                sender_pubkey,
                ciphertext: BlockCiphertext::from_words(&ciphertext)?,
                reveal_key: reveal_from_words(&reveal)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ShieldEvent::CommitmentBatch {
        tree: as_u64(tree)?,
        start_position: as_u64(start_position)?,
        commitments,
        txid,
    })
}

fn parse_nullifier(data: &[u8], txid: TxId) -> Result<ShieldEvent> {
    let tokens = ethabi::decode(&[ParamType::Uint(256)], data)?;
    let nullifier = tokens
        .into_iter()
        .next()
        .ok_or(Error::EventDecode("empty nullifier event"))?;

    Ok(ShieldEvent::Nullifier {
        nullifier: as_element(nullifier)?,
        txid,
    })
}

fn reveal_from_words(words: &[[u8; 32]]) -> Result<Ciphertext> {
    let (iv_word, data) = words
        .split_first()
        .ok_or(Error::EventDecode("empty reveal key"))?;

    let mut iv = [0u8; 16];
    iv.copy_from_slice(&iv_word[16..]);

    Ok(Ciphertext {
        iv,
        data: data.concat(),
    })
}

fn three(tokens: Vec<Token>) -> Result<[Token; 3]> {
    tokens
        .try_into()
        .map_err(|_| Error::EventDecode("expected three event fields"))
}

fn as_u256(token: Token) -> Result<U256> {
    match token {
        Token::Uint(value) => Ok(value),
        _ => Err(Error::EventDecode("expected uint")),
    }
}

fn as_element(token: Token) -> Result<Element> {
    Ok(crate::util::u256_to_element(as_u256(token)?))
}

fn as_u64(token: Token) -> Result<u64> {
    let value = as_u256(token)?;
    if value > U256::from(u64::MAX) {
        return Err(Error::EventDecode("uint out of u64 range"));
    }
    Ok(value.as_u64())
}

fn as_u128(token: Token) -> Result<u128> {
    let value = as_u256(token)?;
    if value > U256::from(u128::MAX) {
        return Err(Error::EventDecode("uint out of u128 range"));
    }
    Ok(value.as_u128())
}

fn as_array(token: Token) -> Result<Vec<Token>> {
    match token {
        Token::Array(tokens) | Token::FixedArray(tokens) => Ok(tokens),
        _ => Err(Error::EventDecode("expected array")),
    }
}

fn as_tuple(token: Token, arity: usize) -> Result<Vec<Token>> {
    match token {
        Token::Tuple(tokens) if tokens.len() == arity => Ok(tokens),
        _ => Err(Error::EventDecode("malformed event tuple")),
    }
}

fn as_pair(token: Token) -> Result<(Element, Element)> {
    let mut tokens = as_array(token)?.into_iter();
    let (Some(x), Some(y), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(Error::EventDecode("expected coordinate pair"));
    };
    Ok((as_element(x)?, as_element(y)?))
}

fn as_words(token: Token) -> Result<Vec<[u8; 32]>> {
    as_array(token)?
        .into_iter()
        .map(|word| {
            let mut bytes = [0u8; 32];
            as_u256(word)?.to_big_endian(&mut bytes);
            Ok(bytes)
        })
        .collect()
}
