//! Signer Adapter.
//!
//! Normalizes two credential-holding backends into one signing pass:
//!
//! - **Standard**: `sign(transactions, indexes) -> signed bytes per index`
//! - **Enclave**: `sign(serialized items) -> (signed item | null)[]`, where a
//!   null entry is a per-item refusal
//!
//! Routing is decided once per address, before any member is signed. Each
//! address is bound to the backend kind carried by its
//! [`SignedCredentialContext`]; one group never splits an address across
//! backends.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use omni_core::{Address, BackendKind, SignedCredentialContext};
use omni_registry::BoxFuture;
use omni_txn::{Digest32, OperationGroup, SignedTransaction, Transaction, TxId};
use parking_lot::RwLock;
use serde::de::IgnoredAny;
use serde_bytes::ByteBuf;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{BackendError, SigningError, SigningResult};

/// Signature length produced by ledger keys.
pub const SIGNATURE_LEN: usize = 64;

// =============================================================================
// Backend traits
// =============================================================================

/// Wallet-style backend: signs the members at `indexes` of a group.
///
/// Returns one entry per requested index, in request order: the encoded
/// signed transaction, or `None` when the user refused that member.
pub trait StandardBackend: Send + Sync {
    fn sign<'a>(
        &'a self,
        transactions: &'a [Transaction],
        indexes: &'a [usize],
    ) -> BoxFuture<'a, Result<Vec<Option<Vec<u8>>>, BackendError>>;
}

/// One enclave sign request item (wallet transaction convention).
///
/// `signers: Some([])` marks a member the enclave must not sign; `None`
/// means the enclave signs it with its own key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclaveSignItem {
    /// Base64 msgpack of the unsigned transaction.
    pub txn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signers: Option<Vec<String>>,
}

impl EnclaveSignItem {
    pub fn is_required(&self) -> bool {
        self.signers.is_none()
    }
}

/// Enclave backend: signs pre-serialized items, one result per item.
///
/// Each result is the base64 encoded signed transaction, or `None` when the
/// enclave refused that item (or was not asked to sign it).
pub trait EnclaveBackend: Send + Sync {
    fn sign(
        &self,
        items: Vec<EnclaveSignItem>,
    ) -> BoxFuture<'_, Result<Vec<Option<String>>, BackendError>>;
}

pub type DynStandardBackend = Arc<dyn StandardBackend>;
pub type DynEnclaveBackend = Arc<dyn EnclaveBackend>;

// =============================================================================
// SignerRegistry
// =============================================================================

/// Address-to-backend associations.
///
/// Any number of standard associations and at most one enclave association.
/// An address is associated with at most one backend kind at a time.
#[derive(Default)]
pub struct SignerRegistry {
    standard: RwLock<HashMap<Address, DynStandardBackend>>,
    enclave: RwLock<Option<(Address, DynEnclaveBackend)>>,
}

impl SignerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `address` to a standard backend, replacing any enclave route.
    pub fn associate_standard(&self, address: Address, backend: DynStandardBackend) {
        let mut enclave = self.enclave.write();
        if matches!(enclave.as_ref(), Some((current, _)) if *current == address) {
            *enclave = None;
        }
        self.standard.write().insert(address, backend);
        info!(address = %address, "Associated standard signing backend");
    }

    /// Make `address` the enclave address, replacing any previous enclave
    /// association and removing any standard route for it.
    pub fn associate_enclave(&self, address: Address, backend: DynEnclaveBackend) {
        let mut enclave = self.enclave.write();
        self.standard.write().remove(&address);
        if let Some((previous, _)) = enclave.replace((address, backend)) {
            if previous != address {
                debug!(previous = %previous, "Replaced enclave association");
            }
        }
        info!(address = %address, "Associated enclave signing backend");
    }

    /// Remove every association for `address`.
    pub fn disassociate(&self, address: &Address) {
        let mut enclave = self.enclave.write();
        if matches!(enclave.as_ref(), Some((current, _)) if current == address) {
            *enclave = None;
        }
        self.standard.write().remove(address);
    }

    pub fn enclave_address(&self) -> Option<Address> {
        self.enclave.read().as_ref().map(|(address, _)| *address)
    }

    /// Decide the backend for `address`: the enclave if it is the enclave
    /// address, otherwise its standard association.
    pub fn resolve(&self, address: Address) -> SigningResult<SignedCredentialContext> {
        if self.enclave_address() == Some(address) {
            return Ok(SignedCredentialContext::enclave(address));
        }
        if self.standard.read().contains_key(&address) {
            return Ok(SignedCredentialContext::standard(address));
        }
        Err(SigningError::BackendUnavailable {
            address,
            kind: BackendKind::Standard,
        })
    }

    fn standard_backend(&self, address: &Address) -> SigningResult<DynStandardBackend> {
        self.standard
            .read()
            .get(address)
            .cloned()
            .ok_or(SigningError::BackendUnavailable {
                address: *address,
                kind: BackendKind::Standard,
            })
    }

    fn enclave_backend(&self, address: &Address) -> SigningResult<DynEnclaveBackend> {
        match self.enclave.read().as_ref() {
            Some((current, backend)) if current == address => Ok(backend.clone()),
            _ => Err(SigningError::BackendUnavailable {
                address: *address,
                kind: BackendKind::Enclave,
            }),
        }
    }

    /// Sign every member of `group` exactly once, in member order.
    ///
    /// Fails without returning partial results when any required member is
    /// refused or any backend fails.
    pub async fn sign_group(&self, group: &OperationGroup) -> SigningResult<SignedGroup> {
        let routes = signing_routes(group)?;
        let transactions = group.transactions();
        let mut signed: Vec<Option<SignedMember>> = vec![None; transactions.len()];

        for route in &routes {
            let results = match route.context.backend {
                BackendKind::Standard => self.sign_standard(route, &transactions).await?,
                BackendKind::Enclave => self.sign_enclave(route, &transactions).await?,
            };
            for (index, member) in results {
                signed[index] = Some(member);
            }
        }

        let signed = signed
            .into_iter()
            .enumerate()
            .map(|(index, member)| {
                member.ok_or_else(|| {
                    SigningError::MalformedResponse(format!("member {index} left unsigned"))
                })
            })
            .collect::<SigningResult<Vec<_>>>()?;

        debug!(
            group_id = %group.group_id(),
            members = signed.len(),
            signers = routes.len(),
            "Signed operation group"
        );
        Ok(SignedGroup {
            group_id: group.group_id(),
            tx_ids: group.tx_ids().to_vec(),
            signed,
        })
    }

    async fn sign_standard(
        &self,
        route: &SigningRoute,
        transactions: &[Transaction],
    ) -> SigningResult<Vec<(usize, SignedMember)>> {
        let backend = self.standard_backend(&route.context.address)?;
        let results = backend.sign(transactions, &route.indexes).await?;
        if results.len() != route.indexes.len() {
            return Err(SigningError::MalformedResponse(format!(
                "standard backend returned {} results for {} members",
                results.len(),
                route.indexes.len()
            )));
        }

        route
            .indexes
            .iter()
            .zip(results)
            .map(|(&index, result)| -> SigningResult<(usize, SignedMember)> {
                let bytes = result.ok_or(SigningError::SigningRejected { index })?;
                Ok((index, verify_signed(index, &transactions[index], bytes)?))
            })
            .collect()
    }

    async fn sign_enclave(
        &self,
        route: &SigningRoute,
        transactions: &[Transaction],
    ) -> SigningResult<Vec<(usize, SignedMember)>> {
        let backend = self.enclave_backend(&route.context.address)?;
        let items = transactions
            .iter()
            .enumerate()
            .map(|(index, txn)| -> SigningResult<EnclaveSignItem> {
                Ok(EnclaveSignItem {
                    txn: txn.to_base64()?,
                    signers: if route.indexes.contains(&index) {
                        None
                    } else {
                        Some(Vec::new())
                    },
                })
            })
            .collect::<SigningResult<Vec<_>>>()?;

        let results = backend.sign(items).await?;
        if results.len() != transactions.len() {
            return Err(SigningError::MalformedResponse(format!(
                "enclave returned {} results for {} items",
                results.len(),
                transactions.len()
            )));
        }

        route
            .indexes
            .iter()
            .map(|&index| -> SigningResult<(usize, SignedMember)> {
                let encoded = results[index]
                    .as_deref()
                    .ok_or(SigningError::SigningRejected { index })?;
                let bytes = BASE64.decode(encoded).map_err(|e| {
                    SigningError::MalformedResponse(format!("member {index}: invalid base64: {e}"))
                })?;
                Ok((index, verify_signed(index, &transactions[index], bytes)?))
            })
            .collect()
    }
}

/// Members one address signs through one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SigningRoute {
    context: SignedCredentialContext,
    indexes: Vec<usize>,
}

/// Group members by signer, refusing an address tagged with two backends.
fn signing_routes(group: &OperationGroup) -> SigningResult<Vec<SigningRoute>> {
    let mut routes: Vec<SigningRoute> = Vec::new();
    for (index, member) in group.members().iter().enumerate() {
        let context = member.signer;
        match routes
            .iter_mut()
            .find(|r| r.context.address == context.address)
        {
            Some(route) if route.context.backend != context.backend => {
                warn!(address = %context.address, "Conflicting signing backends within one group");
                return Err(SigningError::ConflictingBackends {
                    address: context.address,
                });
            }
            Some(route) => route.indexes.push(index),
            None => routes.push(SigningRoute {
                context,
                indexes: vec![index],
            }),
        }
    }
    Ok(routes)
}

/// Signed envelope as a backend returns it. Only the fields needed to check
/// the result are read; the bytes themselves are submitted untouched.
#[derive(Deserialize)]
struct SignedEnvelope {
    #[serde(default)]
    sig: Option<ByteBuf>,
    #[serde(default)]
    msig: Option<IgnoredAny>,
    #[serde(default)]
    lsig: Option<IgnoredAny>,
    txn: Transaction,
}

/// Check a backend result signs the member we asked for, keeping its bytes.
fn verify_signed(
    index: usize,
    expected: &Transaction,
    bytes: Vec<u8>,
) -> SigningResult<SignedMember> {
    let envelope: SignedEnvelope = rmp_serde::from_slice(&bytes)
        .map_err(|e| SigningError::MalformedResponse(format!("member {index}: {e}")))?;
    if envelope.txn != *expected {
        return Err(SigningError::MalformedResponse(format!(
            "member {index}: signed transaction does not match the request"
        )));
    }
    match envelope.sig {
        Some(sig) if sig.len() != SIGNATURE_LEN => {
            return Err(SigningError::MalformedResponse(format!(
                "member {index}: signature is {} bytes",
                sig.len()
            )));
        }
        Some(_) => {}
        None if envelope.msig.is_some() || envelope.lsig.is_some() => {}
        None => {
            return Err(SigningError::MalformedResponse(format!(
                "member {index}: envelope carries no signature"
            )));
        }
    }
    Ok(SignedMember {
        txn: envelope.txn,
        bytes,
    })
}

// =============================================================================
// SignedGroup
// =============================================================================

/// One signed member: the transaction it authorizes and the backend's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMember {
    pub txn: Transaction,
    /// Signed envelope exactly as the backend returned it.
    pub bytes: Vec<u8>,
}

/// Every member of one group, signed, in member order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedGroup {
    pub group_id: Digest32,
    pub tx_ids: Vec<TxId>,
    pub signed: Vec<SignedMember>,
}

impl SignedGroup {
    pub fn lead_tx_id(&self) -> Option<TxId> {
        self.tx_ids.first().copied()
    }

    /// Submission body: the backends' signed bytes, concatenated.
    pub fn to_wire(&self) -> Vec<u8> {
        self.signed
            .iter()
            .flat_map(|member| member.bytes.iter().copied())
            .collect()
    }
}

// =============================================================================
// Test backends
// =============================================================================

/// Standard backend that signs everything with a fixed signature, or refuses
/// configured indexes. Records every request.
#[derive(Debug, Default)]
pub struct MockStandardBackend {
    refuse: parking_lot::Mutex<Vec<usize>>,
    fail: parking_lot::Mutex<Option<String>>,
    short: parking_lot::Mutex<bool>,
    requests: parking_lot::Mutex<Vec<Vec<usize>>>,
}

impl MockStandardBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse_index(&self, index: usize) {
        self.refuse.lock().push(index);
    }

    pub fn fail_with(&self, message: &str) {
        *self.fail.lock() = Some(message.to_string());
    }

    /// Drop the last result of every answer.
    pub fn answer_short(&self) {
        *self.short.lock() = true;
    }

    /// Index sets of every call, in call order.
    pub fn requests(&self) -> Vec<Vec<usize>> {
        self.requests.lock().clone()
    }
}

impl StandardBackend for MockStandardBackend {
    fn sign<'a>(
        &'a self,
        transactions: &'a [Transaction],
        indexes: &'a [usize],
    ) -> BoxFuture<'a, Result<Vec<Option<Vec<u8>>>, BackendError>> {
        Box::pin(async move {
            self.requests.lock().push(indexes.to_vec());
            if let Some(message) = self.fail.lock().clone() {
                return Err(BackendError(message));
            }
            let refuse = self.refuse.lock().clone();
            let mut results = indexes
                .iter()
                .map(|&i| -> Result<Option<Vec<u8>>, BackendError> {
                    if refuse.contains(&i) {
                        return Ok(None);
                    }
                    SignedTransaction::new(transactions[i].clone(), vec![0xab; SIGNATURE_LEN])
                        .encode()
                        .map(Some)
                        .map_err(|e| BackendError(e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            if *self.short.lock() {
                results.pop();
            }
            Ok(results)
        })
    }
}

/// Enclave backend that signs every required item, or refuses configured
/// positions. Records every request.
#[derive(Debug, Default)]
pub struct MockEnclaveBackend {
    refuse: parking_lot::Mutex<Vec<usize>>,
    fail: parking_lot::Mutex<Option<String>>,
    short: parking_lot::Mutex<bool>,
    requests: parking_lot::Mutex<Vec<Vec<EnclaveSignItem>>>,
}

impl MockEnclaveBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse_index(&self, index: usize) {
        self.refuse.lock().push(index);
    }

    pub fn fail_with(&self, message: &str) {
        *self.fail.lock() = Some(message.to_string());
    }

    /// Drop the last result of every answer.
    pub fn answer_short(&self) {
        *self.short.lock() = true;
    }

    pub fn requests(&self) -> Vec<Vec<EnclaveSignItem>> {
        self.requests.lock().clone()
    }
}

impl EnclaveBackend for MockEnclaveBackend {
    fn sign(
        &self,
        items: Vec<EnclaveSignItem>,
    ) -> BoxFuture<'_, Result<Vec<Option<String>>, BackendError>> {
        Box::pin(async move {
            self.requests.lock().push(items.clone());
            if let Some(message) = self.fail.lock().clone() {
                return Err(BackendError(message));
            }
            let refuse = self.refuse.lock().clone();
            let mut results = items
                .iter()
                .enumerate()
                .map(|(i, item)| -> Result<Option<String>, BackendError> {
                    if !item.is_required() || refuse.contains(&i) {
                        return Ok(None);
                    }
                    let raw = BASE64
                        .decode(&item.txn)
                        .map_err(|e| BackendError(e.to_string()))?;
                    let txn = Transaction::decode(&raw).map_err(|e| BackendError(e.to_string()))?;
                    let signed = SignedTransaction::new(txn, vec![0xcd; SIGNATURE_LEN])
                        .encode()
                        .map_err(|e| BackendError(e.to_string()))?;
                    Ok(Some(BASE64.encode(signed)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            if *self.short.lock() {
                results.pop();
            }
            Ok(results)
        })
    }
}
