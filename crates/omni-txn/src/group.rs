//! Operation groups: ordered, atomically-bound member sequences.
//!
//! Every member of a multi-member group carries the same group id (`grp`),
//! so the network accepts or rejects the group as a whole. The group id is
//! computed once at construction; members must not be mutated afterwards.

use std::fmt;

use omni_core::{AssetId, MicroAlgos, SignedCredentialContext};
use serde::Serialize;

use crate::abi::Method;
use crate::error::{CompositionError, CompositionResult};
use crate::transaction::{compute_group_id, Digest32, Transaction, TxId, TxType};

/// Maximum members per group accepted by the network.
pub const MAX_GROUP_SIZE: usize = 16;

/// Marketplace action a group represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MarketAction {
    List { asset_id: AssetId, price: MicroAlgos },
    Buy { asset_id: AssetId, price: MicroAlgos },
    Cancel { asset_id: AssetId },
    OptIn { asset_id: AssetId },
    Mint,
    Withdraw { amount: MicroAlgos },
}

impl MarketAction {
    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List { .. } => "list",
            Self::Buy { .. } => "buy",
            Self::Cancel { .. } => "cancel",
            Self::OptIn { .. } => "opt_in",
            Self::Mint => "mint",
            Self::Withdraw { .. } => "withdraw",
        }
    }

    pub fn asset_id(&self) -> Option<AssetId> {
        match self {
            Self::List { asset_id, .. }
            | Self::Buy { asset_id, .. }
            | Self::Cancel { asset_id }
            | Self::OptIn { asset_id } => Some(*asset_id),
            Self::Mint | Self::Withdraw { .. } => None,
        }
    }
}

impl fmt::Display for MarketAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.asset_id() {
            Some(asset_id) => write!(f, "{}({asset_id})", self.as_str()),
            None => f.write_str(self.as_str()),
        }
    }
}

/// What a member does within its group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberRole {
    /// Asset moved into custody.
    AssetTransfer,
    /// Covers the custody account's storage cost for a new record.
    StoragePayment,
    /// Price paid to custody.
    Payment,
    /// Zero-amount self transfer enabling receipt of an asset.
    OptIn,
    /// New asset creation.
    AssetCreate,
    /// Contract method invocation bound to earlier members by index.
    MethodCall {
        method: Method,
        references: Vec<usize>,
    },
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssetTransfer => "axfer",
            Self::StoragePayment => "mbr_pay",
            Self::Payment => "pay",
            Self::OptIn => "opt_in",
            Self::AssetCreate => "acfg",
            Self::MethodCall { .. } => "method_call",
        }
    }
}

/// One member: the transaction, who signs it, and its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub txn: Transaction,
    pub signer: SignedCredentialContext,
    pub role: MemberRole,
}

impl GroupMember {
    pub fn new(txn: Transaction, signer: SignedCredentialContext, role: MemberRole) -> Self {
        Self { txn, signer, role }
    }
}

/// A built, unsigned group ready to hand to the pipeline.
#[derive(Debug, Clone)]
pub struct OperationGroup {
    action: MarketAction,
    members: Vec<GroupMember>,
    group_id: Digest32,
    tx_ids: Vec<TxId>,
}

impl OperationGroup {
    /// Validate member references, compute the group id and stamp it on
    /// every member.
    ///
    /// A method-call member must reference exactly the members immediately
    /// preceding it, each of the transaction type its method expects.
    pub fn new(action: MarketAction, mut members: Vec<GroupMember>) -> CompositionResult<Self> {
        if members.is_empty() {
            return Err(CompositionError::EmptyGroup);
        }
        if members.len() > MAX_GROUP_SIZE {
            return Err(CompositionError::GroupTooLarge {
                len: members.len(),
                max: MAX_GROUP_SIZE,
            });
        }
        validate_references(&members)?;

        for member in &mut members {
            member.txn.group = None;
        }
        let unstamped: Vec<TxId> = members
            .iter()
            .map(|m| m.txn.tx_id())
            .collect::<Result<_, _>>()?;
        let group_id = compute_group_id(&unstamped)?;

        // A lone transaction is its own atomic unit; the network expects no
        // group field on it.
        if members.len() > 1 {
            for member in &mut members {
                member.txn.group = Some(group_id);
            }
        }
        let tx_ids = members
            .iter()
            .map(|m| m.txn.tx_id())
            .collect::<Result<_, _>>()?;

        Ok(Self {
            action,
            members,
            group_id,
            tx_ids,
        })
    }

    pub fn action(&self) -> MarketAction {
        self.action
    }

    pub fn members(&self) -> &[GroupMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn group_id(&self) -> Digest32 {
        self.group_id
    }

    /// Ids of the stamped members, in order.
    pub fn tx_ids(&self) -> &[TxId] {
        &self.tx_ids
    }

    /// Id the node reports for the submitted group (first member).
    pub fn lead_tx_id(&self) -> TxId {
        self.tx_ids[0]
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.members.iter().map(|m| m.txn.clone()).collect()
    }

    /// The method-call member, if any.
    pub fn method_call(&self) -> Option<(usize, Method, &[usize])> {
        self.members
            .iter()
            .enumerate()
            .find_map(|(i, m)| match &m.role {
                MemberRole::MethodCall { method, references } => {
                    Some((i, *method, references.as_slice()))
                }
                _ => None,
            })
    }
}

fn validate_references(members: &[GroupMember]) -> CompositionResult<()> {
    for (index, member) in members.iter().enumerate() {
        let MemberRole::MethodCall { method, references } = &member.role else {
            continue;
        };
        if member.txn.tx_type != TxType::AppCall {
            return Err(CompositionError::MissingReference { member: index });
        }

        let expected = method.txn_args();
        if references.len() != expected.len() || index < expected.len() {
            return Err(CompositionError::MissingReference { member: index });
        }
        let first = index - expected.len();
        for (offset, (reference, kind)) in references.iter().zip(expected).enumerate() {
            if *reference != first + offset || members[*reference].txn.tx_type != *kind {
                return Err(CompositionError::MissingReference { member: index });
            }
        }
    }
    Ok(())
}
