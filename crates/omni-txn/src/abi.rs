//! Method-call encoding for the marketplace contract's published interface.
//!
//! The first application argument is the 4-byte method selector
//! (`sha512_256(signature)[0..4]`). Reference-typed arguments (`asset`,
//! `account`) are one-byte indexes into the call's foreign arrays; account
//! index 0 is the sender. Transaction-typed arguments are not encoded: they
//! bind positionally to the members immediately preceding the call.

use std::fmt;

use omni_core::{sha512_256, Address, AssetId};
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::transaction::TxType;

/// Contract methods this layer invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// `list_asset(asset, price, creator, royalty, axfer, mbr_pay) -> void`
    ListAsset,
    /// `buy_asset(asset, payment) -> void`
    BuyAsset,
    /// `cancel_listing(asset) -> void`
    CancelListing,
    /// `admin_withdraw(amount) -> void`
    AdminWithdraw,
}

impl Method {
    pub const ALL: [Method; 4] = [
        Method::ListAsset,
        Method::BuyAsset,
        Method::CancelListing,
        Method::AdminWithdraw,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ListAsset => "list_asset",
            Self::BuyAsset => "buy_asset",
            Self::CancelListing => "cancel_listing",
            Self::AdminWithdraw => "admin_withdraw",
        }
    }

    /// Full ABI signature used for the selector.
    pub fn signature(&self) -> &'static str {
        match self {
            Self::ListAsset => "list_asset(asset,uint64,account,uint64,axfer,pay)void",
            Self::BuyAsset => "buy_asset(asset,pay)void",
            Self::CancelListing => "cancel_listing(asset)void",
            Self::AdminWithdraw => "admin_withdraw(uint64)void",
        }
    }

    pub fn selector(&self) -> [u8; 4] {
        let digest = sha512_256(&[self.signature().as_bytes()]);
        [digest[0], digest[1], digest[2], digest[3]]
    }

    /// Identify a method from the first application argument.
    pub fn from_selector(selector: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.selector().as_slice() == selector)
    }

    /// Transaction-typed arguments, in argument order.
    pub fn txn_args(&self) -> &'static [TxType] {
        match self {
            Self::ListAsset => &[TxType::AssetTransfer, TxType::Payment],
            Self::BuyAsset => &[TxType::Payment],
            Self::CancelListing | Self::AdminWithdraw => &[],
        }
    }

    /// Inner transactions the contract may issue, paid via fee pooling.
    ///
    /// list: custody opt-in. buy: seller payout, creator royalty, asset
    /// delivery, storage refund. cancel: asset return, storage refund.
    pub fn inner_txn_budget(&self) -> u64 {
        match self {
            Self::ListAsset => 1,
            Self::BuyAsset => 4,
            Self::CancelListing => 2,
            Self::AdminWithdraw => 1,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accumulates app args and foreign references for one method call.
#[derive(Debug, Clone)]
pub struct MethodCallBuilder {
    sender: Address,
    args: Vec<ByteBuf>,
    foreign_assets: Vec<u64>,
    accounts: Vec<Address>,
}

impl MethodCallBuilder {
    pub fn new(method: Method, sender: Address) -> Self {
        Self {
            sender,
            args: vec![ByteBuf::from(method.selector().to_vec())],
            foreign_assets: Vec::new(),
            accounts: Vec::new(),
        }
    }

    pub fn uint64(mut self, value: u64) -> Self {
        self.args.push(ByteBuf::from(value.to_be_bytes().to_vec()));
        self
    }

    /// `asset` argument: index into the foreign-asset array.
    pub fn asset(mut self, asset_id: AssetId) -> Self {
        let index = self.asset_index(asset_id);
        self.args.push(ByteBuf::from(vec![index]));
        self
    }

    /// `account` argument: 0 for the sender, else 1 + foreign-account index.
    pub fn account(mut self, address: Address) -> Self {
        let index = self.account_index(address);
        self.args.push(ByteBuf::from(vec![index]));
        self
    }

    /// Make an account available to the call without passing it as an argument.
    pub fn reference_account(mut self, address: Address) -> Self {
        self.account_index(address);
        self
    }

    fn asset_index(&mut self, asset_id: AssetId) -> u8 {
        let position = match self.foreign_assets.iter().position(|a| *a == asset_id.index()) {
            Some(p) => p,
            None => {
                self.foreign_assets.push(asset_id.index());
                self.foreign_assets.len() - 1
            }
        };
        position as u8
    }

    fn account_index(&mut self, address: Address) -> u8 {
        if address == self.sender {
            return 0;
        }
        let position = match self.accounts.iter().position(|a| *a == address) {
            Some(p) => p,
            None => {
                self.accounts.push(address);
                self.accounts.len() - 1
            }
        };
        (position + 1) as u8
    }

    /// `(app_args, foreign_assets, accounts)`
    pub fn finish(self) -> (Vec<ByteBuf>, Vec<u64>, Vec<Address>) {
        (self.args, self.foreign_assets, self.accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors_are_distinct() {
        let selectors: std::collections::HashSet<[u8; 4]> =
            Method::ALL.iter().map(|m| m.selector()).collect();
        assert_eq!(selectors.len(), Method::ALL.len());
    }

    #[test]
    fn test_selector_lookup() {
        for method in Method::ALL {
            assert_eq!(Method::from_selector(&method.selector()), Some(method));
        }
        assert_eq!(Method::from_selector(&[0, 0, 0, 0]), None);
    }

    #[test]
    fn test_selector_matches_signature_hash() {
        let digest = sha512_256(&[b"buy_asset(asset,pay)void"]);
        assert_eq!(Method::BuyAsset.selector(), [digest[0], digest[1], digest[2], digest[3]]);
    }

    #[test]
    fn test_builder_reference_indexes() {
        let sender = Address::new([1u8; 32]);
        let other = Address::new([2u8; 32]);
        let (args, assets, accounts) = MethodCallBuilder::new(Method::ListAsset, sender)
            .asset(AssetId::new(77))
            .uint64(10_000_000)
            .account(other)
            .uint64(500)
            .finish();

        assert_eq!(args.len(), 5);
        assert_eq!(args[0].as_slice(), Method::ListAsset.selector().as_slice());
        assert_eq!(args[1].as_slice(), &[0u8]);
        assert_eq!(args[2].as_slice(), &10_000_000u64.to_be_bytes());
        assert_eq!(args[3].as_slice(), &[1u8]);
        assert_eq!(args[4].as_slice(), &500u64.to_be_bytes());
        assert_eq!(assets, vec![77]);
        assert_eq!(accounts, vec![other]);
    }

    #[test]
    fn test_sender_account_is_index_zero() {
        let sender = Address::new([1u8; 32]);
        let (args, _, accounts) = MethodCallBuilder::new(Method::ListAsset, sender)
            .account(sender)
            .finish();
        assert_eq!(args[1].as_slice(), &[0u8]);
        assert!(accounts.is_empty());
    }

    #[test]
    fn test_reference_account_dedups() {
        let sender = Address::new([1u8; 32]);
        let seller = Address::new([3u8; 32]);
        let (_, _, accounts) = MethodCallBuilder::new(Method::BuyAsset, sender)
            .reference_account(seller)
            .reference_account(seller)
            .reference_account(sender)
            .finish();
        assert_eq!(accounts, vec![seller]);
    }
}
