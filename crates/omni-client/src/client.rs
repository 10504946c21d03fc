//! Marketplace client facade.
//!
//! Wires configuration, the node, the signer registry, the composer, the
//! pipeline and the discovery scanner behind one type. Every action runs the
//! same sequence:
//!
//! 1. Fetch suggested params
//! 2. Compose the operation group (local validation fails fast here)
//! 3. Sign, submit once and wait for confirmation
//! 4. On `Confirmed`, re-run discovery so the listing snapshot is current

use std::sync::Arc;

use omni_core::{Address, AssetId, ListingRecord, MicroAlgos, SignedCredentialContext};
use omni_executor::{
    DynLedgerClient, Pipeline, PipelineError, RealLedgerClient, SignerRegistry,
    TransactionOutcome,
};
use omni_registry::{
    AlgodClient, DynAssetInfoSource, DynRegistrySource, ListingScanner, ListingView, NodeRegistry,
    RegistryError,
};
use omni_telemetry::Metrics;
use omni_txn::{
    BuyOptions, Composer, CompositionResult, ListRequest, ListingState, MintRequest,
    OperationGroup, SuggestedParams,
};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::MarketConfig;
use crate::error::{ClientError, ClientResult};

/// Entry point for presentation code.
pub struct MarketplaceClient {
    config: MarketConfig,
    composer: Composer,
    pipeline: Pipeline,
    scanner: ListingScanner,
    registry: DynRegistrySource,
    /// Last discovery snapshot. `None` until the first scan or after a
    /// confirmed action whose rescan failed.
    listings: RwLock<Option<Vec<ListingView>>>,
}

impl MarketplaceClient {
    /// Connect to the node named in `config`.
    ///
    /// The signer registry starts empty; associate backends through
    /// [`MarketplaceClient::signers`].
    pub fn connect(config: MarketConfig) -> ClientResult<Self> {
        config.validate()?;
        let node = Arc::new(AlgodClient::new(
            config.node.url.clone(),
            config.node.token(),
            config.node.timeout(),
        )?);
        let ledger: DynLedgerClient = Arc::new(RealLedgerClient::new(node.clone()));
        let registry: DynRegistrySource = Arc::new(NodeRegistry::new(node.clone(), config.app()));
        let assets: DynAssetInfoSource = node;

        info!(url = %config.node.url, app_id = config.app_id, "Marketplace client connected");
        Self::with_parts(
            config,
            ledger,
            registry,
            assets,
            Arc::new(SignerRegistry::new()),
        )
    }

    /// Build from explicit parts.
    pub fn with_parts(
        config: MarketConfig,
        ledger: DynLedgerClient,
        registry: DynRegistrySource,
        assets: DynAssetInfoSource,
        signers: Arc<SignerRegistry>,
    ) -> ClientResult<Self> {
        config.validate()?;
        let composer = Composer::new(config.app())
            .with_storage_cost(config.storage_cost)
            .with_validity_window(config.validity_window);

        Ok(Self {
            composer,
            pipeline: Pipeline::new(ledger, signers),
            scanner: ListingScanner::new(registry.clone(), assets),
            registry,
            listings: RwLock::new(None),
            config,
        })
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn signers(&self) -> &Arc<SignerRegistry> {
        self.pipeline.signers()
    }

    /// Contract escrow account.
    pub fn custody_address(&self) -> Address {
        self.composer.custody_address()
    }

    /// Resolve which backend signs for `address`.
    pub fn credential(&self, address: Address) -> ClientResult<SignedCredentialContext> {
        Ok(self.signers().resolve(address)?)
    }

    /// Best-effort registry state for `asset_id`.
    pub async fn listing(&self, asset_id: AssetId) -> ListingState {
        let key = asset_id.to_key();
        match self.registry.fetch_value(&key).await {
            Ok(value) => match ListingRecord::decode(asset_id, &value) {
                Ok(record) => ListingState::Known(record),
                Err(e) => {
                    warn!(asset_id = %asset_id, error = %e, "Listing entry is malformed");
                    ListingState::Unknown
                }
            },
            Err(RegistryError::NotFound(_)) => ListingState::Absent,
            Err(e) => {
                warn!(asset_id = %asset_id, error = %e, "Listing state unavailable");
                ListingState::Unknown
            }
        }
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Escrow `request.asset_id` and publish a listing.
    pub async fn list_asset(
        &self,
        seller: SignedCredentialContext,
        request: ListRequest,
    ) -> ClientResult<TransactionOutcome> {
        self.run("list", |composer, params| {
            composer.compose_list(seller, request, params)
        })
        .await
    }

    /// Buy a listed asset at `price`.
    pub async fn buy_asset(
        &self,
        buyer: SignedCredentialContext,
        asset_id: AssetId,
        price: MicroAlgos,
        options: BuyOptions,
    ) -> ClientResult<TransactionOutcome> {
        let listing = self.listing(asset_id).await;
        self.run("buy", |composer, params| {
            composer.compose_buy(buyer, asset_id, price, listing, options, params)
        })
        .await
    }

    /// Withdraw a listing and return the asset to its seller.
    pub async fn cancel_listing(
        &self,
        sender: SignedCredentialContext,
        asset_id: AssetId,
    ) -> ClientResult<TransactionOutcome> {
        let listing = self.listing(asset_id).await;
        self.run("cancel", |composer, params| {
            composer.compose_cancel(sender, asset_id, listing, params)
        })
        .await
    }

    /// Opt `account` in to `asset_id`.
    pub async fn opt_in(
        &self,
        account: SignedCredentialContext,
        asset_id: AssetId,
    ) -> ClientResult<TransactionOutcome> {
        self.run("opt_in", |composer, params| {
            composer.compose_opt_in(account, asset_id, params)
        })
        .await
    }

    /// Create a new asset owned by `creator`.
    pub async fn mint_asset(
        &self,
        creator: SignedCredentialContext,
        request: &MintRequest,
    ) -> ClientResult<TransactionOutcome> {
        self.run("mint", |composer, params| {
            composer.compose_mint(creator, request, params)
        })
        .await
    }

    /// Move accumulated platform fees to the admin account.
    pub async fn admin_withdraw(
        &self,
        admin: SignedCredentialContext,
        amount: MicroAlgos,
    ) -> ClientResult<TransactionOutcome> {
        self.run("withdraw", |composer, params| {
            composer.compose_withdraw(admin, amount, params)
        })
        .await
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Cached listing snapshot, scanning on first use.
    pub async fn listings(&self) -> ClientResult<Vec<ListingView>> {
        let cached = self.listings.read().clone();
        if let Some(cached) = cached {
            return Ok(cached);
        }
        self.refresh_listings().await
    }

    /// Re-run discovery and replace the snapshot.
    pub async fn refresh_listings(&self) -> ClientResult<Vec<ListingView>> {
        let report = self.scanner.scan_report().await?;
        Metrics::scan_completed(
            report.listings.len(),
            report.malformed(),
            report.unreadable(),
            report.placeholders,
        );
        *self.listings.write() = Some(report.listings.clone());
        Ok(report.listings)
    }

    /// Prometheus text exposition of every client metric.
    pub fn metrics_text(&self) -> ClientResult<String> {
        Ok(Metrics::gather_text()?)
    }

    // =========================================================================
    // Execution
    // =========================================================================

    async fn run<F>(&self, action: &'static str, compose: F) -> ClientResult<TransactionOutcome>
    where
        F: FnOnce(&Composer, &SuggestedParams) -> CompositionResult<OperationGroup>,
    {
        let params = self.pipeline.ledger().suggested_params().await?;

        let group = match compose(&self.composer, &params) {
            Ok(group) => group,
            Err(e) => {
                info!(action, error = %e, "Composition refused");
                Metrics::composition_failed(action, e.reason());
                return Err(e.into());
            }
        };
        Metrics::group_composed(action);
        debug!(action, members = group.len(), tx_id = %group.lead_tx_id(), "Group composed");

        let outcome = match self
            .pipeline
            .execute(group, self.config.confirmation_rounds)
            .await
        {
            Ok(outcome) => outcome,
            Err(PipelineError::Signing(e)) => {
                Metrics::signing_failed(e.reason());
                Metrics::outcome(action, "signing_failed");
                return Err(ClientError::Signing(e));
            }
            Err(e) => {
                Metrics::outcome(action, "transport_error");
                return Err(e.into());
            }
        };

        Metrics::outcome(action, outcome.as_str());
        if let TransactionOutcome::Confirmed { checks, .. } = &outcome {
            Metrics::confirmation_checks(action, *checks);
            self.after_confirmed(action).await;
        }
        Ok(outcome)
    }

    async fn after_confirmed(&self, action: &str) {
        if let Err(e) = self.refresh_listings().await {
            warn!(action, error = %e, "Rescan after confirmation failed, dropping snapshot");
            *self.listings.write() = None;
        }
    }
}
