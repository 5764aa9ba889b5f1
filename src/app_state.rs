//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::AccessTokens;
use crate::media::MediaUploader;
use crate::persistence::CouponStore;
use crate::service::{
    AnalyticsService, CatalogService, CategoryService, DiscoveryService, LedgerService,
    ProfileService, RedemptionService, RedemptionTokens,
};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Verifies bearer access tokens.
    pub access_tokens: AccessTokens,
    /// Coupon catalog.
    pub catalog: CatalogService,
    /// Category index.
    pub categories: CategoryService,
    /// Download ledger.
    pub ledger: LedgerService,
    /// Redemption tokens and QR codes.
    pub redemption: RedemptionService,
    /// Discovery feed.
    pub discovery: DiscoveryService,
    /// Per-business analytics.
    pub analytics: AnalyticsService,
    /// Profile summaries.
    pub profiles: ProfileService,
}

impl AppState {
    /// Wires every service to one store and one uploader.
    #[must_use]
    pub fn new(
        store: Arc<dyn CouponStore>,
        media: Arc<dyn MediaUploader>,
        access_tokens: AccessTokens,
        redemption_tokens: RedemptionTokens,
        public_base_url: String,
    ) -> Self {
        Self {
            access_tokens,
            catalog: CatalogService::new(Arc::clone(&store), Arc::clone(&media)),
            categories: CategoryService::new(Arc::clone(&store), media),
            ledger: LedgerService::new(Arc::clone(&store)),
            redemption: RedemptionService::new(
                Arc::clone(&store),
                redemption_tokens,
                public_base_url,
            ),
            discovery: DiscoveryService::new(Arc::clone(&store)),
            analytics: AnalyticsService::new(Arc::clone(&store)),
            profiles: ProfileService::new(store),
        }
    }
}
