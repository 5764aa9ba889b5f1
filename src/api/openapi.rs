//! OpenAPI document for every REST endpoint.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::dto;
use crate::api::handlers::{category, coupon, home, profile, system};
use crate::domain;
use crate::error::ErrorResponse;

/// Registers the bearer access token scheme.
#[derive(Debug)]
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                Http::builder()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Access token with `purpose = \"accessToken\"`"))
                    .build(),
            ),
        );
    }
}

/// The service's OpenAPI document.
#[derive(Debug, OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "coupon-hub",
        description = "Coupon marketplace backend: catalog, downloads, QR redemption and a ranked discovery feed.",
        license(name = "MIT")
    ),
    paths(
        coupon::list_coupons,
        coupon::get_coupon,
        coupon::list_category_coupons,
        coupon::create_coupon,
        coupon::update_coupon,
        coupon::delete_coupon,
        coupon::download_coupon,
        coupon::qr_code,
        coupon::redeem_coupon,
        coupon::share_coupon,
        coupon::coupon_analytics,
        category::list_categories,
        category::create_category,
        category::update_category,
        category::delete_category,
        home::home_feed,
        home::home_analytics,
        profile::upsert_profile,
        profile::business_profile,
        system::health_handler,
    ),
    components(schemas(
        ErrorResponse,
        dto::PaginationMeta,
        dto::Empty,
        dto::CouponDto,
        dto::CouponForm,
        dto::CouponListDto,
        dto::CreatorDto,
        dto::LedgerItemDto,
        dto::DownloadDto,
        dto::QrCodeDto,
        dto::ShareRequest,
        dto::AnalyticsSeriesDto,
        dto::AnalyticsTotalsDto,
        dto::CategoryForm,
        dto::FeedDto,
        dto::RankedCouponDto,
        dto::UpsertProfileRequest,
        dto::BusinessProfileDto,
        domain::Category,
        domain::CategoryTranslation,
        domain::Profile,
        domain::Role,
        domain::GeoPoint,
        domain::CoordinateInput,
        domain::DiscountFields,
        domain::CouponCounters,
        domain::AnalyticsPeriod,
        system::HealthResponse,
    )),
    tags(
        (name = "Coupons", description = "Catalog, downloads and redemption"),
        (name = "Categories", description = "Category taxonomy"),
        (name = "Home", description = "Discovery feed"),
        (name = "Analytics", description = "Per-business analytics"),
        (name = "Profiles", description = "Profile summaries and business pages"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;
