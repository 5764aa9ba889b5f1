//! PostgreSQL implementation of the persistence layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{COUPON_COLUMNS, CategoryRow, CouponRow, LedgerRow, ProfileRow};
use super::{CouponFilter, CouponStore, Page, PageWindow};
use crate::domain::{
    Category, CategoryId, Coupon, CouponCounter, CouponId, LedgerEntry, LedgerEntryId, Profile,
    ProfileId, Visit, VisitSubject,
};
use crate::error::HubError;

/// PostgreSQL-backed [`CouponStore`] using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`HubError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), HubError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| HubError::Persistence(e.to_string()))
    }
}

fn db_err(e: sqlx::Error) -> HubError {
    HubError::Persistence(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn uuids<T: Copy + Into<Uuid>>(ids: &[T]) -> Vec<Uuid> {
    ids.iter().map(|id| (*id).into()).collect()
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn to_u64(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

/// `ILIKE` pattern matching `needle` as a literal substring.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_coupon_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &CouponFilter) {
    if let Some(created_by) = filter.created_by {
        qb.push(" AND created_by = ")
            .push_bind(Uuid::from(created_by));
    }
    if let Some(category_id) = filter.category_id {
        qb.push(" AND category_id = ")
            .push_bind(Uuid::from(category_id));
    }
    if let Some(creators) = &filter.creators {
        qb.push(" AND created_by = ANY(")
            .push_bind(uuids(creators))
            .push(")");
    }
}

#[async_trait]
impl CouponStore for PostgresStore {
    async fn insert_category(&self, category: &Category) -> Result<(), HubError> {
        sqlx::query(
            "INSERT INTO categories (id, name, icon_url, translations) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::from(category.id))
        .bind(&category.name)
        .bind(&category.icon_url)
        .bind(sqlx::types::Json(&category.translations))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                HubError::Conflict(format!("category '{}' already exists", category.name))
            } else {
                db_err(e)
            }
        })?;
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, HubError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, icon_url, translations FROM categories WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Category::from))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, HubError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, icon_url, translations FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn update_category(&self, category: &Category) -> Result<bool, HubError> {
        let result = sqlx::query(
            "UPDATE categories SET name = $2, icon_url = $3, translations = $4 WHERE id = $1",
        )
        .bind(Uuid::from(category.id))
        .bind(&category.name)
        .bind(&category.icon_url)
        .bind(sqlx::types::Json(&category.translations))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                HubError::Conflict(format!("category '{}' already exists", category.name))
            } else {
                db_err(e)
            }
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool, HubError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    HubError::Conflict("category is still referenced by coupons".to_string())
                } else {
                    db_err(e)
                }
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), HubError> {
        sqlx::query(
            "INSERT INTO profiles (id, role, name, company_name, location, lat, lng, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (id) DO UPDATE SET role = EXCLUDED.role, name = EXCLUDED.name, \
             company_name = EXCLUDED.company_name, location = EXCLUDED.location, \
             lat = EXCLUDED.lat, lng = EXCLUDED.lng, updated_at = EXCLUDED.updated_at",
        )
        .bind(Uuid::from(profile.id))
        .bind(profile.role.as_str())
        .bind(&profile.name)
        .bind(&profile.company_name)
        .bind(&profile.location)
        .bind(profile.coordinates.map(|c| c.lat))
        .bind(profile.coordinates.map(|c| c.lng))
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, HubError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, role, name, company_name, location, lat, lng, updated_at \
             FROM profiles WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(Profile::try_from).transpose()
    }

    async fn get_profiles(&self, ids: &[ProfileId]) -> Result<Vec<Profile>, HubError> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, role, name, company_name, location, lat, lng, updated_at \
             FROM profiles WHERE id = ANY($1)",
        )
        .bind(uuids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(Profile::try_from).collect()
    }

    async fn search_creators(
        &self,
        query: &str,
        location: Option<&str>,
    ) -> Result<Vec<ProfileId>, HubError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM profiles \
             WHERE company_name ILIKE $1 OR ($2::TEXT IS NOT NULL AND location ILIKE $2)",
        )
        .bind(like_pattern(query))
        .bind(location.map(like_pattern))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(ids.into_iter().map(ProfileId::from).collect())
    }

    async fn insert_coupon(&self, coupon: &Coupon) -> Result<(), HubError> {
        let fields = coupon.discount.to_fields();
        sqlx::query(
            "INSERT INTO coupons (id, created_by, category_id, discount_percentage, promo_title, \
             regular_amount, discount_amount, mxn_amount, more_details, start_date, end_date, \
             photo_url, carousel_photo_url, add_to_carousel, redeem_count, download_count, \
             share_count, explore_count, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
             $18, $19, $20)",
        )
        .bind(Uuid::from(coupon.id))
        .bind(Uuid::from(coupon.created_by))
        .bind(Uuid::from(coupon.category_id))
        .bind(fields.discount_percentage)
        .bind(fields.promo_title)
        .bind(fields.regular_amount)
        .bind(fields.discount_amount)
        .bind(fields.mxn_amount)
        .bind(&coupon.more_details)
        .bind(coupon.validity.start)
        .bind(coupon.validity.end)
        .bind(&coupon.photo_url)
        .bind(&coupon.carousel_photo_url)
        .bind(coupon.add_to_carousel)
        .bind(to_i64(coupon.counters.redeem_count))
        .bind(to_i64(coupon.counters.download_count))
        .bind(to_i64(coupon.counters.share_count))
        .bind(to_i64(coupon.counters.explore_count))
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                HubError::CategoryNotFound(*coupon.category_id.as_uuid())
            } else {
                db_err(e)
            }
        })?;
        Ok(())
    }

    async fn get_coupon(&self, id: CouponId) -> Result<Option<Coupon>, HubError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(Coupon::try_from).transpose()
    }

    async fn get_coupons(&self, ids: &[CouponId]) -> Result<Vec<Coupon>, HubError> {
        let rows = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ANY($1)"
        ))
        .bind(uuids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(Coupon::try_from).collect()
    }

    async fn update_coupon(&self, coupon: &Coupon) -> Result<bool, HubError> {
        let fields = coupon.discount.to_fields();
        let result = sqlx::query(
            "UPDATE coupons SET category_id = $2, discount_percentage = $3, promo_title = $4, \
             regular_amount = $5, discount_amount = $6, mxn_amount = $7, more_details = $8, \
             start_date = $9, end_date = $10, photo_url = $11, carousel_photo_url = $12, \
             add_to_carousel = $13, updated_at = $14 WHERE id = $1",
        )
        .bind(Uuid::from(coupon.id))
        .bind(Uuid::from(coupon.category_id))
        .bind(fields.discount_percentage)
        .bind(fields.promo_title)
        .bind(fields.regular_amount)
        .bind(fields.discount_amount)
        .bind(fields.mxn_amount)
        .bind(&coupon.more_details)
        .bind(coupon.validity.start)
        .bind(coupon.validity.end)
        .bind(&coupon.photo_url)
        .bind(&coupon.carousel_photo_url)
        .bind(coupon.add_to_carousel)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                HubError::CategoryNotFound(*coupon.category_id.as_uuid())
            } else {
                db_err(e)
            }
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_coupon(&self, id: CouponId) -> Result<bool, HubError> {
        // Ledger rows go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_coupons(
        &self,
        filter: &CouponFilter,
        window: Option<PageWindow>,
    ) -> Result<Page<Coupon>, HubError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM coupons WHERE TRUE");
        push_coupon_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE TRUE"
        ));
        push_coupon_filter(&mut select, filter);
        select.push(" ORDER BY created_at DESC, id");
        if let Some(window) = window {
            select
                .push(" LIMIT ")
                .push_bind(to_i64(window.limit))
                .push(" OFFSET ")
                .push_bind(to_i64(window.offset));
        }
        let rows = select
            .build_query_as::<CouponRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(Page {
            items: rows
                .into_iter()
                .map(Coupon::try_from)
                .collect::<Result<_, _>>()?,
            total: to_u64(total),
        })
    }

    async fn increment_counter(
        &self,
        id: CouponId,
        counter: CouponCounter,
    ) -> Result<bool, HubError> {
        let column = counter.column();
        let result = sqlx::query(&format!(
            "UPDATE coupons SET {column} = {column} + 1 WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_ledger_entry(&self, entry: &LedgerEntry) -> Result<(), HubError> {
        sqlx::query(
            "INSERT INTO downloaded_coupons \
             (id, user_id, coupon_id, redeemed, redeemed_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::from(entry.id))
        .bind(Uuid::from(entry.user_id))
        .bind(Uuid::from(entry.coupon_id))
        .bind(entry.redeemed)
        .bind(entry.redeemed_at)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                HubError::AlreadyDownloaded
            } else if is_foreign_key_violation(&e) {
                HubError::CouponNotFound(*entry.coupon_id.as_uuid())
            } else {
                db_err(e)
            }
        })?;
        Ok(())
    }

    async fn get_ledger_entry(&self, id: LedgerEntryId) -> Result<Option<LedgerEntry>, HubError> {
        let row = sqlx::query_as::<_, LedgerRow>(
            "SELECT id, user_id, coupon_id, redeemed, redeemed_at, created_at \
             FROM downloaded_coupons WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(LedgerEntry::from))
    }

    async fn delete_ledger_entry(
        &self,
        user: ProfileId,
        coupon: CouponId,
    ) -> Result<bool, HubError> {
        let result =
            sqlx::query("DELETE FROM downloaded_coupons WHERE user_id = $1 AND coupon_id = $2")
                .bind(Uuid::from(user))
                .bind(Uuid::from(coupon))
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_ledger_entries(
        &self,
        user: ProfileId,
        window: PageWindow,
    ) -> Result<Page<LedgerEntry>, HubError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM downloaded_coupons WHERE user_id = $1",
        )
        .bind(Uuid::from(user))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let rows = sqlx::query_as::<_, LedgerRow>(
            "SELECT id, user_id, coupon_id, redeemed, redeemed_at, created_at \
             FROM downloaded_coupons WHERE user_id = $1 \
             ORDER BY redeemed ASC, created_at DESC, id LIMIT $2 OFFSET $3",
        )
        .bind(Uuid::from(user))
        .bind(to_i64(window.limit))
        .bind(to_i64(window.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Page {
            items: rows.into_iter().map(LedgerEntry::from).collect(),
            total: to_u64(total),
        })
    }

    async fn ledger_entries_for_coupons(
        &self,
        coupons: &[CouponId],
    ) -> Result<Vec<LedgerEntry>, HubError> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            "SELECT id, user_id, coupon_id, redeemed, redeemed_at, created_at \
             FROM downloaded_coupons WHERE coupon_id = ANY($1)",
        )
        .bind(uuids(coupons))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(LedgerEntry::from).collect())
    }

    async fn count_ledger_entries(&self, coupons: &[CouponId]) -> Result<u64, HubError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM downloaded_coupons WHERE coupon_id = ANY($1)",
        )
        .bind(uuids(coupons))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(to_u64(total))
    }

    async fn redeem_ledger_entry(
        &self,
        id: LedgerEntryId,
        at: DateTime<Utc>,
    ) -> Result<bool, HubError> {
        // The conditional UPDATE is the compare-and-set: of two concurrent
        // statements only one sees `redeemed = FALSE`.
        let flipped = sqlx::query_scalar::<_, Uuid>(
            "WITH flipped AS ( \
                 UPDATE downloaded_coupons SET redeemed = TRUE, redeemed_at = $2 \
                 WHERE id = $1 AND redeemed = FALSE RETURNING coupon_id \
             ) \
             UPDATE coupons SET redeem_count = redeem_count + 1, updated_at = $2 \
             FROM flipped WHERE coupons.id = flipped.coupon_id RETURNING coupons.id",
        )
        .bind(Uuid::from(id))
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(flipped.is_some())
    }

    async fn insert_visit(&self, visit: &Visit) -> Result<(), HubError> {
        let (coupon_id, business_id) = match visit.subject {
            VisitSubject::Coupon(id) => (Some(Uuid::from(id)), None),
            VisitSubject::Business(id) => (None, Some(Uuid::from(id))),
        };
        sqlx::query(
            "INSERT INTO visits (id, visitor_id, coupon_id, business_id, visited_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::from(visit.id))
        .bind(visit.visitor.map(Uuid::from))
        .bind(coupon_id)
        .bind(business_id)
        .bind(visit.visited_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn count_coupon_visits(&self, coupons: &[CouponId]) -> Result<u64, HubError> {
        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM visits WHERE coupon_id = ANY($1)")
                .bind(uuids(coupons))
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(to_u64(total))
    }

    async fn count_business_visits(&self, business: ProfileId) -> Result<u64, HubError> {
        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM visits WHERE business_id = $1")
                .bind(Uuid::from(business))
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(to_u64(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("tacos"), "%tacos%");
    }

    #[test]
    fn counter_columns_are_known() {
        for counter in [
            CouponCounter::Redeem,
            CouponCounter::Download,
            CouponCounter::Share,
            CouponCounter::Explore,
        ] {
            assert!(COUPON_COLUMNS.contains(counter.column()));
        }
    }
}
