use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Row, query_builder::QueryBuilder};
use uuid::Uuid;

use super::Repository;
use crate::error::{AppError, AppResult};
use crate::models::{
    Ad, AdminDashboardStats, Campaign, CampaignFilter, CampaignStatus, DailyMetric, Integration,
    IntegrationProvider, Invitation, MediaFile, MetricsOutcome, Notification, OnboardingStep,
    Organization, RecordMetricsRequest, Report, Role, Session, Subscription, UpdateAdRequest,
    UpdateCampaignRequest, User,
};

const USER_COLUMNS: &str = "id, organization_id, email, name, role, password_hash, avatar_key, \
     failed_login_count, locked_until, last_login_at, created_at, updated_at";

const CAMPAIGN_COLUMNS: &str = "id, organization_id, created_by, name, description, objective, \
     status, budget_cents, spent_cents, impressions, clicks, conversions, start_date, end_date, \
     created_at, updated_at";

const AD_COLUMNS: &str = "id, organization_id, campaign_id, name, format, headline, body, \
     call_to_action, destination_url, media_file_id, status, created_at, updated_at";

const REPORT_COLUMNS: &str = "id, organization_id, created_by, name, format, status, date_from, \
     date_to, campaign_ids, row_count, content, created_at";

const INTEGRATION_COLUMNS: &str = "id, organization_id, provider, display_name, status, config, \
     connected_by, last_synced_at, created_at, updated_at";

const INVITATION_COLUMNS: &str = "id, organization_id, email, role, token_hash, invited_by, \
     expires_at, accepted_at, created_at";

const NOTIFICATION_COLUMNS: &str =
    "id, organization_id, user_id, kind, title, message, link, is_read, created_at";

const MEDIA_COLUMNS: &str = "id, organization_id, uploaded_by, file_name, content_type, \
     size_bytes, storage_key, created_at";

const SUBSCRIPTION_COLUMNS: &str = "organization_id, plan, status, current_period_start, \
     current_period_end, cancel_at_period_end, updated_at";

/// Logs a failed query with the operation name before handing it to the caller.
fn db_error(op: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |err| {
        tracing::error!(operation = op, error = ?err, "Repository query failed");
        AppError::Database(err)
    }
}

/// PostgresRepository
///
/// The production implementation of [`Repository`], backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends the shared WHERE clause of the campaign listing and its count.
fn push_campaign_filter(builder: &mut QueryBuilder<'_, Postgres>, org: Uuid, filter: &CampaignFilter) {
    builder.push(" WHERE organization_id = ");
    builder.push_bind(org);

    match filter.status {
        Some(status) => {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
        // Archived campaigns only show up when asked for explicitly.
        None => {
            builder.push(" AND status <> 'archived'");
        }
    }

    if let Some(term) = filter.search_term() {
        let pattern = format!("%{}%", term);
        builder.push(" AND (name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR description ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// register_organization
    ///
    /// The organization, owner and free subscription are written in one transaction;
    /// a duplicate email or slug rolls all three back.
    async fn register_organization(
        &self,
        org: Organization,
        owner: User,
        subscription: Subscription,
    ) -> AppResult<User> {
        let mut tx = self.pool.begin().await.map_err(db_error("register_organization"))?;

        sqlx::query("INSERT INTO organizations (id, name, slug, created_at) VALUES ($1, $2, $3, $4)")
            .bind(org.id)
            .bind(&org.name)
            .bind(&org.slug)
            .bind(org.created_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error("register_organization"))?;

        let user = insert_user(&mut tx, &owner).await?;

        sqlx::query(
            "INSERT INTO subscriptions (organization_id, plan, status, current_period_start, \
             current_period_end, cancel_at_period_end, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(subscription.organization_id)
        .bind(subscription.plan)
        .bind(subscription.status)
        .bind(subscription.current_period_start)
        .bind(subscription.current_period_end)
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("register_organization"))?;

        tx.commit().await.map_err(db_error("register_organization"))?;
        Ok(user)
    }

    async fn get_organization(&self, id: Uuid) -> AppResult<Option<Organization>> {
        sqlx::query_as::<_, Organization>(
            "SELECT id, name, slug, created_at FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_organization"))
    }

    async fn slug_exists(&self, slug: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM organizations WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("slug_exists"))
    }

    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get_user"))
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_user_by_email"))
    }

    async fn list_users(&self, org: Uuid) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE organization_id = $1 ORDER BY created_at ASC"
        ))
        .bind(org)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list_users"))
    }

    async fn count_users(&self, org: Uuid) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE organization_id = $1")
            .bind(org)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count_users"))
    }

    /// update_user_profile
    ///
    /// Uses `COALESCE` so `None` fields keep their stored value.
    async fn update_user_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        avatar_key: Option<String>,
    ) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = COALESCE($2, name), avatar_key = COALESCE($3, avatar_key), \
             updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(avatar_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update_user_profile"))
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await
                .map_err(db_error("set_password_hash"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User"));
        }
        Ok(())
    }

    /// record_login_failure
    ///
    /// A single UPDATE so concurrent failures cannot both read the same count.
    async fn record_login_failure(
        &self,
        id: Uuid,
        max_attempts: i32,
        locked_until: DateTime<Utc>,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                 locked_until = CASE WHEN failed_login_count + 1 >= $2 THEN $3 ELSE locked_until END, \
                 failed_login_count = CASE WHEN failed_login_count + 1 >= $2 THEN 0 \
                                           ELSE failed_login_count + 1 END \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(max_attempts)
        .bind(locked_until)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("record_login_failure"))?
        .ok_or(AppError::NotFound("User"))
    }

    async fn record_login_success(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET failed_login_count = 0, locked_until = NULL, last_login_at = $2 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error("record_login_success"))?;
        Ok(())
    }

    async fn set_user_role(&self, org: Uuid, id: Uuid, role: Role) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $3, updated_at = NOW() \
             WHERE id = $2 AND organization_id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(org)
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("set_user_role"))
    }

    /// delete_user
    ///
    /// Records the user created are handed to the organization owner first, so the
    /// campaign history survives the removal. Sessions and notifications cascade.
    async fn delete_user(&self, org: Uuid, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(db_error("delete_user"))?;

        let owner: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM users WHERE organization_id = $1 AND role = 'owner' AND id <> $2",
        )
        .bind(org)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("delete_user"))?;

        if let Some(owner) = owner {
            for statement in [
                "UPDATE campaigns SET created_by = $1 WHERE created_by = $2",
                "UPDATE reports SET created_by = $1 WHERE created_by = $2",
                "UPDATE integrations SET connected_by = $1 WHERE connected_by = $2",
                "UPDATE media_files SET uploaded_by = $1 WHERE uploaded_by = $2",
            ] {
                sqlx::query(statement)
                    .bind(owner)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error("delete_user"))?;
            }
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(org)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete_user"))?;

        tx.commit().await.map_err(db_error("delete_user"))?;
        Ok(result.rows_affected() > 0)
    }

    // --- SESSIONS ---

    async fn create_session(&self, session: Session) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, refresh_token_hash, expires_at, revoked_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.refresh_token_hash)
        .bind(session.expires_at)
        .bind(session.revoked_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("create_session"))?;
        Ok(())
    }

    async fn get_session_by_hash(&self, refresh_token_hash: &str) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT id, user_id, refresh_token_hash, expires_at, revoked_at, created_at \
             FROM sessions WHERE refresh_token_hash = $1",
        )
        .bind(refresh_token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_session_by_hash"))
    }

    /// rotate_session
    ///
    /// The conditional UPDATE makes a replayed refresh token lose the race: only one
    /// caller sees `rows_affected = 1`.
    async fn rotate_session(&self, old: Uuid, new: Session) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(db_error("rotate_session"))?;

        let revoked = sqlx::query(
            "UPDATE sessions SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(old)
        .execute(&mut *tx)
        .await
        .map_err(db_error("rotate_session"))?;

        if revoked.rows_affected() == 0 {
            tx.rollback().await.map_err(db_error("rotate_session"))?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO sessions (id, user_id, refresh_token_hash, expires_at, revoked_at, created_at) \
             VALUES ($1, $2, $3, $4, NULL, $5)",
        )
        .bind(new.id)
        .bind(new.user_id)
        .bind(&new.refresh_token_hash)
        .bind(new.expires_at)
        .bind(new.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("rotate_session"))?;

        tx.commit().await.map_err(db_error("rotate_session"))?;
        Ok(true)
    }

    async fn revoke_user_sessions(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("revoke_user_sessions"))?;
        Ok(result.rows_affected())
    }

    // --- CAMPAIGNS ---

    /// list_campaigns
    ///
    /// Filters are appended with QueryBuilder and bound, never interpolated.
    async fn list_campaigns(
        &self,
        org: Uuid,
        filter: &CampaignFilter,
    ) -> AppResult<(Vec<Campaign>, i64)> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM campaigns");
        push_campaign_filter(&mut count, org, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("list_campaigns"))?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns"));
        push_campaign_filter(&mut builder, org, filter);
        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(filter.per_page());
        builder.push(" OFFSET ");
        builder.push_bind(filter.offset());

        let items = builder
            .build_query_as::<Campaign>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list_campaigns"))?;

        Ok((items, total))
    }

    async fn all_campaigns(&self, org: Uuid) -> AppResult<Vec<Campaign>> {
        sqlx::query_as::<_, Campaign>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE organization_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(org)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("all_campaigns"))
    }

    async fn get_campaign(&self, org: Uuid, id: Uuid) -> AppResult<Option<Campaign>> {
        sqlx::query_as::<_, Campaign>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1 AND organization_id = $2"
        ))
        .bind(id)
        .bind(org)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_campaign"))
    }

    async fn create_campaign(&self, c: Campaign) -> AppResult<Campaign> {
        sqlx::query_as::<_, Campaign>(&format!(
            "INSERT INTO campaigns (id, organization_id, created_by, name, description, objective, \
                 status, budget_cents, spent_cents, impressions, clicks, conversions, start_date, \
                 end_date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {CAMPAIGN_COLUMNS}"
        ))
        .bind(c.id)
        .bind(c.organization_id)
        .bind(c.created_by)
        .bind(&c.name)
        .bind(&c.description)
        .bind(c.objective)
        .bind(c.status)
        .bind(c.budget_cents)
        .bind(c.spent_cents)
        .bind(c.impressions)
        .bind(c.clicks)
        .bind(c.conversions)
        .bind(c.start_date)
        .bind(c.end_date)
        .bind(c.created_at)
        .bind(c.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create_campaign"))
    }

    /// update_campaign
    ///
    /// `COALESCE` keeps every column whose patch field is `None`.
    async fn update_campaign(
        &self,
        org: Uuid,
        id: Uuid,
        req: &UpdateCampaignRequest,
    ) -> AppResult<Option<Campaign>> {
        sqlx::query_as::<_, Campaign>(&format!(
            "UPDATE campaigns SET \
                 name = COALESCE($3, name), \
                 description = COALESCE($4, description), \
                 objective = COALESCE($5, objective), \
                 budget_cents = COALESCE($6, budget_cents), \
                 start_date = COALESCE($7, start_date), \
                 end_date = COALESCE($8, end_date), \
                 updated_at = NOW() \
             WHERE id = $1 AND organization_id = $2 \
             RETURNING {CAMPAIGN_COLUMNS}"
        ))
        .bind(id)
        .bind(org)
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.objective)
        .bind(req.budget_cents)
        .bind(req.start_date)
        .bind(req.end_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update_campaign"))
    }

    async fn set_campaign_status(
        &self,
        org: Uuid,
        id: Uuid,
        status: CampaignStatus,
    ) -> AppResult<Option<Campaign>> {
        sqlx::query_as::<_, Campaign>(&format!(
            "UPDATE campaigns SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND organization_id = $2 RETURNING {CAMPAIGN_COLUMNS}"
        ))
        .bind(id)
        .bind(org)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("set_campaign_status"))
    }

    async fn delete_campaign(&self, org: Uuid, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(org)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_campaign"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_campaigns(&self, org: Uuid) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM campaigns WHERE organization_id = $1 AND status <> 'archived'",
        )
        .bind(org)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count_campaigns"))
    }

    // --- METRICS ---

    /// record_metrics
    ///
    /// Runs under `SELECT ... FOR UPDATE` on the campaign row; the daily upsert, the
    /// counter increment and the auto-pause commit together.
    async fn record_metrics(
        &self,
        org: Uuid,
        campaign_id: Uuid,
        req: &RecordMetricsRequest,
    ) -> AppResult<Option<MetricsOutcome>> {
        let mut tx = self.pool.begin().await.map_err(db_error("record_metrics"))?;

        let current = sqlx::query_as::<_, Campaign>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns \
             WHERE id = $1 AND organization_id = $2 FOR UPDATE"
        ))
        .bind(campaign_id)
        .bind(org)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("record_metrics"))?;

        let Some(current) = current else {
            return Ok(None);
        };
        if current.status == CampaignStatus::Archived {
            return Err(AppError::Conflict(
                "Archived campaigns do not accept metrics".to_string(),
            ));
        }
        let (_, _, _, spent_cents) = req.add_to((
            current.impressions,
            current.clicks,
            current.conversions,
            current.spent_cents,
        ))?;

        sqlx::query(
            "INSERT INTO campaign_metrics (campaign_id, date, impressions, clicks, conversions, spend_cents) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (campaign_id, date) DO UPDATE SET \
                 impressions = campaign_metrics.impressions + EXCLUDED.impressions, \
                 clicks = campaign_metrics.clicks + EXCLUDED.clicks, \
                 conversions = campaign_metrics.conversions + EXCLUDED.conversions, \
                 spend_cents = campaign_metrics.spend_cents + EXCLUDED.spend_cents",
        )
        .bind(campaign_id)
        .bind(req.date)
        .bind(req.impressions)
        .bind(req.clicks)
        .bind(req.conversions)
        .bind(req.spend_cents)
        .execute(&mut *tx)
        .await
        .map_err(db_error("record_metrics"))?;

        let budget_exhausted = current.status == CampaignStatus::Active
            && spent_cents >= current.budget_cents;
        let status = if budget_exhausted {
            CampaignStatus::Paused
        } else {
            current.status
        };

        let campaign = sqlx::query_as::<_, Campaign>(&format!(
            "UPDATE campaigns SET \
                 impressions = impressions + $2, \
                 clicks = clicks + $3, \
                 conversions = conversions + $4, \
                 spent_cents = spent_cents + $5, \
                 status = $6, \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {CAMPAIGN_COLUMNS}"
        ))
        .bind(campaign_id)
        .bind(req.impressions)
        .bind(req.clicks)
        .bind(req.conversions)
        .bind(req.spend_cents)
        .bind(status)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("record_metrics"))?;

        tx.commit().await.map_err(db_error("record_metrics"))?;

        Ok(Some(MetricsOutcome {
            campaign,
            budget_exhausted,
        }))
    }

    async fn get_metrics(
        &self,
        org: Uuid,
        campaign_ids: Option<&[Uuid]>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<DailyMetric>> {
        sqlx::query_as::<_, DailyMetric>(
            "SELECT m.campaign_id, m.date, m.impressions, m.clicks, m.conversions, m.spend_cents \
             FROM campaign_metrics m JOIN campaigns c ON c.id = m.campaign_id \
             WHERE c.organization_id = $1 AND m.date BETWEEN $2 AND $3 \
               AND ($4::uuid[] IS NULL OR m.campaign_id = ANY($4)) \
             ORDER BY m.date, m.campaign_id",
        )
        .bind(org)
        .bind(from)
        .bind(to)
        .bind(campaign_ids.map(<[Uuid]>::to_vec))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("get_metrics"))
    }

    // --- ADS ---

    async fn list_ads(&self, org: Uuid, campaign_id: Uuid) -> AppResult<Vec<Ad>> {
        sqlx::query_as::<_, Ad>(&format!(
            "SELECT {AD_COLUMNS} FROM ads WHERE organization_id = $1 AND campaign_id = $2 \
             ORDER BY created_at DESC"
        ))
        .bind(org)
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list_ads"))
    }

    async fn get_ad(&self, org: Uuid, id: Uuid) -> AppResult<Option<Ad>> {
        sqlx::query_as::<_, Ad>(&format!(
            "SELECT {AD_COLUMNS} FROM ads WHERE id = $1 AND organization_id = $2"
        ))
        .bind(id)
        .bind(org)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_ad"))
    }

    async fn create_ad(&self, ad: Ad) -> AppResult<Ad> {
        sqlx::query_as::<_, Ad>(&format!(
            "INSERT INTO ads (id, organization_id, campaign_id, name, format, headline, body, \
                 call_to_action, destination_url, media_file_id, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {AD_COLUMNS}"
        ))
        .bind(ad.id)
        .bind(ad.organization_id)
        .bind(ad.campaign_id)
        .bind(&ad.name)
        .bind(ad.format)
        .bind(&ad.headline)
        .bind(&ad.body)
        .bind(&ad.call_to_action)
        .bind(&ad.destination_url)
        .bind(ad.media_file_id)
        .bind(ad.status)
        .bind(ad.created_at)
        .bind(ad.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create_ad"))
    }

    async fn update_ad(&self, org: Uuid, id: Uuid, req: &UpdateAdRequest) -> AppResult<Option<Ad>> {
        sqlx::query_as::<_, Ad>(&format!(
            "UPDATE ads SET \
                 name = COALESCE($3, name), \
                 format = COALESCE($4, format), \
                 headline = COALESCE($5, headline), \
                 body = COALESCE($6, body), \
                 call_to_action = COALESCE($7, call_to_action), \
                 destination_url = COALESCE($8, destination_url), \
                 media_file_id = COALESCE($9, media_file_id), \
                 status = COALESCE($10, status), \
                 updated_at = NOW() \
             WHERE id = $1 AND organization_id = $2 \
             RETURNING {AD_COLUMNS}"
        ))
        .bind(id)
        .bind(org)
        .bind(&req.name)
        .bind(req.format)
        .bind(&req.headline)
        .bind(&req.body)
        .bind(&req.call_to_action)
        .bind(&req.destination_url)
        .bind(req.media_file_id)
        .bind(req.status)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update_ad"))
    }

    async fn delete_ad(&self, org: Uuid, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM ads WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(org)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_ad"))?;
        Ok(result.rows_affected() > 0)
    }

    // --- SUBSCRIPTIONS ---

    async fn get_subscription(&self, org: Uuid) -> AppResult<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE organization_id = $1"
        ))
        .bind(org)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_subscription"))
    }

    async fn save_subscription(&self, s: Subscription) -> AppResult<Subscription> {
        sqlx::query_as::<_, Subscription>(&format!(
            "INSERT INTO subscriptions (organization_id, plan, status, current_period_start, \
                 current_period_end, cancel_at_period_end, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (organization_id) DO UPDATE SET \
                 plan = EXCLUDED.plan, \
                 status = EXCLUDED.status, \
                 current_period_start = EXCLUDED.current_period_start, \
                 current_period_end = EXCLUDED.current_period_end, \
                 cancel_at_period_end = EXCLUDED.cancel_at_period_end, \
                 updated_at = EXCLUDED.updated_at \
             RETURNING {SUBSCRIPTION_COLUMNS}"
        ))
        .bind(s.organization_id)
        .bind(s.plan)
        .bind(s.status)
        .bind(s.current_period_start)
        .bind(s.current_period_end)
        .bind(s.cancel_at_period_end)
        .bind(s.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("save_subscription"))
    }

    // --- REPORTS ---

    async fn create_report(&self, r: Report) -> AppResult<Report> {
        sqlx::query_as::<_, Report>(&format!(
            "INSERT INTO reports (id, organization_id, created_by, name, format, status, \
                 date_from, date_to, campaign_ids, row_count, content, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {REPORT_COLUMNS}"
        ))
        .bind(r.id)
        .bind(r.organization_id)
        .bind(r.created_by)
        .bind(&r.name)
        .bind(r.format)
        .bind(r.status)
        .bind(r.date_from)
        .bind(r.date_to)
        .bind(&r.campaign_ids)
        .bind(r.row_count)
        .bind(&r.content)
        .bind(r.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create_report"))
    }

    async fn list_reports(&self, org: Uuid) -> AppResult<Vec<Report>> {
        sqlx::query_as::<_, Report>(
            "SELECT id, organization_id, created_by, name, format, status, date_from, date_to, \
                 campaign_ids, row_count, '' AS content, created_at \
             FROM reports WHERE organization_id = $1 ORDER BY created_at DESC",
        )
        .bind(org)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list_reports"))
    }

    async fn get_report(&self, org: Uuid, id: Uuid) -> AppResult<Option<Report>> {
        sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1 AND organization_id = $2"
        ))
        .bind(id)
        .bind(org)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_report"))
    }

    async fn delete_report(&self, org: Uuid, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(org)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_report"))?;
        Ok(result.rows_affected() > 0)
    }

    // --- INTEGRATIONS ---

    async fn list_integrations(&self, org: Uuid) -> AppResult<Vec<Integration>> {
        sqlx::query_as::<_, Integration>(&format!(
            "SELECT {INTEGRATION_COLUMNS} FROM integrations WHERE organization_id = $1 \
             ORDER BY created_at ASC"
        ))
        .bind(org)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list_integrations"))
    }

    async fn get_integration(&self, org: Uuid, id: Uuid) -> AppResult<Option<Integration>> {
        sqlx::query_as::<_, Integration>(&format!(
            "SELECT {INTEGRATION_COLUMNS} FROM integrations WHERE id = $1 AND organization_id = $2"
        ))
        .bind(id)
        .bind(org)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_integration"))
    }

    async fn get_integration_by_provider(
        &self,
        org: Uuid,
        provider: IntegrationProvider,
    ) -> AppResult<Option<Integration>> {
        sqlx::query_as::<_, Integration>(&format!(
            "SELECT {INTEGRATION_COLUMNS} FROM integrations \
             WHERE organization_id = $1 AND provider = $2"
        ))
        .bind(org)
        .bind(provider)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_integration_by_provider"))
    }

    async fn create_integration(&self, i: Integration) -> AppResult<Integration> {
        sqlx::query_as::<_, Integration>(&format!(
            "INSERT INTO integrations (id, organization_id, provider, display_name, status, config, \
                 connected_by, last_synced_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {INTEGRATION_COLUMNS}"
        ))
        .bind(i.id)
        .bind(i.organization_id)
        .bind(i.provider)
        .bind(&i.display_name)
        .bind(i.status)
        .bind(&i.config)
        .bind(i.connected_by)
        .bind(i.last_synced_at)
        .bind(i.created_at)
        .bind(i.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create_integration"))
    }

    async fn update_integration(&self, i: Integration) -> AppResult<Option<Integration>> {
        sqlx::query_as::<_, Integration>(&format!(
            "UPDATE integrations SET display_name = $3, status = $4, config = $5, updated_at = NOW() \
             WHERE id = $1 AND organization_id = $2 RETURNING {INTEGRATION_COLUMNS}"
        ))
        .bind(i.id)
        .bind(i.organization_id)
        .bind(&i.display_name)
        .bind(i.status)
        .bind(&i.config)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update_integration"))
    }

    async fn delete_integration(&self, org: Uuid, id: Uuid) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM integrations WHERE id = $1 AND organization_id = $2")
                .bind(id)
                .bind(org)
                .execute(&self.pool)
                .await
                .map_err(db_error("delete_integration"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_integrations(&self, org: Uuid) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM integrations WHERE organization_id = $1")
            .bind(org)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count_integrations"))
    }

    // --- INVITATIONS ---

    async fn create_invitation(&self, inv: Invitation) -> AppResult<Invitation> {
        sqlx::query_as::<_, Invitation>(&format!(
            "INSERT INTO invitations (id, organization_id, email, role, token_hash, invited_by, \
                 expires_at, accepted_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {INVITATION_COLUMNS}"
        ))
        .bind(inv.id)
        .bind(inv.organization_id)
        .bind(&inv.email)
        .bind(inv.role)
        .bind(&inv.token_hash)
        .bind(inv.invited_by)
        .bind(inv.expires_at)
        .bind(inv.accepted_at)
        .bind(inv.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create_invitation"))
    }

    async fn list_pending_invitations(
        &self,
        org: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Invitation>> {
        sqlx::query_as::<_, Invitation>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations \
             WHERE organization_id = $1 AND accepted_at IS NULL AND expires_at > $2 \
             ORDER BY created_at DESC"
        ))
        .bind(org)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list_pending_invitations"))
    }

    async fn count_pending_invitations(&self, org: Uuid, now: DateTime<Utc>) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM invitations \
             WHERE organization_id = $1 AND accepted_at IS NULL AND expires_at > $2",
        )
        .bind(org)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count_pending_invitations"))
    }

    async fn get_invitation_by_token_hash(&self, token_hash: &str) -> AppResult<Option<Invitation>> {
        sqlx::query_as::<_, Invitation>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_invitation_by_token_hash"))
    }

    async fn get_pending_invitation_by_email(
        &self,
        org: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Invitation>> {
        sqlx::query_as::<_, Invitation>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations \
             WHERE organization_id = $1 AND email = LOWER($2) \
               AND accepted_at IS NULL AND expires_at > $3 \
             LIMIT 1"
        ))
        .bind(org)
        .bind(email)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_pending_invitation_by_email"))
    }

    async fn accept_invitation(&self, invitation_id: Uuid, user: User) -> AppResult<Option<User>> {
        let mut tx = self.pool.begin().await.map_err(db_error("accept_invitation"))?;

        let marked = sqlx::query(
            "UPDATE invitations SET accepted_at = NOW() WHERE id = $1 AND accepted_at IS NULL",
        )
        .bind(invitation_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("accept_invitation"))?;

        if marked.rows_affected() == 0 {
            tx.rollback().await.map_err(db_error("accept_invitation"))?;
            return Ok(None);
        }

        let user = insert_user(&mut tx, &user).await?;
        tx.commit().await.map_err(db_error("accept_invitation"))?;
        Ok(Some(user))
    }

    async fn delete_invitation(&self, org: Uuid, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM invitations WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(org)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_invitation"))?;
        Ok(result.rows_affected() > 0)
    }

    // --- NOTIFICATIONS ---

    async fn create_notification(&self, n: Notification) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(&format!(
            "INSERT INTO notifications (id, organization_id, user_id, kind, title, message, link, \
                 is_read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(n.id)
        .bind(n.organization_id)
        .bind(n.user_id)
        .bind(n.kind)
        .bind(&n.title)
        .bind(&n.message)
        .bind(&n.link)
        .bind(n.is_read)
        .bind(n.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create_notification"))
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> AppResult<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = $1 AND (NOT $2 OR is_read = false) \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list_notifications"))
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count_unread_notifications"))
    }

    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(db_error("mark_notification_read"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("mark_all_notifications_read"))?;
        Ok(result.rows_affected())
    }

    // --- MEDIA ---

    async fn create_media_file(&self, m: MediaFile) -> AppResult<MediaFile> {
        sqlx::query_as::<_, MediaFile>(&format!(
            "INSERT INTO media_files (id, organization_id, uploaded_by, file_name, content_type, \
                 size_bytes, storage_key, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {MEDIA_COLUMNS}"
        ))
        .bind(m.id)
        .bind(m.organization_id)
        .bind(m.uploaded_by)
        .bind(&m.file_name)
        .bind(&m.content_type)
        .bind(m.size_bytes)
        .bind(&m.storage_key)
        .bind(m.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create_media_file"))
    }

    async fn list_media_files(&self, org: Uuid) -> AppResult<Vec<MediaFile>> {
        sqlx::query_as::<_, MediaFile>(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media_files WHERE organization_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(org)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list_media_files"))
    }

    async fn get_media_file(&self, org: Uuid, id: Uuid) -> AppResult<Option<MediaFile>> {
        sqlx::query_as::<_, MediaFile>(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media_files WHERE id = $1 AND organization_id = $2"
        ))
        .bind(id)
        .bind(org)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_media_file"))
    }

    async fn delete_media_file(&self, org: Uuid, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM media_files WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(org)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_media_file"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn storage_used(&self, org: Uuid) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(size_bytes), 0)::BIGINT FROM media_files WHERE organization_id = $1",
        )
        .bind(org)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("storage_used"))
    }

    // --- ONBOARDING ---

    async fn get_onboarding_steps(&self, org: Uuid) -> AppResult<Vec<OnboardingStep>> {
        sqlx::query_scalar::<_, OnboardingStep>(
            "SELECT step FROM onboarding_steps WHERE organization_id = $1 ORDER BY step",
        )
        .bind(org)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("get_onboarding_steps"))
    }

    /// complete_onboarding_step
    ///
    /// `ON CONFLICT DO NOTHING` keeps the original completion time on repeats.
    async fn complete_onboarding_step(&self, org: Uuid, step: OnboardingStep) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO onboarding_steps (organization_id, step) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(org)
        .bind(step)
        .execute(&self.pool)
        .await
        .map_err(db_error("complete_onboarding_step"))?;
        Ok(())
    }

    // --- ADMIN ---

    /// get_stats
    ///
    /// Compiles every dashboard counter in a single round trip.
    async fn get_stats(&self, org: Uuid, now: DateTime<Utc>) -> AppResult<AdminDashboardStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM campaigns WHERE organization_id = $1) AS total_campaigns,
                (SELECT COUNT(*) FROM campaigns WHERE organization_id = $1 AND status = 'active') AS active_campaigns,
                (SELECT COUNT(*) FROM users WHERE organization_id = $1) AS total_members,
                (SELECT COUNT(*) FROM invitations
                    WHERE organization_id = $1 AND accepted_at IS NULL AND expires_at > $2) AS pending_invitations,
                (SELECT COUNT(*) FROM integrations
                    WHERE organization_id = $1 AND status = 'connected') AS connected_integrations,
                (SELECT COALESCE(SUM(spent_cents), 0)::BIGINT FROM campaigns WHERE organization_id = $1) AS total_spend_cents,
                (SELECT COALESCE(SUM(size_bytes), 0)::BIGINT FROM media_files WHERE organization_id = $1) AS storage_used_bytes,
                (SELECT COUNT(*) FROM reports WHERE organization_id = $1) AS total_reports
            "#,
        )
        .bind(org)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("get_stats"))?;

        Ok(AdminDashboardStats {
            total_campaigns: row.try_get("total_campaigns")?,
            active_campaigns: row.try_get("active_campaigns")?,
            total_members: row.try_get("total_members")?,
            pending_invitations: row.try_get("pending_invitations")?,
            connected_integrations: row.try_get("connected_integrations")?,
            total_spend_cents: row.try_get("total_spend_cents")?,
            storage_used_bytes: row.try_get("storage_used_bytes")?,
            total_reports: row.try_get("total_reports")?,
        })
    }
}

async fn insert_user(tx: &mut sqlx::PgConnection, user: &User) -> AppResult<User> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (id, organization_id, email, name, role, password_hash, avatar_key, \
             failed_login_count, locked_until, last_login_at, created_at, updated_at) \
         VALUES ($1, $2, LOWER($3), $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(user.id)
    .bind(user.organization_id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(user.role)
    .bind(&user.password_hash)
    .bind(&user.avatar_key)
    .bind(user.failed_login_count)
    .bind(user.locked_until)
    .bind(user.last_login_at)
    .bind(user.created_at)
    .bind(user.updated_at)
    .fetch_one(tx)
    .await
    .map_err(db_error("insert_user"))
}
