use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Repository;
use crate::error::{AppError, AppResult};
use crate::models::{
    Ad, AdminDashboardStats, Campaign, CampaignFilter, CampaignStatus, DailyMetric, Integration,
    IntegrationProvider, IntegrationStatus, Invitation, MediaFile, MetricsOutcome, Notification,
    OnboardingStep, Organization, RecordMetricsRequest, Report, Role, Session, Subscription,
    UpdateAdRequest, UpdateCampaignRequest, User,
};

#[derive(Default)]
struct Store {
    organizations: HashMap<Uuid, Organization>,
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, Session>,
    campaigns: HashMap<Uuid, Campaign>,
    metrics: HashMap<(Uuid, NaiveDate), DailyMetric>,
    ads: HashMap<Uuid, Ad>,
    subscriptions: HashMap<Uuid, Subscription>,
    reports: HashMap<Uuid, Report>,
    integrations: HashMap<Uuid, Integration>,
    invitations: HashMap<Uuid, Invitation>,
    notifications: HashMap<Uuid, Notification>,
    media: HashMap<Uuid, MediaFile>,
    onboarding: HashMap<Uuid, Vec<OnboardingStep>>,
}

impl Store {
    fn email_taken(&self, email: &str) -> bool {
        self.users.values().any(|u| u.email.eq_ignore_ascii_case(email))
    }

    fn campaign_mut(&mut self, org: Uuid, id: Uuid) -> Option<&mut Campaign> {
        self.campaigns
            .get_mut(&id)
            .filter(|c| c.organization_id == org)
    }
}

/// MemoryRepository
///
/// A process-local implementation of [`Repository`]. Used by the test suite and
/// by local runs without `DATABASE_URL`. All state is lost on restart.
#[derive(Default)]
pub struct MemoryRepository {
    store: RwLock<Store>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
}

fn duplicate(what: &str) -> AppError {
    AppError::Conflict(format!("{what} already exists"))
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn register_organization(
        &self,
        org: Organization,
        owner: User,
        subscription: Subscription,
    ) -> AppResult<User> {
        let mut store = self.store.write().await;
        if store.email_taken(&owner.email) {
            return Err(duplicate("A user with this email"));
        }
        if store.organizations.values().any(|o| o.slug == org.slug) {
            return Err(duplicate("An organization with this slug"));
        }
        store.subscriptions.insert(org.id, subscription);
        store.onboarding.insert(org.id, Vec::new());
        store.organizations.insert(org.id, org);
        store.users.insert(owner.id, owner.clone());
        Ok(owner)
    }

    async fn get_organization(&self, id: Uuid) -> AppResult<Option<Organization>> {
        Ok(self.store.read().await.organizations.get(&id).cloned())
    }

    async fn slug_exists(&self, slug: &str) -> AppResult<bool> {
        let store = self.store.read().await;
        Ok(store.organizations.values().any(|o| o.slug == slug))
    }

    // --- Users ---

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.store.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self, org: Uuid) -> AppResult<Vec<User>> {
        let store = self.store.read().await;
        let mut users: Vec<User> = store
            .users
            .values()
            .filter(|u| u.organization_id == org)
            .cloned()
            .collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn count_users(&self, org: Uuid) -> AppResult<i64> {
        let store = self.store.read().await;
        Ok(store.users.values().filter(|u| u.organization_id == org).count() as i64)
    }

    async fn update_user_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        avatar_key: Option<String>,
    ) -> AppResult<Option<User>> {
        let mut store = self.store.write().await;
        let Some(user) = store.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            user.name = name;
        }
        if avatar_key.is_some() {
            user.avatar_key = avatar_key;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let mut store = self.store.write().await;
        let user = store.users.get_mut(&id).ok_or(AppError::NotFound("User"))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn record_login_failure(
        &self,
        id: Uuid,
        max_attempts: i32,
        locked_until: DateTime<Utc>,
    ) -> AppResult<User> {
        let mut store = self.store.write().await;
        let user = store.users.get_mut(&id).ok_or(AppError::NotFound("User"))?;
        user.failed_login_count += 1;
        if user.failed_login_count >= max_attempts {
            user.failed_login_count = 0;
            user.locked_until = Some(locked_until);
        }
        Ok(user.clone())
    }

    async fn record_login_success(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut store = self.store.write().await;
        if let Some(user) = store.users.get_mut(&id) {
            user.failed_login_count = 0;
            user.locked_until = None;
            user.last_login_at = Some(at);
        }
        Ok(())
    }

    async fn set_user_role(&self, org: Uuid, id: Uuid, role: Role) -> AppResult<Option<User>> {
        let mut store = self.store.write().await;
        Ok(store
            .users
            .get_mut(&id)
            .filter(|u| u.organization_id == org)
            .map(|u| {
                u.role = role;
                u.updated_at = Utc::now();
                u.clone()
            }))
    }

    async fn delete_user(&self, org: Uuid, id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if !store.users.get(&id).is_some_and(|u| u.organization_id == org) {
            return Ok(false);
        }
        let owner = store
            .users
            .values()
            .find(|u| u.organization_id == org && u.role == Role::Owner && u.id != id)
            .map(|u| u.id);
        if let Some(owner) = owner {
            for c in store.campaigns.values_mut().filter(|c| c.created_by == id) {
                c.created_by = owner;
            }
            for r in store.reports.values_mut().filter(|r| r.created_by == id) {
                r.created_by = owner;
            }
            for i in store.integrations.values_mut().filter(|i| i.connected_by == id) {
                i.connected_by = owner;
            }
            for m in store.media.values_mut().filter(|m| m.uploaded_by == id) {
                m.uploaded_by = owner;
            }
        }
        store.users.remove(&id);
        store.sessions.retain(|_, s| s.user_id != id);
        store.notifications.retain(|_, n| n.user_id != id);
        store.invitations.retain(|_, i| i.invited_by != id);
        Ok(true)
    }

    // --- Sessions ---

    async fn create_session(&self, session: Session) -> AppResult<()> {
        let mut store = self.store.write().await;
        store.sessions.insert(session.id, session);
        Ok(())
    }

    async fn get_session_by_hash(&self, refresh_token_hash: &str) -> AppResult<Option<Session>> {
        let store = self.store.read().await;
        Ok(store
            .sessions
            .values()
            .find(|s| s.refresh_token_hash == refresh_token_hash)
            .cloned())
    }

    async fn rotate_session(&self, old: Uuid, new: Session) -> AppResult<bool> {
        let mut store = self.store.write().await;
        match store.sessions.get_mut(&old) {
            Some(session) if session.revoked_at.is_none() => {
                session.revoked_at = Some(Utc::now());
            }
            _ => return Ok(false),
        }
        store.sessions.insert(new.id, new);
        Ok(true)
    }

    async fn revoke_user_sessions(&self, user_id: Uuid) -> AppResult<u64> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        let mut revoked = 0;
        for session in store.sessions.values_mut() {
            if session.user_id == user_id && session.revoked_at.is_none() {
                session.revoked_at = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    // --- Campaigns ---

    async fn list_campaigns(
        &self,
        org: Uuid,
        filter: &CampaignFilter,
    ) -> AppResult<(Vec<Campaign>, i64)> {
        let store = self.store.read().await;
        let search = filter.search_term().map(str::to_lowercase);
        let mut matches: Vec<Campaign> = store
            .campaigns
            .values()
            .filter(|c| c.organization_id == org)
            .filter(|c| match filter.status {
                Some(status) => c.status == status,
                None => c.status != CampaignStatus::Archived,
            })
            .filter(|c| {
                search.as_deref().is_none_or(|term| {
                    c.name.to_lowercase().contains(term)
                        || c.description
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(term))
                })
            })
            .cloned()
            .collect();
        newest_first(&mut matches, |c| c.created_at);

        let total = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.per_page() as usize)
            .collect();
        Ok((page, total))
    }

    async fn all_campaigns(&self, org: Uuid) -> AppResult<Vec<Campaign>> {
        let store = self.store.read().await;
        let mut campaigns: Vec<Campaign> = store
            .campaigns
            .values()
            .filter(|c| c.organization_id == org)
            .cloned()
            .collect();
        newest_first(&mut campaigns, |c| c.created_at);
        Ok(campaigns)
    }

    async fn get_campaign(&self, org: Uuid, id: Uuid) -> AppResult<Option<Campaign>> {
        let store = self.store.read().await;
        Ok(store
            .campaigns
            .get(&id)
            .filter(|c| c.organization_id == org)
            .cloned())
    }

    async fn create_campaign(&self, campaign: Campaign) -> AppResult<Campaign> {
        let mut store = self.store.write().await;
        store.campaigns.insert(campaign.id, campaign.clone());
        Ok(campaign)
    }

    async fn update_campaign(
        &self,
        org: Uuid,
        id: Uuid,
        req: &UpdateCampaignRequest,
    ) -> AppResult<Option<Campaign>> {
        let mut store = self.store.write().await;
        let Some(campaign) = store.campaign_mut(org, id) else {
            return Ok(None);
        };
        if let Some(name) = &req.name {
            campaign.name = name.clone();
        }
        if let Some(description) = &req.description {
            campaign.description = Some(description.clone());
        }
        if let Some(objective) = req.objective {
            campaign.objective = objective;
        }
        if let Some(budget) = req.budget_cents {
            campaign.budget_cents = budget;
        }
        if req.start_date.is_some() {
            campaign.start_date = req.start_date;
        }
        if req.end_date.is_some() {
            campaign.end_date = req.end_date;
        }
        campaign.updated_at = Utc::now();
        Ok(Some(campaign.clone()))
    }

    async fn set_campaign_status(
        &self,
        org: Uuid,
        id: Uuid,
        status: CampaignStatus,
    ) -> AppResult<Option<Campaign>> {
        let mut store = self.store.write().await;
        Ok(store.campaign_mut(org, id).map(|c| {
            c.status = status;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete_campaign(&self, org: Uuid, id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if store.campaign_mut(org, id).is_none() {
            return Ok(false);
        }
        store.campaigns.remove(&id);
        store.ads.retain(|_, ad| ad.campaign_id != id);
        store.metrics.retain(|(campaign_id, _), _| *campaign_id != id);
        Ok(true)
    }

    async fn count_campaigns(&self, org: Uuid) -> AppResult<i64> {
        let store = self.store.read().await;
        Ok(store
            .campaigns
            .values()
            .filter(|c| c.organization_id == org && c.status != CampaignStatus::Archived)
            .count() as i64)
    }

    // --- Metrics ---

    async fn record_metrics(
        &self,
        org: Uuid,
        campaign_id: Uuid,
        req: &RecordMetricsRequest,
    ) -> AppResult<Option<MetricsOutcome>> {
        // The write lock plays the role of the row lock; everything below is atomic.
        let mut store = self.store.write().await;
        let day = store
            .metrics
            .get(&(campaign_id, req.date))
            .map(|m| (m.impressions, m.clicks, m.conversions, m.spend_cents))
            .unwrap_or_default();
        let Some(campaign) = store.campaign_mut(org, campaign_id) else {
            return Ok(None);
        };
        if campaign.status == CampaignStatus::Archived {
            return Err(AppError::Conflict(
                "Archived campaigns do not accept metrics".to_string(),
            ));
        }

        // Both sums are checked before anything is written.
        let totals = req.add_to((
            campaign.impressions,
            campaign.clicks,
            campaign.conversions,
            campaign.spent_cents,
        ))?;
        let (impressions, clicks, conversions, spend_cents) = req.add_to(day)?;

        (
            campaign.impressions,
            campaign.clicks,
            campaign.conversions,
            campaign.spent_cents,
        ) = totals;
        let budget_exhausted = campaign.status == CampaignStatus::Active
            && campaign.spent_cents >= campaign.budget_cents;
        if budget_exhausted {
            campaign.status = CampaignStatus::Paused;
        }
        campaign.updated_at = Utc::now();
        let campaign = campaign.clone();

        store.metrics.insert(
            (campaign_id, req.date),
            DailyMetric {
                campaign_id,
                date: req.date,
                impressions,
                clicks,
                conversions,
                spend_cents,
            },
        );

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
        let store = self.store.read().await;
        let mut rows: Vec<DailyMetric> = store
            .metrics
            .values()
            .filter(|m| m.date >= from && m.date <= to)
            .filter(|m| campaign_ids.is_none_or(|ids| ids.contains(&m.campaign_id)))
            .filter(|m| {
                store
                    .campaigns
                    .get(&m.campaign_id)
                    .is_some_and(|c| c.organization_id == org)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|m| (m.date, m.campaign_id));
        Ok(rows)
    }

    // --- Ads ---

    async fn list_ads(&self, org: Uuid, campaign_id: Uuid) -> AppResult<Vec<Ad>> {
        let store = self.store.read().await;
        let mut ads: Vec<Ad> = store
            .ads
            .values()
            .filter(|ad| ad.organization_id == org && ad.campaign_id == campaign_id)
            .cloned()
            .collect();
        newest_first(&mut ads, |ad| ad.created_at);
        Ok(ads)
    }

    async fn get_ad(&self, org: Uuid, id: Uuid) -> AppResult<Option<Ad>> {
        let store = self.store.read().await;
        Ok(store
            .ads
            .get(&id)
            .filter(|ad| ad.organization_id == org)
            .cloned())
    }

    async fn create_ad(&self, ad: Ad) -> AppResult<Ad> {
        let mut store = self.store.write().await;
        store.ads.insert(ad.id, ad.clone());
        Ok(ad)
    }

    async fn update_ad(&self, org: Uuid, id: Uuid, req: &UpdateAdRequest) -> AppResult<Option<Ad>> {
        let mut store = self.store.write().await;
        let Some(ad) = store.ads.get_mut(&id).filter(|ad| ad.organization_id == org) else {
            return Ok(None);
        };
        if let Some(name) = &req.name {
            ad.name = name.clone();
        }
        if let Some(format) = req.format {
            ad.format = format;
        }
        if let Some(headline) = &req.headline {
            ad.headline = headline.clone();
        }
        if req.body.is_some() {
            ad.body = req.body.clone();
        }
        if req.call_to_action.is_some() {
            ad.call_to_action = req.call_to_action.clone();
        }
        if let Some(url) = &req.destination_url {
            ad.destination_url = url.clone();
        }
        if req.media_file_id.is_some() {
            ad.media_file_id = req.media_file_id;
        }
        if let Some(status) = req.status {
            ad.status = status;
        }
        ad.updated_at = Utc::now();
        Ok(Some(ad.clone()))
    }

    async fn delete_ad(&self, org: Uuid, id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if !store.ads.get(&id).is_some_and(|ad| ad.organization_id == org) {
            return Ok(false);
        }
        store.ads.remove(&id);
        Ok(true)
    }

    // --- Subscriptions ---

    async fn get_subscription(&self, org: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self.store.read().await.subscriptions.get(&org).cloned())
    }

    async fn save_subscription(&self, subscription: Subscription) -> AppResult<Subscription> {
        let mut store = self.store.write().await;
        store
            .subscriptions
            .insert(subscription.organization_id, subscription.clone());
        Ok(subscription)
    }

    // --- Reports ---

    async fn create_report(&self, report: Report) -> AppResult<Report> {
        let mut store = self.store.write().await;
        store.reports.insert(report.id, report.clone());
        Ok(report)
    }

    async fn list_reports(&self, org: Uuid) -> AppResult<Vec<Report>> {
        let store = self.store.read().await;
        let mut reports: Vec<Report> = store
            .reports
            .values()
            .filter(|r| r.organization_id == org)
            .map(|r| Report {
                content: String::new(),
                ..r.clone()
            })
            .collect();
        newest_first(&mut reports, |r| r.created_at);
        Ok(reports)
    }

    async fn get_report(&self, org: Uuid, id: Uuid) -> AppResult<Option<Report>> {
        let store = self.store.read().await;
        Ok(store
            .reports
            .get(&id)
            .filter(|r| r.organization_id == org)
            .cloned())
    }

    async fn delete_report(&self, org: Uuid, id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if !store.reports.get(&id).is_some_and(|r| r.organization_id == org) {
            return Ok(false);
        }
        store.reports.remove(&id);
        Ok(true)
    }

    // --- Integrations ---

    async fn list_integrations(&self, org: Uuid) -> AppResult<Vec<Integration>> {
        let store = self.store.read().await;
        let mut integrations: Vec<Integration> = store
            .integrations
            .values()
            .filter(|i| i.organization_id == org)
            .cloned()
            .collect();
        integrations.sort_by_key(|i| i.created_at);
        Ok(integrations)
    }

    async fn get_integration(&self, org: Uuid, id: Uuid) -> AppResult<Option<Integration>> {
        let store = self.store.read().await;
        Ok(store
            .integrations
            .get(&id)
            .filter(|i| i.organization_id == org)
            .cloned())
    }

    async fn get_integration_by_provider(
        &self,
        org: Uuid,
        provider: IntegrationProvider,
    ) -> AppResult<Option<Integration>> {
        let store = self.store.read().await;
        Ok(store
            .integrations
            .values()
            .find(|i| i.organization_id == org && i.provider == provider)
            .cloned())
    }

    async fn create_integration(&self, integration: Integration) -> AppResult<Integration> {
        let mut store = self.store.write().await;
        let taken = store.integrations.values().any(|i| {
            i.organization_id == integration.organization_id && i.provider == integration.provider
        });
        if taken {
            return Err(duplicate("An integration for this provider"));
        }
        store.integrations.insert(integration.id, integration.clone());
        Ok(integration)
    }

    async fn update_integration(&self, integration: Integration) -> AppResult<Option<Integration>> {
        let mut store = self.store.write().await;
        let Some(stored) = store
            .integrations
            .get_mut(&integration.id)
            .filter(|i| i.organization_id == integration.organization_id)
        else {
            return Ok(None);
        };
        stored.display_name = integration.display_name;
        stored.status = integration.status;
        stored.config = integration.config;
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn delete_integration(&self, org: Uuid, id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if !store
            .integrations
            .get(&id)
            .is_some_and(|i| i.organization_id == org)
        {
            return Ok(false);
        }
        store.integrations.remove(&id);
        Ok(true)
    }

    async fn count_integrations(&self, org: Uuid) -> AppResult<i64> {
        let store = self.store.read().await;
        Ok(store
            .integrations
            .values()
            .filter(|i| i.organization_id == org)
            .count() as i64)
    }

    // --- Invitations ---

    async fn create_invitation(&self, invitation: Invitation) -> AppResult<Invitation> {
        let mut store = self.store.write().await;
        store.invitations.insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    async fn list_pending_invitations(
        &self,
        org: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Invitation>> {
        let store = self.store.read().await;
        let mut pending: Vec<Invitation> = store
            .invitations
            .values()
            .filter(|i| i.organization_id == org && i.is_pending(now))
            .cloned()
            .collect();
        newest_first(&mut pending, |i| i.created_at);
        Ok(pending)
    }

    async fn count_pending_invitations(&self, org: Uuid, now: DateTime<Utc>) -> AppResult<i64> {
        let store = self.store.read().await;
        Ok(store
            .invitations
            .values()
            .filter(|i| i.organization_id == org && i.is_pending(now))
            .count() as i64)
    }

    async fn get_invitation_by_token_hash(&self, token_hash: &str) -> AppResult<Option<Invitation>> {
        let store = self.store.read().await;
        Ok(store
            .invitations
            .values()
            .find(|i| i.token_hash == token_hash)
            .cloned())
    }

    async fn get_pending_invitation_by_email(
        &self,
        org: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Invitation>> {
        let store = self.store.read().await;
        Ok(store
            .invitations
            .values()
            .find(|i| {
                i.organization_id == org && i.email.eq_ignore_ascii_case(email) && i.is_pending(now)
            })
            .cloned())
    }

    async fn accept_invitation(&self, invitation_id: Uuid, user: User) -> AppResult<Option<User>> {
        let mut store = self.store.write().await;
        if store.email_taken(&user.email) {
            return Err(duplicate("A user with this email"));
        }
        match store.invitations.get_mut(&invitation_id) {
            Some(invitation) if invitation.accepted_at.is_none() => {
                invitation.accepted_at = Some(Utc::now());
            }
            _ => return Ok(None),
        }
        store.users.insert(user.id, user.clone());
        Ok(Some(user))
    }

    async fn delete_invitation(&self, org: Uuid, id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if !store
            .invitations
            .get(&id)
            .is_some_and(|i| i.organization_id == org)
        {
            return Ok(false);
        }
        store.invitations.remove(&id);
        Ok(true)
    }

    // --- Notifications ---

    async fn create_notification(&self, notification: Notification) -> AppResult<Notification> {
        let mut store = self.store.write().await;
        store
            .notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> AppResult<Vec<Notification>> {
        let store = self.store.read().await;
        let mut notifications: Vec<Notification> = store
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        newest_first(&mut notifications, |n| n.created_at);
        Ok(notifications)
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> AppResult<i64> {
        let store = self.store.read().await;
        Ok(store
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as i64)
    }

    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        match store.notifications.get_mut(&id) {
            Some(n) if n.user_id == user_id => {
                n.is_read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> AppResult<u64> {
        let mut store = self.store.write().await;
        let mut updated = 0;
        for n in store.notifications.values_mut() {
            if n.user_id == user_id && !n.is_read {
                n.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    // --- Media ---

    async fn create_media_file(&self, file: MediaFile) -> AppResult<MediaFile> {
        let mut store = self.store.write().await;
        if store.media.values().any(|m| m.storage_key == file.storage_key) {
            return Err(duplicate("A file with this key"));
        }
        store.media.insert(file.id, file.clone());
        Ok(file)
    }

    async fn list_media_files(&self, org: Uuid) -> AppResult<Vec<MediaFile>> {
        let store = self.store.read().await;
        let mut files: Vec<MediaFile> = store
            .media
            .values()
            .filter(|m| m.organization_id == org)
            .cloned()
            .collect();
        newest_first(&mut files, |m| m.created_at);
        Ok(files)
    }

    async fn get_media_file(&self, org: Uuid, id: Uuid) -> AppResult<Option<MediaFile>> {
        let store = self.store.read().await;
        Ok(store
            .media
            .get(&id)
            .filter(|m| m.organization_id == org)
            .cloned())
    }

    async fn delete_media_file(&self, org: Uuid, id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        if !store.media.get(&id).is_some_and(|m| m.organization_id == org) {
            return Ok(false);
        }
        store.media.remove(&id);
        for ad in store.ads.values_mut() {
            if ad.media_file_id == Some(id) {
                ad.media_file_id = None;
            }
        }
        Ok(true)
    }

    async fn storage_used(&self, org: Uuid) -> AppResult<i64> {
        let store = self.store.read().await;
        Ok(store
            .media
            .values()
            .filter(|m| m.organization_id == org)
            .map(|m| m.size_bytes)
            .sum())
    }

    // --- Onboarding ---

    async fn get_onboarding_steps(&self, org: Uuid) -> AppResult<Vec<OnboardingStep>> {
        let store = self.store.read().await;
        Ok(store.onboarding.get(&org).cloned().unwrap_or_default())
    }

    async fn complete_onboarding_step(&self, org: Uuid, step: OnboardingStep) -> AppResult<()> {
        let mut store = self.store.write().await;
        let steps = store.onboarding.entry(org).or_default();
        if !steps.contains(&step) {
            steps.push(step);
        }
        Ok(())
    }

    // --- Admin ---

    async fn get_stats(&self, org: Uuid, now: DateTime<Utc>) -> AppResult<AdminDashboardStats> {
        let store = self.store.read().await;
        let campaigns = store.campaigns.values().filter(|c| c.organization_id == org);
        Ok(AdminDashboardStats {
            total_campaigns: campaigns.clone().count() as i64,
            active_campaigns: campaigns
                .clone()
                .filter(|c| c.status == CampaignStatus::Active)
                .count() as i64,
            total_spend_cents: campaigns.map(|c| c.spent_cents).sum(),
            total_members: store
                .users
                .values()
                .filter(|u| u.organization_id == org)
                .count() as i64,
            pending_invitations: store
                .invitations
                .values()
                .filter(|i| i.organization_id == org && i.is_pending(now))
                .count() as i64,
            connected_integrations: store
                .integrations
                .values()
                .filter(|i| i.organization_id == org && i.status == IntegrationStatus::Connected)
                .count() as i64,
            storage_used_bytes: store
                .media
                .values()
                .filter(|m| m.organization_id == org)
                .map(|m| m.size_bytes)
                .sum(),
            total_reports: store
                .reports
                .values()
                .filter(|r| r.organization_id == org)
                .count() as i64,
        })
    }
}
