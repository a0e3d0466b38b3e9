use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

const GIB: i64 = 1024 * 1024 * 1024;

/// Length of one billing period.
pub const BILLING_PERIOD_DAYS: i64 = 30;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "subscription_plan", rename_all = "snake_case")]
#[ts(export)]
pub enum Plan {
    #[default]
    Free,
    Starter,
    Professional,
    Enterprise,
}

/// PlanLimits
///
/// Per-plan quotas. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PlanLimits {
    pub max_campaigns: Option<i64>,
    pub max_seats: Option<i64>,
    pub max_integrations: Option<i64>,
    pub storage_bytes: Option<i64>,
}

impl Plan {
    pub const ALL: [Plan; 4] = [Plan::Free, Plan::Starter, Plan::Professional, Plan::Enterprise];

    pub fn price_cents(self) -> i64 {
        match self {
            Plan::Free => 0,
            Plan::Starter => 2_900,
            Plan::Professional => 9_900,
            Plan::Enterprise => 49_900,
        }
    }

    pub fn limits(self) -> PlanLimits {
        match self {
            Plan::Free => PlanLimits {
                max_campaigns: Some(3),
                max_seats: Some(2),
                max_integrations: Some(1),
                storage_bytes: Some(GIB),
            },
            Plan::Starter => PlanLimits {
                max_campaigns: Some(20),
                max_seats: Some(5),
                max_integrations: Some(3),
                storage_bytes: Some(10 * GIB),
            },
            Plan::Professional => PlanLimits {
                max_campaigns: Some(100),
                max_seats: Some(20),
                max_integrations: Some(10),
                storage_bytes: Some(100 * GIB),
            },
            Plan::Enterprise => PlanLimits::default(),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Plan::Free => "Free",
            Plan::Starter => "Starter",
            Plan::Professional => "Professional",
            Plan::Enterprise => "Enterprise",
        }
    }
}

/// True when `used + adding` stays within `limit`.
pub fn within(limit: Option<i64>, used: i64, adding: i64) -> bool {
    limit.is_none_or(|max| used + adding <= max)
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PlanInfo {
    pub plan: Plan,
    pub name: String,
    pub price_cents: i64,
    pub limits: PlanLimits,
}

impl From<Plan> for PlanInfo {
    fn from(plan: Plan) -> Self {
        Self {
            plan,
            name: plan.display_name().to_string(),
            price_cents: plan.price_cents(),
            limits: plan.limits(),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[ts(export)]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Canceled,
}

/// Subscription
///
/// One row per organization in `subscriptions`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Subscription {
    pub organization_id: Uuid,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// A fresh subscription on `plan` whose period starts at `now`.
    pub fn start(organization_id: Uuid, plan: Plan, now: DateTime<Utc>) -> Self {
        Self {
            organization_id,
            plan,
            status: SubscriptionStatus::Active,
            current_period_start: now,
            current_period_end: now + Duration::days(BILLING_PERIOD_DAYS),
            cancel_at_period_end: false,
            updated_at: now,
        }
    }

    pub fn has_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.cancel_at_period_end && now >= self.current_period_end
    }

    /// The plan whose limits apply right now. A cancelled subscription keeps
    /// its plan until the period ends, then falls back to free.
    pub fn effective_plan(&self, now: DateTime<Utc>) -> Plan {
        if self.has_lapsed(now) || self.status == SubscriptionStatus::Canceled {
            Plan::Free
        } else {
            self.plan
        }
    }

    /// The subscription as it should be reported at `now`.
    pub fn settled(mut self, now: DateTime<Utc>) -> Self {
        if self.has_lapsed(now) {
            self.status = SubscriptionStatus::Canceled;
        }
        self
    }
}

/// Usage
///
/// Current consumption of each plan quota.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Usage {
    pub campaigns: i64,
    pub seats: i64,
    pub integrations: i64,
    pub storage_bytes: i64,
}

impl Usage {
    /// Human-readable reasons this usage does not fit `limits`.
    pub fn violations(&self, limits: &PlanLimits) -> Vec<String> {
        let checks = [
            ("campaigns", self.campaigns, limits.max_campaigns),
            ("seats", self.seats, limits.max_seats),
            ("integrations", self.integrations, limits.max_integrations),
            ("storage bytes", self.storage_bytes, limits.storage_bytes),
        ];
        checks
            .into_iter()
            .filter(|(_, used, limit)| !within(*limit, *used, 0))
            .map(|(what, used, limit)| {
                format!("{what}: using {used}, plan allows {}", limit.unwrap_or_default())
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SubscriptionOverview {
    pub subscription: Subscription,
    pub effective_plan: Plan,
    pub limits: PlanLimits,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ChangePlanRequest {
    pub plan: Plan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_plan_lapses_to_free_after_period() {
        let now = Utc::now();
        let mut sub = Subscription::start(Uuid::new_v4(), Plan::Professional, now);
        sub.cancel_at_period_end = true;

        assert_eq!(sub.effective_plan(now), Plan::Professional);
        let later = now + Duration::days(BILLING_PERIOD_DAYS + 1);
        assert_eq!(sub.effective_plan(later), Plan::Free);
        assert_eq!(sub.settled(later).status, SubscriptionStatus::Canceled);
    }

    #[test]
    fn enterprise_is_unlimited() {
        let limits = Plan::Enterprise.limits();
        assert!(within(limits.max_campaigns, 1_000_000, 1));
        assert!(within(limits.max_seats, 1_000_000, 1));
    }

    #[test]
    fn downgrade_violations_name_the_quota() {
        let usage = Usage {
            campaigns: 5,
            seats: 2,
            integrations: 0,
            storage_bytes: 0,
        };
        let violations = usage.violations(&Plan::Free.limits());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].starts_with("campaigns"));
    }

    #[test]
    fn limit_boundary_is_inclusive() {
        assert!(within(Some(3), 2, 1));
        assert!(!within(Some(3), 3, 1));
    }
}
