use chrono::{Days, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    Campaign, CampaignAnalytics, CampaignPerformance, CampaignStatus, DailyMetric, DailyPoint,
    DashboardAnalytics, DateRangeQuery, MetricTotals, StatusCount,
};

/// Days covered by the dashboard when no range is given.
pub const DEFAULT_RANGE_DAYS: u64 = 30;
/// Longest range a single query may span, inclusive.
pub const MAX_RANGE_DAYS: i64 = 366;
/// Size of the `top_campaigns` leaderboard.
pub const TOP_CAMPAIGNS: usize = 5;

/// Resolves optional `from`/`to` into an inclusive range ending `today` by default.
pub fn resolve_range(query: &DateRangeQuery, today: NaiveDate) -> AppResult<(NaiveDate, NaiveDate)> {
    let to = query.to.unwrap_or(today);
    let from = match query.from {
        Some(from) => from,
        None => to
            .checked_sub_days(Days::new(DEFAULT_RANGE_DAYS - 1))
            .unwrap_or(NaiveDate::MIN),
    };

    if from > to {
        return Err(AppError::BadRequest("`from` must not be after `to`".to_string()));
    }
    if (to - from).num_days() + 1 > MAX_RANGE_DAYS {
        return Err(AppError::BadRequest(format!(
            "Date range may span at most {MAX_RANGE_DAYS} days"
        )));
    }
    Ok((from, to))
}

/// `numerator / denominator` as a percentage rounded to two decimals; 0 when undefined.
fn percent(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    (numerator as f64 / denominator as f64 * 10_000.0).round() / 100.0
}

/// Whole cents per unit; 0 when undefined.
fn per_unit(cents: i64, units: i64) -> i64 {
    if units == 0 {
        return 0;
    }
    (cents as f64 / units as f64).round() as i64
}

impl MetricTotals {
    pub fn from_counts(impressions: i64, clicks: i64, conversions: i64, spend_cents: i64) -> Self {
        Self {
            impressions,
            clicks,
            conversions,
            spend_cents,
            ctr: percent(clicks, impressions),
            cpc_cents: per_unit(spend_cents, clicks),
            conversion_rate: percent(conversions, clicks),
            cpa_cents: per_unit(spend_cents, conversions),
        }
    }
}

pub fn totals<'a>(rows: impl IntoIterator<Item = &'a DailyMetric>) -> MetricTotals {
    let (mut impressions, mut clicks, mut conversions, mut spend) = (0, 0, 0, 0);
    for row in rows {
        impressions += row.impressions;
        clicks += row.clicks;
        conversions += row.conversions;
        spend += row.spend_cents;
    }
    MetricTotals::from_counts(impressions, clicks, conversions, spend)
}

/// One point per day in `from..=to`, summed across campaigns, zero where no row exists.
pub fn daily_series(rows: &[DailyMetric], from: NaiveDate, to: NaiveDate) -> Vec<DailyPoint> {
    let mut by_day: BTreeMap<NaiveDate, DailyPoint> = from
        .iter_days()
        .take_while(|day| *day <= to)
        .map(|date| {
            (
                date,
                DailyPoint {
                    date,
                    ..DailyPoint::default()
                },
            )
        })
        .collect();

    for row in rows {
        if let Some(point) = by_day.get_mut(&row.date) {
            point.impressions += row.impressions;
            point.clicks += row.clicks;
            point.conversions += row.conversions;
            point.spend_cents += row.spend_cents;
        }
    }
    by_day.into_values().collect()
}

/// A count for every status, zeros included, in lifecycle order.
pub fn status_counts(campaigns: &[Campaign]) -> Vec<StatusCount> {
    CampaignStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: campaigns.iter().filter(|c| c.status == status).count() as i64,
        })
        .collect()
}

/// Campaigns with data in range, most clicks first. Ties go to the higher spend.
pub fn top_campaigns(
    campaigns: &[Campaign],
    rows: &[DailyMetric],
    limit: usize,
) -> Vec<CampaignPerformance> {
    let mut per_campaign: HashMap<Uuid, Vec<&DailyMetric>> = HashMap::new();
    for row in rows {
        per_campaign.entry(row.campaign_id).or_default().push(row);
    }

    let mut ranked: Vec<CampaignPerformance> = campaigns
        .iter()
        .filter_map(|campaign| {
            let rows = per_campaign.get(&campaign.id)?;
            Some(CampaignPerformance {
                campaign_id: campaign.id,
                name: campaign.name.clone(),
                status: campaign.status,
                totals: totals(rows.iter().copied()),
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.totals
            .clicks
            .cmp(&a.totals.clicks)
            .then(b.totals.spend_cents.cmp(&a.totals.spend_cents))
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(limit);
    ranked
}

/// Assembles GET /analytics/dashboard from the organization's campaigns and their rows.
pub fn dashboard(
    campaigns: &[Campaign],
    rows: &[DailyMetric],
    from: NaiveDate,
    to: NaiveDate,
) -> DashboardAnalytics {
    DashboardAnalytics {
        from,
        to,
        totals: totals(rows),
        daily: daily_series(rows, from, to),
        campaigns_by_status: status_counts(campaigns),
        top_campaigns: top_campaigns(campaigns, rows, TOP_CAMPAIGNS),
    }
}

pub fn campaign_analytics(
    campaign: Campaign,
    rows: &[DailyMetric],
    from: NaiveDate,
    to: NaiveDate,
) -> CampaignAnalytics {
    CampaignAnalytics {
        campaign,
        from,
        to,
        totals: totals(rows),
        daily: daily_series(rows, from, to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn row(campaign_id: Uuid, date: NaiveDate, impressions: i64, clicks: i64, spend: i64) -> DailyMetric {
        DailyMetric {
            campaign_id,
            date,
            impressions,
            clicks,
            conversions: clicks / 2,
            spend_cents: spend,
        }
    }

    #[test]
    fn range_defaults_to_last_thirty_days() {
        let (from, to) = resolve_range(&DateRangeQuery::default(), day(31)).unwrap();
        assert_eq!(to, day(31));
        assert_eq!(from, day(2));
        assert_eq!((to - from).num_days() + 1, 30);
    }

    #[test]
    fn inverted_or_oversized_range_is_rejected() {
        let inverted = DateRangeQuery {
            from: Some(day(10)),
            to: Some(day(9)),
        };
        assert!(matches!(
            resolve_range(&inverted, day(31)),
            Err(AppError::BadRequest(_))
        ));

        let from = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let too_long = DateRangeQuery {
            from: Some(from),
            to: Some(from + Days::new(366)),
        };
        assert!(resolve_range(&too_long, day(31)).is_err());

        let longest = DateRangeQuery {
            from: Some(from),
            to: Some(from + Days::new(365)),
        };
        assert!(resolve_range(&longest, day(31)).is_ok());
    }

    #[test]
    fn rates_round_and_tolerate_zero_denominators() {
        let t = MetricTotals::from_counts(3, 1, 0, 1_000);
        assert_eq!(t.ctr, 33.33);
        assert_eq!(t.cpc_cents, 1_000);
        assert_eq!(t.conversion_rate, 0.0);
        assert_eq!(t.cpa_cents, 0);

        let empty = MetricTotals::from_counts(0, 0, 0, 0);
        assert_eq!(empty.ctr, 0.0);
        assert_eq!(empty.cpc_cents, 0);
    }

    #[test]
    fn daily_series_is_zero_filled() {
        let id = Uuid::new_v4();
        let rows = vec![row(id, day(2), 100, 10, 500), row(Uuid::new_v4(), day(2), 50, 5, 100)];
        let series = daily_series(&rows, day(1), day(3));

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].impressions, 0);
        assert_eq!(series[1].impressions, 150);
        assert_eq!(series[1].spend_cents, 600);
        assert_eq!(series[2], DailyPoint { date: day(3), ..DailyPoint::default() });
    }

    #[test]
    fn status_counts_cover_every_status() {
        let campaigns = vec![
            Campaign { status: CampaignStatus::Active, ..Campaign::default() },
            Campaign { status: CampaignStatus::Active, ..Campaign::default() },
            Campaign { status: CampaignStatus::Archived, ..Campaign::default() },
        ];
        let counts = status_counts(&campaigns);
        assert_eq!(counts.len(), CampaignStatus::ALL.len());
        assert_eq!(counts[1], StatusCount { status: CampaignStatus::Active, count: 2 });
        assert_eq!(counts[0].count, 0);
    }

    #[test]
    fn top_campaigns_rank_by_clicks() {
        let campaigns: Vec<Campaign> = (0..7)
            .map(|i| Campaign {
                id: Uuid::new_v4(),
                name: format!("c{i}"),
                ..Campaign::default()
            })
            .collect();
        let rows: Vec<DailyMetric> = campaigns
            .iter()
            .enumerate()
            .map(|(i, c)| row(c.id, day(1), 1_000, i as i64 * 10, 100))
            .collect();

        let top = top_campaigns(&campaigns, &rows, TOP_CAMPAIGNS);
        assert_eq!(top.len(), 5);
        assert_eq!(top[0].name, "c6");
        assert_eq!(top[0].totals.clicks, 60);
        assert_eq!(top[4].name, "c2");
    }
}
