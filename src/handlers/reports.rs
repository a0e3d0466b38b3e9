use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{
        CreateReportRequest, DateRangeQuery, Notification, NotificationKind, Report,
        ReportStatus, Role,
    },
    services::{activity, analytics, reports},
};

/// create_report
///
/// [Authenticated Route, member+] Renders the export synchronously and stores it.
/// An empty `campaign_ids` selects every campaign of the organization.
#[utoipa::path(
    post,
    path = "/reports",
    tag = "reports",
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report generated", body = Report),
        (status = 400, description = "Invalid date range"),
        (status = 404, description = "Unknown campaign id")
    )
)]
pub async fn create_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateReportRequest>,
) -> AppResult<(StatusCode, Json<Report>)> {
    auth.require(Role::Member)?;
    payload.validate()?;
    let org = auth.organization_id;

    let range = DateRangeQuery {
        from: Some(payload.date_from),
        to: Some(payload.date_to),
    };
    let (from, to) = analytics::resolve_range(&range, payload.date_to)?;

    let campaigns = if payload.campaign_ids.is_empty() {
        state.repo.all_campaigns(org).await?
    } else {
        let mut ids = payload.campaign_ids.clone();
        ids.sort();
        ids.dedup();
        let mut selected = Vec::with_capacity(ids.len());
        for id in ids {
            let campaign = state
                .repo
                .get_campaign(org, id)
                .await?
                .ok_or(AppError::NotFound("Campaign"))?;
            selected.push(campaign);
        }
        selected
    };
    let campaign_ids: Vec<Uuid> = campaigns.iter().map(|c| c.id).collect();

    let metrics = state
        .repo
        .get_metrics(org, Some(campaign_ids.as_slice()), from, to)
        .await?;
    let rows = reports::build_rows(&campaigns, &metrics);

    let (status, content) = match reports::render(payload.format, &rows) {
        Ok(content) => (ReportStatus::Ready, content),
        Err(e) => {
            tracing::error!(error = %e, "Report rendering failed");
            (ReportStatus::Failed, String::new())
        }
    };

    let report = Report {
        id: Uuid::new_v4(),
        organization_id: org,
        created_by: auth.id,
        name: payload.name.trim().to_string(),
        format: payload.format,
        status,
        date_from: from,
        date_to: to,
        campaign_ids,
        row_count: i32::try_from(rows.len()).unwrap_or(i32::MAX),
        content,
        created_at: Utc::now(),
    };
    let report = state.repo.create_report(report).await?;

    if report.status == ReportStatus::Ready {
        activity::notify(
            state.repo.as_ref(),
            Notification::new(
                org,
                auth.id,
                NotificationKind::ReportReady,
                "Report ready",
                format!("\"{}\" is ready to download", report.name),
                Some(format!("/reports/{}", report.id)),
            ),
        )
        .await;
    }

    tracing::info!(report_id = %report.id, rows = report.row_count, "Report generated");
    Ok((StatusCode::CREATED, Json(report)))
}

#[utoipa::path(
    get,
    path = "/reports",
    tag = "reports",
    responses((status = 200, description = "Reports, newest first", body = [Report]))
)]
pub async fn list_reports(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Report>>> {
    auth.require(Role::Member)?;
    Ok(Json(state.repo.list_reports(auth.organization_id).await?))
}

#[utoipa::path(
    get,
    path = "/reports/{id}",
    tag = "reports",
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Found", body = Report),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Report>> {
    auth.require(Role::Member)?;
    state
        .repo
        .get_report(auth.organization_id, id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Report"))
}

#[utoipa::path(
    delete,
    path = "/reports/{id}",
    tag = "reports",
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require(Role::Member)?;
    if state.repo.delete_report(auth.organization_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Report"))
    }
}

/// download_report
///
/// [Authenticated Route, member+] Sends the stored artifact as an attachment.
#[utoipa::path(
    get,
    path = "/reports/{id}/download",
    tag = "reports",
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report file", content_type = "text/csv"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Report failed to generate")
    )
)]
pub async fn download_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    auth.require(Role::Member)?;
    let report = state
        .repo
        .get_report(auth.organization_id, id)
        .await?
        .ok_or(AppError::NotFound("Report"))?;

    if report.status != ReportStatus::Ready {
        return Err(AppError::Conflict(
            "This report failed to generate and has no content".to_string(),
        ));
    }

    let disposition = format!("attachment; filename=\"{}\"", report.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, report.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.content,
    ))
}
