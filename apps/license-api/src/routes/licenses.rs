//! Tenant-scoped license endpoints.
//!
//! Every handler here runs behind tenant resolution, so the caller's tenant
//! is always known. Failures are returned as [`Fault`]s and shaped into error
//! envelopes by the pipeline.

use axum::extract::rejection::{
    BytesRejection, FailedToBufferBody, JsonRejection, PathRejection,
};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use chrono::Utc;
use licensa_core::{ApiResponse, Fault, Result};
use licensa_pipeline::RequestContext;

use super::AppState;
use crate::models::{CreateLicenseRequest, License, UpdateStatusRequest};

/// Header carrying the caller's role until an auth layer provides claims.
pub const ROLE_HEADER: &str = "x-user-role";

const ADMIN_ROLE: &str = "Admin";

pub fn license_routes() -> Router<AppState> {
    Router::new()
        .route("/api/licenses", post(create_license).get(list_licenses))
        .route("/api/licenses/:id", get(get_license))
        .route("/api/licenses/:id/status", put(update_license_status))
        .route("/api/licenses/:id/renew", post(renew_license))
}

/// A body that could not be read to the end was abandoned by the client.
fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::BytesRejection(BytesRejection::FailedToBufferBody(
            FailedToBufferBody::UnknownBodyError(err),
        ))) => {
            tracing::debug!(error = %err, "request body ended early");
            Err(Fault::Cancelled)
        }
        Err(rejection) => Err(Fault::invalid("body", rejection.body_text())),
    }
}

fn license_id(path: std::result::Result<Path<u64>, PathRejection>) -> Result<u64> {
    path.map(|Path(id)| id)
        .map_err(|_| Fault::invalid("id", "license id must be a whole number"))
}

fn require_admin(headers: &HeaderMap) -> Result<()> {
    let role = headers.get(ROLE_HEADER).and_then(|value| value.to_str().ok());
    match role {
        Some(role) if role.eq_ignore_ascii_case(ADMIN_ROLE) => Ok(()),
        Some(role) => Err(Fault::unauthorized(Some(format!(
            "role {role} may not change license status"
        )))),
        None => Err(Fault::unauthorized(None)),
    }
}

async fn load(state: &AppState, cx: &RequestContext, id: u64) -> Result<License> {
    let tenant = cx.require_tenant()?;
    state
        .store
        .get(tenant, id)
        .await?
        .ok_or_else(|| Fault::not_found("License", Some(id.to_string())))
}

async fn create_license(
    State(state): State<AppState>,
    Extension(cx): Extension<RequestContext>,
    payload: std::result::Result<Json<CreateLicenseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<License>>)> {
    let tenant = cx.require_tenant()?;
    let now = Utc::now();
    let new = json_body(payload)?.into_new_license(now)?;

    let license = state.store.create(tenant, new, now).await?;
    tracing::info!(
        license_id = license.id,
        license_number = %license.license_number,
        "License created"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(license))))
}

async fn list_licenses(
    State(state): State<AppState>,
    Extension(cx): Extension<RequestContext>,
) -> Result<Json<ApiResponse<Vec<License>>>> {
    let tenant = cx.require_tenant()?;
    let licenses = state.store.list(tenant).await?;
    Ok(Json(ApiResponse::ok(licenses)))
}

async fn get_license(
    State(state): State<AppState>,
    Extension(cx): Extension<RequestContext>,
    id: std::result::Result<Path<u64>, PathRejection>,
) -> Result<Json<ApiResponse<License>>> {
    let license = load(&state, &cx, license_id(id)?).await?;
    Ok(Json(ApiResponse::ok(license)))
}

async fn update_license_status(
    State(state): State<AppState>,
    Extension(cx): Extension<RequestContext>,
    id: std::result::Result<Path<u64>, PathRejection>,
    headers: HeaderMap,
    payload: std::result::Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<License>>> {
    require_admin(&headers)?;
    let id = license_id(id)?;
    let request = json_body(payload)?;
    let decision = request.decision()?;

    let mut license = load(&state, &cx, id).await?;
    license.decide(decision, Utc::now())?;
    state.store.save(&license).await?;

    tracing::info!(
        license_id = license.id,
        status = %license.status,
        reason = request.reason.as_deref().unwrap_or(""),
        "License status updated"
    );
    Ok(Json(ApiResponse::ok(license)))
}

async fn renew_license(
    State(state): State<AppState>,
    Extension(cx): Extension<RequestContext>,
    id: std::result::Result<Path<u64>, PathRejection>,
) -> Result<Json<ApiResponse<License>>> {
    let mut license = load(&state, &cx, license_id(id)?).await?;
    license.renew(Utc::now())?;
    state.store.save(&license).await?;

    tracing::info!(
        license_id = license.id,
        expiry_date = %license.expiry_date,
        "License renewed"
    );
    Ok(Json(ApiResponse::ok(license)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_require_admin() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            require_admin(&headers),
            Err(Fault::Unauthorized { message: None })
        ));

        headers.insert(ROLE_HEADER, HeaderValue::from_static("Applicant"));
        assert!(matches!(
            require_admin(&headers),
            Err(Fault::Unauthorized { message: Some(_) })
        ));

        headers.insert(ROLE_HEADER, HeaderValue::from_static("admin"));
        assert!(require_admin(&headers).is_ok());
    }
}
