//! HTTP handler functions for the crime dashboard API.

use actix_web::{HttpResponse, web};
use crime_dash_server_models::{ApiError, ApiHealth, LoadRequest, SelectRequest};
use crime_dash_state::FilterUpdate;

use crate::{AppState, LoadError, today};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/dashboard`
pub async fn dashboard(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.snapshot())
}

/// `POST /api/load`
///
/// Moves the date range to the requested days (if any) and reloads it.
/// An empty body reloads the current range.
pub async fn load(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        LoadRequest::default()
    } else {
        match serde_json::from_slice::<LoadRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("Rejected load request body: {e}");
                return HttpResponse::BadRequest().json(ApiError {
                    error: format!("Invalid load request: {e}"),
                    hint: None,
                });
            }
        }
    };

    let update = FilterUpdate {
        start: request.start,
        end: request.end,
        ..FilterUpdate::default()
    };

    match state.load(update).await {
        Ok(snapshot) => HttpResponse::Ok().json(snapshot),
        Err(LoadError::InvalidRange(e)) => {
            log::warn!("Rejected load request: {e}");
            HttpResponse::BadRequest().json(ApiError::from(&e))
        }
        Err(LoadError::Failed(failure)) => {
            HttpResponse::BadGateway().json(ApiError::from(&failure))
        }
    }
}

/// `PUT /api/filters`
pub async fn filters(
    state: web::Data<AppState>,
    body: web::Json<FilterUpdate>,
) -> HttpResponse {
    let update = body.into_inner();
    match state.try_apply(|dashboard| dashboard.set_filter(update)) {
        Ok(snapshot) => HttpResponse::Ok().json(snapshot),
        Err(e) => {
            log::warn!("Rejected filter update: {e}");
            HttpResponse::BadRequest().json(ApiError::from(&e))
        }
    }
}

/// `POST /api/selection`
pub async fn select(
    state: web::Data<AppState>,
    body: web::Json<SelectRequest>,
) -> HttpResponse {
    let group = body.into_inner().group;
    HttpResponse::Ok().json(state.apply(|dashboard| dashboard.select(group)))
}

/// `DELETE /api/selection`
pub async fn clear(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.apply(crime_dash_state::Dashboard::clear))
}

/// `POST /api/reset`
pub async fn reset(state: web::Data<AppState>) -> HttpResponse {
    let today = today();
    HttpResponse::Ok().json(state.apply(|dashboard| dashboard.reset_all(today)))
}
