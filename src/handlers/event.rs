use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::{db, dto::EventResponse, errors::ApiError, PGPool};

#[get("")]
pub async fn get_all(pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let events = db::event::get_all(pool_state.get_ref())
        .await
        .map_err(ApiError::from_db)?;
    let now = Utc::now();
    let body = events
        .iter()
        .map(|e| EventResponse::from_event(e, now))
        .collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(body))
}

#[get("/{id}")]
pub async fn get_by_id(
    id: web::Path<Uuid>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let event = db::event::get_by_id(id.into_inner(), pool_state.get_ref())
        .await
        .map_err(ApiError::from_db)?;
    Ok(HttpResponse::Ok().json(EventResponse::from_event(&event, Utc::now())))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_all).service(get_by_id);
}
