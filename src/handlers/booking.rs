use actix_web::{get, post, web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::{
    db,
    dto::BookingRequestDto,
    errors::ApiError,
    handlers::auth_data,
    service,
    service::verify::VerifierClient,
    PGPool,
};

/// One booking attempt end to end. The write is awaited; only the audit
/// append is dispatched without waiting.
#[post("")]
pub async fn create(
    req: HttpRequest,
    dto: web::Json<BookingRequestDto>,
    pool_state: web::Data<PGPool>,
    verifier_state: web::Data<Option<VerifierClient>>,
) -> Result<HttpResponse, ApiError> {
    let auth = auth_data(&req)?;
    let pool = pool_state.get_ref();
    let dto = dto.into_inner();

    let user = match db::user::get_by_id(auth.user_id, pool).await {
        Ok(user) => user,
        Err(_) => return Err(ApiError::Unauthorized),
    };
    if user.disabled {
        return Err(ApiError::Forbidden);
    }
    let event = db::event::get_by_id(dto.event_id, pool)
        .await
        .map_err(ApiError::from_db)?;

    let outcome = service::booking::submit(
        &user,
        &event,
        &dto.quantities,
        dto.payment_screenshot,
        verifier_state.get_ref().as_ref(),
        pool,
    )
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "booking": outcome.booking,
        "receipt_check": outcome.receipt_check,
    })))
}

#[post("/{id}/cancel")]
pub async fn cancel(
    req: HttpRequest,
    id: web::Path<Uuid>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let auth = auth_data(&req)?;
    let booking =
        service::booking::cancel_own(auth.user_id, id.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(booking))
}

#[get("/{id}/tickets")]
pub async fn tickets(
    req: HttpRequest,
    id: web::Path<Uuid>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let auth = auth_data(&req)?;
    let tickets =
        service::booking::tickets_for_download(auth.user_id, id.into_inner(), pool_state.get_ref())
            .await?;
    Ok(HttpResponse::Ok().json(tickets))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create).service(cancel).service(tickets);
}
