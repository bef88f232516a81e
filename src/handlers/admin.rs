use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::{
    dto::{
        NewEventDto, PaymentDecisionDto, UpdateEventDto, UserResponse, VerificationDecisionDto,
    },
    errors::ApiError,
    handlers::auth_data,
    service,
    service::verify::VerifierClient,
    PGPool,
};

#[post("/events")]
pub async fn create_event(
    req: HttpRequest,
    dto: web::Json<NewEventDto>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let pool = pool_state.get_ref();
    service::admin::require_admin(&auth_data(&req)?, pool).await?;
    let event = service::admin::create_event(dto.into_inner(), pool).await?;
    Ok(HttpResponse::Created().json(event))
}

#[put("/events/{id}")]
pub async fn update_event(
    req: HttpRequest,
    id: web::Path<Uuid>,
    dto: web::Json<UpdateEventDto>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let pool = pool_state.get_ref();
    service::admin::require_admin(&auth_data(&req)?, pool).await?;
    let event = service::admin::update_event(id.into_inner(), dto.into_inner(), pool).await?;
    Ok(HttpResponse::Ok().json(event))
}

#[delete("/events/{id}")]
pub async fn delete_event(
    req: HttpRequest,
    id: web::Path<Uuid>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let pool = pool_state.get_ref();
    service::admin::require_admin(&auth_data(&req)?, pool).await?;
    service::admin::delete_event(id.into_inner(), pool).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/users")]
pub async fn list_users(
    req: HttpRequest,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let pool = pool_state.get_ref();
    service::admin::require_admin(&auth_data(&req)?, pool).await?;
    let users = service::admin::list_users(pool).await?;
    let body = users.into_iter().map(UserResponse::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(body))
}

#[post("/users/{id}/verification")]
pub async fn decide_verification(
    req: HttpRequest,
    id: web::Path<Uuid>,
    dto: web::Json<VerificationDecisionDto>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let pool = pool_state.get_ref();
    service::admin::require_admin(&auth_data(&req)?, pool).await?;
    let user =
        service::admin::set_identity_verification(id.into_inner(), dto.decision, pool).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[post("/users/{id}/disable")]
pub async fn disable_user(
    req: HttpRequest,
    id: web::Path<Uuid>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let pool = pool_state.get_ref();
    service::admin::require_admin(&auth_data(&req)?, pool).await?;
    let user = service::admin::set_user_disabled(id.into_inner(), true, pool).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[post("/users/{id}/enable")]
pub async fn enable_user(
    req: HttpRequest,
    id: web::Path<Uuid>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let pool = pool_state.get_ref();
    service::admin::require_admin(&auth_data(&req)?, pool).await?;
    let user = service::admin::set_user_disabled(id.into_inner(), false, pool).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[get("/bookings")]
pub async fn list_bookings(
    req: HttpRequest,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let pool = pool_state.get_ref();
    service::admin::require_admin(&auth_data(&req)?, pool).await?;
    let bookings = service::admin::list_bookings(pool).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

#[post("/bookings/{id}/status")]
pub async fn set_payment_status(
    req: HttpRequest,
    id: web::Path<Uuid>,
    dto: web::Json<PaymentDecisionDto>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let pool = pool_state.get_ref();
    let admin = service::admin::require_admin(&auth_data(&req)?, pool).await?;
    let booking =
        service::admin::set_payment_status(admin.id, id.into_inner(), dto.status, pool).await?;
    Ok(HttpResponse::Ok().json(booking))
}

#[post("/bookings/{id}/cancel")]
pub async fn cancel_booking(
    req: HttpRequest,
    id: web::Path<Uuid>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let pool = pool_state.get_ref();
    let admin = service::admin::require_admin(&auth_data(&req)?, pool).await?;
    let booking = service::admin::cancel_booking(admin.id, id.into_inner(), pool).await?;
    Ok(HttpResponse::Ok().json(booking))
}

#[get("/logs")]
pub async fn audit_log(
    req: HttpRequest,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let pool = pool_state.get_ref();
    service::admin::require_admin(&auth_data(&req)?, pool).await?;
    let log = service::admin::list_audit_log(pool).await?;
    Ok(HttpResponse::Ok().json(log))
}

#[get("/events/{id}/insights")]
pub async fn event_insights(
    req: HttpRequest,
    id: web::Path<Uuid>,
    pool_state: web::Data<PGPool>,
    verifier_state: web::Data<Option<VerifierClient>>,
) -> Result<HttpResponse, ApiError> {
    let pool = pool_state.get_ref();
    service::admin::require_admin(&auth_data(&req)?, pool).await?;
    let insights = service::admin::event_insights(
        id.into_inner(),
        verifier_state.get_ref().as_ref(),
        pool,
    )
    .await?;
    Ok(HttpResponse::Ok().json(insights))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_event)
        .service(update_event)
        .service(delete_event)
        .service(event_insights)
        .service(list_users)
        .service(decide_verification)
        .service(disable_user)
        .service(enable_user)
        .service(list_bookings)
        .service(set_payment_status)
        .service(cancel_booking)
        .service(audit_log);
}
