use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::warn;

use crate::{
    dto::{UserResponse, VerificationUploadDto},
    errors::ApiError,
    handlers::auth_data,
    service,
    service::verify::VerifierClient,
    PGPool,
};

#[get("/me")]
pub async fn me(req: HttpRequest, pool_state: web::Data<PGPool>) -> Result<HttpResponse, ApiError> {
    let auth = auth_data(&req)?;
    let user = service::user::get_by_id(auth.user_id, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[get("/me/bookings")]
pub async fn my_bookings(
    req: HttpRequest,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let auth = auth_data(&req)?;
    let bookings = service::user::bookings(auth.user_id, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

/// Identity upload. The document lands the user in Pending either way;
/// the AI verdict is advisory and rides along in the response.
#[post("/me/verification")]
pub async fn submit_verification(
    req: HttpRequest,
    dto: web::Json<VerificationUploadDto>,
    pool_state: web::Data<PGPool>,
    verifier_state: web::Data<Option<VerifierClient>>,
) -> Result<HttpResponse, ApiError> {
    let auth = auth_data(&req)?;
    let pool = pool_state.get_ref();
    let user = service::user::get_by_id(auth.user_id, pool).await?;
    if user.disabled {
        return Err(ApiError::Forbidden);
    }

    let updated = service::user::submit_identity(&user, pool).await?;

    let verdict = match verifier_state.get_ref() {
        Some(client) => match client.verify_id_card(&dto.photo_data_uri).await {
            Ok(verdict) => Some(verdict),
            Err(err) => {
                warn!("id-card pre-check failed: {:?}", err);
                None
            }
        },
        None => None,
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user": UserResponse::from(updated),
        "verdict": verdict,
    })))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(me)
        .service(my_bookings)
        .service(submit_verification);
}
