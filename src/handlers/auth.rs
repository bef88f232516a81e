use actix_web::{post, web, HttpResponse};

use crate::{
    dto::{LoginDto, RefreshDto, RegisterDto},
    errors::ApiError,
    service, PGPool,
};

#[post("/register")]
pub async fn register(
    dto: web::Json<RegisterDto>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let user = service::auth::register(dto.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Created().json(user))
}

#[post("/login")]
pub async fn login(
    dto: web::Json<LoginDto>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let tokens = service::auth::login(dto.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

#[post("/refresh")]
pub async fn refresh(
    dto: web::Json<RefreshDto>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, ApiError> {
    let tokens = service::auth::refresh(dto.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register).service(login).service(refresh);
}
