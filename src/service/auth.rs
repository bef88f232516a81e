use std::future::{ready, Ready};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    HttpMessage,
};
use chrono::Utc;
use futures_util::future::LocalBoxFuture;
use log::error;
use uuid::Uuid;

use crate::{
    db,
    dto::{LoginDto, RefreshDto, RegisterDto, TokenPair, UserResponse},
    errors::ApiError,
    models::{AuditAction, User, VerificationStatus},
    service::crypto,
    PGPool, ACCESS_TOKEN_EXP, REFRESH_TOKEN_EXP,
};

use self::jwt::TokenType;

/// Identity of the caller, decoded from the access token and injected
/// into request extensions by the middleware.
#[derive(Debug, Clone)]
pub struct UserAuthData {
    pub user_id: Uuid,
    pub name: String,
    pub admin: bool,
}

pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match jwt::validate_request(&req, "Bearer ") {
            Ok(claims) => {
                req.extensions_mut().insert(UserAuthData {
                    user_id: claims.user_id,
                    name: claims.name,
                    admin: claims.admin,
                });
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res)
                })
            }
            Err(err) => Box::pin(async move { Err(err.into()) }),
        }
    }
}

pub async fn register(dto: RegisterDto, pool: &PGPool) -> Result<UserResponse, ApiError> {
    let RegisterDto {
        name,
        email,
        pwd,
        pwd_confirm,
    } = dto;
    if pwd != pwd_confirm {
        return Err(ApiError::Validation("passwords do not match".to_string()));
    }
    if db::user::exists_by_email(&email, pool).await {
        return Err(ApiError::Validation("email already registered".to_string()));
    }
    let user = User {
        id: Uuid::new_v4(),
        name,
        email,
        pwd_hash: crypto::hash_password(&pwd),
        verification_status: VerificationStatus::NotSubmitted,
        admin: false,
        disabled: false,
        created_at: Utc::now(),
    };
    match db::user::create(&user, pool).await {
        Ok(_) => Ok(UserResponse::from(user)),
        Err(err) => {
            error!("failed to create user: {:?}", err);
            Err(ApiError::Internal)
        }
    }
}

pub async fn login(dto: LoginDto, pool: &PGPool) -> Result<TokenPair, ApiError> {
    let user = match db::user::get_by_email(&dto.email, pool).await {
        Ok(user) => user,
        Err(_) => return Err(ApiError::Unauthorized),
    };
    if user.disabled {
        return Err(ApiError::Forbidden);
    }
    if !crypto::verify_password(&dto.pwd, &user.pwd_hash) {
        return Err(ApiError::Unauthorized);
    }

    let access_token = jwt::create(&TokenType::Access, &user, ACCESS_TOKEN_EXP)
        .map_err(|_| ApiError::Internal)?;
    let refresh_token = jwt::create(&TokenType::Refresh, &user, REFRESH_TOKEN_EXP)
        .map_err(|_| ApiError::Internal)?;

    // Audit append is dispatched, not awaited; a failure is logged, never
    // surfaced to the login response.
    let audit_pool = pool.clone();
    let user_id = user.id;
    let email = user.email.clone();
    actix_web::rt::spawn(async move {
        let details = serde_json::json!({ "email": email });
        if let Err(err) = db::audit::append(user_id, AuditAction::UserLogin, details, &audit_pool).await
        {
            error!("failed to append user-login audit event: {:?}", err);
        }
    });

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

pub async fn refresh(dto: RefreshDto, pool: &PGPool) -> Result<TokenPair, ApiError> {
    let claims = jwt::decode_claims(&TokenType::Refresh, &dto.refresh_token)
        .map_err(|_| ApiError::TokenExpired)?
        .claims;
    let user = match db::user::get_by_id(claims.user_id, pool).await {
        Ok(user) => user,
        Err(_) => return Err(ApiError::Unauthorized),
    };
    if user.disabled {
        return Err(ApiError::Forbidden);
    }
    let access_token = jwt::create(&TokenType::Access, &user, ACCESS_TOKEN_EXP)
        .map_err(|_| ApiError::Internal)?;
    Ok(TokenPair {
        access_token,
        refresh_token: dto.refresh_token,
    })
}

pub mod jwt {
    use std::env::{self, VarError};

    use actix_web::dev::ServiceRequest;
    use chrono::Utc;
    use jsonwebtoken::{
        decode, encode, errors::Error, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey,
        Header, TokenData, Validation,
    };

    use crate::{dto::Claims, errors::ApiError, models::User};

    pub enum TokenType {
        Access,
        Refresh,
    }

    fn secret(token_type: &TokenType) -> Result<String, VarError> {
        let env_key = match token_type {
            TokenType::Access => "JWT_ACCESS_SECRET",
            TokenType::Refresh => "JWT_REFRESH_SECRET",
        };
        env::var(env_key)
    }

    pub fn create(token_type: &TokenType, user: &User, exp_secs: usize) -> Result<String, Error> {
        let secret = secret(token_type).map_err(|_| Error::from(ErrorKind::InvalidKeyFormat))?;
        let exp = Utc::now().timestamp() as usize + exp_secs;
        let claims = Claims::new(user, exp);
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
    }

    pub fn decode_claims(token_type: &TokenType, token: &str) -> Result<TokenData<Claims>, Error> {
        let secret = secret(token_type).map_err(|_| Error::from(ErrorKind::InvalidKeyFormat))?;
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::new(Algorithm::HS256),
        )
    }

    /// Pulls the bearer access token off the request and validates it.
    pub fn validate_request(req: &ServiceRequest, prefix: &str) -> Result<Claims, ApiError> {
        let token = parse_request(req, prefix)?;
        match decode_claims(&TokenType::Access, &token) {
            Ok(data) => Ok(data.claims),
            Err(err) => match err.kind() {
                ErrorKind::ExpiredSignature => Err(ApiError::TokenExpired),
                _ => Err(ApiError::Unauthorized),
            },
        }
    }

    pub fn parse_request(req: &ServiceRequest, prefix: &str) -> Result<String, ApiError> {
        if let Some(auth_header) = req.headers().get("Authorization") {
            if let Ok(auth_value) = auth_header.to_str() {
                if let Some(token) = auth_value.strip_prefix(prefix) {
                    return Ok(token.to_string());
                }
            }
        }
        Err(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::dev::Service;
    use actix_web::{test, web, App, HttpRequest, HttpResponse};
    use chrono::Utc;
    use crate::dto::Claims;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Sara".to_string(),
            email: "sara@example.com".to_string(),
            pwd_hash: crate::service::crypto::hash_password("pw"),
            verification_status: VerificationStatus::Verified,
            admin: false,
            disabled: false,
            created_at: Utc::now(),
        }
    }

    async fn whoami(req: HttpRequest) -> HttpResponse {
        match req.extensions().get::<UserAuthData>() {
            Some(auth) => HttpResponse::Ok().json(serde_json::json!({ "name": auth.name })),
            None => HttpResponse::InternalServerError().finish(),
        }
    }

    async fn request_status(req: actix_web::test::TestRequest) -> u16 {
        let app = test::init_service(App::new().service(
            web::scope("/p")
                .wrap(AuthMiddleware)
                .route("/me", web::get().to(whoami)),
        ))
        .await;
        match app.call(req.to_request()).await {
            Ok(res) => res.status().as_u16(),
            Err(err) => err.error_response().status().as_u16(),
        }
    }

    #[actix_rt::test]
    async fn valid_token_reaches_the_handler() {
        std::env::set_var("JWT_ACCESS_SECRET", "test-access-secret");
        let token = jwt::create(&TokenType::Access, &test_user(), 3600).unwrap();
        let req = test::TestRequest::get()
            .uri("/p/me")
            .insert_header(("Authorization", format!("Bearer {token}")));
        assert_eq!(request_status(req).await, 200);
    }

    #[actix_rt::test]
    async fn missing_token_is_unauthorized() {
        std::env::set_var("JWT_ACCESS_SECRET", "test-access-secret");
        let req = test::TestRequest::get().uri("/p/me");
        assert_eq!(request_status(req).await, 401);
    }

    #[actix_rt::test]
    async fn expired_token_is_unauthorized() {
        std::env::set_var("JWT_ACCESS_SECRET", "test-access-secret");
        let claims = Claims::new(&test_user(), (Utc::now().timestamp() - 7200) as usize);
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret("test-access-secret".as_ref()),
        )
        .unwrap();
        let req = test::TestRequest::get()
            .uri("/p/me")
            .insert_header(("Authorization", format!("Bearer {token}")));
        assert_eq!(request_status(req).await, 401);
    }

    #[actix_rt::test]
    async fn token_roundtrip_keeps_claims() {
        std::env::set_var("JWT_ACCESS_SECRET", "test-access-secret");
        let user = test_user();
        let token = jwt::create(&TokenType::Access, &user, 3600).unwrap();
        let claims = jwt::decode_claims(&TokenType::Access, &token).unwrap().claims;
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.name, user.name);
        assert!(!claims.admin);
    }
}
