use actix_web::{get, post, put, web, HttpMessage, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::{
    error::ApiError,
    models::{
        account::{
            AccountProvisioner, CreateUserRequest, CreateUserResponse, MongoIdentityStore,
            MongoProfileStore,
        },
        parse_optional_id,
        role::{RolePermission, UserRole},
        user::{issuer, UserAuthentication, UserCredential},
        user_profile::{UserProfile, UserProfileQuery, UserProfileRequest, UserProfileResponse},
    },
};

use super::{authorize, page_limit, path_id};

#[derive(Debug, Deserialize)]
pub struct UserQueryParams {
    pub department: Option<String>,
    pub role: Option<UserRole>,
    pub manager_id: Option<String>,
    pub coach_id: Option<String>,
    pub limit: Option<i64>,
}

#[post("/users/login")]
pub async fn login(payload: web::Json<UserCredential>) -> Result<HttpResponse, ApiError> {
    let response = payload.into_inner().authenticate().await?;
    tracing::info!(user_id = %response.user._id, "user logged in");
    Ok(HttpResponse::Ok().json(response))
}
/// Body errors are reported after the caller checks, so the raw body is
/// decoded here instead of through a `web::Json` extractor.
#[post("/create-user")]
pub async fn create_user(body: web::Bytes, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let issuer: Option<UserAuthentication> = req.extensions().get::<UserAuthentication>().cloned();
    let payload: CreateUserRequest = serde_json::from_slice(&body).unwrap_or_default();

    let profile = AccountProvisioner::new(MongoIdentityStore, MongoProfileStore)
        .create_account(issuer.as_deref(), payload)
        .await?;

    Ok(HttpResponse::Ok().json(CreateUserResponse {
        success: true,
        user: UserProfileResponse::from(&profile),
    }))
}
#[get("/users/me")]
pub async fn get_me(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;

    match UserProfile::find_by_id(&issuer._id).await? {
        Some(profile) => Ok(HttpResponse::Ok().json(UserProfileResponse::from(&profile))),
        None => Err(ApiError::NotFound("USER_NOT_FOUND")),
    }
}
#[get("/users")]
pub async fn get_users(
    query: web::Query<UserQueryParams>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    authorize(&req, RolePermission::GetUsers)?;

    let params = query.into_inner();
    let query = UserProfileQuery {
        department: params.department,
        role: params.role,
        manager_id: parse_optional_id(&params.manager_id)?,
        coach_id: parse_optional_id(&params.coach_id)?,
        limit: page_limit(params.limit)?,
    };

    Ok(HttpResponse::Ok().json(UserProfile::find_many(&query).await?))
}
#[get("/users/{user_id}")]
pub async fn get_user(user_id: web::Path<String>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let user_id = path_id(user_id)?;

    let profile = UserProfile::find_by_id(&user_id)
        .await?
        .ok_or(ApiError::NotFound("USER_NOT_FOUND"))?;

    if profile._id != issuer._id
        && !profile.is_supervised_by(&issuer._id)
        && !issuer.role.validate(&RolePermission::GetUsers)
    {
        return Err(ApiError::Forbidden);
    }

    Ok(HttpResponse::Ok().json(UserProfileResponse::from(&profile)))
}
#[put("/users/{user_id}")]
pub async fn update_user(
    user_id: web::Path<String>,
    payload: web::Json<UserProfileRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = authorize(&req, RolePermission::UpdateUser)?;
    let user_id = path_id(user_id)?;

    let mut profile = UserProfile::find_by_id(&user_id)
        .await?
        .ok_or(ApiError::NotFound("USER_NOT_FOUND"))?;

    profile.apply(payload.into_inner())?;
    profile.update().await?;
    tracing::info!(
        issuer = %issuer._id,
        user_id = %user_id,
        name = %profile.full_name(),
        role = %profile.role,
        "profile updated"
    );

    Ok(HttpResponse::Ok().json(UserProfileResponse::from(&profile)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{UserAuthenticationData, UserAuthenticationMiddlewareFactory};
    use actix_web::{
        dev::Service,
        http::StatusCode,
        test::{call_service, init_service, read_body_json, TestRequest},
        App,
    };
    use mongodb::bson::oid::ObjectId;
    use serde_json::{json, Value};
    use std::rc::Rc;

    fn body() -> Value {
        json!({
            "email": "jeanne.martin@example.com",
            "password": "s3cret-passphrase",
            "userData": {
                "first_name": "Jeanne",
                "last_name": "Martin",
                "role": "employee"
            }
        })
    }

    #[actix_web::test]
    async fn create_user_without_token_is_unauthorized() {
        let app = init_service(
            App::new()
                .wrap(UserAuthenticationMiddlewareFactory)
                .service(create_user),
        )
        .await;

        let req = TestRequest::post()
            .uri("/create-user")
            .set_json(body())
            .to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let error: Value = read_body_json(res).await;
        assert_eq!(error, json!({ "error": "UNAUTHORIZED" }));
    }

    #[actix_web::test]
    async fn create_user_checks_the_caller_before_the_body() {
        let app = init_service(
            App::new()
                .wrap(UserAuthenticationMiddlewareFactory)
                .service(create_user),
        )
        .await;

        let req = TestRequest::post()
            .uri("/create-user")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{ not json")
            .to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let error: Value = read_body_json(res).await;
        assert_eq!(error, json!({ "error": "UNAUTHORIZED" }));
    }

    #[actix_web::test]
    async fn create_user_by_an_employee_is_forbidden() {
        let app = init_service(
            App::new()
                .wrap_fn(|req, srv| {
                    req.extensions_mut()
                        .insert::<UserAuthentication>(Rc::new(UserAuthenticationData {
                            _id: ObjectId::new(),
                            role: UserRole::Employee,
                        }));
                    srv.call(req)
                })
                .service(create_user),
        )
        .await;

        let req = TestRequest::post()
            .uri("/create-user")
            .set_json(body())
            .to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let error: Value = read_body_json(res).await;
        assert_eq!(error, json!({ "error": "FORBIDDEN" }));
    }

    #[actix_web::test]
    async fn user_listing_rejects_a_zero_limit() {
        let app = init_service(
            App::new()
                .wrap_fn(|req, srv| {
                    req.extensions_mut()
                        .insert::<UserAuthentication>(Rc::new(UserAuthenticationData {
                            _id: ObjectId::new(),
                            role: UserRole::Direction,
                        }));
                    srv.call(req)
                })
                .service(get_users),
        )
        .await;

        let req = TestRequest::get().uri("/users?limit=0").to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let error: Value = read_body_json(res).await;
        assert_eq!(error, json!({ "error": "INVALID_LIMIT" }));
    }
}
