use crate::{
    database::{get_db, is_duplicate_key, AUTH_USERS},
    error::ApiError,
};
use actix_service::{self, Transform};
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse},
    Error, HttpMessage, HttpRequest,
};
use chrono::Utc;
use futures::{
    future::{ready, LocalBoxFuture, Ready},
    FutureExt,
};
use jsonwebtoken::{self, decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    Collection, Database,
};
use pwhash::bcrypt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fs::read_to_string, rc::Rc, sync::OnceLock};

use super::{
    role::UserRole,
    user_profile::{UserProfile, UserProfileResponse},
};

const ISSUER: &str = "career-review";
const AUDIENCE: &str = "career-review-api";
const TOKEN_TTL_SECONDS: i64 = 86400;

static KEYS: OnceLock<AccessKeys> = OnceLock::new();
static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

struct AccessKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

#[derive(Debug, Serialize, Deserialize)]
struct UserClaims {
    aud: String,
    exp: i64,
    iss: String,
    sub: String,
}

/// A login identity. The profile row shares its `_id`.
#[derive(Deserialize, Serialize)]
pub struct AuthIdentity {
    pub _id: ObjectId,
    pub email: String,
    pub password: String,
    pub created_at: DateTime,
}
#[derive(Deserialize, Serialize)]
pub struct UserCredential {
    pub email: String,
    pub password: String,
}
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfileResponse,
}
#[derive(Debug)]
pub struct UserAuthenticationData {
    pub _id: ObjectId,
    pub role: UserRole,
}
pub struct UserAuthenticationMiddleware<S> {
    service: Rc<S>,
}
pub struct UserAuthenticationMiddlewareFactory;

pub type UserAuthentication = Rc<UserAuthenticationData>;

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX
        .get_or_init(|| {
            Regex::new(
                r"^([a-z0-9_+\-]([a-z0-9_+.\-]*[a-z0-9_+\-])?)@([a-z0-9]+([\-\.]{1}[a-z0-9]+)*\.[a-z]{2,})$",
            )
            .expect("email pattern is valid")
        })
        .is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The authenticated caller attached by [`UserAuthenticationMiddleware`], if any.
pub fn issuer(req: &HttpRequest) -> Result<UserAuthentication, ApiError> {
    req.extensions()
        .get::<UserAuthentication>()
        .cloned()
        .ok_or(ApiError::Unauthorized)
}

impl AuthIdentity {
    pub fn new(_id: ObjectId, email: &str, password: &str) -> Result<Self, ApiError> {
        let password =
            bcrypt::hash(password).map_err(|_| ApiError::Internal("HASHING_FAILED"))?;

        Ok(Self {
            _id,
            email: email.to_string(),
            password,
            created_at: DateTime::now(),
        })
    }
    pub async fn save(&self) -> Result<ObjectId, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<AuthIdentity> = db.collection::<AuthIdentity>(AUTH_USERS);

        match collection.insert_one(self, None).await {
            Ok(_) => Ok(self._id),
            Err(error) if is_duplicate_key(&error) => {
                Err(ApiError::BadRequest("USER_ALREADY_EXIST"))
            }
            Err(error) => Err(error.into()),
        }
    }
    pub async fn delete_by_id(_id: &ObjectId) -> Result<u64, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<AuthIdentity> = db.collection::<AuthIdentity>(AUTH_USERS);

        Ok(collection
            .delete_one(doc! { "_id": _id }, None)
            .await?
            .deleted_count)
    }
    pub async fn find_by_email(email: &str) -> Result<Option<AuthIdentity>, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<AuthIdentity> = db.collection::<AuthIdentity>(AUTH_USERS);

        Ok(collection.find_one(doc! { "email": email }, None).await?)
    }
}

impl UserCredential {
    pub async fn authenticate(&self) -> Result<LoginResponse, ApiError> {
        let email = normalize_email(&self.email);
        let identity = match AuthIdentity::find_by_email(&email).await? {
            Some(identity) if bcrypt::verify(&self.password, &identity.password) => identity,
            _ => return Err(ApiError::BadRequest("INVALID_COMBINATION")),
        };
        let profile = UserProfile::find_by_id(&identity._id)
            .await?
            .ok_or(ApiError::NotFound("USER_NOT_FOUND"))?;

        Ok(LoginResponse {
            token: Self::issue(&identity._id)?,
            user: UserProfileResponse::from(&profile),
        })
    }
    fn issue(_id: &ObjectId) -> Result<String, ApiError> {
        let keys = KEYS.get().ok_or(ApiError::Internal("KEYS_NOT_LOADED"))?;
        let claims: UserClaims = UserClaims {
            sub: _id.to_hex(),
            exp: Utc::now().timestamp() + TOKEN_TTL_SECONDS,
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
        };

        encode(&Header::new(Algorithm::RS256), &claims, &keys.encoding)
            .map_err(|_| ApiError::Internal("GENERATING_FAILED"))
    }
    pub fn verify(token: &str) -> Option<ObjectId> {
        let keys = KEYS.get()?;
        let mut validation: Validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[AUDIENCE]);
        validation.set_issuer(&[ISSUER]);

        let data = decode::<UserClaims>(token, &keys.decoding, &validation).ok()?;
        ObjectId::parse_str(&data.claims.sub).ok()
    }
}

impl<S, B> Service<ServiceRequest> for UserAuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_service::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv: Rc<S> = self.service.clone();

        async move {
            let token = req
                .headers()
                .get("Authorization")
                .and_then(|value| value.to_str().ok())
                .and_then(bearer_token)
                .map(str::to_string);

            if let Some(token) = token {
                match UserCredential::verify(&token) {
                    Some(_id) => match UserProfile::find_by_id(&_id).await {
                        Ok(Some(profile)) => {
                            let auth_data: UserAuthenticationData = UserAuthenticationData {
                                _id,
                                role: profile.role,
                            };
                            req.extensions_mut()
                                .insert::<UserAuthentication>(Rc::new(auth_data));
                        }
                        Ok(None) => tracing::debug!(user_id = %_id, "token subject has no profile"),
                        Err(error) => tracing::warn!(%error, "failed to load caller profile"),
                    },
                    None => tracing::debug!("rejected bearer token"),
                }
            }

            let res: ServiceResponse<B> = srv.call(req).await?;
            Ok(res)
        }
        .boxed_local()
    }
}
impl<S, B> Transform<S, ServiceRequest> for UserAuthenticationMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = UserAuthenticationMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(UserAuthenticationMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub fn load_keys(private_path: &str, public_path: &str) -> Result<(), ApiError> {
    let private_access_file = read_to_string(private_path)
        .map_err(|_| ApiError::Internal("LOAD_FAILED_PRIVATE_ACCESS"))?;
    let public_access_file = read_to_string(public_path)
        .map_err(|_| ApiError::Internal("LOAD_FAILED_PUBLIC_ACCESS"))?;

    let keys = AccessKeys {
        encoding: EncodingKey::from_rsa_pem(private_access_file.as_bytes())
            .map_err(|_| ApiError::Internal("INVALID_PRIVATE_ACCESS"))?,
        decoding: DecodingKey::from_rsa_pem(public_access_file.as_bytes())
            .map_err(|_| ApiError::Internal("INVALID_PUBLIC_ACCESS"))?,
    };

    if KEYS.set(keys).is_err() {
        tracing::warn!("access keys were already loaded");
    }
    Ok(())
}
