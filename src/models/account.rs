//! Administrative account creation: one auth identity plus one profile row,
//! with the identity removed again when the profile cannot be written.

use std::future::Future;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

use super::{
    role::RolePermission,
    user::{is_valid_email, normalize_email, AuthIdentity, UserAuthenticationData},
    user_profile::{UserProfile, UserProfileRequest, UserProfileResponse},
};

const MIN_PASSWORD_LENGTH: usize = 8;

/// Never derive `Debug` here, the password must not end up in logs.
#[derive(Default, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "userData")]
    pub user_data: Option<UserProfileRequest>,
}
#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub success: bool,
    pub user: UserProfileResponse,
}

pub trait IdentityStore {
    fn email_exists(&self, email: &str) -> impl Future<Output = Result<bool, ApiError>>;
    fn create_identity(
        &self,
        _id: ObjectId,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<ObjectId, ApiError>>;
    /// Deleting an identity that is already gone is not an error.
    fn delete_identity(&self, _id: &ObjectId) -> impl Future<Output = Result<(), ApiError>>;
}

pub trait ProfileStore {
    fn create_profile(&self, profile: &UserProfile) -> impl Future<Output = Result<(), ApiError>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MongoIdentityStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct MongoProfileStore;

impl IdentityStore for MongoIdentityStore {
    async fn email_exists(&self, email: &str) -> Result<bool, ApiError> {
        Ok(AuthIdentity::find_by_email(email).await?.is_some())
    }
    async fn create_identity(
        &self,
        _id: ObjectId,
        email: &str,
        password: &str,
    ) -> Result<ObjectId, ApiError> {
        AuthIdentity::new(_id, email, password)?.save().await
    }
    async fn delete_identity(&self, _id: &ObjectId) -> Result<(), ApiError> {
        AuthIdentity::delete_by_id(_id).await.map(|_| ())
    }
}

impl ProfileStore for MongoProfileStore {
    async fn create_profile(&self, profile: &UserProfile) -> Result<(), ApiError> {
        profile.save().await.map(|_| ())
    }
}

pub struct AccountProvisioner<I, P>
where
    I: IdentityStore,
    P: ProfileStore,
{
    identities: I,
    profiles: P,
}

impl<I, P> AccountProvisioner<I, P>
where
    I: IdentityStore,
    P: ProfileStore,
{
    pub fn new(identities: I, profiles: P) -> Self {
        Self {
            identities,
            profiles,
        }
    }

    pub async fn create_account(
        &self,
        issuer: Option<&UserAuthenticationData>,
        payload: CreateUserRequest,
    ) -> Result<UserProfile, ApiError> {
        let issuer = issuer.ok_or(ApiError::Unauthorized)?;
        if !issuer.role.validate(&RolePermission::CreateUser) {
            tracing::warn!(issuer = %issuer._id, role = %issuer.role, "user creation refused");
            return Err(ApiError::Forbidden);
        }

        let (email, password, user_data) =
            match (payload.email, payload.password, payload.user_data) {
                (Some(email), Some(password), Some(user_data)) => {
                    (normalize_email(&email), password, user_data)
                }
                _ => return Err(ApiError::BadRequest("MISSING_REQUIRED_FIELDS")),
            };
        if !is_valid_email(&email) {
            return Err(ApiError::BadRequest("USER_MUST_HAVE_VALID_EMAIL"));
        }
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(ApiError::BadRequest("USER_MUST_HAVE_VALID_PASSWORD"));
        }

        let _id = ObjectId::new();
        let profile = user_data.into_profile(_id, &email)?;

        if self.identities.email_exists(&email).await? {
            return Err(ApiError::BadRequest("USER_ALREADY_EXIST"));
        }

        self.identities.create_identity(_id, &email, &password).await?;

        if let Err(error) = self.profiles.create_profile(&profile).await {
            tracing::error!(user_id = %_id, %error, "profile creation failed, removing identity");
            if let Err(cleanup) = self.identities.delete_identity(&_id).await {
                tracing::error!(user_id = %_id, error = %cleanup, "identity cleanup failed");
            }
            return Err(ApiError::Internal("PROFILE_CREATION_FAILED"));
        }

        tracing::info!(user_id = %_id, role = %profile.role, issuer = %issuer._id, "user created");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::UserRole;
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    #[derive(Clone, Default)]
    struct FakeIdentityStore {
        identities: Arc<Mutex<HashMap<ObjectId, String>>>,
        writes: Arc<Mutex<usize>>,
    }

    impl FakeIdentityStore {
        fn with_email(email: &str) -> Self {
            let store = Self::default();
            store
                .identities
                .lock()
                .unwrap()
                .insert(ObjectId::new(), email.to_string());
            store
        }
        fn writes(&self) -> usize {
            *self.writes.lock().unwrap()
        }
        fn count(&self) -> usize {
            self.identities.lock().unwrap().len()
        }
    }

    impl IdentityStore for FakeIdentityStore {
        async fn email_exists(&self, email: &str) -> Result<bool, ApiError> {
            Ok(self.identities.lock().unwrap().values().any(|e| e == email))
        }
        async fn create_identity(
            &self,
            _id: ObjectId,
            email: &str,
            _password: &str,
        ) -> Result<ObjectId, ApiError> {
            *self.writes.lock().unwrap() += 1;
            self.identities
                .lock()
                .unwrap()
                .insert(_id, email.to_string());
            Ok(_id)
        }
        async fn delete_identity(&self, _id: &ObjectId) -> Result<(), ApiError> {
            *self.writes.lock().unwrap() += 1;
            self.identities.lock().unwrap().remove(_id);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct FakeProfileStore {
        profiles: Arc<Mutex<Vec<UserProfile>>>,
        fail: bool,
    }

    impl FakeProfileStore {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }
        fn count(&self) -> usize {
            self.profiles.lock().unwrap().len()
        }
    }

    impl ProfileStore for FakeProfileStore {
        async fn create_profile(&self, profile: &UserProfile) -> Result<(), ApiError> {
            if self.fail {
                return Err(ApiError::Internal("INSERTING_FAILED"));
            }
            self.profiles.lock().unwrap().push(profile.clone());
            Ok(())
        }
    }

    fn caller(role: UserRole) -> UserAuthenticationData {
        UserAuthenticationData {
            _id: ObjectId::new(),
            role,
        }
    }

    fn payload(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: Some(email.to_string()),
            password: Some(String::from("correct-horse")),
            user_data: Some(UserProfileRequest {
                first_name: Some(String::from("Jeanne")),
                last_name: Some(String::from("Martin")),
                role: Some(UserRole::Employee),
                department: Some(String::from("Consulting")),
                ..Default::default()
            }),
        }
    }

    #[actix_web::test]
    async fn creates_identity_and_profile_with_shared_id() {
        let identities = FakeIdentityStore::default();
        let profiles = FakeProfileStore::default();
        let provisioner = AccountProvisioner::new(identities.clone(), profiles.clone());

        let profile = provisioner
            .create_account(
                Some(&caller(UserRole::Admin)),
                payload("Jeanne.Martin@Example.com"),
            )
            .await
            .unwrap();

        assert_eq!(profile.email, "jeanne.martin@example.com");
        assert_eq!(profiles.count(), 1);
        assert!(identities
            .identities
            .lock()
            .unwrap()
            .contains_key(&profile._id));
    }

    #[actix_web::test]
    async fn missing_caller_is_unauthorized() {
        let identities = FakeIdentityStore::default();
        let provisioner = AccountProvisioner::new(identities.clone(), FakeProfileStore::default());

        let result = provisioner
            .create_account(None, payload("jeanne@example.com"))
            .await;

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(identities.writes(), 0);
    }

    #[actix_web::test]
    async fn roles_outside_direction_and_admin_are_forbidden_without_writes() {
        for role in [
            UserRole::Employee,
            UserRole::ProjectReferent,
            UserRole::HrCoach,
        ] {
            let identities = FakeIdentityStore::default();
            let profiles = FakeProfileStore::default();
            let provisioner = AccountProvisioner::new(identities.clone(), profiles.clone());

            let result = provisioner
                .create_account(Some(&caller(role)), payload("jeanne@example.com"))
                .await;

            assert!(matches!(result, Err(ApiError::Forbidden)), "{role}");
            assert_eq!(identities.writes(), 0);
            assert_eq!(profiles.count(), 0);
        }
    }

    #[actix_web::test]
    async fn invalid_bodies_are_rejected_before_any_write() {
        let identities = FakeIdentityStore::default();
        let provisioner = AccountProvisioner::new(identities.clone(), FakeProfileStore::default());
        let direction = caller(UserRole::Direction);

        let result = provisioner
            .create_account(Some(&direction), payload("not-an-email"))
            .await;
        assert!(matches!(
            result,
            Err(ApiError::BadRequest("USER_MUST_HAVE_VALID_EMAIL"))
        ));

        let mut short = payload("jeanne@example.com");
        short.password = Some(String::from("short"));
        let result = provisioner.create_account(Some(&direction), short).await;
        assert!(matches!(
            result,
            Err(ApiError::BadRequest("USER_MUST_HAVE_VALID_PASSWORD"))
        ));

        let mut incomplete = payload("jeanne@example.com");
        incomplete.user_data = None;
        let result = provisioner.create_account(Some(&direction), incomplete).await;
        assert!(matches!(
            result,
            Err(ApiError::BadRequest("MISSING_REQUIRED_FIELDS"))
        ));

        assert_eq!(identities.writes(), 0);
    }

    #[actix_web::test]
    async fn duplicate_email_is_rejected() {
        let identities = FakeIdentityStore::with_email("jeanne@example.com");
        let profiles = FakeProfileStore::default();
        let provisioner = AccountProvisioner::new(identities.clone(), profiles.clone());

        let result = provisioner
            .create_account(Some(&caller(UserRole::Admin)), payload("JEANNE@example.com"))
            .await;

        assert!(matches!(
            result,
            Err(ApiError::BadRequest("USER_ALREADY_EXIST"))
        ));
        assert_eq!(identities.writes(), 0);
        assert_eq!(profiles.count(), 0);
    }

    #[actix_web::test]
    async fn profile_failure_removes_the_identity() {
        let identities = FakeIdentityStore::default();
        let provisioner = AccountProvisioner::new(identities.clone(), FakeProfileStore::failing());

        let result = provisioner
            .create_account(Some(&caller(UserRole::Admin)), payload("jeanne@example.com"))
            .await;

        assert!(matches!(
            result,
            Err(ApiError::Internal("PROFILE_CREATION_FAILED"))
        ));
        assert_eq!(identities.count(), 0);
        assert_eq!(identities.writes(), 2);
    }

    /// Loses the identity before failing, as when another cleanup got there first.
    struct VanishingProfileStore {
        identities: FakeIdentityStore,
    }

    impl ProfileStore for VanishingProfileStore {
        async fn create_profile(&self, profile: &UserProfile) -> Result<(), ApiError> {
            self.identities.identities.lock().unwrap().remove(&profile._id);
            Err(ApiError::Internal("INSERTING_FAILED"))
        }
    }

    #[actix_web::test]
    async fn cleanup_of_an_absent_identity_still_reports_the_profile_failure() {
        let identities = FakeIdentityStore::default();
        let profiles = VanishingProfileStore {
            identities: identities.clone(),
        };
        let provisioner = AccountProvisioner::new(identities.clone(), profiles);

        let result = provisioner
            .create_account(Some(&caller(UserRole::Direction)), payload("jeanne@example.com"))
            .await;

        assert!(matches!(
            result,
            Err(ApiError::Internal("PROFILE_CREATION_FAILED"))
        ));
        assert_eq!(identities.count(), 0);
        assert_eq!(identities.writes(), 2);
    }

    #[actix_web::test]
    async fn deleting_an_identity_twice_is_not_an_error() {
        let identities = FakeIdentityStore::with_email("jeanne@example.com");
        let _id = *identities.identities.lock().unwrap().keys().next().unwrap();

        assert!(identities.delete_identity(&_id).await.is_ok());
        assert!(identities.delete_identity(&_id).await.is_ok());
        assert!(identities.delete_identity(&ObjectId::new()).await.is_ok());
        assert_eq!(identities.count(), 0);
    }
}
