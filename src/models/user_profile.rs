use crate::{
    database::{get_db, USER_PROFILES},
    error::ApiError,
};
use chrono::NaiveDate;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, from_document, oid::ObjectId, DateTime, Document},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{date_to_string, parse_optional_id, role::UserRole, to_rfc3339};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserProfile {
    pub _id: ObjectId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub department: Option<String>,
    pub position: Option<String>,
    pub manager_id: Option<ObjectId>,
    pub coach_id: Option<ObjectId>,
    pub career_pathway_id: Option<ObjectId>,
    pub career_level_id: Option<ObjectId>,
    pub hire_date: Option<NaiveDate>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
#[derive(Debug, Default)]
pub struct UserProfileQuery {
    pub department: Option<String>,
    pub role: Option<UserRole>,
    pub manager_id: Option<ObjectId>,
    pub coach_id: Option<ObjectId>,
    pub limit: Option<i64>,
}
/// The `userData` part of a user-creation request, also used for updates.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub manager_id: Option<String>,
    pub coach_id: Option<String>,
    pub career_pathway_id: Option<String>,
    pub career_level_id: Option<String>,
    pub hire_date: Option<NaiveDate>,
}
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserProfileResponse {
    pub _id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub department: Option<String>,
    pub position: Option<String>,
    pub manager_id: Option<String>,
    pub coach_id: Option<String>,
    pub career_pathway_id: Option<String>,
    pub career_level_id: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub created_at: String,
    pub updated_at: String,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl UserProfileRequest {
    /// Builds a fresh profile for the identity `_id`, rejecting incomplete payloads.
    pub fn into_profile(self, _id: ObjectId, email: &str) -> Result<UserProfile, ApiError> {
        let first_name =
            non_empty(&self.first_name).ok_or(ApiError::BadRequest("USER_MUST_HAVE_FIRST_NAME"))?;
        let last_name =
            non_empty(&self.last_name).ok_or(ApiError::BadRequest("USER_MUST_HAVE_LAST_NAME"))?;
        let role = self.role.ok_or(ApiError::BadRequest("USER_MUST_HAVE_ROLE"))?;
        let now = DateTime::now();

        Ok(UserProfile {
            _id,
            email: email.to_string(),
            first_name,
            last_name,
            role,
            department: non_empty(&self.department),
            position: non_empty(&self.position),
            manager_id: parse_optional_id(&self.manager_id)?,
            coach_id: parse_optional_id(&self.coach_id)?,
            career_pathway_id: parse_optional_id(&self.career_pathway_id)?,
            career_level_id: parse_optional_id(&self.career_level_id)?,
            hire_date: self.hire_date,
            created_at: now,
            updated_at: now,
        })
    }
}

impl From<&UserProfile> for UserProfileResponse {
    fn from(profile: &UserProfile) -> Self {
        Self {
            _id: profile._id.to_hex(),
            email: profile.email.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            role: profile.role,
            department: profile.department.clone(),
            position: profile.position.clone(),
            manager_id: profile.manager_id.map(|id| id.to_hex()),
            coach_id: profile.coach_id.map(|id| id.to_hex()),
            career_pathway_id: profile.career_pathway_id.map(|id| id.to_hex()),
            career_level_id: profile.career_level_id.map(|id| id.to_hex()),
            hire_date: profile.hire_date,
            created_at: to_rfc3339(&profile.created_at),
            updated_at: to_rfc3339(&profile.updated_at),
        }
    }
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
    pub fn is_supervised_by(&self, _id: &ObjectId) -> bool {
        self.manager_id.as_ref() == Some(_id) || self.coach_id.as_ref() == Some(_id)
    }
    /// Overwrites every editable field; email and creation time are kept.
    pub fn apply(&mut self, payload: UserProfileRequest) -> Result<(), ApiError> {
        let mut updated = payload.into_profile(self._id, &self.email)?;
        updated.created_at = self.created_at;
        *self = updated;
        Ok(())
    }
    pub async fn save(&self) -> Result<ObjectId, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<UserProfile> = db.collection::<UserProfile>(USER_PROFILES);

        collection.insert_one(self, None).await?;
        Ok(self._id)
    }
    pub async fn update(&self) -> Result<ObjectId, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<UserProfile> = db.collection::<UserProfile>(USER_PROFILES);

        collection
            .replace_one(doc! { "_id": self._id }, self, None)
            .await?;
        Ok(self._id)
    }
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<UserProfile>, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<UserProfile> = db.collection::<UserProfile>(USER_PROFILES);

        Ok(collection.find_one(doc! { "_id": _id }, None).await?)
    }
    pub async fn find_many(query: &UserProfileQuery) -> Result<Vec<UserProfileResponse>, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<UserProfile> = db.collection::<UserProfile>(USER_PROFILES);

        let mut pipeline: Vec<Document> = vec![doc! { "$match": query.filter() }];

        pipeline.push(doc! { "$sort": { "last_name": 1, "first_name": 1 } });

        if let Some(limit) = query.limit {
            pipeline.push(doc! { "$limit": limit });
        }

        pipeline.push(doc! {
            "$project": {
                "_id": { "$toString": "$_id" },
                "email": "$email",
                "first_name": "$first_name",
                "last_name": "$last_name",
                "role": "$role",
                "department": "$department",
                "position": "$position",
                "manager_id": { "$toString": "$manager_id" },
                "coach_id": { "$toString": "$coach_id" },
                "career_pathway_id": { "$toString": "$career_pathway_id" },
                "career_level_id": { "$toString": "$career_level_id" },
                "hire_date": "$hire_date",
                "created_at": date_to_string("$created_at"),
                "updated_at": date_to_string("$updated_at"),
            }
        });

        let mut cursor = collection.aggregate(pipeline, None).await?;
        let mut users: Vec<UserProfileResponse> = Vec::new();

        while let Some(doc) = cursor.try_next().await? {
            users.push(from_document::<UserProfileResponse>(doc)?);
        }

        Ok(users)
    }
}

impl UserProfileQuery {
    fn filter(&self) -> Document {
        let mut filter = Document::new();

        if let Some(department) = &self.department {
            filter.insert("department", department);
        }
        if let Some(role) = &self.role {
            filter.insert("role", role.as_str());
        }
        if let Some(manager_id) = &self.manager_id {
            filter.insert("manager_id", manager_id);
        }
        if let Some(coach_id) = &self.coach_id {
            filter.insert("coach_id", coach_id);
        }

        filter
    }
}
