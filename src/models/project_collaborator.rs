use crate::{
    database::{get_db, PROJECTS, PROJECT_COLLABORATORS, USER_PROFILES},
    error::ApiError,
};
use chrono::NaiveDate;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, from_document, oid::ObjectId, DateTime, Document},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{parse_id, project::ProjectStatusKind};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectCollaborator {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub project_id: ObjectId,
    pub employee_id: ObjectId,
    pub role: String,
    pub allocation: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
    pub created_at: DateTime,
}
#[derive(Debug, Default)]
pub struct ProjectCollaboratorQuery {
    pub project_id: Option<ObjectId>,
    pub employee_id: Option<ObjectId>,
    pub active: Option<bool>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ProjectCollaboratorRequest {
    pub employee_id: String,
    pub role: String,
    pub allocation: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ProjectCollaboratorResponse {
    pub _id: String,
    pub project_id: String,
    pub project_name: Option<String>,
    pub project_status: Option<ProjectStatusKind>,
    pub employee_id: String,
    pub employee_name: Option<String>,
    pub role: String,
    pub allocation: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
}

impl ProjectCollaboratorRequest {
    pub fn into_collaborator(self, project_id: ObjectId) -> Result<ProjectCollaborator, ApiError> {
        if self.role.trim().is_empty() {
            return Err(ApiError::BadRequest("COLLABORATOR_MUST_HAVE_ROLE"));
        }
        if !(0..=100).contains(&self.allocation) {
            return Err(ApiError::BadRequest("COLLABORATOR_MUST_HAVE_VALID_ALLOCATION"));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ApiError::BadRequest("COLLABORATOR_MUST_HAVE_VALID_PERIOD"));
            }
        }

        Ok(ProjectCollaborator {
            _id: None,
            project_id,
            employee_id: parse_id(&self.employee_id)?,
            role: self.role.trim().to_string(),
            allocation: self.allocation,
            start_date: self.start_date,
            end_date: self.end_date,
            active: true,
            created_at: DateTime::now(),
        })
    }
}

impl ProjectCollaborator {
    pub async fn save(&mut self) -> Result<ObjectId, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<ProjectCollaborator> =
            db.collection::<ProjectCollaborator>(PROJECT_COLLABORATORS);

        let _id = ObjectId::new();
        self._id = Some(_id);

        collection.insert_one(&*self, None).await?;
        Ok(_id)
    }
    pub async fn deactivate(&mut self) -> Result<ObjectId, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<ProjectCollaborator> =
            db.collection::<ProjectCollaborator>(PROJECT_COLLABORATORS);

        let _id = self._id.ok_or(ApiError::NotFound("COLLABORATION_NOT_FOUND"))?;
        if !self.active {
            return Err(ApiError::InvalidTransition("COLLABORATION_ALREADY_INACTIVE"));
        }
        self.active = false;

        collection
            .update_one(doc! { "_id": _id }, doc! { "$set": { "active": false } }, None)
            .await?;
        Ok(_id)
    }
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<ProjectCollaborator>, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<ProjectCollaborator> =
            db.collection::<ProjectCollaborator>(PROJECT_COLLABORATORS);

        Ok(collection.find_one(doc! { "_id": _id }, None).await?)
    }
    pub async fn exists_active(project_id: &ObjectId, employee_id: &ObjectId) -> Result<bool, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<ProjectCollaborator> =
            db.collection::<ProjectCollaborator>(PROJECT_COLLABORATORS);

        let count = collection
            .count_documents(
                doc! { "project_id": project_id, "employee_id": employee_id, "active": true },
                None,
            )
            .await?;
        Ok(count > 0)
    }
    pub async fn find_many(
        query: &ProjectCollaboratorQuery,
    ) -> Result<Vec<ProjectCollaboratorResponse>, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<ProjectCollaborator> =
            db.collection::<ProjectCollaborator>(PROJECT_COLLABORATORS);

        let pipeline: Vec<Document> = vec![
            doc! { "$match": query.filter() },
            doc! {
                "$lookup": {
                    "from": USER_PROFILES,
                    "localField": "employee_id",
                    "foreignField": "_id",
                    "as": "employee",
                }
            },
            doc! { "$unwind": { "path": "$employee", "preserveNullAndEmptyArrays": true } },
            doc! {
                "$lookup": {
                    "from": PROJECTS,
                    "localField": "project_id",
                    "foreignField": "_id",
                    "as": "project",
                }
            },
            doc! { "$unwind": { "path": "$project", "preserveNullAndEmptyArrays": true } },
            doc! { "$sort": { "created_at": -1 } },
            doc! {
                "$project": {
                    "_id": { "$toString": "$_id" },
                    "project_id": { "$toString": "$project_id" },
                    "project_name": "$project.name",
                    "project_status": { "$arrayElemAt": ["$project.status.kind", -1] },
                    "employee_id": { "$toString": "$employee_id" },
                    "employee_name": {
                        "$concat": ["$employee.first_name", " ", "$employee.last_name"]
                    },
                    "role": "$role",
                    "allocation": "$allocation",
                    "start_date": "$start_date",
                    "end_date": "$end_date",
                    "active": "$active",
                }
            },
        ];

        let mut cursor = collection.aggregate(pipeline, None).await?;
        let mut collaborators: Vec<ProjectCollaboratorResponse> = Vec::new();

        while let Some(doc) = cursor.try_next().await? {
            collaborators.push(from_document::<ProjectCollaboratorResponse>(doc)?);
        }

        Ok(collaborators)
    }
}

impl ProjectCollaboratorQuery {
    fn filter(&self) -> Document {
        let mut filter = Document::new();

        if let Some(project_id) = self.project_id {
            filter.insert("project_id", project_id);
        }
        if let Some(employee_id) = self.employee_id {
            filter.insert("employee_id", employee_id);
        }
        if let Some(active) = self.active {
            filter.insert("active", active);
        }

        filter
    }
}
