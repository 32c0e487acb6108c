use crate::{
    database::{get_db, PROJECTS},
    error::ApiError,
};
use chrono::NaiveDate;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, from_document, oid::ObjectId, DateTime, Document},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{date_to_string, parse_optional_id};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatusKind {
    Planned,
    InProgress,
    Completed,
    Suspended,
    Cancelled,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Project {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub name: String,
    pub client: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub referent_id: Option<ObjectId>,
    pub status: Vec<ProjectStatus>,
    pub created_at: DateTime,
}
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProjectStatus {
    pub kind: ProjectStatusKind,
    pub time: DateTime,
    pub message: Option<String>,
}
#[derive(Debug, Default)]
pub struct ProjectQuery {
    pub _id: Option<ObjectId>,
    pub referent_id: Option<ObjectId>,
    pub status: Option<ProjectStatusKind>,
    pub limit: Option<i64>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ProjectRequest {
    pub name: String,
    pub client: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub referent_id: Option<String>,
    pub status: Option<ProjectStatusKind>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ProjectStatusRequest {
    pub kind: ProjectStatusKind,
    pub message: Option<String>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ProjectResponse {
    pub _id: String,
    pub name: String,
    pub client: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub referent_id: Option<String>,
    pub status: Vec<ProjectStatusResponse>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct ProjectStatusResponse {
    pub kind: ProjectStatusKind,
    pub time: String,
    pub message: Option<String>,
}

impl ProjectRequest {
    pub fn into_project(self) -> Result<Project, ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::BadRequest("PROJECT_MUST_HAVE_NAME"));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ApiError::BadRequest("PROJECT_MUST_HAVE_VALID_PERIOD"));
            }
        }

        let now = DateTime::now();
        Ok(Project {
            _id: None,
            name: self.name.trim().to_string(),
            client: self.client,
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            referent_id: parse_optional_id(&self.referent_id)?,
            status: vec![ProjectStatus {
                kind: self.status.unwrap_or(ProjectStatusKind::Planned),
                time: now,
                message: None,
            }],
            created_at: now,
        })
    }
}

impl Project {
    pub fn current_status(&self) -> Option<ProjectStatusKind> {
        self.status.last().map(|status| status.kind)
    }
    pub fn is_completed(&self) -> bool {
        self.current_status() == Some(ProjectStatusKind::Completed)
    }
    pub fn is_referent(&self, user_id: &ObjectId) -> bool {
        self.referent_id.as_ref() == Some(user_id)
    }
    /// Appends to the status history; a repeated status is refused.
    pub fn push_status(&mut self, request: ProjectStatusRequest) -> Result<(), ApiError> {
        if self.current_status() == Some(request.kind) {
            return Err(ApiError::InvalidTransition("PROJECT_STATUS_UNCHANGED"));
        }
        if self.current_status() == Some(ProjectStatusKind::Cancelled) {
            return Err(ApiError::InvalidTransition("PROJECT_IS_CANCELLED"));
        }
        self.status.push(ProjectStatus {
            kind: request.kind,
            time: DateTime::now(),
            message: request.message,
        });
        Ok(())
    }
    pub async fn save(&mut self) -> Result<ObjectId, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<Project> = db.collection::<Project>(PROJECTS);

        let _id = ObjectId::new();
        self._id = Some(_id);

        collection.insert_one(&*self, None).await?;
        Ok(_id)
    }
    pub async fn update(&self) -> Result<ObjectId, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<Project> = db.collection::<Project>(PROJECTS);

        let _id = self._id.ok_or(ApiError::NotFound("PROJECT_NOT_FOUND"))?;
        collection.replace_one(doc! { "_id": _id }, self, None).await?;
        Ok(_id)
    }
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<Project>, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<Project> = db.collection::<Project>(PROJECTS);

        Ok(collection.find_one(doc! { "_id": _id }, None).await?)
    }
    pub async fn find_many(query: &ProjectQuery) -> Result<Vec<ProjectResponse>, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<Project> = db.collection::<Project>(PROJECTS);

        let mut pipeline: Vec<Document> = Vec::new();

        pipeline.push(doc! { "$match": query.filter() });

        if let Some(status) = &query.status {
            let status = mongodb::bson::to_bson(status)?;
            pipeline.push(doc! {
                "$match": {
                    "$expr": {
                        "$eq": [{ "$arrayElemAt": ["$status.kind", -1] }, status]
                    }
                }
            });
        }

        pipeline.push(doc! { "$sort": { "created_at": -1 } });

        if let Some(limit) = query.limit {
            pipeline.push(doc! { "$limit": limit });
        }

        pipeline.push(doc! {
            "$project": {
                "_id": { "$toString": "$_id" },
                "name": "$name",
                "client": "$client",
                "description": "$description",
                "start_date": "$start_date",
                "end_date": "$end_date",
                "referent_id": { "$toString": "$referent_id" },
                "status": {
                    "$map": {
                        "input": "$status",
                        "in": {
                            "kind": "$$this.kind",
                            "time": date_to_string("$$this.time"),
                            "message": "$$this.message",
                        }
                    }
                },
            }
        });

        let mut cursor = collection.aggregate(pipeline, None).await?;
        let mut projects: Vec<ProjectResponse> = Vec::new();

        while let Some(doc) = cursor.try_next().await? {
            projects.push(from_document::<ProjectResponse>(doc)?);
        }

        Ok(projects)
    }
}

impl ProjectQuery {
    fn filter(&self) -> Document {
        let mut filter = Document::new();

        if let Some(_id) = self._id {
            filter.insert("_id", _id);
        }
        if let Some(referent_id) = self.referent_id {
            filter.insert("referent_id", referent_id);
        }

        filter
    }
}
