use crate::{
    database::{get_db, is_duplicate_key, ANNUAL_OBJECTIVES},
    error::ApiError,
};
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, to_bson, DateTime, Document},
    options::FindOptions,
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{
    career::{DevelopmentTheme, PathwaySkill},
    objective::{
        check_references, skill_ids, validate_entries, EntryCount, ObjectiveEntry,
        ANNUAL_OBJECTIVE_COUNT,
    },
    parse_id, to_rfc3339,
};

const MIN_YEAR: i32 = 2000;
const MAX_YEAR: i32 = 2100;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnnualObjectiveStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnnualObjective {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub employee_id: ObjectId,
    pub year: i32,
    pub career_pathway_id: ObjectId,
    pub career_level_id: ObjectId,
    pub objectives: Vec<ObjectiveEntry>,
    pub status: AnnualObjectiveStatus,
    pub reviewer_id: Option<ObjectId>,
    pub reviewer_comment: Option<String>,
    pub submitted_at: Option<DateTime>,
    pub reviewed_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
#[derive(Debug, Default)]
pub struct AnnualObjectiveQuery {
    pub employee_id: Option<ObjectId>,
    pub year: Option<i32>,
    pub status: Option<AnnualObjectiveStatus>,
}
#[derive(Debug, Deserialize)]
pub struct AnnualObjectiveRequest {
    pub employee_id: Option<String>,
    pub year: i32,
    pub career_pathway_id: String,
    pub career_level_id: String,
    pub objectives: Vec<ObjectiveEntry>,
    #[serde(default)]
    pub submit: bool,
}
#[derive(Debug, Default, Deserialize)]
pub struct AnnualObjectiveReviewRequest {
    pub comment: Option<String>,
}
#[derive(Debug, Serialize)]
pub struct AnnualObjectiveResponse {
    pub _id: Option<String>,
    pub employee_id: String,
    pub year: i32,
    pub career_pathway_id: String,
    pub career_level_id: String,
    pub objectives: Vec<ObjectiveEntry>,
    pub status: AnnualObjectiveStatus,
    pub reviewer_id: Option<String>,
    pub reviewer_comment: Option<String>,
    pub submitted_at: Option<String>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl AnnualObjectiveRequest {
    pub fn into_annual_objective(self, employee_id: ObjectId) -> Result<AnnualObjective, ApiError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&self.year) {
            return Err(ApiError::BadRequest("ANNUAL_OBJECTIVES_MUST_HAVE_VALID_YEAR"));
        }
        validate_entries(&self.objectives, EntryCount::Exactly(ANNUAL_OBJECTIVE_COUNT))?;

        let now = DateTime::now();
        Ok(AnnualObjective {
            _id: None,
            employee_id,
            year: self.year,
            career_pathway_id: parse_id(&self.career_pathway_id)?,
            career_level_id: parse_id(&self.career_level_id)?,
            objectives: self.objectives,
            status: if self.submit {
                AnnualObjectiveStatus::Submitted
            } else {
                AnnualObjectiveStatus::Draft
            },
            reviewer_id: None,
            reviewer_comment: None,
            submitted_at: self.submit.then_some(now),
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}

impl AnnualObjective {
    pub fn is_editable(&self) -> bool {
        matches!(
            self.status,
            AnnualObjectiveStatus::Draft | AnnualObjectiveStatus::Rejected
        )
    }
    /// Whole overwrite of a draft or rejected set. Owner and year never change.
    pub fn replace(&mut self, request: AnnualObjectiveRequest) -> Result<(), ApiError> {
        if !self.is_editable() {
            return Err(ApiError::InvalidTransition("ANNUAL_OBJECTIVES_LOCKED"));
        }
        if request.year != self.year {
            return Err(ApiError::BadRequest("ANNUAL_OBJECTIVES_YEAR_IS_FIXED"));
        }

        let mut replacement = request.into_annual_objective(self.employee_id)?;
        replacement._id = self._id;
        replacement.created_at = self.created_at;
        *self = replacement;
        Ok(())
    }
    pub fn submit(&mut self) -> Result<(), ApiError> {
        if self.status != AnnualObjectiveStatus::Draft {
            return Err(ApiError::InvalidTransition("ANNUAL_OBJECTIVES_NOT_DRAFT"));
        }
        validate_entries(&self.objectives, EntryCount::Exactly(ANNUAL_OBJECTIVE_COUNT))?;

        let now = DateTime::now();
        self.status = AnnualObjectiveStatus::Submitted;
        self.submitted_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
    pub fn review(
        &mut self,
        reviewer_id: ObjectId,
        approved: bool,
        request: AnnualObjectiveReviewRequest,
    ) -> Result<(), ApiError> {
        if self.status != AnnualObjectiveStatus::Submitted {
            return Err(ApiError::InvalidTransition("ANNUAL_OBJECTIVES_NOT_SUBMITTED"));
        }

        let now = DateTime::now();
        self.status = if approved {
            AnnualObjectiveStatus::Approved
        } else {
            AnnualObjectiveStatus::Rejected
        };
        self.reviewer_id = Some(reviewer_id);
        self.reviewer_comment = request
            .comment
            .map(|comment| comment.trim().to_string())
            .filter(|comment| !comment.is_empty());
        self.reviewed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
    pub fn ensure_deletable(&self) -> Result<(), ApiError> {
        if self.status == AnnualObjectiveStatus::Draft {
            Ok(())
        } else {
            Err(ApiError::InvalidTransition("ANNUAL_OBJECTIVES_NOT_DRAFT"))
        }
    }
    pub fn skill_ids(&self) -> Result<Vec<ObjectId>, ApiError> {
        skill_ids(&self.objectives)
    }
    /// Every referenced skill must exist within the set's pathway and level.
    pub fn check_skills(&self, skills: &[PathwaySkill]) -> Result<(), ApiError> {
        for _id in self.skill_ids()? {
            let known = skills.iter().any(|skill| {
                skill._id == _id && skill.belongs_to(&self.career_pathway_id, &self.career_level_id)
            });
            if !known {
                return Err(ApiError::BadRequest("OBJECTIVE_SKILL_OUTSIDE_PATHWAY"));
            }
        }
        Ok(())
    }
    /// Themes and skills must exist, and skills must sit on the set's pathway and level.
    pub fn check_vocabulary(
        &self,
        skills: &[PathwaySkill],
        themes: &[DevelopmentTheme],
    ) -> Result<(), ApiError> {
        check_references(&self.objectives, skills, themes)?;
        self.check_skills(skills)
    }
    pub async fn save(&mut self) -> Result<ObjectId, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<AnnualObjective> =
            db.collection::<AnnualObjective>(ANNUAL_OBJECTIVES);

        let _id = ObjectId::new();
        self._id = Some(_id);

        match collection.insert_one(&*self, None).await {
            Ok(_) => Ok(_id),
            Err(error) if is_duplicate_key(&error) => {
                Err(ApiError::BadRequest("ANNUAL_OBJECTIVES_ALREADY_EXIST"))
            }
            Err(error) => Err(error.into()),
        }
    }
    pub async fn update(&self) -> Result<ObjectId, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<AnnualObjective> =
            db.collection::<AnnualObjective>(ANNUAL_OBJECTIVES);

        let _id = self._id.ok_or(ApiError::NotFound("ANNUAL_OBJECTIVES_NOT_FOUND"))?;
        collection.replace_one(doc! { "_id": _id }, self, None).await?;
        Ok(_id)
    }
    pub async fn delete(&self) -> Result<u64, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<AnnualObjective> =
            db.collection::<AnnualObjective>(ANNUAL_OBJECTIVES);

        let _id = self._id.ok_or(ApiError::NotFound("ANNUAL_OBJECTIVES_NOT_FOUND"))?;
        Ok(collection
            .delete_one(doc! { "_id": _id, "status": "draft" }, None)
            .await?
            .deleted_count)
    }
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<AnnualObjective>, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<AnnualObjective> =
            db.collection::<AnnualObjective>(ANNUAL_OBJECTIVES);

        Ok(collection.find_one(doc! { "_id": _id }, None).await?)
    }
    pub async fn find_many(query: &AnnualObjectiveQuery) -> Result<Vec<AnnualObjective>, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<AnnualObjective> =
            db.collection::<AnnualObjective>(ANNUAL_OBJECTIVES);
        let options = FindOptions::builder()
            .sort(doc! { "year": -1, "created_at": -1 })
            .build();

        Ok(collection
            .find(query.filter()?, options)
            .await?
            .try_collect()
            .await?)
    }
}

impl AnnualObjectiveQuery {
    fn filter(&self) -> Result<Document, ApiError> {
        let mut filter = Document::new();

        if let Some(employee_id) = self.employee_id {
            filter.insert("employee_id", employee_id);
        }
        if let Some(year) = self.year {
            filter.insert("year", year);
        }
        if let Some(status) = &self.status {
            filter.insert("status", to_bson(status)?);
        }

        Ok(filter)
    }
}

impl From<&AnnualObjective> for AnnualObjectiveResponse {
    fn from(annual: &AnnualObjective) -> Self {
        Self {
            _id: annual._id.map(|id| id.to_hex()),
            employee_id: annual.employee_id.to_hex(),
            year: annual.year,
            career_pathway_id: annual.career_pathway_id.to_hex(),
            career_level_id: annual.career_level_id.to_hex(),
            objectives: annual.objectives.clone(),
            status: annual.status,
            reviewer_id: annual.reviewer_id.map(|id| id.to_hex()),
            reviewer_comment: annual.reviewer_comment.clone(),
            submitted_at: annual.submitted_at.as_ref().map(to_rfc3339),
            reviewed_at: annual.reviewed_at.as_ref().map(to_rfc3339),
            created_at: to_rfc3339(&annual.created_at),
            updated_at: to_rfc3339(&annual.updated_at),
        }
    }
}
