use crate::{
    database::{get_db, EVALUATIONS, PROJECTS, USER_PROFILES},
    error::ApiError,
};
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, from_document, oid::ObjectId, Document},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{
    date_to_string,
    evaluation::{Evaluation, EvaluationStatus},
};

/// Evaluations joined with the evaluated employee and the project.
#[derive(Debug, Deserialize, Serialize)]
pub struct CoachingEvaluation {
    pub evaluation_id: String,
    pub collaboration_id: String,
    pub employee_id: String,
    pub employee_name: Option<String>,
    pub coach_id: Option<String>,
    pub project_id: String,
    pub project_name: Option<String>,
    pub status: EvaluationStatus,
    pub final_score: Option<f64>,
    pub self_submitted_at: Option<String>,
    pub referent_submitted_at: Option<String>,
    pub updated_at: String,
}
#[derive(Debug, Default)]
pub struct CoachingEvaluationQuery {
    pub coach_id: Option<ObjectId>,
    pub employee_id: Option<ObjectId>,
    pub status: Option<EvaluationStatus>,
}

impl CoachingEvaluationQuery {
    fn pipeline(&self) -> Result<Vec<Document>, ApiError> {
        let mut pipeline: Vec<Document> = Vec::new();

        let mut filter = Document::new();
        if let Some(employee_id) = self.employee_id {
            filter.insert("employee_id", employee_id);
        }
        if let Some(status) = &self.status {
            filter.insert("status", mongodb::bson::to_bson(status)?);
        }
        pipeline.push(doc! { "$match": filter });

        pipeline.push(doc! {
            "$lookup": {
                "from": USER_PROFILES,
                "localField": "employee_id",
                "foreignField": "_id",
                "as": "employee",
            }
        });
        pipeline.push(doc! { "$unwind": { "path": "$employee", "preserveNullAndEmptyArrays": true } });

        if let Some(coach_id) = self.coach_id {
            pipeline.push(doc! { "$match": { "employee.coach_id": coach_id } });
        }

        pipeline.push(doc! {
            "$lookup": {
                "from": PROJECTS,
                "localField": "project_id",
                "foreignField": "_id",
                "as": "project",
            }
        });
        pipeline.push(doc! { "$unwind": { "path": "$project", "preserveNullAndEmptyArrays": true } });
        pipeline.push(doc! { "$sort": { "updated_at": -1 } });
        pipeline.push(doc! {
            "$project": {
                "_id": 0,
                "evaluation_id": { "$toString": "$_id" },
                "collaboration_id": { "$toString": "$collaboration_id" },
                "employee_id": { "$toString": "$employee_id" },
                "employee_name": {
                    "$concat": ["$employee.first_name", " ", "$employee.last_name"]
                },
                "coach_id": { "$toString": "$employee.coach_id" },
                "project_id": { "$toString": "$project_id" },
                "project_name": "$project.name",
                "status": "$status",
                "final_score": "$final_score",
                "self_submitted_at": "$self_evaluation.submitted_at",
                "referent_submitted_at": "$referent_evaluation.submitted_at",
                "updated_at": date_to_string("$updated_at"),
            }
        });

        Ok(pipeline)
    }
}

impl CoachingEvaluation {
    pub async fn find_many(query: &CoachingEvaluationQuery) -> Result<Vec<CoachingEvaluation>, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<Evaluation> = db.collection::<Evaluation>(EVALUATIONS);

        let mut cursor = collection.aggregate(query.pipeline()?, None).await?;
        let mut evaluations: Vec<CoachingEvaluation> = Vec::new();

        while let Some(doc) = cursor.try_next().await? {
            evaluations.push(from_document::<CoachingEvaluation>(doc)?);
        }

        Ok(evaluations)
    }
}
