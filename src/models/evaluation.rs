//! Two-sided evaluation of a project collaboration.
//!
//! A collaboration moves through `no_objectives → objectives_defined →
//! self_evaluated → referent_evaluated → finalized`. The stage is never stored
//! on its own: it is derived from the objectives record and from which
//! payloads of the evaluation record are present. Every transition here is a
//! pure function over the fetched records; the routes persist the result.

use crate::{
    database::{get_db, is_duplicate_key, EVALUATIONS},
    error::ApiError,
};
use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{
    objective::{
        validate_entries, CollaborationObjectives, CollaborationObjectivesResponse, EntryCount,
        ObjectiveEntry, MAX_COLLABORATION_OBJECTIVES,
    },
    project::Project,
    project_collaborator::ProjectCollaborator,
    to_rfc3339,
};

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 5;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStage {
    NoObjectives,
    ObjectivesDefined,
    SelfEvaluated,
    ReferentEvaluated,
    Finalized,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    SelfEvaluated,
    ReferentEvaluated,
    Finalized,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ObjectiveScore {
    pub objective_index: i32,
    pub score: i32,
    pub comment: Option<String>,
}
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SelfEvaluation {
    pub scores: Vec<ObjectiveScore>,
    pub strengths: Option<String>,
    pub improvements: Option<String>,
    pub learnings: Option<String>,
    pub submitted_at: ChronoDateTime<Utc>,
}
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReferentEvaluation {
    pub scores: Vec<ObjectiveScore>,
    pub overall_comment: Option<String>,
    pub recommendations: Option<String>,
    pub referent_id: String,
    pub submitted_at: ChronoDateTime<Utc>,
}
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Evaluation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub objectives_id: ObjectId,
    pub collaboration_id: ObjectId,
    pub project_id: ObjectId,
    pub employee_id: ObjectId,
    pub self_evaluation: Option<SelfEvaluation>,
    pub referent_evaluation: Option<ReferentEvaluation>,
    pub status: EvaluationStatus,
    pub final_score: Option<f64>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
#[derive(Debug, Deserialize)]
pub struct SelfEvaluationRequest {
    pub scores: Vec<ObjectiveScore>,
    pub strengths: Option<String>,
    pub improvements: Option<String>,
    pub learnings: Option<String>,
}
#[derive(Debug, Deserialize)]
pub struct ReferentEvaluationRequest {
    pub scores: Vec<ObjectiveScore>,
    pub overall_comment: Option<String>,
    pub recommendations: Option<String>,
}
#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub _id: Option<String>,
    pub objectives_id: String,
    pub collaboration_id: String,
    pub project_id: String,
    pub employee_id: String,
    pub self_evaluation: Option<SelfEvaluation>,
    pub referent_evaluation: Option<ReferentEvaluation>,
    pub status: EvaluationStatus,
    pub final_score: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}
#[derive(Debug, Serialize)]
pub struct EvaluationStageResponse {
    pub stage: EvaluationStage,
    pub objectives: Option<CollaborationObjectivesResponse>,
    pub evaluation: Option<EvaluationResponse>,
}

pub fn stage(
    objectives: Option<&CollaborationObjectives>,
    evaluation: Option<&Evaluation>,
) -> EvaluationStage {
    match (objectives, evaluation) {
        (None, _) => EvaluationStage::NoObjectives,
        (Some(_), None) => EvaluationStage::ObjectivesDefined,
        (Some(_), Some(evaluation)) => match evaluation.status {
            EvaluationStatus::Finalized => EvaluationStage::Finalized,
            _ if evaluation.referent_evaluation.is_some() => EvaluationStage::ReferentEvaluated,
            _ if evaluation.self_evaluation.is_some() => EvaluationStage::SelfEvaluated,
            _ => EvaluationStage::ObjectivesDefined,
        },
    }
}

/// Checks one score per objective, each within `MIN_SCORE..=MAX_SCORE`.
fn validate_scores(scores: &[ObjectiveScore], objective_count: usize) -> Result<(), ApiError> {
    if scores
        .iter()
        .any(|entry| !(MIN_SCORE..=MAX_SCORE).contains(&entry.score))
    {
        return Err(ApiError::BadRequest("EVALUATION_SCORE_OUT_OF_RANGE"));
    }

    let mut seen = vec![false; objective_count];
    for entry in scores {
        let slot = usize::try_from(entry.objective_index)
            .ok()
            .and_then(|index| seen.get_mut(index))
            .ok_or(ApiError::BadRequest("EVALUATION_UNKNOWN_OBJECTIVE"))?;
        if *slot {
            return Err(ApiError::BadRequest("EVALUATION_DUPLICATE_OBJECTIVE"));
        }
        *slot = true;
    }

    if seen.iter().all(|scored| *scored) {
        Ok(())
    } else {
        Err(ApiError::BadRequest("EVALUATION_MUST_SCORE_EVERY_OBJECTIVE"))
    }
}

/// `no_objectives → objectives_defined`, or an in-place rewrite while no
/// self-evaluation exists.
pub fn define_objectives(
    current: Option<CollaborationObjectives>,
    evaluation: Option<&Evaluation>,
    collaboration_id: ObjectId,
    entries: Vec<ObjectiveEntry>,
) -> Result<CollaborationObjectives, ApiError> {
    if stage(current.as_ref(), evaluation) > EvaluationStage::ObjectivesDefined {
        return Err(ApiError::InvalidTransition("OBJECTIVES_LOCKED"));
    }
    validate_entries(&entries, EntryCount::UpTo(MAX_COLLABORATION_OBJECTIVES))?;

    Ok(match current {
        Some(mut objectives) => {
            objectives.objectives = entries;
            objectives.updated_at = DateTime::now();
            objectives
        }
        None => CollaborationObjectives::new(collaboration_id, entries),
    })
}

/// `objectives_defined → self_evaluated`. Creates the evaluation record on
/// first submission and overwrites the self payload until a referent has
/// answered.
pub fn submit_self_evaluation(
    objectives: Option<&CollaborationObjectives>,
    collaborator: &ProjectCollaborator,
    project: &Project,
    current: Option<Evaluation>,
    request: SelfEvaluationRequest,
) -> Result<Evaluation, ApiError> {
    let objectives = objectives.ok_or(ApiError::InvalidTransition("OBJECTIVES_NOT_DEFINED"))?;
    let objectives_id = objectives
        ._id
        .ok_or(ApiError::InvalidTransition("OBJECTIVES_NOT_DEFINED"))?;

    match stage(Some(objectives), current.as_ref()) {
        EvaluationStage::ObjectivesDefined | EvaluationStage::SelfEvaluated => (),
        EvaluationStage::Finalized => {
            return Err(ApiError::InvalidTransition("EVALUATION_ALREADY_FINALIZED"))
        }
        _ => return Err(ApiError::InvalidTransition("SELF_EVALUATION_LOCKED")),
    }
    if !project.is_completed() {
        return Err(ApiError::InvalidTransition("PROJECT_NOT_COMPLETED"));
    }
    validate_scores(&request.scores, objectives.objectives.len())?;

    let payload = SelfEvaluation {
        scores: request.scores,
        strengths: request.strengths,
        improvements: request.improvements,
        learnings: request.learnings,
        submitted_at: Utc::now(),
    };
    let now = DateTime::now();

    Ok(match current {
        Some(mut evaluation) => {
            evaluation.self_evaluation = Some(payload);
            evaluation.status = EvaluationStatus::SelfEvaluated;
            evaluation.updated_at = now;
            evaluation
        }
        None => Evaluation {
            _id: None,
            objectives_id,
            collaboration_id: objectives.collaboration_id,
            project_id: collaborator.project_id,
            employee_id: collaborator.employee_id,
            self_evaluation: Some(payload),
            referent_evaluation: None,
            status: EvaluationStatus::SelfEvaluated,
            final_score: None,
            created_at: now,
            updated_at: now,
        },
    })
}

/// `self_evaluated → referent_evaluated`. Every referent entry must match a
/// self entry for the same objective.
pub fn submit_referent_evaluation(
    objectives: Option<&CollaborationObjectives>,
    current: Option<Evaluation>,
    referent_id: &ObjectId,
    request: ReferentEvaluationRequest,
) -> Result<Evaluation, ApiError> {
    let objectives = objectives.ok_or(ApiError::InvalidTransition("OBJECTIVES_NOT_DEFINED"))?;
    let mut evaluation = match stage(Some(objectives), current.as_ref()) {
        EvaluationStage::SelfEvaluated | EvaluationStage::ReferentEvaluated => {
            current.ok_or(ApiError::InvalidTransition("SELF_EVALUATION_REQUIRED"))?
        }
        EvaluationStage::Finalized => {
            return Err(ApiError::InvalidTransition("EVALUATION_ALREADY_FINALIZED"))
        }
        _ => return Err(ApiError::InvalidTransition("SELF_EVALUATION_REQUIRED")),
    };

    let self_scores = evaluation
        .self_evaluation
        .as_ref()
        .map(|payload| payload.scores.as_slice())
        .ok_or(ApiError::InvalidTransition("SELF_EVALUATION_REQUIRED"))?;
    if request.scores.iter().any(|entry| {
        !self_scores
            .iter()
            .any(|own| own.objective_index == entry.objective_index)
    }) {
        return Err(ApiError::BadRequest("SELF_EVALUATION_ENTRY_MISSING"));
    }
    validate_scores(&request.scores, objectives.objectives.len())?;

    evaluation.referent_evaluation = Some(ReferentEvaluation {
        scores: request.scores,
        overall_comment: request.overall_comment,
        recommendations: request.recommendations,
        referent_id: referent_id.to_hex(),
        submitted_at: Utc::now(),
    });
    evaluation.status = EvaluationStatus::ReferentEvaluated;
    evaluation.updated_at = DateTime::now();

    Ok(evaluation)
}

/// `referent_evaluated → finalized`; freezes the record and stores the score.
pub fn finalize(current: Option<Evaluation>) -> Result<Evaluation, ApiError> {
    let mut evaluation = current.ok_or(ApiError::InvalidTransition("SELF_EVALUATION_REQUIRED"))?;

    if evaluation.status == EvaluationStatus::Finalized {
        return Err(ApiError::InvalidTransition("EVALUATION_ALREADY_FINALIZED"));
    }
    let (own, referent) = match (&evaluation.self_evaluation, &evaluation.referent_evaluation) {
        (Some(own), Some(referent)) => (own, referent),
        (None, _) => return Err(ApiError::InvalidTransition("SELF_EVALUATION_REQUIRED")),
        (_, None) => return Err(ApiError::InvalidTransition("REFERENT_EVALUATION_REQUIRED")),
    };

    evaluation.final_score = final_score(&own.scores, &referent.scores);
    evaluation.status = EvaluationStatus::Finalized;
    evaluation.updated_at = DateTime::now();

    Ok(evaluation)
}

/// Mean over objectives of the average of both scores, two decimals.
pub fn final_score(own: &[ObjectiveScore], referent: &[ObjectiveScore]) -> Option<f64> {
    let pairs: Vec<f64> = own
        .iter()
        .filter_map(|mine| {
            referent
                .iter()
                .find(|theirs| theirs.objective_index == mine.objective_index)
                .map(|theirs| f64::from(mine.score + theirs.score) / 2.0)
        })
        .collect();

    if pairs.is_empty() {
        return None;
    }
    let mean = pairs.iter().sum::<f64>() / pairs.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

impl Evaluation {
    /// Inserts on first write, replaces the whole record afterwards.
    pub async fn persist(&mut self) -> Result<ObjectId, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<Evaluation> = db.collection::<Evaluation>(EVALUATIONS);

        match self._id {
            Some(_id) => {
                collection.replace_one(doc! { "_id": _id }, &*self, None).await?;
                Ok(_id)
            }
            None => {
                let _id = ObjectId::new();
                self._id = Some(_id);
                match collection.insert_one(&*self, None).await {
                    Ok(_) => Ok(_id),
                    Err(error) if is_duplicate_key(&error) => {
                        Err(ApiError::InvalidTransition("EVALUATION_ALREADY_STARTED"))
                    }
                    Err(error) => Err(error.into()),
                }
            }
        }
    }
    pub async fn find_by_collaboration(
        collaboration_id: &ObjectId,
    ) -> Result<Option<Evaluation>, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<Evaluation> = db.collection::<Evaluation>(EVALUATIONS);

        Ok(collection
            .find_one(doc! { "collaboration_id": collaboration_id }, None)
            .await?)
    }
}

impl From<&Evaluation> for EvaluationResponse {
    fn from(evaluation: &Evaluation) -> Self {
        Self {
            _id: evaluation._id.map(|id| id.to_hex()),
            objectives_id: evaluation.objectives_id.to_hex(),
            collaboration_id: evaluation.collaboration_id.to_hex(),
            project_id: evaluation.project_id.to_hex(),
            employee_id: evaluation.employee_id.to_hex(),
            self_evaluation: evaluation.self_evaluation.clone(),
            referent_evaluation: evaluation.referent_evaluation.clone(),
            status: evaluation.status,
            final_score: evaluation.final_score,
            created_at: to_rfc3339(&evaluation.created_at),
            updated_at: to_rfc3339(&evaluation.updated_at),
        }
    }
}

impl EvaluationStageResponse {
    pub fn new(objectives: Option<&CollaborationObjectives>, evaluation: Option<&Evaluation>) -> Self {
        Self {
            stage: stage(objectives, evaluation),
            objectives: objectives.map(CollaborationObjectivesResponse::from),
            evaluation: evaluation.map(EvaluationResponse::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        objective::tests::{formation_entry, skill_entry},
        project::{tests::project, ProjectStatusKind},
        project_collaborator::tests::collaborator,
    };

    struct Fixture {
        objectives: CollaborationObjectives,
        collaborator: ProjectCollaborator,
        project: Project,
        referent: ObjectId,
    }

    fn fixture(status: ProjectStatusKind) -> Fixture {
        let referent = ObjectId::new();
        let project = project(status, Some(referent));
        let collaborator = collaborator(project._id.unwrap(), ObjectId::new());
        let mut objectives = define_objectives(
            None,
            None,
            collaborator._id.unwrap(),
            vec![skill_entry(), formation_entry("Kubernetes training")],
        )
        .unwrap();
        objectives._id = Some(ObjectId::new());

        Fixture {
            objectives,
            collaborator,
            project,
            referent,
        }
    }

    fn score(objective_index: i32, score: i32) -> ObjectiveScore {
        ObjectiveScore {
            objective_index,
            score,
            comment: None,
        }
    }

    fn self_request(scores: Vec<ObjectiveScore>) -> SelfEvaluationRequest {
        SelfEvaluationRequest {
            scores,
            strengths: Some(String::from("Client relationship")),
            improvements: None,
            learnings: None,
        }
    }

    fn referent_request(scores: Vec<ObjectiveScore>) -> ReferentEvaluationRequest {
        ReferentEvaluationRequest {
            scores,
            overall_comment: Some(String::from("Solid delivery")),
            recommendations: None,
        }
    }

    fn self_evaluated(fixture: &Fixture) -> Evaluation {
        submit_self_evaluation(
            Some(&fixture.objectives),
            &fixture.collaborator,
            &fixture.project,
            None,
            self_request(vec![score(0, 4), score(1, 3)]),
        )
        .unwrap()
    }

    #[test]
    fn stage_follows_the_records() {
        let fixture = fixture(ProjectStatusKind::Completed);
        assert_eq!(stage(None, None), EvaluationStage::NoObjectives);
        assert_eq!(
            stage(Some(&fixture.objectives), None),
            EvaluationStage::ObjectivesDefined
        );

        let evaluation = self_evaluated(&fixture);
        assert_eq!(
            stage(Some(&fixture.objectives), Some(&evaluation)),
            EvaluationStage::SelfEvaluated
        );

        let evaluation = submit_referent_evaluation(
            Some(&fixture.objectives),
            Some(evaluation),
            &fixture.referent,
            referent_request(vec![score(0, 5), score(1, 4)]),
        )
        .unwrap();
        assert_eq!(
            stage(Some(&fixture.objectives), Some(&evaluation)),
            EvaluationStage::ReferentEvaluated
        );

        let evaluation = finalize(Some(evaluation)).unwrap();
        assert_eq!(
            stage(Some(&fixture.objectives), Some(&evaluation)),
            EvaluationStage::Finalized
        );
        assert_eq!(evaluation.final_score, Some(4.0));
    }

    #[test]
    fn objectives_are_rewritten_in_place_until_self_evaluation() {
        let fixture = fixture(ProjectStatusKind::Completed);
        let created_at = fixture.objectives.created_at;

        let rewritten = define_objectives(
            Some(fixture.objectives.clone()),
            None,
            fixture.collaborator._id.unwrap(),
            vec![skill_entry()],
        )
        .unwrap();
        assert_eq!(rewritten._id, fixture.objectives._id);
        assert_eq!(rewritten.created_at, created_at);
        assert_eq!(rewritten.objectives.len(), 1);

        let evaluation = self_evaluated(&fixture);
        assert!(matches!(
            define_objectives(
                Some(fixture.objectives.clone()),
                Some(&evaluation),
                fixture.collaborator._id.unwrap(),
                vec![skill_entry()],
            ),
            Err(ApiError::InvalidTransition("OBJECTIVES_LOCKED"))
        ));
    }

    #[test]
    fn objectives_must_not_be_empty() {
        assert!(matches!(
            define_objectives(None, None, ObjectId::new(), Vec::new()),
            Err(ApiError::BadRequest("OBJECTIVES_MUST_NOT_BE_EMPTY"))
        ));
    }

    #[test]
    fn no_evaluation_without_objectives() {
        let fixture = fixture(ProjectStatusKind::Completed);
        let result = submit_self_evaluation(
            None,
            &fixture.collaborator,
            &fixture.project,
            None,
            self_request(vec![score(0, 4)]),
        );
        assert!(matches!(
            result,
            Err(ApiError::InvalidTransition("OBJECTIVES_NOT_DEFINED"))
        ));

        let mut unsaved = fixture.objectives.clone();
        unsaved._id = None;
        let result = submit_self_evaluation(
            Some(&unsaved),
            &fixture.collaborator,
            &fixture.project,
            None,
            self_request(vec![score(0, 4), score(1, 3)]),
        );
        assert!(matches!(
            result,
            Err(ApiError::InvalidTransition("OBJECTIVES_NOT_DEFINED"))
        ));
    }

    #[test]
    fn self_evaluation_waits_for_project_completion() {
        let fixture = fixture(ProjectStatusKind::InProgress);
        let result = submit_self_evaluation(
            Some(&fixture.objectives),
            &fixture.collaborator,
            &fixture.project,
            None,
            self_request(vec![score(0, 4), score(1, 3)]),
        );
        assert!(matches!(
            result,
            Err(ApiError::InvalidTransition("PROJECT_NOT_COMPLETED"))
        ));
    }

    #[test]
    fn self_evaluation_scores_every_objective_once() {
        let fixture = fixture(ProjectStatusKind::Completed);
        let attempt = |scores| {
            submit_self_evaluation(
                Some(&fixture.objectives),
                &fixture.collaborator,
                &fixture.project,
                None,
                self_request(scores),
            )
        };

        assert!(matches!(
            attempt(vec![score(0, 4)]),
            Err(ApiError::BadRequest("EVALUATION_MUST_SCORE_EVERY_OBJECTIVE"))
        ));
        assert!(matches!(
            attempt(vec![score(0, 4), score(0, 2)]),
            Err(ApiError::BadRequest("EVALUATION_DUPLICATE_OBJECTIVE"))
        ));
        assert!(matches!(
            attempt(vec![score(0, 4), score(2, 2)]),
            Err(ApiError::BadRequest("EVALUATION_UNKNOWN_OBJECTIVE"))
        ));
        assert!(matches!(
            attempt(vec![score(0, 6), score(1, 2)]),
            Err(ApiError::BadRequest("EVALUATION_SCORE_OUT_OF_RANGE"))
        ));
        assert!(matches!(
            attempt(vec![score(0, 0), score(1, 2)]),
            Err(ApiError::BadRequest("EVALUATION_SCORE_OUT_OF_RANGE"))
        ));
    }

    #[test]
    fn self_evaluation_is_overwritten_not_versioned() {
        let fixture = fixture(ProjectStatusKind::Completed);
        let mut first = self_evaluated(&fixture);
        first._id = Some(ObjectId::new());

        let second = submit_self_evaluation(
            Some(&fixture.objectives),
            &fixture.collaborator,
            &fixture.project,
            Some(first.clone()),
            self_request(vec![score(0, 2), score(1, 2)]),
        )
        .unwrap();

        assert_eq!(second._id, first._id);
        assert_eq!(second.self_evaluation.unwrap().scores[0].score, 2);
    }

    #[test]
    fn referent_evaluation_requires_self_evaluation() {
        let fixture = fixture(ProjectStatusKind::Completed);
        let result = submit_referent_evaluation(
            Some(&fixture.objectives),
            None,
            &fixture.referent,
            referent_request(vec![score(0, 5), score(1, 4)]),
        );
        assert!(matches!(
            result,
            Err(ApiError::InvalidTransition("SELF_EVALUATION_REQUIRED"))
        ));
    }

    #[test]
    fn referent_entry_needs_a_matching_self_entry() {
        let fixture = fixture(ProjectStatusKind::Completed);
        let mut evaluation = self_evaluated(&fixture);
        if let Some(own) = evaluation.self_evaluation.as_mut() {
            own.scores.retain(|entry| entry.objective_index == 0);
        }

        let result = submit_referent_evaluation(
            Some(&fixture.objectives),
            Some(evaluation),
            &fixture.referent,
            referent_request(vec![score(0, 5), score(1, 4)]),
        );
        assert!(matches!(
            result,
            Err(ApiError::BadRequest("SELF_EVALUATION_ENTRY_MISSING"))
        ));
    }

    #[test]
    fn self_evaluation_is_locked_after_referent_answer() {
        let fixture = fixture(ProjectStatusKind::Completed);
        let evaluation = submit_referent_evaluation(
            Some(&fixture.objectives),
            Some(self_evaluated(&fixture)),
            &fixture.referent,
            referent_request(vec![score(0, 5), score(1, 4)]),
        )
        .unwrap();
        assert_eq!(
            evaluation.referent_evaluation.as_ref().unwrap().referent_id,
            fixture.referent.to_hex()
        );

        let result = submit_self_evaluation(
            Some(&fixture.objectives),
            &fixture.collaborator,
            &fixture.project,
            Some(evaluation),
            self_request(vec![score(0, 1), score(1, 1)]),
        );
        assert!(matches!(
            result,
            Err(ApiError::InvalidTransition("SELF_EVALUATION_LOCKED"))
        ));
    }

    #[test]
    fn finalization_needs_both_sides_and_happens_once() {
        let fixture = fixture(ProjectStatusKind::Completed);
        assert!(matches!(
            finalize(Some(self_evaluated(&fixture))),
            Err(ApiError::InvalidTransition("REFERENT_EVALUATION_REQUIRED"))
        ));
        assert!(matches!(
            finalize(None),
            Err(ApiError::InvalidTransition("SELF_EVALUATION_REQUIRED"))
        ));

        let evaluation = submit_referent_evaluation(
            Some(&fixture.objectives),
            Some(self_evaluated(&fixture)),
            &fixture.referent,
            referent_request(vec![score(0, 3), score(1, 5)]),
        )
        .unwrap();
        let finalized = finalize(Some(evaluation)).unwrap();

        assert!(matches!(
            finalize(Some(finalized.clone())),
            Err(ApiError::InvalidTransition("EVALUATION_ALREADY_FINALIZED"))
        ));
        assert!(matches!(
            submit_referent_evaluation(
                Some(&fixture.objectives),
                Some(finalized),
                &fixture.referent,
                referent_request(vec![score(0, 1), score(1, 1)]),
            ),
            Err(ApiError::InvalidTransition("EVALUATION_ALREADY_FINALIZED"))
        ));
    }

    #[test]
    fn final_score_averages_both_sides() {
        let own = vec![score(0, 4), score(1, 3), score(2, 5)];
        let referent = vec![score(0, 3), score(1, 3), score(2, 4)];
        assert_eq!(final_score(&own, &referent), Some(3.67));
        assert_eq!(final_score(&own, &[]), None);
    }

    #[test]
    fn stage_response_exposes_ids_as_strings() {
        let fixture = fixture(ProjectStatusKind::Completed);
        let evaluation = self_evaluated(&fixture);
        let response = EvaluationStageResponse::new(Some(&fixture.objectives), Some(&evaluation));

        assert_eq!(response.stage, EvaluationStage::SelfEvaluated);
        let evaluation = response.evaluation.unwrap();
        assert_eq!(evaluation.employee_id, fixture.collaborator.employee_id.to_hex());
        assert_eq!(evaluation.status, EvaluationStatus::SelfEvaluated);
    }
}
