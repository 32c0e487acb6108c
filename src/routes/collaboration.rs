use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use mongodb::bson::oid::ObjectId;

use crate::{
    error::ApiError,
    models::{
        evaluation::{
            self as stage_gate, Evaluation, EvaluationStageResponse, ReferentEvaluationRequest,
            SelfEvaluationRequest,
        },
        objective::{
            check_references, load_references, CollaborationObjectives,
            CollaborationObjectivesRequest, CollaborationObjectivesResponse,
        },
        project::Project,
        project_collaborator::{ProjectCollaborator, ProjectCollaboratorQuery},
        role::RolePermission,
        user::{issuer, UserAuthenticationData},
        user_profile::UserProfile,
    },
};

use super::path_id;

/// A collaboration together with its project.
struct Collaboration {
    collaborator: ProjectCollaborator,
    project: Project,
}

impl Collaboration {
    async fn load(_id: &ObjectId) -> Result<Self, ApiError> {
        let collaborator = ProjectCollaborator::find_by_id(_id)
            .await?
            .ok_or(ApiError::NotFound("COLLABORATION_NOT_FOUND"))?;
        let project = Project::find_by_id(&collaborator.project_id)
            .await?
            .ok_or(ApiError::NotFound("PROJECT_NOT_FOUND"))?;

        Ok(Self {
            collaborator,
            project,
        })
    }
    fn is_employee(&self, issuer: &UserAuthenticationData) -> bool {
        self.collaborator.employee_id == issuer._id
    }
    /// The project referent, or anyone allowed to evaluate every collaboration.
    fn is_reviewer(&self, issuer: &UserAuthenticationData) -> bool {
        self.project.is_referent(&issuer._id)
            || issuer.role.validate(&RolePermission::EvaluateCollaborations)
    }
    /// Coaches only read the collaborations of employees they manage or coach.
    fn can_read(&self, issuer: &UserAuthenticationData, employee: Option<&UserProfile>) -> bool {
        self.is_employee(issuer)
            || self.is_reviewer(issuer)
            || (issuer.role.validate(&RolePermission::GetCoachingEvaluations)
                && employee.is_some_and(|profile| profile.is_supervised_by(&issuer._id)))
    }
    async fn ensure_readable(&self, issuer: &UserAuthenticationData) -> Result<(), ApiError> {
        if self.can_read(issuer, None) {
            return Ok(());
        }
        let employee = UserProfile::find_by_id(&self.collaborator.employee_id).await?;
        if self.can_read(issuer, employee.as_ref()) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
    fn ensure_active(&self) -> Result<(), ApiError> {
        if self.collaborator.active {
            Ok(())
        } else {
            Err(ApiError::InvalidTransition("COLLABORATION_INACTIVE"))
        }
    }
}

#[get("/users/{user_id}/collaborations")]
pub async fn get_user_collaborations(
    user_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let user_id = path_id(user_id)?;

    if user_id != issuer._id && !issuer.role.validate(&RolePermission::GetUsers) {
        return Err(ApiError::Forbidden);
    }

    let query = ProjectCollaboratorQuery {
        employee_id: Some(user_id),
        ..Default::default()
    };
    Ok(HttpResponse::Ok().json(ProjectCollaborator::find_many(&query).await?))
}
#[put("/collaborations/{collaboration_id}/deactivate")]
pub async fn deactivate_collaboration(
    collaboration_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let collaboration_id = path_id(collaboration_id)?;
    let mut collaboration = Collaboration::load(&collaboration_id).await?;

    if !collaboration.project.is_referent(&issuer._id)
        && !issuer.role.validate(&RolePermission::ManageCollaborations)
    {
        return Err(ApiError::Forbidden);
    }

    collaboration.collaborator.deactivate().await?;
    tracing::info!(issuer = %issuer._id, collaboration_id = %collaboration_id, "collaboration deactivated");

    Ok(HttpResponse::Ok().body(collaboration_id.to_string()))
}
#[get("/collaborations/{collaboration_id}/objectives")]
pub async fn get_objectives(
    collaboration_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let collaboration_id = path_id(collaboration_id)?;
    let collaboration = Collaboration::load(&collaboration_id).await?;

    collaboration.ensure_readable(&issuer).await?;

    match CollaborationObjectives::find_by_collaboration(&collaboration_id).await? {
        Some(objectives) => {
            Ok(HttpResponse::Ok().json(CollaborationObjectivesResponse::from(&objectives)))
        }
        None => Err(ApiError::NotFound("OBJECTIVES_NOT_FOUND")),
    }
}
#[put("/collaborations/{collaboration_id}/objectives")]
pub async fn define_objectives(
    collaboration_id: web::Path<String>,
    payload: web::Json<CollaborationObjectivesRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let collaboration_id = path_id(collaboration_id)?;
    let collaboration = Collaboration::load(&collaboration_id).await?;

    if !collaboration.is_employee(&issuer) && !collaboration.is_reviewer(&issuer) {
        return Err(ApiError::Forbidden);
    }
    collaboration.ensure_active()?;

    let entries = payload.into_inner().objectives;
    let current = CollaborationObjectives::find_by_collaboration(&collaboration_id).await?;
    let evaluation = Evaluation::find_by_collaboration(&collaboration_id).await?;

    let mut objectives =
        stage_gate::define_objectives(current, evaluation.as_ref(), collaboration_id, entries)?;
    let (skills, themes) = load_references(&objectives.objectives).await?;
    check_references(&objectives.objectives, &skills, &themes)?;

    match objectives._id {
        Some(_) => objectives.update().await?,
        None => objectives.save().await?,
    };
    tracing::info!(
        issuer = %issuer._id,
        collaboration_id = %collaboration_id,
        count = objectives.objectives.len(),
        "objectives defined"
    );

    Ok(HttpResponse::Ok().json(CollaborationObjectivesResponse::from(&objectives)))
}
#[get("/collaborations/{collaboration_id}/evaluation")]
pub async fn get_evaluation(
    collaboration_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let collaboration_id = path_id(collaboration_id)?;
    let collaboration = Collaboration::load(&collaboration_id).await?;

    collaboration.ensure_readable(&issuer).await?;

    let objectives = CollaborationObjectives::find_by_collaboration(&collaboration_id).await?;
    let evaluation = Evaluation::find_by_collaboration(&collaboration_id).await?;

    Ok(HttpResponse::Ok().json(EvaluationStageResponse::new(
        objectives.as_ref(),
        evaluation.as_ref(),
    )))
}
#[put("/collaborations/{collaboration_id}/evaluation/self")]
pub async fn submit_self_evaluation(
    collaboration_id: web::Path<String>,
    payload: web::Json<SelfEvaluationRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let collaboration_id = path_id(collaboration_id)?;
    let collaboration = Collaboration::load(&collaboration_id).await?;

    if !collaboration.is_employee(&issuer) {
        return Err(ApiError::Forbidden);
    }

    let objectives = CollaborationObjectives::find_by_collaboration(&collaboration_id).await?;
    let current = Evaluation::find_by_collaboration(&collaboration_id).await?;

    let mut evaluation = stage_gate::submit_self_evaluation(
        objectives.as_ref(),
        &collaboration.collaborator,
        &collaboration.project,
        current,
        payload.into_inner(),
    )?;
    evaluation.persist().await?;
    tracing::info!(issuer = %issuer._id, collaboration_id = %collaboration_id, "self evaluation saved");

    Ok(HttpResponse::Ok().json(EvaluationStageResponse::new(
        objectives.as_ref(),
        Some(&evaluation),
    )))
}
#[put("/collaborations/{collaboration_id}/evaluation/referent")]
pub async fn submit_referent_evaluation(
    collaboration_id: web::Path<String>,
    payload: web::Json<ReferentEvaluationRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let collaboration_id = path_id(collaboration_id)?;
    let collaboration = Collaboration::load(&collaboration_id).await?;

    if !collaboration.is_reviewer(&issuer) {
        return Err(ApiError::Forbidden);
    }

    let objectives = CollaborationObjectives::find_by_collaboration(&collaboration_id).await?;
    let current = Evaluation::find_by_collaboration(&collaboration_id).await?;

    let mut evaluation = stage_gate::submit_referent_evaluation(
        objectives.as_ref(),
        current,
        &issuer._id,
        payload.into_inner(),
    )?;
    evaluation.persist().await?;
    tracing::info!(issuer = %issuer._id, collaboration_id = %collaboration_id, "referent evaluation saved");

    Ok(HttpResponse::Ok().json(EvaluationStageResponse::new(
        objectives.as_ref(),
        Some(&evaluation),
    )))
}
#[post("/collaborations/{collaboration_id}/evaluation/finalize")]
pub async fn finalize_evaluation(
    collaboration_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let collaboration_id = path_id(collaboration_id)?;
    let collaboration = Collaboration::load(&collaboration_id).await?;

    if !collaboration.is_reviewer(&issuer) {
        return Err(ApiError::Forbidden);
    }

    let objectives = CollaborationObjectives::find_by_collaboration(&collaboration_id).await?;
    let current = Evaluation::find_by_collaboration(&collaboration_id).await?;

    let mut evaluation = stage_gate::finalize(current)?;
    evaluation.persist().await?;
    tracing::info!(
        issuer = %issuer._id,
        collaboration_id = %collaboration_id,
        final_score = ?evaluation.final_score,
        "evaluation finalized"
    );

    Ok(HttpResponse::Ok().json(EvaluationStageResponse::new(
        objectives.as_ref(),
        Some(&evaluation),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        project::{tests::project, ProjectStatusKind},
        project_collaborator::tests::collaborator,
        role::UserRole,
        user_profile::UserProfileRequest,
    };

    fn collaboration(referent_id: ObjectId, employee_id: ObjectId) -> Collaboration {
        let project = project(ProjectStatusKind::InProgress, Some(referent_id));
        Collaboration {
            collaborator: collaborator(project._id.unwrap(), employee_id),
            project,
        }
    }

    fn caller(role: UserRole) -> UserAuthenticationData {
        UserAuthenticationData {
            _id: ObjectId::new(),
            role,
        }
    }

    fn coached_by(employee_id: ObjectId, coach_id: &ObjectId) -> UserProfile {
        UserProfileRequest {
            first_name: Some(String::from("Camille")),
            last_name: Some(String::from("Durand")),
            role: Some(UserRole::Employee),
            coach_id: Some(coach_id.to_hex()),
            ..Default::default()
        }
        .into_profile(employee_id, "camille.durand@example.com")
        .unwrap()
    }

    #[test]
    fn unrelated_coach_cannot_read() {
        let employee_id = ObjectId::new();
        let collaboration = collaboration(ObjectId::new(), employee_id);
        let coach = caller(UserRole::HrCoach);
        let profile = coached_by(employee_id, &ObjectId::new());

        assert!(!collaboration.can_read(&coach, None));
        assert!(!collaboration.can_read(&coach, Some(&profile)));
    }

    #[test]
    fn coach_of_the_employee_can_read() {
        let employee_id = ObjectId::new();
        let collaboration = collaboration(ObjectId::new(), employee_id);
        let coach = caller(UserRole::HrCoach);
        let profile = coached_by(employee_id, &coach._id);

        assert!(collaboration.can_read(&coach, Some(&profile)));
    }

    #[test]
    fn participants_and_direction_read_without_a_profile() {
        let referent_id = ObjectId::new();
        let employee_id = ObjectId::new();
        let collaboration = collaboration(referent_id, employee_id);

        let employee = UserAuthenticationData {
            _id: employee_id,
            role: UserRole::Employee,
        };
        let referent = UserAuthenticationData {
            _id: referent_id,
            role: UserRole::ProjectReferent,
        };
        assert!(collaboration.can_read(&employee, None));
        assert!(collaboration.can_read(&referent, None));
        assert!(collaboration.can_read(&caller(UserRole::Direction), None));
        assert!(!collaboration.can_read(&caller(UserRole::Employee), None));
    }
}
