use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::{
    error::ApiError,
    models::{
        parse_optional_id,
        project::{Project, ProjectQuery, ProjectRequest, ProjectStatusKind, ProjectStatusRequest},
        project_collaborator::{
            ProjectCollaborator, ProjectCollaboratorQuery, ProjectCollaboratorRequest,
        },
        role::RolePermission,
        user::issuer,
        user_profile::UserProfile,
    },
};

use super::{authorize, page_limit, path_id};

#[derive(Debug, Deserialize)]
pub struct ProjectQueryParams {
    pub referent_id: Option<String>,
    pub status: Option<ProjectStatusKind>,
    pub limit: Option<i64>,
}
#[derive(Debug, Deserialize)]
pub struct CollaboratorQueryParams {
    pub active: Option<bool>,
}

#[get("/projects")]
pub async fn get_projects(
    query: web::Query<ProjectQueryParams>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    issuer(&req)?;

    let params = query.into_inner();
    let query = ProjectQuery {
        _id: None,
        referent_id: parse_optional_id(&params.referent_id)?,
        status: params.status,
        limit: page_limit(params.limit)?,
    };

    Ok(HttpResponse::Ok().json(Project::find_many(&query).await?))
}
#[get("/projects/{project_id}")]
pub async fn get_project(
    project_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    issuer(&req)?;

    let query = ProjectQuery {
        _id: Some(path_id(project_id)?),
        limit: Some(1),
        ..Default::default()
    };

    match Project::find_many(&query).await?.pop() {
        Some(project) => Ok(HttpResponse::Ok().json(project)),
        None => Err(ApiError::NotFound("PROJECT_NOT_FOUND")),
    }
}
#[post("/projects")]
pub async fn create_project(
    payload: web::Json<ProjectRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = authorize(&req, RolePermission::ManageProjects)?;

    let mut project = payload.into_inner().into_project()?;
    if let Some(referent_id) = &project.referent_id {
        if UserProfile::find_by_id(referent_id).await?.is_none() {
            return Err(ApiError::NotFound("REFERENT_NOT_FOUND"));
        }
    }

    let _id = project.save().await?;
    tracing::info!(issuer = %issuer._id, project_id = %_id, "project created");

    Ok(HttpResponse::Created().body(_id.to_string()))
}
#[put("/projects/{project_id}/status")]
pub async fn update_project_status(
    project_id: web::Path<String>,
    payload: web::Json<ProjectStatusRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let project_id = path_id(project_id)?;

    let mut project = Project::find_by_id(&project_id)
        .await?
        .ok_or(ApiError::NotFound("PROJECT_NOT_FOUND"))?;

    if !project.is_referent(&issuer._id) && !issuer.role.validate(&RolePermission::ManageProjects) {
        return Err(ApiError::Forbidden);
    }

    let previous = project.current_status();
    project.push_status(payload.into_inner())?;
    project.update().await?;
    tracing::info!(
        issuer = %issuer._id,
        project_id = %project_id,
        from = ?previous,
        to = ?project.current_status(),
        "project status changed"
    );

    Ok(HttpResponse::Ok().body(project_id.to_string()))
}
#[get("/projects/{project_id}/collaborators")]
pub async fn get_project_collaborators(
    project_id: web::Path<String>,
    query: web::Query<CollaboratorQueryParams>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    issuer(&req)?;

    let query = ProjectCollaboratorQuery {
        project_id: Some(path_id(project_id)?),
        employee_id: None,
        active: query.active,
    };

    Ok(HttpResponse::Ok().json(ProjectCollaborator::find_many(&query).await?))
}
#[post("/projects/{project_id}/collaborators")]
pub async fn add_project_collaborator(
    project_id: web::Path<String>,
    payload: web::Json<ProjectCollaboratorRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let project_id = path_id(project_id)?;

    let project = Project::find_by_id(&project_id)
        .await?
        .ok_or(ApiError::NotFound("PROJECT_NOT_FOUND"))?;

    if !project.is_referent(&issuer._id)
        && !issuer.role.validate(&RolePermission::ManageCollaborations)
    {
        return Err(ApiError::Forbidden);
    }
    if project.current_status() == Some(ProjectStatusKind::Cancelled) {
        return Err(ApiError::InvalidTransition("PROJECT_IS_CANCELLED"));
    }

    let mut collaborator = payload.into_inner().into_collaborator(project_id)?;
    if UserProfile::find_by_id(&collaborator.employee_id).await?.is_none() {
        return Err(ApiError::NotFound("USER_NOT_FOUND"));
    }
    if ProjectCollaborator::exists_active(&project_id, &collaborator.employee_id).await? {
        return Err(ApiError::BadRequest("COLLABORATOR_ALREADY_ACTIVE"));
    }

    let _id = collaborator.save().await?;
    tracing::info!(
        issuer = %issuer._id,
        project_id = %project_id,
        employee_id = %collaborator.employee_id,
        collaboration_id = %_id,
        "collaborator added"
    );

    Ok(HttpResponse::Created().body(_id.to_string()))
}
