use actix_web::{web, HttpRequest};
use mongodb::bson::oid::ObjectId;

use crate::{
    error::ApiError,
    models::{
        parse_id,
        role::RolePermission,
        user::{issuer, UserAuthentication},
    },
};

pub mod annual_objective;
pub mod career;
pub mod coaching;
pub mod collaboration;
pub mod project;
pub mod user;

/// The caller, provided their role grants `permit`.
pub fn authorize(req: &HttpRequest, permit: RolePermission) -> Result<UserAuthentication, ApiError> {
    let issuer = issuer(req)?;
    if issuer.role.validate(&permit) {
        Ok(issuer)
    } else {
        tracing::warn!(issuer = %issuer._id, role = %issuer.role, ?permit, "permission denied");
        Err(ApiError::Forbidden)
    }
}

pub fn path_id(path: web::Path<String>) -> Result<ObjectId, ApiError> {
    parse_id(&path.into_inner())
}

/// Listing limits must be positive when given.
pub fn page_limit(limit: Option<i64>) -> Result<Option<i64>, ApiError> {
    match limit {
        Some(limit) if limit < 1 => Err(ApiError::BadRequest("INVALID_LIMIT")),
        limit => Ok(limit),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(user::login)
        .service(user::create_user)
        .service(user::get_me)
        .service(user::get_users)
        .service(user::get_user)
        .service(user::update_user)
        .service(career::get_career_areas)
        .service(career::get_career_levels)
        .service(career::get_development_themes)
        .service(career::get_pathway_skills)
        .service(project::get_projects)
        .service(project::get_project)
        .service(project::create_project)
        .service(project::update_project_status)
        .service(project::get_project_collaborators)
        .service(project::add_project_collaborator)
        .service(collaboration::get_user_collaborations)
        .service(collaboration::deactivate_collaboration)
        .service(collaboration::get_objectives)
        .service(collaboration::define_objectives)
        .service(collaboration::get_evaluation)
        .service(collaboration::submit_self_evaluation)
        .service(collaboration::submit_referent_evaluation)
        .service(collaboration::finalize_evaluation)
        .service(annual_objective::get_annual_objectives)
        .service(annual_objective::get_annual_objective)
        .service(annual_objective::create_annual_objective)
        .service(annual_objective::update_annual_objective)
        .service(annual_objective::submit_annual_objective)
        .service(annual_objective::approve_annual_objective)
        .service(annual_objective::reject_annual_objective)
        .service(annual_objective::delete_annual_objective)
        .service(coaching::get_coaching_evaluations);
}
