use actix_web::{get, web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::{
    error::ApiError,
    models::{
        coaching::{CoachingEvaluation, CoachingEvaluationQuery},
        evaluation::EvaluationStatus,
        parse_optional_id,
        role::{RolePermission, UserRole},
    },
};

use super::authorize;

#[derive(Debug, Deserialize)]
pub struct CoachingQueryParams {
    pub employee_id: Option<String>,
    pub status: Option<EvaluationStatus>,
}

/// Coaches see the evaluations of their coachees, direction and admin see all.
#[get("/coaching/evaluations")]
pub async fn get_coaching_evaluations(
    query: web::Query<CoachingQueryParams>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = authorize(&req, RolePermission::GetCoachingEvaluations)?;

    let coach_id = match issuer.role {
        UserRole::Direction | UserRole::Admin => None,
        _ => Some(issuer._id),
    };
    let query = CoachingEvaluationQuery {
        coach_id,
        employee_id: parse_optional_id(&query.employee_id)?,
        status: query.status,
    };

    Ok(HttpResponse::Ok().json(CoachingEvaluation::find_many(&query).await?))
}
