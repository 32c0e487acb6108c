use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;

use crate::{
    error::ApiError,
    models::{
        annual_objective::{
            AnnualObjective, AnnualObjectiveQuery, AnnualObjectiveRequest,
            AnnualObjectiveResponse, AnnualObjectiveReviewRequest, AnnualObjectiveStatus,
        },
        objective::load_references,
        parse_optional_id,
        role::RolePermission,
        user::{issuer, UserAuthenticationData},
        user_profile::UserProfile,
    },
};

use super::path_id;

#[derive(Debug, Deserialize)]
pub struct AnnualObjectiveQueryParams {
    pub employee_id: Option<String>,
    pub year: Option<i32>,
    pub status: Option<AnnualObjectiveStatus>,
}

fn can_manage(issuer: &UserAuthenticationData, employee_id: &ObjectId) -> bool {
    &issuer._id == employee_id || issuer.role.validate(&RolePermission::ManageAnnualObjectives)
}

async fn find_annual(_id: web::Path<String>) -> Result<AnnualObjective, ApiError> {
    AnnualObjective::find_by_id(&path_id(_id)?)
        .await?
        .ok_or(ApiError::NotFound("ANNUAL_OBJECTIVES_NOT_FOUND"))
}

async fn find_employee(_id: &ObjectId) -> Result<UserProfile, ApiError> {
    UserProfile::find_by_id(_id)
        .await?
        .ok_or(ApiError::NotFound("USER_NOT_FOUND"))
}

async fn check_vocabulary(annual: &AnnualObjective) -> Result<(), ApiError> {
    let (skills, themes) = load_references(&annual.objectives).await?;
    annual.check_vocabulary(&skills, &themes)
}

/// Manager or coach of the employee, or direction and admin. Never the employee.
async fn ensure_reviewer(
    issuer: &UserAuthenticationData,
    annual: &AnnualObjective,
) -> Result<(), ApiError> {
    if issuer._id == annual.employee_id {
        return Err(ApiError::Forbidden);
    }
    if issuer.role.validate(&RolePermission::ManageAnnualObjectives) {
        return Ok(());
    }
    if find_employee(&annual.employee_id).await?.is_supervised_by(&issuer._id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

#[get("/annual-objectives")]
pub async fn get_annual_objectives(
    query: web::Query<AnnualObjectiveQueryParams>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let params = query.into_inner();

    let employee_id = match parse_optional_id(&params.employee_id)? {
        Some(employee_id) if employee_id == issuer._id => Some(employee_id),
        Some(employee_id) => {
            let reviewer = issuer.role.validate(&RolePermission::ReviewAnnualObjectives)
                || find_employee(&employee_id).await?.is_supervised_by(&issuer._id);
            if !reviewer {
                return Err(ApiError::Forbidden);
            }
            Some(employee_id)
        }
        None if issuer.role.validate(&RolePermission::ReviewAnnualObjectives) => None,
        None => Some(issuer._id),
    };

    let query = AnnualObjectiveQuery {
        employee_id,
        year: params.year,
        status: params.status,
    };
    let annuals: Vec<AnnualObjectiveResponse> = AnnualObjective::find_many(&query)
        .await?
        .iter()
        .map(AnnualObjectiveResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(annuals))
}
#[get("/annual-objectives/{annual_id}")]
pub async fn get_annual_objective(
    annual_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let annual = find_annual(annual_id).await?;

    if annual.employee_id != issuer._id
        && !issuer.role.validate(&RolePermission::ReviewAnnualObjectives)
    {
        ensure_reviewer(&issuer, &annual).await?;
    }

    Ok(HttpResponse::Ok().json(AnnualObjectiveResponse::from(&annual)))
}
#[post("/annual-objectives")]
pub async fn create_annual_objective(
    payload: web::Json<AnnualObjectiveRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let payload = payload.into_inner();

    let employee_id = parse_optional_id(&payload.employee_id)?.unwrap_or(issuer._id);
    if !can_manage(&issuer, &employee_id) {
        return Err(ApiError::Forbidden);
    }
    find_employee(&employee_id).await?;

    let mut annual = payload.into_annual_objective(employee_id)?;
    check_vocabulary(&annual).await?;

    let _id = annual.save().await?;
    tracing::info!(
        issuer = %issuer._id,
        employee_id = %employee_id,
        annual_id = %_id,
        year = annual.year,
        status = ?annual.status,
        "annual objectives created"
    );

    Ok(HttpResponse::Created().json(AnnualObjectiveResponse::from(&annual)))
}
#[put("/annual-objectives/{annual_id}")]
pub async fn update_annual_objective(
    annual_id: web::Path<String>,
    payload: web::Json<AnnualObjectiveRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let mut annual = find_annual(annual_id).await?;

    if !can_manage(&issuer, &annual.employee_id) {
        return Err(ApiError::Forbidden);
    }

    annual.replace(payload.into_inner())?;
    check_vocabulary(&annual).await?;
    let _id = annual.update().await?;
    tracing::info!(issuer = %issuer._id, annual_id = %_id, status = ?annual.status, "annual objectives updated");

    Ok(HttpResponse::Ok().json(AnnualObjectiveResponse::from(&annual)))
}
#[post("/annual-objectives/{annual_id}/submit")]
pub async fn submit_annual_objective(
    annual_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let mut annual = find_annual(annual_id).await?;

    if !can_manage(&issuer, &annual.employee_id) {
        return Err(ApiError::Forbidden);
    }

    annual.submit()?;
    let _id = annual.update().await?;
    tracing::info!(issuer = %issuer._id, annual_id = %_id, "annual objectives submitted");

    Ok(HttpResponse::Ok().json(AnnualObjectiveResponse::from(&annual)))
}
#[post("/annual-objectives/{annual_id}/approve")]
pub async fn approve_annual_objective(
    annual_id: web::Path<String>,
    payload: Option<web::Json<AnnualObjectiveReviewRequest>>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let mut annual = find_annual(annual_id).await?;
    ensure_reviewer(&issuer, &annual).await?;

    let review = payload.map(web::Json::into_inner).unwrap_or_default();
    annual.review(issuer._id, true, review)?;
    let _id = annual.update().await?;
    tracing::info!(issuer = %issuer._id, annual_id = %_id, "annual objectives approved");

    Ok(HttpResponse::Ok().json(AnnualObjectiveResponse::from(&annual)))
}
#[post("/annual-objectives/{annual_id}/reject")]
pub async fn reject_annual_objective(
    annual_id: web::Path<String>,
    payload: Option<web::Json<AnnualObjectiveReviewRequest>>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let mut annual = find_annual(annual_id).await?;
    ensure_reviewer(&issuer, &annual).await?;

    let review = payload.map(web::Json::into_inner).unwrap_or_default();
    annual.review(issuer._id, false, review)?;
    let _id = annual.update().await?;
    tracing::info!(issuer = %issuer._id, annual_id = %_id, "annual objectives rejected");

    Ok(HttpResponse::Ok().json(AnnualObjectiveResponse::from(&annual)))
}
#[delete("/annual-objectives/{annual_id}")]
pub async fn delete_annual_objective(
    annual_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let issuer = issuer(&req)?;
    let annual = find_annual(annual_id).await?;

    if !can_manage(&issuer, &annual.employee_id) {
        return Err(ApiError::Forbidden);
    }

    annual.ensure_deletable()?;
    let count = annual.delete().await?;
    tracing::info!(issuer = %issuer._id, annual_id = ?annual._id, count, "annual objectives deleted");

    Ok(HttpResponse::Ok().body(format!("Deleted {count} annual objective set")))
}
