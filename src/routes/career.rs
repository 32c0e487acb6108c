use actix_web::{get, web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::{
    error::ApiError,
    models::{
        career::{
            CareerArea, CareerAreaResponse, CareerLevel, CareerLevelResponse, DevelopmentTheme,
            DevelopmentThemeResponse, PathwaySkill, PathwaySkillQuery, PathwaySkillResponse,
        },
        parse_optional_id,
        user::issuer,
    },
};

use super::path_id;

#[derive(Debug, Deserialize)]
pub struct CareerQueryParams {
    pub area_id: Option<String>,
    pub level_id: Option<String>,
}

#[get("/career-areas")]
pub async fn get_career_areas(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    issuer(&req)?;

    let areas: Vec<CareerAreaResponse> = CareerArea::find_many()
        .await?
        .into_iter()
        .map(CareerAreaResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(areas))
}
#[get("/career-areas/{area_id}/levels")]
pub async fn get_career_levels(
    area_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    issuer(&req)?;
    let area_id = path_id(area_id)?;

    if CareerArea::find_by_id(&area_id).await?.is_none() {
        return Err(ApiError::NotFound("CAREER_AREA_NOT_FOUND"));
    }

    let levels: Vec<CareerLevelResponse> = CareerLevel::find_by_area(&area_id)
        .await?
        .into_iter()
        .map(CareerLevelResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(levels))
}
#[get("/development-themes")]
pub async fn get_development_themes(
    query: web::Query<CareerQueryParams>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    issuer(&req)?;
    let area_id = parse_optional_id(&query.area_id)?;

    let themes: Vec<DevelopmentThemeResponse> = DevelopmentTheme::find_many(area_id.as_ref())
        .await?
        .into_iter()
        .map(DevelopmentThemeResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(themes))
}
#[get("/pathway-skills")]
pub async fn get_pathway_skills(
    query: web::Query<CareerQueryParams>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    issuer(&req)?;
    let query = PathwaySkillQuery {
        career_area_id: parse_optional_id(&query.area_id)?,
        career_level_id: parse_optional_id(&query.level_id)?,
    };

    let skills: Vec<PathwaySkillResponse> = PathwaySkill::find_many(&query)
        .await?
        .into_iter()
        .map(PathwaySkillResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(skills))
}
