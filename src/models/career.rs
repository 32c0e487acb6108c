use crate::{
    database::{get_db, CAREER_AREAS, CAREER_LEVELS, DEVELOPMENT_THEMES, PATHWAY_SKILLS},
    error::ApiError,
};
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::FindOptions,
    Collection, Database,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CareerArea {
    pub _id: ObjectId,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CareerLevel {
    pub _id: ObjectId,
    pub career_area_id: ObjectId,
    pub name: String,
    pub rank: i32,
    pub description: Option<String>,
}
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DevelopmentTheme {
    pub _id: ObjectId,
    pub career_area_id: ObjectId,
    pub name: String,
    pub description: Option<String>,
}
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathwaySkill {
    pub _id: ObjectId,
    pub career_area_id: ObjectId,
    pub career_level_id: ObjectId,
    pub development_theme_id: Option<ObjectId>,
    pub name: String,
    pub description: Option<String>,
}
#[derive(Debug, Default)]
pub struct PathwaySkillQuery {
    pub career_area_id: Option<ObjectId>,
    pub career_level_id: Option<ObjectId>,
}
#[derive(Debug, Serialize)]
pub struct CareerAreaResponse {
    pub _id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}
#[derive(Debug, Serialize)]
pub struct CareerLevelResponse {
    pub _id: String,
    pub career_area_id: String,
    pub name: String,
    pub rank: i32,
    pub description: Option<String>,
}
#[derive(Debug, Serialize)]
pub struct DevelopmentThemeResponse {
    pub _id: String,
    pub career_area_id: String,
    pub name: String,
    pub description: Option<String>,
}
#[derive(Debug, Serialize)]
pub struct PathwaySkillResponse {
    pub _id: String,
    pub career_area_id: String,
    pub career_level_id: String,
    pub development_theme_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
}

async fn find_sorted<T>(collection: &str, filter: Document, sort: Document) -> Result<Vec<T>, ApiError>
where
    T: serde::de::DeserializeOwned + Unpin + Send + Sync,
{
    let db: Database = get_db()?;
    let collection: Collection<T> = db.collection::<T>(collection);
    let options = FindOptions::builder().sort(sort).build();

    Ok(collection.find(filter, options).await?.try_collect().await?)
}

impl CareerArea {
    pub async fn find_many() -> Result<Vec<CareerArea>, ApiError> {
        find_sorted(CAREER_AREAS, doc! {}, doc! { "name": 1 }).await
    }
    pub async fn find_by_id(_id: &ObjectId) -> Result<Option<CareerArea>, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<CareerArea> = db.collection::<CareerArea>(CAREER_AREAS);

        Ok(collection.find_one(doc! { "_id": _id }, None).await?)
    }
}

impl CareerLevel {
    pub async fn find_by_area(career_area_id: &ObjectId) -> Result<Vec<CareerLevel>, ApiError> {
        find_sorted(
            CAREER_LEVELS,
            doc! { "career_area_id": career_area_id },
            doc! { "rank": 1 },
        )
        .await
    }
}

impl DevelopmentTheme {
    pub async fn find_many(career_area_id: Option<&ObjectId>) -> Result<Vec<DevelopmentTheme>, ApiError> {
        let filter = match career_area_id {
            Some(_id) => doc! { "career_area_id": _id },
            None => doc! {},
        };
        find_sorted(DEVELOPMENT_THEMES, filter, doc! { "name": 1 }).await
    }
    pub async fn find_by_ids(ids: &[ObjectId]) -> Result<Vec<DevelopmentTheme>, ApiError> {
        find_sorted(
            DEVELOPMENT_THEMES,
            doc! { "_id": { "$in": ids.to_vec() } },
            doc! { "_id": 1 },
        )
        .await
    }
}

impl PathwaySkill {
    pub async fn find_many(query: &PathwaySkillQuery) -> Result<Vec<PathwaySkill>, ApiError> {
        find_sorted(PATHWAY_SKILLS, query.filter(), doc! { "name": 1 }).await
    }
    pub async fn find_by_ids(ids: &[ObjectId]) -> Result<Vec<PathwaySkill>, ApiError> {
        find_sorted(PATHWAY_SKILLS, doc! { "_id": { "$in": ids.to_vec() } }, doc! { "_id": 1 }).await
    }
    pub fn belongs_to(&self, career_area_id: &ObjectId, career_level_id: &ObjectId) -> bool {
        &self.career_area_id == career_area_id && &self.career_level_id == career_level_id
    }
}

impl PathwaySkillQuery {
    fn filter(&self) -> Document {
        let mut filter = Document::new();

        if let Some(career_area_id) = self.career_area_id {
            filter.insert("career_area_id", career_area_id);
        }
        if let Some(career_level_id) = self.career_level_id {
            filter.insert("career_level_id", career_level_id);
        }

        filter
    }
}

impl From<CareerArea> for CareerAreaResponse {
    fn from(area: CareerArea) -> Self {
        Self {
            _id: area._id.to_hex(),
            name: area.name,
            description: area.description,
            color: area.color,
        }
    }
}
impl From<CareerLevel> for CareerLevelResponse {
    fn from(level: CareerLevel) -> Self {
        Self {
            _id: level._id.to_hex(),
            career_area_id: level.career_area_id.to_hex(),
            name: level.name,
            rank: level.rank,
            description: level.description,
        }
    }
}
impl From<DevelopmentTheme> for DevelopmentThemeResponse {
    fn from(theme: DevelopmentTheme) -> Self {
        Self {
            _id: theme._id.to_hex(),
            career_area_id: theme.career_area_id.to_hex(),
            name: theme.name,
            description: theme.description,
        }
    }
}
impl From<PathwaySkill> for PathwaySkillResponse {
    fn from(skill: PathwaySkill) -> Self {
        Self {
            _id: skill._id.to_hex(),
            career_area_id: skill.career_area_id.to_hex(),
            career_level_id: skill.career_level_id.to_hex(),
            development_theme_id: skill.development_theme_id.map(|id| id.to_hex()),
            name: skill.name,
            description: skill.description,
        }
    }
}
