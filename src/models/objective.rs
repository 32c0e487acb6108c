use crate::{
    database::{get_db, is_duplicate_key, COLLABORATION_OBJECTIVES},
    error::ApiError,
};
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    Collection, Database,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{
    career::{DevelopmentTheme, PathwaySkill},
    parse_id, to_rfc3339,
};

pub const MAX_COLLABORATION_OBJECTIVES: usize = 4;
pub const ANNUAL_OBJECTIVE_COUNT: usize = 4;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SmartFields {
    #[serde(default)]
    pub specific: String,
    #[serde(default)]
    pub measurable: String,
    #[serde(default)]
    pub achievable: String,
    #[serde(default)]
    pub relevant: String,
    #[serde(default)]
    pub time_bound: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomObjectiveKind {
    Formation,
    Custom,
    Smart,
}

/// One selection of the objective editor. Reference ids are kept as hex
/// strings since the whole list is stored and returned as one blob.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectiveEntry {
    Skill {
        skill_id: String,
        label: Option<String>,
        smart: SmartFields,
    },
    Theme {
        theme_id: String,
        label: Option<String>,
        smart: SmartFields,
    },
    Custom {
        subtype: CustomObjectiveKind,
        label: Option<String>,
        smart: Option<SmartFields>,
        description: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCount {
    UpTo(usize),
    Exactly(usize),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollaborationObjectives {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub collaboration_id: ObjectId,
    pub objectives: Vec<ObjectiveEntry>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
#[derive(Debug, Deserialize)]
pub struct CollaborationObjectivesRequest {
    pub objectives: Vec<ObjectiveEntry>,
}
#[derive(Debug, Serialize)]
pub struct CollaborationObjectivesResponse {
    pub _id: Option<String>,
    pub collaboration_id: String,
    pub objectives: Vec<ObjectiveEntry>,
    pub created_at: String,
    pub updated_at: String,
}

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

impl SmartFields {
    pub fn is_complete(&self) -> bool {
        [
            &self.specific,
            &self.measurable,
            &self.achievable,
            &self.relevant,
            &self.time_bound,
        ]
        .iter()
        .all(|field| filled(field))
    }
}

impl ObjectiveEntry {
    pub fn validate(&self) -> Result<(), ApiError> {
        match self {
            ObjectiveEntry::Skill {
                skill_id: reference,
                smart,
                ..
            }
            | ObjectiveEntry::Theme {
                theme_id: reference,
                smart,
                ..
            } => {
                parse_id(reference)?;
                if !smart.is_complete() {
                    return Err(ApiError::BadRequest("OBJECTIVE_SMART_FIELDS_INCOMPLETE"));
                }
            }
            ObjectiveEntry::Custom {
                subtype: CustomObjectiveKind::Smart,
                smart,
                ..
            } => {
                if !smart.as_ref().is_some_and(SmartFields::is_complete) {
                    return Err(ApiError::BadRequest("OBJECTIVE_SMART_FIELDS_INCOMPLETE"));
                }
            }
            ObjectiveEntry::Custom { description, .. } => {
                if !description.as_deref().is_some_and(filled) {
                    return Err(ApiError::BadRequest("OBJECTIVE_DESCRIPTION_REQUIRED"));
                }
            }
        }
        Ok(())
    }
    pub fn skill_id(&self) -> Option<&str> {
        match self {
            ObjectiveEntry::Skill { skill_id, .. } => Some(skill_id),
            _ => None,
        }
    }
    pub fn theme_id(&self) -> Option<&str> {
        match self {
            ObjectiveEntry::Theme { theme_id, .. } => Some(theme_id),
            _ => None,
        }
    }
}

/// Local checks of the objective editor: entry count, completeness, and no
/// skill or theme picked twice.
pub fn validate_entries(entries: &[ObjectiveEntry], count: EntryCount) -> Result<(), ApiError> {
    match count {
        EntryCount::UpTo(_) if entries.is_empty() => {
            return Err(ApiError::BadRequest("OBJECTIVES_MUST_NOT_BE_EMPTY"))
        }
        EntryCount::UpTo(max) if entries.len() > max => {
            return Err(ApiError::BadRequest("OBJECTIVES_LIMIT_EXCEEDED"))
        }
        EntryCount::Exactly(expected) if entries.len() != expected => {
            return Err(ApiError::BadRequest(
                "ANNUAL_OBJECTIVES_MUST_HAVE_FOUR_ENTRIES",
            ))
        }
        _ => (),
    }

    let mut references: HashSet<&str> = HashSet::new();
    for entry in entries {
        entry.validate()?;
        if let Some(reference) = entry.skill_id().or(entry.theme_id()) {
            if !references.insert(reference) {
                return Err(ApiError::BadRequest("OBJECTIVE_DUPLICATE_REFERENCE"));
            }
        }
    }

    Ok(())
}

pub fn skill_ids(entries: &[ObjectiveEntry]) -> Result<Vec<ObjectId>, ApiError> {
    entries
        .iter()
        .filter_map(ObjectiveEntry::skill_id)
        .map(parse_id)
        .collect()
}

pub fn theme_ids(entries: &[ObjectiveEntry]) -> Result<Vec<ObjectId>, ApiError> {
    entries
        .iter()
        .filter_map(ObjectiveEntry::theme_id)
        .map(parse_id)
        .collect()
}

/// Skills and themes referenced by `entries`, read from the career vocabulary.
pub async fn load_references(
    entries: &[ObjectiveEntry],
) -> Result<(Vec<PathwaySkill>, Vec<DevelopmentTheme>), ApiError> {
    let skill_ids = skill_ids(entries)?;
    let theme_ids = theme_ids(entries)?;

    let skills = if skill_ids.is_empty() {
        Vec::new()
    } else {
        PathwaySkill::find_by_ids(&skill_ids).await?
    };
    let themes = if theme_ids.is_empty() {
        Vec::new()
    } else {
        DevelopmentTheme::find_by_ids(&theme_ids).await?
    };

    Ok((skills, themes))
}

/// Every skill and theme reference must point at an existing vocabulary entry.
pub fn check_references(
    entries: &[ObjectiveEntry],
    skills: &[PathwaySkill],
    themes: &[DevelopmentTheme],
) -> Result<(), ApiError> {
    for _id in skill_ids(entries)? {
        if !skills.iter().any(|skill| skill._id == _id) {
            return Err(ApiError::BadRequest("OBJECTIVE_UNKNOWN_SKILL"));
        }
    }
    for _id in theme_ids(entries)? {
        if !themes.iter().any(|theme| theme._id == _id) {
            return Err(ApiError::BadRequest("OBJECTIVE_UNKNOWN_THEME"));
        }
    }
    Ok(())
}

impl CollaborationObjectives {
    pub fn new(collaboration_id: ObjectId, objectives: Vec<ObjectiveEntry>) -> Self {
        let now = DateTime::now();
        Self {
            _id: None,
            collaboration_id,
            objectives,
            created_at: now,
            updated_at: now,
        }
    }
    pub async fn save(&mut self) -> Result<ObjectId, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<CollaborationObjectives> =
            db.collection::<CollaborationObjectives>(COLLABORATION_OBJECTIVES);

        let _id = ObjectId::new();
        self._id = Some(_id);

        match collection.insert_one(&*self, None).await {
            Ok(_) => Ok(_id),
            Err(error) if is_duplicate_key(&error) => {
                Err(ApiError::InvalidTransition("OBJECTIVES_ALREADY_DEFINED"))
            }
            Err(error) => Err(error.into()),
        }
    }
    pub async fn update(&self) -> Result<ObjectId, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<CollaborationObjectives> =
            db.collection::<CollaborationObjectives>(COLLABORATION_OBJECTIVES);

        let _id = self._id.ok_or(ApiError::NotFound("OBJECTIVES_NOT_FOUND"))?;
        collection.replace_one(doc! { "_id": _id }, self, None).await?;
        Ok(_id)
    }
    pub async fn find_by_collaboration(
        collaboration_id: &ObjectId,
    ) -> Result<Option<CollaborationObjectives>, ApiError> {
        let db: Database = get_db()?;
        let collection: Collection<CollaborationObjectives> =
            db.collection::<CollaborationObjectives>(COLLABORATION_OBJECTIVES);

        Ok(collection
            .find_one(doc! { "collaboration_id": collaboration_id }, None)
            .await?)
    }
}

impl From<&CollaborationObjectives> for CollaborationObjectivesResponse {
    fn from(objectives: &CollaborationObjectives) -> Self {
        Self {
            _id: objectives._id.map(|id| id.to_hex()),
            collaboration_id: objectives.collaboration_id.to_hex(),
            objectives: objectives.objectives.clone(),
            created_at: to_rfc3339(&objectives.created_at),
            updated_at: to_rfc3339(&objectives.updated_at),
        }
    }
}
