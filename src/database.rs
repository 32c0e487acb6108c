use std::sync::OnceLock;

use mongodb::{
    bson::{doc, Document},
    error::{Error, ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Database, IndexModel,
};

use crate::error::ApiError;

pub const AUTH_USERS: &str = "auth_users";
pub const USER_PROFILES: &str = "user_profiles";
pub const PROJECTS: &str = "projets";
pub const PROJECT_COLLABORATORS: &str = "projet_collaborateurs";
pub const ANNUAL_OBJECTIVES: &str = "annual_objectives";
pub const COLLABORATION_OBJECTIVES: &str = "objectifs_collaborateurs";
pub const EVALUATIONS: &str = "evaluations_objectifs";
pub const CAREER_AREAS: &str = "career_areas";
pub const CAREER_LEVELS: &str = "career_levels";
pub const DEVELOPMENT_THEMES: &str = "development_themes";
pub const PATHWAY_SKILLS: &str = "pathway_skills";

static DB: OnceLock<Database> = OnceLock::new();

pub async fn connect(uri: &str, name: &str) -> Result<(), ApiError> {
    let client = Client::with_uri_str(uri).await?;
    let db = client.database(name);

    ensure_indexes(&db).await?;

    if DB.set(db).is_err() {
        tracing::warn!("database handle was already initialised");
    }
    tracing::info!(database = name, "connected to mongodb");
    Ok(())
}

pub fn get_db() -> Result<Database, ApiError> {
    DB.get()
        .cloned()
        .ok_or(ApiError::Internal("DATABASE_NOT_AVAILABLE"))
}

pub fn is_duplicate_key(error: &Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(failure)) if failure.code == 11000
    )
}

async fn ensure_indexes(db: &Database) -> Result<(), ApiError> {
    let unique: [(&str, Document); 4] = [
        (AUTH_USERS, doc! { "email": 1 }),
        (COLLABORATION_OBJECTIVES, doc! { "collaboration_id": 1 }),
        (EVALUATIONS, doc! { "collaboration_id": 1 }),
        (ANNUAL_OBJECTIVES, doc! { "employee_id": 1, "year": 1 }),
    ];

    for (collection, keys) in unique {
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();
        db.collection::<Document>(collection)
            .create_index(index, None)
            .await?;
    }

    db.collection::<Document>(PROJECT_COLLABORATORS)
        .create_index(
            IndexModel::builder()
                .keys(doc! { "project_id": 1, "employee_id": 1 })
                .build(),
            None,
        )
        .await?;

    Ok(())
}
