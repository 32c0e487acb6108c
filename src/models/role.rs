use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RolePermission {
    Owner,
    CreateUser,
    UpdateUser,
    GetUsers,
    ManageProjects,
    ManageCollaborations,
    EvaluateCollaborations,
    ReviewAnnualObjectives,
    ManageAnnualObjectives,
    GetCoachingEvaluations,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Employee,
    ProjectReferent,
    HrCoach,
    Direction,
    Admin,
}

impl UserRole {
    pub fn permission(&self) -> &'static [RolePermission] {
        match self {
            UserRole::Employee => &[],
            UserRole::ProjectReferent => &[RolePermission::GetUsers],
            UserRole::HrCoach => &[
                RolePermission::GetUsers,
                RolePermission::ReviewAnnualObjectives,
                RolePermission::GetCoachingEvaluations,
            ],
            UserRole::Direction => &[
                RolePermission::CreateUser,
                RolePermission::UpdateUser,
                RolePermission::GetUsers,
                RolePermission::ManageProjects,
                RolePermission::ManageCollaborations,
                RolePermission::EvaluateCollaborations,
                RolePermission::ReviewAnnualObjectives,
                RolePermission::ManageAnnualObjectives,
                RolePermission::GetCoachingEvaluations,
            ],
            UserRole::Admin => &[RolePermission::Owner],
        }
    }

    /// Owner grants every permission.
    pub fn validate(&self, permit: &RolePermission) -> bool {
        self.permission().iter().any(|permission| match permission {
            RolePermission::Owner => true,
            _ => permission == permit,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Employee => "employee",
            UserRole::ProjectReferent => "project_referent",
            UserRole::HrCoach => "hr_coach",
            UserRole::Direction => "direction",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_direction_and_admin_create_users() {
        let allowed: Vec<UserRole> = [
            UserRole::Employee,
            UserRole::ProjectReferent,
            UserRole::HrCoach,
            UserRole::Direction,
            UserRole::Admin,
        ]
        .into_iter()
        .filter(|role| role.validate(&RolePermission::CreateUser))
        .collect();

        assert_eq!(allowed, vec![UserRole::Direction, UserRole::Admin]);
    }

    #[test]
    fn admin_owns_everything() {
        assert!(UserRole::Admin.validate(&RolePermission::GetCoachingEvaluations));
        assert!(UserRole::Admin.validate(&RolePermission::ManageProjects));
    }

    #[test]
    fn coach_reviews_but_does_not_manage_projects() {
        assert!(UserRole::HrCoach.validate(&RolePermission::ReviewAnnualObjectives));
        assert!(!UserRole::HrCoach.validate(&RolePermission::ManageProjects));
    }

    #[test]
    fn roles_serialize_in_snake_case() {
        let json = serde_json::to_string(&UserRole::ProjectReferent).unwrap();
        assert_eq!(json, "\"project_referent\"");
        let role: UserRole = serde_json::from_str("\"hr_coach\"").unwrap();
        assert_eq!(role, UserRole::HrCoach);
        assert_eq!(UserRole::Direction.to_string(), "direction");
    }
}
