//! User profile service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::models::UserRole;
use shared::validation;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::check;

/// Profile service
#[derive(Clone)]
pub struct ProfileService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: Uuid,
    username: String,
    email: String,
    role: String,
    phone: Option<String>,
    fcm_token: Option<String>,
    bio: Option<String>,
    created_at: DateTime<Utc>,
}

/// Profile page. Farmers see how many farms they have, experts how many
/// questions they have answered.
#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub fcm_token: Option<String>,
    pub bio: Option<String>,
    pub member_since: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answered_count: Option<i64>,
}

/// Input for updating a profile. Absent fields are left unchanged; an empty
/// string clears the field.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(custom = "check_phone")]
    pub phone: Option<String>,
    #[validate(length(max = 512))]
    pub fcm_token: Option<String>,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
}

fn check_phone(phone: &str) -> Result<(), validator::ValidationError> {
    if phone.is_empty() {
        return Ok(());
    }
    check(validation::validate_phone(phone))
}

impl ProfileService {
    /// Create a new ProfileService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The user's profile page
    pub async fn get(&self, user_id: Uuid) -> AppResult<ProfilePage> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT u.id AS user_id, u.username, u.email, p.role, p.phone, p.fcm_token, p.bio,
                   u.created_at
            FROM users u
            JOIN profiles p ON p.user_id = u.id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

        let role: UserRole = row
            .role
            .parse()
            .map_err(|e: String| AppError::Internal(format!("Corrupt profile role: {}", e)))?;

        let (farm_count, answered_count) = match role {
            UserRole::Farmer => {
                let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM farms WHERE owner_id = $1")
                    .bind(user_id)
                    .fetch_one(&self.db)
                    .await?;
                (Some(count), None)
            }
            UserRole::Expert => {
                let count =
                    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM answers WHERE expert_id = $1")
                        .bind(user_id)
                        .fetch_one(&self.db)
                        .await?;
                (None, Some(count))
            }
        };

        Ok(ProfilePage {
            user_id: row.user_id,
            username: row.username,
            email: row.email,
            role,
            phone: row.phone,
            fcm_token: row.fcm_token,
            bio: row.bio,
            member_since: row.created_at,
            farm_count,
            answered_count,
        })
    }

    /// Update contact details and bio
    pub async fn update(&self, user_id: Uuid, input: UpdateProfileInput) -> AppResult<ProfilePage> {
        input.validate()?;

        sqlx::query(
            r#"
            UPDATE profiles
            SET phone = CASE WHEN $2::text IS NULL THEN phone ELSE NULLIF($2, '') END,
                fcm_token = CASE WHEN $3::text IS NULL THEN fcm_token ELSE NULLIF($3, '') END,
                bio = CASE WHEN $4::text IS NULL THEN bio ELSE NULLIF($4, '') END,
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(input.phone.as_deref().map(str::trim))
        .bind(input.fcm_token.as_deref().map(str::trim))
        .bind(input.bio.as_deref().map(str::trim))
        .execute(&self.db)
        .await?;

        self.get(user_id).await
    }
}
