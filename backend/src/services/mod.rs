//! Business logic services for the Farm Advisor platform

pub mod alert;
pub mod auth;
pub mod crop;
pub mod farm;
pub mod prediction;
pub mod profile;
pub mod question;
pub mod recommendation;
pub mod weather;

pub use alert::AlertService;
pub use auth::AuthService;
pub use crop::CropService;
pub use farm::FarmService;
pub use prediction::PredictionService;
pub use profile::ProfileService;
pub use question::QuestionService;
pub use recommendation::RecommendationService;
pub use weather::WeatherService;

/// Adapt a shared-crate check to a `validator` custom rule
pub(crate) fn check(result: Result<(), &'static str>) -> Result<(), validator::ValidationError> {
    result.map_err(|message| {
        let mut error = validator::ValidationError::new("invalid");
        error.message = Some(message.into());
        error
    })
}

/// True when a query failed on a unique constraint
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// True when a query referenced a row that does not exist
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_carries_message() {
        assert!(check(Ok(())).is_ok());
        let err = check(Err("Too short")).unwrap_err();
        assert_eq!(err.message.as_deref(), Some("Too short"));
    }
}
