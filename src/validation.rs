use crate::db::Settings;

/// Input problems caught before anything is written. Messages are shown to
/// the user as they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Odkaz nesmí být prázdný.")]
    EmptyLink,
    #[error("Zadejte platný odkaz začínající na http.")]
    InvalidLink,
    #[error("Skóre musí být celé číslo od 0 do {max_score}.")]
    InvalidScore { max_score: i32 },
    #[error("Počet hodnocení na práci musí být kladné celé číslo.")]
    InvalidReviewCount,
    #[error("Maximální skóre musí být celé číslo od 0 do 100.")]
    InvalidMaxScore,
}

pub fn validate_link(raw: &str) -> Result<String, ValidationError> {
    let link = raw.trim();
    if link.is_empty() {
        return Err(ValidationError::EmptyLink);
    }
    if !link.starts_with("http") {
        return Err(ValidationError::InvalidLink);
    }
    Ok(link.to_string())
}

pub fn validate_score(raw: &str, max_score: i32) -> Result<i32, ValidationError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|score| (0..=max_score).contains(score))
        .ok_or(ValidationError::InvalidScore { max_score })
}

pub fn validate_settings(settings: Settings) -> Result<Settings, ValidationError> {
    if settings.reviews_per_submission <= 0 {
        return Err(ValidationError::InvalidReviewCount);
    }
    if !(0..=100).contains(&settings.max_score) {
        return Err(ValidationError::InvalidMaxScore);
    }
    Ok(settings)
}

/// Parses and validates the settings form fields.
pub fn parse_settings(
    reviews_per_submission: &str,
    max_score: &str,
) -> Result<Settings, ValidationError> {
    let reviews_per_submission = reviews_per_submission
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidReviewCount)?;
    let max_score = max_score
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidMaxScore)?;

    validate_settings(Settings {
        reviews_per_submission,
        max_score,
    })
}
