//! Profile Entity
//!
//! Public-facing freelancer profile, one per user.

use chrono::{DateTime, Utc};
use kernel::error::app_error::{AppError, AppResult};
use kernel::id::UserId;

pub const MAX_SKILLS: usize = 20;
const MAX_DISPLAY_NAME: usize = 60;
const MAX_HEADLINE: usize = 120;
const MAX_BIO: usize = 2000;

#[derive(Debug, Clone)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: String,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub skills: Option<Vec<String>>,
}

impl Profile {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            headline: None,
            bio: None,
            location: None,
            skills: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn apply(&mut self, changes: ProfileChanges) -> AppResult<()> {
        if let Some(name) = changes.display_name {
            let name = name.trim().to_string();
            if name.is_empty() || name.chars().count() > MAX_DISPLAY_NAME {
                return Err(AppError::bad_request(format!(
                    "Display name must be between 1 and {MAX_DISPLAY_NAME} characters"
                )));
            }
            self.display_name = name;
        }
        if let Some(headline) = changes.headline {
            self.headline = bounded("Headline", headline, MAX_HEADLINE)?;
        }
        if let Some(bio) = changes.bio {
            self.bio = bounded("Bio", bio, MAX_BIO)?;
        }
        if let Some(location) = changes.location {
            self.location = bounded("Location", location, MAX_HEADLINE)?;
        }
        if let Some(skills) = changes.skills {
            let mut cleaned: Vec<String> = skills
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            cleaned.dedup();
            if cleaned.len() > MAX_SKILLS {
                return Err(AppError::bad_request(format!(
                    "At most {MAX_SKILLS} skills are allowed"
                )));
            }
            self.skills = cleaned;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Blank clears the field.
fn bounded(field: &str, value: String, max: usize) -> AppResult<Option<String>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value.chars().count() > max {
        return Err(AppError::bad_request(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(Some(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_partial_changes() {
        let mut profile = Profile::new(UserId::new(), "Thabo");
        profile
            .apply(ProfileChanges {
                headline: Some("Logo designer".into()),
                skills: Some(vec![" Figma ".into(), "".into(), "Illustrator".into()]),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(profile.display_name, "Thabo");
        assert_eq!(profile.headline.as_deref(), Some("Logo designer"));
        assert_eq!(profile.skills, vec!["Figma", "Illustrator"]);
    }

    #[test]
    fn blank_clears_optional_field() {
        let mut profile = Profile::new(UserId::new(), "Thabo");
        profile.bio = Some("old".into());
        profile
            .apply(ProfileChanges {
                bio: Some("  ".into()),
                ..Default::default()
            })
            .unwrap();
        assert!(profile.bio.is_none());
    }

    #[test]
    fn too_many_skills() {
        let mut profile = Profile::new(UserId::new(), "Thabo");
        let skills = (0..=MAX_SKILLS).map(|i| format!("skill-{i}")).collect();
        let err = profile
            .apply(ProfileChanges {
                skills: Some(skills),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
