// Client-side validation of the forms behind each mutation. Every rule is
// checked so the caller can show all failing fields at once.

use std::fmt;

use jobboard_core::models::{
    CreateApplicationInput, CreateCompanyInput, CreateJobInput, EmploymentType,
    ExperienceLevel, LoginInput, RegisterInput,
};

pub const DEFAULT_CURRENCY: &str = "USD";
pub const MIN_FOUNDED_YEAR: i32 = 1800;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// The failing fields of one form, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    fn check(&mut self, ok: bool, field: &'static str, message: impl Into<String>) {
        if !ok {
            self.0.push(FieldError {
                field,
                message: message.into(),
            });
        }
    }

    fn min_len(&mut self, value: &str, min: usize, field: &'static str, message: &str) {
        self.check(value.chars().count() >= min, field, message);
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.0.iter().map(|e| e.field).collect()
    }

    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Loose address check: one `@`, a non-empty local part, and a dotted domain
/// with no empty labels. No whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn check_credentials(errors: &mut ValidationErrors, email: &str, password: &str) {
    errors.check(is_valid_email(email), "email", "invalid email address");
    errors.min_len(password, 6, "password", "password must be at least 6 characters");
}

pub fn validate_login(input: &LoginInput) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_credentials(&mut errors, &input.email, &input.password);
    errors.finish()
}

pub fn validate_register(input: &RegisterInput) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.min_len(&input.first_name, 2, "firstName", "first name must be at least 2 characters");
    errors.min_len(&input.last_name, 2, "lastName", "last name must be at least 2 characters");
    check_credentials(&mut errors, &input.email, &input.password);
    errors.finish()
}

pub fn validate_application(input: &CreateApplicationInput) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.check(!input.job_id.is_empty(), "jobId", "job is required");
    errors.min_len(
        &input.cover_letter,
        50,
        "coverLetter",
        "cover letter must be at least 50 characters",
    );
    errors.finish()
}

/// `current_year` bounds `foundedYear` from above.
pub fn validate_company(input: &CreateCompanyInput, current_year: i32) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.min_len(&input.name, 2, "name", "name must be at least 2 characters");
    errors.min_len(
        &input.description,
        50,
        "description",
        "description must be at least 50 characters",
    );
    if let Some(website) = input.website.as_deref().filter(|w| !w.is_empty()) {
        errors.check(url::Url::parse(website).is_ok(), "website", "invalid URL");
    }
    errors.min_len(&input.industry, 1, "industry", "industry is required");
    errors.min_len(&input.location, 1, "location", "location is required");
    if let Some(year) = input.founded_year {
        errors.check(
            (MIN_FOUNDED_YEAR..=current_year).contains(&year),
            "foundedYear",
            format!("founded year must be between {MIN_FOUNDED_YEAR} and {current_year}"),
        );
    }
    errors.finish()
}

/// A job posting as entered: requirements one per line, skills comma
/// separated.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub salary_min: Option<u32>,
    pub salary_max: Option<u32>,
    pub currency: Option<String>,
    pub employment_type: EmploymentType,
    pub location: String,
    pub remote: bool,
    pub category: String,
    pub experience_level: ExperienceLevel,
    pub skills: String,
}

impl JobDraft {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.min_len(&self.title, 5, "title", "title must be at least 5 characters");
        errors.min_len(
            &self.description,
            100,
            "description",
            "description must be at least 100 characters",
        );
        errors.min_len(
            &self.requirements,
            10,
            "requirements",
            "list at least one requirement",
        );
        errors.min_len(&self.location, 1, "location", "location is required");
        errors.min_len(&self.category, 1, "category", "category is required");
        errors.min_len(&self.skills, 1, "skills", "list at least one skill");
        errors.finish()
    }

    /// Validate and build the mutation input.
    pub fn into_input(self) -> Result<CreateJobInput, ValidationErrors> {
        self.validate()?;
        let requirements = split_lines(&self.requirements);
        let skills = split_commas(&self.skills);
        Ok(CreateJobInput {
            title: self.title,
            description: self.description,
            requirements,
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            currency: self
                .currency
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            employment_type: self.employment_type,
            location: self.location,
            remote: self.remote,
            category: self.category,
            experience_level: self.experience_level,
            skills,
        })
    }
}

/// Non-blank lines, kept as entered.
fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

fn split_commas(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobboard_core::models::{CompanySize, Role};

    fn draft() -> JobDraft {
        JobDraft {
            title: "Senior Rust Engineer".into(),
            description: "x".repeat(120),
            requirements: "5+ years of Rust\n\nTokio experience\n".into(),
            salary_min: Some(100_000),
            salary_max: None,
            currency: None,
            employment_type: EmploymentType::FullTime,
            location: "Berlin".into(),
            remote: true,
            category: "Engineering".into(),
            experience_level: ExperienceLevel::Senior,
            skills: "Rust, tokio ,, GraphQL".into(),
        }
    }

    fn company() -> CreateCompanyInput {
        CreateCompanyInput {
            name: "Acme".into(),
            description: "d".repeat(60),
            website: Some(String::new()),
            industry: "Software".into(),
            size: CompanySize::Small,
            location: "Remote".into(),
            founded_year: Some(2010),
        }
    }

    #[test]
    fn email_check() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@@example.com"));
        assert!(!is_valid_email("ada @example.com"));
        assert!(!is_valid_email("ada@example..com"));
    }

    #[test]
    fn login_reports_both_fields() {
        let err = validate_login(&LoginInput {
            email: "nope".into(),
            password: "123".into(),
        })
        .unwrap_err();
        assert_eq!(err.fields(), vec!["email", "password"]);
        assert_eq!(
            err.to_string(),
            "email: invalid email address; password: password must be at least 6 characters"
        );
    }

    #[test]
    fn register_checks_names() {
        let input = RegisterInput {
            email: "ada@example.com".into(),
            password: "secret1".into(),
            first_name: "A".into(),
            last_name: "Lovelace".into(),
            role: Role::Candidate,
            phone: None,
        };
        let err = validate_register(&input).unwrap_err();
        assert_eq!(err.fields(), vec!["firstName"]);
    }

    #[test]
    fn cover_letter_minimum() {
        let mut input = CreateApplicationInput {
            job_id: "j1".into(),
            cover_letter: "too short".into(),
            resume: None,
        };
        assert!(validate_application(&input).is_err());
        input.cover_letter = "c".repeat(50);
        assert!(validate_application(&input).is_ok());
    }

    #[test]
    fn job_draft_splits_lists_and_defaults_currency() {
        let input = draft().into_input().unwrap();
        assert_eq!(input.requirements, vec!["5+ years of Rust", "Tokio experience"]);
        assert_eq!(input.skills, vec!["Rust", "tokio", "GraphQL"]);
        assert_eq!(input.currency, "USD");
        assert!(input.remote);
    }

    #[test]
    fn job_draft_reports_every_failure() {
        let mut bad = draft();
        bad.title = "Dev".into();
        bad.description = "short".into();
        bad.requirements = "none".into();
        bad.location.clear();
        bad.category.clear();
        bad.skills.clear();
        let err = bad.into_input().unwrap_err();
        assert_eq!(
            err.fields(),
            vec!["title", "description", "requirements", "location", "category", "skills"]
        );
        assert_eq!(
            err.message_for("description"),
            Some("description must be at least 100 characters")
        );
    }

    #[test]
    fn company_accepts_empty_website() {
        assert!(validate_company(&company(), 2026).is_ok());
        let mut input = company();
        input.website = None;
        assert!(validate_company(&input, 2026).is_ok());
    }

    #[test]
    fn company_rejects_bad_website_and_year() {
        let mut input = company();
        input.website = Some("not a url".into());
        input.founded_year = Some(2031);
        let err = validate_company(&input, 2026).unwrap_err();
        assert_eq!(err.fields(), vec!["website", "foundedYear"]);

        input.website = Some("https://acme.example".into());
        input.founded_year = Some(1799);
        assert_eq!(validate_company(&input, 2026).unwrap_err().fields(), vec!["foundedYear"]);
    }
}
