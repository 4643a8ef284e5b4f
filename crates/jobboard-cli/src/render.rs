// Plain-text rendering of models for terminal output.

use chrono::{DateTime, Utc};
use jobboard_core::models::{Application, Company, Job, User};

fn date(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// One line per job in a listing.
pub fn job_line(job: &Job) -> String {
    let mut line = format!("{}  {}", job.id, job.title);
    if let Some(company) = &job.company {
        line.push_str(&format!(" @ {}", company.name));
    }
    if let Some(location) = &job.location {
        line.push_str(&format!(" ({location}"));
        if job.remote == Some(true) {
            line.push_str(", remote");
        }
        line.push(')');
    } else if job.remote == Some(true) {
        line.push_str(" (remote)");
    }
    if let Some(salary) = job.salary_range() {
        line.push_str(&format!("  {salary}"));
    }
    if let Some(status) = job.status {
        line.push_str(&format!("  [{status}]"));
    }
    line
}

pub fn job_detail(job: &Job) -> String {
    let mut out = vec![job_line(job)];
    let mut facts = Vec::new();
    if let Some(kind) = job.employment_type {
        facts.push(kind.to_string());
    }
    if let Some(level) = job.experience_level {
        facts.push(level.to_string());
    }
    if let Some(category) = &job.category {
        facts.push(category.clone());
    }
    if !facts.is_empty() {
        out.push(facts.join(" | "));
    }
    if let Some(description) = &job.description {
        out.push(String::new());
        out.push(description.clone());
    }
    if let Some(requirements) = job.requirements.as_ref().filter(|r| !r.is_empty()) {
        out.push(String::new());
        out.push("Requirements:".to_string());
        out.extend(requirements.iter().map(|r| format!("  - {}", r.trim())));
    }
    if let Some(skills) = job.skills.as_ref().filter(|s| !s.is_empty()) {
        out.push(format!("Skills: {}", skills.join(", ")));
    }
    if job.applications_count.is_some() || job.views_count.is_some() {
        out.push(format!(
            "{} applications, {} views, posted {}",
            job.applications_count.unwrap_or(0),
            job.views_count.unwrap_or(0),
            date(job.created_at)
        ));
    }
    out.join("\n")
}

/// An application as seen by the candidate.
pub fn application_line(application: &Application) -> String {
    let job = application
        .job
        .as_ref()
        .map(|j| {
            let title = j.title.clone().unwrap_or_else(|| j.id.clone());
            match j.company.as_ref() {
                Some(company) => format!("{title} @ {}", company.name),
                None => title,
            }
        })
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}  {}  [{}]  {}",
        application.id,
        job,
        application.status,
        date(application.created_at)
    )
}

/// An application as seen by the employer reviewing it.
pub fn applicant_detail(application: &Application) -> String {
    let mut out = Vec::new();
    let candidate = application
        .candidate
        .as_ref()
        .map(|c| match &c.email {
            Some(email) => format!("{} <{email}>", c.display_name()),
            None => c.display_name(),
        })
        .unwrap_or_else(|| "-".to_string());
    out.push(format!("{}  {}  [{}]", application.id, candidate, application.status));
    if let Some(skills) = application
        .candidate
        .as_ref()
        .and_then(|c| c.skills.as_ref())
        .filter(|s| !s.is_empty())
    {
        out.push(format!("  skills: {}", skills.join(", ")));
    }
    if let Some(letter) = &application.cover_letter {
        out.push(format!("  {}", letter.trim()));
    }
    if let Some(notes) = &application.notes {
        out.push(format!("  notes: {notes}"));
    }
    if let Some(reviewer) = &application.reviewed_by {
        out.push(format!(
            "  reviewed by {} on {}",
            reviewer.display_name(),
            date(application.reviewed_at)
        ));
    }
    out.join("\n")
}

pub fn company_detail(company: &Company) -> String {
    let mut out = vec![format!("{}  {}", company.id, company.name)];
    let mut facts = Vec::new();
    if let Some(industry) = &company.industry {
        facts.push(industry.clone());
    }
    if let Some(size) = company.size {
        facts.push(size.to_string());
    }
    if let Some(location) = &company.location {
        facts.push(location.clone());
    }
    if let Some(year) = company.founded_year {
        facts.push(format!("founded {year}"));
    }
    if !facts.is_empty() {
        out.push(facts.join(" | "));
    }
    if let Some(website) = company.website.as_ref().filter(|w| !w.is_empty()) {
        out.push(website.clone());
    }
    if let Some(description) = &company.description {
        out.push(String::new());
        out.push(description.clone());
    }
    out.join("\n")
}

pub fn user_summary(user: &User) -> String {
    format!("{} <{}> ({})", user.full_name(), user.email, user.role)
}
