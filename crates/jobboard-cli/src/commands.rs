// Command execution: one JobBoard call per command, rendered to `out`.

use std::io::Write;

use anyhow::{anyhow, Context};
use futures_util::StreamExt;
use jobboard_app::{ApiError, JobBoard};
use tracing::{info, warn};

use crate::cli::{self, Command, WatchTarget};
use crate::render;

/// Turn an API failure into the message the user sees, keeping the full error
/// in the log.
fn fail(error: ApiError, fallback: &str) -> anyhow::Error {
    warn!("command failed: {error}");
    anyhow!(error.user_message(fallback))
}

pub async fn run<W: Write>(command: Command, board: &JobBoard, out: &mut W) -> anyhow::Result<()> {
    match command {
        Command::Login { email, password } => {
            let user = board
                .login(cli::login_input(email, password))
                .await
                .map_err(|e| fail(e, "Login failed"))?;
            writeln!(out, "Signed in as {}", render::user_summary(&user))?;
        }
        Command::Register {
            email,
            password,
            first_name,
            last_name,
            role,
            phone,
        } => {
            let input = cli::register_input(email, password, first_name, last_name, role, phone);
            let user = board
                .register(input)
                .await
                .map_err(|e| fail(e, "Registration failed"))?;
            writeln!(out, "Registered and signed in as {}", render::user_summary(&user))?;
        }
        Command::Logout => {
            board.logout().map_err(|e| fail(e, "Logout failed"))?;
            writeln!(out, "Signed out")?;
        }
        Command::Whoami => match board.session().user() {
            None => writeln!(out, "Not signed in")?,
            Some(saved) => {
                let user = board
                    .me()
                    .await
                    .map_err(|e| fail(e, "Failed to load profile"))?
                    .unwrap_or(saved);
                writeln!(out, "{}", render::user_summary(&user))?;
            }
        },
        Command::Jobs {
            search,
            category,
            location,
            remote,
            page,
        } => {
            let filters = cli::job_filters(search, category, location, remote);
            let jobs = board
                .jobs(&filters, page.into())
                .await
                .map_err(|e| fail(e, "Failed to load jobs"))?;
            if jobs.is_empty() {
                writeln!(out, "No jobs found")?;
            }
            for job in &jobs {
                writeln!(out, "{}", render::job_line(job))?;
            }
        }
        Command::Job { id } => {
            let job = board
                .job(&id)
                .await
                .map_err(|e| fail(e, "Failed to load job"))?
                .ok_or_else(|| anyhow!("Job not found"))?;
            writeln!(out, "{}", render::job_detail(&job))?;
        }
        Command::Apply {
            job_id,
            cover_letter,
            resume,
        } => {
            let application = board
                .apply_to_job(cli::application_input(job_id, cover_letter, resume))
                .await
                .map_err(|e| fail(e, "Failed to submit application"))?;
            writeln!(out, "Application submitted: {}", render::application_line(&application))?;
        }
        Command::MyApplications { status, page } => {
            let applications = board
                .my_applications(status, page.into())
                .await
                .map_err(|e| fail(e, "Failed to load applications"))?;
            if applications.is_empty() {
                writeln!(out, "No applications yet")?;
            }
            for application in &applications {
                writeln!(out, "{}", render::application_line(application))?;
            }
        }
        Command::MyJobs { status, page } => {
            let jobs = board
                .my_jobs(status, page.into())
                .await
                .map_err(|e| fail(e, "Failed to load jobs"))?;
            if jobs.is_empty() {
                writeln!(out, "No jobs posted yet")?;
            }
            for job in &jobs {
                writeln!(out, "{}", render::job_line(job))?;
            }
        }
        Command::PostJob(args) => {
            let job = board
                .create_and_publish_job(args.into())
                .await
                .map_err(|e| fail(e, "Failed to create job"))?;
            writeln!(out, "Published {}", render::job_line(&job))?;
        }
        Command::Publish { id } => {
            let job = board
                .publish_job(&id)
                .await
                .map_err(|e| fail(e, "Failed to publish job"))?;
            writeln!(out, "Published {}", render::job_line(&job))?;
        }
        Command::Applicants {
            job_id,
            status,
            page,
        } => {
            let applications = board
                .job_applications(&job_id, status, page.into())
                .await
                .map_err(|e| fail(e, "Failed to load applications"))?;
            if applications.is_empty() {
                writeln!(out, "No applications yet")?;
            }
            for application in &applications {
                writeln!(out, "{}", render::applicant_detail(application))?;
            }
        }
        Command::Review { id, status, notes } => {
            let application = board
                .review_application(&id, cli::review_input(status, notes))
                .await
                .map_err(|e| fail(e, "Failed to update application"))?;
            writeln!(out, "{}", render::applicant_detail(&application))?;
        }
        Command::Company => {
            match board
                .my_company()
                .await
                .map_err(|e| fail(e, "Failed to load company"))?
            {
                Some(company) => writeln!(out, "{}", render::company_detail(&company))?,
                None => writeln!(out, "No company registered yet")?,
            }
        }
        Command::CreateCompany(args) => {
            let company = board
                .create_company(args.into())
                .await
                .map_err(|e| fail(e, "Failed to create company"))?;
            writeln!(out, "Created {}", render::company_detail(&company))?;
        }
        Command::Watch { target } => watch(target, board, out).await?,
    }
    Ok(())
}

/// Print events until the stream ends or the process is interrupted.
async fn watch<W: Write>(target: WatchTarget, board: &JobBoard, out: &mut W) -> anyhow::Result<()> {
    match target {
        WatchTarget::Jobs => {
            let events = board
                .job_created()
                .await
                .map_err(|e| fail(e, "Failed to subscribe to new jobs"))?;
            writeln!(out, "Watching for new jobs (Ctrl+C to stop)")?;
            pump(events, tokio::signal::ctrl_c(), out, render::job_line).await
        }
        WatchTarget::Applications => {
            let events = board
                .application_status_changed()
                .await
                .map_err(|e| fail(e, "Failed to subscribe to application updates"))?;
            writeln!(out, "Watching application status changes (Ctrl+C to stop)")?;
            pump(events, tokio::signal::ctrl_c(), out, render::application_line).await
        }
    }
}

/// Write one line per event until the stream ends or `interrupt` resolves.
/// `interrupt` is polled as a single future across the whole loop, so a signal
/// that lands while a line is being written is not lost.
async fn pump<T, S, I, W>(
    mut events: S,
    interrupt: I,
    out: &mut W,
    line: fn(&T) -> String,
) -> anyhow::Result<()>
where
    S: futures_util::Stream<Item = Result<T, ApiError>> + Unpin,
    I: std::future::Future,
    W: Write,
{
    tokio::pin!(interrupt);
    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(Ok(item)) => {
                    writeln!(out, "{}", line(&item))?;
                    out.flush().context("failed to flush output")?;
                }
                Some(Err(e @ ApiError::Decode { .. })) => warn!("skipping event: {e}"),
                Some(Err(e)) => return Err(fail(e, "Subscription failed")),
                None => {
                    info!("subscription ended by server");
                    return Ok(());
                }
            },
            _ = &mut interrupt => {
                info!("watch interrupted");
                return Ok(());
            }
        }
    }
}
