// Command-line surface.

use clap::{Args, Parser, Subcommand};
use jobboard_app::JobDraft;
use jobboard_core::models::{
    ApplicationStatus, CompanySize, CreateApplicationInput, CreateCompanyInput, EmploymentType,
    ExperienceLevel, JobFilters, JobStatus, LoginInput, Page, RegisterInput, Role,
    UpdateApplicationInput,
};

#[derive(Debug, Parser)]
#[command(name = "jobboard")]
#[command(about = "Browse, post, and apply to jobs on the job board")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Run without the saved session: anonymous requests, no subscriptions.
    #[arg(long, global = true)]
    pub anonymous: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and save the session
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, default_value = "candidate")]
        role: Role,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Forget the saved session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List published jobs
    Jobs {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Only remote jobs
        #[arg(long)]
        remote: bool,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Show one job
    Job { id: String },
    /// Apply to a job
    Apply {
        job_id: String,
        #[arg(long)]
        cover_letter: String,
        #[arg(long)]
        resume: Option<String>,
    },
    /// List your applications
    MyApplications {
        #[arg(long)]
        status: Option<ApplicationStatus>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// List the jobs you posted
    MyJobs {
        #[arg(long)]
        status: Option<JobStatus>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Create and publish a job
    PostJob(PostJobArgs),
    /// Publish a draft job
    Publish { id: String },
    /// List applications to one of your jobs
    Applicants {
        job_id: String,
        #[arg(long)]
        status: Option<ApplicationStatus>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Change an application's status
    Review {
        id: String,
        #[arg(long)]
        status: ApplicationStatus,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show your company
    Company,
    /// Register your company
    CreateCompany(CreateCompanyArgs),
    /// Stream live events until interrupted
    Watch {
        #[command(subcommand)]
        target: WatchTarget,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum WatchTarget {
    /// Newly created jobs
    Jobs,
    /// Status changes of applications
    Applications,
}

#[derive(Debug, Clone, Copy, Args)]
pub struct PageArgs {
    #[arg(long, default_value_t = 20)]
    pub limit: u32,
    #[arg(long, default_value_t = 0)]
    pub offset: u32,
}

impl From<PageArgs> for Page {
    fn from(args: PageArgs) -> Self {
        Page {
            limit: args.limit,
            offset: args.offset,
        }
    }
}

#[derive(Debug, Args)]
pub struct PostJobArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: String,
    /// One requirement per line
    #[arg(long)]
    pub requirements: String,
    #[arg(long)]
    pub salary_min: Option<u32>,
    #[arg(long)]
    pub salary_max: Option<u32>,
    #[arg(long)]
    pub currency: Option<String>,
    #[arg(long, default_value = "full-time")]
    pub employment_type: EmploymentType,
    #[arg(long)]
    pub location: String,
    #[arg(long)]
    pub remote: bool,
    #[arg(long)]
    pub category: String,
    #[arg(long, default_value = "middle")]
    pub experience_level: ExperienceLevel,
    /// Comma-separated
    #[arg(long)]
    pub skills: String,
}

#[derive(Debug, Args)]
pub struct CreateCompanyArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub description: String,
    #[arg(long)]
    pub website: Option<String>,
    #[arg(long)]
    pub industry: String,
    #[arg(long, default_value = "startup")]
    pub size: CompanySize,
    #[arg(long)]
    pub location: String,
    #[arg(long)]
    pub founded_year: Option<i32>,
}

// ---------------------------------------------------------------------------
// Argument conversions
// ---------------------------------------------------------------------------

pub fn login_input(email: String, password: String) -> LoginInput {
    LoginInput { email, password }
}

pub fn register_input(
    email: String,
    password: String,
    first_name: String,
    last_name: String,
    role: Role,
    phone: Option<String>,
) -> RegisterInput {
    RegisterInput {
        email,
        password,
        first_name,
        last_name,
        role,
        phone,
    }
}

pub fn job_filters(
    search: Option<String>,
    category: Option<String>,
    location: Option<String>,
    remote: bool,
) -> JobFilters {
    JobFilters {
        search,
        category,
        location,
        remote: remote.then_some(true),
    }
}

pub fn application_input(
    job_id: String,
    cover_letter: String,
    resume: Option<String>,
) -> CreateApplicationInput {
    CreateApplicationInput {
        job_id,
        cover_letter,
        resume,
    }
}

pub fn review_input(status: ApplicationStatus, notes: Option<String>) -> UpdateApplicationInput {
    UpdateApplicationInput { status, notes }
}

impl From<PostJobArgs> for JobDraft {
    fn from(args: PostJobArgs) -> Self {
        // Shells cannot easily pass newlines, so a literal `\n` separates
        // requirements too.
        let requirements = args.requirements.replace("\\n", "\n");
        JobDraft {
            title: args.title,
            description: args.description,
            requirements,
            salary_min: args.salary_min,
            salary_max: args.salary_max,
            currency: args.currency,
            employment_type: args.employment_type,
            location: args.location,
            remote: args.remote,
            category: args.category,
            experience_level: args.experience_level,
            skills: args.skills,
        }
    }
}

impl From<CreateCompanyArgs> for CreateCompanyInput {
    fn from(args: CreateCompanyArgs) -> Self {
        CreateCompanyInput {
            name: args.name,
            description: args.description,
            website: args.website,
            industry: args.industry,
            size: args.size,
            location: args.location,
            founded_year: args.founded_year,
        }
    }
}
