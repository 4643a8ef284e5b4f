// Typed job board API over the GraphQL client. Each call builds its
// operation from a fixed document, runs it through the client, and decodes
// the root field into a model type.

use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::{Datelike, Utc};
use futures_util::Stream;
use jobboard_core::models::{
    Application, ApplicationStatus, AuthPayload, Company, CreateApplicationInput,
    CreateCompanyInput, CreateJobInput, Job, JobFilters, JobStatus, LoginInput, Page,
    RegisterInput, Role, UpdateApplicationInput, User,
};
use jobboard_core::Session;
use jobboard_graphql::{
    ClientFactory, FetchPolicy, GraphqlClient, Operation, Subscription, TransportError,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::documents;
use crate::error::ApiError;
use crate::forms::{self, JobDraft};

/// Cached results dropped after `createCompany`.
const COMPANY_QUERIES: &[&str] = &["GetMyCompany"];
/// Cached results dropped after an application changes status.
const APPLICATION_QUERIES: &[&str] = &["GetJobApplications", "GetMyApplications"];
/// Cached results dropped after a job is created or published.
const JOB_QUERIES: &[&str] = &["GetMyJobs", "GetJobs"];

pub struct JobBoard {
    client: Arc<GraphqlClient>,
    session: Session,
}

impl JobBoard {
    pub fn new(client: Arc<GraphqlClient>, session: Session) -> Self {
        Self { client, session }
    }

    /// Use the factory's client. An ephemeral factory has no session, so the
    /// board gets a private empty one.
    pub fn from_factory(factory: &ClientFactory) -> Self {
        let session = factory.session().cloned().unwrap_or_default();
        Self::new(factory.client(), session)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn client(&self) -> &Arc<GraphqlClient> {
        &self.client
    }

    // -- plumbing -----------------------------------------------------------

    async fn query<T: DeserializeOwned>(
        &self,
        document: &'static str,
        variables: Value,
        field: &'static str,
        policy: FetchPolicy,
    ) -> Result<T, ApiError> {
        let operation = Operation::parse(document, variables)?;
        let data = self.client.query(&operation, policy).await?;
        decode_field(data, field)
    }

    async fn mutate<T: DeserializeOwned>(
        &self,
        document: &'static str,
        variables: Value,
        field: &'static str,
        evict: &[&str],
    ) -> Result<T, ApiError> {
        let operation = Operation::parse(document, variables)?;
        let data = self.client.mutate(&operation, evict).await?;
        decode_field(data, field)
    }

    async fn subscribe<T: DeserializeOwned>(
        &self,
        document: &'static str,
        field: &'static str,
    ) -> Result<EventStream<T>, ApiError> {
        let operation = Operation::parse(document, json!({}))?;
        let subscription = self.client.subscribe(&operation).await?;
        Ok(EventStream::new(subscription, field))
    }

    fn require_token(&self) -> Result<(), ApiError> {
        if self.session.token().is_none() {
            return Err(ApiError::NotAuthenticated);
        }
        Ok(())
    }

    fn require_role(&self, role: Role) -> Result<(), ApiError> {
        self.require_token()?;
        if self.session.role() != Some(role) {
            return Err(ApiError::RoleRequired(role));
        }
        Ok(())
    }

    // -- authentication -----------------------------------------------------

    pub async fn login(&self, input: LoginInput) -> Result<User, ApiError> {
        forms::validate_login(&input)?;
        let payload: AuthPayload = self
            .mutate(documents::LOGIN, json!({ "input": input }), "login", &[])
            .await?;
        self.start_session(payload)
    }

    pub async fn register(&self, input: RegisterInput) -> Result<User, ApiError> {
        forms::validate_register(&input)?;
        let payload: AuthPayload = self
            .mutate(documents::REGISTER, json!({ "input": input }), "register", &[])
            .await?;
        self.start_session(payload)
    }

    fn start_session(&self, payload: AuthPayload) -> Result<User, ApiError> {
        let user = payload.user.clone();
        // Results cached for the previous identity must not leak into this one.
        self.client.reset_store();
        self.session.sign_in(payload)?;
        Ok(user)
    }

    /// Drop the session and every cached result.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.client.reset_store();
        self.session.sign_out()?;
        Ok(())
    }

    /// The signed-in user as the server sees it. Refreshes the session's copy.
    pub async fn me(&self) -> Result<Option<User>, ApiError> {
        let user: Option<User> = self
            .query(documents::GET_ME, json!({}), "me", FetchPolicy::NetworkOnly)
            .await?;
        if let Some(user) = &user {
            self.session.update_user(user.clone())?;
        }
        Ok(user)
    }

    // -- jobs ---------------------------------------------------------------

    pub async fn jobs(&self, filters: &JobFilters, page: Page) -> Result<Vec<Job>, ApiError> {
        let variables = json!({
            "filters": filters,
            "limit": page.limit,
            "offset": page.offset,
        });
        self.query(documents::GET_JOBS, variables, "jobs", FetchPolicy::NetworkOnly)
            .await
    }

    pub async fn job(&self, id: &str) -> Result<Option<Job>, ApiError> {
        self.query(documents::GET_JOB, json!({ "id": id }), "job", FetchPolicy::NetworkOnly)
            .await
    }

    pub async fn my_jobs(&self, status: Option<JobStatus>, page: Page) -> Result<Vec<Job>, ApiError> {
        let variables = json!({
            "status": status,
            "limit": page.limit,
            "offset": page.offset,
        });
        self.query(documents::GET_MY_JOBS, variables, "myJobs", FetchPolicy::NetworkOnly)
            .await
    }

    pub async fn create_job(&self, input: &CreateJobInput) -> Result<Job, ApiError> {
        self.mutate(
            documents::CREATE_JOB,
            json!({ "input": input }),
            "createJob",
            JOB_QUERIES,
        )
        .await
    }

    pub async fn publish_job(&self, id: &str) -> Result<Job, ApiError> {
        self.mutate(
            documents::PUBLISH_JOB,
            json!({ "id": id }),
            "publishJob",
            JOB_QUERIES,
        )
        .await
    }

    /// Validate a draft, create the job, then publish it. Returns the created
    /// job with the status reported by `publishJob`.
    pub async fn create_and_publish_job(&self, draft: JobDraft) -> Result<Job, ApiError> {
        self.require_role(Role::Employer)?;
        let input = draft.into_input()?;
        let mut job = self.create_job(&input).await?;
        info!(job_id = %job.id, "job created, publishing");
        let published = self.publish_job(&job.id).await?;
        job.status = published.status;
        Ok(job)
    }

    // -- applications -------------------------------------------------------

    pub async fn my_applications(
        &self,
        status: Option<ApplicationStatus>,
        page: Page,
    ) -> Result<Vec<Application>, ApiError> {
        let variables = json!({
            "status": status,
            "limit": page.limit,
            "offset": page.offset,
        });
        self.query(
            documents::GET_MY_APPLICATIONS,
            variables,
            "myApplications",
            FetchPolicy::NetworkOnly,
        )
        .await
    }

    /// Submit an application. Rejected locally without a session token.
    pub async fn apply_to_job(&self, input: CreateApplicationInput) -> Result<Application, ApiError> {
        self.require_token()?;
        forms::validate_application(&input)?;
        debug!(job_id = %input.job_id, "applying to job");
        self.mutate(
            documents::CREATE_APPLICATION,
            json!({ "input": input }),
            "createApplication",
            &["GetMyApplications"],
        )
        .await
    }

    pub async fn job_applications(
        &self,
        job_id: &str,
        status: Option<ApplicationStatus>,
        page: Page,
    ) -> Result<Vec<Application>, ApiError> {
        let variables = json!({
            "jobId": job_id,
            "status": status,
            "limit": page.limit,
            "offset": page.offset,
        });
        self.query(
            documents::GET_JOB_APPLICATIONS,
            variables,
            "jobApplications",
            FetchPolicy::NetworkOnly,
        )
        .await
    }

    pub async fn review_application(
        &self,
        id: &str,
        input: UpdateApplicationInput,
    ) -> Result<Application, ApiError> {
        self.mutate(
            documents::UPDATE_APPLICATION,
            json!({ "id": id, "input": input }),
            "updateApplication",
            APPLICATION_QUERIES,
        )
        .await
    }

    // -- companies ----------------------------------------------------------

    /// The employer's company, served from cache when present.
    pub async fn my_company(&self) -> Result<Option<Company>, ApiError> {
        self.query(
            documents::GET_MY_COMPANY,
            json!({}),
            "myCompany",
            FetchPolicy::CacheFirst,
        )
        .await
    }

    pub async fn create_company(&self, input: CreateCompanyInput) -> Result<Company, ApiError> {
        self.require_role(Role::Employer)?;
        forms::validate_company(&input, Utc::now().year())?;
        self.mutate(
            documents::CREATE_COMPANY,
            json!({ "input": input }),
            "createCompany",
            COMPANY_QUERIES,
        )
        .await
    }

    // -- subscriptions ------------------------------------------------------

    pub async fn job_created(&self) -> Result<EventStream<Job>, ApiError> {
        self.subscribe(documents::JOB_CREATED_SUBSCRIPTION, "jobCreated")
            .await
    }

    pub async fn application_status_changed(&self) -> Result<EventStream<Application>, ApiError> {
        self.subscribe(
            documents::APPLICATION_STATUS_CHANGED_SUBSCRIPTION,
            "applicationStatusChanged",
        )
        .await
    }
}

/// Pull `field` out of a result's `data` and decode it.
fn decode_field<T: DeserializeOwned>(mut data: Value, field: &'static str) -> Result<T, ApiError> {
    let value = data
        .get_mut(field)
        .map(Value::take)
        .ok_or_else(|| TransportError::MissingField(field.to_string()))?;
    serde_json::from_value(value).map_err(|source| ApiError::Decode { field, source })
}

/// A subscription whose events are decoded from one root field.
pub struct EventStream<T> {
    inner: Subscription,
    field: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> EventStream<T> {
    fn new(inner: Subscription, field: &'static str) -> Self {
        Self {
            inner,
            field,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> &str {
        self.inner.id()
    }
}

impl<T: DeserializeOwned> Stream for EventStream<T> {
    type Item = Result<T, ApiError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let field = self.field;
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(item)) => Poll::Ready(Some(
                item.and_then(|response| response.into_data())
                    .map_err(ApiError::from)
                    .and_then(|data| decode_field(data, field)),
            )),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
