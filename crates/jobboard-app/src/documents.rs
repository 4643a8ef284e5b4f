// GraphQL documents sent by the client. Each selects exactly the fields the
// corresponding API call decodes.

pub const LOGIN: &str = r#"
mutation Login($input: LoginInput!) {
  login(input: $input) {
    token
    user {
      id
      email
      firstName
      lastName
      role
    }
  }
}
"#;

pub const REGISTER: &str = r#"
mutation Register($input: RegisterInput!) {
  register(input: $input) {
    token
    user {
      id
      email
      firstName
      lastName
      role
    }
  }
}
"#;

pub const GET_ME: &str = r#"
query GetMe {
  me {
    id
    email
    firstName
    lastName
    role
    phone
    avatar
    bio
    skills
    experience
    location
  }
}
"#;

pub const GET_JOBS: &str = r#"
query GetJobs($filters: JobFilters, $limit: Int, $offset: Int) {
  jobs(filters: $filters, limit: $limit, offset: $offset) {
    id
    title
    description
    requirements
    salaryMin
    salaryMax
    currency
    employmentType
    location
    remote
    status
    company {
      id
      name
      logo
      location
    }
    category
    experienceLevel
    skills
    applicationsCount
    viewsCount
    createdAt
  }
}
"#;

pub const GET_JOB: &str = r#"
query GetJob($id: ID!) {
  job(id: $id) {
    id
    title
    description
    requirements
    salaryMin
    salaryMax
    currency
    employmentType
    location
    remote
    status
    company {
      id
      name
      description
      logo
      website
      industry
      size
      location
    }
    category
    experienceLevel
    skills
    applicationsCount
    viewsCount
    createdAt
  }
}
"#;

pub const GET_MY_JOBS: &str = r#"
query GetMyJobs($status: JobStatus, $limit: Int, $offset: Int) {
  myJobs(status: $status, limit: $limit, offset: $offset) {
    id
    title
    description
    requirements
    salaryMin
    salaryMax
    currency
    employmentType
    location
    remote
    status
    company {
      id
      name
    }
    category
    experienceLevel
    skills
    applicationsCount
    viewsCount
    createdAt
  }
}
"#;

pub const CREATE_JOB: &str = r#"
mutation CreateJob($input: CreateJobInput!) {
  createJob(input: $input) {
    id
    title
    description
    status
  }
}
"#;

pub const PUBLISH_JOB: &str = r#"
mutation PublishJob($id: ID!) {
  publishJob(id: $id) {
    id
    status
  }
}
"#;

pub const GET_MY_APPLICATIONS: &str = r#"
query GetMyApplications($status: ApplicationStatus, $limit: Int, $offset: Int) {
  myApplications(status: $status, limit: $limit, offset: $offset) {
    id
    job {
      id
      title
      company {
        id
        name
        logo
      }
    }
    status
    coverLetter
    createdAt
  }
}
"#;

pub const CREATE_APPLICATION: &str = r#"
mutation CreateApplication($input: CreateApplicationInput!) {
  createApplication(input: $input) {
    id
    status
    job {
      id
      title
    }
  }
}
"#;

pub const GET_JOB_APPLICATIONS: &str = r#"
query GetJobApplications($jobId: ID!, $status: ApplicationStatus, $limit: Int, $offset: Int) {
  jobApplications(jobId: $jobId, status: $status, limit: $limit, offset: $offset) {
    id
    candidate {
      id
      firstName
      lastName
      email
      skills
      experience
    }
    coverLetter
    status
    notes
    reviewedBy {
      id
      firstName
      lastName
    }
    reviewedAt
    createdAt
  }
}
"#;

pub const UPDATE_APPLICATION: &str = r#"
mutation UpdateApplication($id: ID!, $input: UpdateApplicationInput!) {
  updateApplication(id: $id, input: $input) {
    id
    status
    notes
  }
}
"#;

pub const GET_MY_COMPANY: &str = r#"
query GetMyCompany {
  myCompany {
    id
    name
    description
    website
    logo
    industry
    size
    location
    foundedYear
    owner {
      id
      firstName
      lastName
    }
  }
}
"#;

pub const CREATE_COMPANY: &str = r#"
mutation CreateCompany($input: CreateCompanyInput!) {
  createCompany(input: $input) {
    id
    name
    description
  }
}
"#;

pub const JOB_CREATED_SUBSCRIPTION: &str = r#"
subscription JobCreated {
  jobCreated {
    id
    title
    description
    company {
      id
      name
    }
    createdAt
  }
}
"#;

pub const APPLICATION_STATUS_CHANGED_SUBSCRIPTION: &str = r#"
subscription ApplicationStatusChanged {
  applicationStatusChanged {
    id
    status
    job {
      id
      title
    }
    candidate {
      id
      firstName
      lastName
    }
  }
}
"#;

/// Every document, for checks that apply to all of them.
pub const ALL: &[&str] = &[
    LOGIN,
    REGISTER,
    GET_ME,
    GET_JOBS,
    GET_JOB,
    GET_MY_JOBS,
    CREATE_JOB,
    PUBLISH_JOB,
    GET_MY_APPLICATIONS,
    CREATE_APPLICATION,
    GET_JOB_APPLICATIONS,
    UPDATE_APPLICATION,
    GET_MY_COMPANY,
    CREATE_COMPANY,
    JOB_CREATED_SUBSCRIPTION,
    APPLICATION_STATUS_CHANGED_SUBSCRIPTION,
];
