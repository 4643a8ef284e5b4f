// Job board operations on top of the GraphQL transport: the documents, form
// validation, and the typed API with its authentication flows.

pub mod api;
pub mod documents;
pub mod error;
pub mod forms;

pub use api::{EventStream, JobBoard};
pub use error::ApiError;
pub use forms::{FieldError, JobDraft, ValidationErrors};
