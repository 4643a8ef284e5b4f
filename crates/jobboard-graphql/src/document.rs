// GraphQL operation documents: finding the main definition of a document and
// bundling it with its variables.
//
// Only as much of the GraphQL grammar is understood as is needed to locate
// top-level definitions: punctuation nesting, names, string and block-string
// literals, and comments. Field-level syntax is never interpreted.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::protocol::OperationPayload;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }

    fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "query" => Some(OperationKind::Query),
            "mutation" => Some(OperationKind::Mutation),
            "subscription" => Some(OperationKind::Subscription),
            _ => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The definition that decides how a document is executed: the first
/// operation definition, or the first fragment definition when the document
/// holds no operation at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainDefinition {
    Operation {
        kind: OperationKind,
        name: Option<String>,
    },
    Fragment {
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("document contains no operation or fragment definition")]
    NoDefinition,

    #[error("unterminated string starting at byte {offset}")]
    UnterminatedString { offset: usize },

    #[error("unbalanced `{found}` at byte {offset}")]
    Unbalanced { found: char, offset: usize },

    #[error("unclosed `{open}` opened at byte {offset}")]
    Unclosed { open: char, offset: usize },

    #[error("fragment definition at byte {offset} has no name")]
    UnnamedFragment { offset: usize },
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A parsed GraphQL document together with its variables.
#[derive(Debug, Clone)]
pub struct Operation {
    document: Arc<str>,
    variables: Value,
    main: MainDefinition,
}

impl Operation {
    /// Parse `document` and attach `variables`. `Value::Null` is sent as an
    /// empty variables object.
    pub fn parse(document: impl Into<Arc<str>>, variables: Value) -> Result<Self, DocumentError> {
        let document = document.into();
        let main = main_definition(&document)?;
        let variables = match variables {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Ok(Self {
            document,
            variables,
            main,
        })
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn variables(&self) -> &Value {
        &self.variables
    }

    pub fn main_definition(&self) -> &MainDefinition {
        &self.main
    }

    /// Kind of the main operation. `None` for a fragment-only document.
    pub fn kind(&self) -> Option<OperationKind> {
        match &self.main {
            MainDefinition::Operation { kind, .. } => Some(*kind),
            MainDefinition::Fragment { .. } => None,
        }
    }

    pub fn is_subscription(&self) -> bool {
        self.kind() == Some(OperationKind::Subscription)
    }

    pub fn name(&self) -> Option<&str> {
        match &self.main {
            MainDefinition::Operation { name, .. } => name.as_deref(),
            MainDefinition::Fragment { .. } => None,
        }
    }

    /// The `{query, variables, operationName}` body sent on either channel.
    pub fn payload(&self) -> OperationPayload<'_> {
        OperationPayload {
            query: &self.document,
            variables: &self.variables,
            operation_name: self.name(),
        }
    }

    /// Same document with different variables; the document is not rescanned.
    pub fn with_variables(&self, variables: Value) -> Self {
        Self {
            document: Arc::clone(&self.document),
            variables: match variables {
                Value::Null => Value::Object(Map::new()),
                other => other,
            },
            main: self.main.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Name(&'a str, usize),
    Open(char, usize),
    Close(char, usize),
    Other,
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skip ignored tokens: whitespace, commas, the byte-order mark, and
    /// `#` comments.
    fn skip_ignored(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\n' | '\r' | ',' | '\u{feff}' => {
                    self.bump();
                }
                '#' => {
                    while let Some(c) = self.bump() {
                        if c == '\n' || c == '\r' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>, DocumentError> {
        self.skip_ignored();
        let start = self.pos;
        let Some(c) = self.bump() else {
            return Ok(None);
        };

        let token = match c {
            '{' | '(' | '[' => Token::Open(c, start),
            '}' | ')' | ']' => Token::Close(c, start),
            '"' => {
                self.skip_string(start)?;
                Token::Other
            }
            c if c == '_' || c.is_ascii_alphabetic() => {
                while self
                    .peek()
                    .is_some_and(|c| c == '_' || c.is_ascii_alphanumeric())
                {
                    self.bump();
                }
                Token::Name(&self.src[start..self.pos], start)
            }
            c if c == '-' || c.is_ascii_digit() => {
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'))
                {
                    self.bump();
                }
                Token::Other
            }
            _ => Token::Other,
        };
        Ok(Some(token))
    }

    /// Skip a string literal whose opening quote (at `start`) was consumed.
    fn skip_string(&mut self, start: usize) -> Result<(), DocumentError> {
        if self.rest().starts_with("\"\"") {
            self.pos += 2;
            return self.skip_block_string(start);
        }
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '"' => return Ok(()),
                '\n' | '\r' => break,
                _ => {}
            }
        }
        Err(DocumentError::UnterminatedString { offset: start })
    }

    fn skip_block_string(&mut self, start: usize) -> Result<(), DocumentError> {
        loop {
            let rest = self.rest();
            if rest.starts_with("\\\"\"\"") {
                self.pos += 4;
            } else if rest.starts_with("\"\"\"") {
                self.pos += 3;
                return Ok(());
            } else if self.bump().is_none() {
                return Err(DocumentError::UnterminatedString { offset: start });
            }
        }
    }
}

/// What the scanner expects from the next name token at the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Definition,
    OperationName(OperationKind),
    FragmentName(usize),
    Body,
    /// Inside a type-system definition (`type`, `extend`, `scalar`, ...).
    /// Its selection sets are not query shorthands, but an operation or
    /// fragment keyword still starts the next executable definition.
    Skipped,
}

/// Find the main definition of `document`.
///
/// The whole document is scanned so that unbalanced delimiters and
/// unterminated strings are reported even after the main definition.
pub fn main_definition(document: &str) -> Result<MainDefinition, DocumentError> {
    let mut scanner = Scanner::new(document);
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut pending = Pending::Definition;
    let mut first_operation: Option<MainDefinition> = None;
    let mut first_fragment: Option<String> = None;

    while let Some(token) = scanner.next_token()? {
        let top_level = stack.is_empty();

        // An operation keyword may be followed by a name; anything else
        // means the operation is anonymous.
        if let Pending::OperationName(kind) = pending {
            let name = match token {
                Token::Name(name, _) if top_level => Some(name.to_string()),
                _ => None,
            };
            first_operation.get_or_insert(MainDefinition::Operation { kind, name });
            pending = Pending::Body;
            if matches!(token, Token::Name(..)) {
                continue;
            }
        }

        match token {
            Token::Name(word, offset) if top_level => match pending {
                Pending::Definition | Pending::Skipped => {
                    if let Some(kind) = OperationKind::from_keyword(word) {
                        pending = Pending::OperationName(kind);
                    } else if word == "fragment" {
                        pending = Pending::FragmentName(offset);
                    } else {
                        pending = Pending::Skipped;
                    }
                }
                Pending::FragmentName(_) => {
                    first_fragment.get_or_insert_with(|| word.to_string());
                    pending = Pending::Body;
                }
                Pending::OperationName(_) | Pending::Body => {}
            },
            Token::Open(open, offset) => {
                if top_level {
                    if let Pending::FragmentName(at) = pending {
                        return Err(DocumentError::UnnamedFragment { offset: at });
                    }
                    // Query shorthand: a bare selection set.
                    if open == '{' && pending == Pending::Definition {
                        first_operation.get_or_insert(MainDefinition::Operation {
                            kind: OperationKind::Query,
                            name: None,
                        });
                    }
                }
                stack.push((open, offset));
            }
            Token::Close(close, offset) => {
                let expected = match stack.pop() {
                    Some(('{', _)) => '}',
                    Some(('(', _)) => ')',
                    Some(('[', _)) => ']',
                    _ => return Err(DocumentError::Unbalanced { found: close, offset }),
                };
                if close != expected {
                    return Err(DocumentError::Unbalanced { found: close, offset });
                }
                // A selection set closing at the top level ends the definition.
                if stack.is_empty() && close == '}' {
                    pending = Pending::Definition;
                }
            }
            Token::Name(..) | Token::Other => {}
        }
    }

    if let Some((open, offset)) = stack.pop() {
        return Err(DocumentError::Unclosed { open, offset });
    }
    if let Pending::OperationName(kind) = pending {
        first_operation.get_or_insert(MainDefinition::Operation { kind, name: None });
    }

    match (first_operation, first_fragment) {
        (Some(operation), _) => Ok(operation),
        (None, Some(name)) => Ok(MainDefinition::Fragment { name }),
        (None, None) => Err(DocumentError::NoDefinition),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(kind: OperationKind, name: Option<&str>) -> MainDefinition {
        MainDefinition::Operation {
            kind,
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn named_query() {
        let doc = "query GetJob($id: ID!) { job(id: $id) { id title } }";
        assert_eq!(
            main_definition(doc).unwrap(),
            op(OperationKind::Query, Some("GetJob"))
        );
    }

    #[test]
    fn named_mutation() {
        let doc = "mutation Login($input: LoginInput!) { login(input: $input) { token } }";
        assert_eq!(
            main_definition(doc).unwrap(),
            op(OperationKind::Mutation, Some("Login"))
        );
    }

    #[test]
    fn subscription_without_variables() {
        let doc = "\n  subscription JobCreated {\n    jobCreated { id title }\n  }\n";
        assert_eq!(
            main_definition(doc).unwrap(),
            op(OperationKind::Subscription, Some("JobCreated"))
        );
    }

    #[test]
    fn anonymous_operations() {
        assert_eq!(
            main_definition("subscription { jobCreated { id } }").unwrap(),
            op(OperationKind::Subscription, None)
        );
        assert_eq!(
            main_definition("mutation($id: ID!) { publishJob(id: $id) { id } }").unwrap(),
            op(OperationKind::Mutation, None)
        );
    }

    #[test]
    fn shorthand_selection_set_is_a_query() {
        assert_eq!(
            main_definition("{ me { id } }").unwrap(),
            op(OperationKind::Query, None)
        );
    }

    #[test]
    fn first_operation_wins_over_leading_fragment() {
        let doc = r#"
            fragment JobFields on Job { id title }
            subscription Watch { jobCreated { ...JobFields } }
            query Later { jobs { ...JobFields } }
        "#;
        assert_eq!(
            main_definition(doc).unwrap(),
            op(OperationKind::Subscription, Some("Watch"))
        );
    }

    #[test]
    fn fragment_only_document_falls_back_to_fragment() {
        let doc = "fragment CompanyFields on Company { id name }";
        assert_eq!(
            main_definition(doc).unwrap(),
            MainDefinition::Fragment {
                name: "CompanyFields".into()
            }
        );
    }

    #[test]
    fn keywords_in_comments_and_strings_are_ignored() {
        let doc = r#"
            # subscription Fake { jobCreated { id } }
            query Search {
              jobs(filters: { search: "subscription {" }) { id }
              job(id: """ mutation """) { id }
            }
        "#;
        assert_eq!(
            main_definition(doc).unwrap(),
            op(OperationKind::Query, Some("Search"))
        );
    }

    #[test]
    fn nested_field_named_like_keyword_is_not_a_definition() {
        let doc = "query Q { subscription { id } mutation }";
        assert_eq!(
            main_definition(doc).unwrap(),
            op(OperationKind::Query, Some("Q"))
        );
    }

    #[test]
    fn variable_defaults_with_objects_are_skipped() {
        let doc = "query Q($f: JobFilters = { remote: true, search: \"x\" }, $n: Int = -1) { jobs(filters: $f, limit: $n) { id } }";
        assert_eq!(
            main_definition(doc).unwrap(),
            op(OperationKind::Query, Some("Q"))
        );
    }

    #[test]
    fn escaped_quotes_in_strings() {
        let doc = r#"query Q { jobs(filters: { search: "say \"hi\" }" }) { id } }"#;
        assert_eq!(
            main_definition(doc).unwrap(),
            op(OperationKind::Query, Some("Q"))
        );
    }

    #[test]
    fn type_system_definitions_are_not_operations() {
        for doc in [
            "type Foo { id: ID }",
            "extend type Query { jobs: [Job] }",
            "schema { query: Query }",
        ] {
            assert_eq!(main_definition(doc), Err(DocumentError::NoDefinition), "{doc}");
        }
    }

    #[test]
    fn operation_after_type_system_definition() {
        let doc = "scalar DateTime\ntype Job { id: ID }\nsubscription OnJobCreated { jobCreated { id } }";
        assert_eq!(
            main_definition(doc).unwrap(),
            op(OperationKind::Subscription, Some("OnJobCreated"))
        );
    }

    #[test]
    fn empty_document_is_rejected() {
        assert_eq!(main_definition(""), Err(DocumentError::NoDefinition));
        assert_eq!(
            main_definition("  # only a comment\n"),
            Err(DocumentError::NoDefinition)
        );
    }

    #[test]
    fn unterminated_string_is_rejected() {
        let err = main_definition("query Q { jobs(filters: { search: \"open }) { id } }")
            .unwrap_err();
        assert!(matches!(err, DocumentError::UnterminatedString { .. }));

        let err = main_definition("query Q { job(id: \"\"\"never closed) }").unwrap_err();
        assert!(matches!(err, DocumentError::UnterminatedString { .. }));
    }

    #[test]
    fn unbalanced_delimiters_are_rejected() {
        assert!(matches!(
            main_definition("query Q { jobs { id }"),
            Err(DocumentError::Unclosed { open: '{', .. })
        ));
        assert!(matches!(
            main_definition("query Q { jobs { id } } }"),
            Err(DocumentError::Unbalanced { found: '}', .. })
        ));
        assert!(matches!(
            main_definition("query Q($id: ID!] { job { id } }"),
            Err(DocumentError::Unbalanced { found: ']', .. })
        ));
    }

    #[test]
    fn unnamed_fragment_is_rejected() {
        assert!(matches!(
            main_definition("fragment { id }"),
            Err(DocumentError::UnnamedFragment { offset: 0 })
        ));
    }

    #[test]
    fn operation_null_variables_become_empty_object() {
        let operation = Operation::parse("query GetMe { me { id } }", Value::Null).unwrap();
        assert_eq!(operation.variables(), &json!({}));
        assert_eq!(operation.name(), Some("GetMe"));
        assert_eq!(operation.kind(), Some(OperationKind::Query));
        assert!(!operation.is_subscription());
    }

    #[test]
    fn with_variables_reuses_document() {
        let base = Operation::parse("query GetJob($id: ID!) { job(id: $id) { id } }", json!({}))
            .unwrap();
        let bound = base.with_variables(json!({ "id": "42" }));
        assert_eq!(bound.variables(), &json!({ "id": "42" }));
        assert_eq!(bound.document(), base.document());
        assert_eq!(bound.main_definition(), base.main_definition());
    }

    #[test]
    fn payload_carries_operation_name() {
        let operation =
            Operation::parse("subscription JobCreated { jobCreated { id } }", json!({})).unwrap();
        let payload = serde_json::to_value(operation.payload()).unwrap();
        assert_eq!(
            payload,
            json!({
                "query": "subscription JobCreated { jobCreated { id } }",
                "variables": {},
                "operationName": "JobCreated"
            })
        );
    }
}
