// src/expression/mod.rs

//! Codebase expressions
//!
//! An expression describes how to derive a codebase: start from a
//! repository (optionally at a revision), then translate it into another
//! project space and/or run editors over it.
//!
//! ```text
//! internal(revision=a983ef)>public|renamer
//! ```
//!
//! reads "repository `internal` at revision `a983ef`, translated to the
//! `public` project space, then edited by the editor named `renamer`".
//! The reserved repository name `file` reads a local directory or archive
//! instead of a configured repository.
//!
//! Expressions are immutable trees with shared sub-expressions. Evaluating
//! one performs I/O every time; nothing is cached.

pub mod parser;
pub mod term;

pub use parser::{ExpressionSyntaxError, parse_expression, parse_repository_expression};
pub use term::{Options, Term};

use crate::codebase::{Codebase, CodebaseCreationError, FileCodebaseCreator};
use crate::project::ProjectContext;
use crate::repository::CodebaseCreator;
use crate::ui::Ui;
use crate::writer::{Writer, WritingError};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Repository name that bypasses the registry and reads the local filesystem
pub const FILE_REPOSITORY: &str = "file";

/// Option naming the revision to check out
pub const REVISION_OPTION: &str = "revision";

/// Operators that chain a term onto an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `>`: translate into the project space named by the term
    Translate,
    /// `|`: apply the editor named by the term
    Edit,
}

impl Operator {
    pub fn symbol(&self) -> char {
        match self {
            Operator::Translate => '>',
            Operator::Edit => '|',
        }
    }
}

/// The root of every expression: a repository and its checkout options
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryExpression {
    term: Term,
}

impl RepositoryExpression {
    pub fn new(term: Term) -> Self {
        Self { term }
    }

    pub fn named(repository: impl Into<String>) -> Self {
        Self::new(Term::named(repository))
    }

    /// Add an option, e.g. `repo` -> `repo(revision=4)`
    pub fn with_option(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(self.term.with_option(key, value))
    }

    pub fn at_revision(&self, revision: impl Into<String>) -> Self {
        self.with_option(REVISION_OPTION, revision)
    }

    pub fn repository_name(&self) -> &str {
        &self.term.identifier
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.term.option(key)
    }

    pub fn term(&self) -> &Term {
        &self.term
    }

    /// Materialize this repository checkout
    pub fn create_codebase(
        &self,
        context: &ProjectContext,
        ui: &dyn Ui,
    ) -> Result<Codebase, CodebaseCreationError> {
        let name = self.repository_name();
        let task = ui.push_task("create_codebase", &format!("Creating from '{}'", self));

        // `file` is resolved before the registry so it can never be shadowed
        let result = if name == FILE_REPOSITORY {
            FileCodebaseCreator::new(context.scratch()).create(&self.term.options)
        } else {
            context
                .repository(name)
                .ok_or_else(|| CodebaseCreationError::UnknownRepository(name.to_string()))
                .and_then(|repository| repository.codebase_creator().create(&self.term.options))
        };
        finish(ui, task, result, "Error creating codebase")
    }

    /// Check out this repository as a destination for new content
    pub fn create_writer(
        &self,
        context: &ProjectContext,
        ui: &dyn Ui,
    ) -> Result<Box<dyn Writer>, WritingError> {
        let name = self.repository_name();
        let task = ui.push_task("create_writer", &format!("Creating writer \"{}\"", self.term));
        let result = context
            .repository(name)
            .ok_or_else(|| WritingError::UnknownRepository(name.to_string()))
            .and_then(|repository| repository.writer_creator().create(&self.term.options));
        match result {
            Ok(writer) => {
                ui.pop_task_and_persist(task, &writer.root().display().to_string());
                Ok(writer)
            }
            Err(e) => {
                ui.error(&e, "Error creating writer");
                ui.pop_task_and_persist(task, "failed");
                Err(e)
            }
        }
    }
}

impl fmt::Display for RepositoryExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.term)
    }
}

/// A codebase expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    Repository(RepositoryExpression),
    Translate {
        operand: Arc<Expression>,
        term: Term,
    },
    Edit {
        operand: Arc<Expression>,
        term: Term,
    },
}

impl Expression {
    /// Chain `term` onto this expression with `operator`
    pub fn apply(self, operator: Operator, term: Term) -> Self {
        let operand = Arc::new(self);
        match operator {
            Operator::Translate => Expression::Translate { operand, term },
            Operator::Edit => Expression::Edit { operand, term },
        }
    }

    /// `self>project_space`
    pub fn translate_to(&self, project_space: impl Into<String>) -> Self {
        self.clone().apply(Operator::Translate, Term::named(project_space))
    }

    /// `self|editor(options)`
    pub fn edit_with(&self, editor: impl Into<String>, options: Options) -> Self {
        self.clone().apply(Operator::Edit, Term::new(editor, options))
    }

    /// The repository expression this chain starts from
    pub fn root(&self) -> &RepositoryExpression {
        match self {
            Expression::Repository(repo) => repo,
            Expression::Translate { operand, .. } | Expression::Edit { operand, .. } => {
                operand.root()
            }
        }
    }

    /// Evaluate this expression into a materialized codebase
    pub fn create_codebase(
        &self,
        context: &ProjectContext,
        ui: &dyn Ui,
    ) -> Result<Codebase, CodebaseCreationError> {
        match self {
            Expression::Repository(repo) => repo.create_codebase(context, ui),
            Expression::Translate { operand, term } => {
                let input = operand.create_codebase(context, ui)?;
                if input.project_space() == term.identifier {
                    // Already there; only the recorded expression changes
                    return Ok(Codebase::new(input.path(), input.project_space(), self.clone()));
                }
                let task = ui.push_task(
                    "translate",
                    &format!(
                        "Translating '{}' from project space '{}' to '{}'",
                        operand,
                        input.project_space(),
                        term.identifier
                    ),
                );
                let result = context
                    .translator(input.project_space(), &term.identifier)
                    .ok_or_else(|| CodebaseCreationError::NoTranslator {
                        from: input.project_space().to_string(),
                        to: term.identifier.clone(),
                    })
                    .and_then(|translator| translator.translate(&input, &term.options, self));
                finish(ui, task, result, "Error translating codebase")
            }
            Expression::Edit { operand, term } => {
                let input = operand.create_codebase(context, ui)?;
                let task = ui.push_task(
                    "edit",
                    &format!("Editing '{}' with editor '{}'", operand, term.identifier),
                );
                let result = context
                    .editor(&term.identifier)
                    .ok_or_else(|| CodebaseCreationError::UnknownEditor(term.identifier.clone()))
                    .and_then(|editor| editor.edit(&input, &term.options))
                    .map(|path| Codebase::new(path, input.project_space(), self.clone()));
                finish(ui, task, result, "Error editing codebase")
            }
        }
    }
}

fn finish(
    ui: &dyn Ui,
    task: crate::ui::Task,
    result: Result<Codebase, CodebaseCreationError>,
    message: &str,
) -> Result<Codebase, CodebaseCreationError> {
    match &result {
        Ok(codebase) => ui.pop_task_and_persist(task, &codebase.path().display().to_string()),
        Err(e) => {
            ui.error(e, message);
            ui.pop_task_and_persist(task, "failed");
        }
    }
    result
}

impl From<RepositoryExpression> for Expression {
    fn from(repo: RepositoryExpression) -> Self {
        Expression::Repository(repo)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Repository(repo) => write!(f, "{}", repo),
            Expression::Translate { operand, term } => {
                write!(f, "{}{}{}", operand, Operator::Translate.symbol(), term)
            }
            Expression::Edit { operand, term } => {
                write!(f, "{}{}{}", operand, Operator::Edit.symbol(), term)
            }
        }
    }
}

impl FromStr for Expression {
    type Err = ExpressionSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_expression(s)
    }
}

impl FromStr for RepositoryExpression {
    type Err = ExpressionSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_repository_expression(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::SystemCommandRunner;
    use crate::repository::DummyRepository;
    use crate::scratch::Scratch;
    use crate::ui::Task;
    use std::error::Error as StdError;
    use std::sync::Mutex;

    /// Records every notification as a short line
    #[derive(Default)]
    struct RecordingUi {
        events: Mutex<Vec<String>>,
    }

    impl RecordingUi {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn record(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl Ui for RecordingUi {
        fn push_task(&self, name: &str, description: &str) -> Task {
            self.record(format!("push {}", name));
            Task {
                name: name.to_string(),
                description: description.to_string(),
                depth: 0,
            }
        }

        fn pop_task_and_persist(&self, task: Task, result: &str) {
            self.record(format!("pop {} {}", task.name, result));
        }

        fn error(&self, _err: &dyn StdError, message: &str) {
            self.record(format!("error {}", message));
        }

        fn info(&self, _message: &str) {}

        fn debug(&self, _message: &str) {}
    }

    fn context() -> ProjectContext {
        let scratch = Arc::new(Scratch::new().unwrap());
        ProjectContext::new("test", Arc::new(SystemCommandRunner::new()), scratch.clone())
            .with_repository(
                DummyRepository::linear("public", "public", &["a"], scratch).into_repository_type(),
            )
    }

    #[test]
    fn test_create_codebase_notifies_begin_and_end() {
        let dir = tempfile::tempdir().unwrap();
        let ui = RecordingUi::default();
        let expression = RepositoryExpression::named("file")
            .with_option("path", dir.path().display().to_string());

        let codebase = expression.create_codebase(&context(), &ui).unwrap();
        assert_eq!(
            ui.events(),
            vec![
                "push create_codebase".to_string(),
                format!("pop create_codebase {}", codebase.path().display()),
            ]
        );
    }

    #[test]
    fn test_create_codebase_unknown_repository_notifies_error() {
        let ui = RecordingUi::default();
        let err = RepositoryExpression::named("nowhere")
            .create_codebase(&context(), &ui)
            .unwrap_err();

        assert!(matches!(err, CodebaseCreationError::UnknownRepository(_)));
        assert_eq!(
            ui.events(),
            vec![
                "push create_codebase",
                "error Error creating codebase",
                "pop create_codebase failed",
            ]
        );
    }

    #[test]
    fn test_create_writer_notifies_begin_and_end() {
        let ui = RecordingUi::default();
        let writer = RepositoryExpression::named("public")
            .create_writer(&context(), &ui)
            .unwrap();
        assert_eq!(
            ui.events(),
            vec![
                "push create_writer".to_string(),
                format!("pop create_writer {}", writer.root().display()),
            ]
        );
    }

    #[test]
    fn test_create_writer_unknown_repository_notifies_error() {
        let ui = RecordingUi::default();
        let err = RepositoryExpression::named("nowhere")
            .create_writer(&context(), &ui)
            .err()
            .unwrap();

        assert!(matches!(err, WritingError::UnknownRepository(_)));
        assert_eq!(
            ui.events(),
            vec![
                "push create_writer",
                "error Error creating writer",
                "pop create_writer failed",
            ]
        );
    }

    #[test]
    fn test_at_revision_builds_new_expression() {
        let base = RepositoryExpression::named("internal");
        let at = base.at_revision("a983ef");
        assert_eq!(base.to_string(), "internal");
        assert_eq!(at.to_string(), "internal(revision=a983ef)");
    }

    #[test]
    fn test_builders_share_operand() {
        let base: Expression = RepositoryExpression::named("internal").at_revision("3").into();
        let public = base.translate_to("public");
        let edited = public.edit_with("scrub", Options::new().with("level", "2"));
        assert_eq!(edited.to_string(), "internal(revision=3)>public|scrub(level=2)");
        assert_eq!(public.to_string(), "internal(revision=3)>public");
        assert_eq!(edited.root().option("revision"), Some("3"));
    }

    #[test]
    fn test_from_str() {
        let expr: Expression = "a>b".parse().unwrap();
        assert!(matches!(expr, Expression::Translate { .. }));
        assert!("a>b".parse::<RepositoryExpression>().is_err());
    }
}
