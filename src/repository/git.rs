// src/repository/git.rs

//! The `git` backend
//!
//! All access goes through the `git` binary via a [`CommandRunner`]:
//!
//! - history: one clone into scratch storage, made on first use, queried
//!   with `git rev-parse` and `git log`
//! - codebases: `git archive` of the requested commit, unpacked into a
//!   fresh scratch directory
//! - writers: a fresh clone per writer, checked out at the tracked branch
//!   (or the `revision` option); drafts are staged with `git add --all`

use super::{
    CodebaseCreator, HistoryError, RepositoryType, Revision, RevisionHistory, RevisionMetadata,
    WriterCreator,
};
use crate::codebase::{Codebase, CodebaseCreationError};
use crate::command::{CommandError, CommandRunner};
use crate::expression::{Options, REVISION_OPTION, RepositoryExpression, Term};
use crate::scratch::Scratch;
use crate::writer::{
    DraftRevision, VCS_METADATA, Writer, WritingError, draft_description, sync_tree,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Branch name meaning "whatever the remote's HEAD points at"
pub const DEFAULT_BRANCH: &str = "HEAD";

/// `git log` format: hash, author, date, parents, body, NUL-separated
const LOG_FORMAT: &str = "--format=%H%x00%an <%ae>%x00%aI%x00%P%x00%B";

/// Run git with `args` inside `dir`, returning stdout
fn git(
    runner: &dyn CommandRunner,
    dir: Option<&Path>,
    args: &[&str],
) -> Result<String, CommandError> {
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    runner.run_stdout("git", &args, dir)
}

struct GitInner {
    name: String,
    url: String,
    branch: String,
    runner: Arc<dyn CommandRunner>,
    scratch: Arc<Scratch>,
    clone: Mutex<Option<PathBuf>>,
}

impl GitInner {
    /// The shared clone used for history and codebases, made on first use
    fn clone_dir(&self) -> Result<PathBuf, HistoryError> {
        let mut clone = self.clone.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(dir) = clone.as_ref() {
            return Ok(dir.clone());
        }

        let dir = self.scratch.dir(&format!("git_clone_{}", self.name))?;
        info!("Cloning {} into {}", self.url, dir.display());
        self.clone_to(&dir)?;
        *clone = Some(dir.clone());
        Ok(dir)
    }

    fn clone_to(&self, dir: &Path) -> Result<(), CommandError> {
        let target = dir.to_string_lossy();
        git(
            self.runner.as_ref(),
            None,
            &["clone", "--quiet", &self.url, &target],
        )?;
        Ok(())
    }

    /// Ref naming the tracked branch inside a clone
    fn branch_ref(&self) -> String {
        if self.branch == DEFAULT_BRANCH {
            DEFAULT_BRANCH.to_string()
        } else {
            format!("origin/{}", self.branch)
        }
    }

    /// Resolve `rev` to a full commit hash, `None` if it does not resolve
    fn resolve(&self, dir: &Path, rev: &str) -> Result<Option<String>, CommandError> {
        let spec = format!("{}^{{commit}}", rev);
        match git(
            self.runner.as_ref(),
            Some(dir),
            &["rev-parse", "--verify", "--quiet", &spec],
        ) {
            Ok(out) => Ok(Some(out.trim().to_string())),
            Err(CommandError::Failed { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// A repository served by the `git` binary
#[derive(Clone)]
pub struct GitRepository {
    inner: Arc<GitInner>,
    project_space: String,
}

impl GitRepository {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        branch: Option<String>,
        project_space: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
        scratch: Arc<Scratch>,
    ) -> Self {
        Self {
            inner: Arc::new(GitInner {
                name: name.into(),
                url: url.into(),
                branch: branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
                runner,
                scratch,
                clone: Mutex::new(None),
            }),
            project_space: project_space.into(),
        }
    }

    pub fn into_repository_type(self) -> RepositoryType {
        let name = self.inner.name.clone();
        let project_space = self.project_space.clone();
        let repo = Arc::new(self);
        RepositoryType::new(name, project_space, repo.clone(), repo.clone(), repo)
    }

    fn unknown(&self, revision: &str) -> HistoryError {
        HistoryError::UnknownRevision {
            repository: self.inner.name.clone(),
            revision: revision.to_string(),
        }
    }
}

impl RevisionHistory for GitRepository {
    fn find_head_revision(&self, id: Option<&str>) -> Result<Option<Revision>, HistoryError> {
        let dir = self.inner.clone_dir()?;
        match id {
            // An empty repository has no head; that is not an error
            None => Ok(self
                .inner
                .resolve(&dir, &self.inner.branch_ref())?
                .map(|hash| Revision::new(&self.inner.name, hash))),
            Some(id) => self
                .inner
                .resolve(&dir, id)?
                .map(|hash| Some(Revision::new(&self.inner.name, hash)))
                .ok_or_else(|| self.unknown(id)),
        }
    }

    fn metadata(&self, revision: &Revision) -> Result<RevisionMetadata, HistoryError> {
        let dir = self.inner.clone_dir()?;
        let out = match git(
            self.inner.runner.as_ref(),
            Some(&dir),
            &["log", "-n1", LOG_FORMAT, &revision.id, "--"],
        ) {
            Ok(out) => out,
            Err(CommandError::Failed { .. }) => return Err(self.unknown(&revision.id)),
            Err(e) => return Err(e.into()),
        };
        parse_log_entry(&self.inner.name, &out)
    }
}

/// Parse one entry of `git log` output in [`LOG_FORMAT`]
fn parse_log_entry(repository: &str, out: &str) -> Result<RevisionMetadata, HistoryError> {
    let fields: Vec<&str> = out.splitn(5, '\0').collect();
    let [id, author, date, parents, body] = fields[..] else {
        return Err(HistoryError::Malformed {
            repository: repository.to_string(),
            message: format!("expected 5 fields in log entry, got {}", fields.len()),
        });
    };

    Ok(RevisionMetadata {
        id: id.trim().to_string(),
        author: author.to_string(),
        date: date.to_string(),
        description: body.trim_end().to_string(),
        parents: parents
            .split_whitespace()
            .map(|p| Revision::new(repository, p))
            .collect(),
    })
}

impl CodebaseCreator for GitRepository {
    fn create(&self, options: &Options) -> Result<Codebase, CodebaseCreationError> {
        let head = self
            .find_head_revision(options.get(REVISION_OPTION))?
            .ok_or_else(|| self.unknown(&self.inner.branch))?;

        let dir = self.inner.clone_dir()?;
        let archive = self.inner.scratch.file("git_archive.tar");
        let archive_arg = archive.to_string_lossy();
        debug!("Archiving {} at {}", self.inner.name, head.id);
        git(
            self.inner.runner.as_ref(),
            Some(&dir),
            &["archive", "--format=tar", "-o", &archive_arg, &head.id],
        )?;

        let dest = self
            .inner
            .scratch
            .dir(&format!("git_export_{}", self.inner.name))?;
        tar::Archive::new(File::open(&archive)?).unpack(&dest)?;
        std::fs::remove_file(&archive)?;

        let term = Term::new(&self.inner.name, options.clone()).with_option(REVISION_OPTION, head.id);
        Ok(Codebase::new(
            dest,
            &self.project_space,
            RepositoryExpression::new(term).into(),
        ))
    }
}

impl WriterCreator for GitRepository {
    fn create(&self, options: &Options) -> Result<Box<dyn Writer>, WritingError> {
        let root = self
            .inner
            .scratch
            .dir(&format!("git_writer_{}", self.inner.name))?;
        info!("Checking out {} into {}", self.inner.url, root.display());
        self.inner.clone_to(&root)?;

        let checkout = match options.get(REVISION_OPTION) {
            Some(revision) => Some(revision.to_string()),
            None if self.inner.branch != DEFAULT_BRANCH => Some(self.inner.branch.clone()),
            None => None,
        };
        if let Some(target) = checkout {
            git(
                self.inner.runner.as_ref(),
                Some(&root),
                &["checkout", "--quiet", &target],
            )?;
        }

        Ok(Box::new(GitWriter {
            root,
            runner: self.inner.runner.clone(),
        }))
    }
}

/// A git working copy accepting drafts as staged changes
pub struct GitWriter {
    root: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl Writer for GitWriter {
    fn root(&self) -> &Path {
        &self.root
    }

    fn put_codebase(
        &mut self,
        codebase: &Codebase,
        metadata: Option<&RevisionMetadata>,
    ) -> Result<Option<DraftRevision>, WritingError> {
        let changed_paths = sync_tree(codebase, &self.root, VCS_METADATA)?;
        if changed_paths == 0 {
            debug!("{} already matches {}", self.root.display(), codebase);
            return Ok(None);
        }

        git(self.runner.as_ref(), Some(&self.root), &["add", "--all"])?;
        Ok(Some(DraftRevision {
            location: self.root.clone(),
            description: metadata.map(draft_description),
            changed_paths,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;

    /// Answers git invocations from a script and records them
    struct ScriptedRunner {
        calls: Mutex<Vec<String>>,
        responses: Vec<(&'static str, Result<&'static str, i32>)>,
    }

    impl ScriptedRunner {
        fn new(responses: Vec<(&'static str, Result<&'static str, i32>)>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                responses,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(
            &self,
            command: &str,
            args: &[String],
            _working_dir: Option<&Path>,
        ) -> Result<CommandOutput, CommandError> {
            let line = format!("{} {}", command, args.join(" "));
            self.calls.lock().unwrap().push(line.clone());
            for (prefix, response) in &self.responses {
                if line.starts_with(prefix) {
                    return match response {
                        Ok(stdout) => Ok(CommandOutput::new(*stdout, "")),
                        Err(status) => Err(CommandError::Failed {
                            command: command.to_string(),
                            args: args.to_vec(),
                            stdout: String::new(),
                            stderr: String::new(),
                            status: *status,
                        }),
                    };
                }
            }
            Ok(CommandOutput::default())
        }
    }

    fn repo(runner: Arc<ScriptedRunner>) -> GitRepository {
        GitRepository::new(
            "internal",
            "https://example.com/internal.git",
            None,
            "internal",
            runner,
            Arc::new(Scratch::new().unwrap()),
        )
    }

    #[test]
    fn test_head_revision() {
        let runner = Arc::new(ScriptedRunner::new(vec![(
            "git rev-parse --verify --quiet HEAD^{commit}",
            Ok("abc123\n"),
        )]));
        let repo = repo(runner.clone());

        let head = repo.find_head_revision(None).unwrap().unwrap();
        assert_eq!(head, Revision::new("internal", "abc123"));

        // Cloned exactly once
        repo.find_head_revision(None).unwrap();
        let clones = runner.calls().iter().filter(|c| c.starts_with("git clone")).count();
        assert_eq!(clones, 1);
    }

    #[test]
    fn test_empty_repository_has_no_head() {
        let runner = Arc::new(ScriptedRunner::new(vec![("git rev-parse", Err(1))]));
        assert_eq!(repo(runner).find_head_revision(None).unwrap(), None);
    }

    #[test]
    fn test_unknown_revision() {
        let runner = Arc::new(ScriptedRunner::new(vec![("git rev-parse", Err(1))]));
        let err = repo(runner).find_head_revision(Some("nope")).unwrap_err();
        assert!(matches!(err, HistoryError::UnknownRevision { .. }));
    }

    #[test]
    fn test_metadata() {
        let runner = Arc::new(ScriptedRunner::new(vec![(
            "git log",
            Ok("abc123\0Dev <dev@example.com>\02024-01-01T00:00:00+00:00\0p1 p2\0Subject\n\nBody\n\n"),
        )]));
        let meta = repo(runner)
            .metadata(&Revision::new("internal", "abc123"))
            .unwrap();

        assert_eq!(meta.id, "abc123");
        assert_eq!(meta.author, "Dev <dev@example.com>");
        assert_eq!(meta.description, "Subject\n\nBody");
        assert_eq!(
            meta.parents,
            vec![Revision::new("internal", "p1"), Revision::new("internal", "p2")]
        );
    }

    #[test]
    fn test_malformed_log() {
        let err = parse_log_entry("internal", "garbage").unwrap_err();
        assert!(matches!(err, HistoryError::Malformed { .. }));
    }

    #[test]
    fn test_writer_clones_checks_out_and_stages() {
        let runner = Arc::new(ScriptedRunner::new(vec![]));
        let repo = GitRepository::new(
            "internal",
            "https://example.com/internal.git",
            Some("main".to_string()),
            "internal",
            runner.clone(),
            Arc::new(Scratch::new().unwrap()),
        );

        let mut writer = WriterCreator::create(&repo, &Options::new()).unwrap();
        let root = writer.root().to_path_buf();

        let content = tempfile::tempdir().unwrap();
        std::fs::write(content.path().join("lib.rs"), "pub fn f() {}\n").unwrap();
        let codebase = Codebase::new(
            content.path(),
            "internal",
            RepositoryExpression::named("src").into(),
        );
        let draft = writer.put_codebase(&codebase, None).unwrap().unwrap();

        assert_eq!(draft.location, root);
        assert!(root.join("lib.rs").exists());

        let calls = runner.calls();
        assert_eq!(
            calls[0],
            format!("git clone --quiet https://example.com/internal.git {}", root.display())
        );
        assert_eq!(calls[1], "git checkout --quiet main");
        assert_eq!(calls[2], "git add --all");
    }

    #[test]
    fn test_branch_ref() {
        let runner = Arc::new(ScriptedRunner::new(vec![]));
        let repo = GitRepository::new(
            "internal",
            "url",
            Some("main".to_string()),
            "internal",
            runner,
            Arc::new(Scratch::new().unwrap()),
        );
        assert_eq!(repo.inner.branch_ref(), "origin/main");
    }
}
