// src/project/mod.rs

//! Project context
//!
//! Everything an operation needs to resolve names: the repository registry,
//! editors, translators and migration configs, plus the process runner and
//! scratch storage they share. Built from a [`ProjectConfig`] or assembled
//! directly; nothing here is global.

pub mod config;

pub use config::{ConfigError, EditorConfig, ProjectConfig, RepositoryConfig};

use crate::command::CommandRunner;
use crate::editor::{
    Editor, FilterEditor, IdentityEditor, RenamerEditor, ShellEditor, Translator, TranslatorStep,
};
use crate::expression::FILE_REPOSITORY;
use crate::migration::MigrationConfig;
use crate::repository::{DummyRepository, GitRepository, RepositoryType};
use crate::scratch::Scratch;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ProjectContext {
    name: String,
    repositories: BTreeMap<String, RepositoryType>,
    editors: BTreeMap<String, Arc<dyn Editor>>,
    translators: Vec<Translator>,
    migration_configs: BTreeMap<String, MigrationConfig>,
    runner: Arc<dyn CommandRunner>,
    scratch: Arc<Scratch>,
}

impl ProjectContext {
    /// An empty project
    pub fn new(name: impl Into<String>, runner: Arc<dyn CommandRunner>, scratch: Arc<Scratch>) -> Self {
        Self {
            name: name.into(),
            repositories: BTreeMap::new(),
            editors: BTreeMap::new(),
            translators: Vec::new(),
            migration_configs: BTreeMap::new(),
            runner,
            scratch,
        }
    }

    pub fn with_repository(mut self, repository: RepositoryType) -> Self {
        self.repositories
            .insert(repository.name().to_string(), repository);
        self
    }

    pub fn with_editor(mut self, name: impl Into<String>, editor: Arc<dyn Editor>) -> Self {
        self.editors.insert(name.into(), editor);
        self
    }

    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translators.push(translator);
        self
    }

    pub fn with_migration(mut self, config: MigrationConfig) -> Self {
        self.migration_configs.insert(config.name.clone(), config);
        self
    }

    /// Realize a parsed configuration
    pub fn from_config(
        config: &ProjectConfig,
        runner: Arc<dyn CommandRunner>,
        scratch: Arc<Scratch>,
    ) -> Result<Self, ConfigError> {
        let mut context = Self::new(&config.name, runner, scratch);

        for (name, repository) in &config.repositories {
            if name == FILE_REPOSITORY {
                return Err(ConfigError::ReservedName(name.clone()));
            }
            debug!("Repository '{}' ({})", name, repository.kind());
            let repository = context.build_repository(config, name, repository);
            context = context.with_repository(repository);
        }

        for (name, editor) in &config.editors {
            let editor = context.build_editor(name, editor)?;
            context = context.with_editor(name.clone(), editor);
        }

        for translator in &config.translators {
            let (from, to) = (&translator.from_project_space, &translator.to_project_space);
            if context.translator(from, to).is_some() {
                return Err(ConfigError::DuplicateTranslator {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
            let steps = translator
                .steps
                .iter()
                .map(|step| {
                    let editor = context.editors.get(&step.editor).cloned().ok_or_else(|| {
                        ConfigError::UnknownEditor {
                            from: from.clone(),
                            to: to.clone(),
                            step: step.name.clone(),
                            editor: step.editor.clone(),
                        }
                    })?;
                    Ok(TranslatorStep {
                        name: step.name.clone(),
                        editor,
                    })
                })
                .collect::<Result<Vec<_>, ConfigError>>()?;
            context = context.with_translator(Translator::new(from, to, steps));
        }

        for (name, migration) in &config.migrations {
            for repository in [&migration.from_repository, &migration.to_repository] {
                if !context.repositories.contains_key(repository) {
                    return Err(ConfigError::UnknownRepository {
                        migration: name.clone(),
                        repository: repository.clone(),
                    });
                }
            }
            context = context.with_migration(MigrationConfig::new(
                name,
                &migration.from_repository,
                &migration.to_repository,
            ));
        }

        info!(
            "Project '{}': {} repositories, {} editors, {} translators, {} migrations",
            context.name,
            context.repositories.len(),
            context.editors.len(),
            context.translators.len(),
            context.migration_configs.len()
        );
        Ok(context)
    }

    fn build_repository(
        &self,
        config: &ProjectConfig,
        name: &str,
        repository: &RepositoryConfig,
    ) -> RepositoryType {
        match repository {
            RepositoryConfig::Git {
                url,
                branch,
                project_space,
            } => GitRepository::new(
                name,
                url,
                branch.clone(),
                project_space,
                self.runner.clone(),
                self.scratch.clone(),
            )
            .into_repository_type(),
            RepositoryConfig::Dummy {
                revisions,
                path,
                project_space,
            } => {
                let ids: Vec<&str> = revisions.iter().map(String::as_str).collect();
                let mut repo =
                    DummyRepository::linear(name, project_space, &ids, self.scratch.clone());
                if let Some(path) = path {
                    repo = repo.with_path(config.resolve_path(path));
                }
                repo.into_repository_type()
            }
        }
    }

    fn build_editor(&self, name: &str, editor: &EditorConfig) -> Result<Arc<dyn Editor>, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidEditor {
            editor: name.to_string(),
            message,
        };
        let editor: Arc<dyn Editor> = match editor {
            EditorConfig::Identity => Arc::new(IdentityEditor::new(self.scratch.clone())),
            EditorConfig::Renamer {
                mappings,
                regex,
                keep_unmatched,
            } => Arc::new(
                RenamerEditor::new(name, mappings, *regex, *keep_unmatched, self.scratch.clone())
                    .map_err(|e| invalid(e.to_string()))?,
            ),
            EditorConfig::Filter { include, exclude } => Arc::new(
                FilterEditor::new(include, exclude, self.scratch.clone())
                    .map_err(|e| invalid(e.to_string()))?,
            ),
            EditorConfig::Shell { command } => {
                if command.trim().is_empty() {
                    return Err(invalid("empty command".to_string()));
                }
                Arc::new(ShellEditor::new(
                    name,
                    command,
                    self.runner.clone(),
                    self.scratch.clone(),
                ))
            }
        };
        Ok(editor)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn repository(&self, name: &str) -> Option<&RepositoryType> {
        self.repositories.get(name)
    }

    pub fn repositories(&self) -> impl Iterator<Item = &RepositoryType> {
        self.repositories.values()
    }

    pub fn editor(&self, name: &str) -> Option<&dyn Editor> {
        self.editors.get(name).map(|e| e.as_ref())
    }

    pub fn editor_names(&self) -> impl Iterator<Item = &str> {
        self.editors.keys().map(String::as_str)
    }

    /// The translator from project space `from` to `to`
    pub fn translator(&self, from: &str, to: &str) -> Option<&Translator> {
        self.translators
            .iter()
            .find(|t| t.from_project_space() == from && t.to_project_space() == to)
    }

    pub fn translators(&self) -> &[Translator] {
        &self.translators
    }

    pub fn migration_configs(&self) -> &BTreeMap<String, MigrationConfig> {
        &self.migration_configs
    }

    pub fn migration_config(&self, name: &str) -> Option<&MigrationConfig> {
        self.migration_configs.get(name)
    }

    pub fn runner(&self) -> Arc<dyn CommandRunner> {
        self.runner.clone()
    }

    pub fn scratch(&self) -> Arc<Scratch> {
        self.scratch.clone()
    }
}
