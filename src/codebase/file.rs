// src/codebase/file.rs

//! The built-in `file` codebase creator
//!
//! `file(path=/some/dir)` serves a local directory as-is.
//! `file(path=/some/archive.tar.gz)` expands the archive into scratch storage
//! first. `projectspace` defaults to `public`.

use super::{Codebase, CodebaseCreationError, DEFAULT_PROJECT_SPACE};
use crate::expression::{FILE_REPOSITORY, Options, RepositoryExpression, Term};
use crate::repository::CodebaseCreator;
use crate::scratch::Scratch;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub struct FileCodebaseCreator {
    scratch: Arc<Scratch>,
}

impl FileCodebaseCreator {
    pub fn new(scratch: Arc<Scratch>) -> Self {
        Self { scratch }
    }

    fn expand_archive(&self, archive: &Path) -> Result<std::path::PathBuf, CodebaseCreationError> {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let reader: Box<dyn Read> = if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Box::new(GzDecoder::new(File::open(archive)?))
        } else if name.ends_with(".tar") {
            Box::new(File::open(archive)?)
        } else {
            return Err(CodebaseCreationError::UnsupportedArchive(archive.to_path_buf()));
        };

        let dest = self.scratch.dir("file_codebase")?;
        debug!("Expanding {} into {}", archive.display(), dest.display());
        tar::Archive::new(reader).unpack(&dest)?;
        Ok(dest)
    }
}

impl CodebaseCreator for FileCodebaseCreator {
    fn create(&self, options: &Options) -> Result<Codebase, CodebaseCreationError> {
        let path = options
            .get("path")
            .ok_or_else(|| CodebaseCreationError::MissingOption {
                creator: FILE_REPOSITORY.to_string(),
                option: "path".to_string(),
            })?;
        let project_space = options.get("projectspace").unwrap_or(DEFAULT_PROJECT_SPACE);

        let source = Path::new(path);
        if !source.exists() {
            return Err(CodebaseCreationError::NotFound(source.to_path_buf()));
        }

        let root = if source.is_dir() {
            source.to_path_buf()
        } else {
            self.expand_archive(source)?
        };

        let expression = RepositoryExpression::new(Term::new(FILE_REPOSITORY, options.clone()));
        Ok(Codebase::new(root, project_space, expression.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs;

    fn creator() -> FileCodebaseCreator {
        FileCodebaseCreator::new(Arc::new(Scratch::new().unwrap()))
    }

    #[test]
    fn test_directory_used_in_place() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("foo.txt"), "x").unwrap();

        let options = Options::new().with("path", dir.path().to_str().unwrap());
        let codebase = creator().create(&options).unwrap();

        assert_eq!(codebase.path(), dir.path());
        assert_eq!(codebase.project_space(), "public");
        assert!(codebase.to_string().starts_with("file(path="));
    }

    #[test]
    fn test_project_space_option() {
        let dir = tempfile::tempdir().unwrap();
        let options = Options::new()
            .with("path", dir.path().to_str().unwrap())
            .with("projectspace", "internal");
        let codebase = creator().create(&options).unwrap();
        assert_eq!(codebase.project_space(), "internal");
    }

    #[test]
    fn test_tar_gz_is_expanded() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("code.tar.gz");

        let encoder = GzEncoder::new(File::create(&archive_path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let content = b"hello";
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "src/hello.txt", &content[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let options = Options::new().with("path", archive_path.to_str().unwrap());
        let creator = creator();
        let codebase = creator.create(&options).unwrap();

        assert_ne!(codebase.path(), dir.path());
        assert_eq!(
            fs::read_to_string(codebase.file("src/hello.txt")).unwrap(),
            "hello"
        );
    }

    #[test]
    fn test_missing_path_option() {
        let err = creator().create(&Options::new()).unwrap_err();
        assert!(matches!(err, CodebaseCreationError::MissingOption { .. }));
    }

    #[test]
    fn test_nonexistent_path() {
        let options = Options::new().with("path", "/nonexistent/migrant/codebase");
        let err = creator().create(&options).unwrap_err();
        assert!(matches!(err, CodebaseCreationError::NotFound(_)));
    }

    #[test]
    fn test_unsupported_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, "plain").unwrap();
        let options = Options::new().with("path", file.to_str().unwrap());
        let err = creator().create(&options).unwrap_err();
        assert!(matches!(err, CodebaseCreationError::UnsupportedArchive(_)));
    }
}
