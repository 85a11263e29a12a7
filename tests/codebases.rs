// tests/codebases.rs

//! Expression evaluation and codebase comparison tests.

mod common;

use common::{project, write_tree};
use migrant::{
    FileStatus, LogUi, PatchRenderer, SilentUi, create_draft, diff_codebases, parse_expression,
    parse_repository_expression,
};
use std::fs;

#[test]
fn test_diff_two_file_codebases() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    write_tree(a.path(), &[("foo.txt", "x\n"), ("same.txt", "s\n")]);
    write_tree(b.path(), &[("foo.txt", "y\n"), ("same.txt", "s\n")]);

    let context = project("name = \"diff\"\n");
    let ui = SilentUi::new();

    let c1 = parse_expression(&format!("file(path={})", a.path().display()))
        .unwrap()
        .create_codebase(&context, &ui)
        .unwrap();
    let c2 = parse_expression(&format!("file(path={})", b.path().display()))
        .unwrap()
        .create_codebase(&context, &ui)
        .unwrap();

    let diff = diff_codebases(&c1, &c2).unwrap();
    assert!(diff.are_different());
    assert_eq!(diff.status_of("foo.txt"), Some(FileStatus::Modified));
    assert_eq!(diff.changed_files().count(), 1);

    let patch = PatchRenderer::new().render(&diff).unwrap();
    assert!(patch.contains("-x"));
    assert!(patch.contains("+y"));
    assert!(!patch.contains("same.txt"));
}

#[test]
fn test_identical_codebases_are_not_different() {
    let a = tempfile::tempdir().unwrap();
    write_tree(a.path(), &[("dir/file.rs", "fn main() {}\n")]);

    let context = project("name = \"diff\"\n");
    let ui = SilentUi::new();
    let expression = parse_expression(&format!("file(path={})", a.path().display())).unwrap();

    let c1 = expression.create_codebase(&context, &ui).unwrap();
    let c2 = expression.create_codebase(&context, &ui).unwrap();
    assert!(!diff_codebases(&c1, &c2).unwrap().are_different());
}

#[test]
fn test_translate_edit_and_change() {
    let src = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    write_tree(
        src.path(),
        &[("java/Main.java", "class Main {}\n"), ("notes_internal.txt", "secret\n")],
    );
    write_tree(dest.path(), &[("README", "public\n"), ("stale.txt", "old\n")]);

    let context = project(&format!(
        r#"
name = "pipeline"

[repositories.internal]
type = "dummy"
revisions = ["1"]
path = "{}"
project_space = "internal"

[repositories.public]
type = "dummy"
revisions = ["a"]
path = "{}"

[editors.move]
type = "renamer"
mappings = [{{ from = "java", to = "src" }}]

[editors.scrub]
type = "filter"
exclude = ["*_internal.txt"]

[[translators]]
from_project_space = "internal"
to_project_space = "public"
steps = [{{ name = "move", editor = "move" }}, {{ name = "scrub", editor = "scrub" }}]
"#,
        src.path().display(),
        dest.path().display()
    ));
    let ui = LogUi::new();

    let codebase = parse_expression("internal(revision=1)>public")
        .unwrap()
        .create_codebase(&context, &ui)
        .unwrap();
    assert_eq!(codebase.project_space(), "public");
    assert!(codebase.file("src/Main.java").exists());
    assert!(!codebase.file("notes_internal.txt").exists());

    let mut writer = parse_repository_expression("public")
        .unwrap()
        .create_writer(&context, &ui)
        .unwrap();
    let draft = create_draft(&codebase, writer.as_mut(), None, &ui)
        .unwrap()
        .unwrap();

    assert!(draft.location.join("src/Main.java").exists());
    assert!(!draft.location.join("stale.txt").exists());
    assert!(!draft.location.join("README").exists());

    // The writer works on a copy; the destination itself is untouched
    assert_eq!(fs::read_to_string(dest.path().join("stale.txt")).unwrap(), "old\n");
    assert_eq!(ui.open_tasks(), 0);

    // Putting the same codebase again changes nothing
    assert!(create_draft(&codebase, writer.as_mut(), None, &ui).unwrap().is_none());
}

#[test]
fn test_translate_without_translator_fails() {
    let context = project(
        r#"
name = "x"
[repositories.internal]
type = "dummy"
revisions = ["1"]
project_space = "internal"
"#,
    );
    let ui = SilentUi::new();
    let result = parse_expression("internal>public")
        .unwrap()
        .create_codebase(&context, &ui);
    assert!(result.is_err());
    assert_eq!(ui.open_tasks(), 0);
}
