//! End-to-end tests for the build pipeline.
//!
//! The converter copies fixture documents into a scratch working directory
//! and the compiler writes placeholder artifacts, so the whole pipeline runs
//! without jupyter or a TeX installation.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use nb2latex::tools::{Compiler, Converter};
use nb2latex::{BuildConfig, Nb2LatexError, Pipeline, Result};
use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Converter that copies `<name>.tex` from the fixtures.
#[derive(Default)]
struct FixtureConverter {
    converted: RefCell<Vec<String>>,
}

impl Converter for FixtureConverter {
    fn convert(&self, work_dir: &Path, name: &str) -> Result<PathBuf> {
        self.converted.borrow_mut().push(name.to_string());
        let target = work_dir.join(format!("{name}.tex"));
        fs::copy(fixture_dir().join(format!("{name}.tex")), &target)?;
        Ok(target)
    }
}

/// Compiler that records the document it saw on each pass and writes the
/// usual pdflatex outputs.
#[derive(Default)]
struct FakeCompiler {
    fail_on_pass: Option<u8>,
    seen: RefCell<Vec<(u8, String)>>,
}

impl Compiler for FakeCompiler {
    fn compile(&self, document: &Path, pass: u8) -> Result<PathBuf> {
        self.seen
            .borrow_mut()
            .push((pass, fs::read_to_string(document)?));

        if self.fail_on_pass == Some(pass) {
            return Err(Nb2LatexError::Compilation {
                pass,
                message: "pdflatex exited with code 1".to_string(),
                output: "! LaTeX Error: File `missing.sty' not found.".to_string(),
            });
        }

        for ext in ["aux", "log", "toc", "pdf"] {
            fs::write(document.with_extension(ext), format!("pass {pass}"))?;
        }
        Ok(document.with_extension("pdf"))
    }
}

fn notebooks(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn config(dir: &TempDir, title: &str) -> BuildConfig {
    BuildConfig::new(title).with_work_dir(dir.path())
}

fn input_lines(merged: &str) -> Vec<&str> {
    merged
        .lines()
        .filter(|l| l.starts_with(r"\input{"))
        .collect()
}

#[test]
fn test_report_from_two_notebooks() {
    let dir = tempdir().unwrap();
    let pipeline = Pipeline::new(
        config(&dir, "Report"),
        FixtureConverter::default(),
        FakeCompiler::default(),
    );

    let report = pipeline
        .run(&notebooks(&["Intro.ipynb", "Methods.ipynb"]))
        .unwrap();

    let output_dir = dir.path().join("Report files");
    assert_eq!(report.output_dir, output_dir);
    assert_eq!(report.pdf, output_dir.join("Report.pdf"));
    assert_eq!(report.documents, vec!["Intro", "Methods"]);
    assert!(report.pdf.is_file());

    // Compiled title artifacts were moved, not copied.
    for ext in ["aux", "log", "toc", "tex", "pdf"] {
        assert!(output_dir.join(format!("Report.{ext}")).is_file(), "{ext} missing");
        assert!(!dir.path().join(format!("Report.{ext}")).exists(), "{ext} left behind");
    }
    assert_eq!(
        fs::read_to_string(output_dir.join("Report.pdf")).unwrap(),
        "pass 2"
    );

    let merged = fs::read_to_string(output_dir.join("Report.tex")).unwrap();
    assert_eq!(
        input_lines(&merged),
        vec![r"\input{IntroBody.tex}", r"\input{MethodsBody.tex}"]
    );

    // Preamble comes from the first notebook only.
    assert!(merged.contains(r"\usepackage[breakable]{tcolorbox}"));
    assert!(!merged.contains(r"\usepackage{amsmath}"));

    // One title page and one table of contents, before any body.
    assert_eq!(merged.matches(r"\begin{document}").count(), 1);
    assert_eq!(merged.matches(r"\maketitle").count(), 1);
    let toc = merged.find(r"\tableofcontents").unwrap();
    let first_input = merged.find(r"\input{").unwrap();
    assert!(merged.find(r"\title{Report}").unwrap() < toc);
    assert!(toc < first_input);
    assert!(merged.trim_end().ends_with(r"\end{document}"));

    // Bodies are stripped of their own front matter.
    let intro_body = fs::read_to_string(output_dir.join("IntroBody.tex")).unwrap();
    assert!(intro_body.contains(r"\section{Introduction}"));
    assert!(!intro_body.contains(r"\maketitle"));
    assert!(!intro_body.contains(r"\begin{document}"));
    assert!(!intro_body.contains(r"\end{document}"));
    assert!(output_dir.join("Methods.tex").is_file());
    assert!(!dir.path().join("MethodsBody.tex").exists());
}

#[test]
fn test_compiler_runs_twice_on_identical_document() {
    let dir = tempdir().unwrap();
    let converter = FixtureConverter::default();
    let compiler = FakeCompiler::default();
    let pipeline = Pipeline::new(config(&dir, "Report"), &converter, &compiler);

    pipeline.run(&notebooks(&["Intro", "Methods"])).unwrap();

    let seen = compiler.seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, 1);
    assert_eq!(seen[1].0, 2);
    assert_eq!(seen[0].1, seen[1].1);
}

#[test]
fn test_notebook_order_is_preserved() {
    let dir = tempdir().unwrap();
    let converter = FixtureConverter::default();
    let compiler = FakeCompiler::default();
    let pipeline = Pipeline::new(config(&dir, "Swapped"), &converter, &compiler);

    pipeline.run(&notebooks(&["Methods", "Intro"])).unwrap();

    assert_eq!(*converter.converted.borrow(), vec!["Methods", "Intro"]);

    let merged = fs::read_to_string(dir.path().join("Swapped files/Swapped.tex")).unwrap();
    assert_eq!(
        input_lines(&merged),
        vec![r"\input{MethodsBody.tex}", r"\input{IntroBody.tex}"]
    );
    assert!(merged.contains(r"\usepackage{amsmath}"));
}

#[test]
fn test_malformed_document_aborts_without_output() {
    let dir = tempdir().unwrap();
    let converter = FixtureConverter::default();
    let compiler = FakeCompiler::default();
    let pipeline = Pipeline::new(config(&dir, "Report"), &converter, &compiler);

    let err = pipeline
        .run(&notebooks(&["Intro", "Truncated", "Methods"]))
        .unwrap_err();

    match &err {
        Nb2LatexError::Structural { document, .. } => assert_eq!(document, "Truncated.tex"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("IntroBody.tex").exists());
    assert!(!dir.path().join("TruncatedBody.tex").exists());
    assert!(!dir.path().join("Report.tex").exists());
    assert!(!dir.path().join("Report files").exists());
    assert_eq!(*converter.converted.borrow(), vec!["Intro", "Truncated"]);
    assert!(compiler.seen.borrow().is_empty());
}

#[test]
fn test_compilation_failure_is_fatal() {
    let dir = tempdir().unwrap();
    let compiler = FakeCompiler {
        fail_on_pass: Some(2),
        ..FakeCompiler::default()
    };
    let pipeline = Pipeline::new(config(&dir, "Report"), FixtureConverter::default(), compiler);

    let err = pipeline.run(&notebooks(&["Intro"])).unwrap_err();

    assert!(matches!(err, Nb2LatexError::Compilation { pass: 2, .. }));
    assert!(err.to_string().contains("missing.sty"));
    assert!(!dir.path().join("Report files").exists());
}

#[test]
fn test_keep_intermediates_in_place() {
    let dir = tempdir().unwrap();
    let pipeline = Pipeline::new(
        config(&dir, "Report").with_collect_intermediates(false),
        FixtureConverter::default(),
        FakeCompiler::default(),
    );

    let report = pipeline.run(&notebooks(&["Intro"])).unwrap();

    assert!(dir.path().join("Intro.tex").is_file());
    assert!(dir.path().join("IntroBody.tex").is_file());
    assert_eq!(report.collected.len(), 5);
}

#[test]
fn test_independent_builds_in_one_process() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();

    let a = Pipeline::new(
        config(&first, "First"),
        FixtureConverter::default(),
        FakeCompiler::default(),
    );
    let b = Pipeline::new(
        config(&second, "Second").with_extensions(["pdf"]),
        FixtureConverter::default(),
        FakeCompiler::default(),
    );

    a.run(&notebooks(&["Intro"])).unwrap();
    b.run(&notebooks(&["Methods"])).unwrap();

    assert!(first.path().join("First files/First.log").is_file());
    assert!(second.path().join("Second files/Second.pdf").is_file());
    assert!(!second.path().join("Second files/Second.log").exists());
    assert!(second.path().join("Second.log").is_file());
}
