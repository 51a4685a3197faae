//! Build pipeline that ties all components together.
//!
//! convert every notebook → split → merge → compile twice → collect.
//! Every stage finishes before the next one starts and the first error
//! aborts the whole build.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use crate::collect::ArtifactCollector;
use crate::config::{body_file_name, normalize_document_name, BuildConfig};
use crate::error::{Nb2LatexError, Result};
use crate::merging::merge;
use crate::splitting::{Body, DocumentSplitter, Preamble, SourceDocument};
use crate::tools::{Compiler, Converter, NbConvert, PdfLatex};

/// Number of compiler passes. The second pass picks up the table of contents
/// and cross references written by the first.
pub const COMPILER_PASSES: u8 = 2;

/// Progress notifications emitted while a build runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Converting { document: String },
    Merging { documents: usize },
    Compiling { pass: u8 },
    Collecting,
}

/// Summary of a successful build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub title: String,
    /// Document names in merge order.
    pub documents: Vec<String>,
    pub output_dir: PathBuf,
    /// Final location of the PDF.
    pub pdf: PathBuf,
    /// Every file moved into the output directory.
    pub collected: Vec<PathBuf>,
}

/// Sequential build over injected converter and compiler.
pub struct Pipeline<C, K> {
    config: BuildConfig,
    converter: C,
    compiler: K,
    splitter: DocumentSplitter,
}

impl Pipeline<NbConvert, PdfLatex> {
    /// Pipeline using `jupyter nbconvert` and `pdflatex` as configured.
    pub fn with_default_tools(config: BuildConfig) -> Self {
        let environment = config.environment.as_ref().map(|env| env.name.clone());
        let converter = NbConvert::new(&config.converter_program)
            .with_environment(environment.clone())
            .with_timeout(config.tool_timeout);
        let compiler = PdfLatex::new(&config.compiler_program)
            .with_environment(environment)
            .with_timeout(config.tool_timeout);
        Self::new(config, converter, compiler)
    }
}

impl<C: Converter, K: Compiler> Pipeline<C, K> {
    pub fn new(config: BuildConfig, converter: C, compiler: K) -> Self {
        let splitter = DocumentSplitter::new(config.markers.clone());
        Self {
            config,
            converter,
            compiler,
            splitter,
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run the whole build for `notebooks`, in the given order.
    pub fn run(&self, notebooks: &[String]) -> Result<BuildReport> {
        self.run_with_progress(notebooks, |_| {})
    }

    /// Like [`Pipeline::run`], reporting each stage to `progress` before it starts.
    pub fn run_with_progress(
        &self,
        notebooks: &[String],
        mut progress: impl FnMut(&Stage),
    ) -> Result<BuildReport> {
        self.config.validate()?;
        let names = self.document_names(notebooks)?;
        let work_dir = &self.config.work_dir;
        let title = &self.config.title;

        // Split everything in memory first so a malformed document leaves no
        // body files behind.
        let mut preamble: Option<Preamble> = None;
        let mut bodies: Vec<(String, Body)> = Vec::with_capacity(names.len());
        for name in &names {
            progress(&Stage::Converting {
                document: name.clone(),
            });
            let tex = self.converter.convert(work_dir, name)?;
            let document = SourceDocument::read(&tex)?;

            let body = self.splitter.extract_body(&document)?;
            if preamble.is_none() {
                preamble = Some(self.splitter.extract_preamble(&document)?);
            }
            bodies.push((name.clone(), body));
        }

        progress(&Stage::Merging {
            documents: bodies.len(),
        });
        let merged = merge(title, preamble.unwrap_or_default(), &bodies)?;

        for (name, body) in &bodies {
            fs::write(work_dir.join(body_file_name(name)), body.render())?;
        }
        let merged_path = self.config.merged_path();
        fs::write(&merged_path, merged.render())?;
        tracing::info!(path = %merged_path.display(), "Wrote merged document");

        for pass in 1..=COMPILER_PASSES {
            progress(&Stage::Compiling { pass });
            self.compiler.compile(&merged_path, pass)?;
        }

        progress(&Stage::Collecting);
        let collector = ArtifactCollector::new(work_dir);
        let mut collected = collector.collect(title, &self.config.extensions)?;
        if self.config.collect_intermediates {
            let intermediates: Vec<String> = names
                .iter()
                .flat_map(|name| [format!("{name}.tex"), body_file_name(name)])
                .collect();
            let extra = collector.collect_files(title, &intermediates)?;
            collected.moved.extend(extra.moved);
        }

        Ok(BuildReport {
            title: title.clone(),
            documents: names,
            pdf: self.config.output_pdf(),
            output_dir: collected.output_dir,
            collected: collected.moved,
        })
    }

    /// Normalize notebook arguments and reject names whose files would
    /// overwrite each other in the working directory.
    fn document_names(&self, notebooks: &[String]) -> Result<Vec<String>> {
        if notebooks.is_empty() {
            return Err(Nb2LatexError::Configuration(
                "no notebooks given".to_string(),
            ));
        }
        let names = notebooks
            .iter()
            .map(|nb| normalize_document_name(nb))
            .collect::<Result<Vec<_>>>()?;

        let merged = self.config.merged_file_name();
        let bodies: HashSet<String> = names.iter().map(|n| body_file_name(n)).collect();
        for name in &names {
            let converted = format!("{name}.tex");
            if converted == merged {
                return Err(Nb2LatexError::Configuration(format!(
                    "notebook '{name}' has the same name as the document title"
                )));
            }
            if bodies.contains(&converted) {
                return Err(Nb2LatexError::Configuration(format!(
                    "notebook '{name}' clashes with the body file of another notebook"
                )));
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::Path;
    use tempfile::tempdir;

    struct NoConverter;

    impl Converter for NoConverter {
        fn convert(&self, _work_dir: &Path, name: &str) -> Result<PathBuf> {
            panic!("converter called for {name}");
        }
    }

    struct NoCompiler;

    impl Compiler for NoCompiler {
        fn compile(&self, document: &Path, _pass: u8) -> Result<PathBuf> {
            panic!("compiler called for {}", document.display());
        }
    }

    fn pipeline(title: &str) -> Pipeline<NoConverter, NoCompiler> {
        Pipeline::new(BuildConfig::new(title), NoConverter, NoCompiler)
    }

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_document_names_strip_extension() {
        let names = pipeline("Report")
            .document_names(&strings(&["Intro.ipynb", "Methods"]))
            .unwrap();
        assert_eq!(names, vec!["Intro", "Methods"]);
    }

    #[test]
    fn test_empty_notebook_list_is_rejected_before_conversion() {
        let err = pipeline("Report").run(&[]).unwrap_err();
        assert!(matches!(err, Nb2LatexError::Configuration(_)));
    }

    #[test]
    fn test_notebook_named_like_title_is_rejected() {
        let err = pipeline("Report")
            .document_names(&strings(&["Report.ipynb"]))
            .unwrap_err();
        assert!(err.to_string().contains("same name as the document title"));
    }

    #[test]
    fn test_notebook_clashing_with_body_file_is_rejected() {
        let err = pipeline("Report")
            .document_names(&strings(&["Intro", "IntroBody"]))
            .unwrap_err();
        assert!(matches!(err, Nb2LatexError::Configuration(_)));
    }

    #[test]
    fn test_invalid_title_is_rejected_before_conversion() {
        let err = pipeline("a/b").run(&strings(&["Intro"])).unwrap_err();
        assert!(matches!(err, Nb2LatexError::Configuration(_)));
    }

    struct CannedConverter;

    impl Converter for CannedConverter {
        fn convert(&self, work_dir: &Path, name: &str) -> Result<PathBuf> {
            let path = work_dir.join(format!("{name}.tex"));
            fs::write(
                &path,
                format!("\\documentclass{{article}}\n\\begin{{document}}\n\\maketitle\n{name}\n\\end{{document}}\n"),
            )?;
            Ok(path)
        }
    }

    struct RecordingCompiler {
        passes: RefCell<Vec<u8>>,
    }

    impl Compiler for RecordingCompiler {
        fn compile(&self, document: &Path, pass: u8) -> Result<PathBuf> {
            self.passes.borrow_mut().push(pass);
            let pdf = document.with_extension("pdf");
            fs::write(&pdf, b"%PDF-1.5")?;
            Ok(pdf)
        }
    }

    #[test]
    fn test_stages_run_in_order() {
        let dir = tempdir().unwrap();
        let compiler = RecordingCompiler {
            passes: RefCell::new(Vec::new()),
        };
        let pipeline = Pipeline::new(
            BuildConfig::new("Report").with_work_dir(dir.path()),
            CannedConverter,
            compiler,
        );

        let mut stages = Vec::new();
        pipeline
            .run_with_progress(&strings(&["A", "B"]), |stage| stages.push(stage.clone()))
            .unwrap();

        assert_eq!(
            stages,
            vec![
                Stage::Converting { document: "A".to_string() },
                Stage::Converting { document: "B".to_string() },
                Stage::Merging { documents: 2 },
                Stage::Compiling { pass: 1 },
                Stage::Compiling { pass: 2 },
                Stage::Collecting,
            ]
        );
        assert_eq!(*pipeline.compiler.passes.borrow(), vec![1, 2]);
    }
}
