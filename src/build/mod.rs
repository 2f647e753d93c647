//! The build driver: discovers source files, runs Wave 1 (parallel parse +
//! summarize) and Wave 2 (sequential bind + lower + emit) across a project, then links.

mod pool;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use inkwell::context::Context;
use log::{debug, error, info};

use crate::ast::statement::Stmt;
use crate::binder;
use crate::codegen;
use crate::errors::{CompileError, FileError};
use crate::lexer;
use crate::parser;
use crate::symbols::{self, Symbol};

pub use pool::{SharedFuture, ThreadPool};

/// Wave 1's output for a single file: its retained AST plus its top-level symbol summary.
struct Wave1Result {
    path: PathBuf,
    stmts: Vec<Stmt>,
    summary: HashMap<String, Symbol>,
}

/// The outcome of building one file through to an object file, or the error that stopped it.
/// Files fail independently - one file's `FileError` never stops another file's Wave 2 pass.
pub enum BuildResult {
    Success { object_file: PathBuf },
    Failure(FileError),
}

pub struct BuildSummary {
    pub results: Vec<BuildResult>,
    pub linked_binary: Option<PathBuf>,
    pub link_error: Option<CompileError>,
}

impl BuildSummary {
    pub fn is_fully_successful(&self) -> bool {
        self.results.iter().all(|r| matches!(r, BuildResult::Success { .. }))
    }
}

/// A single source file queued for the build, with the other files it must wait on in Wave 1.
struct BuildFile {
    path: PathBuf,
    depends_on: Vec<PathBuf>,
}

pub struct BuildSystem {
    files: Vec<BuildFile>,
}

impl BuildSystem {
    pub fn new() -> BuildSystem {
        BuildSystem { files: Vec::new() }
    }

    pub fn add_build_file(&mut self, file: PathBuf, deps: Vec<PathBuf>) {
        self.files.push(BuildFile { path: file, depends_on: deps });
    }

    /// Discovers every `.oc` file under `root` with no inter-file
    /// dependency edges declared - cross-file forward references are resolved purely through
    /// the merged global table, not through build ordering.
    pub fn discover(root: &Path) -> Result<BuildSystem, CompileError> {
        let mut system = BuildSystem::new();
        for entry in walk(root)? {
            if entry.extension().map(|e| e == "oc").unwrap_or(false) {
                system.add_build_file(entry, Vec::new());
            }
        }
        Ok(system)
    }

    pub fn run_build(&self, project_name: &str, num_threads: usize, out_dir: &Path) -> Result<BuildSummary, CompileError> {
        let pool = ThreadPool::new(num_threads);
        let mut futures: HashMap<PathBuf, SharedFuture<Result<Wave1Result, FileError>>> = HashMap::new();

        for file in &self.files {
            let dep_futures: Vec<_> = file
                .depends_on
                .iter()
                .filter_map(|d| futures.get(d).cloned())
                .collect();
            let path = file.path.clone();
            info!("wave 1: queuing {}", path.display());
            let future = pool
                .submit(move || {
                    for dep in &dep_futures {
                        if dep.get().is_err() {
                            return Err(FileError {
                                file: path.clone(),
                                error: CompileError::resolution("a dependency failed to build"),
                            });
                        }
                    }
                    run_wave1(&path)
                })
                .map_err(|e| CompileError::io(format!("failed to submit '{}': {e}", file.path.display())))?;
            futures.insert(file.path.clone(), future);
        }

        pool.wait_all();
        info!("wave 1 complete, {} file(s)", futures.len());

        let mut wave1_ok = Vec::new();
        let mut results = Vec::new();
        for (_, future) in futures {
            match future.get() {
                Ok(w1) => wave1_ok.push(w1),
                Err(file_err) => {
                    error!("{file_err}");
                    results.push(BuildResult::Failure(file_err));
                }
            }
        }

        let global = symbols::merge_global_symbols(wave1_ok.iter().map(|w| w.summary.clone()).collect());
        debug!("merged global table: {} symbol(s)", global.len());

        let obj_dir = out_dir.join("obj");
        fs::create_dir_all(&obj_dir)?;

        for mut w1 in wave1_ok {
            info!("wave 2: {}", w1.path.display());
            match build_one_file(&mut w1.stmts, &global, &w1.path, &obj_dir) {
                Ok(object_file) => results.push(BuildResult::Success { object_file }),
                Err(error) => {
                    error!("{}: {error}", w1.path.display());
                    results.push(BuildResult::Failure(FileError { file: w1.path, error }));
                }
            }
        }

        let object_files: Vec<PathBuf> = results
            .iter()
            .filter_map(|r| match r {
                BuildResult::Success { object_file } => Some(object_file.clone()),
                BuildResult::Failure(_) => None,
            })
            .collect();

        let (linked_binary, link_error) = if object_files.is_empty() {
            (None, None)
        } else {
            match link(project_name, &object_files, out_dir) {
                Ok(bin) => (Some(bin), None),
                Err(e) => (None, Some(e)),
            }
        };

        Ok(BuildSummary { results, linked_binary, link_error })
    }
}

fn run_wave1(path: &Path) -> Result<Wave1Result, FileError> {
    run_wave1_inner(path).map_err(|error| FileError { file: path.to_path_buf(), error })
}

fn run_wave1_inner(path: &Path) -> Result<Wave1Result, CompileError> {
    let source = fs::read_to_string(path)?;
    let tokens = lexer::tokenize(&source)?;
    let stmts = parser::parse_program(tokens)?;
    let summary = binder::summarize_file(&stmts)?;
    Ok(Wave1Result { path: path.to_path_buf(), stmts, summary })
}

fn build_one_file(
    stmts: &mut [Stmt],
    global: &HashMap<String, Symbol>,
    source_path: &Path,
    obj_dir: &Path,
) -> Result<PathBuf, CompileError> {
    binder::bind_file(stmts, global.clone())?;

    let context = Context::create();
    let module_name = source_path.file_stem().and_then(|s| s.to_str()).unwrap_or("module");
    let codegen_ctx = codegen::lower_file(&context, module_name, global, stmts)?;

    let ext = if cfg!(windows) { "obj" } else { "o" };
    let object_path = obj_dir.join(format!("{module_name}.{ext}"));
    codegen_ctx.emit_object_file(&object_path)?;
    Ok(object_path)
}

/// Invokes the external C compiler as the linker. A missing linker is reported but does not
/// invalidate the object files that were already produced.
fn link(project_name: &str, object_files: &[PathBuf], out_dir: &Path) -> Result<PathBuf, CompileError> {
    let bin_dir = out_dir.join("bin");
    fs::create_dir_all(&bin_dir)?;
    let exe_name = if cfg!(windows) { format!("{project_name}.exe") } else { project_name.to_string() };
    let output = bin_dir.join(exe_name);

    let mut command = Command::new("cc");
    command.arg("-o").arg(&output);
    for obj in object_files {
        command.arg(obj);
    }

    let status = command
        .status()
        .map_err(|e| CompileError::link(format!("failed to invoke the linker ('cc'): {e}")))?;
    if !status.success() {
        return Err(CompileError::link(format!("linker exited with status {status}")));
    }
    Ok(output)
}

fn walk(root: &Path) -> Result<Vec<PathBuf>, CompileError> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    Ok(out)
}
