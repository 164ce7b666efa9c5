//! Output Collaborators
//!
//! Formatting and persistence of generated modules, kept behind traits so
//! runs can target the filesystem, memory (tests, dry runs) or an external
//! pretty-printer.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Result, SchemaError};

// =============================================================================
// Formatters
// =============================================================================

/// Pretty-prints generated code
pub trait Formatter {
    fn format(&self, code: &str) -> Result<String>;
}

/// Whitespace cleanup only: trailing spaces, repeated blank lines, final newline
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicFormatter;

impl Formatter for BasicFormatter {
    fn format(&self, code: &str) -> Result<String> {
        let mut out = String::with_capacity(code.len());
        let mut blank_run = 0;

        for line in code.trim_start_matches('\n').lines() {
            let line = line.trim_end();
            if line.is_empty() {
                blank_run += 1;
                if blank_run > 1 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            out.push_str(line);
            out.push('\n');
        }

        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out.push('\n');
        Ok(out)
    }
}

/// Pipes code through an external program (e.g. `prettier --parser babel-ts`)
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    program: String,
    args: Vec<String>,
}

impl CommandFormatter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// Split a command line on whitespace; `None` for an empty command
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }
}

impl Formatter for CommandFormatter {
    fn format(&self, code: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SchemaError::Formatter(format!("failed to start {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(code.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(SchemaError::Formatter(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| SchemaError::Formatter(format!("{} produced invalid UTF-8: {e}", self.program)))
    }
}

// =============================================================================
// Writers
// =============================================================================

/// Persists a module's text
pub trait ModuleWriter {
    fn write(&mut self, module_path: &str, content: &str) -> Result<()>;
}

/// Writes modules under an output directory
#[derive(Debug, Clone)]
pub struct FsWriter {
    root: PathBuf,
}

impl FsWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Target file of a module path; paths escaping the output directory are rejected
    pub fn resolve(&self, module_path: &str) -> Result<PathBuf> {
        let mut target = self.root.clone();
        for component in Path::new(module_path).components() {
            match component {
                Component::CurDir => {}
                Component::Normal(part) => target.push(part),
                _ => {
                    return Err(SchemaError::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("module path escapes the output directory: {module_path}"),
                    )))
                }
            }
        }
        Ok(target)
    }
}

impl ModuleWriter for FsWriter {
    fn write(&mut self, module_path: &str, content: &str) -> Result<()> {
        let target = self.resolve(module_path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, content)?;
        tracing::debug!("Wrote {}", target.display());
        Ok(())
    }
}

/// Collects modules in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    files: BTreeMap<String, String>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, module_path: &str) -> Option<&str> {
        self.files.get(module_path).map(String::as_str)
    }

    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ModuleWriter for MemoryWriter {
    fn write(&mut self, module_path: &str, content: &str) -> Result<()> {
        self.files.insert(module_path.to_string(), content.to_string());
        Ok(())
    }
}
