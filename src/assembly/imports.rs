//! Module Imports
//!
//! Imports are kept as typed values until rendering so they can be sorted
//! and filtered (bundling drops everything but missing markers) without
//! re-parsing generated text.

use std::cmp::Ordering;

/// Where an imported definition comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImportKind {
    /// Exported by a runtime module
    Runtime,
    /// Exported by a regular module
    Definition,
    /// Referenced but exported by no module; rendered as a marker comment
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportSpec {
    pub kind: ImportKind,
    /// Name exported by the other module
    pub name: String,
    /// Local name, when it differs from `name`
    pub alias: Option<String>,
    /// Relative path of the exporting module (empty for missing imports)
    pub path: String,
}

impl ImportSpec {
    pub fn new(kind: ImportKind, name: impl Into<String>, local: impl Into<String>, path: impl Into<String>) -> Self {
        let name = name.into();
        let local = local.into();
        Self {
            kind,
            alias: (local != name).then_some(local),
            name,
            path: path.into(),
        }
    }

    pub fn missing(id: impl Into<String>) -> Self {
        Self {
            kind: ImportKind::Missing,
            name: id.into(),
            alias: None,
            path: String::new(),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.kind == ImportKind::Missing
    }

    pub fn render(&self) -> String {
        match (self.kind, &self.alias) {
            (ImportKind::Missing, _) => format!("// MISSING {}", self.name),
            (_, Some(alias)) => format!("import {{ {} as {alias} }} from '{}';", self.name, self.path),
            (_, None) => format!("import {{ {} }} from '{}';", self.name, self.path),
        }
    }
}

/// Runtime imports first, then definitions, then missing markers; stable within a kind
pub fn compare_imports(a: &ImportSpec, b: &ImportSpec) -> Ordering {
    a.kind.cmp(&b.kind)
}

pub fn render_imports(imports: &[ImportSpec]) -> String {
    imports.iter().map(ImportSpec::render).collect::<Vec<_>>().join("\n")
}

// =============================================================================
// Relative Paths
// =============================================================================

/// Path components with `.` dropped and `..` resolved where possible
fn normalize(path: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    parts
}

/// Path of module `to` as imported from module `from`, always starting with `.`
///
/// Both paths are relative to the same output root.
pub fn relative_module_path(from: &str, to: &str) -> String {
    let from_parts = normalize(from);
    let from_dir = &from_parts[..from_parts.len().saturating_sub(1)];
    let to_parts = normalize(to);

    let common = from_dir
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<&str> = vec![".."; from_dir.len() - common];
    segments.extend(&to_parts[common..]);
    let relative = segments.join("/");

    if relative.starts_with('.') {
        relative
    } else {
        format!("./{relative}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(
            ImportSpec::new(ImportKind::Definition, "Pet", "Pet", "./Pet.ts").render(),
            "import { Pet } from './Pet.ts';"
        );
        assert_eq!(
            ImportSpec::new(ImportKind::Definition, "PetSchema", "Pet", "./Pet.ts").render(),
            "import { PetSchema as Pet } from './Pet.ts';"
        );
        assert_eq!(ImportSpec::missing("Ghost").render(), "// MISSING Ghost");
    }

    #[test]
    fn test_sort_runtime_first() {
        let mut imports = vec![
            ImportSpec::missing("Ghost"),
            ImportSpec::new(ImportKind::Definition, "B", "B", "./B.ts"),
            ImportSpec::new(ImportKind::Runtime, "DateOnly", "DateOnly", "./util/date.ts"),
            ImportSpec::new(ImportKind::Definition, "A", "A", "./A.ts"),
        ];
        imports.sort_by(compare_imports);
        let names: Vec<_> = imports.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["DateOnly", "B", "A", "Ghost"]);
    }

    #[test]
    fn test_relative_module_path() {
        assert_eq!(relative_module_path("./Category.ts", "./Pet.ts"), "./Pet.ts");
        assert_eq!(relative_module_path("./models/Pet.ts", "./util/date.ts"), "../util/date.ts");
        assert_eq!(relative_module_path("./models/Pet.ts", "./models/Tag.ts"), "./Tag.ts");
        assert_eq!(relative_module_path("./Pet.ts", "./models/deep/Tag.ts"), "./models/deep/Tag.ts");
        assert_eq!(relative_module_path("a/b/c.ts", "a/d.ts"), "../d.ts");
        assert_eq!(relative_module_path("./x/../Pet.ts", "Tag.ts"), "./Tag.ts");
    }
}
