//! Boundary lint for the THDC backend's hexagonal layout.
//!
//! `backend/src` is split into `domain` (types, flows and ports), the
//! `inbound` HTTP adapter with its `middleware`, and the `outbound` Firebase
//! adapters. Each layer may only reach inward:
//!
//! - `domain` depends on no adapter module and on neither Actix, utoipa nor
//!   reqwest
//! - `inbound` and `middleware` never touch `outbound` or reqwest
//! - `outbound` never touches `inbound`, `middleware` or the Actix stack
//!
//! Run it with `cargo run -p architecture-lint` from anywhere in the
//! workspace.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use syn::visit::Visit;

/// Library name of the backend crate, as seen from its own binaries.
const BACKEND_CRATE: &str = "thdc_backend";

/// The HTTP framework and everything that only makes sense next to it.
const ACTIX_STACK: &[&str] = &[
    "actix",
    "actix_http",
    "actix_session",
    "actix_web",
    "actix_web_prom",
    "utoipa",
    "utoipa_swagger_ui",
];

/// Something a file depends on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Reach {
    /// Another layer of the backend, by module name.
    Layer(&'static str),
    /// An external crate, by its Rust name.
    Crate(String),
}

/// One forbidden dependency of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Path relative to `backend/src`.
    pub file: PathBuf,
    /// Layer the file belongs to.
    pub layer: &'static str,
    pub reach: Reach,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self.file.display();
        match &self.reach {
            Reach::Layer(target) => {
                write!(f, "{file}: {} must not depend on crate::{target}", self.layer)
            }
            Reach::Crate(name) => write!(
                f,
                "{file}: {} must not depend on external crate `{name}`",
                self.layer
            ),
        }
    }
}

fn bullet_list(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("- {violation}\n"))
        .collect()
}

/// Failure modes returned by the lint.
#[derive(Debug, thiserror::Error)]
pub enum ArchitectureLintError {
    #[error("failed to read backend sources: {0}")]
    Io(#[from] io::Error),
    /// A file could not be parsed or placed in a layer.
    #[error("cannot lint {}: {message}", .file.display())]
    Parse { file: PathBuf, message: String },
    #[error("{} layer boundary violation(s):\n{}", .0.len(), bullet_list(.0))]
    Violations(Vec<Violation>),
}

/// Lint every layered source file under `backend_dir/src`.
///
/// # Errors
///
/// Returns [`ArchitectureLintError::Violations`] listing every forbidden
/// import, or an I/O or parse error when the sources cannot be read.
pub fn lint_backend_sources(backend_dir: &Path) -> Result<(), ArchitectureLintError> {
    let src_dir = backend_dir.join("src");
    let mut sources = Vec::new();
    for layer in Layer::ALL {
        let dir = src_dir.join(layer.dir());
        if dir.is_dir() {
            collect_sources_under(&src_dir, &dir, &mut sources)?;
        }
    }
    lint_sources(&sources)
}

/// Lint in-memory sources.
///
/// # Errors
///
/// See [`lint_backend_sources`].
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut violations = Vec::new();
    for source in sources {
        let layer = Layer::of(&source.file).ok_or_else(|| ArchitectureLintError::Parse {
            file: source.file.clone(),
            message: "file is not under a known layer".to_owned(),
        })?;
        let parsed =
            syn::parse_file(&source.contents).map_err(|err| ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: err.to_string(),
            })?;
        violations.extend(check_file(&source.file, layer, &parsed));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ArchitectureLintError::Violations(violations))
    }
}

/// A Rust source file to be linted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    /// Path relative to `backend/src`.
    pub file: PathBuf,
    pub contents: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Domain,
    Inbound,
    Middleware,
    Outbound,
}

impl Layer {
    const ALL: [Self; 4] = [Self::Domain, Self::Inbound, Self::Middleware, Self::Outbound];

    const fn dir(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Inbound => "inbound",
            Self::Middleware => "middleware",
            Self::Outbound => "outbound",
        }
    }

    fn of(relative_path: &Path) -> Option<Self> {
        let first = relative_path.components().next()?.as_os_str().to_str()?;
        Self::ALL.into_iter().find(|layer| layer.dir() == first)
    }

    fn from_module(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|layer| layer.dir() == name)
    }

    const fn forbidden_layers(self) -> &'static [Self] {
        match self {
            Self::Domain => &[Self::Inbound, Self::Middleware, Self::Outbound],
            Self::Inbound | Self::Middleware => &[Self::Outbound],
            Self::Outbound => &[Self::Inbound, Self::Middleware],
        }
    }

    fn forbidden_crates(self) -> BTreeSet<&'static str> {
        match self {
            Self::Domain => ACTIX_STACK.iter().copied().chain(["reqwest"]).collect(),
            Self::Inbound | Self::Middleware => BTreeSet::from(["reqwest"]),
            Self::Outbound => ACTIX_STACK.iter().copied().collect(),
        }
    }
}

fn check_file(file: &Path, layer: Layer, parsed: &syn::File) -> Vec<Violation> {
    let forbidden_crates = layer.forbidden_crates();
    let mut collector = PathCollector::default();
    collector.visit_file(parsed);

    let reaches: BTreeSet<Reach> = collector
        .paths
        .iter()
        .filter_map(|segments| match classify(segments)? {
            Target::Layer(target) if layer.forbidden_layers().contains(&target) => {
                Some(Reach::Layer(target.dir()))
            }
            Target::Crate(name) if forbidden_crates.contains(name) => {
                Some(Reach::Crate(name.to_owned()))
            }
            Target::Layer(_) | Target::Crate(_) => None,
        })
        .collect();

    reaches
        .into_iter()
        .map(|reach| Violation {
            file: file.to_path_buf(),
            layer: layer.dir(),
            reach,
        })
        .collect()
}

enum Target<'a> {
    Layer(Layer),
    Crate(&'a str),
}

/// Resolve what a path points at: one of our layers or an external crate.
///
/// Bare layer names count as internal so `use outbound::x` inside a nested
/// module is still caught.
fn classify(segments: &[String]) -> Option<Target<'_>> {
    let first = segments.first()?.as_str();
    if let Some(layer) = Layer::from_module(first) {
        return Some(Target::Layer(layer));
    }
    match first {
        "crate" | "self" | "super" => segments
            .iter()
            .map(String::as_str)
            .find(|segment| !matches!(*segment, "crate" | "self" | "super"))
            .and_then(Layer::from_module)
            .map(Target::Layer),
        BACKEND_CRATE => segments
            .get(1)
            .and_then(|segment| Layer::from_module(segment))
            .map(Target::Layer),
        other => Some(Target::Crate(other)),
    }
}

#[derive(Default)]
struct PathCollector {
    paths: BTreeSet<Vec<String>>,
}

impl PathCollector {
    fn record_use_tree(&mut self, tree: &syn::UseTree, mut prefix: Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.record_use_tree(&path.tree, prefix);
            }
            syn::UseTree::Name(name) => {
                prefix.push(name.ident.to_string());
                self.paths.insert(prefix);
            }
            syn::UseTree::Rename(rename) => {
                prefix.push(rename.ident.to_string());
                self.paths.insert(prefix);
            }
            syn::UseTree::Glob(_) => {
                prefix.push("*".to_owned());
                self.paths.insert(prefix);
            }
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.record_use_tree(item, prefix.clone());
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for PathCollector {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        let segments: Vec<String> = node
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect();
        if !segments.is_empty() {
            self.paths.insert(segments);
        }
        syn::visit::visit_path(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.record_use_tree(&node.tree, Vec::new());
    }
}

fn collect_sources_under(
    src_root: &Path,
    current: &Path,
    sources: &mut Vec<LintSource>,
) -> Result<(), ArchitectureLintError> {
    for entry in fs::read_dir(current)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_sources_under(src_root, &path, sources)?;
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("rs") {
            continue;
        }

        let relative = path
            .strip_prefix(src_root)
            .map_err(|err| ArchitectureLintError::Parse {
                file: path.clone(),
                message: err.to_string(),
            })?
            .to_path_buf();
        let contents = fs::read_to_string(&path)?;
        sources.push(LintSource {
            file: relative,
            contents,
        });
    }
    Ok(())
}
