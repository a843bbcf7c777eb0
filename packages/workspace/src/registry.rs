//! Template Node Registry
//!
//! Maps oids to the source elements that carry them. Each file is parsed at
//! most once per version; writes and external edits invalidate the file and
//! it is re-parsed on the next query, so a resolved node always reflects the
//! text currently on disk.

use crate::config::WorkspaceConfig;
use crate::error::{RegistryError, RegistryResult};
use onlook_common::{is_class_attribute, FileSystem, TemplateNode};
use onlook_parser::{parse_for_path, AttrValue, Document, Element, LineIndex, Position};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use walkdir::WalkDir;

/// Parsed state of one source file
#[derive(Debug)]
struct FileEntry {
    source: String,
    document: Document,
    lines: LineIndex,
}

impl FileEntry {
    fn element(&self, oid: &str) -> Option<&Element> {
        self.document.find_by_oid(oid)
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    files: HashMap<PathBuf, Arc<FileEntry>>,
    /// oid -> files containing it
    owners: HashMap<String, BTreeSet<PathBuf>>,
    /// Invalidated files awaiting a re-parse
    dirty: BTreeSet<PathBuf>,
}

impl RegistryState {
    fn install(&mut self, path: &Path, entry: Arc<FileEntry>) {
        self.forget(path);
        for oid in entry.document.oids() {
            self.owners
                .entry(oid.to_string())
                .or_default()
                .insert(path.to_path_buf());
        }
        self.files.insert(path.to_path_buf(), entry);
    }

    fn forget(&mut self, path: &Path) {
        self.files.remove(path);
        self.owners.retain(|_, paths| {
            paths.remove(path);
            !paths.is_empty()
        });
    }
}

/// Class attribute of an element
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassList {
    /// Literal class tokens, in source order
    pub classes: Vec<String>,
    /// The value is an expression; `classes` is empty
    pub dynamic: bool,
}

/// Where an element starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub position: Position,
}

pub struct TemplateRegistry {
    root: PathBuf,
    config: WorkspaceConfig,
    fs: Arc<dyn FileSystem>,
    state: RwLock<RegistryState>,
}

impl TemplateRegistry {
    pub fn new(root: impl Into<PathBuf>, config: WorkspaceConfig, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            config,
            fs,
            state: RwLock::new(RegistryState::default()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks the project root and indexes every source file. Returns the
    /// number of files indexed; files that fail to parse are skipped.
    pub async fn index_project(&self) -> usize {
        let paths = self.discover();
        self.index_paths(paths).await
    }

    /// Source files under the root, ignored directories skipped
    pub fn discover(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && entry.depth() > 0
                    && entry
                        .file_name()
                        .to_str()
                        .map(|name| self.config.is_ignored_dir(name))
                        .unwrap_or(false))
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.config.is_source_file(entry.path()))
            .map(|entry| entry.into_path())
            .collect()
    }

    pub async fn index_paths(&self, paths: impl IntoIterator<Item = PathBuf>) -> usize {
        let mut indexed = 0;
        for path in paths {
            match self.load(&path).await {
                Ok(_) => indexed += 1,
                Err(err) => tracing::warn!(path = ?path, error = %err, "not indexed"),
            }
        }
        tracing::info!(files = indexed, "indexed project");
        indexed
    }

    /// Files with a current parse
    pub async fn indexed_files(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.state.read().await.files.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Drops the parse of `path`; the next query re-reads it
    pub async fn invalidate(&self, path: &Path) {
        let mut state = self.state.write().await;
        state.files.remove(path);
        state.dirty.insert(path.to_path_buf());
        tracing::debug!(path = ?path, "invalidated");
    }

    pub async fn resolve(&self, oid: &str) -> RegistryResult<TemplateNode> {
        let (path, entry) = self.locate(oid).await?;
        let element = entry
            .element(oid)
            .ok_or_else(|| RegistryError::NotFound(oid.to_string()))?;
        Ok(TemplateNode::from_element(
            oid,
            &path,
            &entry.source,
            &entry.lines,
            element,
        ))
    }

    pub async fn resolve_classes(&self, node: &TemplateNode) -> RegistryResult<Vec<String>> {
        Ok(self.class_list(node).await?.classes)
    }

    pub async fn class_list(&self, node: &TemplateNode) -> RegistryResult<ClassList> {
        let entry = self.load(&node.path).await?;
        let element = entry
            .element(&node.oid)
            .ok_or_else(|| RegistryError::NotFound(node.oid.clone()))?;
        let attribute = element
            .attributes
            .iter()
            .find(|attr| is_class_attribute(&attr.name));
        Ok(match attribute.map(|attr| &attr.value) {
            Some(AttrValue::Str { value, .. }) => ClassList {
                classes: value.split_whitespace().map(String::from).collect(),
                dynamic: false,
            },
            Some(AttrValue::Expr { .. }) | Some(AttrValue::Spread { .. }) => ClassList {
                classes: Vec::new(),
                dynamic: true,
            },
            Some(AttrValue::Bare) | None => ClassList::default(),
        })
    }

    /// Exact source text of the element's span
    pub async fn code_block(&self, oid: &str) -> RegistryResult<String> {
        let (_, entry) = self.locate(oid).await?;
        let element = entry
            .element(oid)
            .ok_or_else(|| RegistryError::NotFound(oid.to_string()))?;
        Ok(element.span().slice(&entry.source).to_string())
    }

    pub async fn element_location(&self, oid: &str) -> RegistryResult<SourceLocation> {
        let node = self.resolve(oid).await?;
        Ok(SourceLocation {
            path: node.path,
            position: node.start_tag.start,
        })
    }

    /// Oids in `path`, in document order
    pub async fn oids_in(&self, path: &Path) -> RegistryResult<Vec<String>> {
        let entry = self.load(path).await?;
        Ok(entry.document.oids().into_iter().map(String::from).collect())
    }

    /// Finds the single file owning `oid`
    async fn locate(&self, oid: &str) -> RegistryResult<(PathBuf, Arc<FileEntry>)> {
        self.refresh().await;

        let owners: Vec<PathBuf> = {
            let state = self.state.read().await;
            state
                .owners
                .get(oid)
                .map(|paths| paths.iter().cloned().collect())
                .unwrap_or_default()
        };
        let path = match owners.as_slice() {
            [] => {
                tracing::warn!(oid = %oid, "element not found");
                return Err(RegistryError::NotFound(oid.to_string()));
            }
            [path] => path.clone(),
            _ => {
                tracing::error!(oid = %oid, paths = ?owners, "oid claimed by several files");
                return Err(RegistryError::AmbiguousSource {
                    oid: oid.to_string(),
                    paths: owners,
                });
            }
        };

        let entry = self.load(&path).await?;
        match entry.document.count_oid(oid) {
            0 => Err(RegistryError::NotFound(oid.to_string())),
            1 => Ok((path, entry)),
            count => {
                tracing::error!(oid = %oid, path = ?path, count, "oid repeated within file");
                Err(RegistryError::AmbiguousSource {
                    oid: oid.to_string(),
                    paths: vec![path; count],
                })
            }
        }
    }

    /// Re-parses every invalidated file
    async fn refresh(&self) {
        let dirty = std::mem::take(&mut self.state.write().await.dirty);
        for path in dirty {
            if !self.fs.exists(&path).await {
                self.state.write().await.forget(&path);
                continue;
            }
            if let Err(err) = self.load(&path).await {
                tracing::warn!(path = ?path, error = %err, "could not re-index");
                self.state.write().await.forget(&path);
            }
        }
    }

    async fn load(&self, path: &Path) -> RegistryResult<Arc<FileEntry>> {
        {
            let state = self.state.read().await;
            if !state.dirty.contains(path) {
                if let Some(entry) = state.files.get(path) {
                    return Ok(entry.clone());
                }
            }
        }

        let source = self
            .fs
            .read_to_string(path)
            .await
            .map_err(|err| RegistryError::Read {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        let document = parse_for_path(path, &source).map_err(|source| RegistryError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let entry = Arc::new(FileEntry {
            lines: LineIndex::new(&source),
            source,
            document,
        });

        let mut state = self.state.write().await;
        state.dirty.remove(path);
        state.install(path, entry.clone());
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onlook_common::MemoryFileSystem;

    const PAGE: &str = r#"export default function Page() {
    return (
        <main data-oid="m" className="flex p-4">
            <Card data-oid="c" className={cn("a", active && "b")} />
        </main>
    );
}
"#;

    async fn registry(files: &[(&str, &str)]) -> (Arc<MemoryFileSystem>, TemplateRegistry) {
        let fs = Arc::new(MemoryFileSystem::new());
        for (path, text) in files {
            fs.insert(*path, *text);
        }
        let registry = TemplateRegistry::new("/app", WorkspaceConfig::default(), fs.clone());
        registry.index_paths(fs.paths()).await;
        (fs, registry)
    }

    #[tokio::test]
    async fn test_resolve_positions() {
        let (_, registry) = registry(&[("/app/page.tsx", PAGE)]).await;
        let node = registry.resolve("m").await.unwrap();

        assert_eq!(node.path, PathBuf::from("/app/page.tsx"));
        assert_eq!(node.start_tag.start, Position::new(3, 8));
        assert_eq!(node.end_tag.unwrap().start, Position::new(5, 8));
        assert_eq!(node.component.as_deref(), Some("Page"));
    }

    #[tokio::test]
    async fn test_not_found() {
        let (_, registry) = registry(&[("/app/page.tsx", PAGE)]).await;
        assert_eq!(
            registry.resolve("zzz").await,
            Err(RegistryError::NotFound("zzz".into()))
        );
    }

    #[tokio::test]
    async fn test_invalidate_reflects_new_text() {
        let (fs, registry) = registry(&[("/app/page.tsx", PAGE)]).await;
        let before = registry.resolve("c").await.unwrap();

        fs.insert("/app/page.tsx", format!("// header\n{}", PAGE));
        // Cached until invalidated
        assert_eq!(registry.resolve("c").await.unwrap(), before);

        registry.invalidate(Path::new("/app/page.tsx")).await;
        let after = registry.resolve("c").await.unwrap();
        assert_eq!(after.start_tag.start.line, before.start_tag.start.line + 1);
    }

    #[tokio::test]
    async fn test_invalidate_drops_removed_oids() {
        let (fs, registry) = registry(&[("/app/page.tsx", PAGE)]).await;
        fs.insert("/app/page.tsx", "const Page = () => <main data-oid=\"m\" />;");
        registry.invalidate(Path::new("/app/page.tsx")).await;

        assert!(matches!(registry.resolve("c").await, Err(RegistryError::NotFound(_))));
        assert!(registry.resolve("m").await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_within_file_is_ambiguous() {
        let (_, registry) = registry(&[(
            "/app/dup.tsx",
            "const D = () => <div data-oid=\"d\"><i data-oid=\"d\" /></div>;",
        )])
        .await;
        match registry.resolve("d").await {
            Err(RegistryError::AmbiguousSource { paths, .. }) => assert_eq!(paths.len(), 2),
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_across_files_is_ambiguous() {
        let (_, registry) = registry(&[
            ("/app/a.tsx", "const A = () => <div data-oid=\"x\" />;"),
            ("/app/b.tsx", "const B = () => <div data-oid=\"x\" />;"),
        ])
        .await;
        match registry.resolve("x").await {
            Err(RegistryError::AmbiguousSource { paths, .. }) => {
                assert_eq!(paths, vec![PathBuf::from("/app/a.tsx"), PathBuf::from("/app/b.tsx")])
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_class_lists() {
        let (_, registry) = registry(&[("/app/page.tsx", PAGE)]).await;

        let main = registry.resolve("m").await.unwrap();
        assert_eq!(registry.resolve_classes(&main).await.unwrap(), vec!["flex", "p-4"]);

        let card = registry.resolve("c").await.unwrap();
        let classes = registry.class_list(&card).await.unwrap();
        assert!(classes.dynamic);
        assert!(classes.classes.is_empty());
    }

    #[tokio::test]
    async fn test_code_block_and_oids() {
        let (_, registry) = registry(&[("/app/page.tsx", PAGE)]).await;
        assert_eq!(
            registry.code_block("c").await.unwrap(),
            r#"<Card data-oid="c" className={cn("a", active && "b")} />"#
        );
        assert_eq!(
            registry.oids_in(Path::new("/app/page.tsx")).await.unwrap(),
            vec!["m", "c"]
        );
        let location = registry.element_location("c").await.unwrap();
        assert_eq!(location.position, Position::new(4, 12));
    }

    #[tokio::test]
    async fn test_broken_file_is_skipped() {
        let (_, registry) = registry(&[
            ("/app/ok.tsx", "const A = () => <div data-oid=\"a\" />;"),
            ("/app/broken.tsx", "const B = () => { return <div data-oid=\"b\"> ; }"),
        ])
        .await;
        assert_eq!(registry.indexed_files().await, vec![PathBuf::from("/app/ok.tsx")]);
        assert!(registry.resolve("a").await.is_ok());
    }

    #[tokio::test]
    async fn test_index_project_skips_ignored_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("app")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        std::fs::write(root.join("app/page.tsx"), "const P = () => <p data-oid=\"p\" />;").unwrap();
        std::fs::write(root.join("app/notes.md"), "<p data-oid=\"q\" />").unwrap();
        std::fs::write(
            root.join("node_modules/lib/index.js"),
            "const L = () => <p data-oid=\"l\" />;",
        )
        .unwrap();

        let registry = TemplateRegistry::new(
            root,
            WorkspaceConfig::default(),
            Arc::new(onlook_common::RealFileSystem),
        );
        assert_eq!(registry.index_project().await, 1);
        assert!(registry.resolve("p").await.is_ok());
        assert!(registry.resolve("l").await.is_err());
    }
}
