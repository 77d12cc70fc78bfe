//! Recursive filesystem crawler
//!
//! Discovers candidate plugin/task directories for the build. The crawl
//! is best-effort by design: an unreadable directory is indistinguishable
//! from an empty one, and the crawl as a whole never fails. Entries that
//! cannot be stat'ed are classified as [`EntryKind::Unreadable`] and
//! reported in neither list.

use futures::future::BoxFuture;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::scheduler::parallel;

/// Classification of a single directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// stat failed; the entry is dropped from the crawl output
    Unreadable,
}

/// A classified directory entry, produced transiently during a crawl
#[derive(Debug, Clone)]
pub struct FileSystemEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Accumulated output of one crawl.
///
/// `files` covers the entire subtree under the crawl root; `directories`
/// only ever contains the root's immediate subdirectories. The asymmetry
/// is intentional: discovery wants every file, but consumers of the
/// directory list (installed-plugin lookup) only care about direct
/// children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlResult {
    pub files: Vec<PathBuf>,
    pub directories: Vec<PathBuf>,
}

/// Recursive directory walker built on the parallel fan-out primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCrawler;

impl FsCrawler {
    pub fn new() -> Self {
        Self
    }

    /// Walk the tree under `root`, skipping any directory whose canonical
    /// path appears in `excluded`. Exclusion is inherited: the set is
    /// re-applied at every recursive level, so excluding a directory
    /// prunes its whole subtree.
    pub async fn crawl(&self, root: impl AsRef<Path>, excluded: &[PathBuf]) -> CrawlResult {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return CrawlResult::default();
        }

        let mut resolved = HashSet::with_capacity(excluded.len());
        for path in excluded {
            // An excluded path that cannot be canonicalized is matched as given.
            match tokio::fs::canonicalize(path).await {
                Ok(canonical) => resolved.insert(canonical),
                Err(_) => resolved.insert(path.clone()),
            };
        }

        crawl_level(root.to_path_buf(), Arc::new(resolved)).await
    }
}

/// One level of the crawl. Boxed because the fan-out over subdirectories
/// recurses into this same function.
fn crawl_level(
    root: PathBuf,
    excluded: Arc<HashSet<PathBuf>>,
) -> BoxFuture<'static, CrawlResult> {
    Box::pin(async move {
        let mut result = CrawlResult::default();

        let root = match tokio::fs::canonicalize(&root).await {
            Ok(path) => path,
            Err(err) => {
                debug!("skipping unresolvable directory {}: {}", root.display(), err);
                return result;
            }
        };

        let mut entries = Vec::new();
        let mut reader = match tokio::fs::read_dir(&root).await {
            Ok(reader) => reader,
            Err(err) => {
                debug!("skipping unreadable directory {}: {}", root.display(), err);
                return result;
            }
        };
        loop {
            match reader.next_entry().await {
                Ok(Some(entry)) => entries.push(entry.path()),
                Ok(None) => break,
                Err(err) => {
                    debug!("listing of {} cut short: {}", root.display(), err);
                    break;
                }
            }
        }
        if entries.is_empty() {
            return result;
        }
        // Directory listing order is platform-dependent; sort so crawl
        // output is reproducible.
        entries.sort();

        for entry in parallel(entries, classify).await {
            match entry.kind {
                EntryKind::File => result.files.push(entry.path),
                EntryKind::Directory => {
                    if !excluded.contains(&entry.path) {
                        result.directories.push(entry.path);
                    }
                }
                EntryKind::Unreadable => {
                    warn!("could not stat {}; entry skipped", entry.path.display());
                }
            }
        }

        if !result.directories.is_empty() {
            let children = parallel(result.directories.clone(), {
                let excluded = excluded.clone();
                move |dir| crawl_level(dir, excluded.clone())
            })
            .await;
            // Child files merge in input order; child directories are
            // deliberately not merged back up.
            for child in children {
                result.files.extend(child.files);
            }
        }

        result
    })
}

async fn classify(path: PathBuf) -> FileSystemEntry {
    match tokio::fs::metadata(&path).await {
        Ok(metadata) => {
            let kind = if metadata.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            FileSystemEntry { path, kind }
        }
        Err(_) => FileSystemEntry {
            path,
            kind: EntryKind::Unreadable,
        },
    }
}
