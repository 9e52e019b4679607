//! Ingestion: discover markdown sources, resolve them into entries and
//! reconcile the store with the content tree.

use crate::config::{Config, ConfigError};
use crate::content::{relative_path, render_entry, EntryDraft, SourceFile};
use crate::frontmatter::parse_frontmatter;
use crate::markdown::{LinkReport, LinkTargets, MarkdownProcessor};
use crate::models::{Diagnostic, DiagnosticSeverity};
use crate::store::{Store, StoreError, UpsertOutcome};
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Content directory not found: {0}")]
    ContentDirMissing(PathBuf),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Slug `{slug}` produced by both {first} and {second}")]
    SlugCollision {
        slug: String,
        first: String,
        second: String,
    },
}

/// Counts and diagnostics from one ingestion run
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub discovered: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub skipped: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl IngestReport {
    /// Entries accepted this run
    pub fn entries(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }
}

/// Drafts that survived parsing and collision checks
struct Prepared {
    drafts: Vec<EntryDraft>,
    targets: LinkTargets,
    /// Relative paths of files that exist but could not be read or parsed
    unparsed: HashSet<String>,
}

/// Drives a content tree into the store
pub struct Ingestor<'a> {
    config: &'a Config,
    processor: MarkdownProcessor,
    full: bool,
}

impl<'a> Ingestor<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            processor: MarkdownProcessor::new(),
            full: false,
        }
    }

    /// Reset the store before ingesting and re-render every entry
    pub fn full(mut self, full: bool) -> Self {
        self.full = full;
        self
    }

    /// Ingest every source file and reconcile the store
    pub fn run(&self, store: &mut Store) -> Result<IngestReport, IngestError> {
        let mut report = IngestReport::default();
        let prepared = self.prepare(&mut report, true)?;
        let base_url = self.config.normalized_base_url();

        if self.full {
            tracing::info!("Full rebuild: clearing store");
            store.reset()?;
        }

        for draft in &prepared.drafts {
            let fingerprint = draft.fingerprint(&prepared.targets, &base_url);
            if !self.full && store.fingerprint(&draft.slug)?.as_deref() == Some(fingerprint.as_str())
            {
                tracing::debug!(slug = %draft.slug, "unchanged, skipping render");
                let links = self.processor.scan_links(&draft.body, &prepared.targets);
                report.diagnostics.extend(unresolved_diagnostics(draft, &links));
                report.unchanged += 1;
                continue;
            }

            let (entry, links) =
                render_entry(&self.processor, draft, &prepared.targets, &base_url);
            report.diagnostics.extend(unresolved_diagnostics(draft, &links));

            match store.upsert(&entry, &draft.topics)? {
                UpsertOutcome::Inserted => report.inserted += 1,
                UpsertOutcome::Updated => report.updated += 1,
                UpsertOutcome::Unchanged => report.unchanged += 1,
            }
        }

        if self.config.prune_missing {
            let produced: HashSet<&str> =
                prepared.drafts.iter().map(|d| d.slug.as_str()).collect();
            let mut stale = Vec::new();
            for (slug, source_path) in store.sources()? {
                if produced.contains(slug.as_str()) {
                    continue;
                }
                // A file that failed to parse keeps its last good entry
                if prepared.unparsed.contains(&source_path) {
                    tracing::debug!(slug = %slug, "keeping entry of unparsable {}", source_path);
                    continue;
                }
                stale.push(slug);
            }
            if !stale.is_empty() {
                tracing::info!("Removing {} stale entries", stale.len());
                report.removed = store.remove_entries(&stale)?;
            }
        }

        tracing::info!(
            "Ingested {} entries ({} new, {} updated, {} unchanged, {} removed, {} skipped)",
            report.entries(),
            report.inserted,
            report.updated,
            report.unchanged,
            report.removed,
            report.skipped
        );

        Ok(report)
    }

    /// Parse everything and resolve cross-references without touching a store.
    ///
    /// Slug collisions under `strict_slugs` are reported as error diagnostics
    /// instead of aborting.
    pub fn verify(&self) -> Result<IngestReport, IngestError> {
        let mut report = IngestReport::default();
        let prepared = self.prepare(&mut report, false)?;

        for draft in &prepared.drafts {
            let links = self.processor.scan_links(&draft.body, &prepared.targets);
            report.diagnostics.extend(unresolved_diagnostics(draft, &links));
        }

        Ok(report)
    }

    fn prepare(
        &self,
        report: &mut IngestReport,
        collisions_fatal: bool,
    ) -> Result<Prepared, IngestError> {
        let root = self.config.content_dir();
        let files = discover_markdown_files(&root, &self.config.compile_ignore_patterns()?)?;
        report.discovered = files.len();
        tracing::info!("Found {} markdown files", files.len());

        let mut drafts: Vec<EntryDraft> = Vec::new();
        let mut by_slug: HashMap<String, usize> = HashMap::new();
        let mut unparsed = HashSet::new();

        for path in &files {
            let rel_path = relative_path(&root, path);
            let Some(draft) = self.load_draft(&root, path, &rel_path, report) else {
                unparsed.insert(rel_path);
                report.skipped += 1;
                continue;
            };

            match by_slug.get(&draft.slug) {
                Some(&idx) => {
                    let previous = &drafts[idx];
                    let severity = if self.config.strict_slugs {
                        if collisions_fatal {
                            return Err(IngestError::SlugCollision {
                                slug: draft.slug.clone(),
                                first: previous.source_path.clone(),
                                second: draft.source_path.clone(),
                            });
                        }
                        DiagnosticSeverity::Error
                    } else {
                        DiagnosticSeverity::Warning
                    };
                    tracing::warn!(
                        "Slug `{}` from {} replaces {}",
                        draft.slug,
                        draft.source_path,
                        previous.source_path
                    );
                    report.diagnostics.push(
                        Diagnostic::new(
                            severity,
                            "slug.collision",
                            format!("replaces entry from {}", previous.source_path),
                        )
                        .with_source(&draft.source_path)
                        .with_slug(&draft.slug),
                    );
                    report.skipped += 1;
                    drafts[idx] = draft;
                }
                None => {
                    by_slug.insert(draft.slug.clone(), drafts.len());
                    drafts.push(draft);
                }
            }
        }

        let mut targets = LinkTargets::new();
        for draft in &drafts {
            targets.insert(&draft.title, &draft.slug);
        }

        Ok(Prepared {
            drafts,
            targets,
            unparsed,
        })
    }

    fn load_draft(
        &self,
        root: &Path,
        path: &Path,
        rel_path: &str,
        report: &mut IngestReport,
    ) -> Option<EntryDraft> {
        let source = match SourceFile::read(root, path) {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!("Failed to read {:?}: {}", path, err);
                report.diagnostics.push(
                    Diagnostic::warning("file.unreadable", err.to_string()).with_source(rel_path),
                );
                return None;
            }
        };

        match parse_frontmatter(&source.content) {
            Ok((frontmatter, body)) => Some(EntryDraft::from_source(&source, frontmatter, body)),
            Err(err) => {
                tracing::warn!("Skipping {}: {}", source.rel_path, err);
                report.diagnostics.push(
                    Diagnostic::warning("frontmatter.malformed", err.to_string())
                        .with_source(&source.rel_path),
                );
                None
            }
        }
    }
}

fn unresolved_diagnostics<'d>(
    draft: &'d EntryDraft,
    links: &'d LinkReport,
) -> impl Iterator<Item = Diagnostic> + 'd {
    links.unresolved.iter().map(move |target| {
        Diagnostic::info(
            "link.unresolved",
            format!("no entry titled `{}`", target),
        )
        .with_source(&draft.source_path)
        .with_slug(&draft.slug)
    })
}

/// All `*.md` files under `root` not matched by `ignores`, sorted by relative path
pub fn discover_markdown_files(root: &Path, ignores: &[Regex]) -> Result<Vec<PathBuf>, IngestError> {
    if !root.is_dir() {
        return Err(IngestError::ContentDirMissing(root.to_path_buf()));
    }

    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("Skipping unreadable path: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        if ignores.iter().any(|re| re.is_match(&rel)) {
            tracing::debug!("Ignoring {} due to ignore_patterns", rel);
            continue;
        }

        files.push((rel, entry.into_path()));
    }

    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn slugs(store: &Store) -> Vec<String> {
        store
            .sources()
            .unwrap()
            .into_iter()
            .map(|(slug, _)| slug)
            .collect()
    }

    fn setup() -> (TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("content")).unwrap();
        let config = Config::new("Test").with_root(dir.path());
        (dir, config)
    }

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join("content").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn discovers_sorted_markdown_only() {
        let (dir, config) = setup();
        write(&dir, "b.md", "b");
        write(&dir, "a/z.md", "z");
        write(&dir, "notes.txt", "x");
        write(&dir, "drafts/wip.md", "w");

        let ignores = vec![Regex::new("^drafts/").unwrap()];
        let files = discover_markdown_files(&config.content_dir(), &ignores).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(config.content_dir()).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("a/z.md"), PathBuf::from("b.md")]);
    }

    #[test]
    fn missing_content_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new("Test").with_root(dir.path());
        let mut store = Store::open_in_memory().unwrap();
        assert!(matches!(
            Ingestor::new(&config).run(&mut store),
            Err(IngestError::ContentDirMissing(_))
        ));
    }

    #[test]
    fn second_run_is_unchanged() {
        let (dir, config) = setup();
        write(&dir, "a.md", "---\ntitle: A\ntopics: [x]\n---\nSee [[B]].");
        write(&dir, "b.md", "---\ntitle: B\n---\nhello");
        let mut store = Store::open_in_memory().unwrap();

        let first = Ingestor::new(&config).run(&mut store).unwrap();
        assert_eq!(first.inserted, 2);

        let second = Ingestor::new(&config).run(&mut store).unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.unchanged, 2);
    }

    #[test]
    fn new_title_rerenders_referencing_entries() {
        let (dir, config) = setup();
        write(&dir, "a.md", "---\ntitle: A\n---\nSee [[B]].");
        let mut store = Store::open_in_memory().unwrap();

        let first = Ingestor::new(&config).run(&mut store).unwrap();
        assert_eq!(first.diagnostics.len(), 1);
        assert!(store.entry("a").unwrap().unwrap().html.contains("<em>B</em>"));

        write(&dir, "b.md", "---\ntitle: B\n---\nhello");
        let second = Ingestor::new(&config).run(&mut store).unwrap();
        assert_eq!(second.updated, 1);
        assert_eq!(second.inserted, 1);
        assert!(store
            .entry("a")
            .unwrap()
            .unwrap()
            .html
            .contains("href=\"/til/b/\""));
    }

    #[test]
    fn malformed_frontmatter_is_skipped_with_diagnostic() {
        let (dir, config) = setup();
        write(&dir, "bad.md", "---\ntitle: [unclosed\n---\nbody");
        write(&dir, "good.md", "# Good\nbody");
        let mut store = Store::open_in_memory().unwrap();

        let report = Ingestor::new(&config).run(&mut store).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.diagnostics[0].code, "frontmatter.malformed");
        assert_eq!(report.diagnostics[0].source_path.as_deref(), Some("bad.md"));
    }

    #[test]
    fn slug_collision_last_file_wins() {
        let (dir, config) = setup();
        write(&dir, "a.md", "---\ntitle: Same\n---\nfirst");
        write(&dir, "b.md", "---\ntitle: Same\n---\nsecond");
        let mut store = Store::open_in_memory().unwrap();

        let report = Ingestor::new(&config).run(&mut store).unwrap();
        assert_eq!(report.inserted, 1);
        assert!(report.diagnostics.iter().any(|d| d.code == "slug.collision"));
        assert_eq!(store.entry("same").unwrap().unwrap().source_path, "b.md");
    }

    #[test]
    fn strict_slugs_make_collisions_fatal() {
        let (dir, mut config) = setup();
        config.strict_slugs = true;
        write(&dir, "a.md", "---\ntitle: Same\n---\n");
        write(&dir, "b.md", "---\nslug: same\n---\n");
        let mut store = Store::open_in_memory().unwrap();

        match Ingestor::new(&config).run(&mut store) {
            Err(IngestError::SlugCollision { slug, first, second }) => {
                assert_eq!(slug, "same");
                assert_eq!(first, "a.md");
                assert_eq!(second, "b.md");
            }
            other => panic!("expected collision, got {:?}", other.map(|r| r.inserted)),
        }
        assert!(slugs(&store).is_empty());
    }

    #[test]
    fn deleted_sources_are_pruned() {
        let (dir, config) = setup();
        write(&dir, "a.md", "# A");
        write(&dir, "b.md", "# B");
        let mut store = Store::open_in_memory().unwrap();
        Ingestor::new(&config).run(&mut store).unwrap();

        fs::remove_file(dir.path().join("content/b.md")).unwrap();
        let report = Ingestor::new(&config).run(&mut store).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(slugs(&store), vec!["a"]);
    }

    #[test]
    fn malformed_edit_keeps_last_good_entry() {
        let (dir, config) = setup();
        write(&dir, "a.md", "---\ntitle: A\n---\nfirst draft");
        let mut store = Store::open_in_memory().unwrap();
        Ingestor::new(&config).run(&mut store).unwrap();

        write(&dir, "a.md", "---\ntitle: [oops\n---\nsecond draft");
        let report = Ingestor::new(&config).run(&mut store).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.removed, 0);
        assert_eq!(slugs(&store), vec!["a"]);
        assert!(store.entry("a").unwrap().unwrap().html.contains("first draft"));

        fs::remove_file(dir.path().join("content/a.md")).unwrap();
        let report = Ingestor::new(&config).run(&mut store).unwrap();
        assert_eq!(report.removed, 1);
        assert!(slugs(&store).is_empty());
    }

    #[test]
    fn touched_file_refreshes_mtime_dates() {
        let (dir, config) = setup();
        write(&dir, "a.md", "# A\nbody");
        let path = dir.path().join("content/a.md");
        let set_mtime = |secs: u64| {
            fs::File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(UNIX_EPOCH + Duration::from_secs(secs))
                .unwrap();
        };
        let mut store = Store::open_in_memory().unwrap();

        set_mtime(1_700_000_000);
        Ingestor::new(&config).run(&mut store).unwrap();
        let before = store.entry("a").unwrap().unwrap().created;

        set_mtime(1_710_000_000);
        let report = Ingestor::new(&config).run(&mut store).unwrap();
        assert_eq!(report.updated, 1);
        let after = store.entry("a").unwrap().unwrap();
        assert_ne!(after.created, before);

        let mut regenerated = Store::open_in_memory().unwrap();
        Ingestor::new(&config).run(&mut regenerated).unwrap();
        assert_eq!(regenerated.entry("a").unwrap().unwrap(), after);
    }

    #[test]
    fn consecutive_runs_report_same_diagnostics() {
        let (dir, config) = setup();
        write(&dir, "a.md", "---\ntitle: A\n---\nSee [[Missing]] and [[B]].");
        write(&dir, "b.md", "---\ntitle: B\n---\nSee [[Gone]].");
        let mut store = Store::open_in_memory().unwrap();

        let first = Ingestor::new(&config).run(&mut store).unwrap();
        let second = Ingestor::new(&config).run(&mut store).unwrap();
        assert_eq!(second.unchanged, 2);
        assert_eq!(first.diagnostics.len(), 2);
        assert_eq!(first.diagnostics, second.diagnostics);
        assert_eq!(
            Ingestor::new(&config).verify().unwrap().diagnostics,
            first.diagnostics
        );
    }

    #[test]
    fn verify_reports_strict_collisions_as_errors() {
        let (dir, mut config) = setup();
        config.strict_slugs = true;
        write(&dir, "a.md", "---\ntitle: Same\n---\n");
        write(&dir, "b.md", "---\nslug: same\n---\n");

        let report = Ingestor::new(&config).verify().unwrap();
        let collision = report
            .diagnostics
            .iter()
            .find(|d| d.code == "slug.collision")
            .unwrap();
        assert_eq!(collision.severity, DiagnosticSeverity::Error);
        assert_eq!(collision.source_path.as_deref(), Some("b.md"));

        config.strict_slugs = false;
        let report = Ingestor::new(&config).verify().unwrap();
        assert_eq!(report.diagnostics[0].severity, DiagnosticSeverity::Warning);
    }

    #[test]
    fn verify_does_not_need_a_store() {
        let (dir, config) = setup();
        write(&dir, "a.md", "---\ntitle: A\n---\n[[Nowhere]]");
        let report = Ingestor::new(&config).verify().unwrap();
        assert_eq!(report.discovered, 1);
        assert_eq!(report.diagnostics[0].code, "link.unresolved");
    }
}
