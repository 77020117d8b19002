// ABOUTME: Diff providers: libgit2 against the local working tree, or the remote diff service

use crate::error::ServiceError;
use futures_util::future::{BoxFuture, FutureExt};
use git2::{DiffFormat, DiffOptions, Repository};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// What to diff: one file, relative to (or inside) a repository root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRequest {
    pub repo_root: PathBuf,
    pub path: String,
}

/// Produces unified diff text for a single file. Empty text means unchanged.
pub trait DiffSource: Send + Sync {
    fn fetch(&self, request: DiffRequest) -> BoxFuture<'static, Result<String, ServiceError>>;
}

/// Diffs HEAD (plus index) against the working tree with libgit2
#[derive(Debug, Clone, Default)]
pub struct GitDiffSource;

impl DiffSource for GitDiffSource {
    fn fetch(&self, request: DiffRequest) -> BoxFuture<'static, Result<String, ServiceError>> {
        async move {
            tokio::task::spawn_blocking(move || diff_for_path(&request.repo_root, &request.path))
                .await
                .map_err(|e| ServiceError::Task(e.to_string()))?
        }
        .boxed()
    }
}

/// Unified diff of `path` between HEAD and the working tree. Untracked files
/// are diffed against nothing.
pub fn diff_for_path(repo_root: &Path, path: &str) -> Result<String, ServiceError> {
    let repo = Repository::discover(repo_root)?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| ServiceError::Malformed("repository has no working tree".to_string()))?
        .to_path_buf();
    let relative = repo_relative(&workdir, repo_root, path);

    // An unborn HEAD diffs against the empty tree
    let head_tree = match repo.head() {
        Ok(head) => Some(head.peel_to_tree()?),
        Err(_) => None,
    };

    let mut opts = DiffOptions::new();
    opts.pathspec(&relative)
        .disable_pathspec_match(true)
        .include_untracked(true)
        .recurse_untracked_dirs(true)
        .show_untracked_content(true)
        .include_ignored(false);

    let diff = repo.diff_tree_to_workdir_with_index(head_tree.as_ref(), Some(&mut opts))?;

    let mut patch = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        if let origin @ ('+' | '-' | ' ') = line.origin() {
            patch.push(origin);
        }
        patch.push_str(&String::from_utf8_lossy(line.content()));
        true
    })?;

    debug!("git diff for {}: {} bytes", relative, patch.len());
    Ok(patch)
}

/// Path of `path` relative to the repository working tree, with `/` separators
fn repo_relative(workdir: &Path, root: &Path, path: &str) -> String {
    let candidate = Path::new(path);
    let absolute = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    let workdir = workdir
        .canonicalize()
        .unwrap_or_else(|_| workdir.to_path_buf());
    let absolute = absolute.canonicalize().unwrap_or(absolute);
    match absolute.strip_prefix(&workdir) {
        Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
        Err(_) => path.trim_start_matches("./").to_string(),
    }
}

/// Fetches diffs from `GET {server}/api/git/diff?path=..&root=..`
#[derive(Debug, Clone)]
pub struct HttpDiffSource {
    client: reqwest::Client,
    base: Url,
}

impl HttpDiffSource {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let base = Url::parse(server_url)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    pub fn endpoint(&self, request: &DiffRequest) -> Result<Url, ServiceError> {
        let mut url = self.base.join("api/git/diff")?;
        url.query_pairs_mut()
            .append_pair("path", &request.path)
            .append_pair("root", &request.repo_root.to_string_lossy());
        Ok(url)
    }
}

impl DiffSource for HttpDiffSource {
    fn fetch(&self, request: DiffRequest) -> BoxFuture<'static, Result<String, ServiceError>> {
        let client = self.client.clone();
        let url = self.endpoint(&request);
        async move {
            let response = client.get(url?).send().await?.error_for_status()?;
            Ok(response.text().await?)
        }
        .boxed()
    }
}
