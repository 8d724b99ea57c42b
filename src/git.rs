use std::path::Path;

use anyhow::{Context, Result};
use git2::Repository;
use tracing::{debug, warn};

/// Full id of the HEAD commit of the repository containing `path`, if any.
pub fn head_commit<P: AsRef<Path>>(path: P) -> Option<String> {
    let path = path.as_ref();
    match find_head(path) {
        Ok(id) => Some(id),
        Err(err) => {
            if err.chain().any(|c| c.downcast_ref::<git2::Error>().map_or(false, is_not_found)) {
                debug!("'{}' is not inside a git repository", path.display());
            } else {
                warn!("Could not determine repository commit: {:#}", err);
            }
            None
        }
    }
}

fn find_head(path: &Path) -> Result<String> {
    let repo = Repository::discover(path).context("Failed to open git repository")?;
    let head = repo.head().context("Failed to resolve HEAD")?;
    let commit = head.peel_to_commit().context("HEAD does not point at a commit")?;
    Ok(commit.id().to_string())
}

fn is_not_found(err: &git2::Error) -> bool {
    err.code() == git2::ErrorCode::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;

    #[test]
    fn head_of_fresh_commit() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let sig = Signature::now("QC", "qc@example.com").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let id = repo
            .commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
            .unwrap();

        let nested = dir.path().join("qc");
        std::fs::create_dir(&nested).unwrap();

        assert_eq!(head_commit(&nested), Some(id.to_string()));
    }

    #[test]
    fn unborn_head_has_no_commit() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();

        assert_eq!(head_commit(dir.path()), None);
    }
}
