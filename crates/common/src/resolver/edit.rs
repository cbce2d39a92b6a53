use crate::linked_data::TreeId;
use crate::objects::{Tree, TreeEntry};
use crate::path::RepoPath;
use crate::store::ObjectStore;

use super::ResolveError;

/// Place `entry` at `path` under `root`, creating missing directories,
///  and return the id of the new root tree.
///
/// Every tree on the way down is rewritten, children first, so the new
///  root only ever references trees that already exist.
pub async fn insert_entry(
    objects: &ObjectStore,
    root: &TreeId,
    path: &RepoPath,
    entry: TreeEntry,
) -> Result<TreeId, ResolveError> {
    let (name, parent) = split(path)?;
    let mtime = entry.mtime;

    let mut node = objects.get_tree(root).await?;
    let mut spine = Vec::with_capacity(parent.segments().len());
    let mut consumed = String::new();
    for segment in parent.segments() {
        consumed.push('/');
        consumed.push_str(segment);
        let next = match node.get(segment) {
            Some(existing) if existing.is_dir() => objects.get_tree(&existing.id).await?,
            Some(_) => return Err(ResolveError::NotADirectory(format!("{consumed}/"))),
            None => Tree::new(),
        };
        spine.push((segment.clone(), std::mem::replace(&mut node, next)));
    }

    if node.get(name).is_some_and(|existing| existing.kind != entry.kind) {
        return Err(ResolveError::KindMismatch(path.as_file_string()));
    }
    node.insert(name.to_string(), entry)?;
    rebuild(objects, spine, node, mtime).await
}

/// Drop the entry at `path` and return the id of the new root tree
pub async fn remove_entry(
    objects: &ObjectStore,
    root: &TreeId,
    path: &RepoPath,
    mtime: i64,
) -> Result<TreeId, ResolveError> {
    let (name, parent) = split(path)?;

    let mut node = objects.get_tree(root).await?;
    let mut spine = Vec::with_capacity(parent.segments().len());
    let mut consumed = String::new();
    for segment in parent.segments() {
        consumed.push('/');
        consumed.push_str(segment);
        let next = match node.get(segment) {
            Some(existing) if existing.is_dir() => objects.get_tree(&existing.id).await?,
            Some(_) => return Err(ResolveError::NotADirectory(format!("{consumed}/"))),
            None => return Err(ResolveError::PathNotFound(format!("{consumed}/"))),
        };
        spine.push((segment.clone(), std::mem::replace(&mut node, next)));
    }

    if node.remove(name).is_none() {
        return Err(ResolveError::PathNotFound(path.as_file_string()));
    }
    rebuild(objects, spine, node, mtime).await
}

fn split(path: &RepoPath) -> Result<(&str, RepoPath), ResolveError> {
    match (path.name(), path.parent()) {
        (Some(name), Some(parent)) => Ok((name, parent)),
        _ => Err(ResolveError::RootEntry),
    }
}

/// Store `leaf`, then re-point each ancestor at its rewritten child
async fn rebuild(
    objects: &ObjectStore,
    spine: Vec<(String, Tree)>,
    leaf: Tree,
    mtime: i64,
) -> Result<TreeId, ResolveError> {
    let mut child_size = leaf.total_size();
    let mut child_id = objects.put_tree(&leaf).await?;
    for (name, mut tree) in spine.into_iter().rev() {
        tree.insert(name, TreeEntry::dir(child_id, child_size, mtime))?;
        child_size = tree.total_size();
        child_id = objects.put_tree(&tree).await?;
    }
    Ok(child_id)
}
