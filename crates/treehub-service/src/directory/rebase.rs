//! Ancestor chain rebasing for subtree moves.
//!
//! Chains are rebased as ordered sequences: everything up to and including
//! the moved directory is replaced by the new prefix, and the segment below
//! the moved directory is kept in order.

use uuid::Uuid;

use treehub_core::error::AppError;
use treehub_core::result::AppResult;
use treehub_database::{AncestorRewrite, MoveBatch, NodeKind};
use treehub_entity::{Directory, File};

/// Rebase `chain` so that `moved` sits directly below `new_prefix`.
///
/// `chain` must contain `moved`; a descendant whose chain lacks it means
/// the containment query and the chain disagree, which is an internal error.
pub fn rebase_chain(chain: &[Uuid], moved: Uuid, new_prefix: &[Uuid]) -> AppResult<Vec<Uuid>> {
    let position = chain.iter().position(|id| *id == moved).ok_or_else(|| {
        AppError::internal(format!("Ancestor chain does not contain moved directory {moved}"))
    })?;
    let suffix = &chain[position + 1..];

    let mut rebased = Vec::with_capacity(new_prefix.len() + 1 + suffix.len());
    rebased.extend_from_slice(new_prefix);
    rebased.push(moved);
    rebased.extend_from_slice(suffix);
    Ok(rebased)
}

/// Plan the batch that moves `source` under `target`.
///
/// `directories` and `files` are the source's descendants as returned by
/// the containment queries.
pub fn plan_move(
    source: &Directory,
    target: &Directory,
    directories: &[Directory],
    files: &[File],
) -> AppResult<MoveBatch> {
    let new_prefix = target.child_ancestors();

    let mut descendants = Vec::with_capacity(directories.len() + files.len());
    for directory in directories {
        descendants.push(AncestorRewrite {
            kind: NodeKind::Directory,
            id: directory.id,
            expected: directory.ancestors.clone(),
            ancestors: rebase_chain(&directory.ancestors, source.id, &new_prefix)?,
        });
    }
    for file in files {
        descendants.push(AncestorRewrite {
            kind: NodeKind::File,
            id: file.id,
            expected: file.ancestors.clone(),
            ancestors: rebase_chain(&file.ancestors, source.id, &new_prefix)?,
        });
    }

    Ok(MoveBatch {
        directory_id: source.id,
        parent_id: target.id,
        expected: source.ancestors.clone(),
        ancestors: new_prefix,
        descendants,
    })
}
