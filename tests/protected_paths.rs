//! S4, S5 and invariants 1, 4, 5: directory creation/removal is always denied, and the
//! protected `ledgers`/`invoices` subtrees can't be removed or renamed away.

pub mod common;

use vaultfs_sftp::error::EngineError;
use vaultfs_sftp::server::router;
use vaultfs_sftp::store::ObjectStore;

#[tokio::test]
async fn mkdir_is_always_denied_for_any_path() {
    let ctx = common::context_for("alice");
    for path in ["/new-folder", "/ledgers/2024", "/alice/scratch"] {
        assert!(matches!(router::mkdir(&ctx, path), EngineError::PermissionDenied(_)));
    }
}

#[tokio::test]
async fn rmdir_is_always_denied_for_any_path() {
    let ctx = common::context_for("alice");
    for path in ["/ledgers", "/alice", "/whatever"] {
        assert!(matches!(router::rmdir(&ctx, path), EngineError::PermissionDenied(_)));
    }
}

#[tokio::test]
async fn remove_on_protected_root_is_denied_and_leaves_store_untouched() {
    let ctx = common::context_for("alice");
    ctx.store.put("users/alice/ledgers/.directory", "marker".into()).await.unwrap();

    let err = router::remove(&ctx, "/ledgers").await.unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));
    assert!(ctx.store.get("users/alice/ledgers/.directory").await.is_ok());
}

#[tokio::test]
async fn rename_away_from_protected_path_is_denied() {
    let ctx = common::context_for("alice");
    ctx.store.put("users/alice/invoices/.directory", "marker".into()).await.unwrap();

    let err = router::rename(&ctx, "/invoices", "/archive").await.unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));
    assert!(ctx.store.get("users/alice/invoices/.directory").await.is_ok());
}

#[tokio::test]
async fn files_inside_protected_dirs_can_still_be_removed() {
    let ctx = common::context_for("alice");
    ctx.store.put("users/alice/ledgers/q1.pdf", "pdf-body".into()).await.unwrap();

    router::remove(&ctx, "/ledgers/q1.pdf").await.unwrap();
    assert!(ctx.store.get("users/alice/ledgers/q1.pdf").await.is_err());
}

#[tokio::test]
async fn out_of_scope_path_is_denied_for_every_verb_without_touching_the_store() {
    let ctx = common::context_for("alice");
    let err = router::stat(&ctx, "/bob/secret.pdf").await.unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));
    assert!(ctx.store.list("users/bob").await.unwrap().is_empty());
}
