mod common;

use ::common::acl::{Catalog, Permission, ShareKind};
use ::common::crypto::{AccessMode, EncVersion};
use ::common::path::RepoPath;
use ::common::token::Operation;
use service::RepoError;

use crate::common::{path, setup, setup_sqlite, OTHER, OWNER, STRANGER};

#[tokio::test]
async fn test_owner_is_read_write_without_grant() {
    let env = setup().await;
    let repo = env.plain_repo().await;

    assert_eq!(
        env.service.check_permission(repo.id, OWNER).await.unwrap(),
        Permission::ReadWrite
    );
    assert_eq!(
        env.service.check_permission(repo.id, STRANGER).await.unwrap(),
        Permission::None
    );
}

#[tokio::test]
async fn test_unknown_repo_is_not_found() {
    let env = setup().await;
    let err = env
        .service
        .get_repo(uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
}

#[tokio::test]
async fn test_group_read_only_cannot_update() {
    let env = setup().await;
    let repo = env.plain_repo().await;
    env.catalog.grant_group(repo.id, 7, Permission::ReadOnly);
    env.catalog.add_member(7, OTHER);

    let err = env
        .service
        .issue_transfer_token(repo.id, OTHER, Operation::Update, &path("/docs/"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::PermissionDenied));

    let token = env
        .service
        .issue_transfer_token(repo.id, OTHER, Operation::Download, &path("/docs/"))
        .await
        .unwrap();
    assert_eq!(token.operation, Operation::Download);
    assert_eq!(env.service.shared_groups(repo.id, OTHER).await.unwrap(), vec![7]);
}

#[tokio::test]
async fn test_stranger_is_denied_not_told_not_found() {
    let env = setup().await;
    let repo = env.plain_repo().await;
    env.put(&repo, "/secret.txt", b"hidden").await;
    let head = env.service.head(repo.id).await.unwrap();

    let err = env
        .service
        .read_file(repo.id, STRANGER, &head, &path("/secret.txt"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::PermissionDenied));

    let err = env
        .service
        .read_file(repo.id, STRANGER, &head, &path("/missing.txt"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::PermissionDenied));
}

#[tokio::test]
async fn test_v2_without_server_crypto_routes_to_block_tokens() {
    let env = setup().await;
    let repo = env
        .service
        .create_repo("vault", OWNER, Some((EncVersion::V2, "hunter2")))
        .await
        .unwrap();
    env.catalog.set_server_crypto(OWNER, false).await.unwrap();

    assert_eq!(
        env.service.resolve_access_mode(repo.id, OWNER).await.unwrap(),
        AccessMode::BlockLevelOnly
    );

    let upload = env
        .service
        .issue_transfer_token(repo.id, OWNER, Operation::Upload, &path("/docs/"))
        .await
        .unwrap();
    assert_eq!(upload.operation, Operation::UploadBlocks);

    let update = env
        .service
        .issue_transfer_token(repo.id, OWNER, Operation::Update, &path("/docs/"))
        .await
        .unwrap();
    assert_eq!(update.operation, Operation::UpdateBlocks);

    // the server never holds this key
    let err = env
        .service
        .set_password(repo.id, OWNER, "hunter2")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Unsupported(_)));
}

#[tokio::test]
async fn test_v1_needs_password_before_tokens() {
    let env = setup().await;
    let repo = env
        .service
        .create_repo("legacy", OWNER, Some((EncVersion::V1, "hunter2")))
        .await
        .unwrap();

    // no option chosen yet
    let err = env
        .service
        .issue_transfer_token(repo.id, OWNER, Operation::Upload, &RepoPath::root())
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::CryptoOptionNotSet));

    env.catalog.set_server_crypto(OWNER, false).await.unwrap();
    let err = env
        .service
        .issue_transfer_token(repo.id, OWNER, Operation::Upload, &RepoPath::root())
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NeedsPassword));

    let err = env
        .service
        .set_password(repo.id, OWNER, "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::BadPassword));
    assert!(!env.service.is_password_set(repo.id, OWNER));

    env.service
        .set_password(repo.id, OWNER, "hunter2")
        .await
        .unwrap();
    assert!(env.service.is_password_set(repo.id, OWNER));

    let token = env
        .service
        .issue_transfer_token(repo.id, OWNER, Operation::Upload, &RepoPath::root())
        .await
        .unwrap();
    assert_eq!(token.operation, Operation::Upload);

    // the key is cached per user
    env.catalog.grant_user(repo.id, OTHER, Permission::ReadWrite);
    env.catalog.set_server_crypto(OTHER, true).await.unwrap();
    assert_eq!(
        env.service.resolve_access_mode(repo.id, OTHER).await.unwrap(),
        AccessMode::NeedsPassword
    );
}

#[tokio::test]
async fn test_set_password_on_plaintext_repo() {
    let env = setup().await;
    let repo = env.plain_repo().await;
    let err = env
        .service
        .set_password(repo.id, OWNER, "anything")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Unsupported(_)));
}

#[tokio::test]
async fn test_quota_gates_writes_only() {
    let env = setup().await;
    let repo = env.plain_repo().await;
    env.service.set_quota(repo.id, Some(8)).await.unwrap();

    let err = env
        .service
        .put_file(repo.id, OWNER, &path("/big.bin"), &[0u8; 9])
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::QuotaExceeded(_)));

    env.put(&repo, "/small.bin", &[1u8; 6]).await;
    assert_eq!(env.service.repo_size(repo.id).await.unwrap(), 6);
    assert!(!env.service.is_over_quota(repo.id).await.unwrap());

    env.service.set_quota(repo.id, Some(5)).await.unwrap();
    assert!(env.service.is_over_quota(repo.id).await.unwrap());

    let err = env
        .service
        .issue_transfer_token(repo.id, OWNER, Operation::Upload, &RepoPath::root())
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::QuotaExceeded(_)));

    // reads stay open
    env.service
        .issue_transfer_token(repo.id, OWNER, Operation::Download, &RepoPath::root())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_root_is_never_shared() {
    let env = setup().await;
    let repo = env.plain_repo().await;
    for (p, token) in [("/", "root-token"), ("/docs/", "docs-token")] {
        env.catalog.share(
            repo.id,
            OWNER,
            path(p),
            Permission::ReadOnly,
            ShareKind::Download,
            token,
        );
    }

    assert_eq!(
        env.service
            .get_dir_share(repo.id, OWNER, &RepoPath::root())
            .await
            .unwrap(),
        None
    );
    let share = env
        .service
        .get_dir_share(repo.id, OWNER, &path("/docs/"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(share.token, "docs-token");
}

#[tokio::test]
async fn test_private_share_opens_subtree() {
    let env = setup().await;
    let repo = env.plain_repo().await;
    env.catalog.share(
        repo.id,
        OWNER,
        path("/docs/"),
        Permission::ReadOnly,
        ShareKind::Private {
            to: OTHER.to_string(),
        },
        "private-token",
    );

    assert_eq!(
        env.service
            .check_path_permission(repo.id, OTHER, &path("/docs/drafts/"))
            .await
            .unwrap(),
        Permission::ReadOnly
    );
    assert_eq!(
        env.service
            .check_path_permission(repo.id, OTHER, &RepoPath::root())
            .await
            .unwrap(),
        Permission::None
    );
}

#[tokio::test]
async fn test_private_share_at_root_grants_nothing() {
    let env = setup().await;
    let repo = env.plain_repo().await;
    env.catalog.share(
        repo.id,
        OWNER,
        RepoPath::root(),
        Permission::ReadWrite,
        ShareKind::Private {
            to: OTHER.to_string(),
        },
        "root-token",
    );

    assert_eq!(
        env.service
            .check_path_permission(repo.id, OTHER, &path("/secret/"))
            .await
            .unwrap(),
        Permission::None
    );
    let err = env
        .service
        .issue_transfer_token(repo.id, OTHER, Operation::Upload, &path("/secret/"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::PermissionDenied));
}

#[tokio::test]
async fn test_token_is_redeemed_once() {
    let env = setup().await;
    let repo = env.plain_repo().await;
    let token = env
        .service
        .issue_transfer_token(repo.id, OWNER, Operation::Upload, &path("/docs/"))
        .await
        .unwrap();

    let grant = env.service.redeem_token(&token.token).await.unwrap();
    assert_eq!(grant.repo_id, repo.id);
    assert_eq!(grant.path, path("/docs/"));

    let err = env.service.redeem_token(&token.token).await.unwrap_err();
    assert!(matches!(err, RepoError::TokenConsumed));
    let err = env.service.redeem_token("not-a-token").await.unwrap_err();
    assert!(matches!(err, RepoError::TokenNotFound));
}

#[tokio::test]
async fn test_write_read_remove() {
    let env = setup().await;
    let repo = env.plain_repo().await;
    env.put(&repo, "/docs/readme.md", b"# seabed\n").await;
    env.service
        .make_dir(repo.id, OWNER, &path("/photos/"))
        .await
        .unwrap();

    let head = env.service.head(repo.id).await.unwrap();
    let root = env
        .service
        .list_dir(repo.id, &head, &RepoPath::root(), 0, 10)
        .await
        .unwrap();
    let names: Vec<_> = root.dirs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["docs", "photos"]);
    assert!(root.files.is_empty());

    assert_eq!(
        env.service
            .read_file(repo.id, OWNER, &head, &path("/docs/readme.md"))
            .await
            .unwrap(),
        b"# seabed\n"
    );

    env.service
        .remove(repo.id, OWNER, &path("/docs/readme.md"))
        .await
        .unwrap();
    let head = env.service.head(repo.id).await.unwrap();
    let err = env
        .service
        .read_file(repo.id, OWNER, &head, &path("/docs/readme.md"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::PathNotFound(_)));

    let history = env.service.history(repo.id, 10).await.unwrap();
    let descriptions: Vec<_> = history
        .iter()
        .map(|(_, c)| c.description.as_str())
        .collect();
    assert_eq!(
        descriptions,
        vec![
            "Deleted \"readme.md\"",
            "Added directory \"photos\"",
            "Added \"readme.md\"",
            "Created library",
        ]
    );
}

#[tokio::test]
async fn test_put_file_never_replaces_directory() {
    let env = setup().await;
    let repo = env.plain_repo().await;
    env.put(&repo, "/docs/a.txt", b"a").await;
    env.put(&repo, "/docs/b.txt", b"b").await;
    let before = env.service.head(repo.id).await.unwrap();

    let err = env
        .service
        .put_file(repo.id, OWNER, &path("/docs"), b"x")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Unsupported(_)));
    assert_eq!(env.service.head(repo.id).await.unwrap(), before);

    let listing = env
        .service
        .list_dir(repo.id, &before, &path("/docs/"), 0, 10)
        .await
        .unwrap();
    let names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);

    let err = env
        .service
        .make_dir(repo.id, OWNER, &path("/docs/a.txt/"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Unsupported(_)));
}

#[tokio::test]
async fn test_overwrite_counts_only_growth_against_quota() {
    let env = setup().await;
    let repo = env.plain_repo().await;
    env.service.set_quota(repo.id, Some(8)).await.unwrap();
    env.put(&repo, "/a.bin", &[1u8; 6]).await;

    // 6 bytes replaced by 7 keeps usage within 8
    env.put(&repo, "/a.bin", &[2u8; 7]).await;
    assert_eq!(env.service.repo_size(repo.id).await.unwrap(), 7);

    let err = env
        .service
        .put_file(repo.id, OWNER, &path("/b.bin"), &[3u8; 3])
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::QuotaExceeded(_)));
}

#[tokio::test]
async fn test_listing_missing_path() {
    let env = setup().await;
    let repo = env.plain_repo().await;
    env.put(&repo, "/a.txt", b"a").await;
    let head = env.service.head(repo.id).await.unwrap();

    let err = env
        .service
        .list_dir(repo.id, &head, &path("/nope/"), 0, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::PathNotFound(_)));

    // a file where a directory is expected
    let err = env
        .service
        .list_dir(repo.id, &head, &path("/a.txt/"), 0, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::PathNotFound(_)));
}

#[tokio::test]
async fn test_sqlite_backed_service() {
    let env = setup_sqlite().await;
    let repo = env.plain_repo().await;
    env.put(&repo, "/a.txt", b"hello").await;

    let meta = env.service.get_repo(repo.id).await.unwrap();
    assert_eq!(meta.size, 5);
    assert_eq!(meta.repo.name, "notes");

    let token = env
        .service
        .issue_transfer_token(repo.id, OWNER, Operation::Download, &RepoPath::root())
        .await
        .unwrap();
    env.service.redeem_token(&token.token).await.unwrap();
    assert!(matches!(
        env.service.redeem_token(&token.token).await,
        Err(RepoError::TokenConsumed)
    ));
}
