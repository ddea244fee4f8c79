mod common;

use common::{fixture, intune_request};
use nsgen_bundle::{BundleError, ConfigRequest, DownloadHandle, DownloadStore};
use nsgen_domain::config::BundleLayout;
use std::io::Cursor;
use zip::ZipArchive;

#[tokio::test]
async fn link_downloads_exactly_once() {
    let fx = fixture(BundleLayout::Plist).await;
    let ticket = fx.bundle.generate_link(intune_request()).await.unwrap();

    assert_eq!(ticket.token.len(), 24);
    assert_eq!(fx.downloads.len(), 1);
    assert!(fx.storage.exists(format!("{}.zip", ticket.token)).unwrap());

    let bytes = fx.bundle.download(&ticket.token).await.unwrap();
    assert_eq!(ZipArchive::new(Cursor::new(bytes)).unwrap().len(), 3);

    assert!(!fx.storage.exists(format!("{}.zip", ticket.token)).unwrap());
    assert_eq!(fx.downloads.len(), 0);

    let err = fx.bundle.download(&ticket.token).await.unwrap_err();
    assert!(matches!(err, BundleError::NotFound { .. }));
}

#[tokio::test]
async fn expired_handle_is_discarded() {
    let fx = fixture(BundleLayout::Plist).await;
    let token = "AbCdEfGhJkMnPqRsTuVwXyZ2";
    let file = format!("{token}.zip");

    fx.storage.write(&file, b"stale").await.unwrap();
    assert!(fx.downloads.put(token, DownloadHandle::new(file.as_str(), 0)));

    let err = fx.bundle.download(token).await.unwrap_err();
    assert!(matches!(err, BundleError::NotFound { .. }));
    assert!(!fx.storage.exists(&file).unwrap());
    assert!(fx.downloads.get(token).is_none());
}

#[tokio::test]
async fn concurrent_downloads_have_one_winner() {
    let fx = fixture(BundleLayout::Plist).await;
    let ticket = fx.bundle.generate_link(intune_request()).await.unwrap();

    let (first, second) =
        tokio::join!(fx.bundle.download(&ticket.token), fx.bundle.download(&ticket.token));

    assert_eq!(u8::from(first.is_ok()) + u8::from(second.is_ok()), 1);
    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(loser, Err(BundleError::NotFound { .. })));
}

#[tokio::test]
async fn malformed_and_unknown_tokens_are_not_found() {
    let fx = fixture(BundleLayout::Plist).await;

    for token in ["", "../../etc/passwd", "short", "AbCdEfGhJkMnPqRsTuVwXyZ2"] {
        let err = fx.bundle.download(token).await.unwrap_err();
        assert!(matches!(err, BundleError::NotFound { .. }), "{token}");
    }
}

#[tokio::test]
async fn invalid_request_never_registers_a_link() {
    let fx = fixture(BundleLayout::Plist).await;
    let err = fx
        .bundle
        .generate_link(ConfigRequest { tenant_name: "john.doe".to_owned(), ..intune_request() })
        .await
        .unwrap_err();

    assert!(matches!(err, BundleError::Validation { .. }));
    assert_eq!(fx.downloads.len(), 0);
    assert_eq!(std::fs::read_dir(fx.storage.root()).unwrap().count(), 0);
}

#[tokio::test]
async fn init_registers_the_slice() {
    let fx = fixture(BundleLayout::Plist).await;
    let slice = nsgen_bundle::init(fx.bundle.config(), fx.storage.clone()).unwrap();
    assert!(slice.downcast_ref::<nsgen_bundle::Bundle>().is_some());

    let broken = nsgen_domain::config::BundleConfig {
        download_ttl_seconds: 0,
        ..fx.bundle.config().clone()
    };
    let err = nsgen_bundle::init(&broken, fx.storage.clone()).unwrap_err();
    assert!(matches!(err, BundleError::ConfigConsistency { .. }));
}

#[tokio::test]
async fn unreadable_archive_still_consumes_the_token() {
    let fx = fixture(BundleLayout::Plist).await;
    let token = "HkMnPqRsTuVwXyZ23456789a";
    let file = format!("{token}.zip");

    std::fs::create_dir(fx.storage.root().join(&file)).unwrap();
    assert!(fx.downloads.put(token, DownloadHandle::new(file.as_str(), 300)));

    let err = fx.bundle.download(token).await.unwrap_err();
    assert!(matches!(err, BundleError::Storage { .. }), "{err:?}");
    assert!(!err.is_client_error());
    assert_eq!(fx.downloads.len(), 0);

    let err = fx.bundle.download(token).await.unwrap_err();
    assert!(matches!(err, BundleError::NotFound { .. }));
}

#[tokio::test]
async fn new_links_sweep_abandoned_ones() {
    let fx = fixture(BundleLayout::Plist).await;
    let stale = "AbCdEfGhJkMnPqRsTuVwXyZ2";
    let stale_file = format!("{stale}.zip");

    fx.storage.write(&stale_file, b"abandoned").await.unwrap();
    assert!(fx.downloads.put(stale, DownloadHandle::new(stale_file.as_str(), 0)));

    let ticket = fx.bundle.generate_link(intune_request()).await.unwrap();

    assert!(!fx.storage.exists(&stale_file).unwrap());
    assert!(fx.downloads.get(stale).is_none());
    assert_eq!(fx.downloads.len(), 1);
    assert!(fx.storage.exists(format!("{}.zip", ticket.token)).unwrap());
}
