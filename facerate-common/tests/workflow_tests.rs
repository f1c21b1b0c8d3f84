//! Integration tests for the rating workflow
//!
//! Drives complete visitor journeys against a temporary image folder and
//! both store backends:
//! - registration and login against the shared password
//! - sticky image presentation, rating, skipping, completion
//! - upsert semantics on re-rating
//! - store failures leaving the held image in place

use async_trait::async_trait;
use facerate_common::store::{IdentityStore, MemoryStore, RatingStore, SqliteStore};
use facerate_common::{
    Error, ImageCatalog, Rating, RatingWorkflow, Score, Screen, SessionContext, Step, Storage,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const PASSWORD: &str = "choppedtheapp";

/// Test helper: image folder containing the given (empty) files
fn image_folder(names: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        std::fs::write(dir.path().join(name), b"img").unwrap();
    }
    dir
}

fn memory_workflow(images: &TempDir) -> RatingWorkflow {
    RatingWorkflow::new(ImageCatalog::new(images.path()), Storage::memory(), PASSWORD)
}

async fn registered(workflow: &RatingWorkflow, user: &str) -> Step {
    let step = workflow
        .register(SessionContext::anonymous(), user, PASSWORD)
        .await;
    assert!(step.error.is_none(), "registration failed: {:?}", step.error);
    step
}

fn presented_image(step: &Step) -> String {
    match &step.view.screen {
        Screen::Rating { image } => image.clone(),
        other => panic!("expected rating screen, got {:?}", other),
    }
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_register_then_login() {
    let images = image_folder(&["a.jpg"]);
    let workflow = memory_workflow(&images);

    let step = registered(&workflow, "alice").await;
    assert_eq!(step.session.user.as_deref(), Some("alice"));
    assert!(matches!(step.view.screen, Screen::Rating { .. }));

    let step = workflow.logout(step.session).await;
    assert_eq!(step.session, SessionContext::anonymous());
    assert_eq!(step.view.screen, Screen::Auth);

    let step = workflow.login(step.session, "alice", PASSWORD).await;
    assert!(step.error.is_none());
    assert!(step.session.is_authenticated());
}

#[tokio::test]
async fn test_register_with_wrong_password_never_creates_user() {
    let images = image_folder(&["a.jpg"]);
    let workflow = memory_workflow(&images);

    let step = workflow
        .register(SessionContext::anonymous(), "mallory", "guess")
        .await;
    assert_eq!(step.error, Some(Error::InvalidCredentials));
    assert_eq!(step.view.screen, Screen::Auth);
    assert!(!step.session.is_authenticated());
    assert!(!workflow.storage().identities.exists("mallory").await.unwrap());
}

#[tokio::test]
async fn test_register_rejects_taken_and_empty_usernames() {
    let images = image_folder(&["a.jpg"]);
    let workflow = memory_workflow(&images);
    registered(&workflow, "alice").await;

    let step = workflow
        .register(SessionContext::anonymous(), "alice", PASSWORD)
        .await;
    assert_eq!(step.error, Some(Error::UsernameTaken));
    assert_eq!(step.view.error.as_deref(), Some("Username already taken"));

    let step = workflow
        .register(SessionContext::anonymous(), "   ", PASSWORD)
        .await;
    assert_eq!(step.error, Some(Error::EmptyUsername));
    assert!(!step.session.is_authenticated());
}

#[tokio::test]
async fn test_login_requires_registration_and_password() {
    let images = image_folder(&["a.jpg"]);
    let workflow = memory_workflow(&images);
    registered(&workflow, "alice").await;

    let unknown = workflow
        .login(SessionContext::anonymous(), "bob", PASSWORD)
        .await;
    assert_eq!(unknown.error, Some(Error::InvalidCredentials));

    let wrong = workflow
        .login(SessionContext::anonymous(), "alice", "nope")
        .await;
    assert_eq!(wrong.error, Some(Error::InvalidCredentials));
    assert_eq!(wrong.view.screen, Screen::Auth);
}

#[tokio::test]
async fn test_login_trims_username() {
    let images = image_folder(&["a.jpg"]);
    let workflow = memory_workflow(&images);
    registered(&workflow, "alice").await;

    let step = workflow
        .login(SessionContext::anonymous(), "  alice ", PASSWORD)
        .await;
    assert_eq!(step.session.user.as_deref(), Some("alice"));
}

// =============================================================================
// Presentation and rating
// =============================================================================

#[tokio::test]
async fn test_held_image_is_sticky_across_redisplay() {
    let images = image_folder(&["a.jpg", "b.jpg", "c.jpg", "d.jpg"]);
    let workflow = memory_workflow(&images);

    let step = registered(&workflow, "alice").await;
    let first = presented_image(&step);

    let mut session = step.session;
    for _ in 0..10 {
        let step = workflow.show(session).await;
        assert_eq!(presented_image(&step), first);
        session = step.session;
    }
}

#[tokio::test]
async fn test_rating_all_images_completes() {
    let images = image_folder(&["a.jpg", "b.jpg"]);
    let workflow = memory_workflow(&images);

    let mut step = registered(&workflow, "alice").await;
    assert_eq!(step.view.progress.unwrap().rated, 0);

    for expected_rated in 1..=2 {
        let image = presented_image(&step);
        step = workflow.rate(step.session, Some(&image), "6").await;
        assert!(step.error.is_none(), "{:?}", step.error);
        assert_eq!(step.view.progress.unwrap().rated, expected_rated);
        assert!(step.view.notice.is_some());
    }

    assert_eq!(step.view.screen, Screen::Completed);
    assert_eq!(step.session.current_image, None);
    let progress = step.view.progress.unwrap();
    assert_eq!((progress.rated, progress.total), (2, 2));
    assert_eq!(progress.percent(), 100);

    // Nothing left to rate in the completed state
    let step = workflow.rate(step.session, None, "5").await;
    assert_eq!(step.error, Some(Error::NothingToRate));
    assert_eq!(step.view.screen, Screen::Completed);
}

#[tokio::test]
async fn test_scenario_alice_rates_two_images() {
    let images = image_folder(&["a.jpg", "b.jpg"]);
    let workflow = memory_workflow(&images);
    let step = registered(&workflow, "alice").await;

    // Rate in a fixed order regardless of which image was drawn first
    let mut session = step.session;
    for (image, score) in [("a.jpg", 7), ("b.jpg", 3)] {
        session.current_image = Some(image.to_string());
        let step = workflow.rate(session, Some(image), &score.to_string()).await;
        assert!(step.error.is_none());
        session = step.session;
    }

    let ratings = workflow.storage().ratings.clone();
    assert_eq!(
        ratings.ratings_for("alice").await.unwrap(),
        HashSet::from(["a.jpg".to_string(), "b.jpg".to_string()])
    );
    assert_eq!(ratings.count().await.unwrap(), 2);
    assert_eq!(ratings.rating("alice", "a.jpg").await.unwrap().unwrap().score.value(), 7);
    assert_eq!(ratings.rating("alice", "b.jpg").await.unwrap().unwrap().score.value(), 3);

    let step = workflow.show(session).await;
    assert_eq!(step.view.screen, Screen::Completed);
    assert_eq!(step.view.progress.unwrap().percent(), 100);
}

#[tokio::test]
async fn test_rerating_replaces_score() {
    let images = image_folder(&["a.jpg"]);
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("ratings.db").display());
    let storage = Storage::open(&url, false).await.unwrap();
    let workflow = RatingWorkflow::new(ImageCatalog::new(images.path()), storage, PASSWORD);

    let step = registered(&workflow, "alice").await;
    let step = workflow.rate(step.session, Some("a.jpg"), "7").await;
    assert!(step.error.is_none());

    // Re-submission for the same pair
    let mut session = step.session;
    session.current_image = Some("a.jpg".to_string());
    let step = workflow.rate(session, Some("a.jpg"), "9").await;
    assert!(step.error.is_none());

    let ratings = &workflow.storage().ratings;
    assert_eq!(ratings.count().await.unwrap(), 1);
    assert_eq!(ratings.rating("alice", "a.jpg").await.unwrap().unwrap().score.value(), 9);
}

#[tokio::test]
async fn test_invalid_score_keeps_held_image() {
    let images = image_folder(&["a.jpg", "b.jpg"]);
    let workflow = memory_workflow(&images);
    let step = registered(&workflow, "alice").await;
    let held = presented_image(&step);

    for score in ["0", "11", "-1", "abc", ""] {
        let step = workflow.rate(step.session.clone(), Some(&held), score).await;
        assert_eq!(step.error, Some(Error::InvalidScore(score.to_string())));
        assert_eq!(presented_image(&step), held);
    }
    assert_eq!(workflow.storage().ratings.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_stale_submission_is_rejected() {
    let images = image_folder(&["a.jpg", "b.jpg"]);
    let workflow = memory_workflow(&images);
    let step = registered(&workflow, "alice").await;
    let held = presented_image(&step);
    let other = if held == "a.jpg" { "b.jpg" } else { "a.jpg" };

    let step = workflow.rate(step.session, Some(other), "5").await;
    assert!(matches!(step.error, Some(Error::StaleSubmission { .. })));
    assert_eq!(presented_image(&step), held);
    assert!(workflow.storage().ratings.ratings_for("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_anonymous_cannot_rate_or_skip() {
    let images = image_folder(&["a.jpg"]);
    let workflow = memory_workflow(&images);

    let step = workflow.rate(SessionContext::anonymous(), None, "5").await;
    assert_eq!(step.error, Some(Error::NotAuthenticated));
    assert_eq!(step.view.screen, Screen::Auth);

    let step = workflow.skip(SessionContext::anonymous()).await;
    assert_eq!(step.error, Some(Error::NotAuthenticated));
}

// =============================================================================
// Skipping
// =============================================================================

#[tokio::test]
async fn test_skip_never_records_rating() {
    let images = image_folder(&["a.jpg", "b.jpg", "c.jpg"]);
    let workflow = memory_workflow(&images);
    let mut step = registered(&workflow, "alice").await;

    for _ in 0..5 {
        let skipped = presented_image(&step);
        step = workflow.skip(step.session).await;
        assert!(step.error.is_none());
        // Another image is available, so the skipped one is not redrawn
        assert_ne!(presented_image(&step), skipped);
    }

    assert!(workflow.storage().ratings.ratings_for("alice").await.unwrap().is_empty());
    assert_eq!(step.view.progress.unwrap().rated, 0);
}

#[tokio::test]
async fn test_skip_last_image_presents_it_again() {
    let images = image_folder(&["only.jpg"]);
    let workflow = memory_workflow(&images);
    let step = registered(&workflow, "alice").await;

    let step = workflow.skip(step.session).await;
    assert_eq!(presented_image(&step), "only.jpg");
}

// =============================================================================
// Catalog changes and failures
// =============================================================================

#[tokio::test]
async fn test_progress_follows_catalog_changes() {
    let images = image_folder(&["a.jpg"]);
    let workflow = memory_workflow(&images);
    let step = registered(&workflow, "alice").await;
    let step = workflow.rate(step.session, Some("a.jpg"), "4").await;
    assert_eq!(step.view.screen, Screen::Completed);

    std::fs::write(images.path().join("b.jpg"), b"img").unwrap();
    let step = workflow.show(step.session).await;
    assert_eq!(presented_image(&step), "b.jpg");
    let progress = step.view.progress.unwrap();
    assert_eq!((progress.rated, progress.total), (1, 2));
}

#[tokio::test]
async fn test_empty_catalog_is_completed() {
    let images = image_folder(&[]);
    let workflow = memory_workflow(&images);
    let step = registered(&workflow, "alice").await;

    assert_eq!(step.view.screen, Screen::Completed);
    assert_eq!(step.view.progress.unwrap().total, 0);
}

#[tokio::test]
async fn test_missing_catalog_reports_unavailable() {
    let images = image_folder(&["a.jpg"]);
    let workflow = memory_workflow(&images);
    let step = registered(&workflow, "alice").await;
    let held = step.session.current_image.clone();

    std::fs::remove_dir_all(images.path()).unwrap();
    let step = workflow.show(step.session).await;

    assert!(matches!(step.error, Some(Error::CatalogUnavailable(_))));
    assert_eq!(step.view.screen, Screen::Unavailable);
    assert_eq!(step.session.current_image, held);

    // Logout still works
    let step = workflow.logout(step.session).await;
    assert!(step.error.is_none());
    assert_eq!(step.view.screen, Screen::Auth);
}

/// Rating store whose writes can be switched off
struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

#[async_trait]
impl IdentityStore for FlakyStore {
    async fn exists(&self, username: &str) -> facerate_common::Result<bool> {
        self.inner.exists(username).await
    }

    async fn create(&self, username: &str) -> facerate_common::Result<()> {
        self.inner.create(username).await
    }
}

#[async_trait]
impl RatingStore for FlakyStore {
    async fn ratings_for(&self, user: &str) -> facerate_common::Result<HashSet<String>> {
        self.inner.ratings_for(user).await
    }

    async fn upsert(&self, user: &str, image: &str, score: Score) -> facerate_common::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("disk full".to_string()));
        }
        self.inner.upsert(user, image, score).await
    }

    async fn rating(&self, user: &str, image: &str) -> facerate_common::Result<Option<Rating>> {
        self.inner.rating(user, image).await
    }

    async fn count(&self) -> facerate_common::Result<u64> {
        self.inner.count().await
    }
}

#[tokio::test]
async fn test_store_failure_keeps_held_image_for_retry() {
    let images = image_folder(&["a.jpg", "b.jpg"]);
    let store = Arc::new(FlakyStore {
        inner: MemoryStore::new(),
        fail_writes: AtomicBool::new(true),
    });
    let storage = Storage::from_store(store.clone(), true, "flaky");
    let workflow = RatingWorkflow::new(ImageCatalog::new(images.path()), storage, PASSWORD);

    let step = registered(&workflow, "alice").await;
    let held = presented_image(&step);

    let step = workflow.rate(step.session, Some(&held), "8").await;
    assert!(matches!(step.error, Some(Error::StoreUnavailable(_))));
    assert_eq!(presented_image(&step), held);
    assert!(step.view.error.unwrap().contains("disk full"));

    store.fail_writes.store(false, Ordering::SeqCst);
    let step = workflow.rate(step.session, Some(&held), "8").await;
    assert!(step.error.is_none());
    assert_eq!(store.rating("alice", &held).await.unwrap().unwrap().score.value(), 8);
}

#[tokio::test]
async fn test_view_reports_persistence() {
    let images = image_folder(&["a.jpg"]);
    let workflow = memory_workflow(&images);
    let step = workflow.show(SessionContext::anonymous()).await;
    assert!(!step.view.persistent);

    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("ratings.db").display());
    let store = SqliteStore::connect(&url).await.unwrap();
    let storage = Storage::from_store(Arc::new(store), true, url);
    let workflow = RatingWorkflow::new(ImageCatalog::new(images.path()), storage, PASSWORD);
    let step = workflow.show(SessionContext::anonymous()).await;
    assert!(step.view.persistent);
}
