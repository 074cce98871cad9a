//! End-to-end watcher behavior against the real filesystem.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use stash_watcher::watcher::PathRegistry;
use stash_watcher::{Notifier, NotifyError, WatchEngine, WatchRoots};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};

const DEBOUNCE_MS: u64 = 100;

#[derive(Default)]
struct CountingNotifier {
    calls: AtomicUsize,
}

impl CountingNotifier {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn trigger_scan(&self) -> Result<(), NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    _temp_dir: TempDir,
    root: std::path::PathBuf,
    /// Sibling of the root, outside the watched tree.
    staging: std::path::PathBuf,
    notifier: Arc<CountingNotifier>,
    registry: Arc<PathRegistry>,
    handle: JoinHandle<()>,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start an engine on a fresh temp root with `setup` applied first.
async fn start(setup: impl FnOnce(&Path)) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().canonicalize().unwrap();
    let root = base.join("library");
    let staging = base.join("staging");
    fs::create_dir(&root).unwrap();
    fs::create_dir(&staging).unwrap();
    setup(&root);

    let notifier = Arc::new(CountingNotifier::default());
    let engine = WatchEngine::builder()
        .roots(WatchRoots::from_paths([&root]).unwrap())
        .notifier(notifier.clone())
        .debounce_ms(DEBOUNCE_MS)
        .build()
        .unwrap();
    let registry = engine.registry();

    let handle = tokio::spawn(async move {
        engine.run().await.unwrap();
    });

    let harness = Harness {
        _temp_dir: temp_dir,
        root,
        staging,
        notifier,
        registry,
        handle,
    };
    wait_until_watched(&harness.registry, &harness.root).await;
    harness
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(20)).await;
    }
    condition()
}

async fn wait_until_watched(registry: &PathRegistry, dir: &Path) {
    assert!(
        wait_for(|| registry.contains(dir)).await,
        "{} never became watched",
        dir.display()
    );
}

/// Wait long enough for any pending debounce to settle.
async fn settle() {
    sleep(Duration::from_millis(DEBOUNCE_MS * 5)).await;
}

#[tokio::test]
async fn test_new_file_triggers_one_notification() {
    let h = start(|_| {}).await;

    fs::write(h.root.join("x.mp4"), b"frames").unwrap();

    assert!(wait_for(|| h.notifier.calls() >= 1).await);
    settle().await;
    assert_eq!(h.notifier.calls(), 1);
}

#[tokio::test]
async fn test_write_burst_coalesces() {
    let h = start(|root| fs::write(root.join("x.mp4"), b"").unwrap()).await;
    let file = h.root.join("x.mp4");

    for i in 0..5u8 {
        fs::write(&file, [i; 64]).unwrap();
        sleep(Duration::from_millis(10)).await;
    }

    assert!(wait_for(|| h.notifier.calls() >= 1).await);
    settle().await;
    assert_eq!(h.notifier.calls(), 1);
}

#[tokio::test]
async fn test_new_directory_is_watched_without_notification() {
    let h = start(|_| {}).await;
    let season = h.root.join("season-1");

    fs::create_dir(&season).unwrap();
    wait_until_watched(&h.registry, &season).await;
    settle().await;
    assert_eq!(h.notifier.calls(), 0);

    // Content inside the new directory is now seen
    fs::write(season.join("e01.mkv"), b"frames").unwrap();
    assert!(wait_for(|| h.notifier.calls() == 1).await);
}

#[tokio::test]
async fn test_existing_subdirectories_are_enrolled() {
    let h = start(|root| fs::create_dir_all(root.join("a/b/c")).unwrap()).await;
    let deepest = h.root.join("a/b/c");

    wait_until_watched(&h.registry, &deepest).await;
    fs::write(deepest.join("clip.mp4"), b"frames").unwrap();

    assert!(wait_for(|| h.notifier.calls() == 1).await);
}

#[tokio::test]
async fn test_spaced_changes_notify_independently() {
    let h = start(|_| {}).await;

    fs::write(h.root.join("one.mp4"), b"frames").unwrap();
    assert!(wait_for(|| h.notifier.calls() == 1).await);
    settle().await;

    fs::write(h.root.join("two.mp4"), b"frames").unwrap();
    assert!(wait_for(|| h.notifier.calls() == 2).await);
    settle().await;
    assert_eq!(h.notifier.calls(), 2);
}

#[tokio::test]
async fn test_removed_file_notifies() {
    let h = start(|root| fs::write(root.join("old.mp4"), b"frames").unwrap()).await;

    fs::remove_file(h.root.join("old.mp4")).unwrap();
    assert!(wait_for(|| h.notifier.calls() == 1).await);
}

#[tokio::test]
async fn test_recreated_directory_is_watched_again() {
    let h = start(|root| fs::create_dir(root.join("sub")).unwrap()).await;
    let sub = h.root.join("sub");
    wait_until_watched(&h.registry, &sub).await;

    fs::remove_dir(&sub).unwrap();
    assert!(
        wait_for(|| !h.registry.contains(&sub)).await,
        "removed directory stayed registered"
    );
    settle().await;
    let baseline = h.notifier.calls();

    fs::create_dir(&sub).unwrap();
    wait_until_watched(&h.registry, &sub).await;

    fs::write(sub.join("y.mp4"), b"frames").unwrap();
    assert!(wait_for(|| h.notifier.calls() == baseline + 1).await);
}

#[tokio::test]
async fn test_directory_moved_into_tree_is_enrolled() {
    let h = start(|_| {}).await;
    let incoming = h.staging.join("show");
    fs::create_dir_all(incoming.join("s02")).unwrap();
    fs::write(incoming.join("s02/e01.mkv"), b"frames").unwrap();

    let show = h.root.join("show");
    fs::rename(&incoming, &show).unwrap();
    let nested = show.join("s02");
    wait_until_watched(&h.registry, &nested).await;
    settle().await;
    let baseline = h.notifier.calls();

    fs::write(nested.join("e02.mkv"), b"frames").unwrap();
    assert!(wait_for(|| h.notifier.calls() == baseline + 1).await);
}

#[test]
fn test_nested_roots_collapse_to_ancestor() {
    let temp_dir = TempDir::new().unwrap();
    let a = temp_dir.path().join("a");
    let b = a.join("b");
    fs::create_dir_all(&b).unwrap();

    let roots = WatchRoots::from_paths([&a, &b]).unwrap();
    let expected = a.canonicalize().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots.iter().collect::<Vec<_>>(), vec![expected.as_path()]);
}
