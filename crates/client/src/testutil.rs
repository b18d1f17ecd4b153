//! Shared test fixtures

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;

use rondo_core::{CollectionStore, Identity, LocalStore};

pub(crate) fn identity(uid: &str, name: &str) -> Identity {
    Identity::new(uid, name)
        .with_email(format!("{uid}@example.com"))
        .with_avatar_url(format!("https://avatars.example.com/{uid}.png"))
}

pub(crate) fn memory_store() -> Arc<dyn CollectionStore> {
    Arc::new(LocalStore::open_in_memory().unwrap())
}

/// Wait until the watched value satisfies the predicate, returning the
/// matching value. Panics after two seconds.
pub(crate) async fn wait_for<T, F>(rx: &mut watch::Receiver<T>, mut pred: F) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    timeout(Duration::from_secs(2), async {
        loop {
            {
                let current = rx.borrow_and_update();
                if pred(&current) {
                    return current.clone();
                }
            }
            rx.changed().await.expect("watch channel closed");
        }
    })
    .await
    .expect("timed out waiting for watch condition")
}
