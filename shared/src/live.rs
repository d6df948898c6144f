//! Views that fetch once and refetch whenever a watched table changes.
//!
//! A [`LiveView`] never patches its snapshot incrementally: any relevant
//! [`TableChange`] triggers a full fetch. Failed fetches keep the previous
//! snapshot. Dropping the view stops its background task.

use std::{fmt::Display, future::Future};

use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        watch,
    },
    task::JoinHandle,
};

use crate::models::{Table, TableChange};

/// Latest snapshot of a fetch kept fresh by change notifications.
pub struct LiveView<T> {
    snapshots: watch::Receiver<Option<T>>,
    task: JoinHandle<()>,
}

impl<T> LiveView<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start a background task that runs `fetch` now and again after every
    /// change to one of `tables` arriving on `changes`.
    ///
    /// Pass a receiver obtained before any state is read so that no change
    /// slips between the first fetch and the subscription. A lagged receiver
    /// refetches; a closed one ends live updates.
    pub fn spawn<F, Fut, E>(
        mut changes: broadcast::Receiver<TableChange>,
        tables: &[Table],
        mut fetch: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let tables = tables.to_vec();
        let (sender, snapshots) = watch::channel(None);

        let task = tokio::spawn(async move {
            refresh(&mut fetch, &sender).await;
            loop {
                match changes.recv().await {
                    Ok(change) if tables.contains(&change.table) => {
                        tracing::debug!(table = %change.table, id = %change.id, "refetching live view");
                        refresh(&mut fetch, &sender).await;
                    },
                    Ok(_) => {},
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "change feed lagged, refetching live view");
                        refresh(&mut fetch, &sender).await;
                    },
                    Err(RecvError::Closed) => {
                        tracing::debug!("change feed closed, live view stopped");
                        break;
                    },
                }
            }
        });

        Self { snapshots, task }
    }

    /// Most recent successful fetch, `None` until the first one lands.
    pub fn latest(&self) -> Option<T> {
        self.snapshots.borrow().clone()
    }

    /// Wait for a snapshot newer than the last one returned here.
    ///
    /// Returns `None` once live updates have stopped.
    pub async fn changed(&mut self) -> Option<T> {
        self.snapshots.changed().await.ok()?;
        self.snapshots.borrow_and_update().clone()
    }

    /// An independent handle on the snapshot channel.
    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.snapshots.clone()
    }
}

impl<T> Drop for LiveView<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn refresh<T, F, Fut, E>(fetch: &mut F, sender: &watch::Sender<Option<T>>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    match fetch().await {
        Ok(snapshot) => {
            sender.send_replace(Some(snapshot));
        },
        Err(err) => {
            tracing::warn!(error = %err, "live view fetch failed, keeping last snapshot");
        },
    }
}

#[cfg(test)]
mod tests {
    use std::{
        convert::Infallible,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use tokio::time::timeout;

    use super::*;
    use crate::{
        memory_store::MemoryStore,
        models::ChangeKind,
        site::{PostDraft, Site, SubscribeForm},
        PostStatus,
    };

    const WAIT: Duration = Duration::from_secs(5);

    fn counting_fetch(
        counter: Arc<AtomicUsize>,
    ) -> impl FnMut() -> std::future::Ready<Result<usize, Infallible>> + Send + 'static {
        move || std::future::ready(Ok(counter.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn next<T: Clone + Send + Sync + 'static>(view: &mut LiveView<T>) -> Option<T> {
        timeout(WAIT, view.changed()).await.expect("snapshot in time")
    }

    #[tokio::test]
    async fn dashboard_refreshes_after_a_signup() {
        let site = Site::new(Arc::new(MemoryStore::new()));
        let fetch_site = site.clone();
        let mut view = LiveView::spawn(site.changes(), &Table::ALL, move || {
            let site = fetch_site.clone();
            async move { site.dashboard().await }
        });

        let initial = next(&mut view).await.expect("initial snapshot");
        assert_eq!(initial.stats.total_subscribers, 0);

        site.subscribe(SubscribeForm {
            email: "reader@example.com".to_string(),
            name: None,
        })
        .await
        .expect("subscribe");

        let refreshed = next(&mut view).await.expect("refreshed snapshot");
        assert_eq!(refreshed.stats.total_subscribers, 1);
        assert_eq!(refreshed.recent_subscribers[0].email, "reader@example.com");
    }

    #[tokio::test]
    async fn changes_to_other_tables_are_ignored() {
        let site = Site::new(Arc::new(MemoryStore::new()));
        let counter = Arc::new(AtomicUsize::new(0));
        let mut view = LiveView::spawn(
            site.changes(),
            &[Table::Subscribers],
            counting_fetch(Arc::clone(&counter)),
        );
        assert_eq!(next(&mut view).await, Some(1));

        site.save_post(
            None,
            PostDraft {
                title: "Unwatched".to_string(),
                content: "body".to_string(),
                ..PostDraft::default()
            },
            PostStatus::Draft,
        )
        .await
        .expect("save post");
        site.subscribe(SubscribeForm {
            email: "reader@example.com".to_string(),
            name: None,
        })
        .await
        .expect("subscribe");

        assert_eq!(next(&mut view).await, Some(2));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_keeps_previous_snapshot() {
        let (sender, receiver) = broadcast::channel(8);
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch_calls = Arc::clone(&calls);
        let mut view = LiveView::spawn(receiver, &[Table::BlogPosts], move || {
            let call = fetch_calls.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if call == 2 {
                Err("database unavailable")
            } else {
                Ok(call)
            })
        });
        assert_eq!(next(&mut view).await, Some(1));

        let change = TableChange::new(Table::BlogPosts, ChangeKind::Update, "p1");
        sender.send(change.clone()).expect("listener");
        assert!(timeout(Duration::from_millis(100), view.changed()).await.is_err());
        assert_eq!(view.latest(), Some(1));

        sender.send(change).expect("listener");
        assert_eq!(next(&mut view).await, Some(3));
    }

    #[tokio::test]
    async fn lagging_behind_forces_a_refetch() {
        let (sender, receiver) = broadcast::channel(1);
        let counter = Arc::new(AtomicUsize::new(0));
        let mut view = LiveView::spawn(
            receiver,
            &[Table::Subscribers],
            counting_fetch(Arc::clone(&counter)),
        );
        for id in ["a", "b", "c"] {
            sender
                .send(TableChange::new(Table::BlogPosts, ChangeKind::Insert, id))
                .expect("listener");
        }

        while view.latest() != Some(2) {
            next(&mut view).await.expect("live updates running");
        }
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn closed_feed_ends_live_updates() {
        let (sender, receiver) = broadcast::channel::<TableChange>(8);
        let mut view = LiveView::spawn(
            receiver,
            &Table::ALL,
            counting_fetch(Arc::new(AtomicUsize::new(0))),
        );
        assert_eq!(next(&mut view).await, Some(1));

        drop(sender);
        assert_eq!(next(&mut view).await, None);
        assert_eq!(view.latest(), Some(1));
    }

    #[tokio::test]
    async fn dropping_the_view_unsubscribes() {
        let (sender, receiver) = broadcast::channel(8);
        let counter = Arc::new(AtomicUsize::new(0));
        let view = LiveView::spawn(receiver, &Table::ALL, counting_fetch(Arc::clone(&counter)));
        let mut snapshots = view.subscribe();
        drop(view);

        // The aborted task drops both its snapshot sender and its change receiver.
        while snapshots.changed().await.is_ok() {}
        assert_eq!(sender.receiver_count(), 0);
        assert!(sender
            .send(TableChange::new(Table::Subscribers, ChangeKind::Insert, "s1"))
            .is_err());
        assert!(counter.load(Ordering::SeqCst) <= 1);
    }
}
