//! Task-driven list view handle.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::subscription::{ListState, Subscription};
use super::ListSource;
use crate::query::{QueryPatch, QuerySpec};

enum Command {
    Patch(QueryPatch),
    SetPage(u32),
    Replace(QuerySpec),
    Refetch,
}

/// A subscription running on its own task.
///
/// Query changes are fire-and-forget; state is observed through a watch
/// channel that always holds the latest published [`ListState`].
pub struct ListView {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ListState>,
    task: JoinHandle<()>,
}

impl ListView {
    /// Spawns the view and dispatches the first request for `query`.
    pub fn spawn<S: ListSource>(source: S, query: QuerySpec) -> Self {
        let subscription = Subscription::open(source, query);
        let (state_tx, state) = watch::channel(subscription.state().clone());
        let (commands, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(drive(subscription, command_rx, state_tx));

        Self {
            commands,
            state,
            task,
        }
    }

    pub fn patch(&self, partial: QueryPatch) {
        self.submit(Command::Patch(partial));
    }

    pub fn set_page(&self, page: u32) {
        self.submit(Command::SetPage(page));
    }

    pub fn replace(&self, query: QuerySpec) {
        self.submit(Command::Replace(query));
    }

    pub fn refetch(&self) {
        self.submit(Command::Refetch);
    }

    fn submit(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("list view command dropped after teardown");
        }
    }

    /// Snapshot of the latest published state.
    pub fn state(&self) -> ListState {
        self.state.borrow().clone()
    }

    /// A receiver that is notified on every published change.
    pub fn watch(&self) -> watch::Receiver<ListState> {
        self.state.clone()
    }

    /// Waits until the published state satisfies `predicate` and returns it.
    /// Returns `None` if the view stopped first.
    pub async fn wait_until(&self, predicate: impl FnMut(&ListState) -> bool) -> Option<ListState> {
        let mut rx = self.state.clone();
        let state = rx.wait_for(predicate).await.ok()?;
        Some(state.clone())
    }

    /// Stops the driver task and cancels any outstanding request.
    pub async fn teardown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(error) = task.await {
            tracing::warn!(%error, "list view task ended abnormally");
        }
    }
}

async fn drive<S: ListSource>(
    mut subscription: Subscription<S>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<ListState>,
) {
    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    Command::Patch(partial) => subscription.patch(partial),
                    Command::SetPage(page) => subscription.set_page(page),
                    Command::Replace(query) => subscription.replace(query),
                    Command::Refetch => subscription.refetch(),
                }
            }
            settlement = subscription.settle_next() => {
                if settlement.is_none() {
                    break;
                }
            }
        }

        publish(&state_tx, subscription.state());
    }

    tracing::debug!("list view stopped");
    subscription.teardown();
}

fn publish(state_tx: &watch::Sender<ListState>, state: &ListState) {
    state_tx.send_if_modified(|current| {
        if current == state {
            false
        } else {
            *current = state.clone();
            true
        }
    });
}
