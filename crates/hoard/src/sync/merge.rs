//! Fan-in of independent batch streams into one record stream.

use tokio::sync::mpsc;

use crate::repo::Repo;

/// Capacity of the merged record channel.
///
/// A single slot keeps each forwarder holding at most the batch it is
/// delivering, so a source never runs more than one page ahead of the
/// consumer.
const MERGED_CHANNEL_CAPACITY: usize = 1;

/// Merge batch streams into a single stream of individual records.
///
/// One forwarding task runs per input, each holding its own clone of the
/// output sender. The output closes once every input has closed and its
/// last batch was forwarded; with no inputs it closes immediately. Records
/// from one input keep their order, interleaving across inputs is
/// unspecified.
pub fn merge(inputs: Vec<mpsc::Receiver<Vec<Repo>>>) -> mpsc::Receiver<Repo> {
    let (tx, rx) = mpsc::channel(MERGED_CHANNEL_CAPACITY);

    for input in inputs {
        tokio::spawn(forward(input, tx.clone()));
    }

    rx
}

async fn forward(mut input: mpsc::Receiver<Vec<Repo>>, out: mpsc::Sender<Repo>) {
    while let Some(batch) = input.recv().await {
        for repo in batch {
            if out.send(repo).await.is_err() {
                // Consumer is gone; closing `input` lets the paginator stop.
                return;
            }
        }
    }
}
