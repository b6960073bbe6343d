use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

use arbiter_core::{DecisionRecord, EscalationRecord};

const QUEUE_DEPTH: usize = 256;

const DECISIONS_FILE: &str = "decisions.jsonl";
const ESCALATIONS_FILE: &str = "escalations.jsonl";

enum AuditMessage {
    Decision(DecisionRecord),
    Escalation(EscalationRecord),
    Flush(oneshot::Sender<()>),
}

/// Handle to the append-only decision/escalation log.
///
/// Records flow through a bounded channel into a single writer task, so
/// appends from concurrent calls serialize at the file boundary and the
/// decision path never waits on I/O. Failures on this side channel are
/// warned and dropped: an audit write must not fail the decision it records.
#[derive(Clone)]
pub struct AuditLog {
    sender: mpsc::Sender<AuditMessage>,
}

impl AuditLog {
    /// Spawn the writer worker. `dir` is created lazily on first append.
    /// Must be called from within a tokio runtime.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_DEPTH);
        tokio::spawn(write_loop(dir.into(), receiver));
        AuditLog { sender }
    }

    pub fn record_decision(&self, record: DecisionRecord) {
        self.enqueue(AuditMessage::Decision(record));
    }

    pub fn record_escalation(&self, record: EscalationRecord) {
        self.enqueue(AuditMessage::Escalation(record));
    }

    fn enqueue(&self, message: AuditMessage) {
        if self.sender.try_send(message).is_err() {
            tracing::warn!("audit queue full or closed; dropping record");
        }
    }

    /// Wait until every record enqueued before this call has been written.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(AuditMessage::Flush(ack)).await.is_ok() {
            let _ = done.await;
        }
    }
}

async fn write_loop(dir: PathBuf, mut receiver: mpsc::Receiver<AuditMessage>) {
    while let Some(message) = receiver.recv().await {
        match message {
            AuditMessage::Decision(record) => append(&dir, DECISIONS_FILE, &record).await,
            AuditMessage::Escalation(record) => append(&dir, ESCALATIONS_FILE, &record).await,
            AuditMessage::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

async fn append<T: Serialize>(dir: &Path, file: &str, record: &T) {
    if let Err(e) = try_append(dir, file, record).await {
        tracing::warn!("audit append to {file} failed: {e}");
    }
}

async fn try_append<T: Serialize>(dir: &Path, file: &str, record: &T) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut handle = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(file))
        .await?;
    handle.write_all(line.as_bytes()).await?;
    Ok(())
}
