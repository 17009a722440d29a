//! Unit of work: an explicit transaction stack over a backend.
//!
//! Each [`UnitOfWork::begin`] opens a backend transaction and pushes a frame
//! collecting delayed calls. Committing a nested frame hands its calls to
//! the parent; committing the outermost frame runs them in registration
//! order. Rolling back discards the calls of the frame.
//!
//! Backends keep a single transaction stack, so units of work sharing a
//! [`TransactionGate`] take turns: the outermost `begin` waits until no other
//! unit of work holds an open transaction. Writes issued outside any unit of
//! work are not gated and can be undone by a concurrent rollback.

use crate::{Backend, Error, ModelRef, Record, Result};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

/// Callback run once the outermost transaction has committed
pub type DelayedCall = Box<dyn FnOnce() -> Result<()> + Send>;

static NEXT_UNIT_ID: AtomicU64 = AtomicU64::new(1);

/// Lets one unit of work at a time hold a transaction on a shared backend
#[derive(Debug, Default)]
pub struct TransactionGate {
    holder: Mutex<Option<(u64, ThreadId)>>,
    released: Condvar,
}

impl TransactionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether some unit of work currently holds the gate
    pub fn is_held(&self) -> bool {
        self.holder.lock().map(|holder| holder.is_some()).unwrap_or(true)
    }

    // Blocks while another thread holds the gate. A second unit of work on
    // the holder's own thread would wait forever, so it fails instead.
    fn acquire(&self, unit: u64) -> Result<()> {
        let current = thread::current().id();
        let mut holder = self.holder.lock().map_err(|_| Error::LockPoisoned)?;
        loop {
            let state = *holder;
            match state {
                None => {
                    *holder = Some((unit, current));
                    return Ok(());
                }
                Some((owner, _)) if owner == unit => return Ok(()),
                Some((_, holder_thread)) if holder_thread == current => {
                    return Err(Error::Transaction(
                        "Another unit of work on this thread has an open transaction".to_string(),
                    ));
                }
                Some(_) => {
                    debug!("waiting for another unit of work to finish its transaction");
                    holder = self.released.wait(holder).map_err(|_| Error::LockPoisoned)?;
                }
            }
        }
    }

    fn release(&self, unit: u64) {
        if let Ok(mut holder) = self.holder.lock() {
            if matches!(*holder, Some((owner, _)) if owner == unit) {
                *holder = None;
                self.released.notify_one();
            }
        }
    }
}

/// Transaction stack of one logical request
pub struct UnitOfWork {
    id: u64,
    backend: Arc<dyn Backend>,
    gate: Arc<TransactionGate>,
    frames: Vec<Vec<DelayedCall>>,
}

impl UnitOfWork {
    /// Unit of work with a gate of its own
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_gate(backend, Arc::new(TransactionGate::new()))
    }

    /// Unit of work taking turns with every other one sharing `gate`
    pub fn with_gate(backend: Arc<dyn Backend>, gate: Arc<TransactionGate>) -> Self {
        Self {
            id: NEXT_UNIT_ID.fetch_add(1, Ordering::Relaxed),
            backend,
            gate,
            frames: Vec::new(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Number of open transactions
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn in_transaction(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Open a transaction, waiting for the gate when it is the outermost one
    pub fn begin(&mut self) -> Result<()> {
        let outermost = self.frames.is_empty();
        if outermost {
            self.gate.acquire(self.id)?;
        }
        if let Err(err) = self.backend.begin_transaction() {
            if outermost {
                self.gate.release(self.id);
            }
            return Err(err);
        }
        self.frames.push(Vec::new());
        debug!(depth = self.frames.len(), "transaction started");
        Ok(())
    }

    /// Commit the innermost transaction.
    ///
    /// When it was the outermost one, the delayed calls run afterwards; the
    /// first failing call stops the sequence and its error is returned.
    pub fn commit(&mut self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(Error::Transaction("No active transaction to commit".to_string()));
        }
        self.backend.commit_transaction()?;
        let calls = self.frames.pop().unwrap_or_default();
        debug!(depth = self.frames.len(), delayed = calls.len(), "transaction committed");

        match self.frames.last_mut() {
            Some(parent) => parent.extend(calls),
            None => {
                self.gate.release(self.id);
                for call in calls {
                    call()?;
                }
            }
        }
        Ok(())
    }

    /// Roll back the innermost transaction, dropping its delayed calls
    pub fn rollback(&mut self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(Error::Transaction("No active transaction to roll back".to_string()));
        }
        self.backend.rollback_transaction()?;
        let calls = self.frames.pop().unwrap_or_default();
        if self.frames.is_empty() {
            self.gate.release(self.id);
        }
        if calls.is_empty() {
            warn!(depth = self.frames.len(), "transaction rolled back");
        } else {
            warn!(
                depth = self.frames.len(),
                discarded = calls.len(),
                "transaction rolled back, delayed calls discarded"
            );
        }
        Ok(())
    }

    /// Run `call` after the outermost commit, or right away outside a transaction
    pub fn delay_call<F>(&mut self, call: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.push(Box::new(call));
                Ok(())
            }
            None => call(),
        }
    }

    /// Insert or replace `record`
    pub fn add(&self, model: &ModelRef, record: Record) -> Result<Record> {
        self.backend.add(model, record)
    }

    pub fn remove(&self, model: &ModelRef, record: &Record) -> Result<bool> {
        self.backend.remove(model, record)
    }

    /// Run `work` inside a transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// A transaction the closure already ended itself is left alone.
    ///
    /// ```
    /// use modelite::{EmbeddedBackend, Record, UnitOfWork};
    /// use std::sync::Arc;
    ///
    /// let backend = Arc::new(EmbeddedBackend::in_memory());
    /// let users = backend.create_model("User", Vec::new())?;
    /// let mut uow = UnitOfWork::new(backend);
    /// let saved = uow.transaction(|tx| tx.add(&users, Record::new().with("name", "Ada")))?;
    /// assert!(saved.id().is_some());
    /// # Ok::<(), modelite::Error>(())
    /// ```
    pub fn transaction<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&mut UnitOfWork) -> Result<T>,
    {
        let depth = self.depth();
        self.begin()?;
        match work(self) {
            Ok(value) => {
                if self.depth() > depth {
                    self.commit()?;
                }
                Ok(value)
            }
            Err(err) => {
                if self.depth() > depth {
                    if let Err(rollback) = self.rollback() {
                        warn!(error = %rollback, "rollback after failed transaction failed");
                    }
                }
                Err(err)
            }
        }
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.frames.is_empty() {
            return;
        }
        warn!(depth = self.frames.len(), "unit of work dropped with open transactions");
        while !self.frames.is_empty() {
            if let Err(err) = self.rollback() {
                warn!(error = %err, "rollback on drop failed");
                self.frames.clear();
            }
        }
        self.gate.release(self.id);
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("backend", &self.backend.name())
            .field("depth", &self.frames.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EmbeddedBackend;
    use std::sync::Mutex;

    fn setup() -> (Arc<EmbeddedBackend>, ModelRef, UnitOfWork) {
        let backend = Arc::new(EmbeddedBackend::in_memory());
        let model = backend.create_model("Item", Vec::new()).unwrap();
        let uow = UnitOfWork::new(backend.clone());
        (backend, model, uow)
    }

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> DelayedCall) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |label: &'static str| -> DelayedCall {
            let sink = sink.clone();
            Box::new(move || {
                sink.lock().unwrap().push(label);
                Ok(())
            })
        };
        (log, make)
    }

    #[test]
    fn test_commit_without_transaction() {
        let (_, _, mut uow) = setup();
        assert!(matches!(uow.commit(), Err(Error::Transaction(_))));
        assert!(matches!(uow.rollback(), Err(Error::Transaction(_))));
    }

    #[test]
    fn test_delayed_calls_wait_for_outermost_commit() {
        let (_, _, mut uow) = setup();
        let (log, call) = recorder();

        uow.begin().unwrap();
        uow.delay_call(call("outer")).unwrap();
        uow.begin().unwrap();
        uow.delay_call(call("inner")).unwrap();
        uow.commit().unwrap();
        assert!(log.lock().unwrap().is_empty());
        uow.commit().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_rollback_drops_delayed_calls() {
        let (_, _, mut uow) = setup();
        let (log, call) = recorder();

        uow.begin().unwrap();
        uow.delay_call(call("kept")).unwrap();
        uow.begin().unwrap();
        uow.delay_call(call("dropped")).unwrap();
        uow.rollback().unwrap();
        uow.commit().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["kept"]);
    }

    #[test]
    fn test_delay_call_outside_transaction_runs_now() {
        let (_, _, mut uow) = setup();
        let (log, call) = recorder();
        uow.delay_call(call("now")).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["now"]);
    }

    #[test]
    fn test_transaction_closure() {
        let (backend, model, mut uow) = setup();

        let failed: Result<()> = uow.transaction(|tx| {
            tx.add(&model, Record::new().with("name", "lost"))?;
            Err(Error::Query("abort".to_string()))
        });
        assert!(failed.is_err());
        assert_eq!(uow.depth(), 0);
        assert_eq!(backend.transaction_depth().unwrap(), 0);

        uow.transaction(|tx| tx.add(&model, Record::new().with("name", "kept")))
            .unwrap();
        let query = crate::Query::new(model, backend);
        assert_eq!(query.count().unwrap(), 1);
    }

    #[test]
    fn test_gate_is_held_until_outermost_end() {
        let (backend, _, _) = setup();
        let gate = Arc::new(TransactionGate::new());
        let mut uow = UnitOfWork::with_gate(backend, gate.clone());

        uow.begin().unwrap();
        uow.begin().unwrap();
        uow.commit().unwrap();
        assert!(gate.is_held());
        uow.rollback().unwrap();
        assert!(!gate.is_held());
    }

    #[test]
    fn test_drop_rolls_back_and_releases_gate() {
        let (backend, model, _) = setup();
        let gate = Arc::new(TransactionGate::new());
        {
            let mut uow = UnitOfWork::with_gate(backend.clone(), gate.clone());
            uow.begin().unwrap();
            uow.add(&model, Record::new().with("name", "lost")).unwrap();
            assert!(gate.is_held());
        }
        assert!(!gate.is_held());
        assert_eq!(backend.transaction_depth().unwrap(), 0);
        assert_eq!(crate::Query::new(model, backend).count().unwrap(), 0);
    }

    #[test]
    fn test_closure_may_end_transaction_itself() {
        let (_, model, mut uow) = setup();
        uow.transaction(|tx| {
            tx.add(&model, Record::new().with("name", "x"))?;
            tx.rollback()
        })
        .unwrap();
        assert_eq!(uow.depth(), 0);
    }
}
