use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Latest generation per client. A run started for a client supersedes every
/// earlier run for the same client; only the newest may publish its result.
/// Generations come from one counter shared by all clients, so a pruned
/// client never reissues a number an in-flight run still holds.
#[derive(Clone, Debug, Default)]
pub struct RunLedger {
    inner: Arc<Mutex<LedgerState>>,
}

#[derive(Debug, Default)]
struct LedgerState {
    next_generation: u64,
    latest: HashMap<String, u64>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunTicket {
    client_id: Option<String>,
    generation: u64,
}

impl RunTicket {
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests without a client id are never superseded.
    pub fn begin(&self, client_id: Option<&str>) -> RunTicket {
        let Some(client_id) = client_id else {
            return RunTicket {
                client_id: None,
                generation: 0,
            };
        };

        let mut state = self.lock();
        state.next_generation += 1;
        let generation = state.next_generation;
        state.latest.insert(client_id.to_string(), generation);
        RunTicket {
            client_id: Some(client_id.to_string()),
            generation,
        }
    }

    pub fn is_current(&self, ticket: &RunTicket) -> bool {
        match &ticket.client_id {
            None => true,
            Some(client_id) => self.lock().latest.get(client_id) == Some(&ticket.generation),
        }
    }

    /// Like `is_current`, but also forgets the client when this ticket was
    /// its newest run. Older tickets for the client keep failing afterwards.
    pub fn finish(&self, ticket: &RunTicket) -> bool {
        let Some(client_id) = &ticket.client_id else {
            return true;
        };

        let mut state = self.lock();
        if state.latest.get(client_id) == Some(&ticket.generation) {
            state.latest.remove(client_id);
            true
        } else {
            false
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.lock().latest.len()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
