//! In-process protocol stack.
//!
//! Splits into two halves that live on different execution contexts:
//!
//! | Half             | Context       | Role                                     |
//! |------------------|---------------|------------------------------------------|
//! | [`LocalStack`]   | dispatch task | [`StackPort`]: schedules work, commissioning, reset |
//! | [`StackContext`] | stack thread  | drains the work queue into the [`AttributeTable`] |
//!
//! The attribute table is owned by `StackContext` and never shared, so
//! the only way the dispatch task can touch it is through a queued
//! [`StackWork`] item.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::{FnvIndexMap, HistoryBuffer};
use log::{Level, debug, info, log_enabled, warn};
use serde::Serialize;

use crate::app::ports::{AttributeStore, EndpointId, IdentifyEffect, StackPort};
use crate::app::work::StackWork;
use crate::error::{AttributeStatus, StackError};
use crate::events::EVENT_QUEUE_CAP;

/// One dispatched event schedules at most one work item, so a full event
/// queue fits.
pub const WORK_QUEUE_CAP: usize = EVENT_QUEUE_CAP;
pub const MAX_ENDPOINTS: usize = 4;
pub const EVENT_LOG_CAP: usize = 16;

pub type WorkChannel = Channel<CriticalSectionRawMutex, StackWork, WORK_QUEUE_CAP>;

// ═══════════════════════════════════════════════════════════════
//  Attribute table
// ═══════════════════════════════════════════════════════════════

/// One boolean state change event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateChangeEvent {
    pub event_number: u64,
    pub endpoint: EndpointId,
    pub state_value: bool,
}

/// Boolean state attributes per endpoint plus the recent event log.
pub struct AttributeTable {
    boolean_state: FnvIndexMap<EndpointId, bool, MAX_ENDPOINTS>,
    events: HistoryBuffer<StateChangeEvent, EVENT_LOG_CAP>,
    next_event_number: u64,
}

impl Default for AttributeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeTable {
    pub fn new() -> Self {
        Self {
            boolean_state: FnvIndexMap::new(),
            events: HistoryBuffer::new(),
            next_event_number: 0,
        }
    }

    /// Expose a boolean state attribute on `endpoint`.
    pub fn add_endpoint(&mut self, endpoint: EndpointId, initial: bool) -> Result<(), AttributeStatus> {
        self.boolean_state
            .insert(endpoint, initial)
            .map(|_| ())
            .map_err(|_| AttributeStatus::FAILURE)
    }

    /// Recorded events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &StateChangeEvent> {
        self.events.oldest_ordered()
    }

    pub fn last_event(&self) -> Option<&StateChangeEvent> {
        self.events.recent()
    }

    /// Event log as JSON.  The stack context dumps it to the debug log
    /// after every sync.
    pub fn events_json(&self) -> Result<String, serde_json::Error> {
        let events: Vec<&StateChangeEvent> = self.events().collect();
        serde_json::to_string(&events)
    }
}

impl AttributeStore for AttributeTable {
    fn boolean_state(&self, endpoint: EndpointId) -> Result<bool, AttributeStatus> {
        self.boolean_state
            .get(&endpoint)
            .copied()
            .ok_or(AttributeStatus::UNSUPPORTED_ENDPOINT)
    }

    fn set_boolean_state(&mut self, endpoint: EndpointId, value: bool) -> Result<(), AttributeStatus> {
        let slot = self
            .boolean_state
            .get_mut(&endpoint)
            .ok_or(AttributeStatus::UNSUPPORTED_ENDPOINT)?;
        *slot = value;
        Ok(())
    }

    fn log_state_change_event(&mut self, endpoint: EndpointId, value: bool) {
        let event = StateChangeEvent {
            event_number: self.next_event_number,
            endpoint,
            state_value: value,
        };
        self.next_event_number += 1;
        self.events.write(event);
        debug!(
            "StateChange event #{} on endpoint {} (value {})",
            event.event_number, endpoint, value
        );
    }
}

// ═══════════════════════════════════════════════════════════════
//  Stack context
// ═══════════════════════════════════════════════════════════════

/// Identify cluster hooks, called on the stack context.
#[derive(Clone, Copy)]
pub struct IdentifyCallbacks {
    pub start: fn(IdentifyEffect),
    pub stop: fn(IdentifyEffect),
}

/// The stack's own execution context.  Owns the attribute table.
pub struct StackContext<'a> {
    work: &'a WorkChannel,
    store: AttributeTable,
    identify: Option<IdentifyCallbacks>,
}

impl<'a> StackContext<'a> {
    pub fn new(work: &'a WorkChannel, store: AttributeTable) -> Self {
        Self {
            work,
            store,
            identify: None,
        }
    }

    pub fn with_identify_callbacks(mut self, callbacks: IdentifyCallbacks) -> Self {
        self.identify = Some(callbacks);
        self
    }

    /// Identify command received for the device.
    pub fn identify_start(&self, effect: IdentifyEffect) {
        match self.identify {
            Some(cb) => (cb.start)(effect),
            None => debug!("Identify start {:?}: no callback registered", effect),
        }
    }

    /// Identify time elapsed or stop command received.
    pub fn identify_stop(&self, effect: IdentifyEffect) {
        match self.identify {
            Some(cb) => (cb.stop)(effect),
            None => debug!("Identify stop {:?}: no callback registered", effect),
        }
    }

    /// Wait for one work item and execute it.
    pub async fn next(&mut self) {
        let work = self.work.receive().await;
        self.execute(work);
    }

    fn execute(&mut self, work: StackWork) {
        work.run(&mut self.store);
        if matches!(work, StackWork::SyncBooleanState { .. }) && log_enabled!(Level::Debug) {
            match self.store.events_json() {
                Ok(json) => debug!("StateChange events: {}", json),
                Err(e) => warn!("StateChange events not serialisable: {}", e),
            }
        }
    }

    /// Serve the work queue forever.
    pub async fn run(&mut self) {
        loop {
            self.next().await;
        }
    }

    /// Thread body for the stack context: drives the work loop on a local
    /// executor until the device resets.
    pub fn serve(mut self) {
        let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
        executor.spawn(async move { self.run().await }).detach();
        info!("Stack context started");
        futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
    }

    /// Execute every queued item.  Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(work) = self.work.try_receive() {
            self.execute(work);
            ran += 1;
        }
        ran
    }

    pub fn store(&self) -> &AttributeTable {
        &self.store
    }
}

// ═══════════════════════════════════════════════════════════════
//  Dispatch-side handle
// ═══════════════════════════════════════════════════════════════

/// [`StackPort`] used by the app task.
pub struct LocalStack<'a> {
    work: &'a WorkChannel,
    advertising: bool,
    reset_requested: bool,
    reset_hook: Option<fn()>,
}

impl<'a> LocalStack<'a> {
    pub fn new(work: &'a WorkChannel) -> Self {
        Self {
            work,
            advertising: false,
            reset_requested: false,
            reset_hook: None,
        }
    }

    /// Called once a factory reset has been requested.  On the device this
    /// erases persistent storage and restarts.
    pub fn with_reset_hook(mut self, hook: fn()) -> Self {
        self.reset_hook = Some(hook);
        self
    }

    pub fn reset_requested(&self) -> bool {
        self.reset_requested
    }
}

impl StackPort for LocalStack<'_> {
    fn schedule_factory_reset(&mut self) {
        warn!("Stack: factory reset scheduled");
        self.reset_requested = true;
        self.advertising = false;
        if let Some(hook) = self.reset_hook {
            hook();
        }
    }

    fn is_advertising_enabled(&self) -> bool {
        self.advertising
    }

    fn set_advertising_enabled(&mut self, enabled: bool) {
        self.advertising = enabled;
    }

    fn open_commissioning_window(&mut self) -> Result<(), StackError> {
        if self.reset_requested {
            return Err(StackError::NotRunning);
        }
        self.advertising = true;
        info!("Stack: commissioning window open");
        Ok(())
    }

    /// A full queue only rejects read-backs.  A boolean state sync carries
    /// the whole current reading, so it evicts the oldest pending item and
    /// takes its place.
    fn schedule_work(&mut self, work: StackWork) -> Result<(), StackError> {
        match self.work.try_send(work) {
            Ok(()) => Ok(()),
            Err(_) if matches!(work, StackWork::SyncBooleanState { .. }) => {
                if let Ok(evicted) = self.work.try_receive() {
                    warn!("Stack: work queue full, dropped {:?}", evicted);
                }
                self.work.try_send(work).map_err(|_| StackError::WorkQueueFull)
            }
            Err(_) => Err(StackError::WorkQueueFull),
        }
    }
}
