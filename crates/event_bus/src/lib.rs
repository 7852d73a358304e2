//! Synchronous in-process publish/subscribe.
//!
//! Subscribers register either for an exact event name or for a regex
//! pattern; catch-all subscribers see every event as an [`Envelope`].
//! Dispatch happens on the caller's stack: exact subscribers first, then
//! pattern subscribers, then catch-all subscribers, each group in
//! subscription order. A failing handler never stops the others.

use std::{
    any::Any,
    cell::RefCell,
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    rc::{Rc, Weak},
};

use regex::Regex;
use thiserror::Error;
use tracing::{trace, warn};

pub type HandlerResult = anyhow::Result<()>;

type Handler<P> = Rc<dyn Fn(&P) -> HandlerResult>;
type CatchAllHandler<P> = Rc<dyn Fn(&Envelope<'_, P>) -> HandlerResult>;
type FailureObserver = Rc<dyn Fn(&DispatchFailure)>;

/// Event as seen by catch-all subscribers.
#[derive(Debug)]
pub struct Envelope<'a, P> {
    pub name: &'a str,
    pub payload: &'a P,
}

#[derive(Debug, Clone)]
pub enum Matcher {
    Exact(String),
    Pattern(Regex),
}

impl Matcher {
    pub fn exact(name: impl Into<String>) -> Self {
        Matcher::Exact(name.into())
    }

    pub fn pattern(raw: &str) -> Result<Self, regex::Error> {
        Ok(Matcher::Pattern(Regex::new(raw)?))
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Matcher::Exact(expected) => expected == name,
            Matcher::Pattern(regex) => regex.is_match(name),
        }
    }

    fn stage(&self) -> DispatchStage {
        match self {
            Matcher::Exact(_) => DispatchStage::Exact,
            Matcher::Pattern(_) => DispatchStage::Pattern,
        }
    }
}

impl From<&str> for Matcher {
    fn from(value: &str) -> Self {
        Matcher::Exact(value.to_string())
    }
}

impl From<String> for Matcher {
    fn from(value: String) -> Self {
        Matcher::Exact(value)
    }
}

impl From<Regex> for Matcher {
    fn from(value: Regex) -> Self {
        Matcher::Pattern(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Exact,
    Pattern,
    CatchAll,
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DispatchStage::Exact => "exact",
            DispatchStage::Pattern => "pattern",
            DispatchStage::CatchAll => "catch-all",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    Error(String),
    Panic(String),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Error(message) => write!(f, "{message}"),
            FailureCause::Panic(message) => write!(f, "panicked: {message}"),
        }
    }
}

/// A handler that returned an error or panicked while an event was dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} subscriber #{subscription_id} failed on '{event}': {cause}")]
pub struct DispatchFailure {
    pub event: String,
    pub subscription_id: u64,
    pub stage: DispatchStage,
    pub cause: FailureCause,
}

#[derive(Debug, Default)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct NamedEntry<P> {
    id: u64,
    matcher: Matcher,
    handler: Handler<P>,
}

struct CatchAllEntry<P> {
    id: u64,
    handler: CatchAllHandler<P>,
}

struct Registry<P> {
    next_id: u64,
    named: Vec<NamedEntry<P>>,
    catch_all: Vec<CatchAllEntry<P>>,
    failure_observers: Vec<FailureObserver>,
}

impl<P> Registry<P> {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

trait Detach {
    fn detach(&self, id: u64) -> bool;
}

impl<P> Detach for RefCell<Registry<P>> {
    fn detach(&self, id: u64) -> bool {
        let mut registry = self.borrow_mut();
        let before = registry.named.len() + registry.catch_all.len();
        registry.named.retain(|entry| entry.id != id);
        registry.catch_all.retain(|entry| entry.id != id);
        before != registry.named.len() + registry.catch_all.len()
    }
}

/// Disposer returned by [`EventBus::subscribe`] and [`EventBus::subscribe_all`].
///
/// Dropping it keeps the subscription alive; call [`Subscription::unsubscribe`]
/// to remove it.
pub struct Subscription {
    id: u64,
    registry: Weak<dyn Detach>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Removes the subscription. Returns `false` when it was already gone.
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.detach(self.id),
            None => false,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Cloning yields another handle to the same set of subscribers.
pub struct EventBus<P> {
    registry: Rc<RefCell<Registry<P>>>,
}

impl<P> Clone for EventBus<P> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<P: 'static> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: 'static> EventBus<P> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                named: Vec::new(),
                catch_all: Vec::new(),
                failure_observers: Vec::new(),
            })),
        }
    }

    pub fn subscribe<F>(&self, matcher: impl Into<Matcher>, handler: F) -> Subscription
    where
        F: Fn(&P) -> HandlerResult + 'static,
    {
        let matcher = matcher.into();
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.allocate_id();
            registry.named.push(NamedEntry {
                id,
                matcher,
                handler: Rc::new(handler),
            });
            id
        };
        self.subscription(id)
    }

    pub fn subscribe_all<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Envelope<'_, P>) -> HandlerResult + 'static,
    {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.allocate_id();
            registry.catch_all.push(CatchAllEntry {
                id,
                handler: Rc::new(handler),
            });
            id
        };
        self.subscription(id)
    }

    /// Registers an observer for handler failures.
    pub fn on_failure<F>(&self, observer: F)
    where
        F: Fn(&DispatchFailure) + 'static,
    {
        self.registry
            .borrow_mut()
            .failure_observers
            .push(Rc::new(observer));
    }

    pub fn subscriber_count(&self) -> usize {
        let registry = self.registry.borrow();
        registry.named.len() + registry.catch_all.len()
    }

    pub fn emit(&self, name: &str, payload: P) -> DispatchReport {
        // Snapshot so handlers may (un)subscribe or emit while we iterate.
        let (exact, pattern, catch_all) = {
            let registry = self.registry.borrow();
            let mut exact = Vec::new();
            let mut pattern = Vec::new();
            for entry in registry.named.iter().filter(|e| e.matcher.matches(name)) {
                let target = (entry.id, Rc::clone(&entry.handler));
                match entry.matcher.stage() {
                    DispatchStage::Exact => exact.push(target),
                    _ => pattern.push(target),
                }
            }
            let catch_all: Vec<_> = registry
                .catch_all
                .iter()
                .map(|entry| (entry.id, Rc::clone(&entry.handler)))
                .collect();
            (exact, pattern, catch_all)
        };

        trace!(
            event = name,
            exact = exact.len(),
            pattern = pattern.len(),
            catch_all = catch_all.len(),
            "dispatching event"
        );

        let mut report = DispatchReport::default();
        for (stage, targets) in [(DispatchStage::Exact, exact), (DispatchStage::Pattern, pattern)] {
            for (id, handler) in targets {
                let outcome = catch_unwind(AssertUnwindSafe(|| handler(&payload)));
                self.record(&mut report, name, id, stage, outcome);
            }
        }

        let envelope = Envelope {
            name,
            payload: &payload,
        };
        for (id, handler) in catch_all {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(&envelope)));
            self.record(&mut report, name, id, DispatchStage::CatchAll, outcome);
        }

        report
    }

    fn subscription(&self, id: u64) -> Subscription {
        let registry: Rc<dyn Detach> = self.registry.clone();
        Subscription {
            id,
            registry: Rc::downgrade(&registry),
        }
    }

    fn record(
        &self,
        report: &mut DispatchReport,
        event: &str,
        subscription_id: u64,
        stage: DispatchStage,
        outcome: std::thread::Result<HandlerResult>,
    ) {
        let cause = match outcome {
            Ok(Ok(())) => {
                report.delivered += 1;
                return;
            }
            Ok(Err(err)) => FailureCause::Error(format!("{err:#}")),
            Err(panic) => FailureCause::Panic(panic_message(panic.as_ref())),
        };

        let failure = DispatchFailure {
            event: event.to_string(),
            subscription_id,
            stage,
            cause,
        };
        warn!(
            event,
            subscription_id,
            stage = %stage,
            "event handler failed: {}",
            failure.cause
        );

        let observers = self.registry.borrow().failure_observers.clone();
        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| observer(&failure))).is_err() {
                warn!(event, "dispatch failure observer panicked");
            }
        }
        report.failures.push(failure);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
