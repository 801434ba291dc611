use std::fmt::{Debug, Formatter};

pub type UpdateHandler<T> = Box<dyn Fn(&T)>;

/// Token returned by [`Observable::subscribe`]; pass it to [`Observable::unsubscribe`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Subscription(u64);

/// Subscription list and transaction depth embedded in every observable object.
pub struct Updatable<T> {
    depth: u32,
    next_subscription: u64,
    handlers: Vec<(Subscription, UpdateHandler<T>)>,
}

impl<T> Updatable<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { depth: 0, next_subscription: 0, handlers: Vec::new() }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.depth > 0
    }

    /// Drops every handler and returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let released = self.handlers.len();
        self.handlers.clear();
        released
    }
}

impl<T> Default for Updatable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for Updatable<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updatable")
            .field("depth", &self.depth)
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}

pub trait Observable: Sized {
    fn updatable(&self) -> &Updatable<Self>;

    fn updatable_mut(&mut self) -> &mut Updatable<Self>;

    fn subscribe<F>(&mut self, handler: F) -> Subscription
    where
        F: Fn(&Self) + 'static,
    {
        let updates = self.updatable_mut();
        updates.next_subscription += 1;
        let subscription = Subscription(updates.next_subscription);
        updates.handlers.push((subscription, Box::new(handler)));
        subscription
    }

    /// Returns false if the subscription was already released.
    fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let handlers = &mut self.updatable_mut().handlers;
        let before = handlers.len();
        handlers.retain(|(candidate, _)| *candidate != subscription);
        handlers.len() != before
    }

    /// Run `transaction` and notify subscribers once the outermost transaction succeeds.
    ///
    /// # Errors
    /// Returns the transaction's error unchanged. No notification is sent in that case.
    fn update<R, E, F>(&mut self, transaction: F) -> Result<R, E>
    where
        F: FnOnce(&mut Self) -> Result<R, E>,
    {
        self.updatable_mut().depth += 1;
        let result = transaction(&mut *self);
        let updates = self.updatable_mut();
        updates.depth = updates.depth.saturating_sub(1);
        let outermost = updates.depth == 0;
        if result.is_ok() && outermost {
            self.notify();
        }
        result
    }

    fn notify(&self) {
        tracing::trace!(subscribers = self.updatable().subscriber_count(), "notifying update");
        for (_, handler) in &self.updatable().handlers {
            handler(self);
        }
    }
}

macro_rules! impl_observable {
    ($ty:ty) => {
        impl $crate::updatable::Observable for $ty {
            fn updatable(&self) -> &$crate::updatable::Updatable<Self> {
                &self.updates
            }

            fn updatable_mut(&mut self) -> &mut $crate::updatable::Updatable<Self> {
                &mut self.updates
            }
        }
    };
}

pub(crate) use impl_observable;

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct Counter {
        value: u32,
        updates: Updatable<Counter>,
    }

    impl_observable!(Counter);

    impl Counter {
        fn increment(&mut self) -> Result<(), String> {
            self.update(|counter| {
                counter.value += 1;
                Ok(())
            })
        }
    }

    fn mk_counter_with_log() -> (Counter, Rc<RefCell<Vec<u32>>>) {
        let mut counter = Counter::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        counter.subscribe(move |counter: &Counter| sink.borrow_mut().push(counter.value));
        (counter, log)
    }

    #[test]
    fn notifies_once_per_update() {
        let (mut counter, log) = mk_counter_with_log();
        if let Err(err) = counter.increment() {
            panic!("increment failed: {err}");
        }
        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn nested_updates_notify_once_after_outermost() {
        let (mut counter, log) = mk_counter_with_log();
        let result = counter.update(|counter| {
            counter.increment()?;
            counter.increment()?;
            counter.increment()
        });
        if let Err(err) = result {
            panic!("nested update failed: {err}");
        }
        assert_eq!(*log.borrow(), vec![3]);
        assert!(!counter.updatable().is_updating());
    }

    #[test]
    fn failed_transaction_does_not_notify_and_resets_depth() {
        let (mut counter, log) = mk_counter_with_log();
        let result: Result<(), String> = counter.update(|counter| {
            counter.value += 1;
            Err("boom".to_string())
        });
        assert_eq!(result, Err("boom".to_string()));
        assert!(log.borrow().is_empty());
        assert!(!counter.updatable().is_updating());

        if let Err(err) = counter.increment() {
            panic!("increment failed: {err}");
        }
        assert_eq!(*log.borrow(), vec![2]);
    }

    #[test]
    fn handlers_run_in_subscription_order_and_can_unsubscribe() {
        let mut counter = Counter::default();
        let order = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&order);
        let second = Rc::clone(&order);
        let a = counter.subscribe(move |_: &Counter| first.borrow_mut().push("a"));
        counter.subscribe(move |_: &Counter| second.borrow_mut().push("b"));

        if let Err(err) = counter.increment() {
            panic!("increment failed: {err}");
        }
        assert!(counter.unsubscribe(a));
        assert!(!counter.unsubscribe(a));
        if let Err(err) = counter.increment() {
            panic!("increment failed: {err}");
        }
        assert_eq!(*order.borrow(), vec!["a", "b", "b"]);
    }

    #[test]
    fn release_all_drops_handlers() {
        let mut counter = Counter::default();
        let calls = Rc::new(Cell::new(0_u32));
        let sink = Rc::clone(&calls);
        counter.subscribe(move |_: &Counter| sink.set(sink.get() + 1));
        assert_eq!(counter.updates.release_all(), 1);
        if let Err(err) = counter.increment() {
            panic!("increment failed: {err}");
        }
        assert_eq!(calls.get(), 0);
    }
}
