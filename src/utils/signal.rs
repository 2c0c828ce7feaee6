// SPDX-License-Identifier: GPL-3.0-only

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type Callback<T> = Box<dyn FnMut(&T) + Send>;

struct Inner<T> {
    next_token: usize,
    callbacks: Vec<(usize, Callback<T>)>,
    removed: Vec<usize>,
}

/// A broadcast signal with RAII listeners.
///
/// Listeners are detached by dropping their [`Subscription`]; there is no
/// manual unsubscribe and a subscription is never re-armed. Emission is
/// synchronous and runs listeners in subscription order. Subscribing or
/// dropping a subscription from inside a listener is allowed.
pub struct Signal<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Signal<T> {
        Signal {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Signal<T> {
        Signal::new()
    }
}

impl<T> Signal<T> {
    pub fn new() -> Signal<T> {
        Signal {
            inner: Arc::new(Mutex::new(Inner {
                next_token: 0,
                callbacks: Vec::new(),
                removed: Vec::new(),
            })),
        }
    }

    pub fn subscribe(&self, callback: impl FnMut(&T) + Send + 'static) -> Subscription
    where
        T: 'static,
    {
        let token = {
            let mut inner = self.inner.lock();
            let token = inner.next_token;
            inner.next_token += 1;
            inner.callbacks.push((token, Box::new(callback)));
            token
        };

        let weak: Weak<Mutex<Inner<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut inner = inner.lock();
                    if inner.callbacks.iter().any(|(t, _)| *t == token) {
                        inner.removed.push(token);
                    }
                }
            })),
        }
    }

    pub fn emit(&self, value: &T) {
        // Listeners may subscribe or drop subscriptions while we iterate, so
        // the callback list is taken out of the lock for the duration.
        let mut callbacks = std::mem::take(&mut self.inner.lock().callbacks);

        for (token, callback) in callbacks.iter_mut() {
            let skip = self.inner.lock().removed.contains(token);
            if !skip {
                callback(value);
            }
        }

        let mut inner = self.inner.lock();
        callbacks.retain(|(token, _)| !inner.removed.contains(token));
        let added = std::mem::take(&mut inner.callbacks);
        callbacks.extend(
            added
                .into_iter()
                .filter(|(token, _)| !inner.removed.contains(token)),
        );
        inner.callbacks = callbacks;
        inner.removed.clear();
    }
}

/// Owned handle to a [`Signal`] listener; dropping it detaches the listener.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Subscription")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listeners_receive_every_emission() {
        let signal = Signal::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = signal.subscribe(move |v| sink.lock().push(*v));

        signal.emit(&1);
        signal.emit(&2);
        assert_eq!(&*seen.lock(), &[1, 2]);
    }

    #[test]
    fn dropping_the_subscription_detaches() {
        let signal = Signal::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = signal.subscribe(move |v| sink.lock().push(*v));

        signal.emit(&1);
        drop(sub);
        signal.emit(&2);
        assert_eq!(&*seen.lock(), &[1]);
    }

    #[test]
    fn subscribing_during_emit_only_sees_later_emissions() {
        let signal = Signal::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let late = Arc::new(Mutex::new(None));

        let sink = seen.clone();
        let inner_signal = signal.clone();
        let slot = late.clone();
        let _sub = signal.subscribe(move |v| {
            sink.lock().push(*v);
            if slot.lock().is_none() {
                let sink = Arc::new(Mutex::new(Vec::new()));
                let inner_sink = sink.clone();
                *slot.lock() = Some((
                    sink,
                    inner_signal.subscribe(move |v| inner_sink.lock().push(*v)),
                ));
            }
        });

        signal.emit(&1);
        signal.emit(&2);
        assert_eq!(&*seen.lock(), &[1, 2]);
        let guard = late.lock();
        let (inner_seen, _) = guard.as_ref().unwrap();
        assert_eq!(&*inner_seen.lock(), &[2]);
    }
}
