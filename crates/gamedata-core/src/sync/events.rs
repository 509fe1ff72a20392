use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::trace;

/// An event with a named kind listeners can subscribe to.
pub trait Event {
    type Kind: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync;

    fn kind(&self) -> Self::Kind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listener<E: Event> {
    id: ListenerId,
    kind: E::Kind,
    once: bool,
    handler: Handler<E>,
}

/// Publish/subscribe registry. `emit` delivers synchronously to every
/// handler registered for the event's kind, in registration order.
pub struct EventEmitter<E: Event> {
    listeners: RwLock<Vec<Listener<E>>>,
    next_id: AtomicU64,
}

impl<E: Event> EventEmitter<E> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn on<F>(&self, kind: E::Kind, handler: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(kind, false, Arc::new(handler))
    }

    /// Like `on`, but the handler is removed after its first delivery.
    pub fn once<F>(&self, kind: E::Kind, handler: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(kind, true, Arc::new(handler))
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|l| l.kind == kind)
            .count()
    }

    /// Deliver `event` and return how many handlers received it.
    pub fn emit(&self, event: &E) -> usize {
        let kind = event.kind();
        let handlers = {
            let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
            let handlers: Vec<Handler<E>> = listeners
                .iter()
                .filter(|l| l.kind == kind)
                .map(|l| Arc::clone(&l.handler))
                .collect();
            // Claimed under the same lock so a `once` handler is delivered once.
            listeners.retain(|l| !(l.once && l.kind == kind));
            handlers
        };

        // Handlers run without the lock held so they may register listeners.
        for handler in &handlers {
            handler(event);
        }
        trace!(event = %kind, delivered = handlers.len(), "Emitted event");
        handlers.len()
    }

    fn register(&self, kind: E::Kind, once: bool, handler: Handler<E>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Listener {
                id,
                kind,
                once,
                handler,
            });
        id
    }
}

impl<E: Event> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        Ping,
        Pong,
    }

    impl fmt::Display for Kind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Kind::Ping => write!(f, "PING"),
                Kind::Pong => write!(f, "PONG"),
            }
        }
    }

    struct Msg(Kind, u32);

    impl Event for Msg {
        type Kind = Kind;

        fn kind(&self) -> Kind {
            self.0
        }
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let emitter = EventEmitter::<Msg>::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let log = Arc::clone(&log);
            emitter.on(Kind::Ping, move |msg| log.lock().unwrap().push((tag, msg.1)));
        }
        let pong_log = Arc::clone(&log);
        emitter.on(Kind::Pong, move |msg| pong_log.lock().unwrap().push(("pong", msg.1)));

        assert_eq!(emitter.emit(&Msg(Kind::Ping, 7)), 2);
        assert_eq!(*log.lock().unwrap(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_off_and_once() {
        let emitter = EventEmitter::<Msg>::new();
        let id = emitter.on(Kind::Ping, |_| {});
        emitter.once(Kind::Ping, |_| {});
        assert_eq!(emitter.listener_count(Kind::Ping), 2);

        assert_eq!(emitter.emit(&Msg(Kind::Ping, 1)), 2);
        assert_eq!(emitter.listener_count(Kind::Ping), 1);

        assert!(emitter.off(id));
        assert!(!emitter.off(id));
        assert_eq!(emitter.emit(&Msg(Kind::Ping, 2)), 0);
    }

    #[test]
    fn test_once_delivered_once_across_threads() {
        let emitter = Arc::new(EventEmitter::<Msg>::new());
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        emitter.once(Kind::Ping, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let barrier = Arc::new(std::sync::Barrier::new(8));
        let threads: Vec<_> = (0..8)
            .map(|n| {
                let emitter = Arc::clone(&emitter);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    emitter.emit(&Msg(Kind::Ping, n))
                })
            })
            .collect();
        let delivered: usize = threads.into_iter().map(|t| t.join().unwrap()).sum();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(delivered, 1);
        assert_eq!(emitter.listener_count(Kind::Ping), 0);
    }

    #[test]
    fn test_handler_may_register_listener() {
        let emitter = Arc::new(EventEmitter::<Msg>::new());
        let inner = Arc::clone(&emitter);
        emitter.once(Kind::Ping, move |_| {
            inner.on(Kind::Pong, |_| {});
        });

        emitter.emit(&Msg(Kind::Ping, 1));
        assert_eq!(emitter.listener_count(Kind::Pong), 1);
    }
}
