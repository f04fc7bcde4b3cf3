//! An in-memory [`PeerTransport`] for tests and single-process use.
//!
//! A [`LoopbackHub`] owns a set of named endpoints and the links between
//! them. Each [`LoopbackTransport`] drains its own FIFO event queue, so
//! delivery is reliable and ordered per destination — the exact contract the
//! sessions require — while connects, disconnects and sends can be driven
//! explicitly from test code.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::network::transport::{PeerTransport, TransportError, TransportEvent};

#[derive(Debug, Default)]
struct Endpoint {
    queue: VecDeque<TransportEvent<String>>,
    links: HashSet<String>,
}

#[derive(Debug, Default)]
struct HubInner {
    endpoints: HashMap<String, Endpoint>,
}

impl HubInner {
    fn push(&mut self, to: &str, event: TransportEvent<String>) {
        if let Some(endpoint) = self.endpoints.get_mut(to) {
            endpoint.queue.push_back(event);
        }
    }
}

/// A shared in-process mesh of [`LoopbackTransport`] endpoints.
///
/// Cloning the hub is cheap; all clones refer to the same mesh.
///
/// # Examples
///
/// ```
/// use warband_sync::network::transport::{PeerTransport, TransportEvent};
/// use warband_sync::LoopbackHub;
///
/// let hub = LoopbackHub::new();
/// let mut a = hub.attach("a");
/// let mut b = hub.attach("b");
/// hub.connect("a", "b");
///
/// a.send_to(b"hello", &"b".to_owned()).unwrap();
/// let events = b.poll_events();
/// assert!(matches!(&events[0], TransportEvent::Connected(addr) if addr == "a"));
/// assert!(matches!(&events[1], TransportEvent::Data { bytes, .. } if bytes == b"hello"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoopbackHub {
    inner: Arc<Mutex<HubInner>>,
}

impl LoopbackHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an endpoint and returns its transport handle.
    ///
    /// Attaching a name twice resets that endpoint's queue and links.
    #[must_use]
    pub fn attach(&self, name: &str) -> LoopbackTransport {
        let mut inner = self.inner.lock();
        inner.endpoints.insert(name.to_owned(), Endpoint::default());
        LoopbackTransport {
            inner: Arc::clone(&self.inner),
            local: name.to_owned(),
        }
    }

    /// Establishes a link between two endpoints, delivering a `Connected`
    /// event to each. Unknown names and already-linked pairs are no-ops.
    pub fn connect(&self, a: &str, b: &str) {
        let mut inner = self.inner.lock();
        if !inner.endpoints.contains_key(a) || !inner.endpoints.contains_key(b) || a == b {
            return;
        }
        let already = inner
            .endpoints
            .get(a)
            .is_some_and(|e| e.links.contains(b));
        if already {
            return;
        }
        if let Some(ea) = inner.endpoints.get_mut(a) {
            ea.links.insert(b.to_owned());
        }
        if let Some(eb) = inner.endpoints.get_mut(b) {
            eb.links.insert(a.to_owned());
        }
        inner.push(a, TransportEvent::Connected(b.to_owned()));
        inner.push(b, TransportEvent::Connected(a.to_owned()));
    }

    /// Severs the link between two endpoints, delivering a `Disconnected`
    /// event to each side that was linked.
    pub fn disconnect(&self, a: &str, b: &str) {
        let mut inner = self.inner.lock();
        let linked = inner
            .endpoints
            .get(a)
            .is_some_and(|e| e.links.contains(b));
        if !linked {
            return;
        }
        if let Some(ea) = inner.endpoints.get_mut(a) {
            ea.links.remove(b);
        }
        if let Some(eb) = inner.endpoints.get_mut(b) {
            eb.links.remove(a);
        }
        inner.push(a, TransportEvent::Disconnected(b.to_owned()));
        inner.push(b, TransportEvent::Disconnected(a.to_owned()));
    }

    /// Severs every link the named endpoint holds, as if its process died.
    pub fn drop_endpoint(&self, name: &str) {
        let peers: Vec<String> = {
            let inner = self.inner.lock();
            match inner.endpoints.get(name) {
                Some(endpoint) => endpoint.links.iter().cloned().collect(),
                None => return,
            }
        };
        for peer in peers {
            self.disconnect(name, &peer);
        }
    }
}

/// One endpoint's handle into a [`LoopbackHub`].
#[derive(Debug)]
pub struct LoopbackTransport {
    inner: Arc<Mutex<HubInner>>,
    local: String,
}

impl LoopbackTransport {
    /// The name this endpoint was attached under.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local
    }
}

impl PeerTransport for LoopbackTransport {
    type Address = String;

    fn send_to(&mut self, bytes: &[u8], to: &Self::Address) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        let linked = inner
            .endpoints
            .get(&self.local)
            .is_some_and(|e| e.links.contains(to));
        if !linked {
            return Err(TransportError::PeerUnreachable {
                detail: format!("{} is not connected to {}", self.local, to),
            });
        }
        inner.push(
            to,
            TransportEvent::Data {
                from: self.local.clone(),
                bytes: bytes.to_vec(),
            },
        );
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<TransportEvent<Self::Address>> {
        let mut inner = self.inner.lock();
        match inner.endpoints.get_mut(&self.local) {
            Some(endpoint) => endpoint.queue.drain(..).collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn connect_delivers_events_to_both_sides() {
        let hub = LoopbackHub::new();
        let mut a = hub.attach("a");
        let mut b = hub.attach("b");
        hub.connect("a", "b");
        assert_eq!(
            a.poll_events(),
            vec![TransportEvent::Connected("b".to_owned())]
        );
        assert_eq!(
            b.poll_events(),
            vec![TransportEvent::Connected("a".to_owned())]
        );
    }

    #[test]
    fn duplicate_connect_is_noop() {
        let hub = LoopbackHub::new();
        let mut a = hub.attach("a");
        let _b = hub.attach("b");
        hub.connect("a", "b");
        hub.connect("a", "b");
        hub.connect("b", "a");
        assert_eq!(a.poll_events().len(), 1);
    }

    #[test]
    fn sends_are_ordered_per_destination() {
        let hub = LoopbackHub::new();
        let mut a = hub.attach("a");
        let mut b = hub.attach("b");
        hub.connect("a", "b");
        let _ = b.poll_events();

        a.send_to(b"one", &"b".to_owned()).unwrap();
        a.send_to(b"two", &"b".to_owned()).unwrap();
        a.send_to(b"three", &"b".to_owned()).unwrap();

        let payloads: Vec<Vec<u8>> = b
            .poll_events()
            .into_iter()
            .filter_map(|e| match e {
                TransportEvent::Data { bytes, .. } => Some(bytes),
                _ => None,
            })
            .collect();
        assert_eq!(payloads, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
    }

    #[test]
    fn send_to_unlinked_peer_fails() {
        let hub = LoopbackHub::new();
        let mut a = hub.attach("a");
        let _b = hub.attach("b");
        let err = a.send_to(b"x", &"b".to_owned()).unwrap_err();
        assert!(matches!(err, TransportError::PeerUnreachable { .. }));
    }

    #[test]
    fn disconnect_notifies_both_sides_and_blocks_sends() {
        let hub = LoopbackHub::new();
        let mut a = hub.attach("a");
        let mut b = hub.attach("b");
        hub.connect("a", "b");
        let _ = a.poll_events();
        let _ = b.poll_events();

        hub.disconnect("a", "b");
        assert_eq!(
            a.poll_events(),
            vec![TransportEvent::Disconnected("b".to_owned())]
        );
        assert_eq!(
            b.poll_events(),
            vec![TransportEvent::Disconnected("a".to_owned())]
        );
        assert!(a.send_to(b"x", &"b".to_owned()).is_err());
    }

    #[test]
    fn drop_endpoint_severs_all_links() {
        let hub = LoopbackHub::new();
        let mut host = hub.attach("host");
        let mut p1 = hub.attach("p1");
        let mut p2 = hub.attach("p2");
        hub.connect("host", "p1");
        hub.connect("host", "p2");
        let _ = host.poll_events();
        let _ = p1.poll_events();
        let _ = p2.poll_events();

        hub.drop_endpoint("host");
        assert_eq!(
            p1.poll_events(),
            vec![TransportEvent::Disconnected("host".to_owned())]
        );
        assert_eq!(
            p2.poll_events(),
            vec![TransportEvent::Disconnected("host".to_owned())]
        );
        assert_eq!(host.poll_events().len(), 2);
    }
}
