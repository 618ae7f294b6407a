//! Collection of independent links.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;
use std::time::Instant;

use bytes::Bytes;
use tracing::debug;

use super::{Link, LinkParams};
use crate::core::{LinkError, LinkResult, UpperLayer};

/// Links keyed by whatever identifies them to the caller (device, port...).
///
/// The table owns the links; nothing is shared between them.
#[derive(Debug)]
pub struct LinkTable<K> {
    links: HashMap<K, Link>,
}

impl<K: Eq + Hash> Default for LinkTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> LinkTable<K> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            links: HashMap::new(),
        }
    }

    /// Add a disconnected link under `key`.
    pub fn register(&mut self, key: K, params: LinkParams) -> LinkResult<()> {
        match self.links.entry(key) {
            Entry::Occupied(_) => Err(LinkError::AlreadyRegistered),
            Entry::Vacant(slot) => {
                slot.insert(Link::new(params)?);
                Ok(())
            }
        }
    }

    /// Remove a link and hand it back.
    pub fn unregister(&mut self, key: &K) -> LinkResult<Link> {
        self.links.remove(key).ok_or(LinkError::UnknownLink)
    }

    /// Look up a link.
    pub fn get(&self, key: &K) -> Option<&Link> {
        self.links.get(key)
    }

    /// Look up a link for modification.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut Link> {
        self.links.get_mut(key)
    }

    /// Number of registered links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Check if no link is registered.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Iterate over the registered links.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Link)> {
        self.links.iter()
    }

    /// Iterate mutably over the registered links, e.g. to drain their
    /// outbound frames.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut Link)> {
        self.links.iter_mut()
    }

    /// Route a received frame to the link registered under `key`.
    pub fn data_received<U>(
        &mut self,
        key: &K,
        now: Instant,
        raw: Bytes,
        upper: &mut U,
    ) -> LinkResult<()>
    where
        U: UpperLayer + ?Sized,
    {
        let link = self.links.get_mut(key).ok_or(LinkError::UnknownLink)?;
        link.data_input(now, raw, upper);
        Ok(())
    }

    /// Earliest timer deadline across all links.
    pub fn next_timeout(&self) -> Option<Instant> {
        self.links.values().filter_map(Link::poll_timeout).min()
    }

    /// Fire the expired timers of every link.
    ///
    /// `upper_for` supplies the upper layer to notify for a given link.
    /// Returns the number of links that had expired timers.
    pub fn handle_timeouts<U, F>(&mut self, now: Instant, mut upper_for: F) -> usize
    where
        U: UpperLayer,
        F: FnMut(&K) -> U,
    {
        let mut fired = 0;
        for (key, link) in self.links.iter_mut() {
            if link.poll_timeout().is_some_and(|deadline| deadline <= now) {
                let mut upper = upper_for(key);
                link.handle_timeout(now, &mut upper);
                fired += 1;
            }
        }
        if fired > 0 {
            debug!(fired, "link timers handled");
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::core::{Delivery, DisconnectReason};
    use crate::link::LinkState;

    type Log = Rc<RefCell<Vec<(u8, DisconnectReason)>>>;

    struct Tagged {
        key: u8,
        log: Log,
    }

    impl UpperLayer for Tagged {
        fn connect_indication(&mut self) {}

        fn connect_confirmation(&mut self) {}

        fn disconnect_indication(&mut self, reason: DisconnectReason) {
            self.log.borrow_mut().push((self.key, reason));
        }

        fn disconnect_confirmation(&mut self, reason: DisconnectReason) {
            self.log.borrow_mut().push((self.key, reason));
        }

        fn data_indication(&mut self, _payload: Bytes) -> Delivery {
            Delivery::Accepted
        }
    }

    #[test]
    fn test_register_and_unregister() {
        let mut table = LinkTable::new();
        table.register("ttyS0", LinkParams::default()).unwrap();
        assert_eq!(
            table.register("ttyS0", LinkParams::default()),
            Err(LinkError::AlreadyRegistered)
        );
        assert_eq!(table.len(), 1);

        let bad = LinkParams {
            n2: 0,
            ..LinkParams::default()
        };
        assert!(matches!(
            table.register("ttyS1", bad),
            Err(LinkError::Config(_))
        ));

        assert!(table.unregister(&"ttyS0").is_ok());
        assert!(matches!(
            table.unregister(&"ttyS0"),
            Err(LinkError::UnknownLink)
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn test_unknown_link() {
        let mut table: LinkTable<u8> = LinkTable::new();
        let log = Log::default();
        let mut upper = Tagged { key: 0, log };
        assert_eq!(
            table.data_received(&7, Instant::now(), Bytes::from_static(&[0x03, 0x3F]), &mut upper),
            Err(LinkError::UnknownLink)
        );
    }

    #[test]
    fn test_links_are_independent() {
        let now = Instant::now();
        let mut table = LinkTable::new();
        let log = Log::default();
        table.register(1u8, LinkParams::default()).unwrap();
        table.register(2u8, LinkParams::default()).unwrap();

        // SABM command from a DCE to link 1 only
        let mut upper = Tagged {
            key: 1,
            log: log.clone(),
        };
        table
            .data_received(&1, now, Bytes::from_static(&[0x03, 0x3F]), &mut upper)
            .unwrap();

        assert_eq!(table.get(&1).unwrap().state(), LinkState::DataTransfer);
        assert_eq!(table.get(&2).unwrap().state(), LinkState::Disconnected);
        assert!(table.get_mut(&1).unwrap().poll_transmit().is_some());
        assert!(table.get_mut(&2).unwrap().poll_transmit().is_none());
    }

    #[test]
    fn test_timeouts_across_links() {
        let now = Instant::now();
        let params = LinkParams {
            n2: 1,
            ..LinkParams::default()
        };
        let mut table = LinkTable::new();
        table.register(1u8, params).unwrap();
        table.register(2u8, params).unwrap();
        assert_eq!(table.next_timeout(), None);

        table.get_mut(&1).unwrap().connect_request(now).unwrap();
        let later = now + Duration::from_secs(2);
        table.get_mut(&2).unwrap().connect_request(later).unwrap();
        assert_eq!(table.next_timeout(), Some(now + params.t1));

        let log = Log::default();
        let upper_for = |key: &u8| Tagged {
            key: *key,
            log: log.clone(),
        };

        // First expiry on each link retries, the second gives up
        assert_eq!(table.handle_timeouts(now + params.t1, upper_for), 1);
        assert_eq!(table.handle_timeouts(later + params.t1, upper_for), 1);
        assert!(log.borrow().is_empty());

        let end = later + params.t1 * 2;
        assert_eq!(table.handle_timeouts(end, upper_for), 2);
        assert_eq!(
            {
                let mut entries = log.borrow().clone();
                entries.sort_by_key(|(key, _)| *key);
                entries
            },
            vec![(1, DisconnectReason::TimedOut), (2, DisconnectReason::TimedOut)]
        );
        assert_eq!(table.next_timeout(), None);
    }
}
