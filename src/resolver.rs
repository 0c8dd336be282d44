//! Iterative resolution engine.
//!
//! Walks the delegation chain from the configured root server, following
//! CNAME aliases and resolving nameserver addresses on demand, caching every
//! record observed along the way. The transport and the cache are injected
//! at construction so tests can run against scripted transports and fresh
//! caches.

use std::collections::HashSet;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;

use metrics::counter;
use tracing::{debug, warn};

use crate::cache::RecordCache;
use crate::message;
use crate::record::{RecordKey, RecordType, ResourceRecord};
use crate::transport::Transport;

/// Bound on CNAME hops plus nameserver-address sub-resolutions spent on one
/// top-level query.
const MAX_INDIRECTION: usize = 10;

/// Resolution engine.
pub struct Resolver<T> {
    transport: T,
    cache: RecordCache,
    root: IpAddr,
}

impl<T: Transport> Resolver<T> {
    pub fn new(transport: T, cache: RecordCache, root: IpAddr) -> Self {
        Self {
            transport,
            cache,
            root,
        }
    }

    /// Root server queried whenever no cached delegation applies.
    pub fn root(&self) -> IpAddr {
        self.root
    }

    /// Replace the root server used by subsequent lookups.
    pub fn set_root(&mut self, root: IpAddr) {
        self.root = root;
    }

    /// Handle to the shared record cache.
    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    /// Resolve `key`, returning every matching record.
    ///
    /// Everything short of a process-level fault degrades to an empty set:
    /// unreachable servers, malformed replies, exhausted indirection. The
    /// caller decides how to report "no answer".
    pub async fn resolve(&self, key: RecordKey) -> HashSet<ResourceRecord> {
        self.resolve_at(key, 0).await
    }

    // Recursion goes through a boxed future: CNAME hops and nameserver
    // address lookups re-enter with depth + 1.
    fn resolve_at(
        &self,
        node: RecordKey,
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = HashSet<ResourceRecord>> + Send + '_>> {
        Box::pin(async move {
            if depth > MAX_INDIRECTION {
                warn!(host = %node.host, "maximum indirection level reached");
                return HashSet::new();
            }

            // Servers that already answered for this node. Re-selecting one
            // means the last reply moved us nowhere.
            let mut queried: HashSet<IpAddr> = HashSet::new();

            loop {
                let hit = self.cache.lookup(&node);
                if !hit.is_empty() {
                    counter!("burrow_cache_hits_total").increment(1);
                    return hit;
                }

                // A cached alias is transparent: the caller gets the records
                // of the canonical name.
                if let Some(target) = self.cached_alias(&node) {
                    debug!(host = %node.host, target = %target, "following alias");
                    return self
                        .resolve_at(RecordKey::new(target, node.rtype), depth + 1)
                        .await;
                }

                let Some(server) = self.select_server(&node, depth).await else {
                    return HashSet::new();
                };
                if !queried.insert(server) {
                    debug!(host = %node.host, %server, "server already queried, giving up");
                    return HashSet::new();
                }

                let referrals = self.query_server(&node, server).await;
                if referrals == 0 {
                    // the reply carried no referral; it either answered the
                    // question (directly or via an alias) or ended the branch
                    let hit = self.cache.lookup(&node);
                    if !hit.is_empty() {
                        return hit;
                    }
                    if self.cached_alias(&node).is_some() {
                        continue;
                    }
                    debug!(host = %node.host, %server, "reply added nothing new");
                    return HashSet::new();
                }
            }
        })
    }

    /// A cached CNAME target for the node's host, if any.
    fn cached_alias(&self, node: &RecordKey) -> Option<String> {
        let alias_key = RecordKey::new(node.host.clone(), RecordType::Cname);
        self.cache
            .lookup(&alias_key)
            .into_iter()
            .find_map(|record| record.data.name().map(str::to_string))
    }

    /// Decide which server should answer for `node`: the nearest cached
    /// delegation if one exists, otherwise the root.
    async fn select_server(&self, node: &RecordKey, depth: usize) -> Option<IpAddr> {
        match self.closest_delegation(&node.host) {
            Some(nameservers) => self.nameserver_address(&nameservers, depth).await,
            None => Some(self.root),
        }
    }

    /// Walk the ancestors of `host`, dropping one leading label at a time,
    /// until a cached NS set turns up. A single remaining label means the
    /// root zone is the best authority we know of.
    fn closest_delegation(&self, host: &str) -> Option<Vec<String>> {
        let mut zone = host;
        while let Some((_, parent)) = zone.split_once('.') {
            let cached = self.cache.lookup(&RecordKey::new(parent, RecordType::Ns));
            let mut names: Vec<String> = cached
                .into_iter()
                .filter_map(|record| record.data.name().map(str::to_string))
                .collect();
            if !names.is_empty() {
                names.sort();
                return Some(names);
            }
            zone = parent;
        }
        None
    }

    /// Pick a nameserver we already have an address for; failing that,
    /// resolve the address of the first one and use what comes back.
    async fn nameserver_address(&self, nameservers: &[String], depth: usize) -> Option<IpAddr> {
        if let Some(addr) = self.glue_address(nameservers) {
            return Some(addr);
        }

        let target = nameservers.first()?.clone();
        debug!(nameserver = %target, "no glue cached, resolving nameserver address");
        let records = self
            .resolve_at(RecordKey::new(target, RecordType::A), depth + 1)
            .await;
        records.into_iter().find_map(|record| record.data.address())
    }

    /// Address of the first nameserver with a cached A record.
    fn glue_address(&self, nameservers: &[String]) -> Option<IpAddr> {
        nameservers.iter().find_map(|ns| {
            self.cache
                .lookup(&RecordKey::new(ns.clone(), RecordType::A))
                .into_iter()
                .find_map(|record| record.data.address())
        })
    }

    /// Send one query for `node` to `server` and fold every record of the
    /// reply into the cache. Returns the number of NS records the reply
    /// carried; transport and parse failures count as zero so the caller
    /// stops this branch instead of looping.
    async fn query_server(&self, node: &RecordKey, server: IpAddr) -> usize {
        let query = match message::encode_query(node) {
            Ok(query) => query,
            Err(err) => {
                warn!(host = %node.host, %err, "cannot encode query");
                return 0;
            }
        };

        counter!("burrow_queries_total").increment(1);
        debug!(id = query.id, host = %node.host, rtype = %node.rtype, %server, "query");

        let response = match self.transport.exchange(server, &query.bytes).await {
            Ok(response) => response,
            Err(err) => {
                counter!("burrow_query_failures_total").increment(1);
                debug!(%server, %err, "no usable reply");
                return 0;
            }
        };

        let decoded = match message::decode_response(&response) {
            Ok(decoded) if decoded.id == query.id => decoded,
            Ok(decoded) => {
                counter!("burrow_query_failures_total").increment(1);
                warn!(got = decoded.id, want = query.id, "response id mismatch, discarding");
                return 0;
            }
            Err(err) => {
                counter!("burrow_query_failures_total").increment(1);
                warn!(%server, %err, "malformed response");
                return 0;
            }
        };

        debug!(
            id = decoded.id,
            authoritative = decoded.authoritative,
            records = decoded.records.len(),
            "response"
        );

        let mut referrals = 0;
        for (section, record) in decoded.records {
            debug!(
                section = %section,
                host = %record.host,
                ttl = record.ttl,
                rtype = %record.rtype,
                data = %record.data,
                "record"
            );
            if record.rtype == RecordType::Ns {
                referrals += 1;
            }
            self.cache.insert(record);
        }
        referrals
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::record::RecordData;
    use crate::transport::tests::MockTransport;

    const ROOT: IpAddr = IpAddr::V4(Ipv4Addr::new(198, 41, 0, 4));

    fn resolver(transport: MockTransport) -> Resolver<MockTransport> {
        Resolver::new(transport, RecordCache::new(), ROOT)
    }

    fn a_record(host: &str, addr: [u8; 4]) -> ResourceRecord {
        ResourceRecord::new(
            host,
            RecordType::A,
            300,
            RecordData::Address(IpAddr::V4(Ipv4Addr::from(addr))),
        )
    }

    fn cname_record(host: &str, target: &str) -> ResourceRecord {
        ResourceRecord::new(
            host,
            RecordType::Cname,
            300,
            RecordData::Name(target.to_string()),
        )
    }

    fn ns_record(zone: &str, ns: &str) -> ResourceRecord {
        ResourceRecord::new(zone, RecordType::Ns, 300, RecordData::Name(ns.to_string()))
    }

    fn encode_name(name: &str) -> Vec<u8> {
        let mut bytes = Vec::new();
        for label in name.split('.') {
            bytes.push(label.len() as u8);
            bytes.extend_from_slice(label.as_bytes());
        }
        bytes.push(0);
        bytes
    }

    fn record_bytes(host: &str, type_code: u16, ttl: u32, rdata: &[u8]) -> Vec<u8> {
        let mut bytes = encode_name(host);
        bytes.extend_from_slice(&type_code.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&ttl.to_be_bytes());
        bytes.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        bytes.extend_from_slice(rdata);
        bytes
    }

    /// Response echoing a question for `(qname, A)` with the given sections.
    fn response_bytes(qname: &str, sections: [&[Vec<u8>]; 3]) -> Vec<u8> {
        let mut bytes = vec![0, 0, 0x84, 0x00, 0, 1];
        for section in &sections {
            bytes.extend_from_slice(&(section.len() as u16).to_be_bytes());
        }
        bytes.extend_from_slice(&encode_name(qname));
        bytes.extend_from_slice(&[0, 1, 0, 1]);
        for section in sections {
            for record in section {
                bytes.extend_from_slice(record);
            }
        }
        bytes
    }

    #[tokio::test]
    async fn exact_cache_hit_short_circuits() {
        let transport = MockTransport::new();
        let engine = resolver(transport.clone());
        let record = a_record("example.com", [1, 2, 3, 4]);
        engine.cache().insert(record.clone());

        let results = engine
            .resolve(RecordKey::new("example.com", RecordType::A))
            .await;

        assert_eq!(results, HashSet::from([record]));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn cached_alias_is_transparent() {
        let transport = MockTransport::new();
        let engine = resolver(transport.clone());
        engine
            .cache()
            .insert(cname_record("a.example.com", "b.example.com"));
        let target = a_record("b.example.com", [1, 2, 3, 4]);
        engine.cache().insert(target.clone());

        let results = engine
            .resolve(RecordKey::new("a.example.com", RecordType::A))
            .await;

        assert_eq!(results, HashSet::from([target]));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn cached_delegation_with_glue_queries_that_server_once() {
        let transport = MockTransport::new();
        let engine = resolver(transport.clone());
        engine
            .cache()
            .insert(ns_record("example.com", "ns1.example.com"));
        engine.cache().insert(a_record("ns1.example.com", [5, 6, 7, 8]));

        let nameserver = IpAddr::V4(Ipv4Addr::new(5, 6, 7, 8));
        let answer = record_bytes("www.example.com", 1, 300, &[1, 1, 1, 1]);
        transport.script(nameserver, response_bytes("www.example.com", [&[answer], &[], &[]]));

        let results = engine
            .resolve(RecordKey::new("www.example.com", RecordType::A))
            .await;

        let addrs: HashSet<_> = results.iter().filter_map(|r| r.data.address()).collect();
        assert_eq!(addrs, HashSet::from([IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1))]));
        assert_eq!(transport.calls(), vec![nameserver]);
    }

    #[tokio::test]
    async fn unreachable_root_terminates_with_empty_result() {
        // nothing scripted: every exchange times out
        let transport = MockTransport::new();
        let engine = resolver(transport.clone());

        let results = engine
            .resolve(RecordKey::new("www.example.com", RecordType::A))
            .await;

        assert!(results.is_empty());
        assert_eq!(transport.calls(), vec![ROOT]);
    }

    #[tokio::test]
    async fn empty_reply_ends_the_branch() {
        let transport = MockTransport::new();
        transport.script(ROOT, response_bytes("nowhere.test", [&[], &[], &[]]));
        let engine = resolver(transport.clone());

        let results = engine
            .resolve(RecordKey::new("nowhere.test", RecordType::A))
            .await;

        assert!(results.is_empty());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn direct_answer_from_root_is_returned() {
        let transport = MockTransport::new();
        let answer = record_bytes("host.test", 1, 120, &[9, 9, 9, 9]);
        transport.script(ROOT, response_bytes("host.test", [&[answer], &[], &[]]));
        let engine = resolver(transport.clone());

        let results = engine
            .resolve(RecordKey::new("host.test", RecordType::A))
            .await;

        assert_eq!(results.len(), 1);
        let record = results.iter().next().unwrap();
        assert_eq!(record.host, "host.test");
        assert_eq!(record.ttl, 120);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn alias_loop_hits_the_indirection_bound() {
        let transport = MockTransport::new();
        let engine = resolver(transport.clone());
        engine.cache().insert(cname_record("a.test", "b.test"));
        engine.cache().insert(cname_record("b.test", "a.test"));

        let results = engine.resolve(RecordKey::new("a.test", RecordType::A)).await;

        assert!(results.is_empty());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn self_referral_does_not_loop() {
        // the root refers us to a nameserver whose glue is the root itself
        let transport = MockTransport::new();
        let referral = record_bytes("com", 2, 300, &encode_name("ns.com"));
        let glue = record_bytes("ns.com", 1, 300, &[198, 41, 0, 4]);
        transport.script(ROOT, response_bytes("www.com", [&[], &[referral], &[glue]]));
        let engine = resolver(transport.clone());

        let results = engine.resolve(RecordKey::new("www.com", RecordType::A)).await;

        assert!(results.is_empty());
        assert_eq!(transport.calls(), vec![ROOT]);
    }

    #[tokio::test]
    async fn malformed_reply_degrades_to_empty() {
        let transport = MockTransport::new();
        transport.script(ROOT, vec![0, 0, 0x80]);
        let engine = resolver(transport.clone());

        let results = engine.resolve(RecordKey::new("bad.test", RecordType::A)).await;

        assert!(results.is_empty());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn changing_the_root_redirects_fallback_queries() {
        let transport = MockTransport::new();
        let other_root = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1));
        let answer = record_bytes("host.test", 1, 60, &[4, 4, 4, 4]);
        transport.script(other_root, response_bytes("host.test", [&[answer], &[], &[]]));

        let mut engine = resolver(transport.clone());
        engine.set_root(other_root);
        assert_eq!(engine.root(), other_root);

        let results = engine.resolve(RecordKey::new("host.test", RecordType::A)).await;

        assert_eq!(results.len(), 1);
        assert_eq!(transport.calls(), vec![other_root]);
    }
}
