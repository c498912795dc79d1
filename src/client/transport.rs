//! Host resolution and the TCP line transport
//!
//! Resolved addresses are cached per hostname for a fixed time to live so
//! that a burst of lookups against one server resolves it once.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::common::{Error, Result};
use crate::protocol::codec;

/// Name resolution backend
#[async_trait]
pub trait HostLookup: Send + Sync {
    /// Every address `host` resolves to, in resolver order
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolves through the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLookup;

#[async_trait]
impl HostLookup for SystemLookup {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedAddress {
    address: IpAddr,
    resolved_at: Instant,
}

/// Hostname resolver with a per-host cache
pub struct Resolver<L = SystemLookup> {
    lookup: L,
    ttl: Duration,
    prefer_ipv6: bool,
    cache: HashMap<String, CachedAddress>,
}

impl<L: HostLookup> Resolver<L> {
    pub fn new(lookup: L, ttl: Duration, prefer_ipv6: bool) -> Self {
        Self {
            lookup,
            ttl,
            prefer_ipv6,
            cache: HashMap::new(),
        }
    }

    /// Resolve `host`, reusing a cached answer younger than the TTL
    ///
    /// Without the IPv6 preference only IPv4 addresses are accepted.
    /// With it, the first address of either family wins.
    pub async fn resolve(&mut self, host: &str) -> Result<IpAddr> {
        let now = Instant::now();

        if let Some(cached) = self.cache.get(host) {
            if now.duration_since(cached.resolved_at) < self.ttl {
                tracing::debug!(host, address = %cached.address, "Using cached address");
                return Ok(cached.address);
            }
            tracing::debug!(host, "Cached address expired");
        }

        let addresses = self
            .lookup
            .lookup(host)
            .await
            .map_err(|e| Error::lookup(host, e.to_string()))?;

        let address = self
            .select(&addresses)
            .ok_or_else(|| Error::lookup(host, "no suitable address found"))?;

        tracing::debug!(host, %address, "Resolved host");
        self.cache.insert(
            host.to_string(),
            CachedAddress {
                address,
                resolved_at: now,
            },
        );

        Ok(address)
    }

    fn select(&self, addresses: &[IpAddr]) -> Option<IpAddr> {
        if self.prefer_ipv6 {
            addresses.first().copied()
        } else {
            addresses.iter().copied().find(IpAddr::is_ipv4)
        }
    }
}

/// A connected DICT socket
pub struct Transport {
    /// Buffered reader for server replies
    reader: BufReader<OwnedReadHalf>,
    /// Buffered writer for commands
    writer: BufWriter<OwnedWriteHalf>,
    /// `host:port` label for error messages
    server: String,
}

impl Transport {
    /// Open a TCP connection to `addr`, giving up at `deadline`
    pub async fn connect(addr: SocketAddr, server: &str, deadline: Instant) -> Result<Self> {
        tracing::debug!(%addr, server, "Connecting");

        let stream = match tokio::time::timeout_at(deadline, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(Error::socket(
                    server,
                    format!("Unable to connect to the dictionary server: {}", e),
                ))
            }
            Err(_) => return Err(Error::ConnectionTimeout(server.to_string())),
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
        }

        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            server: server.to_string(),
        })
    }

    /// Send one command line
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        codec::write_line(&mut self.writer, line)
            .await
            .map_err(|e| match e {
                Error::Io(io) => Error::socket(
                    &self.server,
                    format!("Error while writing to the dictionary server: {}", io),
                ),
                other => other,
            })
    }

    /// Read the next reply line; `None` once the server closed the connection
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        codec::read_line(&mut self.reader)
            .await
            .map_err(|e| match e {
                Error::Io(io) => Error::socket(
                    &self.server,
                    format!("Error while reading reply from server: {}", io),
                ),
                other => other,
            })
    }

    /// Close the write side of the socket
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const V4: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7));
    const V6: IpAddr = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 7));

    /// Fixed answers, counting how often it is asked
    struct FakeLookup {
        answers: Vec<IpAddr>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HostLookup for FakeLookup {
        async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if host == "nowhere.invalid" {
                return Err(io::Error::new(io::ErrorKind::NotFound, "host not found"));
            }
            Ok(self.answers.clone())
        }
    }

    fn fake_resolver(answers: Vec<IpAddr>, prefer_ipv6: bool) -> (Resolver<FakeLookup>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let lookup = FakeLookup {
            answers,
            calls: calls.clone(),
        };
        (Resolver::new(lookup, Duration::from_secs(300), prefer_ipv6), calls)
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_within_ttl() {
        let (mut resolver, calls) = fake_resolver(vec![V4], false);

        assert_eq!(resolver.resolve("dict.example.org").await.unwrap(), V4);
        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(resolver.resolve("dict.example.org").await.unwrap(), V4);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_resolved_again() {
        let (mut resolver, calls) = fake_resolver(vec![V4], false);

        resolver.resolve("dict.example.org").await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        resolver.resolve("dict.example.org").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_is_per_host() {
        let (mut resolver, calls) = fake_resolver(vec![V4], false);

        resolver.resolve("a.example.org").await.unwrap();
        resolver.resolve("b.example.org").await.unwrap();
        resolver.resolve("a.example.org").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ipv4_only_skips_ipv6() {
        let (mut resolver, _) = fake_resolver(vec![V6, V4], false);
        assert_eq!(resolver.resolve("dict.example.org").await.unwrap(), V4);

        let (mut resolver, _) = fake_resolver(vec![V6], false);
        let err = resolver.resolve("dict.example.org").await.unwrap_err();
        assert!(matches!(err, Error::Lookup { ref host, .. } if host == "dict.example.org"));
    }

    #[tokio::test]
    async fn test_prefer_ipv6_takes_first_address() {
        let (mut resolver, _) = fake_resolver(vec![V6, V4], true);
        assert_eq!(resolver.resolve("dict.example.org").await.unwrap(), V6);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_cached() {
        let (mut resolver, calls) = fake_resolver(vec![V4], false);

        let err = resolver.resolve("nowhere.invalid").await.unwrap_err();
        assert!(err.to_string().contains("nowhere.invalid"));
        resolver.resolve("nowhere.invalid").await.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transport_line_exchange() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            write_half.write_all(b"220 ready\r\n").await.unwrap();
            codec::read_line(&mut reader).await.unwrap()
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut transport = Transport::connect(addr, "test:2628", deadline).await.unwrap();
        assert_eq!(transport.read_line().await.unwrap().as_deref(), Some("220 ready"));
        transport.send_line("QUIT").await.unwrap();

        assert_eq!(server.await.unwrap().as_deref(), Some("QUIT"));
        assert_eq!(transport.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_connect_refused_is_socket_error() {
        // Bind and drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let deadline = Instant::now() + Duration::from_secs(5);
        let err = Transport::connect(addr, "test:2628", deadline).await.err().unwrap();
        assert!(matches!(err, Error::Socket { .. }));
    }
}
