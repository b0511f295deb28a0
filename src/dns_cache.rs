use hyper::client::connect::dns::Name;
use hyper::service::Service;
use lru::LruCache;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

type CacheMap = LruCache<String, CachedAddrs, hashbrown::hash_map::DefaultHashBuilder>;

/// 캐시할 수 있는 최대 host 수
const CACHE_CAPACITY: usize = 256;

struct CachedAddrs {
    resolved_at: Instant,
    addrs: Vec<SocketAddr>,
}

/// ttl 동안 DNS 조회 결과를 재사용하는 resolver.
/// <br>
/// hyper의 HttpConnector에 넣어 사용. ttl이 0이면 캐시하지 않음
#[derive(Clone)]
pub struct CachingResolver {
    ttl: Duration,
    cache: Arc<Mutex<CacheMap>>,
}

impl CachingResolver {
    pub fn new(ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            cache: Arc::new(Mutex::new(LruCache::with_hasher(
                capacity,
                hashbrown::hash_map::DefaultHashBuilder::default(),
            ))),
        }
    }

    pub async fn resolve(&self, host: &str) -> io::Result<Vec<SocketAddr>> {
        if self.ttl.is_zero() {
            return lookup(host).await;
        }

        {
            let mut cache_lock = self.cache.lock().await;
            if let Some(cached) = cache_lock.get(host) {
                if cached.resolved_at.elapsed() < self.ttl {
                    return Ok(cached.addrs.clone());
                }
            }
        }

        // 캐시에 없거나 만료된 경우 다시 조회
        let addrs = lookup(host).await?;

        let mut cache_lock = self.cache.lock().await;
        cache_lock.put(
            host.to_string(),
            CachedAddrs {
                resolved_at: Instant::now(),
                addrs: addrs.clone(),
            },
        );

        Ok(addrs)
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}

async fn lookup(host: &str) -> io::Result<Vec<SocketAddr>> {
    // port는 HttpConnector가 URI의 port로 덮어씀
    Ok(tokio::net::lookup_host((host, 0)).await?.collect())
}

impl Service<Name> for CachingResolver {
    type Response = std::vec::IntoIter<SocketAddr>;
    type Error = io::Error;
    type Future = Pin<Box<dyn Future<Output = io::Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, name: Name) -> Self::Future {
        let resolver = self.clone();
        Box::pin(async move {
            let addrs = resolver.resolve(name.as_str()).await?;
            Ok(addrs.into_iter())
        })
    }
}

#[tokio::test]
async fn resolver_cache_test() {
    let resolver = CachingResolver::new(Duration::from_secs(3600));
    let first = resolver.resolve("localhost").await.unwrap();
    assert!(!first.is_empty());
    assert_eq!(resolver.cached_len().await, 1);

    let second = resolver.resolve("localhost").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(resolver.cached_len().await, 1);
}

#[tokio::test]
async fn resolver_zero_ttl_test() {
    let resolver = CachingResolver::new(Duration::ZERO);
    resolver.resolve("localhost").await.unwrap();
    assert_eq!(resolver.cached_len().await, 0);
}
