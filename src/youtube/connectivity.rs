// Online/offline check
// One TCP connect to a well-known host with a short timeout. Without a
// network every track would fail to resolve, so the app checks this once
// up front and tells the user instead.

use std::time::Duration;
use tokio::net::TcpStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(self) -> bool {
        self == Connectivity::Online
    }
}

// `host` is a host:port such as "8.8.8.8:53"
pub async fn check(host: &str, timeout: Duration) -> Connectivity {
    match tokio::time::timeout(timeout, TcpStream::connect(host)).await {
        Ok(Ok(_)) => Connectivity::Online,
        Ok(Err(e)) => {
            tracing::warn!(host, error = %e, "connectivity check failed");
            Connectivity::Offline
        }
        Err(_) => {
            tracing::warn!(host, ?timeout, "connectivity check timed out");
            Connectivity::Offline
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn reachable_host_is_online() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        assert_eq!(check(&addr, WAIT).await, Connectivity::Online);
    }

    #[tokio::test]
    async fn refused_connection_is_offline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert_eq!(check(&addr, WAIT).await, Connectivity::Offline);
    }

    #[tokio::test]
    async fn unparseable_host_is_offline() {
        assert!(!check("not a host", WAIT).await.is_online());
    }
}
