// src/publisher.rs
//! Poll loop that turns navigation snapshots into NMEA datagrams

use crate::{
    config::{ErrorPolicy, PublisherConfig},
    error::{PublisherError, Result},
    nav::{NavigationSnapshot, NavigationSource},
};
use log::{debug, error, info, warn};
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{net::UdpSocket, sync::Notify, time::sleep};

/// How often a waiting loop re-checks a running flag cleared from outside
const STOP_POLL: Duration = Duration::from_millis(50);

/// Sends each sentence of a snapshot as its own UDP datagram
pub struct TelemetryPublisher {
    socket: UdpSocket,
    destination: SocketAddr,
    config: PublisherConfig,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

impl TelemetryPublisher {
    /// Open a socket on an ephemeral port and resolve the configured destination
    pub async fn bind(config: PublisherConfig) -> Result<Self> {
        config.validate()?;

        let target = config.udp_destination();
        let destination = tokio::net::lookup_host(target.as_str())
            .await
            .map_err(|e| PublisherError::Connection(format!("Failed to resolve {}: {}", target, e)))?
            .next()
            .ok_or_else(|| PublisherError::Connection(format!("No address found for {}", target)))?;

        let local = if destination.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local).await?;

        info!("Publishing NMEA to {} every {:?}", destination, config.interval());

        Ok(Self {
            socket,
            destination,
            config,
            running: Arc::new(AtomicBool::new(true)),
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// Share an externally owned running flag
    pub fn with_running(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Stop the publisher when Ctrl+C arrives, even mid-fetch or mid-sleep
    pub fn stop_on_ctrl_c(&self) {
        let running = Arc::clone(&self.running);
        let shutdown = Arc::clone(&self.shutdown);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Interrupt received, shutting down..."),
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
            running.store(false, Ordering::Relaxed);
            shutdown.notify_waiters();
        });
    }

    /// Resolves once the running flag is cleared
    async fn stopped(&self) {
        while self.is_running() {
            tokio::select! {
                _ = self.shutdown.notified() => {}
                _ = sleep(STOP_POLL) => {}
            }
        }
    }

    /// Encode the configured sentences and send them, one datagram each.
    ///
    /// Returns the number of datagrams sent.
    pub async fn publish(&self, snapshot: &NavigationSnapshot) -> Result<usize> {
        let mut sent = 0;
        for sentence in snapshot.sentences(&self.config.sentences) {
            let payload = format!("{}\r\n", sentence);
            self.socket
                .send_to(payload.as_bytes(), self.destination)
                .await
                .map_err(|e| PublisherError::Connection(format!("Failed to send to {}: {}", self.destination, e)))?;
            debug!("-> {}", sentence);
            sent += 1;
        }
        Ok(sent)
    }

    async fn cycle<S: NavigationSource>(&self, source: &mut S) -> Result<usize> {
        let snapshot = source.fetch().await?;
        self.publish(&snapshot).await
    }

    /// Fetch, publish and sleep until stopped.
    ///
    /// Stopping cancels a pending fetch or sleep; a burst already being sent
    /// may be cut short. Returns the number of cycles that published
    /// successfully. Under [`ErrorPolicy::Abort`] the first failure ends the
    /// loop and is returned.
    pub async fn run<S: NavigationSource>(&self, source: &mut S) -> Result<u64> {
        let mut cycles = 0;

        while self.is_running() {
            let outcome = tokio::select! {
                biased;
                result = self.cycle(source) => Some(result),
                _ = self.stopped() => None,
            };
            let Some(result) = outcome else {
                debug!("Stopped while waiting on the boat service");
                break;
            };

            match result {
                Ok(sent) => {
                    cycles += 1;
                    debug!("Cycle {}: sent {} sentences", cycles, sent);
                }
                Err(e) => match self.config.error_policy {
                    ErrorPolicy::Abort => {
                        error!("Publishing failed: {}", e);
                        self.stop();
                        return Err(e);
                    }
                    ErrorPolicy::Continue => warn!("Publishing cycle failed: {}", e),
                },
            }

            tokio::select! {
                _ = sleep(self.config.interval()) => {}
                _ = self.stopped() => {}
            }
        }

        info!("Publisher stopped after {} cycles", cycles);
        Ok(cycles)
    }

    /// Stop the publisher
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        self.shutdown.notify_waiters();
    }

    /// Check if the publisher is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::{nmea, SentenceKind, SpeedUnit, WindReading};
    use chrono::NaiveTime;
    use std::{collections::VecDeque, future::Future, time::Duration};
    use tokio::time::timeout;

    fn snapshot() -> NavigationSnapshot {
        NavigationSnapshot {
            latitude: 51.5,
            longitude: -0.1,
            heading: 90.0,
            apparent_wind: WindReading::apparent(45.0, 5.0, SpeedUnit::MetersPerSecond),
            absolute_wind: WindReading::absolute(30.0, 4.5, SpeedUnit::MetersPerSecond),
            rudder_angle: -5.0,
            timestamp: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        }
    }

    /// Replays canned fetch results and stops the publisher when they run out
    struct ScriptedSource {
        results: VecDeque<Result<NavigationSnapshot>>,
        running: Arc<AtomicBool>,
    }

    impl NavigationSource for ScriptedSource {
        fn fetch(&mut self) -> impl Future<Output = Result<NavigationSnapshot>> + Send {
            let result = self
                .results
                .pop_front()
                .unwrap_or_else(|| Err(PublisherError::Other("script exhausted".to_string())));
            if self.results.is_empty() {
                self.running.store(false, Ordering::Relaxed);
            }
            std::future::ready(result)
        }
    }

    async fn receiver() -> (UdpSocket, u16) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        (socket, port)
    }

    fn config_for(port: u16) -> PublisherConfig {
        let mut config = PublisherConfig::default();
        config.update_destination("127.0.0.1".to_string(), port);
        config.interval_ms = 1;
        config
    }

    async fn recv_line(socket: &UdpSocket) -> String {
        let mut buf = [0u8; 256];
        let n = timeout(Duration::from_secs(2), socket.recv(&mut buf))
            .await
            .expect("timed out waiting for datagram")
            .unwrap();
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_publish_one_datagram_per_sentence() {
        let (rx, port) = receiver().await;
        let publisher = TelemetryPublisher::bind(config_for(port)).await.unwrap();

        let sent = publisher.publish(&snapshot()).await.unwrap();
        assert_eq!(sent, 6);

        let expected = snapshot().sentences(&SentenceKind::ALL);
        for sentence in expected {
            let datagram = recv_line(&rx).await;
            assert_eq!(datagram, format!("{}\r\n", sentence));

            let frame = datagram.trim_end();
            let (body, suffix) = frame[1..].rsplit_once('*').unwrap();
            assert_eq!(nmea::checksum(body), suffix);
        }
    }

    #[tokio::test]
    async fn test_publish_respects_sentence_selection() {
        let (rx, port) = receiver().await;
        let mut config = config_for(port);
        config.sentences = vec![SentenceKind::MwvApparent];
        let publisher = TelemetryPublisher::bind(config).await.unwrap();

        assert_eq!(publisher.publish(&snapshot()).await.unwrap(), 1);
        assert!(recv_line(&rx).await.starts_with("$MWV,45,R,"));
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_config() {
        let mut config = PublisherConfig::default();
        config.interval_ms = 0;
        let result = TelemetryPublisher::bind(config).await;
        assert!(matches!(result, Err(PublisherError::Config(_))));
    }

    #[tokio::test]
    async fn test_run_until_stopped() {
        let (rx, port) = receiver().await;
        let publisher = TelemetryPublisher::bind(config_for(port)).await.unwrap();
        let mut source = ScriptedSource {
            results: vec![Ok(snapshot()), Ok(snapshot()), Ok(snapshot())].into(),
            running: publisher.running_flag(),
        };

        let cycles = publisher.run(&mut source).await.unwrap();
        assert_eq!(cycles, 3);
        assert!(!publisher.is_running());

        for _ in 0..18 {
            assert!(recv_line(&rx).await.ends_with("\r\n"));
        }
    }

    #[tokio::test]
    async fn test_run_aborts_on_error() {
        let (_rx, port) = receiver().await;
        let publisher = TelemetryPublisher::bind(config_for(port)).await.unwrap();
        let mut source = ScriptedSource {
            results: vec![
                Ok(snapshot()),
                Err(PublisherError::Connection("boat service gone".to_string())),
                Ok(snapshot()),
            ]
            .into(),
            running: publisher.running_flag(),
        };

        let result = publisher.run(&mut source).await;
        assert!(matches!(result, Err(PublisherError::Connection(_))));
        assert!(!publisher.is_running());
        assert_eq!(source.results.len(), 1);
    }

    #[tokio::test]
    async fn test_run_continues_on_error() {
        let (_rx, port) = receiver().await;
        let mut config = config_for(port);
        config.error_policy = ErrorPolicy::Continue;
        let publisher = TelemetryPublisher::bind(config).await.unwrap();
        let mut source = ScriptedSource {
            results: vec![
                Err(PublisherError::Parse("bad line".to_string())),
                Ok(snapshot()),
                Err(PublisherError::Parse("bad line".to_string())),
                Ok(snapshot()),
            ]
            .into(),
            running: publisher.running_flag(),
        };

        let cycles = publisher.run(&mut source).await.unwrap();
        assert_eq!(cycles, 2);
    }

    #[tokio::test]
    async fn test_shared_running_flag() {
        let (_rx, port) = receiver().await;
        let running = Arc::new(AtomicBool::new(false));
        let publisher = TelemetryPublisher::bind(config_for(port))
            .await
            .unwrap()
            .with_running(Arc::clone(&running));
        let mut source = ScriptedSource {
            results: vec![Ok(snapshot())].into(),
            running: Arc::clone(&running),
        };

        // Already stopped: nothing is fetched
        assert_eq!(publisher.run(&mut source).await.unwrap(), 0);
        assert_eq!(source.results.len(), 1);
        assert_eq!(publisher.destination().port(), port);
        assert!(publisher.local_addr().unwrap().port() != 0);
    }

    /// A boat service that never answers
    struct SilentSource;

    impl NavigationSource for SilentSource {
        fn fetch(&mut self) -> impl Future<Output = Result<NavigationSnapshot>> + Send {
            std::future::pending()
        }
    }

    /// Always has a fresh snapshot
    struct SteadySource;

    impl NavigationSource for SteadySource {
        fn fetch(&mut self) -> impl Future<Output = Result<NavigationSnapshot>> + Send {
            std::future::ready(Ok(snapshot()))
        }
    }

    #[tokio::test]
    async fn test_cleared_flag_ends_hanging_fetch() {
        let (_rx, port) = receiver().await;
        let publisher = TelemetryPublisher::bind(config_for(port)).await.unwrap();
        let running = publisher.running_flag();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            running.store(false, Ordering::Relaxed);
        });

        let result = timeout(Duration::from_secs(2), publisher.run(&mut SilentSource))
            .await
            .expect("run kept waiting on the boat service after stop");
        assert_eq!(result.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stop_interrupts_long_interval() {
        let (_rx, port) = receiver().await;
        let mut config = config_for(port);
        config.interval_ms = 60_000;
        let publisher = TelemetryPublisher::bind(config).await.unwrap();

        let stopper = async {
            sleep(Duration::from_millis(100)).await;
            publisher.stop();
        };
        let mut source = SteadySource;
        let (result, ()) = tokio::join!(
            timeout(Duration::from_secs(2), publisher.run(&mut source)),
            stopper
        );

        let cycles = result.expect("run kept sleeping after stop").unwrap();
        assert_eq!(cycles, 1);
        assert!(!publisher.is_running());
    }
}
