//! GENA subscription lifecycle
//!
//! Subscriptions are registered with the NOTIFY server's router and renewed
//! by a background thread at half of the timeout the device granted. A failed
//! renewal falls back to a fresh SUBSCRIBE under a new SID.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{ControlError, Result};
use crate::notify::{EventHandler, NotifyServer};
use crate::service::Service;
use crate::soap::SoapClient;

const RENEWAL_CHECK_INTERVAL: Duration = Duration::from_millis(500);

struct ActiveSubscription {
    ip: String,
    service: Service,
    timeout_seconds: u32,
    renew_at: Instant,
    handler: EventHandler,
}

type SubscriptionTable = Arc<Mutex<HashMap<String, ActiveSubscription>>>;

/// Owns the NOTIFY server, every live subscription and the renewal thread
pub struct SubscriptionManager {
    soap: SoapClient,
    server: NotifyServer,
    timeout_seconds: u32,
    subscriptions: SubscriptionTable,
    stop: Arc<AtomicBool>,
    renewal_thread: Option<JoinHandle<()>>,
}

impl SubscriptionManager {
    pub fn new(soap: SoapClient, server: NotifyServer, timeout_seconds: u32) -> Result<Self> {
        let subscriptions: SubscriptionTable = Arc::new(Mutex::new(HashMap::new()));
        let stop = Arc::new(AtomicBool::new(false));

        let worker = RenewalWorker {
            soap: soap.clone(),
            router: Arc::clone(server.router()),
            callback_url: server.base_url().to_string(),
            subscriptions: Arc::clone(&subscriptions),
            stop: Arc::clone(&stop),
        };
        let renewal_thread = std::thread::Builder::new()
            .name("subscription-renewal".to_string())
            .spawn(move || worker.run())
            .map_err(|e| ControlError::Subscription(format!("Failed to start renewal thread: {}", e)))?;

        Ok(Self {
            soap,
            server,
            timeout_seconds,
            subscriptions,
            stop,
            renewal_thread: Some(renewal_thread),
        })
    }

    /// Subscribe to `service` on the device at `ip`, returning the SID
    pub fn subscribe(&self, ip: &str, service: Service, handler: EventHandler) -> Result<String> {
        let response = self
            .soap
            .subscribe(ip, service, self.server.base_url(), self.timeout_seconds)?;

        tracing::debug!(
            ip,
            %service,
            sid = %response.sid,
            timeout = response.timeout_seconds,
            "subscribed"
        );

        self.server
            .router()
            .register(response.sid.clone(), Arc::clone(&handler));

        self.subscriptions.lock().insert(
            response.sid.clone(),
            ActiveSubscription {
                ip: ip.to_string(),
                service,
                timeout_seconds: response.timeout_seconds,
                renew_at: renewal_deadline(Instant::now(), response.timeout_seconds),
                handler,
            },
        );

        Ok(response.sid)
    }

    pub fn callback_url(&self) -> &str {
        self.server.base_url()
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.renewal_thread.take() {
            let _ = thread.join();
        }
    }
}

struct RenewalWorker {
    soap: SoapClient,
    router: Arc<crate::notify::EventRouter>,
    callback_url: String,
    subscriptions: SubscriptionTable,
    stop: Arc<AtomicBool>,
}

impl RenewalWorker {
    fn run(self) {
        while !self.stop.load(Ordering::SeqCst) {
            std::thread::sleep(RENEWAL_CHECK_INTERVAL);
            self.renew_due(Instant::now());
        }
    }

    fn renew_due(&self, now: Instant) {
        let due: Vec<(String, String, Service, u32)> = self
            .subscriptions
            .lock()
            .iter()
            .filter(|(_, s)| now >= s.renew_at)
            .map(|(sid, s)| (sid.clone(), s.ip.clone(), s.service, s.timeout_seconds))
            .collect();

        for (sid, ip, service, timeout) in due {
            match self.soap.renew(&ip, service, &sid, timeout) {
                Ok(granted) => {
                    tracing::trace!(sid = %sid, granted, "subscription renewed");
                    if let Some(s) = self.subscriptions.lock().get_mut(&sid) {
                        s.timeout_seconds = granted;
                        s.renew_at = renewal_deadline(Instant::now(), granted);
                    }
                }
                Err(e) => {
                    tracing::warn!(ip = %ip, %service, error = %e, "renewal failed, resubscribing");
                    self.resubscribe(&sid, &ip, service, timeout);
                }
            }
        }
    }

    fn resubscribe(&self, old_sid: &str, ip: &str, service: Service, timeout: u32) {
        let Some(old) = self.subscriptions.lock().remove(old_sid) else {
            return;
        };
        self.router.unregister(old_sid);

        match self.soap.subscribe(ip, service, &self.callback_url, timeout) {
            Ok(response) => {
                self.router
                    .register(response.sid.clone(), Arc::clone(&old.handler));
                self.subscriptions.lock().insert(
                    response.sid,
                    ActiveSubscription {
                        timeout_seconds: response.timeout_seconds,
                        renew_at: renewal_deadline(Instant::now(), response.timeout_seconds),
                        ..old
                    },
                );
            }
            Err(e) => {
                // keep the record so the next pass tries again
                tracing::warn!(ip, %service, error = %e, "resubscribe failed");
                self.subscriptions.lock().insert(
                    old_sid.to_string(),
                    ActiveSubscription {
                        renew_at: Instant::now() + Duration::from_secs(30),
                        ..old
                    },
                );
            }
        }
    }
}

/// Renew at half of the granted timeout, never sooner than one second
fn renewal_deadline(now: Instant, timeout_seconds: u32) -> Instant {
    now + Duration::from_secs(u64::from((timeout_seconds / 2).max(1)))
}
