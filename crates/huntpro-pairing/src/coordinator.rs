// SPDX-FileCopyrightText: 2026 Hunt Pro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drives one pairing attempt against the adapter registry.
//!
//! An attempt moves `Resolving -> Attempting -> {Paired, Failed, TimedOut}`.
//! The adapter runs on the blocking pool so that a panic stays inside it and
//! the caller is never held past the request deadline, whether or not the
//! adapter observes cancellation or blocks its thread. A result that lands
//! after the deadline is still a timeout. At most one attempt per device type
//! is in flight; a concurrent request for a busy type fails with `DeviceBusy`
//! immediately.

use std::any::Any;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use huntpro_core::{DeviceType, PairedDevice, PairingError, PairingRequest};
use huntpro_plugin::AdapterRegistry;
use tokio::runtime::Handle;
use tokio::task::JoinError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

type InFlight = Arc<Mutex<HashSet<DeviceType>>>;

/// Marks a device type busy until dropped.
struct InFlightGuard {
    in_flight: InFlight,
    device_type: DeviceType,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.device_type);
    }
}

/// Executes pairing attempts. Retains nothing about completed attempts.
#[derive(Clone)]
pub struct PairingCoordinator {
    registry: Arc<AdapterRegistry>,
    in_flight: InFlight,
}

impl PairingCoordinator {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    /// True while an attempt for `device_type` is running.
    pub fn is_busy(&self, device_type: DeviceType) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&device_type)
    }

    fn acquire(&self, device_type: DeviceType) -> Result<InFlightGuard, PairingError> {
        let mut busy = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !busy.insert(device_type) {
            return Err(PairingError::DeviceBusy { device_type });
        }
        Ok(InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            device_type,
        })
    }

    /// Run one pairing attempt under `request.timeout`. No retries.
    pub async fn pair(&self, request: PairingRequest) -> Result<PairedDevice, PairingError> {
        let device_type = request.device_type;

        let Some(handle) = self.registry.resolve(device_type) else {
            debug!(device_type = %device_type, "no adapter registered");
            return Err(PairingError::UnsupportedDeviceType { device_type });
        };

        let guard = self.acquire(device_type)?;
        let adapter = Arc::clone(handle.adapter());
        let adapter_name = handle.name().to_string();
        let timeout = request.timeout;
        let cancel = request.cancel.clone();

        debug!(
            device_type = %device_type,
            adapter = adapter_name.as_str(),
            timeout_ms = timeout.as_millis() as u64,
            "pairing attempt started"
        );

        let deadline = Instant::now() + timeout;
        let stop = CancellationToken::new();
        // Dropping the caller's future stops the attempt.
        let _stop_on_drop = stop.clone().drop_guard();

        // The adapter runs on the blocking pool so that one blocking its
        // thread cannot starve the deadline timer. The guard lives there too:
        // the type stays busy until the adapter future is actually gone.
        let runtime = Handle::current();
        let task = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            runtime.block_on(async move {
                tokio::select! {
                    result = adapter.pair(request) => Some(result),
                    () = stop.cancelled() => None,
                }
            })
        });

        let outcome = match tokio::time::timeout_at(deadline, task).await {
            Ok(_) if Instant::now() > deadline => None,
            Ok(joined) => Some(joined),
            Err(_elapsed) => None,
        };

        match outcome {
            Some(Ok(Some(Ok(device)))) if device.device_type != device_type => {
                warn!(
                    device_type = %device_type,
                    adapter = adapter_name.as_str(),
                    returned = %device.device_type,
                    "adapter returned a device of the wrong type"
                );
                Err(PairingError::rejected(
                    adapter_name,
                    format!("adapter returned a {} device", device.device_type),
                ))
            }
            Some(Ok(Some(Ok(device)))) => {
                debug!(
                    device_type = %device_type,
                    device_id = device.device_id.as_str(),
                    "pairing attempt succeeded"
                );
                Ok(device)
            }
            Some(Ok(Some(Err(err)))) => {
                warn!(
                    device_type = %device_type,
                    adapter = adapter_name.as_str(),
                    error = %err,
                    "pairing attempt failed"
                );
                Err(err)
            }
            Some(Err(join_err)) => {
                let reason = join_failure(join_err);
                warn!(
                    device_type = %device_type,
                    adapter = adapter_name.as_str(),
                    reason = reason.as_str(),
                    "adapter faulted during pairing"
                );
                Err(PairingError::rejected(adapter_name, reason))
            }
            // Deadline passed, or the result arrived after it.
            None | Some(Ok(None)) => {
                cancel.cancel();
                warn!(
                    device_type = %device_type,
                    adapter = adapter_name.as_str(),
                    timeout_ms = timeout.as_millis() as u64,
                    "pairing attempt timed out"
                );
                Err(PairingError::timed_out(device_type, timeout))
            }
        }
    }
}

fn join_failure(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        format!("adapter panicked: {}", panic_text(payload.as_ref()))
    } else {
        "pairing task was cancelled".to_string()
    }
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
