//! Dispatcher port: invoking device actions over the network.

use std::future::Future;
use std::sync::Arc;

use smarthome_domain::dispatch::DispatchOutcome;
use smarthome_domain::error::SensorReadError;

/// Calls `<address><path>` on a device.
///
/// Implementations never fail: transport errors, timeouts and non-success
/// statuses all come back as an outcome with `ok = false`.
pub trait Dispatcher: Send + Sync {
    fn invoke(&self, address: &str, path: &str) -> impl Future<Output = DispatchOutcome> + Send;

    /// Invoke a sensor and parse its body as a number.
    fn read_sensor(
        &self,
        address: &str,
        path: &str,
    ) -> impl Future<Output = Result<f64, SensorReadError>> + Send {
        async move { self.invoke(address, path).await.reading() }
    }
}

impl<T: Dispatcher> Dispatcher for Arc<T> {
    fn invoke(&self, address: &str, path: &str) -> impl Future<Output = DispatchOutcome> + Send {
        (**self).invoke(address, path)
    }
}
