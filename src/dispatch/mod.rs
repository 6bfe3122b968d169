//! Hand-off from the gesture queue to the action dispatcher
//!
//! The trackpad channel only enqueues `GestureEvent`s. A tokio task drains the
//! queue and passes each event to a `GestureHandler`, which is where bindings
//! are matched and actions run.

pub mod bindings;

pub use bindings::{ActionRunner, BindingHandler, BindingScope, GestureBinding, LogRunner};

use crate::processing::gesture::GestureEvent;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Receives classified gestures. Must not block; offload slow actions.
pub trait GestureHandler: Send + Sync {
    fn handle(&self, event: &GestureEvent);
}

/// Logs every gesture and prints it as a JSON line on stdout
#[derive(Debug, Default)]
pub struct LogHandler;

impl GestureHandler for LogHandler {
    fn handle(&self, event: &GestureEvent) {
        tracing::info!(
            gesture = %event.gesture,
            source = %event.source,
            "Gesture dispatched"
        );
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!("Failed to serialize gesture event: {}", e),
        }
    }
}

/// Drain `rx` until every sender is dropped. Resolves to the number of events handled.
pub fn spawn_dispatcher(
    mut rx: UnboundedReceiver<GestureEvent>,
    handler: Arc<dyn GestureHandler>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut handled = 0usize;
        while let Some(event) = rx.recv().await {
            handler.handle(&event);
            handled += 1;
        }
        tracing::debug!("Gesture dispatcher finished after {} event(s)", handled);
        handled
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::gesture::{Gesture, GestureSource, TapDetection};
    use parking_lot::Mutex as ParkingMutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct Collecting(ParkingMutex<Vec<Gesture>>);

    impl GestureHandler for Collecting {
        fn handle(&self, event: &GestureEvent) {
            self.0.lock().push(event.gesture);
        }
    }

    #[tokio::test]
    async fn test_dispatcher_drains_until_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler = Arc::new(Collecting::default());
        let task = spawn_dispatcher(rx, handler.clone());

        for gesture in [Gesture::TapTwo, Gesture::TapThree] {
            tx.send(GestureEvent::from(TapDetection {
                gesture,
                source: GestureSource::Episode,
            }))
            .unwrap();
        }
        drop(tx);

        assert_eq!(task.await.unwrap(), 2);
        assert_eq!(*handler.0.lock(), vec![Gesture::TapTwo, Gesture::TapThree]);
    }
}
