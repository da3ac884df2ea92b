//! Handlers backed by a shared integer, for counter and toggle scenarios.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::anyhow;
use rewind_hub::{Delivery, HandlerResult};

/// Shared integer mutated by the handlers it hands out.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicI64>,
}

impl Counter {
    /// Counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Overwrite the value.
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Handler that adds one per delivery, whatever the payload.
    #[must_use]
    pub fn incrementer(&self) -> impl Fn(&Delivery<'_>) -> HandlerResult + Send + Sync + 'static {
        let value = Arc::clone(&self.value);
        move |_: &Delivery<'_>| -> HandlerResult {
            value.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Handler that adds the integer in the first payload slot, never going
    /// below zero. Fails when the slot is present but not an integer; an empty
    /// payload is ignored.
    #[must_use]
    pub fn accumulator(&self) -> impl Fn(&Delivery<'_>) -> HandlerResult + Send + Sync + 'static {
        let value = Arc::clone(&self.value);
        move |delivery: &Delivery<'_>| -> HandlerResult {
            let Some(raw) = delivery.arg(0) else {
                return Ok(());
            };
            let delta = raw
                .as_i64()
                .ok_or_else(|| anyhow!("expected an integer delta, got {raw}"))?;
            let current = value.load(Ordering::SeqCst);
            value.store(current.saturating_add(delta).max(0), Ordering::SeqCst);
            Ok(())
        }
    }

    /// Handler that stores the integer in the first payload slot, or zero for
    /// an empty payload.
    #[must_use]
    pub fn setter(&self) -> impl Fn(&Delivery<'_>) -> HandlerResult + Send + Sync + 'static {
        let value = Arc::clone(&self.value);
        move |delivery: &Delivery<'_>| -> HandlerResult {
            let next = delivery.arg(0).and_then(serde_json::Value::as_i64).unwrap_or(0);
            value.store(next, Ordering::SeqCst);
            Ok(())
        }
    }
}
