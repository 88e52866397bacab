//! Mix export — offline render plus WAV encoding.
//!
//! [`export_mix_blocking`] is the synchronous pipeline used by the wasm
//! façade. With the `native` feature, [`Exporter`] runs the same pipeline on
//! tokio's blocking pool and lets a newer export supersede an older one.

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::{MixError, RenderFailure};
use crate::render::{MixSnapshot, render_offline};
use crate::wav::encode_mix;

/// An encoded mix plus the tracks that were left out of it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MixExport {
    #[serde(skip)]
    pub wav: Vec<u8>,
    pub failures: Vec<RenderFailure>,
    pub duration_secs: f64,
    pub sample_rate: u32,
}

/// Render `snapshot` and encode it. Encoder errors are always fatal.
pub fn export_mix_blocking(
    snapshot: &MixSnapshot,
    config: &EngineConfig,
    cancelled: &dyn Fn() -> bool,
) -> Result<MixExport, MixError> {
    let outcome = render_offline(snapshot, config, cancelled)?;
    if cancelled() {
        return Err(MixError::RenderCancelled);
    }
    let wav = encode_mix(&outcome.mix, config.bit_depth)?;
    log::info!(
        "exported {:.3}s mix, {} bytes, {} tracks skipped",
        outcome.mix.duration_secs(),
        wav.len(),
        outcome.failures.len()
    );
    Ok(MixExport {
        wav,
        failures: outcome.failures,
        duration_secs: outcome.mix.duration_secs(),
        sample_rate: outcome.mix.sample_rate,
    })
}

#[cfg(feature = "native")]
pub use native::Exporter;

#[cfg(feature = "native")]
mod native {
    use std::future::Future;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use super::{MixExport, export_mix_blocking};
    use crate::config::EngineConfig;
    use crate::error::MixError;
    use crate::render::MixSnapshot;

    /// Runs exports off the control thread. Only the most recently started
    /// export may finish; older ones resolve to [`MixError::RenderCancelled`].
    pub struct Exporter {
        config: EngineConfig,
        generation: Arc<AtomicU64>,
        in_flight: Arc<AtomicUsize>,
    }

    struct InFlight(Arc<AtomicUsize>);

    impl InFlight {
        fn enter(counter: &Arc<AtomicUsize>) -> Self {
            counter.fetch_add(1, Ordering::SeqCst);
            Self(Arc::clone(counter))
        }
    }

    impl Drop for InFlight {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl Exporter {
        pub fn new(config: EngineConfig) -> Self {
            Self {
                config,
                generation: Arc::new(AtomicU64::new(0)),
                in_flight: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// True while any export future is still pending.
        pub fn is_exporting(&self) -> bool {
            self.in_flight.load(Ordering::SeqCst) > 0
        }

        /// Abandon whatever export is running.
        pub fn cancel(&self) {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }

        /// Start an export of `snapshot`. The call itself supersedes any
        /// earlier export, even before the returned future is polled.
        pub fn export_mix(
            &self,
            snapshot: MixSnapshot,
        ) -> impl Future<Output = Result<MixExport, MixError>> + Send + use<> {
            let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let generation = Arc::clone(&self.generation);
            let guard = InFlight::enter(&self.in_flight);
            let config = self.config.clone();
            log::info!("export #{ticket} requested");

            async move {
                let _guard = guard;
                tokio::task::spawn_blocking(move || {
                    let cancelled = || generation.load(Ordering::SeqCst) != ticket;
                    export_mix_blocking(&snapshot, &config, &cancelled)
                })
                .await
                .map_err(|e| MixError::ExportTask(e.to_string()))?
            }
        }
    }
}
