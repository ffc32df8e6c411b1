// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process-wide artifact cache.
//
// Each path's artifacts are loaded at most once. Concurrent first accesses
// block on the one-time initialiser; afterwards reads are lock-free. A failed
// load is remembered and never retried, so a missing hybrid model disables
// that path for the rest of the run while the baseline path keeps working.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use tracescope_core::config::{ArtifactPaths, PipelineConfig};
use tracescope_core::error::{Result, TraceError};
use tracing::{info, instrument, warn};

use crate::classify::baseline::BaselineModel;
use crate::classify::hybrid::HybridNetwork;
use crate::classify::labels::LabelEncoder;
use crate::classify::scaler::StandardScaler;
use crate::features::FEATURE_LEN;
use crate::fingerprint::{FingerprintBank, FingerprintCorrelator};

/// Loads the hybrid network from its artifact path.
pub type NetworkLoader = Arc<dyn Fn(&Path) -> Result<Arc<dyn HybridNetwork>> + Send + Sync>;

/// Read a JSON artifact. Every failure is `ResourceUnavailable`.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read(path).map_err(|err| {
        TraceError::ResourceUnavailable(format!("cannot read {}: {err}", path.display()))
    })?;
    serde_json::from_slice(&data).map_err(|err| {
        TraceError::ResourceUnavailable(format!("cannot parse {}: {err}", path.display()))
    })
}

/// Everything the hybrid path needs, loaded together.
pub struct HybridResources {
    pub network: Arc<dyn HybridNetwork>,
    pub labels: LabelEncoder,
    pub scaler: StandardScaler,
    pub correlator: FingerprintCorrelator,
}

impl std::fmt::Debug for HybridResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridResources")
            .field("classes", &self.labels.len())
            .field("scaler_dim", &self.scaler.dim())
            .field("devices", &self.correlator.bank().len())
            .finish_non_exhaustive()
    }
}

/// Load state of one path's artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum Availability {
    /// Not requested yet.
    Unknown,
    Ready,
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactAvailability {
    pub baseline: Availability,
    pub hybrid: Availability,
}

type Slot<T> = OnceLock<std::result::Result<Arc<T>, String>>;

pub struct ArtifactStore {
    config: PipelineConfig,
    network_loader: NetworkLoader,
    baseline: Slot<BaselineModel>,
    hybrid: Slot<HybridResources>,
}

static PROCESS_STORE: OnceLock<Arc<ArtifactStore>> = OnceLock::new();

impl ArtifactStore {
    /// Store using the default `.rten` network loader.
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_network_loader(config, default_network_loader())
    }

    /// Store with a custom network loader.
    pub fn with_network_loader(config: &PipelineConfig, loader: NetworkLoader) -> Self {
        Self {
            config: config.clone(),
            network_loader: loader,
            baseline: OnceLock::new(),
            hybrid: OnceLock::new(),
        }
    }

    /// The process singleton. The first caller's configuration wins.
    pub fn process_wide(config: &PipelineConfig) -> Arc<ArtifactStore> {
        PROCESS_STORE
            .get_or_init(|| Arc::new(Self::new(config)))
            .clone()
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.config.artifacts
    }

    /// The baseline model, loading it on first use.
    pub fn baseline(&self) -> Result<Arc<BaselineModel>> {
        self.baseline
            .get_or_init(|| {
                BaselineModel::load(&self.config.artifacts.baseline_model)
                    .map(Arc::new)
                    .map_err(|err| {
                        warn!(error = %err, "Baseline path unavailable");
                        unavailable_reason(err)
                    })
            })
            .clone()
            .map_err(TraceError::ResourceUnavailable)
    }

    /// The hybrid resources, loading them on first use.
    pub fn hybrid(&self) -> Result<Arc<HybridResources>> {
        self.hybrid
            .get_or_init(|| {
                self.load_hybrid().map(Arc::new).map_err(|err| {
                    warn!(error = %err, "Hybrid path disabled for this run; baseline remains available");
                    unavailable_reason(err)
                })
            })
            .clone()
            .map_err(TraceError::ResourceUnavailable)
    }

    #[instrument(skip_all)]
    fn load_hybrid(&self) -> Result<HybridResources> {
        self.config.artifacts.validate()?;

        let labels = LabelEncoder::load(&self.config.artifacts.label_encoder)?;
        let scaler = StandardScaler::load(&self.config.artifacts.scaler)?;
        let bank = Arc::new(FingerprintBank::load(&self.config.artifacts)?);
        let network = (self.network_loader)(&self.config.artifacts.hybrid_model)?;

        let size = self.config.canonical_size as usize;
        if (bank.width(), bank.height()) != (size, size) {
            warn!(
                bank_width = bank.width(),
                bank_height = bank.height(),
                canonical_size = size,
                "Fingerprint bank size differs from the canonical size; every image will be rejected"
            );
        }
        if scaler.dim() != bank.len() + FEATURE_LEN {
            warn!(
                scaler_dim = scaler.dim(),
                row_len = bank.len() + FEATURE_LEN,
                "Scaler dimension differs from correlation + feature row length"
            );
        }

        let correlator = FingerprintCorrelator::prepare(bank, self.config.correlation)?;
        info!(
            classes = labels.len(),
            devices = correlator.bank().len(),
            "Hybrid artifacts ready"
        );
        Ok(HybridResources {
            network,
            labels,
            scaler,
            correlator,
        })
    }

    pub fn availability(&self) -> ArtifactAvailability {
        ArtifactAvailability {
            baseline: slot_state(&self.baseline),
            hybrid: slot_state(&self.hybrid),
        }
    }

    /// True once a hybrid load has failed for this store.
    pub fn hybrid_degraded(&self) -> bool {
        matches!(self.hybrid.get(), Some(Err(_)))
    }
}

fn unavailable_reason(err: TraceError) -> String {
    match err {
        TraceError::ResourceUnavailable(reason) => reason,
        other => other.to_string(),
    }
}

fn slot_state<T>(slot: &Slot<T>) -> Availability {
    match slot.get() {
        None => Availability::Unknown,
        Some(Ok(_)) => Availability::Ready,
        Some(Err(reason)) => Availability::Unavailable(reason.clone()),
    }
}

#[cfg(feature = "rten")]
fn default_network_loader() -> NetworkLoader {
    use crate::classify::hybrid::RtenHybridNetwork;
    Arc::new(|path: &Path| -> Result<Arc<dyn HybridNetwork>> {
        RtenHybridNetwork::load(path).map(|net| Arc::new(net) as Arc<dyn HybridNetwork>)
    })
}

#[cfg(not(feature = "rten"))]
fn default_network_loader() -> NetworkLoader {
    Arc::new(|path: &Path| -> Result<Arc<dyn HybridNetwork>> {
        Err(TraceError::ResourceUnavailable(format!(
            "cannot load {}: built without the `rten` feature",
            path.display()
        )))
    })
}
