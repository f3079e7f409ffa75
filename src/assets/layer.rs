//! Offline cache that sits between callers and the network.

use futures::future::try_join_all;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::storage::AssetStorage;
use super::traits::{
  AssetError, AssetResponse, AssetResult, CachedAsset, Lifecycle, NetworkError, Served,
};

/// Summary of what the cache holds.
#[derive(Debug, Clone)]
pub struct CacheStatus {
  pub generation: String,
  pub state: Lifecycle,
  pub active: Option<String>,
  /// Every stored generation with its entry count
  pub generations: Vec<(String, usize)>,
}

/// Versioned asset cache with a network-first fetch strategy.
///
/// Exactly one generation (`generation`) is current. Installing fills it
/// from the manifest, activating evicts every other generation, and once
/// active, fetches that fail at the network level are answered from it.
pub struct OfflineCache<S: AssetStorage> {
  storage: Arc<S>,
  generation: String,
  manifest: Arc<Vec<String>>,
  state: Arc<Mutex<Lifecycle>>,
}

impl<S: AssetStorage> OfflineCache<S> {
  /// Create a cache for `generation`, deriving the lifecycle from storage.
  pub fn new(storage: S, generation: impl Into<String>, manifest: Vec<String>) -> AssetResult<Self> {
    let generation = generation.into();

    let state = if storage.active_generation()?.as_deref() == Some(generation.as_str()) {
      Lifecycle::Active
    } else if storage.has_generation(&generation)? {
      Lifecycle::Installed
    } else {
      Lifecycle::Idle
    };
    debug!(%generation, %state, "asset cache opened");

    Ok(Self {
      storage: Arc::new(storage),
      generation,
      manifest: Arc::new(manifest),
      state: Arc::new(Mutex::new(state)),
    })
  }

  pub fn generation(&self) -> &str {
    &self.generation
  }

  pub fn state(&self) -> Lifecycle {
    *self.state.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn transition(&self, next: Lifecycle) {
    let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
    let from = *state;
    debug!(%from, to = %next, generation = %self.generation, "lifecycle transition");
    *state = next;
  }

  /// Fetch every manifest path and store them as the current generation.
  ///
  /// All-or-nothing: a network failure or a non-2xx response for any path
  /// aborts the install and nothing is written.
  pub async fn install<F, Fut>(&self, fetcher: F) -> AssetResult<usize>
  where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<AssetResponse, NetworkError>>,
  {
    self.transition(Lifecycle::Installing);

    let fetches = self.manifest.iter().map(|path| {
      let fut = fetcher(path.clone());
      async move {
        match fut.await {
          Ok(response) if response.is_success() => Ok((path.clone(), response)),
          Ok(response) => Err((path.clone(), format!("status {}", response.status))),
          Err(e) => Err((path.clone(), e.to_string())),
        }
      }
    });

    let entries = match try_join_all(fetches).await {
      Ok(entries) => entries,
      Err((path, reason)) => {
        warn!(generation = %self.generation, %path, %reason, "install aborted");
        self.settle_install(false);
        return Err(AssetError::Install {
          generation: self.generation.clone(),
          path,
          reason,
        });
      }
    };

    if let Err(e) = self.storage.store_generation(&self.generation, &entries) {
      self.settle_install(false);
      return Err(e);
    }

    self.settle_install(true);
    info!(generation = %self.generation, assets = entries.len(), "asset cache installed");
    Ok(entries.len())
  }

  /// Leave `Installing`. A generation that is already the active one in
  /// storage stays `Active` whatever the outcome; a failed install wrote
  /// nothing, so its entries are still served.
  fn settle_install(&self, succeeded: bool) {
    let still_active = match self.storage.active_generation() {
      Ok(active) => active.as_deref() == Some(self.generation.as_str()),
      Err(e) => {
        warn!(error = %e, "could not read the active generation");
        false
      }
    };

    let next = match (still_active, succeeded) {
      (true, _) => Lifecycle::Active,
      (false, true) => Lifecycle::Installed,
      (false, false) => Lifecycle::Failed,
    };
    self.transition(next);
  }

  /// Make the current generation active and evict every other one.
  ///
  /// Returns the evicted generation tags.
  pub fn activate(&self) -> AssetResult<Vec<String>> {
    match self.state() {
      Lifecycle::Installed | Lifecycle::Active => {}
      _ => {
        // Another process may have installed it since we opened
        if !self.storage.has_generation(&self.generation)? {
          return Err(AssetError::NotInstalled(self.generation.clone()));
        }
      }
    }

    self.transition(Lifecycle::Activating);

    let result = self.evict_others();
    match result {
      Ok(evicted) => {
        self.transition(Lifecycle::Active);
        info!(generation = %self.generation, evicted = ?evicted, "asset cache activated");
        Ok(evicted)
      }
      Err(e) => {
        self.transition(Lifecycle::Failed);
        Err(e)
      }
    }
  }

  fn evict_others(&self) -> AssetResult<Vec<String>> {
    let mut evicted = Vec::new();
    for name in self.storage.generations()? {
      if name != self.generation && self.storage.delete_generation(&name)? {
        evicted.push(name);
      }
    }
    self.storage.set_active_generation(&self.generation)?;
    Ok(evicted)
  }

  /// Network first. Only a failure to get any response at all falls back
  /// to the generation active in storage, which may be an older tag than
  /// ours until ours is activated. Error statuses are returned as they are.
  pub async fn fetch<F, Fut>(&self, path: &str, fetcher: F) -> AssetResult<Served>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<AssetResponse, NetworkError>>,
  {
    let network_err = match fetcher().await {
      Ok(response) => return Ok(Served::from_network(response)),
      Err(e) => e,
    };

    let Some(active) = self.storage.active_generation()? else {
      // Nothing activated yet, not intercepting
      return Err(AssetError::Network(network_err));
    };

    match self.lookup_in(&active, path)? {
      Some(asset) => {
        debug!(path = %asset.path, generation = %active, "served from cache");
        Ok(Served::from_cache(asset))
      }
      None => {
        warn!(path, error = %network_err, "offline and not cached");
        Err(AssetError::Offline {
          path: path.to_string(),
          source: network_err,
        })
      }
    }
  }

  /// Look `path` up in the current generation.
  pub fn lookup(&self, path: &str) -> AssetResult<Option<CachedAsset>> {
    self.lookup_in(&self.generation, path)
  }

  /// Entries whose body no longer matches the stored digest count as missing.
  fn lookup_in(&self, generation: &str, path: &str) -> AssetResult<Option<CachedAsset>> {
    let Some(asset) = self.storage.match_asset(generation, path)? else {
      return Ok(None);
    };

    if asset.response.digest() != asset.digest {
      warn!(path, generation, "cached body does not match digest");
      return Ok(None);
    }
    Ok(Some(asset))
  }

  pub fn status(&self) -> AssetResult<CacheStatus> {
    let generations = self
      .storage
      .generations()?
      .into_iter()
      .map(|name| {
        let count = self.storage.entry_count(&name)?;
        Ok::<_, AssetError>((name, count))
      })
      .collect::<AssetResult<Vec<_>>>()?;

    Ok(CacheStatus {
      generation: self.generation.clone(),
      state: self.state(),
      active: self.storage.active_generation()?,
      generations,
    })
  }
}

impl<S: AssetStorage> Clone for OfflineCache<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      generation: self.generation.clone(),
      manifest: Arc::clone(&self.manifest),
      state: Arc::clone(&self.state),
    }
  }
}
