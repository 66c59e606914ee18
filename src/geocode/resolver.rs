use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::foundation::core::Location;
use crate::geocode::address::{FALLBACK_NAME, Granularity, pick_admin_name};
use crate::geocode::nominatim::ReverseGeocoder;
use crate::scene::model::{PlaceLabel, RESOLVING_NAME};

/// Turns coordinates into a display name at a requested administrative level.
///
/// Lookup failures never surface: they are logged and degrade to the fallback name.
#[derive(Clone)]
pub struct AdminNameResolver {
    geocoder: Arc<dyn ReverseGeocoder>,
    fallback: String,
}

impl std::fmt::Debug for AdminNameResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminNameResolver")
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

impl AdminNameResolver {
    /// Resolver using [`FALLBACK_NAME`].
    pub fn new(geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        Self::with_fallback(geocoder, FALLBACK_NAME)
    }

    /// Resolver with a custom fallback name.
    pub fn with_fallback(geocoder: Arc<dyn ReverseGeocoder>, fallback: impl Into<String>) -> Self {
        let mut fallback = fallback.into();
        if fallback.trim().is_empty() {
            fallback = FALLBACK_NAME.to_owned();
        }
        Self { geocoder, fallback }
    }

    /// Name returned when nothing better is known.
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Issue one lookup and pick a name. Never fails and never returns an empty string.
    #[tracing::instrument(skip(self), fields(lat = location.lat(), lng = location.lng()))]
    pub async fn resolve(&self, location: Location, granularity: Granularity) -> String {
        match self.geocoder.reverse(location).await {
            Ok(fields) => {
                let name = pick_admin_name(&fields, granularity, &self.fallback);
                debug!(%name, granularity = granularity.as_str(), "admin name resolved");
                name
            }
            Err(e) => {
                warn!(error = %e, "reverse geocode failed; using fallback name");
                self.fallback.clone()
            }
        }
    }

    /// Start a lookup whose result lands in `slot` unless a newer request supersedes it.
    ///
    /// The request is registered with the slot before this returns, so issuing order and not
    /// completion order decides which result is kept. The future yields `true` when the result
    /// was applied.
    pub fn resolve_into(
        &self,
        slot: &LabelSlot,
        location: Location,
        granularity: Granularity,
    ) -> impl Future<Output = bool> + Send + 'static {
        let ticket = slot.begin();
        let slot = slot.clone();
        let resolver = self.clone();
        async move {
            let name = resolver.resolve(location, granularity).await;
            slot.complete(ticket, name)
        }
    }
}

/// Sequence number of a name request; only the latest one may write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug)]
struct SlotState {
    latest: u64,
    label: PlaceLabel,
}

/// The displayed label plus the staleness token guarding its name.
///
/// Cheap to clone; clones share state.
#[derive(Clone, Debug)]
pub struct LabelSlot {
    state: Arc<Mutex<SlotState>>,
}

impl LabelSlot {
    /// Slot showing `label`.
    pub fn new(label: PlaceLabel) -> Self {
        Self {
            state: Arc::new(Mutex::new(SlotState { latest: 0, label })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new request and show the placeholder name.
    pub fn begin(&self) -> Ticket {
        let mut s = self.lock();
        s.latest += 1;
        s.label.display_name = RESOLVING_NAME.to_owned();
        Ticket(s.latest)
    }

    /// Apply `name` if `ticket` is still the latest request. Returns whether it was applied.
    pub fn complete(&self, ticket: Ticket, name: String) -> bool {
        let mut s = self.lock();
        if ticket.0 != s.latest {
            debug!(ticket = ticket.0, latest = s.latest, "discarding stale name");
            return false;
        }
        s.label.display_name = name;
        true
    }

    /// Set the name directly, superseding any request in flight.
    pub fn set_explicit(&self, name: impl Into<String>) {
        let mut s = self.lock();
        s.latest += 1;
        s.label.display_name = name.into();
    }

    /// Replace the whole label, superseding any request in flight.
    pub fn replace(&self, label: PlaceLabel) {
        let mut s = self.lock();
        s.latest += 1;
        s.label = label;
    }

    /// Snapshot of the label.
    pub fn label(&self) -> PlaceLabel {
        self.lock().label.clone()
    }
}

impl Default for LabelSlot {
    fn default() -> Self {
        Self::new(PlaceLabel::named(FALLBACK_NAME))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geocode/resolver.rs"]
mod tests;
