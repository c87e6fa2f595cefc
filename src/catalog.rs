use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::SystemTime;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::detectors::{Detector, builtin_detectors, validate_detector};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("detector '{0}' is already registered")]
    DuplicateName(String),
    #[error("invalid detector '{name}': {reason}")]
    InvalidDetector { name: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEventKind {
    Registered,
    Unregistered,
    Enabled,
    Disabled,
    PriorityChanged,
    Cleared,
}

/// Notification payload passed to catalog listeners.
#[derive(Debug, Clone)]
pub struct CatalogEvent {
    pub kind: CatalogEventKind,
    /// Absent for catalog-wide events (`Cleared`).
    pub detector: Option<String>,
    pub timestamp: SystemTime,
}

/// Handle returned by [`Catalog::add_event_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type Listener = Box<dyn Fn(&CatalogEvent) + Send + Sync>;

/// Registration-time settings for one detector.
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    pub disabled: bool,
    pub priority_override: Option<u32>,
    /// Overwrite an existing registration instead of failing.
    pub replace: bool,
}

// Enabled flag, priority override and registration sequence live in one
// record per detector; removal drops all three together.
struct CatalogEntry {
    detector: Arc<dyn Detector>,
    enabled: bool,
    priority_override: Option<u32>,
    seq: u64,
}

impl CatalogEntry {
    fn effective_priority(&self) -> u32 {
        self.priority_override
            .unwrap_or_else(|| self.detector.priority())
    }
}

/// Snapshot of one registration, as returned by the list accessors.
#[derive(Clone)]
pub struct RegisteredDetector {
    pub name: String,
    pub detector: Arc<dyn Detector>,
    pub enabled: bool,
    pub effective_priority: u32,
}

/// Introspection counters; not used for correctness.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogStats {
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
    /// All names, sorted by effective priority.
    pub priority_order: Vec<String>,
}

/// An addressable collection of detector instances keyed by name, with
/// per-entry enabled state and priority overrides, consistently sorted
/// views, and synchronous change notifications.
#[derive(Default)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
    next_seq: u64,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
}

impl Catalog {
    /// An empty catalog; nothing preloaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog preloaded with the full built-in detector set.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        for detector in builtin_detectors() {
            // Built-in names are unique and validated by construction.
            let _ = catalog.register(detector, RegisterOptions::default());
        }
        catalog
    }

    /// A catalog preloaded with the named subset of built-ins; unknown
    /// names are ignored.
    pub fn with_builtin_subset(names: &[&str]) -> Self {
        let mut catalog = Self::new();
        for detector in builtin_detectors() {
            if names.contains(&detector.name()) {
                let _ = catalog.register(detector, RegisterOptions::default());
            }
        }
        catalog
    }

    pub fn register(
        &mut self,
        detector: Arc<dyn Detector>,
        options: RegisterOptions,
    ) -> Result<(), CatalogError> {
        validate_detector(detector.as_ref()).map_err(|reason| CatalogError::InvalidDetector {
            name: detector.name().to_string(),
            reason,
        })?;

        let name = detector.name().to_string();
        if self.entries.contains_key(&name) && !options.replace {
            return Err(CatalogError::DuplicateName(name));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            name.clone(),
            CatalogEntry {
                detector,
                enabled: !options.disabled,
                priority_override: options.priority_override,
                seq,
            },
        );
        self.emit(CatalogEventKind::Registered, Some(name));
        Ok(())
    }

    /// Remove a detector together with its override and enabled flag.
    /// Returns `false` if the name is unknown.
    pub fn unregister(&mut self, name: &str) -> bool {
        if self.entries.remove(name).is_some() {
            self.emit(CatalogEventKind::Unregistered, Some(name.to_string()));
            true
        } else {
            false
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Detector>> {
        self.entries.get(name).map(|entry| entry.detector.clone())
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_all(&self) -> Vec<RegisteredDetector> {
        self.sorted_view(|_| true)
    }

    pub fn get_enabled(&self) -> Vec<RegisteredDetector> {
        self.sorted_view(|entry| entry.enabled)
    }

    pub fn get_disabled(&self) -> Vec<RegisteredDetector> {
        self.sorted_view(|entry| !entry.enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = RegisteredDetector> {
        self.get_all().into_iter()
    }

    pub fn enable(&mut self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    pub fn disable(&mut self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    pub fn enable_all(&mut self) {
        let names: Vec<String> = self.entries.keys().cloned().collect();
        for name in names {
            self.set_enabled(&name, true);
        }
    }

    pub fn disable_all(&mut self) {
        let names: Vec<String> = self.entries.keys().cloned().collect();
        for name in names {
            self.set_enabled(&name, false);
        }
    }

    /// Disable everything, then enable exactly the given names; unknown
    /// names are ignored.
    pub fn enable_only(&mut self, names: &[&str]) {
        let all: Vec<String> = self.entries.keys().cloned().collect();
        for name in all {
            self.set_enabled(&name, names.contains(&name.as_str()));
        }
    }

    /// `false` for unknown names, so catalog maintenance stays idempotent.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|entry| entry.enabled)
    }

    pub fn set_priority(&mut self, name: &str, priority: u32) -> bool {
        let Some(entry) = self.entries.get_mut(name) else {
            return false;
        };
        entry.priority_override = Some(priority);
        self.emit(CatalogEventKind::PriorityChanged, Some(name.to_string()));
        true
    }

    pub fn reset_priority(&mut self, name: &str) -> bool {
        let Some(entry) = self.entries.get_mut(name) else {
            return false;
        };
        let had_override = entry.priority_override.take().is_some();
        if had_override {
            self.emit(CatalogEventKind::PriorityChanged, Some(name.to_string()));
        }
        true
    }

    pub fn reset_all_priorities(&mut self) {
        let overridden: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.priority_override.is_some())
            .map(|(name, _)| name.clone())
            .collect();
        for name in overridden {
            self.reset_priority(&name);
        }
    }

    /// The priority resolution actually uses: override if present, the
    /// detector's intrinsic priority otherwise.
    pub fn effective_priority(&self, name: &str) -> Option<u32> {
        self.entries.get(name).map(CatalogEntry::effective_priority)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.emit(CatalogEventKind::Cleared, None);
    }

    pub fn stats(&self) -> CatalogStats {
        let enabled = self.entries.values().filter(|e| e.enabled).count();
        CatalogStats {
            total: self.entries.len(),
            enabled,
            disabled: self.entries.len() - enabled,
            priority_order: self.get_all().into_iter().map(|d| d.name).collect(),
        }
    }

    pub fn add_event_listener(
        &mut self,
        listener: impl Fn(&CatalogEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        ListenerId(id)
    }

    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id.0);
        self.listeners.len() != before
    }

    fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        let Some(entry) = self.entries.get_mut(name) else {
            return false;
        };
        if entry.enabled != enabled {
            entry.enabled = enabled;
            let kind = if enabled {
                CatalogEventKind::Enabled
            } else {
                CatalogEventKind::Disabled
            };
            self.emit(kind, Some(name.to_string()));
        }
        true
    }

    fn sorted_view(&self, filter: impl Fn(&CatalogEntry) -> bool) -> Vec<RegisteredDetector> {
        let mut entries: Vec<(&String, &CatalogEntry)> = self
            .entries
            .iter()
            .filter(|&(_, entry)| filter(entry))
            .collect();
        // Ties are stable in registration order.
        entries.sort_by_key(|(_, entry)| (entry.effective_priority(), entry.seq));
        entries
            .into_iter()
            .map(|(name, entry)| RegisteredDetector {
                name: name.clone(),
                detector: entry.detector.clone(),
                enabled: entry.enabled,
                effective_priority: entry.effective_priority(),
            })
            .collect()
    }

    // Synchronous dispatch. A panicking listener is contained so it can
    // neither abort the mutation that triggered it nor starve the
    // listeners after it.
    fn emit(&self, kind: CatalogEventKind, detector: Option<String>) {
        if self.listeners.is_empty() {
            return;
        }
        let event = CatalogEvent {
            kind,
            detector,
            timestamp: SystemTime::now(),
        };
        for (id, listener) in &self.listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                tracing::warn!(listener = *id, "catalog listener panicked; continuing");
            }
        }
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = RegisteredDetector;
    type IntoIter = std::vec::IntoIter<RegisteredDetector>;

    fn into_iter(self) -> Self::IntoIter {
        self.get_all().into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionOptions;
    use crate::detectors::{DetectError, DetectionContext};
    use crate::schema::{DetectionResult, LabelSource};
    use std::sync::Mutex;

    struct MockDetector {
        name: &'static str,
        priority: u32,
    }

    impl MockDetector {
        fn arc(name: &'static str, priority: u32) -> Arc<dyn Detector> {
            Arc::new(Self { name, priority })
        }
    }

    impl Detector for MockDetector {
        fn name(&self) -> &'static str {
            self.name
        }
        fn priority(&self) -> u32 {
            self.priority
        }
        fn base_confidence(&self) -> f32 {
            0.8
        }
        fn can_detect(&self, _ctx: &DetectionContext) -> bool {
            true
        }
        fn detect(
            &self,
            _ctx: &DetectionContext,
            _options: &DetectionOptions,
        ) -> Result<Option<DetectionResult>, DetectError> {
            Ok(Some(DetectionResult::new(
                "mock",
                0.8,
                self.name,
                LabelSource::Attribute,
            )))
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut catalog = Catalog::new();
        catalog
            .register(MockDetector::arc("a", 10), RegisterOptions::default())
            .unwrap();
        assert!(catalog.has("a"));
        assert!(catalog.get("a").is_some());
        assert!(catalog.is_enabled("a"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn duplicate_registration_fails_without_replace() {
        let mut catalog = Catalog::new();
        catalog
            .register(MockDetector::arc("a", 50), RegisterOptions::default())
            .unwrap();
        let err = catalog
            .register(MockDetector::arc("a", 60), RegisterOptions::default())
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateName(name) if name == "a"));
        // First registration untouched.
        assert_eq!(catalog.get("a").unwrap().priority(), 50);
    }

    #[test]
    fn replace_overwrites() {
        let mut catalog = Catalog::new();
        catalog
            .register(MockDetector::arc("a", 50), RegisterOptions::default())
            .unwrap();
        catalog
            .register(
                MockDetector::arc("a", 60),
                RegisterOptions {
                    replace: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(catalog.get("a").unwrap().priority(), 60);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn unregister_clears_all_entry_state() {
        let mut catalog = Catalog::new();
        catalog
            .register(
                MockDetector::arc("a", 50),
                RegisterOptions {
                    priority_override: Some(5),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(catalog.unregister("a"));
        assert!(!catalog.has("a"));
        assert!(!catalog.is_enabled("a"));
        assert_eq!(catalog.effective_priority("a"), None);
        assert!(!catalog.unregister("a"));
    }

    #[test]
    fn views_sort_by_effective_priority_with_stable_ties() {
        let mut catalog = Catalog::new();
        catalog
            .register(MockDetector::arc("second", 50), RegisterOptions::default())
            .unwrap();
        catalog
            .register(MockDetector::arc("tied", 50), RegisterOptions::default())
            .unwrap();
        catalog
            .register(MockDetector::arc("first", 10), RegisterOptions::default())
            .unwrap();

        let names: Vec<String> = catalog.get_all().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["first", "second", "tied"]);
    }

    #[test]
    fn priority_override_reorders_views() {
        let mut catalog = Catalog::new();
        catalog
            .register(MockDetector::arc("low", 80), RegisterOptions::default())
            .unwrap();
        catalog
            .register(MockDetector::arc("high", 10), RegisterOptions::default())
            .unwrap();

        assert!(catalog.set_priority("low", 5));
        let names: Vec<String> = catalog.get_all().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["low", "high"]);
        assert_eq!(catalog.effective_priority("low"), Some(5));

        assert!(catalog.reset_priority("low"));
        assert_eq!(catalog.effective_priority("low"), Some(80));
        assert!(!catalog.set_priority("missing", 1));
    }

    #[test]
    fn enable_disable_and_views() {
        let mut catalog = Catalog::new();
        catalog
            .register(MockDetector::arc("a", 10), RegisterOptions::default())
            .unwrap();
        catalog
            .register(MockDetector::arc("b", 20), RegisterOptions::default())
            .unwrap();

        assert!(catalog.disable("a"));
        assert_eq!(catalog.get_enabled().len(), 1);
        assert_eq!(catalog.get_disabled().len(), 1);

        catalog.enable_all();
        assert_eq!(catalog.get_enabled().len(), 2);

        catalog.enable_only(&["b", "nonexistent"]);
        assert!(!catalog.is_enabled("a"));
        assert!(catalog.is_enabled("b"));

        assert!(!catalog.enable("missing"));
    }

    #[test]
    fn registered_disabled_option() {
        let mut catalog = Catalog::new();
        catalog
            .register(
                MockDetector::arc("a", 10),
                RegisterOptions {
                    disabled: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!catalog.is_enabled("a"));
        assert!(catalog.get_enabled().is_empty());
    }

    #[test]
    fn events_fire_synchronously() {
        let seen: Arc<Mutex<Vec<CatalogEventKind>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let mut catalog = Catalog::new();
        let id = catalog.add_event_listener(move |event| {
            sink.lock().unwrap().push(event.kind);
        });

        catalog
            .register(MockDetector::arc("a", 10), RegisterOptions::default())
            .unwrap();
        catalog.disable("a");
        catalog.enable("a");
        catalog.set_priority("a", 1);
        catalog.unregister("a");
        catalog.clear();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                CatalogEventKind::Registered,
                CatalogEventKind::Disabled,
                CatalogEventKind::Enabled,
                CatalogEventKind::PriorityChanged,
                CatalogEventKind::Unregistered,
                CatalogEventKind::Cleared,
            ]
        );

        assert!(catalog.remove_event_listener(id));
        assert!(!catalog.remove_event_listener(id));
    }

    #[test]
    fn redundant_enable_emits_nothing() {
        let seen: Arc<Mutex<Vec<CatalogEventKind>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let mut catalog = Catalog::new();
        catalog
            .register(MockDetector::arc("a", 10), RegisterOptions::default())
            .unwrap();
        catalog.add_event_listener(move |event| {
            sink.lock().unwrap().push(event.kind);
        });

        assert!(catalog.enable("a"));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn panicking_listener_does_not_stop_others() {
        let seen: Arc<Mutex<usize>> = Arc::new(Mutex::new(0));
        let sink = seen.clone();

        let mut catalog = Catalog::new();
        catalog.add_event_listener(|_event| panic!("bad listener"));
        catalog.add_event_listener(move |_event| {
            *sink.lock().unwrap() += 1;
        });

        catalog
            .register(MockDetector::arc("a", 10), RegisterOptions::default())
            .unwrap();
        // The mutation survived and the second listener still ran.
        assert!(catalog.has("a"));
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn builtin_constructors() {
        let full = Catalog::with_builtins();
        assert_eq!(full.len(), 8);
        assert!(full.has("aria"));
        assert!(full.has("bootstrap"));

        let subset = Catalog::with_builtin_subset(&["aria", "sibling", "unknown"]);
        assert_eq!(subset.len(), 2);
        assert!(subset.has("aria"));
        assert!(subset.has("sibling"));
        assert!(!subset.has("bootstrap"));
    }

    #[test]
    fn stats_reflect_state() {
        let mut catalog = Catalog::with_builtin_subset(&["aria", "sibling"]);
        catalog.disable("sibling");
        let stats = catalog.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.enabled, 1);
        assert_eq!(stats.disabled, 1);
        assert_eq!(stats.priority_order, vec!["aria", "sibling"]);
    }

    #[test]
    fn invalid_detector_rejected_at_registration() {
        struct BadConfidence;
        impl Detector for BadConfidence {
            fn name(&self) -> &'static str {
                "bad"
            }
            fn priority(&self) -> u32 {
                0
            }
            fn base_confidence(&self) -> f32 {
                2.0
            }
            fn can_detect(&self, _ctx: &DetectionContext) -> bool {
                false
            }
            fn detect(
                &self,
                _ctx: &DetectionContext,
                _options: &DetectionOptions,
            ) -> Result<Option<DetectionResult>, DetectError> {
                Ok(None)
            }
        }

        let mut catalog = Catalog::new();
        let err = catalog
            .register(Arc::new(BadConfidence), RegisterOptions::default())
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidDetector { .. }));
    }
}
