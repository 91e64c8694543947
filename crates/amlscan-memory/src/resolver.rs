//! Entity resolution over the counterparty store.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use amlscan_core::{normalize_name, strip_diacritics, CounterpartyLabel, CounterpartyProfile};
use amlscan_store::{Store, StoreResult};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::debug;

/// Resolution tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    /// Minimum fuzzy score to link a name to an existing profile.
    pub link_threshold: f64,
    /// Confidence recorded on freshly created profiles.
    pub new_profile_confidence: f64,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            link_threshold: 0.85,
            new_profile_confidence: 0.5,
        }
    }
}

/// Token-overlap similarity between two normalized names, 0.0–1.0.
///
/// Diacritics are stripped before comparison so "GOTÓWKA" and "GOTOWKA"
/// count as the same token.
pub fn fuzzy_score(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let fold = |s: &str| -> HashSet<String> {
        strip_diacritics(s)
            .split_whitespace()
            .map(str::to_string)
            .collect()
    };
    let tokens_a = fold(a);
    let tokens_b = fold(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let overlap = tokens_a.intersection(&tokens_b).count();
    overlap as f64 / tokens_a.len().max(tokens_b.len()) as f64
}

/// Counterparty resolver with a read-mostly label snapshot cache.
///
/// Writes (labels, aliases, new profiles) invalidate the snapshot; the
/// next read rebuilds it. Label changes therefore apply to every future
/// classification, never retroactively.
pub struct EntityResolver {
    store: Store,
    options: ResolverOptions,
    label_cache: RwLock<Option<HashMap<String, CounterpartyLabel>>>,
}

impl EntityResolver {
    pub fn new(store: Store) -> Self {
        Self::with_options(store, ResolverOptions::default())
    }

    pub fn with_options(store: Store, options: ResolverOptions) -> Self {
        Self {
            store,
            options,
            label_cache: RwLock::new(None),
        }
    }

    /// Underlying store handle.
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn invalidate(&self) {
        *self
            .label_cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// Resolve a printed name to a profile id with a confidence.
    ///
    /// Exact canonical/alias match → confidence 1.0. Fuzzy match at or
    /// above the link threshold → linked (the spelling becomes an alias)
    /// with the score as confidence. Otherwise a new profile is created
    /// with the creation-floor confidence.
    pub fn resolve(&self, name: &str) -> StoreResult<(String, f64)> {
        let normalized = normalize_name(name);
        if let Some(row) = self.store.find_counterparty_by_name(name)? {
            return Ok((row.id, 1.0));
        }

        let mut best: Option<(String, f64)> = None;
        for candidate in self.store.list_counterparties()? {
            let score = fuzzy_score(&normalized, &candidate.name_normalized);
            if best.as_ref().map_or(true, |(_, s)| score > *s) {
                best = Some((candidate.id, score));
            }
        }

        if let Some((id, score)) = best {
            if score >= self.options.link_threshold {
                debug!(name, profile_id = %id, score, "fuzzy-linked counterparty");
                self.store.add_counterparty_alias(&id, name)?;
                self.invalidate();
                return Ok((id, score));
            }
        }

        let created = self.store.insert_counterparty(
            name,
            CounterpartyLabel::Neutral,
            "",
            self.options.new_profile_confidence,
        )?;
        debug!(name, profile_id = %created.id, "created counterparty profile");
        self.invalidate();
        Ok((created.id, self.options.new_profile_confidence))
    }

    /// Resolve a counterparty seen on a statement, with context for the
    /// debug trail.
    pub fn get_or_create(
        &self,
        name: &str,
        source_bank: &str,
        amount: Decimal,
        date: NaiveDate,
    ) -> StoreResult<(String, f64)> {
        debug!(name, source_bank, %amount, %date, "resolving statement counterparty");
        self.resolve(name)
    }

    /// Idempotently attach an alias to a profile.
    pub fn add_alias(&self, profile_id: &str, alias: &str) -> StoreResult<()> {
        self.store.add_counterparty_alias(profile_id, alias)?;
        self.invalidate();
        Ok(())
    }

    /// Set a profile's label; future classifications pick it up via
    /// [`EntityResolver::labels`].
    pub fn set_label(
        &self,
        profile_id: &str,
        label: CounterpartyLabel,
        note: &str,
    ) -> StoreResult<()> {
        self.store.set_counterparty_label(profile_id, label, note)?;
        self.invalidate();
        Ok(())
    }

    /// Snapshot of normalized name → label for bulk classification.
    pub fn labels(&self) -> StoreResult<HashMap<String, CounterpartyLabel>> {
        {
            let cached = self
                .label_cache
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(labels) = cached.as_ref() {
                return Ok(labels.clone());
            }
        }
        let fresh = self.store.counterparty_labels()?;
        *self
            .label_cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(fresh.clone());
        Ok(fresh)
    }

    /// Snapshot of normalized name → user note.
    pub fn notes(&self) -> StoreResult<HashMap<String, String>> {
        self.store.counterparty_notes()
    }

    /// Full profile view: row plus aliases and parsed timestamps.
    pub fn profile(&self, profile_id: &str) -> StoreResult<Option<CounterpartyProfile>> {
        let Some(row) = self.store.get_counterparty(profile_id)? else {
            return Ok(None);
        };
        let aliases = self.store.list_aliases(profile_id)?;
        let parse_ts = |s: &str| -> DateTime<Utc> {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_default()
        };
        Ok(Some(CounterpartyProfile {
            id: row.id,
            canonical_name: row.canonical_name,
            label: row.label,
            note: row.note,
            aliases,
            confidence: row.confidence,
            created_at: parse_ts(&row.created_at),
            updated_at: parse_ts(&row.updated_at),
        }))
    }
}
