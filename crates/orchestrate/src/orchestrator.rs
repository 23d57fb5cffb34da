//! The listing walk.
//!
//! Every categorical value is replaced by its concept id (a plain string —
//! the matcher expects strings at the original positions), item types route
//! through the same resolver with the listing's domain as context, numeric
//! constraints delegate to the quantity contract, and locations geocode.
//! When the walk is done, the ontology store flushes (write-behind).
//!
//! Failure semantics: a panic anywhere in the walk is caught at this
//! boundary and answered with a lowercased deep copy of the input, so
//! downstream matching is never blocked by a canonicalization failure.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use keycanon::KeyCanonicalizer;
use ontology::OntologyStore;
use resolver::CategoricalResolver;
use serde_json::Value;

use crate::geocode::GeocodingService;
use crate::listing::{Constraints, Item, Listing, Location, Preferences, TypedValue};
use crate::quantity::{PassthroughQuantities, QuantityResolver};

pub struct ListingOrchestrator {
    resolver: Arc<CategoricalResolver>,
    store: Arc<OntologyStore>,
    keys: Option<Arc<KeyCanonicalizer>>,
    quantities: Arc<dyn QuantityResolver>,
    geocoder: Option<Arc<GeocodingService>>,
}

impl ListingOrchestrator {
    pub fn new(resolver: Arc<CategoricalResolver>, store: Arc<OntologyStore>) -> Self {
        ListingOrchestrator {
            resolver,
            store,
            keys: None,
            quantities: Arc::new(PassthroughQuantities),
            geocoder: None,
        }
    }

    pub fn with_key_canonicalizer(mut self, keys: Arc<KeyCanonicalizer>) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn with_quantities(mut self, quantities: Arc<dyn QuantityResolver>) -> Self {
        self.quantities = quantities;
        self
    }

    pub fn with_geocoder(mut self, geocoder: Arc<GeocodingService>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Canonicalize one extracted listing. Never fails: a panic in any
    /// phase degrades to the lowercase fallback copy.
    pub async fn canonicalize_listing(&self, listing: &Listing) -> Listing {
        match AssertUnwindSafe(self.walk(listing.clone())).catch_unwind().await {
            Ok(canonical) => canonical,
            Err(_) => {
                tracing::warn!("canonicalization panicked; applying lowercase fallback");
                lowercase_fallback(listing)
            }
        }
    }

    async fn walk(&self, mut listing: Listing) -> Listing {
        listing.domain = listing.domain.iter().map(|d| d.to_lowercase()).collect();
        let domain_context = listing.domain.join(" ");
        let primary_domain = listing
            .domain
            .first()
            .cloned()
            .unwrap_or_else(|| "general".to_string());

        let mut items = Vec::with_capacity(listing.items.len());
        for item in &listing.items {
            items.push(
                self.canonicalize_item(item, &domain_context, &primary_domain)
                    .await,
            );
        }
        listing.items = items;

        listing.item_exclusions = self.canonicalize_exclusions(&listing.item_exclusions).await;
        listing.other_party_exclusions = self
            .canonicalize_exclusions(&listing.other_party_exclusions)
            .await;
        listing.self_exclusions = self.canonicalize_exclusions(&listing.self_exclusions).await;

        if let Some(preferences) = &listing.other_party_preferences {
            listing.other_party_preferences = Some(self.canonicalize_preferences(preferences).await);
        }
        if let Some(preferences) = &listing.self_attributes {
            listing.self_attributes = Some(self.canonicalize_preferences(preferences).await);
        }

        if let Some(location) = &listing.target_location {
            listing.target_location = Some(self.canonicalize_location(location).await);
        }
        listing.location_exclusions = listing
            .location_exclusions
            .iter()
            .map(|l| l.to_lowercase())
            .collect();

        // Write-behind flush: durable writes happen here, not per-resolve.
        let flushed = self.store.flush_to_db().await;
        if flushed > 0 {
            tracing::debug!(flushed, "ontology concepts flushed after listing");
        }

        listing
    }

    async fn canonicalize_item(&self, item: &Item, domain_context: &str, domain: &str) -> Item {
        let mut canonical = item.clone();

        if !item.item_type.trim().is_empty() {
            let node = self
                .resolver
                .resolve(&item.item_type, Some(domain_context), Some("item_type"))
                .await;
            // A fallback node means nothing recognized the type; keep the
            // lowercased surface form rather than minting noise.
            canonical.item_type = if node.source == "fallback" {
                item.item_type.to_lowercase()
            } else {
                node.concept_id
            };
        }

        let mut categorical = std::collections::BTreeMap::new();
        for (key, value) in &item.categorical {
            let canonical_key = match &self.keys {
                Some(keys) => keys.canonicalize(key, domain).await,
                None => key.clone(),
            };
            let node = self.resolver.resolve(value, None, Some(key)).await;
            categorical.entry(canonical_key).or_insert(node.concept_id);
        }
        canonical.categorical = categorical;

        canonical.min = self.canonicalize_constraints(&item.min).await;
        canonical.max = self.canonicalize_constraints(&item.max).await;
        canonical.range = self.canonicalize_constraints(&item.range).await;
        canonical
    }

    async fn canonicalize_exclusions(&self, exclusions: &[String]) -> Vec<String> {
        let mut canonical = Vec::with_capacity(exclusions.len());
        for exclusion in exclusions {
            let node = self.resolver.resolve(exclusion, None, None).await;
            canonical.push(node.concept_id);
        }
        canonical
    }

    async fn canonicalize_preferences(&self, preferences: &Preferences) -> Preferences {
        let mut canonical = preferences.clone();
        canonical.identity = self.canonicalize_typed_values(&preferences.identity).await;
        canonical.lifestyle = self.canonicalize_typed_values(&preferences.lifestyle).await;
        // habits stay verbatim: yes/no flags, not ontology.
        canonical.min = self.canonicalize_constraints(&preferences.min).await;
        canonical.max = self.canonicalize_constraints(&preferences.max).await;
        canonical.range = self.canonicalize_constraints(&preferences.range).await;
        canonical
    }

    async fn canonicalize_typed_values(&self, values: &[TypedValue]) -> Vec<TypedValue> {
        let mut canonical = Vec::with_capacity(values.len());
        for typed in values {
            if typed.value.trim().is_empty() {
                canonical.push(typed.clone());
                continue;
            }
            let node = self
                .resolver
                .resolve(&typed.value, None, typed.value_type.as_deref())
                .await;
            canonical.push(TypedValue {
                value_type: typed.value_type.clone(),
                value: node.concept_id,
            });
        }
        canonical
    }

    /// `cost` is currency-tagged; every other axis is unit-tagged. Values
    /// that fail to parse stay verbatim.
    async fn canonicalize_constraints(&self, constraints: &Constraints) -> Constraints {
        let mut canonical = Constraints::new();
        for (axis, attrs) in constraints {
            let mut canonical_attrs = Vec::with_capacity(attrs.len());
            for attr in attrs {
                let mut out = attr.clone();
                match (&attr.value, axis.as_str()) {
                    (Some(Value::String(raw)), "cost") => {
                        let hint = attr.currency.as_deref().or(attr.unit.as_deref());
                        if let Some(money) = self.quantities.resolve_currency(raw, hint) {
                            out.value = serde_json::Number::from_f64(money.value).map(Value::Number);
                            out.currency = Some(money.currency);
                            out.unit = None;
                        }
                    }
                    (Some(Value::Number(_)), "cost") => {
                        if out.currency.is_none() {
                            if let Some(unit) = &attr.unit {
                                let code = unit.trim().to_uppercase();
                                if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
                                {
                                    out.currency = Some(code);
                                    out.unit = None;
                                }
                            }
                        }
                    }
                    (Some(Value::String(raw)), _) => {
                        if let Some(quantity) = self.quantities.resolve(raw) {
                            out.value =
                                serde_json::Number::from_f64(quantity.value).map(Value::Number);
                            if !quantity.unit.is_empty() {
                                out.unit = Some(quantity.unit);
                            }
                        }
                    }
                    _ => {}
                }
                canonical_attrs.push(out);
            }
            canonical.insert(axis.clone(), canonical_attrs);
        }
        canonical
    }

    async fn canonicalize_location(&self, location: &Location) -> Location {
        let mut canonical = location.clone();

        canonical.name = location.name.as_ref().map(|n| n.to_lowercase());
        canonical.origin = location.origin.as_ref().map(|o| o.to_lowercase());
        canonical.destination = location.destination.as_ref().map(|d| d.to_lowercase());

        let Some(geocoder) = &self.geocoder else {
            return canonical;
        };

        if let Some(name) = &location.name {
            if let Some(point) = geocoder.geocode(name).await {
                canonical.coordinates = Some(point.coordinates());
                canonical.canonical_name = Some(point.canonical_name);
            }
        }
        if let Some(origin) = &location.origin {
            if let Some(point) = geocoder.geocode(origin).await {
                canonical.origin_coordinates = Some(point.coordinates());
                canonical.origin_canonical = Some(point.canonical_name);
            }
        }
        if let Some(destination) = &location.destination {
            if let Some(point) = geocoder.geocode(destination).await {
                canonical.destination_coordinates = Some(point.coordinates());
                canonical.destination_canonical = Some(point.canonical_name);
            }
        }
        canonical
    }

    /// The matcher-facing implication check, delegated to the resolver.
    pub async fn semantic_implies(&self, candidate_id: &str, required_id: &str) -> bool {
        self.resolver.semantic_implies(candidate_id, required_id).await
    }
}

/// Deep copy with string values lowercased: the shape downstream matching
/// receives when canonicalization itself fails.
pub fn lowercase_fallback(listing: &Listing) -> Listing {
    let mut fallback = listing.clone();
    fallback.domain = fallback.domain.iter().map(|d| d.to_lowercase()).collect();
    for item in &mut fallback.items {
        item.item_type = item.item_type.to_lowercase();
        item.categorical = item
            .categorical
            .iter()
            .map(|(k, v)| (k.clone(), v.to_lowercase()))
            .collect();
    }
    for list in [
        &mut fallback.item_exclusions,
        &mut fallback.other_party_exclusions,
        &mut fallback.self_exclusions,
        &mut fallback.location_exclusions,
    ] {
        *list = list.iter().map(|v| v.to_lowercase()).collect();
    }
    for preferences in [
        fallback.other_party_preferences.as_mut(),
        fallback.self_attributes.as_mut(),
    ]
    .into_iter()
    .flatten()
    {
        for typed in preferences
            .identity
            .iter_mut()
            .chain(preferences.lifestyle.iter_mut())
        {
            typed.value = typed.value.to_lowercase();
        }
    }
    fallback
}
