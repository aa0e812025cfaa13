//! # Bundle Resolver
//!
//! Maps bundle products to their fixed component lists and expands carts
//! into net per-leaf quantity requirements.
//!
//! ## Expansion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Catalog                         Cart                                   │
//! │  ───────                         ────                                   │
//! │  Kit Depa (100) = 2 × Caja (1)   Kit Depa   × 3                         │
//! │                 + 1 × Diablito(2) Caja      × 4                         │
//! │                                                                         │
//! │  expand() ──► { Caja: 2×3 + 4 = 10, Diablito: 1×3 = 3 }                 │
//! │                                                                         │
//! │  Same leaf reached twice? Contributions are SUMMED, never overwritten.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Compositions never nest: a component is always a leaf. The catalog
//! enforces that when it is built, so `expand` only ever looks one level
//! deep.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::CartItem;

/// One `{component, quantity per bundle unit}` entry of a composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleComponent {
    pub component_id: i64,
    pub quantity: i64,
}

impl BundleComponent {
    pub const fn new(component_id: i64, quantity: i64) -> Self {
        BundleComponent {
            component_id,
            quantity,
        }
    }
}

/// The minimal cart shape the resolver needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i64,
}

impl CartLine {
    pub const fn new(product_id: i64, quantity: i64) -> Self {
        CartLine {
            product_id,
            quantity,
        }
    }
}

impl From<&CartItem> for CartLine {
    fn from(item: &CartItem) -> Self {
        CartLine::new(item.product_id, item.quantity)
    }
}

/// Immutable registry of bundle compositions.
#[derive(Debug, Clone, Default)]
pub struct BundleCatalog {
    compositions: HashMap<i64, Vec<BundleComponent>>,
    /// Products flagged as bundles in the catalog, with or without a
    /// registered composition.
    bundle_ids: HashSet<i64>,
}

impl BundleCatalog {
    /// Builds a catalog from `(bundle_id, components)` pairs.
    ///
    /// ## Errors
    /// `InvalidComposition` when a bundle lists another bundle as a
    /// component, lists a non-positive quantity, or is empty.
    pub fn new<I>(compositions: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (i64, Vec<BundleComponent>)>,
    {
        let compositions: HashMap<i64, Vec<BundleComponent>> = compositions.into_iter().collect();
        let bundle_ids = compositions.keys().copied().collect();
        Self::with_bundle_ids(compositions, bundle_ids)
    }

    /// Builds a catalog where some bundle ids may lack a composition.
    ///
    /// Bundles without a composition are kept so that `expand` can report
    /// them instead of silently treating them as leaves.
    pub fn with_bundle_ids(
        compositions: HashMap<i64, Vec<BundleComponent>>,
        mut bundle_ids: HashSet<i64>,
    ) -> CoreResult<Self> {
        bundle_ids.extend(compositions.keys().copied());

        for (bundle_id, components) in &compositions {
            if components.is_empty() {
                return Err(CoreError::invalid_composition(
                    *bundle_id,
                    "composition has no components",
                ));
            }
            for component in components {
                if bundle_ids.contains(&component.component_id) {
                    return Err(CoreError::invalid_composition(
                        *bundle_id,
                        format!("component {} is itself a bundle", component.component_id),
                    ));
                }
                if component.quantity <= 0 {
                    return Err(CoreError::invalid_composition(
                        *bundle_id,
                        format!(
                            "component {} has non-positive quantity {}",
                            component.component_id, component.quantity
                        ),
                    ));
                }
            }
        }

        Ok(BundleCatalog {
            compositions,
            bundle_ids,
        })
    }

    pub fn is_bundle(&self, product_id: i64) -> bool {
        self.bundle_ids.contains(&product_id)
    }

    /// Returns the ordered components of a bundle, if registered.
    pub fn components(&self, bundle_id: i64) -> Option<&[BundleComponent]> {
        self.compositions.get(&bundle_id).map(Vec::as_slice)
    }

    /// Expands cart lines into `leaf_product_id → total quantity`.
    ///
    /// Pure and deterministic; the map is ordered by product id so callers
    /// lock and check leaves in a stable order.
    pub fn expand(&self, lines: &[CartLine]) -> CoreResult<BTreeMap<i64, i64>> {
        let mut needs: BTreeMap<i64, i64> = BTreeMap::new();

        for line in lines {
            if !self.is_bundle(line.product_id) {
                add_need(&mut needs, line.product_id, line.quantity)
                    .ok_or_else(|| CoreError::invalid_cart("quantity overflow"))?;
                continue;
            }

            let components = self.components(line.product_id).ok_or_else(|| {
                CoreError::invalid_composition(line.product_id, "no components registered")
            })?;

            for component in components {
                component
                    .quantity
                    .checked_mul(line.quantity)
                    .and_then(|qty| add_need(&mut needs, component.component_id, qty))
                    .ok_or_else(|| {
                        CoreError::invalid_composition(line.product_id, "quantity overflow")
                    })?;
            }
        }

        Ok(needs)
    }

    /// Convenience wrapper over [`BundleCatalog::expand`] for cart items.
    pub fn expand_cart(&self, items: &[CartItem]) -> CoreResult<BTreeMap<i64, i64>> {
        let lines: Vec<CartLine> = items.iter().map(CartLine::from).collect();
        self.expand(&lines)
    }
}

/// Adds `qty` to the need for `product_id`. `None` on overflow.
fn add_need(needs: &mut BTreeMap<i64, i64>, product_id: i64, qty: i64) -> Option<()> {
    let total = needs.entry(product_id).or_insert(0);
    *total = total.checked_add(qty)?;
    Some(())
}

// =============================================================================
// Unit Tests
// =============================================================================
