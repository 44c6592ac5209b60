//! Content-based deduplication of resolved product records.
//!
//! A single linear pass over the candidates in arrival order: the first
//! record seen for a fingerprint wins, later ones are dropped. The pass is
//! stable and idempotent.

use std::collections::HashSet;

use crate::CanonicalProduct;

/// Collapse records that resolve to the same real-world product.
pub fn dedup(products: Vec<CanonicalProduct>) -> Vec<CanonicalProduct> {
    let mut seen = HashSet::with_capacity(products.len());
    let mut output = Vec::with_capacity(products.len());

    for product in products {
        if seen.insert(product.fingerprint()) {
            output.push(product);
        }
    }

    output
}
