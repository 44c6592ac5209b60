//! Image backfill for resolved product records.
//!
//! Runs once, after deduplication, so the secondary image search is paid per
//! unique product rather than per raw candidate. Records are never mutated;
//! an enriched record is a copy with updated media.

use tracing::{debug, warn};

use crate::data_source::{ImageSearchRequest, ProductSource};
use crate::{CanonicalProduct, ProductMedia};

/// URL fragments that mark a candidate image as likely brand artwork rather
/// than a product photo.
pub const SUSPICIOUS_URL_MARKERS: [&str; 5] = ["logo", "icon", "assets", "favicon", "svg"];

/// Reject likely logo/icon URLs from being used as product photos.
pub fn is_suspicious_image_url(url: &str) -> bool {
    let lowered = url.to_lowercase();
    SUSPICIOUS_URL_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// A record needs backfill when it has no front image at all or only a
/// placeholder asset.
pub fn needs_image_backfill(product: &CanonicalProduct) -> bool {
    let front = &product.media.front_image;
    front.is_empty() || front.contains("placeholder")
}

/// Backfill missing or placeholder imagery via a secondary image search.
///
/// One lookup per record that needs it, keyed `"{name} {brand}"`, requesting
/// a single candidate. A suspicious candidate or a failed lookup leaves the
/// record unchanged; enrichment never fails the resolution.
pub async fn backfill_images(
    source: &dyn ProductSource,
    products: Vec<CanonicalProduct>,
) -> Vec<CanonicalProduct> {
    let mut output = Vec::with_capacity(products.len());

    for product in products {
        if !needs_image_backfill(&product) {
            output.push(product);
            continue;
        }

        let query = format!("{} {}", product.identity.name, product.identity.brand);
        let request = match ImageSearchRequest::new(query.trim(), 1) {
            Ok(request) => request,
            Err(_) => {
                output.push(product);
                continue;
            }
        };

        match source.image_search(request).await {
            Ok(urls) => {
                let replacement = urls
                    .into_iter()
                    .find(|url| !url.is_empty() && !is_suspicious_image_url(url));
                match replacement {
                    Some(url) => {
                        debug!(product = %product.id, "backfilled product image");
                        output.push(product.with_media(ProductMedia {
                            front_image: url.clone(),
                            thumbnail: url,
                        }));
                    }
                    None => output.push(product),
                }
            }
            Err(error) => {
                warn!(product = %product.id, error = %error, "image backfill lookup failed");
                output.push(product);
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProductIdentity;

    #[test]
    fn rejects_logo_and_icon_urls_case_insensitively() {
        assert!(is_suspicious_image_url("https://cdn.example.com/brand/LOGO.png"));
        assert!(is_suspicious_image_url("https://example.com/favicon.ico"));
        assert!(is_suspicious_image_url("https://example.com/img.SVG"));
        assert!(is_suspicious_image_url("https://static.example.com/assets/photo.jpg"));
        assert!(is_suspicious_image_url("https://example.com/icons/cart.png"));
    }

    #[test]
    fn accepts_plain_product_photo_url() {
        assert!(!is_suspicious_image_url(
            "https://images.example.com/products/granola-front.jpg"
        ));
    }

    #[test]
    fn placeholder_media_needs_backfill() {
        let mut product = CanonicalProduct::new(
            "1",
            ProductIdentity {
                name: String::from("Granola"),
                ..ProductIdentity::default()
            },
        )
        .expect("valid product");

        assert!(needs_image_backfill(&product));

        product.media.front_image = String::from("https://cdn.example.com/placeholder-food.png");
        assert!(needs_image_backfill(&product));

        product.media.front_image = String::from("https://cdn.example.com/granola.jpg");
        assert!(!needs_image_backfill(&product));
    }
}
