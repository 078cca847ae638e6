//! Fetch a product's quick view fragment.

use dcl_core::ProductId;
use dcl_storefront::dom::Document;
use dcl_storefront::error::AppError;
use dcl_storefront::state::AppState;

/// Fetch the fragment. With `text`, markup is stripped and whitespace
/// collapsed.
///
/// # Errors
///
/// Returns an error if the request fails or the fragment cannot be parsed.
pub async fn run(state: &AppState, product: &ProductId, text: bool) -> Result<String, AppError> {
    let fragment = state.storefront().quick_view(product).await?;
    if !text {
        return Ok(fragment);
    }
    plain_text(&fragment)
}

fn plain_text(fragment: &str) -> Result<String, AppError> {
    let doc = Document::from_html(fragment)?;
    Ok(doc
        .text_content(doc.body())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" "))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_collapses_markup() {
        let text = plain_text(
            r#"<div class="col-md-6"><h3>Silk Scarf</h3>
               <p class="price">৳19.99</p>
               <button class="add-to-cart-btn" data-variant-id="42">Add to Cart</button></div>"#,
        )
        .unwrap();
        assert_eq!(text, "Silk Scarf ৳19.99 Add to Cart");
    }
}
