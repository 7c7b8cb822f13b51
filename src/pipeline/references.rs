//! Reference bundle: the style anchors attached to a page request.
//!
//! Order is fixed: global reference, page-specific reference, previous
//! page's result.

use super::encode::ImageData;

/// Assemble the ordered reference images for one page, skipping absent ones.
pub fn build_references(
    global: Option<&ImageData>,
    page: Option<&ImageData>,
    previous: Option<&ImageData>,
) -> Vec<ImageData> {
    [global, page, previous]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(tag: u8) -> ImageData {
        ImageData::new("image/png", vec![tag])
    }

    #[test]
    fn all_present_in_fixed_order() {
        let (g, p, r) = (img(1), img(2), img(3));
        let refs = build_references(Some(&g), Some(&p), Some(&r));
        assert_eq!(refs, vec![g, p, r]);
    }

    #[test]
    fn missing_global_leaves_no_gap() {
        let (p, r) = (img(2), img(3));
        let refs = build_references(None, Some(&p), Some(&r));
        assert_eq!(refs, vec![p, r]);
    }

    #[test]
    fn global_and_previous_only() {
        let (g, r) = (img(1), img(3));
        assert_eq!(build_references(Some(&g), None, Some(&r)), vec![g, r]);
    }

    #[test]
    fn nothing_present_is_empty() {
        assert!(build_references(None, None, None).is_empty());
    }
}
