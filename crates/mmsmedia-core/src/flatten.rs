//! Container expansion into a flat sequence of leaf parts.

use mmsmedia_mime::Part;

/// Multipart types whose children are folded into the parent sequence.
pub const CONTAINER_TYPES: [&str; 4] = [
    "multipart/related",
    "multipart/alternative",
    "multipart/mixed",
    "multipart/appledouble",
];

/// Number of expansion passes.
///
/// Covers "alternative containing related containing leaves". Deeper
/// nesting is left partially expanded.
pub const FLATTEN_PASSES: usize = 2;

/// Returns `true` if the part is one of [`CONTAINER_TYPES`].
#[must_use]
pub fn is_container(part: &Part) -> bool {
    CONTAINER_TYPES.contains(&part.mime_type().as_str())
}

/// Expands containers in `parts`, [`FLATTEN_PASSES`] times.
///
/// Order is preserved apart from expansion; duplicates are kept.
#[must_use]
pub fn flatten<'a>(parts: Vec<&'a Part>) -> Vec<&'a Part> {
    (0..FLATTEN_PASSES).fold(parts, |parts, _| expand_once(&parts))
}

fn expand_once<'a>(parts: &[&'a Part]) -> Vec<&'a Part> {
    parts
        .iter()
        .flat_map(|&part| {
            if is_container(part) {
                part.children().iter().collect()
            } else {
                vec![part]
            }
        })
        .collect()
}

/// Returns the leaf parts of a message body.
///
/// Starts from the root's children when the root is multipart, otherwise
/// from the root itself.
#[must_use]
pub fn leaf_parts(root: &Part) -> Vec<&Part> {
    let top_level = if root.is_multipart() {
        root.children().iter().collect()
    } else {
        vec![root]
    };
    flatten(top_level)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use mmsmedia_mime::ContentType;
    use proptest::prelude::*;

    fn leaf(name: &str) -> Part {
        Part::new(
            ContentType::new("image", "jpeg").with_parameter("name", name),
            name.as_bytes().to_vec(),
        )
    }

    fn container(subtype: &str, children: Vec<Part>) -> Part {
        Part::multipart(ContentType::new("multipart", subtype), children)
    }

    fn names<'a>(parts: &[&'a Part]) -> Vec<&'a str> {
        parts
            .iter()
            .map(|p| p.header_subvalue("content-type", "name").unwrap_or("<container>"))
            .collect()
    }

    #[test]
    fn test_single_part_message() {
        let root = leaf("only.jpg");
        assert_eq!(names(&leaf_parts(&root)), ["only.jpg"]);
    }

    #[test]
    fn test_alternative_containing_related() {
        let root = container(
            "mixed",
            vec![
                leaf("a.jpg"),
                container(
                    "alternative",
                    vec![container("related", vec![leaf("b.jpg"), leaf("c.jpg")])],
                ),
                leaf("d.jpg"),
            ],
        );
        assert_eq!(names(&leaf_parts(&root)), ["a.jpg", "b.jpg", "c.jpg", "d.jpg"]);
    }

    #[test]
    fn test_two_pass_limit() {
        let deep = container(
            "mixed",
            vec![container("alternative", vec![container("related", vec![leaf("x.jpg")])])],
        );

        let flat = flatten(vec![&deep]);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].mime_type(), "multipart/related");
        assert!(is_container(flat[0]));
    }

    #[test]
    fn test_unknown_multipart_is_a_leaf() {
        let signed = container("signed", vec![leaf("inner.jpg")]);
        let flat = flatten(vec![&signed]);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].mime_type(), "multipart/signed");
    }

    #[test]
    fn test_duplicates_preserved() {
        let part = leaf("same.jpg");
        let flat = flatten(vec![&part, &part]);
        assert_eq!(names(&flat), ["same.jpg", "same.jpg"]);
    }

    proptest! {
        #[test]
        fn flat_input_maps_to_itself(files in proptest::collection::vec("[a-z]{1,8}\\.jpg", 0..8)) {
            let parts: Vec<Part> = files.iter().map(|f| leaf(f)).collect();
            let input: Vec<&Part> = parts.iter().collect();
            let output = flatten(input.clone());
            prop_assert_eq!(names(&output), names(&input));
        }
    }
}
