use crate::post::PostSummary;

/// Posts on either side of the current one in the listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adjacent {
    pub previous: Option<PostSummary>,
    pub next: Option<PostSummary>,
}

/// Finds the neighbours of `uid` in `listing`, keeping the listing's order.
///
/// A uid missing from the listing (e.g. published after the snapshot was
/// taken) has no neighbours.
pub fn resolve_adjacent(listing: &[PostSummary], uid: &str) -> Adjacent {
    let Some(index) = listing.iter().position(|post| post.uid == uid) else {
        return Adjacent::default();
    };

    let previous = index.checked_sub(1).and_then(|i| listing.get(i)).cloned();
    let next = listing.get(index + 1).cloned();

    Adjacent { previous, next }
}
