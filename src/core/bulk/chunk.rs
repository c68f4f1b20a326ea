//! Splitting record sets into API-sized chunks

use std::num::NonZeroUsize;

/// Splits `items` into ordered slices of `size`; the last one may be shorter.
///
/// Empty input yields no chunks, so callers issue no remote calls for it.
///
/// ```
/// use kinsync::core::bulk::chunk::chunks;
/// use std::num::NonZeroUsize;
///
/// let ids = [1, 2, 3, 4, 5];
/// let parts = chunks(&ids, NonZeroUsize::new(2).unwrap());
/// assert_eq!(parts, vec![&[1, 2][..], &[3, 4][..], &[5][..]]);
/// ```
pub fn chunks<T>(items: &[T], size: NonZeroUsize) -> Vec<&[T]> {
    items.chunks(size.get()).collect()
}
