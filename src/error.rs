use core::alloc::Layout;
use core::fmt;

/// The error type for the fallible `try_*` operations of
/// [`HashTable`](crate::HashTable).
///
/// A table that returns this error is left in a consistent state: every key
/// stored before the call is still stored with its previous value.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TryReserveError {
    /// The requested bucket count or buffer size overflowed `usize` or
    /// exceeded `isize::MAX` bytes.
    CapacityOverflow,

    /// The allocator returned an error.
    AllocError {
        /// The layout of the allocation request that failed.
        layout: Layout,
    },
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("memory allocation failed")?;
        match self {
            TryReserveError::CapacityOverflow => {
                f.write_str(" because the computed capacity exceeded the table's maximum")
            }
            TryReserveError::AllocError { layout } => write!(
                f,
                " because the allocator reported an error for {} bytes",
                layout.size()
            ),
        }
    }
}

impl core::error::Error for TryReserveError {}

/// Whether an allocation failure should surface as an error or abort.
#[derive(Clone, Copy)]
pub(crate) enum Fallibility {
    Fallible,
    Infallible,
}

impl Fallibility {
    #[inline]
    pub(crate) fn capacity_overflow(self) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::CapacityOverflow,
            Fallibility::Infallible => panic!("hash table capacity overflow"),
        }
    }

    #[inline]
    pub(crate) fn alloc_err(self, layout: Layout) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::AllocError { layout },
            Fallibility::Infallible => alloc::alloc::handle_alloc_error(layout),
        }
    }
}
