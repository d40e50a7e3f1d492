//! “Integer allocation”: handing out small integers not currently in use
//! for the same purpose, such as body and behavior ids.

use core::fmt::Debug;

use num_traits::int::PrimInt;

/// An integer allocator; that is, an algorithm for solving the problem
/// “give me an integer that nobody else is currently using”, as tracked
/// by the allocator.
///
/// Freed integers are recycled before new ones are handed out, so id values
/// stay small for the lifetime of a world no matter how many bodies come and
/// go. While this is parameterized over all primitive integers, it will not
/// allocate negative values.
#[derive(Clone, Debug)]
pub(crate) struct IntAllocator<T: PrimInt + Debug> {
    /// All larger integers are free. If `None`, then zero has not been allocated.
    last_allocated: Option<T>,
    /// Integers ≤ [`Self::last_allocated`] that have been freed.
    free_list: Vec<T>,
}

impl<T: PrimInt + Debug> IntAllocator<T> {
    pub fn new() -> Self {
        Self {
            last_allocated: None,
            free_list: Vec::new(),
        }
    }

    /// Returns an integer not currently allocated, or `None` if all nonnegative
    /// integers of type `T` are already allocated.
    pub fn allocate(&mut self) -> Option<T> {
        if let Some(free) = self.free_list.pop() {
            Some(free)
        } else if let Some(last) = self.last_allocated {
            if let Some(next) = last.checked_add(&T::one()) {
                self.last_allocated = Some(next);
                self.last_allocated
            } else {
                // Ran out of integers.
                None
            }
        } else {
            // Allocate zero.
            self.last_allocated = Some(T::zero());
            self.last_allocated
        }
    }

    /// Makes a previously allocated integer available for use.
    ///
    /// Caution: passing an integer not currently allocated will corrupt the state and
    /// lead to overlapping allocations.
    pub fn free(&mut self, value: T) {
        assert!(
            value >= T::zero(),
            "tried to free a negative number: {value:?}"
        );
        if self.last_allocated == Some(value) {
            self.last_allocated = if value > T::zero() {
                Some(value - T::one())
            } else {
                None
            }
        } else {
            self.free_list.push(value);
        }
    }
}

impl<T: PrimInt + Debug> Default for IntAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}
