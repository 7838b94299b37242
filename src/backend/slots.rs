//! Slot arrays for the fixed-capacity store
//!
//! A slot array is a pre-allocated block of atomic integers addressed by a
//! 1-based slot index in `[1, capacity]`. The fixed-capacity algorithm is
//! written against [`SlotArray`]; the two layouts only change how a single
//! slot's value is physically held.
//!
//! ```text
//!  AtomicSlots                     StripedSlots (stripes = 4)
//!  ┌────┬────┬────┬────┐           stripe 0  ┌────┬────┬────┬────┐ ◄── thread 0, 4, ..
//!  │ s1 │ s2 │ s3 │ .. │           stripe 1  ├────┼────┼────┼────┤ ◄── thread 1, 5, ..
//!  └────┴────┴────┴────┘           stripe 2  ├────┼────┼────┼────┤
//!   one AtomicI64 per slot         stripe 3  └────┴────┴────┴────┘
//!                                  value(s) = Σ stripe[i][s]
//! ```

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;

use super::BackendKind;

/// Storage for the values of one namespace in a fixed-capacity store
///
/// Indices are 1-based. Callers guarantee `1 <= index <= len()`.
pub trait SlotArray: Send + Sync + Sized {
    /// Backend kind reported by stores using this layout
    const KIND: BackendKind;

    /// Allocate `len` zeroed slots. `stripes` is ignored by layouts that
    /// do not stripe.
    fn allocate(len: usize, stripes: usize) -> Self;

    /// Number of slots
    fn len(&self) -> usize;

    /// Current value of a slot
    fn load(&self, index: usize) -> i64;

    /// Overwrite a slot
    fn store(&self, index: usize, value: i64);

    /// Add `delta` and return the resulting value
    fn add(&self, index: usize, delta: i64) -> i64;

    /// Replace the value if it equals `expected`.
    /// `Ok(new)` on success, `Err(current)` otherwise.
    fn compare_exchange(&self, index: usize, expected: i64, new: i64) -> Result<i64, i64>;

    /// Zero every slot
    fn zero_all(&self) {
        for index in 1..=self.len() {
            self.store(index, 0);
        }
    }
}

// =============================================================================
// Balanced Layout
// =============================================================================

/// One `AtomicI64` per slot
///
/// Every operation, including compare-and-swap, is a single hardware atomic.
pub struct AtomicSlots {
    slots: Box<[AtomicI64]>,
}

impl SlotArray for AtomicSlots {
    const KIND: BackendKind = BackendKind::Balanced;

    fn allocate(len: usize, _stripes: usize) -> Self {
        Self {
            slots: (0..len).map(|_| AtomicI64::new(0)).collect(),
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn load(&self, index: usize) -> i64 {
        self.slots[index - 1].load(Ordering::SeqCst)
    }

    #[inline]
    fn store(&self, index: usize, value: i64) {
        self.slots[index - 1].store(value, Ordering::SeqCst);
    }

    #[inline]
    fn add(&self, index: usize, delta: i64) -> i64 {
        self.slots[index - 1]
            .fetch_add(delta, Ordering::SeqCst)
            .wrapping_add(delta)
    }

    #[inline]
    fn compare_exchange(&self, index: usize, expected: i64, new: i64) -> Result<i64, i64> {
        self.slots[index - 1]
            .compare_exchange(expected, new, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| new)
    }
}

// =============================================================================
// Write-Optimized Layout
// =============================================================================

/// Global counter for assigning stripe IDs to threads.
static NEXT_STRIPE_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    /// Stripe ID of the current thread, assigned lazily on first write.
    static THREAD_STRIPE_ID: usize = NEXT_STRIPE_ID.fetch_add(1, Ordering::Relaxed);
}

/// Slots split into per-thread stripes
///
/// Writers add into the stripe chosen by their thread ID, so concurrent
/// writers to the same key rarely touch the same cache line. Reads sum every
/// stripe. `store` and `compare_exchange` touch all stripes without a common
/// atomic, so they are only exact when no other writer races them.
pub struct StripedSlots {
    len: usize,
    stripes: Box<[CachePadded<Box<[AtomicI64]>>]>,
}

impl StripedSlots {
    /// Stripe written by the current thread
    #[inline]
    fn local_stripe(&self) -> &[AtomicI64] {
        let id = THREAD_STRIPE_ID.with(|id| *id);
        &self.stripes[id % self.stripes.len()]
    }

    /// Number of stripes
    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }
}

impl SlotArray for StripedSlots {
    const KIND: BackendKind = BackendKind::WriteOptimized;

    fn allocate(len: usize, stripes: usize) -> Self {
        let stripes = stripes.max(1);
        Self {
            len,
            stripes: (0..stripes)
                .map(|_| {
                    CachePadded::new((0..len).map(|_| AtomicI64::new(0)).collect::<Box<[_]>>())
                })
                .collect(),
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn load(&self, index: usize) -> i64 {
        self.stripes
            .iter()
            .map(|stripe| stripe[index - 1].load(Ordering::Relaxed))
            .fold(0i64, i64::wrapping_add)
    }

    fn store(&self, index: usize, value: i64) {
        for stripe in self.stripes.iter().skip(1) {
            stripe[index - 1].store(0, Ordering::Relaxed);
        }
        self.stripes[0][index - 1].store(value, Ordering::Relaxed);
    }

    #[inline]
    fn add(&self, index: usize, delta: i64) -> i64 {
        self.local_stripe()[index - 1].fetch_add(delta, Ordering::Relaxed);
        self.load(index)
    }

    fn compare_exchange(&self, index: usize, expected: i64, new: i64) -> Result<i64, i64> {
        let current = self.load(index);
        if current != expected {
            return Err(current);
        }
        self.store(index, new);
        Ok(new)
    }
}
