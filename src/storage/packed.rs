use std::mem::MaybeUninit;

use bitvec::prelude::BitVec;

use crate::config::GROWTH_FACTOR;

/// An index into a [`Packed`] array.
///
/// A slot keeps its index for as long as it is live,
/// even when the backing buffer is reallocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(u32);

impl Slot {
    fn new(index: usize) -> Self { Self(index.try_into().expect("Too many component slots")) }

    /// The position of this slot in the packed array.
    pub fn index(self) -> usize { self.0.try_into().expect("usize >= u32") }
}

/// Contiguous storage for components of one type, with free slot recycling.
///
/// References returned by [`get`](Self::get) cannot outlive the next allocation,
/// because allocation may reallocate the backing buffer.
/// Callers that need to refer to a component across allocations keep the [`Slot`] instead.
pub struct Packed<C> {
    /// `data[i]` is initialized if and only if `live[i]` is set.
    data: Vec<MaybeUninit<C>>,
    live: BitVec,
    /// Slots that were freed and can be handed out again. Used as a stack.
    free: Vec<Slot>,
}

impl<C> Default for Packed<C> {
    fn default() -> Self { Self::with_capacity(0) }
}

impl<C> Packed<C> {
    /// Creates an empty array with space reserved for `capacity` components.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            live: BitVec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    /// The number of slots ever handed out, including free ones.
    pub fn len(&self) -> usize { self.data.len() }

    /// Returns `true` if no slot has ever been allocated.
    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// The number of slots that currently hold a component.
    pub fn live(&self) -> usize { self.live.count_ones() }

    /// The number of slots the current buffer can hold without reallocation.
    pub fn capacity(&self) -> usize { self.data.capacity() }

    /// The number of slots waiting to be reused.
    pub fn free_slots(&self) -> usize { self.free.len() }

    /// Stores `value` in a free slot, growing the array if there is none.
    pub fn allocate(&mut self, value: C) -> Slot {
        if let Some(slot) = self.free.pop() {
            let index = slot.index();
            self.data[index] = MaybeUninit::new(value);
            self.live.set(index, true);
            return slot;
        }

        if self.data.len() == self.data.capacity() {
            self.grow();
        }

        let slot = Slot::new(self.data.len());
        self.data.push(MaybeUninit::new(value));
        self.live.push(true);
        slot
    }

    fn grow(&mut self) {
        let old = self.data.capacity();
        let new = old.max(1).checked_mul(GROWTH_FACTOR).expect("Packed array capacity overflow");
        self.data.reserve_exact(new - self.data.len());
        log::trace!(
            "Grow packed array of {} from {old} to {} slots",
            std::any::type_name::<C>(),
            self.data.capacity()
        );
    }

    fn is_live(&self, slot: Slot) -> bool {
        match self.live.get(slot.index()) {
            Some(bit) => *bit,
            None => false,
        }
    }

    /// Gets the component in a live slot.
    pub fn get(&self, slot: Slot) -> Option<&C> {
        if self.is_live(slot) {
            let value = self.data.get(slot.index()).expect("live bits mismatch");
            // Safety: the live bit is set, so the slot is initialized.
            Some(unsafe { value.assume_init_ref() })
        } else {
            None
        }
    }

    /// Gets the component in a live slot mutably.
    pub fn get_mut(&mut self, slot: Slot) -> Option<&mut C> {
        if self.is_live(slot) {
            let value = self.data.get_mut(slot.index()).expect("live bits mismatch");
            // Safety: the live bit is set, so the slot is initialized.
            Some(unsafe { value.assume_init_mut() })
        } else {
            None
        }
    }

    /// Overwrites the component in a live slot, returning the old value.
    ///
    /// # Panics
    /// Panics if the slot is not live.
    pub fn replace(&mut self, slot: Slot, value: C) -> C {
        let current = match self.get_mut(slot) {
            Some(current) => current,
            None => panic!("Cannot replace the component in free slot {slot:?}"),
        };
        std::mem::replace(current, value)
    }

    /// Moves the component out of a live slot and queues the slot for reuse.
    ///
    /// Returns `None` without side effects if the slot is not live.
    pub fn free(&mut self, slot: Slot) -> Option<C> {
        if !self.is_live(slot) {
            return None;
        }

        self.live.set(slot.index(), false);
        self.free.push(slot);

        let value = self.data.get(slot.index()).expect("live bits mismatch");
        // Safety: the slot was live, and the live bit has been cleared,
        // so the value will not be read or dropped again.
        Some(unsafe { value.assume_init_read() })
    }

    /// Returns a pointer to the first slot, for disjoint mutable access by slot.
    pub(super) fn base_ptr_mut(&mut self) -> *mut MaybeUninit<C> { self.data.as_mut_ptr() }
}

impl<C> Drop for Packed<C> {
    fn drop(&mut self) {
        for index in self.live.iter_ones() {
            let value = self.data.get_mut(index).expect("live bits mismatch");
            // Safety: each live slot is initialized and dropped exactly once here.
            unsafe { value.assume_init_drop() };
        }
    }
}
