use std::alloc::Layout;
use std::ptr::NonNull;

use crate::{Error, Result};

/// Link header at the start of every unit. The payload follows at
/// [`UnitLayout::payload_offset()`].
///
/// The link is only meaningful while the unit is on the free list. Once the unit is handed out,
/// the caller owns the payload but the header stays ours - nothing the caller writes within the
/// payload can reach it.
#[derive(Debug)]
#[repr(C)]
pub(crate) struct UnitHeader {
    next: Option<NonNull<UnitHeader>>,

    #[cfg(debug_assertions)]
    state: UnitState,
}

/// Debug builds tag each unit so that double frees are caught instead of corrupting the list.
#[cfg(debug_assertions)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum UnitState {
    Free,
    Allocated,
}

/// Describes how units of a given element type are laid out within a page region.
///
/// Each unit is a [`UnitHeader`] followed by the element payload, padded so that consecutive
/// units keep both the header and the payload aligned. The stride is the fixed distance
/// between consecutive units.
///
/// # Examples
///
/// ```
/// use fixed_pool::UnitLayout;
///
/// let layout = UnitLayout::of::<u32>();
///
/// assert!(layout.stride() >= layout.payload_offset() + 4);
/// assert_eq!(layout.element_size(), 4);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnitLayout {
    stride: usize,
    payload_offset: usize,
    align: usize,
    element_size: usize,
}

impl UnitLayout {
    /// Calculates the unit layout for elements of type `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is a zero-sized type.
    #[must_use]
    pub fn of<T>() -> Self {
        let element_layout = Layout::new::<T>();

        assert!(
            element_layout.size() > 0,
            "FixedPool must have non-zero element size"
        );

        let (unit_layout, payload_offset) = Layout::new::<UnitHeader>()
            .extend(element_layout)
            .expect("layout extension cannot fail for types that exist in memory");

        let unit_layout = unit_layout.pad_to_align();

        Self {
            stride: unit_layout.size(),
            payload_offset,
            align: unit_layout.align(),
            element_size: element_layout.size(),
        }
    }

    /// The distance in bytes between the starts of consecutive units.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The offset in bytes from the start of a unit to its payload.
    #[must_use]
    pub fn payload_offset(&self) -> usize {
        self.payload_offset
    }

    /// The alignment of each unit.
    #[must_use]
    pub fn align(&self) -> usize {
        self.align
    }

    /// The size of the element type stored in the payload.
    #[must_use]
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// The number of bytes needed to host `units` consecutive units.
    pub(crate) fn bytes_for(&self, units: usize) -> Result<usize> {
        self.stride
            .checked_mul(units)
            .ok_or(Error::CapacityOverflow { units })
    }

    /// Returns the unit with the given index in a region starting at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be aligned to [`align()`](Self::align) and the region must be at least
    /// [`bytes_for(index + 1)`](Self::bytes_for) bytes long.
    pub(crate) unsafe fn unit_at(&self, base: NonNull<u8>, index: usize) -> NonNull<UnitHeader> {
        // SAFETY: Forwarding guarantees from the caller - the offset stays within the region.
        unsafe { base.byte_add(self.stride.wrapping_mul(index)) }.cast()
    }

    /// Returns the payload of a unit.
    ///
    /// # Safety
    ///
    /// `unit` must point to a unit laid out according to this layout.
    pub(crate) unsafe fn payload_of(&self, unit: NonNull<UnitHeader>) -> NonNull<u8> {
        // SAFETY: The payload lies within the same unit, as guaranteed by the caller.
        unsafe { unit.byte_add(self.payload_offset) }.cast()
    }

    /// Recovers the unit that a payload belongs to. This is the inverse of
    /// [`payload_of()`](Self::payload_of).
    ///
    /// # Safety
    ///
    /// `payload` must have been returned by [`payload_of()`](Self::payload_of) on a unit
    /// laid out according to this layout.
    pub(crate) unsafe fn unit_of(&self, payload: NonNull<u8>) -> NonNull<UnitHeader> {
        // SAFETY: The header lies within the same unit, as guaranteed by the caller.
        unsafe { payload.byte_sub(self.payload_offset) }.cast()
    }
}

/// An intrusive, singly linked, last-in-first-out list of vacant units.
///
/// The list does not own the units - they are owned by the page regions they live in. None of
/// the operations are synchronized; the pool only touches the list while holding its lock.
#[derive(Debug, Default)]
pub(crate) struct FreeList {
    head: Option<NonNull<UnitHeader>>,
    len: usize,
}

impl FreeList {
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Adds a freshly carved unit whose header has never been initialized.
    ///
    /// # Safety
    ///
    /// `unit` must point to writable, suitably aligned memory for a [`UnitHeader`] that is not
    /// used for anything else for as long as the unit remains in the list.
    pub(crate) unsafe fn push_new(&mut self, unit: NonNull<UnitHeader>) {
        // SAFETY: Forwarding guarantees from the caller.
        unsafe {
            unit.write(UnitHeader {
                next: self.head,
                #[cfg(debug_assertions)]
                state: UnitState::Free,
            });
        }

        self.link_head(unit);
    }

    /// Returns a previously popped unit to the list. The unit becomes the new head.
    ///
    /// # Safety
    ///
    /// `unit` must have been returned by [`pop()`](Self::pop) on this list and must not have
    /// been pushed back since.
    pub(crate) unsafe fn push(&mut self, unit: NonNull<UnitHeader>) {
        // SAFETY: The caller guarantees this is one of our units, so the header is valid and we
        // have exclusive access to it while holding `&mut self`.
        let header = unsafe { &mut *unit.as_ptr() };

        #[cfg(debug_assertions)]
        {
            assert_eq!(
                header.state,
                UnitState::Allocated,
                "unit {unit:?} freed while already free (double free)"
            );
            header.state = UnitState::Free;
        }

        header.next = self.head;

        self.link_head(unit);
    }

    /// Removes and returns the most recently pushed unit, or `None` if the list is empty.
    pub(crate) fn pop(&mut self) -> Option<NonNull<UnitHeader>> {
        let unit = self.head?;

        // SAFETY: Every unit in the list was pushed through one of the push methods, whose
        // contracts keep the header valid and exclusively ours while it is in the list.
        let header = unsafe { &mut *unit.as_ptr() };

        self.head = header.next.take();
        self.len = self
            .len
            .checked_sub(1)
            .expect("length cannot underflow while the list has a head");

        #[cfg(debug_assertions)]
        {
            header.state = UnitState::Allocated;
        }

        Some(unit)
    }

    fn link_head(&mut self, unit: NonNull<UnitHeader>) {
        self.head = Some(unit);
        self.len = self
            .len
            .checked_add(1)
            .expect("free list cannot hold more units than fit in the address space");
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::mem;

    use super::*;

    /// Units carved from an ordinary heap buffer, standing in for a page region.
    struct Units {
        buffer: Vec<u64>,
        layout: UnitLayout,
    }

    impl Units {
        fn new<T>(count: usize) -> Self {
            let layout = UnitLayout::of::<T>();
            assert!(layout.align() <= mem::align_of::<u64>());

            let words = layout.bytes_for(count).unwrap().div_ceil(size_of::<u64>());

            Self {
                buffer: vec![0; words],
                layout,
            }
        }

        fn unit(&mut self, index: usize) -> NonNull<UnitHeader> {
            let base = NonNull::new(self.buffer.as_mut_ptr().cast::<u8>()).unwrap();

            // SAFETY: The buffer was sized for the requested number of units.
            unsafe { self.layout.unit_at(base, index) }
        }
    }

    #[test]
    fn stride_covers_header_and_element() {
        let layout = UnitLayout::of::<u32>();

        assert_eq!(layout.payload_offset(), size_of::<UnitHeader>());
        assert!(layout.stride() >= size_of::<UnitHeader>() + size_of::<u32>());
        assert_eq!(layout.stride() % layout.align(), 0);
        assert_eq!(layout.element_size(), 4);
    }

    #[test]
    fn payload_is_aligned_for_element() {
        #[repr(align(32))]
        struct Wide {
            _value: u8,
        }

        let layout = UnitLayout::of::<Wide>();

        assert_eq!(layout.payload_offset() % 32, 0);
        assert_eq!(layout.stride() % 32, 0);
        assert_eq!(layout.align(), 32);
    }

    #[test]
    #[should_panic]
    fn zero_sized_element_panics() {
        let _layout = UnitLayout::of::<()>();
    }

    #[test]
    fn bytes_for_detects_overflow() {
        let layout = UnitLayout::of::<u64>();

        assert_eq!(layout.bytes_for(3).unwrap(), 3 * layout.stride());
        assert!(matches!(
            layout.bytes_for(usize::MAX),
            Err(Error::CapacityOverflow { units: usize::MAX })
        ));
    }

    #[test]
    fn payload_and_unit_are_inverse() {
        let mut units = Units::new::<u64>(4);
        let layout = units.layout;

        for index in 0..4 {
            let unit = units.unit(index);

            // SAFETY: The unit was carved using this layout.
            let payload = unsafe { layout.payload_of(unit) };
            // SAFETY: The payload came from payload_of() with this layout.
            let recovered = unsafe { layout.unit_of(payload) };

            assert_eq!(recovered, unit);
            assert_eq!(
                payload.as_ptr() as usize - unit.as_ptr() as usize,
                layout.payload_offset()
            );
        }
    }

    #[test]
    fn units_are_one_stride_apart() {
        let mut units = Units::new::<u32>(3);
        let stride = units.layout.stride();

        let a = units.unit(0).as_ptr() as usize;
        let b = units.unit(1).as_ptr() as usize;
        let c = units.unit(2).as_ptr() as usize;

        assert_eq!(b - a, stride);
        assert_eq!(c - b, stride);
    }

    #[test]
    fn pop_on_empty_returns_none() {
        let mut list = FreeList::default();

        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert!(list.pop().is_none());
    }

    #[test]
    fn free_list_is_lifo() {
        let mut units = Units::new::<u32>(3);
        let mut list = FreeList::default();

        let a = units.unit(0);
        let b = units.unit(1);
        let c = units.unit(2);

        // SAFETY: Each unit is distinct, aligned and lives as long as the list.
        unsafe {
            list.push_new(a);
            list.push_new(b);
            list.push_new(c);
        }

        assert_eq!(list.len(), 3);
        assert_eq!(list.pop(), Some(c));
        assert_eq!(list.pop(), Some(b));

        // SAFETY: `c` and `b` were popped from this list and not yet pushed back.
        unsafe {
            list.push(c);
            list.push(b);
        }

        assert_eq!(list.len(), 3);
        assert_eq!(list.pop(), Some(b));
        assert_eq!(list.pop(), Some(c));
        assert_eq!(list.pop(), Some(a));
        assert_eq!(list.pop(), None);
        assert!(list.is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn double_push_panics_in_debug_builds() {
        let mut units = Units::new::<u32>(1);
        let mut list = FreeList::default();

        let a = units.unit(0);

        // SAFETY: The unit is aligned and lives as long as the list.
        unsafe {
            list.push_new(a);
        }

        let popped = list.pop().unwrap();

        // SAFETY: Deliberately violating the contract on the second push to trigger the check.
        unsafe {
            list.push(popped);
            list.push(popped);
        }
    }
}
