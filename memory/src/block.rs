use {
    crate::{error::MappingError, memory::Properties, util::fits_in},
    std::{
        mem::{align_of, size_of_val},
        ops::Range,
        ptr::NonNull,
    },
};

/// Block that owns a `Range` of the `Memory`.
/// Implementor must ensure that there can't be any other blocks
/// with overlapping range (either through type system or safety notes for unsafe functions).
pub trait Block<M> {
    /// Get memory properties of the block.
    fn properties(&self) -> Properties;

    /// Get raw memory object.
    fn memory(&self) -> M;

    /// Get memory range owned by this block.
    fn range(&self) -> Range<u64>;

    /// Get pointer to the beginning of the block if memory is mapped.
    fn ptr(&self) -> Option<NonNull<u8>>;

    /// Get size of the block.
    fn size(&self) -> u64 {
        let range = self.range();
        range.end - range.start
    }

    /// Copy `data` into the block at `offset` bytes from the block start.
    ///
    /// # Safety
    ///
    /// Device must not access the written range until the write completes.
    /// For non-coherent memory the range must be flushed before device reads it.
    unsafe fn write<T: Copy>(&mut self, offset: u64, data: &[T]) -> Result<(), MappingError> {
        if !self.properties().host_visible() {
            return Err(MappingError::HostInvisible);
        }
        let ptr = self.ptr().ok_or(MappingError::MappingFailed)?;
        let len = size_of_val(data) as u64;
        let end = offset.checked_add(len).ok_or(MappingError::OutOfBounds)?;
        if !fits_in(self.size(), &(offset..end)) {
            return Err(MappingError::OutOfBounds);
        }
        let dst = ptr.as_ptr().add(offset as usize);
        if (dst as usize) % align_of::<T>() != 0 {
            return Err(MappingError::Unaligned {
                align: align_of::<T>(),
                offset: offset as usize,
            });
        }
        std::ptr::copy_nonoverlapping(data.as_ptr(), dst as *mut T, data.len());
        Ok(())
    }
}
