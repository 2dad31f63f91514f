use thiserror::Error;

/// Result alias used throughout the allocator.
pub type AllocResult<T> = Result<T, AllocError>;

/// Failures reported by the allocator.
///
/// All failures are synchronous and leave no partial state behind: an arena is
/// spliced into the allocator only after its mapping fully succeeded, and
/// overflow is detected before any memory is touched. There is no retry
/// policy; the caller decides whether to try again with different parameters.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  /// Zero-size allocations are a defined failure, not a zero-byte allocation.
  #[error("zero-size allocations are not supported")]
  ZeroSize,

  /// A requested or derived size (payload rounding, header accounting,
  /// element count multiplication, page count) would wrap past `usize::MAX`.
  #[error("requested size overflows allocator arithmetic")]
  Overflow,

  /// The operating system refused to provide the requested mapping.
  #[error("operating system refused a mapping of {bytes} bytes")]
  MappingFailed { bytes: usize },
}
