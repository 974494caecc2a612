//! Internal utility types.

/// Marker type used when type-erasing stored values.
///
/// This zero-sized type stands in for the concrete value type behind pointers
/// whose pointee type has been erased. For example, `NonNull<Erased>` is the
/// address of a value in a box or union slot whose type is only known to the
/// operation table that accompanies it.
///
/// Using a distinct marker type (rather than `()` or `u8`) makes the intent
/// clearer in type signatures and error messages.
#[derive(Clone, Copy, Debug)]
pub struct Erased;
