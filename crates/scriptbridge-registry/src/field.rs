//! Data member accessors used by `add_data`.

/// Accessors for a data member `U` of a class `T`.
///
/// Usually built with the [`field!`](crate::field) macro.
pub struct Field<T, U> {
    pub(crate) get: fn(&T) -> &U,
    pub(crate) get_mut: fn(&mut T) -> &mut U,
}

impl<T, U> Field<T, U> {
    pub fn new(get: fn(&T) -> &U, get_mut: fn(&mut T) -> &mut U) -> Self {
        Self { get, get_mut }
    }
}

impl<T, U> Clone for Field<T, U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, U> Copy for Field<T, U> {}

/// Build a [`Field`] for a named struct member.
///
/// ```
/// use scriptbridge_registry::{Field, field};
///
/// struct Point {
///     x: f64,
/// }
///
/// let x: Field<Point, f64> = field!(Point, x);
/// ```
#[macro_export]
macro_rules! field {
    ($ty:ty, $member:ident) => {
        $crate::Field::<$ty, _>::new(|o| &o.$member, |o| &mut o.$member)
    };
}
