//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**: they are defined entirely by their
/// attribute values and are never modified in place. A recorded trip or a
/// daily emission snapshot is a value object; an account is not.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Distance {
///     km: u64,
/// }
///
/// impl ValueObject for Distance {}
///
/// assert_eq!(Distance { km: 50 }, Distance { km: 50 });
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
