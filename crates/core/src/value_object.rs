//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To
/// "modify" one, build a new value (e.g. `price + delta` returns a new
/// `Money`).
///
/// ```ignore
/// let a = Money::from_cents(150);
/// let b: Money = "1.50".parse()?;
/// assert_eq!(a, b); // equal by value
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
