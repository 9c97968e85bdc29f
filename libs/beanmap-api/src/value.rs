use std::any::{Any, TypeId};

/// Owned, runtime-typed value moved between members, converters and
/// constructors.
pub type Value = Box<dyn Any>;

/// Concrete runtime type of `value`.
///
/// Takes `&dyn Any` on purpose: calling `type_id()` on a `Box<dyn Any>` or a
/// `&mut dyn Any` would report the box or the reference instead.
pub fn runtime_type(value: &dyn Any) -> TypeId {
    value.type_id()
}

/// Result of reading a member.
///
/// - Fields hand out a reference into the owning object (`Borrowed`).
/// - Accessor-pair properties compute their value (`Owned`).
pub enum MemberValue<'a> {
    Borrowed(&'a dyn Any),
    Owned(Value),
}

impl MemberValue<'_> {
    pub fn as_any(&self) -> &dyn Any {
        match self {
            MemberValue::Borrowed(v) => *v,
            MemberValue::Owned(v) => v.as_ref(),
        }
    }

    pub fn runtime_type(&self) -> TypeId {
        runtime_type(self.as_any())
    }
}

impl std::fmt::Debug for MemberValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberValue::Borrowed(_) => f.write_str("MemberValue::Borrowed(..)"),
            MemberValue::Owned(_) => f.write_str("MemberValue::Owned(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_type_sees_through_boxes() {
        let boxed: Value = Box::new(7_i64);
        assert_eq!(runtime_type(boxed.as_ref()), TypeId::of::<i64>());

        let owned = MemberValue::Owned(boxed);
        assert_eq!(owned.runtime_type(), TypeId::of::<i64>());

        let text = String::from("abc");
        let borrowed = MemberValue::Borrowed(&text);
        assert_eq!(borrowed.runtime_type(), TypeId::of::<String>());
        assert_eq!(borrowed.as_any().downcast_ref::<String>(), Some(&text));
    }
}
