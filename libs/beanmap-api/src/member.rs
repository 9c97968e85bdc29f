use std::any::{type_name, Any};
use std::fmt;

use crate::bean::BeanInfo;
use crate::error::MapperError;
use crate::types::TypeKey;
use crate::value::{MemberValue, Value};

/// How a member is exposed by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Accessor pair (getter and/or setter). Reads produce owned values.
    Property,
    /// Public struct field. Reads borrow, writes assign in place.
    Field,
}

/// One readable and/or writable slot on an object.
///
/// Built once per declared member (normally by `#[derive(Bean)]`) and
/// shared by every binding that touches the member. Targets are passed as
/// `&dyn Any`; a target of the wrong type is reported as
/// `IncompatibleBinding`.
pub trait MemberAccessor: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> MemberKind;

    /// Type that declares the member.
    fn owner(&self) -> TypeKey;

    /// Declared value type. `V` for members of type `Option<V>`.
    fn value_type(&self) -> TypeKey;

    /// `true` for `Option<V>` members: they read as null and accept null writes.
    fn is_nullable(&self) -> bool;

    fn is_readable(&self) -> bool;

    fn is_writable(&self) -> bool;

    /// `true` when `get_mut` hands out the stored value itself.
    fn supports_in_place(&self) -> bool;

    /// Description of the value type, when it is a bean the owner knows about.
    fn nested(&self) -> Option<fn() -> BeanInfo> {
        None
    }

    /// `Ok(None)` means the member currently holds null.
    fn get<'a>(&self, target: &'a dyn Any) -> Result<Option<MemberValue<'a>>, MapperError>;

    fn get_mut<'a>(&self, target: &'a mut dyn Any)
    -> Result<Option<&'a mut dyn Any>, MapperError>;

    fn set(&self, target: &mut dyn Any, value: Option<Value>) -> Result<(), MapperError>;

    /// Clone a value of this member's declared type into an owned `Value`.
    fn clone_value(&self, value: &dyn Any) -> Result<Value, MapperError>;
}

impl fmt::Debug for dyn MemberAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("owner", &self.owner())
            .field("value_type", &self.value_type())
            .field("nullable", &self.is_nullable())
            .finish()
    }
}

impl MemberValue<'_> {
    /// Take ownership of the value, cloning through `member` when borrowed.
    pub fn into_owned(self, member: &dyn MemberAccessor) -> Result<Value, MapperError> {
        match self {
            MemberValue::Owned(v) => Ok(v),
            MemberValue::Borrowed(v) => member.clone_value(v),
        }
    }
}

// ---------------------------------------------------------------------------
// Field accessor: public struct field, `V` or `Option<V>`
// ---------------------------------------------------------------------------

enum FieldSlot<T, V> {
    Required {
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    },
    Optional {
        get: fn(&T) -> &Option<V>,
        get_mut: fn(&mut T) -> &mut Option<V>,
    },
}

/// Accessor for a struct field of `T` holding a `V` (or an `Option<V>`).
pub struct FieldAccessor<T, V> {
    name: &'static str,
    slot: FieldSlot<T, V>,
    nested: Option<fn() -> BeanInfo>,
}

impl<T: Any, V: Any + Clone> FieldAccessor<T, V> {
    /// Non-nullable field of type `V`.
    pub fn required(name: &'static str, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self {
        Self {
            name,
            slot: FieldSlot::Required { get, get_mut },
            nested: None,
        }
    }

    /// Nullable field of type `Option<V>`.
    pub fn optional(
        name: &'static str,
        get: fn(&T) -> &Option<V>,
        get_mut: fn(&mut T) -> &mut Option<V>,
    ) -> Self {
        Self {
            name,
            slot: FieldSlot::Optional { get, get_mut },
            nested: None,
        }
    }

    pub fn with_nested(mut self, describe: fn() -> BeanInfo) -> Self {
        self.nested = Some(describe);
        self
    }
}

impl<T: Any, V: Any + Clone> MemberAccessor for FieldAccessor<T, V> {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> MemberKind {
        MemberKind::Field
    }

    fn owner(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn value_type(&self) -> TypeKey {
        TypeKey::of::<V>()
    }

    fn is_nullable(&self) -> bool {
        matches!(self.slot, FieldSlot::Optional { .. })
    }

    fn is_readable(&self) -> bool {
        true
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn supports_in_place(&self) -> bool {
        true
    }

    fn nested(&self) -> Option<fn() -> BeanInfo> {
        self.nested
    }

    fn get<'a>(&self, target: &'a dyn Any) -> Result<Option<MemberValue<'a>>, MapperError> {
        let target = target_ref::<T>(target, self.name)?;
        let value: Option<&'a V> = match &self.slot {
            FieldSlot::Required { get, .. } => Some(get(target)),
            FieldSlot::Optional { get, .. } => get(target).as_ref(),
        };
        Ok(value.map(|v| MemberValue::Borrowed(v)))
    }

    fn get_mut<'a>(
        &self,
        target: &'a mut dyn Any,
    ) -> Result<Option<&'a mut dyn Any>, MapperError> {
        let target = target_mut::<T>(target, self.name)?;
        let value: Option<&'a mut V> = match &self.slot {
            FieldSlot::Required { get_mut, .. } => Some(get_mut(target)),
            FieldSlot::Optional { get_mut, .. } => get_mut(target).as_mut(),
        };
        Ok(value.map(|v| v as &mut dyn Any))
    }

    fn set(&self, target: &mut dyn Any, value: Option<Value>) -> Result<(), MapperError> {
        let value = value.map(|v| take_value::<V>(v, self.name)).transpose()?;
        let target = target_mut::<T>(target, self.name)?;
        match (&self.slot, value) {
            (FieldSlot::Required { get_mut, .. }, Some(v)) => *get_mut(target) = v,
            (FieldSlot::Required { .. }, None) => return Err(null_into_required(self.name)),
            (FieldSlot::Optional { get_mut, .. }, v) => *get_mut(target) = v,
        }
        Ok(())
    }

    fn clone_value(&self, value: &dyn Any) -> Result<Value, MapperError> {
        clone_as::<V>(value, self.name)
    }
}

// ---------------------------------------------------------------------------
// Property accessor: getter/setter pair
// ---------------------------------------------------------------------------

enum Getter<T, V> {
    Required(fn(&T) -> V),
    Optional(fn(&T) -> Option<V>),
}

enum Setter<T, V> {
    Required(fn(&mut T, V)),
    Optional(fn(&mut T, Option<V>)),
}

/// Accessor-pair member of `T` with value type `V`.
///
/// Either half may be missing (read-only / write-only property). A property
/// is nullable when its setter (or, for read-only properties, its getter)
/// uses `Option<V>`.
pub struct PropertyAccessor<T, V> {
    name: &'static str,
    getter: Option<Getter<T, V>>,
    setter: Option<Setter<T, V>>,
    nested: Option<fn() -> BeanInfo>,
}

impl<T: Any, V: Any + Clone> PropertyAccessor<T, V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            getter: None,
            setter: None,
            nested: None,
        }
    }

    pub fn getter(mut self, get: fn(&T) -> V) -> Self {
        self.getter = Some(Getter::Required(get));
        self
    }

    pub fn optional_getter(mut self, get: fn(&T) -> Option<V>) -> Self {
        self.getter = Some(Getter::Optional(get));
        self
    }

    pub fn setter(mut self, set: fn(&mut T, V)) -> Self {
        self.setter = Some(Setter::Required(set));
        self
    }

    pub fn optional_setter(mut self, set: fn(&mut T, Option<V>)) -> Self {
        self.setter = Some(Setter::Optional(set));
        self
    }

    pub fn with_nested(mut self, describe: fn() -> BeanInfo) -> Self {
        self.nested = Some(describe);
        self
    }
}

impl<T: Any, V: Any + Clone> MemberAccessor for PropertyAccessor<T, V> {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> MemberKind {
        MemberKind::Property
    }

    fn owner(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn value_type(&self) -> TypeKey {
        TypeKey::of::<V>()
    }

    fn is_nullable(&self) -> bool {
        match (&self.setter, &self.getter) {
            (Some(Setter::Optional(_)), _) => true,
            (Some(Setter::Required(_)), _) => false,
            (None, Some(Getter::Optional(_))) => true,
            (None, _) => false,
        }
    }

    fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    fn supports_in_place(&self) -> bool {
        false
    }

    fn nested(&self) -> Option<fn() -> BeanInfo> {
        self.nested
    }

    fn get<'a>(&self, target: &'a dyn Any) -> Result<Option<MemberValue<'a>>, MapperError> {
        let getter = self.getter.as_ref().ok_or_else(|| {
            MapperError::incompatible_binding(format!("property '{}' is write-only", self.name))
        })?;
        let target = target_ref::<T>(target, self.name)?;
        let value = match getter {
            Getter::Required(get) => Some(get(target)),
            Getter::Optional(get) => get(target),
        };
        Ok(value.map(|v| MemberValue::Owned(Box::new(v))))
    }

    fn get_mut<'a>(
        &self,
        _target: &'a mut dyn Any,
    ) -> Result<Option<&'a mut dyn Any>, MapperError> {
        Err(MapperError::incompatible_binding(format!(
            "property '{}' has no in-place access",
            self.name
        )))
    }

    fn set(&self, target: &mut dyn Any, value: Option<Value>) -> Result<(), MapperError> {
        let setter = self.setter.as_ref().ok_or_else(|| {
            MapperError::incompatible_binding(format!("property '{}' is read-only", self.name))
        })?;
        let value = value.map(|v| take_value::<V>(v, self.name)).transpose()?;
        let target = target_mut::<T>(target, self.name)?;
        match (setter, value) {
            (Setter::Required(set), Some(v)) => set(target, v),
            (Setter::Required(_), None) => return Err(null_into_required(self.name)),
            (Setter::Optional(set), v) => set(target, v),
        }
        Ok(())
    }

    fn clone_value(&self, value: &dyn Any) -> Result<Value, MapperError> {
        clone_as::<V>(value, self.name)
    }
}

// ---------------------------------------------------------------------------
// Downcast helpers
// ---------------------------------------------------------------------------

fn target_ref<'a, T: Any>(target: &'a dyn Any, member: &str) -> Result<&'a T, MapperError> {
    target
        .downcast_ref::<T>()
        .ok_or_else(|| wrong_owner::<T>(member))
}

fn target_mut<'a, T: Any>(target: &'a mut dyn Any, member: &str) -> Result<&'a mut T, MapperError> {
    target
        .downcast_mut::<T>()
        .ok_or_else(|| wrong_owner::<T>(member))
}

fn wrong_owner<T>(member: &str) -> MapperError {
    MapperError::incompatible_binding(format!(
        "member '{member}' is declared on {}, not on the given object",
        type_name::<T>()
    ))
}

fn take_value<V: Any>(value: Value, member: &str) -> Result<V, MapperError> {
    value.downcast::<V>().map(|v| *v).map_err(|_| {
        MapperError::incompatible_binding(format!(
            "member '{member}' expects a value of type {}",
            type_name::<V>()
        ))
    })
}

fn clone_as<V: Any + Clone>(value: &dyn Any, member: &str) -> Result<Value, MapperError> {
    value
        .downcast_ref::<V>()
        .map(|v| Box::new(v.clone()) as Value)
        .ok_or_else(|| {
            MapperError::incompatible_binding(format!(
                "member '{member}' holds values of type {}",
                type_name::<V>()
            ))
        })
}

fn null_into_required(member: &str) -> MapperError {
    MapperError::incompatible_binding(format!("member '{member}' does not accept null"))
}
