use std::any::{type_name, Any};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::MapperError;
use crate::types::TypeKey;
use crate::value::Value;

/// Value converter for one exact `(source, destination)` type pair.
///
/// Consulted by plain bindings when the value read from the source does not
/// have the destination member's declared type. No converter is needed when
/// the types already agree.
pub trait Converter: Send + Sync {
    fn source_type(&self) -> TypeKey;

    fn destination_type(&self) -> TypeKey;

    fn convert(&self, value: &dyn Any) -> Result<Value, MapperError>;
}

/// Converter backed by a closure over typed values.
pub struct FnConverter<S, D, F> {
    convert: F,
    _types: PhantomData<fn(&S) -> D>,
}

impl<S, D, F> FnConverter<S, D, F>
where
    S: Any,
    D: Any,
    F: Fn(&S) -> Result<D, MapperError> + Send + Sync,
{
    pub fn new(convert: F) -> Self {
        Self {
            convert,
            _types: PhantomData,
        }
    }
}

impl<S, D, F> Converter for FnConverter<S, D, F>
where
    S: Any,
    D: Any,
    F: Fn(&S) -> Result<D, MapperError> + Send + Sync,
{
    fn source_type(&self) -> TypeKey {
        TypeKey::of::<S>()
    }

    fn destination_type(&self) -> TypeKey {
        TypeKey::of::<D>()
    }

    fn convert(&self, value: &dyn Any) -> Result<Value, MapperError> {
        let value = value.downcast_ref::<S>().ok_or_else(|| {
            MapperError::incompatible_binding(format!(
                "converter {} -> {} given a value of another type",
                type_name::<S>(),
                type_name::<D>()
            ))
        })?;
        Ok(Box::new((self.convert)(value)?))
    }
}

/// Infallible converter.
pub fn converter<S: Any, D: Any>(
    convert: impl Fn(&S) -> D + Send + Sync + 'static,
) -> Arc<dyn Converter> {
    try_converter(move |value: &S| Ok(convert(value)))
}

/// Converter that may reject a value (`IncompatibleBinding` by convention).
pub fn try_converter<S: Any, D: Any>(
    convert: impl Fn(&S) -> Result<D, MapperError> + Send + Sync + 'static,
) -> Arc<dyn Converter> {
    Arc::new(FnConverter::new(convert))
}
