//! Stock converter sets.

use std::any::{type_name, Any};
use std::fmt::Display;
use std::sync::Arc;

use beanmap_api::{converter, try_converter, Converter, MapperError};

fn out_of_range<S: Display, D>(value: S) -> MapperError {
    MapperError::incompatible_binding(format!("{value} does not fit in {}", type_name::<D>()))
}

macro_rules! checked_integers {
    ($out:ident; $($from:ty => [$($to:ty),+ $(,)?]);+ $(;)?) => {
        $($(
            $out.push(try_converter(|v: &$from| {
                <$to>::try_from(*v).map_err(|_| out_of_range::<$from, $to>(*v))
            }));
        )+)+
    };
}

macro_rules! lossless {
    ($out:ident; $($from:ty => [$($to:ty),+ $(,)?]);+ $(;)?) => {
        $($(
            $out.push(converter(|v: &$from| <$to>::from(*v)));
        )+)+
    };
}

/// Conversions between the primitive integer types (checked: a value that
/// does not fit fails with `IncompatibleBinding`) and lossless conversions
/// into `f32`/`f64`.
pub fn numbers() -> Vec<Arc<dyn Converter>> {
    let mut out: Vec<Arc<dyn Converter>> = Vec::new();

    checked_integers!(out;
        i8 => [i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize];
        i16 => [i8, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize];
        i32 => [i8, i16, i64, i128, isize, u8, u16, u32, u64, u128, usize];
        i64 => [i8, i16, i32, i128, isize, u8, u16, u32, u64, u128, usize];
        i128 => [i8, i16, i32, i64, isize, u8, u16, u32, u64, u128, usize];
        isize => [i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, usize];
        u8 => [i8, i16, i32, i64, i128, isize, u16, u32, u64, u128, usize];
        u16 => [i8, i16, i32, i64, i128, isize, u8, u32, u64, u128, usize];
        u32 => [i8, i16, i32, i64, i128, isize, u8, u16, u64, u128, usize];
        u64 => [i8, i16, i32, i64, i128, isize, u8, u16, u32, u128, usize];
        u128 => [i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize];
        usize => [i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128];
    );

    lossless!(out;
        i8 => [f32, f64];
        i16 => [f32, f64];
        i32 => [f64];
        u8 => [f32, f64];
        u16 => [f32, f64];
        u32 => [f64];
        f32 => [f64];
    );

    out
}

/// `T -> String` through `Display`.
pub fn to_string<T: Display + Any>() -> Arc<dyn Converter> {
    converter(|v: &T| v.to_string())
}
