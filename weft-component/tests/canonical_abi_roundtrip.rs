//! Lift-after-lower identity checks across the value model.

use weft_component::canonical_abi::{
    flatten, flatten_function, layout, lift_flat, lift_memory, lower_flat, lower_memory,
    BumpAllocator, CanonContext, CoreType, SimpleMemory,
};
use weft_component::types::{CaseType, FuncType, ValType};
use weft_component::values::Value;

fn arena() -> (SimpleMemory, BumpAllocator) {
    (SimpleMemory::new(1 << 16), BumpAllocator::new(64, 1 << 16))
}

fn record_ty(fields: &[(&str, ValType)]) -> ValType {
    ValType::Record(fields.iter().map(|(n, t)| (n.to_string(), t.clone())).collect())
}

fn record_val(fields: &[(&str, Value)]) -> Value {
    Value::Record(fields.iter().map(|(n, v)| (n.to_string(), v.clone())).collect())
}

fn samples() -> Vec<(ValType, Value)> {
    vec![
        (ValType::String, Value::String("grüße, weft".to_string())),
        (
            ValType::List(Box::new(ValType::U16)),
            Value::List(vec![Value::U16(1), Value::U16(500), Value::U16(65535)]),
        ),
        (
            record_ty(&[("a", ValType::U8), ("b", ValType::U64)]),
            record_val(&[("a", Value::U8(3)), ("b", Value::U64(1 << 60))]),
        ),
        (
            ValType::Variant(vec![
                CaseType { name: "none".to_string(), ty: None },
                CaseType { name: "some".to_string(), ty: Some(ValType::F64) },
            ]),
            Value::tag_with("some", Value::F64(6.25)),
        ),
        (ValType::Enum(vec!["red".to_string(), "green".to_string()]), Value::tag("green")),
        (
            ValType::Flags(vec!["r".to_string(), "w".to_string(), "x".to_string()]),
            Value::Flags(vec!["r".to_string(), "x".to_string()]),
        ),
        (ValType::Option(Box::new(ValType::String)), Value::tag("none")),
        (
            ValType::Option(Box::new(ValType::String)),
            Value::tag_with("some", Value::String("present".to_string())),
        ),
        (
            ValType::Result {
                ok: Some(Box::new(ValType::U32)),
                err: Some(Box::new(ValType::String)),
            },
            Value::tag_with("error", Value::String("boom".to_string())),
        ),
        (
            ValType::List(Box::new(record_ty(&[("x", ValType::S32), ("y", ValType::S32)]))),
            Value::List(vec![
                record_val(&[("x", Value::S32(-1)), ("y", Value::S32(2))]),
                record_val(&[("x", Value::S32(3)), ("y", Value::S32(-4))]),
            ]),
        ),
        (
            ValType::Tuple(vec![ValType::Char, ValType::Bool]),
            Value::Tuple(vec![Value::Char('√'), Value::Bool(false)]),
        ),
    ]
}

#[test]
fn lower_then_lift_is_identity_through_flat_slots() {
    for (ty, value) in samples() {
        let (mut memory, mut realloc) = arena();
        let slots = lower_flat(&ty, &value, &mut memory, &mut realloc).unwrap();
        assert_eq!(
            slots.iter().map(|s| s.core_type()).collect::<Vec<_>>(),
            flatten(&ty).unwrap(),
            "slot types must match flatten({:?})",
            ty
        );
        let back = lift_flat(&ty, &slots, &memory).unwrap();
        assert_eq!(back, value, "flat roundtrip of {:?}", ty);
    }
}

#[test]
fn lower_then_lift_is_identity_through_memory() {
    for (ty, value) in samples() {
        let (mut memory, mut realloc) = arena();
        let addr = 32;
        lower_memory(&ty, &value, &mut memory, &mut realloc, addr).unwrap();
        let back = lift_memory(&ty, &memory, addr).unwrap();
        assert_eq!(back, value, "memory roundtrip of {:?}", ty);
    }
}

#[test]
fn canonical_nan_survives_the_roundtrip_bit_exactly() {
    let (mut memory, mut realloc) = arena();
    let value = Value::F32(f32::from_bits(0xFFC0_1234));
    let slots = lower_flat(&ValType::F32, &value, &mut memory, &mut realloc).unwrap();
    let back = lift_flat(&ValType::F32, &slots, &memory).unwrap();
    match back {
        Value::F32(f) => assert_eq!(f.to_bits(), 0x7FC0_0000),
        other => panic!("expected f32, got {:?}", other),
    }
}

#[test]
fn wide_enum_uses_a_two_byte_discriminant() {
    let cases: Vec<String> = (0..300).map(|i| format!("c{}", i)).collect();
    let ty = ValType::Enum(cases);
    let l = layout(&ty).unwrap();
    assert_eq!((l.size, l.align), (2, 2));

    let (mut memory, mut realloc) = arena();
    let value = Value::tag("c257");
    lower_memory(&ty, &value, &mut memory, &mut realloc, 0).unwrap();
    assert_eq!(memory.data()[0..2], [0x01, 0x01]); // 257 little-endian
    assert_eq!(lift_memory(&ty, &memory, 0).unwrap(), value);
}

#[test]
fn record_u8_u64_layout_and_flatten_agree() {
    let ty = record_ty(&[("a", ValType::U8), ("b", ValType::U64)]);
    let l = layout(&ty).unwrap();
    assert_eq!((l.size, l.align), (16, 8));
    assert_eq!(flatten(&ty).unwrap(), vec![CoreType::I32, CoreType::I64]);
}

#[test]
fn signature_flatten_matches_flat_counts() {
    let ty = FuncType {
        params: vec![
            ("s".to_string(), ValType::String),
            ("n".to_string(), ValType::U64),
        ],
        result: Some(ValType::U32),
    };
    let (params, results) = flatten_function(&ty, CanonContext::Lift).unwrap();
    assert_eq!(params, vec![CoreType::I32, CoreType::I32, CoreType::I64]);
    assert_eq!(results, vec![CoreType::I32]);
}
